// SPDX-FileCopyrightText: 2026 Wahub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All writes are serialized through tokio-rusqlite's single background
//! thread. The `Database` struct IS the single writer: query modules accept
//! `&Database` and go through `connection().call()`. Do NOT create
//! additional Connection instances for writes.

use tokio_rusqlite::Connection;
use wahub_core::WahubError;

use crate::migrations;

/// Handle to the single-writer SQLite database.
#[derive(Clone)]
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (or create) the database at `path`, apply PRAGMAs, and run
    /// pending migrations.
    pub async fn open(path: &str) -> Result<Self, WahubError> {
        Self::open_with_wal(path, true).await
    }

    /// Open with explicit WAL selection (tests use non-WAL in-memory files).
    pub async fn open_with_wal(path: &str, wal: bool) -> Result<Self, WahubError> {
        let conn = Connection::open(path).await.map_err(map_tr_err)?;

        conn.call(move |conn| {
            if wal {
                conn.pragma_update(None, "journal_mode", "WAL")?;
            }
            conn.pragma_update(None, "synchronous", "NORMAL")?;
            conn.pragma_update(None, "foreign_keys", "ON")?;
            conn.pragma_update(None, "busy_timeout", 5000)?;
            migrations::run_migrations(conn)?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;

        Ok(Self { conn })
    }

    /// The underlying tokio-rusqlite connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Close the database, flushing pending writes.
    pub async fn close(&self) -> Result<(), WahubError> {
        self.conn
            .clone()
            .close()
            .await
            .map_err(|e| WahubError::Storage { source: Box::new(e) })
    }
}

/// Map a tokio-rusqlite error into the workspace error type.
pub fn map_tr_err(e: tokio_rusqlite::Error) -> WahubError {
    WahubError::Storage { source: Box::new(e) }
}

/// Current UTC time in the canonical millisecond ISO-8601 form used for all
/// persisted timestamps. Lexicographic order equals chronological order.
pub fn now_iso() -> String {
    chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn open_creates_schema_and_closes() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();

        // All entity tables exist after migrations.
        let tables: Vec<String> = db
            .connection()
            .call(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name",
                )?;
                let rows = stmt.query_map([], |row| row.get(0))?;
                let mut names = Vec::new();
                for row in rows {
                    names.push(row?);
                }
                Ok(names)
            })
            .await
            .unwrap();

        for expected in [
            "instances",
            "messages",
            "webhooks",
            "webhook_history",
            "instance_logs",
        ] {
            assert!(tables.iter().any(|t| t == expected), "missing table {expected}");
        }

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn open_is_idempotent_across_reopens() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let path = db_path.to_str().unwrap();

        let db = Database::open(path).await.unwrap();
        db.close().await.unwrap();

        // Second open re-runs the migration runner without error.
        let db = Database::open(path).await.unwrap();
        db.close().await.unwrap();
    }

    #[test]
    fn now_iso_sorts_chronologically() {
        let a = now_iso();
        std::thread::sleep(std::time::Duration::from_millis(5));
        let b = now_iso();
        assert!(a < b);
        assert!(a.ends_with('Z'));
    }
}
