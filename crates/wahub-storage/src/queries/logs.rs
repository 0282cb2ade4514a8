// SPDX-FileCopyrightText: 2026 Wahub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Append-only instance log entries.

use rusqlite::params;
use wahub_core::WahubError;

use crate::database::{map_tr_err, now_iso, Database};
use crate::models::InstanceLogRecord;

fn row_to_log(row: &rusqlite::Row<'_>) -> Result<InstanceLogRecord, rusqlite::Error> {
    Ok(InstanceLogRecord {
        id: row.get(0)?,
        instance_id: row.get(1)?,
        level: row.get(2)?,
        message: row.get(3)?,
        created_at: row.get(4)?,
    })
}

/// Append a log entry for an instance.
pub async fn append_log(
    db: &Database,
    instance_id: &str,
    level: &str,
    message: &str,
) -> Result<(), WahubError> {
    let record = InstanceLogRecord {
        id: uuid::Uuid::new_v4().to_string(),
        instance_id: instance_id.to_string(),
        level: level.to_string(),
        message: message.to_string(),
        created_at: now_iso(),
    };
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO instance_logs (id, instance_id, level, message, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    record.id,
                    record.instance_id,
                    record.level,
                    record.message,
                    record.created_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// List log entries for an instance, newest first, optionally by level.
pub async fn list_logs(
    db: &Database,
    instance_id: &str,
    level: Option<&str>,
    limit: i64,
) -> Result<Vec<InstanceLogRecord>, WahubError> {
    let instance_id = instance_id.to_string();
    let level = level.map(|l| l.to_string());
    db.connection()
        .call(move |conn| {
            let mut logs = Vec::new();
            match &level {
                Some(level) => {
                    let mut stmt = conn.prepare(
                        "SELECT id, instance_id, level, message, created_at
                         FROM instance_logs WHERE instance_id = ?1 AND level = ?2
                         ORDER BY created_at DESC LIMIT ?3",
                    )?;
                    let rows = stmt.query_map(params![instance_id, level, limit], row_to_log)?;
                    for row in rows {
                        logs.push(row?);
                    }
                }
                None => {
                    let mut stmt = conn.prepare(
                        "SELECT id, instance_id, level, message, created_at
                         FROM instance_logs WHERE instance_id = ?1
                         ORDER BY created_at DESC LIMIT ?2",
                    )?;
                    let rows = stmt.query_map(params![instance_id, limit], row_to_log)?;
                    for row in rows {
                        logs.push(row?);
                    }
                }
            }
            Ok(logs)
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::InstanceRecord;
    use crate::queries::instances::create_instance;
    use tempfile::tempdir;

    async fn setup_db_with_instance() -> (Database, tempfile::TempDir, String) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        let instance = InstanceRecord {
            id: "inst-1".to_string(),
            phone: "628123".to_string(),
            name: "I1".to_string(),
            alias: None,
            status: "active".to_string(),
            plugins: "{}".to_string(),
            created_at: now_iso(),
            updated_at: now_iso(),
        };
        create_instance(&db, &instance).await.unwrap();
        (db, dir, instance.id)
    }

    #[tokio::test]
    async fn append_and_list() {
        let (db, _dir, instance_id) = setup_db_with_instance().await;
        append_log(&db, &instance_id, "info", "message sent").await.unwrap();
        append_log(&db, &instance_id, "error", "send failed").await.unwrap();

        let all = list_logs(&db, &instance_id, None, 50).await.unwrap();
        assert_eq!(all.len(), 2);

        let errors = list_logs(&db, &instance_id, Some("error"), 50).await.unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "send failed");
        db.close().await.unwrap();
    }
}
