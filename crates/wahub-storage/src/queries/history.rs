// SPDX-FileCopyrightText: 2026 Wahub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook delivery history queries: per-attempt rows, filtered listings,
//! aggregate statistics, and the retention delete.

use rusqlite::params_from_iter;
use rusqlite::types::Value as SqlValue;
use wahub_core::WahubError;

use crate::database::{map_tr_err, Database};
use crate::models::{WebhookHistoryRecord, WebhookStats};

fn row_to_history(row: &rusqlite::Row<'_>) -> Result<WebhookHistoryRecord, rusqlite::Error> {
    Ok(WebhookHistoryRecord {
        id: row.get(0)?,
        instance_id: row.get(1)?,
        webhook_id: row.get(2)?,
        event: row.get(3)?,
        payload: row.get(4)?,
        status: row.get(5)?,
        http_status: row.get(6)?,
        response_time_ms: row.get(7)?,
        response_body: row.get(8)?,
        error_message: row.get(9)?,
        retry_count: row.get(10)?,
        triggered_at: row.get(11)?,
        completed_at: row.get(12)?,
    })
}

const HISTORY_COLUMNS: &str = "id, instance_id, webhook_id, event, payload, status, \
     http_status, response_time_ms, response_body, error_message, retry_count, \
     triggered_at, completed_at";

/// Insert a completed delivery attempt.
pub async fn insert_history(
    db: &Database,
    record: &WebhookHistoryRecord,
) -> Result<(), WahubError> {
    let record = record.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO webhook_history
                 (id, instance_id, webhook_id, event, payload, status, http_status,
                  response_time_ms, response_body, error_message, retry_count,
                  triggered_at, completed_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                rusqlite::params![
                    record.id,
                    record.instance_id,
                    record.webhook_id,
                    record.event,
                    record.payload,
                    record.status,
                    record.http_status,
                    record.response_time_ms,
                    record.response_body,
                    record.error_message,
                    record.retry_count,
                    record.triggered_at,
                    record.completed_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Get a history row by id.
pub async fn get_history(
    db: &Database,
    id: &str,
) -> Result<Option<WebhookHistoryRecord>, WahubError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {HISTORY_COLUMNS} FROM webhook_history WHERE id = ?1"
            ))?;
            match stmt.query_row(rusqlite::params![id], row_to_history) {
                Ok(record) => Ok(Some(record)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Filters for history listings. All fields are optional and ANDed together.
#[derive(Debug, Clone, Default)]
pub struct HistoryFilter {
    /// Restrict to one instance.
    pub instance_id: Option<String>,
    /// Restrict to one outcome status.
    pub status: Option<String>,
    /// Restrict to one event name.
    pub event: Option<String>,
    /// Inclusive lower bound on triggered_at.
    pub since: Option<String>,
    /// Exclusive upper bound on triggered_at.
    pub until: Option<String>,
}

/// List history rows matching a filter, newest first.
pub async fn list_history(
    db: &Database,
    filter: HistoryFilter,
    limit: i64,
) -> Result<Vec<WebhookHistoryRecord>, WahubError> {
    db.connection()
        .call(move |conn| {
            let mut clauses: Vec<&str> = Vec::new();
            let mut values: Vec<SqlValue> = Vec::new();

            if let Some(instance_id) = filter.instance_id {
                clauses.push("instance_id = ?");
                values.push(SqlValue::Text(instance_id));
            }
            if let Some(status) = filter.status {
                clauses.push("status = ?");
                values.push(SqlValue::Text(status));
            }
            if let Some(event) = filter.event {
                clauses.push("event = ?");
                values.push(SqlValue::Text(event));
            }
            if let Some(since) = filter.since {
                clauses.push("triggered_at >= ?");
                values.push(SqlValue::Text(since));
            }
            if let Some(until) = filter.until {
                clauses.push("triggered_at < ?");
                values.push(SqlValue::Text(until));
            }

            let where_clause = if clauses.is_empty() {
                String::new()
            } else {
                format!("WHERE {}", clauses.join(" AND "))
            };
            values.push(SqlValue::Integer(limit));

            let sql = format!(
                "SELECT {HISTORY_COLUMNS} FROM webhook_history {where_clause}
                 ORDER BY triggered_at DESC LIMIT ?"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(values), row_to_history)?;
            let mut records = Vec::new();
            for row in rows {
                records.push(row?);
            }
            Ok(records)
        })
        .await
        .map_err(map_tr_err)
}

/// Aggregate delivery statistics, optionally scoped to one instance.
pub async fn stats(
    db: &Database,
    instance_id: Option<String>,
) -> Result<WebhookStats, WahubError> {
    db.connection()
        .call(move |conn| {
            let scope = match &instance_id {
                Some(_) => "WHERE instance_id = ?1",
                None => "",
            };
            let scoped_params = |id: &Option<String>| -> Vec<SqlValue> {
                id.iter().map(|v| SqlValue::Text(v.clone())).collect()
            };

            let mut by_status = Vec::new();
            {
                let sql = format!(
                    "SELECT status, COUNT(*) FROM webhook_history {scope} GROUP BY status ORDER BY status"
                );
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt.query_map(params_from_iter(scoped_params(&instance_id)), |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
                })?;
                for row in rows {
                    by_status.push(row?);
                }
            }

            let mut by_event = Vec::new();
            {
                let sql = format!(
                    "SELECT event, COUNT(*) FROM webhook_history {scope} GROUP BY event ORDER BY event"
                );
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt.query_map(params_from_iter(scoped_params(&instance_id)), |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
                })?;
                for row in rows {
                    by_event.push(row?);
                }
            }

            let avg_response_time_ms: Option<f64> = {
                let sql = format!(
                    "SELECT AVG(response_time_ms) FROM webhook_history {scope}
                     {} response_time_ms IS NOT NULL",
                    if scope.is_empty() { "WHERE" } else { "AND" }
                );
                let mut stmt = conn.prepare(&sql)?;
                stmt.query_row(params_from_iter(scoped_params(&instance_id)), |row| {
                    row.get(0)
                })?
            };

            let success_count: i64 = by_status
                .iter()
                .filter(|(s, _)| s == "success")
                .map(|(_, c)| *c)
                .sum();
            let failure_count: i64 = by_status
                .iter()
                .filter(|(s, _)| s == "failed" || s == "timeout")
                .map(|(_, c)| *c)
                .sum();

            Ok(WebhookStats {
                by_status,
                by_event,
                avg_response_time_ms,
                success_count,
                failure_count,
            })
        })
        .await
        .map_err(map_tr_err)
}

/// Recent failed or timed-out attempts, newest first.
pub async fn recent_failures(
    db: &Database,
    limit: i64,
) -> Result<Vec<WebhookHistoryRecord>, WahubError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {HISTORY_COLUMNS} FROM webhook_history
                 WHERE status IN ('failed', 'timeout')
                 ORDER BY triggered_at DESC LIMIT ?1"
            ))?;
            let rows = stmt.query_map(rusqlite::params![limit], row_to_history)?;
            let mut records = Vec::new();
            for row in rows {
                records.push(row?);
            }
            Ok(records)
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::now_iso;
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

    fn make_history(
        instance_id: &str,
        event: &str,
        status: &str,
        http_status: Option<i64>,
        response_time_ms: Option<i64>,
        triggered_at: &str,
    ) -> WebhookHistoryRecord {
        WebhookHistoryRecord {
            id: uuid::Uuid::new_v4().to_string(),
            instance_id: instance_id.to_string(),
            webhook_id: "wh-1".to_string(),
            event: event.to_string(),
            payload: r#"{"event":"x"}"#.to_string(),
            status: status.to_string(),
            http_status,
            response_time_ms,
            response_body: None,
            error_message: None,
            retry_count: 0,
            triggered_at: triggered_at.to_string(),
            completed_at: Some(now_iso()),
        }
    }

    #[tokio::test]
    async fn insert_and_filter_by_status() {
        let (db, _dir, instance_id) = setup_db_with_instance().await;
        let t = now_iso();
        insert_history(&db, &make_history(&instance_id, "message.received", "success", Some(200), Some(40), &t))
            .await
            .unwrap();
        insert_history(&db, &make_history(&instance_id, "message.received", "timeout", None, Some(5000), &t))
            .await
            .unwrap();

        let timeouts = list_history(
            &db,
            HistoryFilter {
                status: Some("timeout".into()),
                ..Default::default()
            },
            50,
        )
        .await
        .unwrap();
        assert_eq!(timeouts.len(), 1);
        assert!(timeouts[0].http_status.is_none());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn filter_by_date_range() {
        let (db, _dir, instance_id) = setup_db_with_instance().await;
        insert_history(&db, &make_history(&instance_id, "e", "success", Some(200), Some(5), "2026-01-01T00:00:00.000Z"))
            .await
            .unwrap();
        insert_history(&db, &make_history(&instance_id, "e", "success", Some(200), Some(5), "2026-02-01T00:00:00.000Z"))
            .await
            .unwrap();

        let january = list_history(
            &db,
            HistoryFilter {
                since: Some("2026-01-01T00:00:00.000Z".into()),
                until: Some("2026-02-01T00:00:00.000Z".into()),
                ..Default::default()
            },
            50,
        )
        .await
        .unwrap();
        assert_eq!(january.len(), 1);
        assert_eq!(january[0].triggered_at, "2026-01-01T00:00:00.000Z");
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn stats_aggregate_counts_and_average() {
        let (db, _dir, instance_id) = setup_db_with_instance().await;
        let t = now_iso();
        insert_history(&db, &make_history(&instance_id, "message.received", "success", Some(200), Some(40), &t))
            .await
            .unwrap();
        insert_history(&db, &make_history(&instance_id, "message.sent", "success", Some(201), Some(60), &t))
            .await
            .unwrap();
        insert_history(&db, &make_history(&instance_id, "message.received", "failed", Some(500), Some(20), &t))
            .await
            .unwrap();

        let stats = stats(&db, Some(instance_id)).await.unwrap();
        assert_eq!(stats.success_count, 2);
        assert_eq!(stats.failure_count, 1);
        assert_eq!(stats.avg_response_time_ms, Some(40.0));
        assert!(stats.by_event.iter().any(|(e, c)| e == "message.received" && *c == 2));
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn recent_failures_only_lists_bad_outcomes() {
        let (db, _dir, instance_id) = setup_db_with_instance().await;
        let t = now_iso();
        insert_history(&db, &make_history(&instance_id, "e", "success", Some(200), Some(5), &t))
            .await
            .unwrap();
        insert_history(&db, &make_history(&instance_id, "e", "failed", Some(500), Some(5), &t))
            .await
            .unwrap();
        insert_history(&db, &make_history(&instance_id, "e", "timeout", None, Some(5000), &t))
            .await
            .unwrap();

        let failures = recent_failures(&db, 10).await.unwrap();
        assert_eq!(failures.len(), 2);
        db.close().await.unwrap();
    }
}
