// SPDX-FileCopyrightText: 2026 Wahub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Retention sweep: delete rows strictly older than a cutoff across every
//! entity table.
//!
//! The sweep deletes webhook history, instance logs, messages, webhooks, and
//! finally instance rows themselves. Phones of deleted instances are
//! returned so the caller can remove the matching credential directories;
//! the store never touches the filesystem.

use rusqlite::params;
use serde::Serialize;
use wahub_core::WahubError;

use crate::database::{map_tr_err, Database};

/// Per-table row counts removed by one retention sweep.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RetentionReport {
    pub webhook_history: usize,
    pub instance_logs: usize,
    pub messages: usize,
    pub webhooks: usize,
    pub instances: usize,
    /// Phones of instances that were deleted; credential directories for
    /// these must be removed by the caller.
    #[serde(skip)]
    pub deleted_phones: Vec<String>,
}

/// Delete everything strictly older than `cutoff` (canonical ISO-8601).
pub async fn sweep(db: &Database, cutoff: &str) -> Result<RetentionReport, WahubError> {
    let cutoff = cutoff.to_string();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let mut report = RetentionReport::default();

            report.webhook_history = tx.execute(
                "DELETE FROM webhook_history WHERE triggered_at < ?1",
                params![cutoff],
            )?;
            report.instance_logs = tx.execute(
                "DELETE FROM instance_logs WHERE created_at < ?1",
                params![cutoff],
            )?;
            report.messages = tx.execute(
                "DELETE FROM messages WHERE created_at < ?1",
                params![cutoff],
            )?;
            report.webhooks = tx.execute(
                "DELETE FROM webhooks WHERE created_at < ?1",
                params![cutoff],
            )?;

            // Instances older than the cutoff go too; collect their phones
            // first and clear any remaining dependents so the FK constraint
            // holds.
            {
                let mut stmt =
                    tx.prepare("SELECT id, phone FROM instances WHERE created_at < ?1")?;
                let rows = stmt.query_map(params![cutoff], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
                })?;
                let mut stale: Vec<(String, String)> = Vec::new();
                for row in rows {
                    stale.push(row?);
                }
                for (id, phone) in &stale {
                    tx.execute("DELETE FROM webhook_history WHERE instance_id = ?1", params![id])?;
                    tx.execute("DELETE FROM instance_logs WHERE instance_id = ?1", params![id])?;
                    tx.execute("DELETE FROM messages WHERE instance_id = ?1", params![id])?;
                    tx.execute("DELETE FROM webhooks WHERE instance_id = ?1", params![id])?;
                    tx.execute("DELETE FROM instances WHERE id = ?1", params![id])?;
                    report.deleted_phones.push(phone.clone());
                }
                report.instances = stale.len();
            }

            tx.commit()?;
            Ok(report)
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::now_iso;
    use crate::models::{InstanceRecord, MessageRecord, WebhookHistoryRecord, WebhookRecord};
    use crate::queries::history::HistoryFilter;
    use crate::queries::{history, instances, messages, webhooks};

    use tempfile::tempdir;

    const OLD: &str = "2026-01-01T00:00:00.000Z";

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    fn make_instance(phone: &str, created_at: &str) -> InstanceRecord {
        InstanceRecord {
            id: format!("inst-{phone}"),
            phone: phone.to_string(),
            name: phone.to_string(),
            alias: None,
            status: "inactive".to_string(),
            plugins: "{}".to_string(),
            created_at: created_at.to_string(),
            updated_at: created_at.to_string(),
        }
    }

    #[tokio::test]
    async fn sweep_deletes_only_rows_older_than_cutoff() {
        let (db, _dir) = setup_db().await;
        let fresh = now_iso();

        let old_instance = make_instance("628001", OLD);
        let new_instance = make_instance("628002", &fresh);
        instances::create_instance(&db, &old_instance).await.unwrap();
        instances::create_instance(&db, &new_instance).await.unwrap();

        messages::insert_message(
            &db,
            &MessageRecord {
                id: "m-old".into(),
                instance_id: new_instance.id.clone(),
                direction: "incoming".into(),
                from_jid: "a@s.whatsapp.net".into(),
                to_jid: "me".into(),
                kind: "text".into(),
                content: "{}".into(),
                status: "received".into(),
                sent_at: None,
                created_at: OLD.into(),
            },
        )
        .await
        .unwrap();
        messages::insert_message(
            &db,
            &MessageRecord {
                id: "m-new".into(),
                instance_id: new_instance.id.clone(),
                direction: "incoming".into(),
                from_jid: "a@s.whatsapp.net".into(),
                to_jid: "me".into(),
                kind: "text".into(),
                content: "{}".into(),
                status: "received".into(),
                sent_at: None,
                created_at: fresh.clone(),
            },
        )
        .await
        .unwrap();
        webhooks::create_webhook(
            &db,
            &WebhookRecord {
                id: "wh-old".into(),
                instance_id: old_instance.id.clone(),
                kind: "http".into(),
                event: "message.received".into(),
                url: "http://127.0.0.1:9/h".into(),
                enabled: true,
                created_at: OLD.into(),
            },
        )
        .await
        .unwrap();
        for (id, triggered_at) in [("h-old", OLD), ("h-new", fresh.as_str())] {
            history::insert_history(
                &db,
                &WebhookHistoryRecord {
                    id: id.into(),
                    instance_id: new_instance.id.clone(),
                    webhook_id: "wh-any".into(),
                    event: "message.received".into(),
                    payload: "{}".into(),
                    status: "success".into(),
                    http_status: Some(200),
                    response_time_ms: Some(5),
                    response_body: None,
                    error_message: None,
                    retry_count: 0,
                    triggered_at: triggered_at.into(),
                    completed_at: Some(triggered_at.into()),
                },
            )
            .await
            .unwrap();
        }

        let report = sweep(&db, "2026-06-01T00:00:00.000Z").await.unwrap();

        assert_eq!(report.messages, 1);
        assert_eq!(report.webhooks, 1);
        assert_eq!(report.webhook_history, 1);
        assert_eq!(report.instances, 1);
        assert_eq!(report.deleted_phones, vec!["628001".to_string()]);

        // Only the row strictly older than the cutoff went.
        let remaining = history::list_history(&db, HistoryFilter::default(), 10)
            .await
            .unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, "h-new");

        // Younger rows survive.
        assert!(instances::get_instance_by_phone(&db, "628002").await.unwrap().is_some());
        assert!(messages::get_message(&db, "m-new").await.unwrap().is_some());
        assert!(instances::get_instance_by_phone(&db, "628001").await.unwrap().is_none());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn sweep_on_empty_database_reports_zero() {
        let (db, _dir) = setup_db().await;
        let report = sweep(&db, &now_iso()).await.unwrap();
        assert_eq!(report.instances, 0);
        assert_eq!(report.messages, 0);
        assert!(report.deleted_phones.is_empty());
        db.close().await.unwrap();
    }
}
