// SPDX-FileCopyrightText: 2026 Wahub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook subscription CRUD operations.

use rusqlite::params;
use wahub_core::WahubError;

use crate::database::{map_tr_err, Database};
use crate::models::WebhookRecord;

fn row_to_webhook(row: &rusqlite::Row<'_>) -> Result<WebhookRecord, rusqlite::Error> {
    Ok(WebhookRecord {
        id: row.get(0)?,
        instance_id: row.get(1)?,
        kind: row.get(2)?,
        event: row.get(3)?,
        url: row.get(4)?,
        enabled: row.get(5)?,
        created_at: row.get(6)?,
    })
}

const WEBHOOK_COLUMNS: &str = "id, instance_id, kind, event, url, enabled, created_at";

/// Create a new webhook subscription.
pub async fn create_webhook(db: &Database, webhook: &WebhookRecord) -> Result<(), WahubError> {
    let webhook = webhook.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO webhooks (id, instance_id, kind, event, url, enabled, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    webhook.id,
                    webhook.instance_id,
                    webhook.kind,
                    webhook.event,
                    webhook.url,
                    webhook.enabled,
                    webhook.created_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Get a webhook by id.
pub async fn get_webhook(
    db: &Database,
    id: &str,
) -> Result<Option<WebhookRecord>, WahubError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {WEBHOOK_COLUMNS} FROM webhooks WHERE id = ?1"
            ))?;
            match stmt.query_row(params![id], row_to_webhook) {
                Ok(webhook) => Ok(Some(webhook)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// List all webhooks for an instance.
pub async fn list_webhooks(
    db: &Database,
    instance_id: &str,
) -> Result<Vec<WebhookRecord>, WahubError> {
    let instance_id = instance_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {WEBHOOK_COLUMNS} FROM webhooks
                 WHERE instance_id = ?1 ORDER BY created_at ASC"
            ))?;
            let rows = stmt.query_map(params![instance_id], row_to_webhook)?;
            let mut webhooks = Vec::new();
            for row in rows {
                webhooks.push(row?);
            }
            Ok(webhooks)
        })
        .await
        .map_err(map_tr_err)
}

/// List enabled webhooks matching an instance and event name.
pub async fn list_enabled_for_event(
    db: &Database,
    instance_id: &str,
    event: &str,
) -> Result<Vec<WebhookRecord>, WahubError> {
    let instance_id = instance_id.to_string();
    let event = event.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {WEBHOOK_COLUMNS} FROM webhooks
                 WHERE instance_id = ?1 AND event = ?2 AND enabled = 1
                 ORDER BY created_at ASC"
            ))?;
            let rows = stmt.query_map(params![instance_id, event], row_to_webhook)?;
            let mut webhooks = Vec::new();
            for row in rows {
                webhooks.push(row?);
            }
            Ok(webhooks)
        })
        .await
        .map_err(map_tr_err)
}

/// Patch a webhook's event, url and/or enabled flag.
pub async fn update_webhook(
    db: &Database,
    id: &str,
    event: Option<String>,
    url: Option<String>,
    enabled: Option<bool>,
) -> Result<(), WahubError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            if let Some(event) = event {
                conn.execute(
                    "UPDATE webhooks SET event = ?1 WHERE id = ?2",
                    params![event, id],
                )?;
            }
            if let Some(url) = url {
                conn.execute(
                    "UPDATE webhooks SET url = ?1 WHERE id = ?2",
                    params![url, id],
                )?;
            }
            if let Some(enabled) = enabled {
                conn.execute(
                    "UPDATE webhooks SET enabled = ?1 WHERE id = ?2",
                    params![enabled, id],
                )?;
            }
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Delete a webhook by id. Returns whether a row was removed.
pub async fn delete_webhook(db: &Database, id: &str) -> Result<bool, WahubError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let affected = conn.execute("DELETE FROM webhooks WHERE id = ?1", params![id])?;
            Ok(affected > 0)
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

    fn make_webhook(instance_id: &str, event: &str, enabled: bool) -> WebhookRecord {
        WebhookRecord {
            id: uuid::Uuid::new_v4().to_string(),
            instance_id: instance_id.to_string(),
            kind: "http".to_string(),
            event: event.to_string(),
            url: "http://127.0.0.1:9/hook".to_string(),
            enabled,
            created_at: now_iso(),
        }
    }

    #[tokio::test]
    async fn create_get_delete_roundtrip() {
        let (db, _dir, instance_id) = setup_db_with_instance().await;
        let webhook = make_webhook(&instance_id, "message.received", true);

        create_webhook(&db, &webhook).await.unwrap();
        let retrieved = get_webhook(&db, &webhook.id).await.unwrap().unwrap();
        assert_eq!(retrieved.event, "message.received");
        assert!(retrieved.enabled);

        assert!(delete_webhook(&db, &webhook.id).await.unwrap());
        assert!(get_webhook(&db, &webhook.id).await.unwrap().is_none());
        assert!(!delete_webhook(&db, &webhook.id).await.unwrap());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn enabled_for_event_excludes_disabled_and_other_events() {
        let (db, _dir, instance_id) = setup_db_with_instance().await;
        create_webhook(&db, &make_webhook(&instance_id, "message.received", true))
            .await
            .unwrap();
        create_webhook(&db, &make_webhook(&instance_id, "message.received", false))
            .await
            .unwrap();
        create_webhook(&db, &make_webhook(&instance_id, "connection.update", true))
            .await
            .unwrap();

        let matching = list_enabled_for_event(&db, &instance_id, "message.received")
            .await
            .unwrap();
        assert_eq!(matching.len(), 1);
        assert!(matching[0].enabled);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn update_toggles_enabled() {
        let (db, _dir, instance_id) = setup_db_with_instance().await;
        let webhook = make_webhook(&instance_id, "message.sent", true);
        create_webhook(&db, &webhook).await.unwrap();

        update_webhook(&db, &webhook.id, None, None, Some(false))
            .await
            .unwrap();
        let retrieved = get_webhook(&db, &webhook.id).await.unwrap().unwrap();
        assert!(!retrieved.enabled);
        assert_eq!(retrieved.url, webhook.url);
        db.close().await.unwrap();
    }
}
