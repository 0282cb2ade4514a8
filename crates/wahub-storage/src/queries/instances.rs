// SPDX-FileCopyrightText: 2026 Wahub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Instance CRUD operations.

use rusqlite::params;
use wahub_core::WahubError;

use crate::database::{map_tr_err, now_iso, Database};
use crate::models::InstanceRecord;

fn row_to_instance(row: &rusqlite::Row<'_>) -> Result<InstanceRecord, rusqlite::Error> {
    Ok(InstanceRecord {
        id: row.get(0)?,
        phone: row.get(1)?,
        name: row.get(2)?,
        alias: row.get(3)?,
        status: row.get(4)?,
        plugins: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

const INSTANCE_COLUMNS: &str =
    "id, phone, name, alias, status, plugins, created_at, updated_at";

/// Create a new instance row.
pub async fn create_instance(
    db: &Database,
    record: &InstanceRecord,
) -> Result<(), WahubError> {
    let record = record.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO instances (id, phone, name, alias, status, plugins, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    record.id,
                    record.phone,
                    record.name,
                    record.alias,
                    record.status,
                    record.plugins,
                    record.created_at,
                    record.updated_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Get an instance by id.
pub async fn get_instance(
    db: &Database,
    id: &str,
) -> Result<Option<InstanceRecord>, WahubError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {INSTANCE_COLUMNS} FROM instances WHERE id = ?1"
            ))?;
            match stmt.query_row(params![id], row_to_instance) {
                Ok(record) => Ok(Some(record)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Get an instance by phone.
pub async fn get_instance_by_phone(
    db: &Database,
    phone: &str,
) -> Result<Option<InstanceRecord>, WahubError> {
    let phone = phone.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {INSTANCE_COLUMNS} FROM instances WHERE phone = ?1"
            ))?;
            match stmt.query_row(params![phone], row_to_instance) {
                Ok(record) => Ok(Some(record)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// List all instances, oldest first.
pub async fn list_instances(db: &Database) -> Result<Vec<InstanceRecord>, WahubError> {
    db.connection()
        .call(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {INSTANCE_COLUMNS} FROM instances ORDER BY created_at ASC"
            ))?;
            let rows = stmt.query_map([], row_to_instance)?;
            let mut records = Vec::new();
            for row in rows {
                records.push(row?);
            }
            Ok(records)
        })
        .await
        .map_err(map_tr_err)
}

/// Patch the name and/or alias of an instance.
pub async fn update_instance_profile(
    db: &Database,
    phone: &str,
    name: Option<String>,
    alias: Option<String>,
) -> Result<(), WahubError> {
    let phone = phone.to_string();
    let now = now_iso();
    db.connection()
        .call(move |conn| {
            if let Some(name) = name {
                conn.execute(
                    "UPDATE instances SET name = ?1, updated_at = ?2 WHERE phone = ?3",
                    params![name, now, phone],
                )?;
            }
            if let Some(alias) = alias {
                conn.execute(
                    "UPDATE instances SET alias = ?1, updated_at = ?2 WHERE phone = ?3",
                    params![alias, now, phone],
                )?;
            }
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Update only the status column.
pub async fn update_instance_status(
    db: &Database,
    phone: &str,
    status: &str,
) -> Result<(), WahubError> {
    let phone = phone.to_string();
    let status = status.to_string();
    let now = now_iso();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE instances SET status = ?1, updated_at = ?2 WHERE phone = ?3",
                params![status, now, phone],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Replace the plugin override map (JSON object string).
pub async fn update_instance_plugins(
    db: &Database,
    phone: &str,
    plugins_json: &str,
) -> Result<(), WahubError> {
    let phone = phone.to_string();
    let plugins_json = plugins_json.to_string();
    let now = now_iso();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE instances SET plugins = ?1, updated_at = ?2 WHERE phone = ?3",
                params![plugins_json, now, phone],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Delete an instance row and, when `cascade` is set, every dependent row.
pub async fn delete_instance(
    db: &Database,
    phone: &str,
    cascade: bool,
) -> Result<(), WahubError> {
    let phone = phone.to_string();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let id: Option<String> = {
                let mut stmt = tx.prepare("SELECT id FROM instances WHERE phone = ?1")?;
                match stmt.query_row(params![phone], |row| row.get(0)) {
                    Ok(id) => Some(id),
                    Err(rusqlite::Error::QueryReturnedNoRows) => None,
                    Err(e) => return Err(e.into()),
                }
            };
            if let Some(id) = id {
                if cascade {
                    tx.execute("DELETE FROM webhook_history WHERE instance_id = ?1", params![id])?;
                    tx.execute("DELETE FROM instance_logs WHERE instance_id = ?1", params![id])?;
                    tx.execute("DELETE FROM messages WHERE instance_id = ?1", params![id])?;
                    tx.execute("DELETE FROM webhooks WHERE instance_id = ?1", params![id])?;
                }
                tx.execute("DELETE FROM instances WHERE id = ?1", params![id])?;
            }
            tx.commit()?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Count all instance rows.
pub async fn count_instances(db: &Database) -> Result<i64, WahubError> {
    db.connection()
        .call(|conn| {
            let count: i64 =
                conn.query_row("SELECT COUNT(*) FROM instances", [], |row| row.get(0))?;
            Ok(count)
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    fn make_instance(phone: &str) -> InstanceRecord {
        InstanceRecord {
            id: uuid::Uuid::new_v4().to_string(),
            phone: phone.to_string(),
            name: format!("Instance {phone}"),
            alias: None,
            status: "pending".to_string(),
            plugins: "{}".to_string(),
            created_at: now_iso(),
            updated_at: now_iso(),
        }
    }

    #[tokio::test]
    async fn create_and_get_by_phone_roundtrips() {
        let (db, _dir) = setup_db().await;
        let record = make_instance("628123456789");

        create_instance(&db, &record).await.unwrap();
        let retrieved = get_instance_by_phone(&db, "628123456789")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(retrieved.id, record.id);
        assert_eq!(retrieved.status, "pending");
        assert_eq!(retrieved.plugins, "{}");

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn phone_is_unique() {
        let (db, _dir) = setup_db().await;
        create_instance(&db, &make_instance("628111")).await.unwrap();
        let duplicate = create_instance(&db, &make_instance("628111")).await;
        assert!(duplicate.is_err(), "duplicate phone must be rejected");
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn update_profile_patches_selected_fields() {
        let (db, _dir) = setup_db().await;
        create_instance(&db, &make_instance("628222")).await.unwrap();

        update_instance_profile(&db, "628222", Some("Renamed".into()), None)
            .await
            .unwrap();
        let record = get_instance_by_phone(&db, "628222").await.unwrap().unwrap();
        assert_eq!(record.name, "Renamed");
        assert!(record.alias.is_none());

        update_instance_profile(&db, "628222", None, Some("primary".into()))
            .await
            .unwrap();
        let record = get_instance_by_phone(&db, "628222").await.unwrap().unwrap();
        assert_eq!(record.name, "Renamed");
        assert_eq!(record.alias.as_deref(), Some("primary"));

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn status_update_touches_updated_at() {
        let (db, _dir) = setup_db().await;
        let record = make_instance("628333");
        create_instance(&db, &record).await.unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        update_instance_status(&db, "628333", "active").await.unwrap();

        let updated = get_instance_by_phone(&db, "628333").await.unwrap().unwrap();
        assert_eq!(updated.status, "active");
        assert!(updated.updated_at > record.updated_at);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn delete_without_cascade_keeps_nothing_of_the_row() {
        let (db, _dir) = setup_db().await;
        create_instance(&db, &make_instance("628444")).await.unwrap();

        delete_instance(&db, "628444", false).await.unwrap();
        assert!(get_instance_by_phone(&db, "628444").await.unwrap().is_none());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn list_and_count() {
        let (db, _dir) = setup_db().await;
        create_instance(&db, &make_instance("628555")).await.unwrap();
        create_instance(&db, &make_instance("628666")).await.unwrap();

        let all = list_instances(&db).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(count_instances(&db).await.unwrap(), 2);
        db.close().await.unwrap();
    }
}
