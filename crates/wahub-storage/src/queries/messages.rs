// SPDX-FileCopyrightText: 2026 Wahub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message CRUD and conversation queries.

use rusqlite::params;
use wahub_core::WahubError;

use crate::database::{map_tr_err, Database};
use crate::models::MessageRecord;

fn row_to_message(row: &rusqlite::Row<'_>) -> Result<MessageRecord, rusqlite::Error> {
    Ok(MessageRecord {
        id: row.get(0)?,
        instance_id: row.get(1)?,
        direction: row.get(2)?,
        from_jid: row.get(3)?,
        to_jid: row.get(4)?,
        kind: row.get(5)?,
        content: row.get(6)?,
        status: row.get(7)?,
        sent_at: row.get(8)?,
        created_at: row.get(9)?,
    })
}

const MESSAGE_COLUMNS: &str =
    "id, instance_id, direction, from_jid, to_jid, kind, content, status, sent_at, created_at";

/// Insert a new message row.
pub async fn insert_message(db: &Database, msg: &MessageRecord) -> Result<(), WahubError> {
    let msg = msg.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO messages (id, instance_id, direction, from_jid, to_jid, kind, content, status, sent_at, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    msg.id,
                    msg.instance_id,
                    msg.direction,
                    msg.from_jid,
                    msg.to_jid,
                    msg.kind,
                    msg.content,
                    msg.status,
                    msg.sent_at,
                    msg.created_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Get a message by id.
pub async fn get_message(
    db: &Database,
    id: &str,
) -> Result<Option<MessageRecord>, WahubError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = ?1"
            ))?;
            match stmt.query_row(params![id], row_to_message) {
                Ok(msg) => Ok(Some(msg)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// List recent messages for an instance, newest first, optionally filtered
/// by direction.
pub async fn list_messages(
    db: &Database,
    instance_id: &str,
    direction: Option<&str>,
    limit: i64,
) -> Result<Vec<MessageRecord>, WahubError> {
    let instance_id = instance_id.to_string();
    let direction = direction.map(|d| d.to_string());
    db.connection()
        .call(move |conn| {
            let mut messages = Vec::new();
            match &direction {
                Some(dir) => {
                    let mut stmt = conn.prepare(&format!(
                        "SELECT {MESSAGE_COLUMNS} FROM messages
                         WHERE instance_id = ?1 AND direction = ?2
                         ORDER BY created_at DESC LIMIT ?3"
                    ))?;
                    let rows = stmt.query_map(params![instance_id, dir, limit], row_to_message)?;
                    for row in rows {
                        messages.push(row?);
                    }
                }
                None => {
                    let mut stmt = conn.prepare(&format!(
                        "SELECT {MESSAGE_COLUMNS} FROM messages
                         WHERE instance_id = ?1
                         ORDER BY created_at DESC LIMIT ?2"
                    ))?;
                    let rows = stmt.query_map(params![instance_id, limit], row_to_message)?;
                    for row in rows {
                        messages.push(row?);
                    }
                }
            }
            Ok(messages)
        })
        .await
        .map_err(map_tr_err)
}

/// Conversation between an instance and one contact JID, ascending by
/// creation time.
pub async fn conversation(
    db: &Database,
    instance_id: &str,
    contact_jid: &str,
    limit: i64,
) -> Result<Vec<MessageRecord>, WahubError> {
    let instance_id = instance_id.to_string();
    let contact_jid = contact_jid.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {MESSAGE_COLUMNS} FROM messages
                 WHERE instance_id = ?1 AND (from_jid = ?2 OR to_jid = ?2)
                 ORDER BY created_at ASC LIMIT ?3"
            ))?;
            let rows = stmt.query_map(params![instance_id, contact_jid, limit], row_to_message)?;
            let mut messages = Vec::new();
            for row in rows {
                messages.push(row?);
            }
            Ok(messages)
        })
        .await
        .map_err(map_tr_err)
}

/// Update only the status column of a message.
pub async fn update_message_status(
    db: &Database,
    id: &str,
    status: &str,
) -> Result<(), WahubError> {
    let id = id.to_string();
    let status = status.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE messages SET status = ?1 WHERE id = ?2",
                params![status, id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Count messages for an instance.
pub async fn count_messages(db: &Database, instance_id: &str) -> Result<i64, WahubError> {
    let instance_id = instance_id.to_string();
    db.connection()
        .call(move |conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM messages WHERE instance_id = ?1",
                params![instance_id],
                |row| row.get(0),
            )?;
            Ok(count)
        })
        .await
        .map_err(map_tr_err)
}
