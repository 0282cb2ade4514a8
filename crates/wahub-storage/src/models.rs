// SPDX-FileCopyrightText: 2026 Wahub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain model types for storage entities.
//!
//! These types represent the rows stored in the SQLite database. Enumerated
//! columns (status, direction, kind, level) are stored as their snake_case
//! strings; the canonical enums live in `wahub-core::types`.

use serde::{Deserialize, Serialize};

/// A tenant instance row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceRecord {
    /// Unique instance identifier.
    pub id: String,
    /// Phone number the instance is keyed by (digits only, unique).
    pub phone: String,
    /// Display name.
    pub name: String,
    /// Optional alias.
    pub alias: Option<String>,
    /// Lifecycle status string.
    pub status: String,
    /// Plugin override map as a JSON object (name -> bool).
    pub plugins: String,
    /// ISO 8601 creation timestamp.
    pub created_at: String,
    /// ISO 8601 last-update timestamp.
    pub updated_at: String,
}

/// A stored chat message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageRecord {
    /// Unique message identifier.
    pub id: String,
    /// Instance this message belongs to.
    pub instance_id: String,
    /// Direction: "incoming" or "outgoing".
    pub direction: String,
    /// Sender JID.
    pub from_jid: String,
    /// Recipient JID.
    pub to_jid: String,
    /// Content kind: "text", "image", "video", "audio", "document", "other".
    pub kind: String,
    /// JSON content payload (text, push_name, upstream id/timestamp, raw envelope).
    pub content: String,
    /// Delivery status string.
    pub status: String,
    /// ISO 8601 send timestamp, when known.
    pub sent_at: Option<String>,
    /// ISO 8601 creation timestamp.
    pub created_at: String,
}

/// A webhook subscription row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookRecord {
    /// Unique webhook identifier.
    pub id: String,
    /// Instance this subscription belongs to.
    pub instance_id: String,
    /// Delivery kind; only "http" is currently defined.
    pub kind: String,
    /// Event name the subscription matches (e.g. "message.received").
    pub event: String,
    /// Target URL for delivery.
    pub url: String,
    /// Whether the subscription is active.
    pub enabled: bool,
    /// ISO 8601 creation timestamp.
    pub created_at: String,
}

/// One webhook delivery attempt, immutable after completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookHistoryRecord {
    /// Unique history row identifier.
    pub id: String,
    /// Instance the delivery belongs to.
    pub instance_id: String,
    /// Webhook subscription that was targeted.
    pub webhook_id: String,
    /// Event name that was delivered.
    pub event: String,
    /// JSON snapshot of the delivered payload.
    pub payload: String,
    /// Outcome: "pending", "success", "failed", "timeout".
    pub status: String,
    /// HTTP status code, when a response was received.
    pub http_status: Option<i64>,
    /// Wall-clock delivery duration in milliseconds.
    pub response_time_ms: Option<i64>,
    /// Response body snapshot, when a response was received.
    pub response_body: Option<String>,
    /// Error description for failed or timed-out attempts.
    pub error_message: Option<String>,
    /// Retry counter; always 0 (no retry policy).
    pub retry_count: i64,
    /// ISO 8601 timestamp taken just before dispatch.
    pub triggered_at: String,
    /// ISO 8601 timestamp taken at attempt completion.
    pub completed_at: Option<String>,
}

/// An append-only per-instance log entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceLogRecord {
    /// Unique log entry identifier.
    pub id: String,
    /// Instance the entry belongs to.
    pub instance_id: String,
    /// Severity: "debug", "info", "warn", "error".
    pub level: String,
    /// Log message.
    pub message: String,
    /// ISO 8601 creation timestamp.
    pub created_at: String,
}

/// Aggregate delivery statistics for webhook history queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookStats {
    /// Row counts grouped by status string.
    pub by_status: Vec<(String, i64)>,
    /// Row counts grouped by event name.
    pub by_event: Vec<(String, i64)>,
    /// Mean response time over completed attempts, in milliseconds.
    pub avg_response_time_ms: Option<f64>,
    /// Total successful attempts.
    pub success_count: i64,
    /// Total failed or timed-out attempts.
    pub failure_count: i64,
}
