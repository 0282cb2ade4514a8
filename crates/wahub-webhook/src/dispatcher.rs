// SPDX-FileCopyrightText: 2026 Wahub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook dispatcher: delivers typed events to every enabled subscription
//! and records one history row per attempt.
//!
//! Deliveries for the same event run concurrently with no ordering among
//! them, and there is no retry: one attempt, full history. A history write
//! failure is logged and never masks the delivery outcome.

use std::time::{Duration, Instant};

use futures::future::join_all;
use serde_json::json;
use tracing::{debug, error, warn};

use wahub_core::types::DeliveryStatus;
use wahub_core::EventKind;
use wahub_storage::models::{WebhookHistoryRecord, WebhookRecord};
use wahub_storage::queries::{history, webhooks};
use wahub_storage::{now_iso, Database};

/// User agent sent with every delivery.
pub const USER_AGENT: &str = concat!("wahub/", env!("CARGO_PKG_VERSION"));

/// Default total per-delivery timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Response bodies are snapshotted up to this many bytes.
const MAX_BODY_SNAPSHOT: usize = 4 * 1024;

/// Per-instance webhook fan-out.
pub struct WebhookDispatcher {
    db: Database,
    instance_id: String,
    phone: String,
    client: reqwest::Client,
    timeout: Duration,
}

impl WebhookDispatcher {
    /// Dispatcher with the default 5-second delivery timeout.
    pub fn new(db: Database, instance_id: &str, phone: &str) -> Self {
        Self::with_timeout(db, instance_id, phone, DEFAULT_TIMEOUT)
    }

    /// Dispatcher with an explicit delivery timeout.
    pub fn with_timeout(
        db: Database,
        instance_id: &str,
        phone: &str,
        timeout: Duration,
    ) -> Self {
        Self {
            db,
            instance_id: instance_id.to_string(),
            phone: phone.to_string(),
            client: reqwest::Client::new(),
            timeout,
        }
    }

    /// Deliver `event` to every enabled matching subscription.
    ///
    /// Returns the outcome of each attempt. Never fails: subscription lookup
    /// errors are logged and produce no attempts.
    pub async fn emit(&self, event: EventKind, data: serde_json::Value) -> Vec<DeliveryStatus> {
        let subscriptions = match webhooks::list_enabled_for_event(
            &self.db,
            &self.instance_id,
            event.as_str(),
        )
        .await
        {
            Ok(subs) => subs,
            Err(e) => {
                error!(
                    phone = %self.phone,
                    event = %event,
                    error = %e,
                    "webhook subscription lookup failed"
                );
                return Vec::new();
            }
        };

        if subscriptions.is_empty() {
            return Vec::new();
        }

        let payload = json!({
            "event": event.as_str(),
            "data": data,
            "timestamp": now_iso(),
            "instanceId": self.instance_id,
        });
        debug!(
            phone = %self.phone,
            event = %event,
            subscriptions = subscriptions.len(),
            "dispatching webhook event"
        );

        let attempts = subscriptions
            .into_iter()
            .map(|sub| self.deliver(sub, event, payload.clone()));
        join_all(attempts).await
    }

    async fn deliver(
        &self,
        subscription: WebhookRecord,
        event: EventKind,
        payload: serde_json::Value,
    ) -> DeliveryStatus {
        let triggered_at = now_iso();
        let started = Instant::now();

        let result = self
            .client
            .post(&subscription.url)
            .header("Content-Type", "application/json")
            .header("User-Agent", USER_AGENT)
            .timeout(self.timeout)
            .json(&payload)
            .send()
            .await;

        let elapsed_ms = started.elapsed().as_millis() as i64;

        let (status, http_status, response_body, error_message) = match result {
            Ok(response) => {
                let code = response.status();
                let body = response.text().await.unwrap_or_default();
                let snapshot = truncate(&body, MAX_BODY_SNAPSHOT);
                if code.is_success() {
                    (DeliveryStatus::Success, Some(code.as_u16() as i64), Some(snapshot), None)
                } else {
                    (
                        DeliveryStatus::Failed,
                        Some(code.as_u16() as i64),
                        Some(snapshot),
                        Some(format!("endpoint returned {code}")),
                    )
                }
            }
            Err(e) if e.is_timeout() => (
                DeliveryStatus::Timeout,
                None,
                None,
                Some(format!(
                    "delivery timed out after {}ms",
                    self.timeout.as_millis()
                )),
            ),
            Err(e) => (DeliveryStatus::Failed, None, None, Some(e.to_string())),
        };

        match status {
            DeliveryStatus::Success => {
                debug!(
                    phone = %self.phone,
                    event = %event,
                    url = %subscription.url,
                    elapsed_ms,
                    "webhook delivered"
                );
            }
            _ => {
                warn!(
                    phone = %self.phone,
                    event = %event,
                    url = %subscription.url,
                    status = %status,
                    error = error_message.as_deref().unwrap_or(""),
                    "webhook delivery failed"
                );
            }
        }

        let record = WebhookHistoryRecord {
            id: uuid::Uuid::new_v4().to_string(),
            instance_id: self.instance_id.clone(),
            webhook_id: subscription.id,
            event: event.as_str().to_string(),
            payload: payload.to_string(),
            status: status.to_string(),
            http_status,
            response_time_ms: Some(elapsed_ms),
            response_body,
            error_message,
            retry_count: 0,
            triggered_at,
            completed_at: Some(now_iso()),
        };
        if let Err(e) = history::insert_history(&self.db, &record).await {
            error!(
                phone = %self.phone,
                event = %event,
                error = %e,
                "failed to record webhook history"
            );
        }

        status
    }
}

fn truncate(body: &str, max: usize) -> String {
    if body.len() <= max {
        return body.to_string();
    }
    let mut end = max;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}… [truncated {} bytes]", &body[..end], body.len() - end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::post;
    use axum::Router;
    use tempfile::tempdir;
    use wahub_storage::models::InstanceRecord;
    use wahub_storage::queries::{history::HistoryFilter, instances};

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        instances::create_instance(
            &db,
            &InstanceRecord {
                id: "inst-1".to_string(),
                phone: "628123".to_string(),
                name: "I1".to_string(),
                alias: None,
                status: "active".to_string(),
                plugins: "{}".to_string(),
                created_at: now_iso(),
                updated_at: now_iso(),
            },
        )
        .await
        .unwrap();
        (db, dir)
    }

    /// Bind a throwaway receiver with ok/fail/slow endpoints, returning its
    /// base URL.
    async fn spawn_receiver() -> String {
        let app = Router::new()
            .route("/ok", post(|| async { "received" }))
            .route(
                "/fail",
                post(|| async { (axum::http::StatusCode::INTERNAL_SERVER_ERROR, "nope") }),
            )
            .route(
                "/slow",
                post(|| async {
                    tokio::time::sleep(Duration::from_secs(2)).await;
                    "late"
                }),
            );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    async fn subscribe(db: &Database, url: &str, event: &str, enabled: bool) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        webhooks::create_webhook(
            db,
            &WebhookRecord {
                id: id.clone(),
                instance_id: "inst-1".to_string(),
                kind: "http".to_string(),
                event: event.to_string(),
                url: url.to_string(),
                enabled,
                created_at: now_iso(),
            },
        )
        .await
        .unwrap();
        id
    }

    #[tokio::test]
    async fn success_records_2xx_history_row() {
        let (db, _dir) = setup_db().await;
        let base = spawn_receiver().await;
        subscribe(&db, &format!("{base}/ok"), "message.received", true).await;

        let dispatcher = WebhookDispatcher::new(db.clone(), "inst-1", "628123");
        let outcomes = dispatcher
            .emit(EventKind::MessageReceived, json!({"from": "629"}))
            .await;
        assert_eq!(outcomes, vec![DeliveryStatus::Success]);

        let rows = history::list_history(&db, HistoryFilter::default(), 10)
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status, "success");
        assert_eq!(rows[0].http_status, Some(200));
        assert_eq!(rows[0].response_body.as_deref(), Some("received"));
        assert!(rows[0].error_message.is_none());
        assert!(rows[0].completed_at.as_ref().unwrap() >= &rows[0].triggered_at);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn one_row_per_subscription_mixed_outcomes() {
        let (db, _dir) = setup_db().await;
        let base = spawn_receiver().await;
        subscribe(&db, &format!("{base}/ok"), "message.received", true).await;
        subscribe(&db, &format!("{base}/slow"), "message.received", true).await;

        let dispatcher = WebhookDispatcher::with_timeout(
            db.clone(),
            "inst-1",
            "628123",
            Duration::from_millis(500),
        );
        let outcomes = dispatcher
            .emit(EventKind::MessageReceived, json!({"from": "629"}))
            .await;
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.contains(&DeliveryStatus::Success));
        assert!(outcomes.contains(&DeliveryStatus::Timeout));

        let rows = history::list_history(&db, HistoryFilter::default(), 10)
            .await
            .unwrap();
        assert_eq!(rows.len(), 2, "exactly one history row per subscription");

        let timeout_row = rows.iter().find(|r| r.status == "timeout").unwrap();
        assert!(timeout_row.http_status.is_none());
        assert!(timeout_row
            .error_message
            .as_ref()
            .unwrap()
            .contains("timed out"));
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn non_2xx_is_failed_with_status_and_body() {
        let (db, _dir) = setup_db().await;
        let base = spawn_receiver().await;
        subscribe(&db, &format!("{base}/fail"), "connection.update", true).await;

        let dispatcher = WebhookDispatcher::new(db.clone(), "inst-1", "628123");
        let outcomes = dispatcher
            .emit(EventKind::ConnectionUpdate, json!({"status": "connected"}))
            .await;
        assert_eq!(outcomes, vec![DeliveryStatus::Failed]);

        let rows = history::list_history(&db, HistoryFilter::default(), 10)
            .await
            .unwrap();
        assert_eq!(rows[0].http_status, Some(500));
        assert_eq!(rows[0].response_body.as_deref(), Some("nope"));
        assert!(rows[0].error_message.as_ref().unwrap().contains("500"));
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_failed_without_status() {
        let (db, _dir) = setup_db().await;
        // Nothing listens on this port.
        subscribe(&db, "http://127.0.0.1:1/hook", "message.sent", true).await;

        let dispatcher = WebhookDispatcher::new(db.clone(), "inst-1", "628123");
        let outcomes = dispatcher.emit(EventKind::MessageSent, json!({})).await;
        assert_eq!(outcomes, vec![DeliveryStatus::Failed]);

        let rows = history::list_history(&db, HistoryFilter::default(), 10)
            .await
            .unwrap();
        assert_eq!(rows[0].status, "failed");
        assert!(rows[0].http_status.is_none());
        assert!(rows[0].error_message.is_some());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn disabled_and_mismatched_subscriptions_are_skipped() {
        let (db, _dir) = setup_db().await;
        let base = spawn_receiver().await;
        subscribe(&db, &format!("{base}/ok"), "message.received", false).await;
        subscribe(&db, &format!("{base}/ok"), "connection.update", true).await;

        let dispatcher = WebhookDispatcher::new(db.clone(), "inst-1", "628123");
        let outcomes = dispatcher
            .emit(EventKind::MessageReceived, json!({}))
            .await;
        assert!(outcomes.is_empty());

        let rows = history::list_history(&db, HistoryFilter::default(), 10)
            .await
            .unwrap();
        assert!(rows.is_empty());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn payload_carries_envelope_shape() {
        let (db, _dir) = setup_db().await;
        let base = spawn_receiver().await;
        subscribe(&db, &format!("{base}/ok"), "message.received", true).await;

        let dispatcher = WebhookDispatcher::new(db.clone(), "inst-1", "628123");
        dispatcher
            .emit(EventKind::MessageReceived, json!({"text": "hi"}))
            .await;

        let rows = history::list_history(&db, HistoryFilter::default(), 10)
            .await
            .unwrap();
        let payload: serde_json::Value = serde_json::from_str(&rows[0].payload).unwrap();
        assert_eq!(payload["event"], "message.received");
        assert_eq!(payload["data"]["text"], "hi");
        assert_eq!(payload["instanceId"], "inst-1");
        assert!(payload["timestamp"].as_str().unwrap().ends_with('Z'));
        db.close().await.unwrap();
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        let body = "aé".repeat(4000);
        let snapshot = truncate(&body, 100);
        assert!(snapshot.contains("[truncated"));
        assert!(snapshot.len() < body.len());
    }
}
