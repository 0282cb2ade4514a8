// SPDX-FileCopyrightText: 2026 Wahub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook subscription CRUD, delivery history, statistics, and the
//! retention cleanup trigger.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use wahub_core::WahubError;
use wahub_storage::models::WebhookRecord;
use wahub_storage::now_iso;
use wahub_storage::queries::history::{self, HistoryFilter};
use wahub_storage::queries::webhooks;

use crate::envelope::{created, ok, ok_with_message, ApiResult};
use crate::server::GatewayState;

/// Request body for POST /v1/instances/{phone}/webhooks.
#[derive(Debug, Deserialize)]
pub struct CreateWebhookRequest {
    /// Delivery kind; only "http" is currently defined.
    #[serde(default = "default_kind")]
    pub kind: String,
    /// Event name to subscribe to (e.g. "message.received").
    pub event: String,
    /// Target URL for delivery.
    pub url: String,
    /// Whether the subscription starts enabled.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_kind() -> String {
    "http".to_string()
}

/// Request body for PATCH /v1/instances/{phone}/webhooks/{id}.
#[derive(Debug, Deserialize)]
pub struct UpdateWebhookRequest {
    #[serde(default)]
    pub event: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub enabled: Option<bool>,
}

fn default_enabled() -> bool {
    true
}

fn validate_url(url: &str) -> Result<(), WahubError> {
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(WahubError::BadInput(format!(
            "webhook url must be http(s), got {url:?}"
        )));
    }
    Ok(())
}

fn validate_event(event: &str) -> Result<(), WahubError> {
    if event.trim().is_empty() {
        return Err(WahubError::BadInput("event must not be empty".into()));
    }
    Ok(())
}

/// GET /v1/instances/{phone}/webhooks
pub async fn list(State(state): State<GatewayState>, Path(phone): Path<String>) -> ApiResult {
    let view = state.manager.view(&phone).await?;
    let rows = webhooks::list_webhooks(state.manager.db(), &view.id).await?;
    Ok(ok(rows))
}

/// POST /v1/instances/{phone}/webhooks
pub async fn create(
    State(state): State<GatewayState>,
    Path(phone): Path<String>,
    Json(body): Json<CreateWebhookRequest>,
) -> ApiResult {
    validate_event(&body.event)?;
    validate_url(&body.url)?;
    let view = state.manager.view(&phone).await?;

    if body.kind != "http" {
        return Err(WahubError::BadInput(format!(
            "unsupported webhook kind {:?}",
            body.kind
        ))
        .into());
    }
    let record = WebhookRecord {
        id: uuid::Uuid::new_v4().to_string(),
        instance_id: view.id,
        kind: body.kind,
        event: body.event,
        url: body.url,
        enabled: body.enabled,
        created_at: now_iso(),
    };
    webhooks::create_webhook(state.manager.db(), &record).await?;
    Ok(created(record))
}

/// PATCH /v1/instances/{phone}/webhooks/{id}
pub async fn update(
    State(state): State<GatewayState>,
    Path((phone, id)): Path<(String, String)>,
    Json(body): Json<UpdateWebhookRequest>,
) -> ApiResult {
    if let Some(ref event) = body.event {
        validate_event(event)?;
    }
    if let Some(ref url) = body.url {
        validate_url(url)?;
    }
    state.manager.view(&phone).await?;
    let existing = webhooks::get_webhook(state.manager.db(), &id)
        .await?
        .ok_or_else(|| WahubError::NotFound {
            resource: "webhook".into(),
            key: id.clone(),
        })?;

    webhooks::update_webhook(state.manager.db(), &id, body.event, body.url, body.enabled)
        .await?;
    let updated = webhooks::get_webhook(state.manager.db(), &id)
        .await?
        .unwrap_or(existing);
    Ok(ok(updated))
}

/// DELETE /v1/instances/{phone}/webhooks/{id}
pub async fn delete(
    State(state): State<GatewayState>,
    Path((phone, id)): Path<(String, String)>,
) -> ApiResult {
    state.manager.view(&phone).await?;
    let removed = webhooks::delete_webhook(state.manager.db(), &id).await?;
    if !removed {
        return Err(WahubError::NotFound {
            resource: "webhook".into(),
            key: id,
        }
        .into());
    }
    Ok(ok_with_message(json!({"id": id}), "webhook deleted"))
}

/// Query string for history listings.
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub event: Option<String>,
    #[serde(default)]
    pub since: Option<String>,
    #[serde(default)]
    pub until: Option<String>,
    #[serde(default = "default_history_limit")]
    pub limit: i64,
}

fn default_history_limit() -> i64 {
    100
}

impl HistoryQuery {
    fn into_filter(self, instance_id: Option<String>) -> HistoryFilter {
        HistoryFilter {
            instance_id,
            status: self.status,
            event: self.event,
            since: self.since,
            until: self.until,
        }
    }
}

/// GET /v1/instances/{phone}/webhooks/history
pub async fn instance_history(
    State(state): State<GatewayState>,
    Path(phone): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> ApiResult {
    let view = state.manager.view(&phone).await?;
    let limit = query.limit;
    let rows = history::list_history(
        state.manager.db(),
        query.into_filter(Some(view.id)),
        limit,
    )
    .await?;
    Ok(ok(rows))
}

/// GET /v1/webhooks/history (global)
pub async fn global_history(
    State(state): State<GatewayState>,
    Query(query): Query<HistoryQuery>,
) -> ApiResult {
    let limit = query.limit;
    let rows = history::list_history(state.manager.db(), query.into_filter(None), limit).await?;
    Ok(ok(rows))
}

/// GET /v1/webhooks/history/{id}
pub async fn history_by_id(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> ApiResult {
    let row = history::get_history(state.manager.db(), &id)
        .await?
        .ok_or_else(|| WahubError::NotFound {
            resource: "webhook history".into(),
            key: id,
        })?;
    Ok(ok(row))
}

/// GET /v1/instances/{phone}/webhooks/stats
pub async fn instance_stats(
    State(state): State<GatewayState>,
    Path(phone): Path<String>,
) -> ApiResult {
    let view = state.manager.view(&phone).await?;
    let stats = history::stats(state.manager.db(), Some(view.id)).await?;
    Ok(ok(stats))
}

/// GET /v1/webhooks/stats (global)
pub async fn global_stats(State(state): State<GatewayState>) -> ApiResult {
    let stats = history::stats(state.manager.db(), None).await?;
    Ok(ok(stats))
}

/// Query string for the failures listing.
#[derive(Debug, Deserialize)]
pub struct FailuresQuery {
    #[serde(default = "default_failures_limit")]
    pub limit: i64,
}

fn default_failures_limit() -> i64 {
    50
}

/// GET /v1/webhooks/failures
///
/// Recent failed or timed-out delivery attempts across all instances,
/// newest first.
pub async fn recent_failures(
    State(state): State<GatewayState>,
    Query(query): Query<FailuresQuery>,
) -> ApiResult {
    let rows = history::recent_failures(state.manager.db(), query.limit).await?;
    Ok(ok(rows))
}

/// Request body for POST /v1/webhooks/cleanup.
#[derive(Debug, Deserialize)]
pub struct CleanupRequest {
    /// Delete rows older than this many minutes.
    pub max_age_minutes: i64,
}

/// POST /v1/webhooks/cleanup
pub async fn cleanup(
    State(state): State<GatewayState>,
    Json(body): Json<CleanupRequest>,
) -> ApiResult {
    if body.max_age_minutes < 0 {
        return Err(WahubError::BadInput("max_age_minutes must be non-negative".into()).into());
    }
    let cutoff = (chrono::Utc::now() - chrono::Duration::minutes(body.max_age_minutes))
        .format("%Y-%m-%dT%H:%M:%S%.3fZ")
        .to_string();
    let report = state.manager.run_retention(&cutoff).await?;
    Ok(ok(report))
}
