// SPDX-FileCopyrightText: 2026 Wahub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Instance CRUD, lifecycle, connection snapshot, and log endpoints.

use axum::extract::{Path, Query, State};
use axum::Json;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use qrcode::render::svg;
use qrcode::QrCode;
use serde::Deserialize;
use serde_json::json;

use wahub_core::WahubError;
use wahub_storage::queries::{logs, messages};

use crate::envelope::{created, ok, ok_with_message, ApiResult};
use crate::server::GatewayState;

/// Request body for POST /v1/instances.
#[derive(Debug, Deserialize)]
pub struct CreateInstanceRequest {
    /// Phone number keying the instance; normalised to digits.
    pub phone: String,
    /// Display name.
    pub name: String,
    /// Optional alias.
    #[serde(default)]
    pub alias: Option<String>,
}

/// Request body for PATCH /v1/instances/{phone}.
#[derive(Debug, Deserialize)]
pub struct UpdateInstanceRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub alias: Option<String>,
}

/// Query string for DELETE /v1/instances/{phone}.
#[derive(Debug, Deserialize)]
pub struct DeleteQuery {
    /// Keep the persisted row (soft-clean) instead of cascading.
    #[serde(default)]
    pub keep_record: bool,
}

/// GET /v1/instances
pub async fn list(State(state): State<GatewayState>) -> ApiResult {
    let views = state.manager.list_views().await?;
    Ok(ok(views))
}

/// POST /v1/instances
pub async fn create(
    State(state): State<GatewayState>,
    Json(body): Json<CreateInstanceRequest>,
) -> ApiResult {
    if body.name.trim().is_empty() {
        return Err(WahubError::BadInput("name must not be empty".into()).into());
    }
    let snapshot = state
        .manager
        .create(&body.phone, body.name.trim(), body.alias)
        .await?;
    Ok(created(snapshot))
}

/// GET /v1/instances/{phone}
pub async fn get(State(state): State<GatewayState>, Path(phone): Path<String>) -> ApiResult {
    let view = state.manager.view(&phone).await?;
    Ok(ok(view))
}

/// PATCH /v1/instances/{phone}
pub async fn update(
    State(state): State<GatewayState>,
    Path(phone): Path<String>,
    Json(body): Json<UpdateInstanceRequest>,
) -> ApiResult {
    let view = state.manager.update(&phone, body.name, body.alias).await?;
    Ok(ok(view))
}

/// DELETE /v1/instances/{phone}
pub async fn delete(
    State(state): State<GatewayState>,
    Path(phone): Path<String>,
    Query(query): Query<DeleteQuery>,
) -> ApiResult {
    state.manager.delete(&phone, query.keep_record).await?;
    Ok(ok_with_message(json!({"phone": phone}), "instance deleted"))
}

/// POST /v1/instances/{phone}/restart
pub async fn restart(
    State(state): State<GatewayState>,
    Path(phone): Path<String>,
) -> ApiResult {
    state.manager.restart(&phone).await?;
    Ok(ok_with_message(json!({"phone": phone}), "restart initiated"))
}

/// GET /v1/instances/{phone}/connection
///
/// The connection snapshot; when a pairing QR is pending it is also rendered
/// as a base64 SVG data URL.
pub async fn connection(
    State(state): State<GatewayState>,
    Path(phone): Path<String>,
) -> ApiResult {
    let view = state.manager.view(&phone).await?;
    let qr_image = view.qr_code.as_deref().map(render_qr).transpose()?;
    Ok(ok(json!({
        "phone": view.phone,
        "status": view.status,
        "is_connected": view.is_connected,
        "reconnect_attempts": view.reconnect_attempts,
        "user_id": view.user_id,
        "qr_code": view.qr_code,
        "qr_image": qr_image,
    })))
}

/// GET /v1/instances/{phone}/ping
pub async fn ping(State(state): State<GatewayState>, Path(phone): Path<String>) -> ApiResult {
    let view = state.manager.view(&phone).await?;
    Ok(ok(json!({
        "phone": view.phone,
        "status": view.status,
        "is_connected": view.is_connected,
    })))
}

/// Query string for log listing.
#[derive(Debug, Deserialize)]
pub struct LogsQuery {
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

/// GET /v1/instances/{phone}/logs
pub async fn list_logs(
    State(state): State<GatewayState>,
    Path(phone): Path<String>,
    Query(query): Query<LogsQuery>,
) -> ApiResult {
    let view = state.manager.view(&phone).await?;
    let entries = logs::list_logs(
        state.manager.db(),
        &view.id,
        query.level.as_deref(),
        query.limit,
    )
    .await?;
    Ok(ok(entries))
}

/// Query string for message listing.
#[derive(Debug, Deserialize)]
pub struct MessagesQuery {
    #[serde(default)]
    pub direction: Option<String>,
    /// When set, returns the ascending conversation with this contact.
    #[serde(default)]
    pub with: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

/// GET /v1/instances/{phone}/messages
pub async fn list_messages(
    State(state): State<GatewayState>,
    Path(phone): Path<String>,
    Query(query): Query<MessagesQuery>,
) -> ApiResult {
    let view = state.manager.view(&phone).await?;
    let rows = match query.with {
        Some(contact) => {
            messages::conversation(state.manager.db(), &view.id, &contact, query.limit).await?
        }
        None => {
            messages::list_messages(
                state.manager.db(),
                &view.id,
                query.direction.as_deref(),
                query.limit,
            )
            .await?
        }
    };
    Ok(ok(rows))
}

/// GET /v1/status
pub async fn manager_status(State(state): State<GatewayState>) -> ApiResult {
    let status = state.manager.status().await?;
    Ok(ok(status))
}

/// GET /health (public)
pub async fn health() -> axum::response::Response {
    ok(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

fn default_limit() -> i64 {
    50
}

fn render_qr(payload: &str) -> Result<String, WahubError> {
    let code = QrCode::new(payload.as_bytes())
        .map_err(|e| WahubError::Internal(format!("qr render failed: {e}")))?;
    let svg_xml = code
        .render::<svg::Color>()
        .min_dimensions(256, 256)
        .build();
    Ok(format!(
        "data:image/svg+xml;base64,{}",
        BASE64.encode(svg_xml)
    ))
}
