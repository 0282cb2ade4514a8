// SPDX-FileCopyrightText: 2026 Wahub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-instance plugin enablement endpoints.
//!
//! Plugin state lives on the resident instance; these endpoints require the
//! instance to be in memory and persist every change back to the store.

use std::collections::HashMap;

use axum::extract::{Path, State};
use axum::Json;
use serde_json::json;

use wahub_core::WahubError;

use crate::envelope::{ok, ok_with_message, ApiResult};
use crate::server::GatewayState;

fn resident(
    state: &GatewayState,
    phone: &str,
) -> Result<std::sync::Arc<wahub_instance::Instance>, WahubError> {
    state
        .manager
        .get(phone)
        .ok_or_else(|| WahubError::instance_not_found(phone))
}

/// GET /v1/instances/{phone}/plugins
pub async fn list(State(state): State<GatewayState>, Path(phone): Path<String>) -> ApiResult {
    let instance = resident(&state, &phone)?;
    Ok(ok(instance.chain().status().await))
}

/// POST /v1/instances/{phone}/plugins/{name}/enable
pub async fn enable(
    State(state): State<GatewayState>,
    Path((phone, name)): Path<(String, String)>,
) -> ApiResult {
    let instance = resident(&state, &phone)?;
    instance.chain().enable(&name).await?;
    state.manager.persist_plugins(&phone).await?;
    Ok(ok_with_message(json!({"plugin": name}), "plugin enabled"))
}

/// POST /v1/instances/{phone}/plugins/{name}/disable
pub async fn disable(
    State(state): State<GatewayState>,
    Path((phone, name)): Path<(String, String)>,
) -> ApiResult {
    let instance = resident(&state, &phone)?;
    instance.chain().disable(&name).await?;
    state.manager.persist_plugins(&phone).await?;
    Ok(ok_with_message(json!({"plugin": name}), "plugin disabled"))
}

/// PUT /v1/instances/{phone}/plugins
pub async fn set_map(
    State(state): State<GatewayState>,
    Path(phone): Path<String>,
    Json(map): Json<HashMap<String, bool>>,
) -> ApiResult {
    let instance = resident(&state, &phone)?;
    instance.chain().set_map(map).await;
    state.manager.persist_plugins(&phone).await?;
    Ok(ok(instance.chain().status().await))
}

/// POST /v1/instances/{phone}/plugins/sync
pub async fn sync(State(state): State<GatewayState>, Path(phone): Path<String>) -> ApiResult {
    state.manager.sync_plugins(&phone).await?;
    let instance = resident(&state, &phone)?;
    Ok(ok(instance.chain().status().await))
}

/// POST /v1/plugins/reload
///
/// Re-runs the compiled-in plugin constructors. The catalog is fixed at
/// process start; per-instance overrides are untouched.
pub async fn reload(State(state): State<GatewayState>) -> ApiResult {
    state.manager.registry().reload();
    Ok(ok(json!({"plugins": state.manager.registry().names()})))
}
