// SPDX-FileCopyrightText: 2026 Wahub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Control-plane HTTP server built on axum.
//!
//! Sets up routes, auth middleware, and shared state. The manager is an
//! explicit value handed in at construction; handlers reach everything
//! through it.

use std::sync::Arc;

use axum::{
    middleware as axum_middleware,
    routing::{delete, get, patch, post, put},
    Router,
};
use tower_http::cors::CorsLayer;
use tracing::info;

use wahub_core::WahubError;
use wahub_instance::InstanceManager;

use crate::auth::{auth_middleware, AuthConfig};
use crate::handlers::{instances, messages, plugins, webhooks};

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    /// The process-wide instance manager.
    pub manager: Arc<InstanceManager>,
}

/// Gateway server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host address to bind.
    pub host: String,
    /// Port to bind.
    pub port: u16,
    /// Bearer token for auth (None = auth disabled).
    pub bearer_token: Option<String>,
}

/// Build the full control-API router.
pub fn router(state: GatewayState, auth: AuthConfig) -> Router {
    // Unauthenticated public route for liveness probes.
    let public_routes = Router::new().route("/health", get(instances::health));

    let api_routes = Router::new()
        .route("/v1/instances", get(instances::list))
        .route("/v1/instances", post(instances::create))
        .route("/v1/instances/{phone}", get(instances::get))
        .route("/v1/instances/{phone}", patch(instances::update))
        .route("/v1/instances/{phone}", delete(instances::delete))
        .route("/v1/instances/{phone}/restart", post(instances::restart))
        .route("/v1/instances/{phone}/connection", get(instances::connection))
        .route("/v1/instances/{phone}/ping", get(instances::ping))
        .route("/v1/instances/{phone}/logs", get(instances::list_logs))
        .route("/v1/instances/{phone}/messages", get(instances::list_messages))
        .route("/v1/instances/{phone}/messages/text", post(messages::send_text))
        .route("/v1/instances/{phone}/messages/group", post(messages::send_group))
        .route("/v1/instances/{phone}/messages/media", post(messages::send_media))
        .route("/v1/instances/{phone}/plugins", get(plugins::list))
        .route("/v1/instances/{phone}/plugins", put(plugins::set_map))
        .route("/v1/instances/{phone}/plugins/sync", post(plugins::sync))
        .route("/v1/instances/{phone}/plugins/{name}/enable", post(plugins::enable))
        .route("/v1/instances/{phone}/plugins/{name}/disable", post(plugins::disable))
        .route("/v1/instances/{phone}/webhooks", get(webhooks::list))
        .route("/v1/instances/{phone}/webhooks", post(webhooks::create))
        .route("/v1/instances/{phone}/webhooks/history", get(webhooks::instance_history))
        .route("/v1/instances/{phone}/webhooks/stats", get(webhooks::instance_stats))
        .route("/v1/instances/{phone}/webhooks/{id}", patch(webhooks::update))
        .route("/v1/instances/{phone}/webhooks/{id}", delete(webhooks::delete))
        .route("/v1/webhooks/history", get(webhooks::global_history))
        .route("/v1/webhooks/history/{id}", get(webhooks::history_by_id))
        .route("/v1/webhooks/stats", get(webhooks::global_stats))
        .route("/v1/webhooks/failures", get(webhooks::recent_failures))
        .route("/v1/webhooks/cleanup", post(webhooks::cleanup))
        .route("/v1/plugins/reload", post(plugins::reload))
        .route("/v1/status", get(instances::manager_status))
        .route_layer(axum_middleware::from_fn_with_state(auth, auth_middleware))
        .with_state(state.clone());

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .layer(CorsLayer::permissive())
}

/// Start the control-plane server and serve until the listener dies.
pub async fn start_server(
    config: &ServerConfig,
    manager: Arc<InstanceManager>,
) -> Result<(), WahubError> {
    let state = GatewayState { manager };
    let auth = AuthConfig {
        bearer_token: config.bearer_token.clone(),
    };
    let app = router(state, auth);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| WahubError::Internal(format!("failed to bind gateway to {addr}: {e}")))?;

    info!("control API listening on {addr}");

    axum::serve(listener, app)
        .await
        .map_err(|e| WahubError::Internal(format!("gateway server error: {e}")))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_config_debug() {
        let config = ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 8080,
            bearer_token: None,
        };
        let debug = format!("{config:?}");
        assert!(debug.contains("127.0.0.1"));
    }
}
