// SPDX-FileCopyrightText: 2026 Wahub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Control-API integration tests over a real listener: envelope shape,
//! error-to-status mapping, and bearer auth.

use std::sync::Arc;

use wahub_core::TransportFactory;
use wahub_gateway::{router, AuthConfig, GatewayState};
use wahub_instance::{InstanceManager, InstanceSettings};
use wahub_plugin::PluginRegistry;
use wahub_storage::Database;
use wahub_transport::{CredentialStore, MemoryTransportFactory};

struct Api {
    base: String,
    client: reqwest::Client,
    _dir: tempfile::TempDir,
}

async fn serve_api(bearer_token: Option<String>) -> Api {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open(dir.path().join("api.db").to_str().unwrap())
        .await
        .unwrap();
    let manager = InstanceManager::new(
        db,
        Arc::new(PluginRegistry::builtin()),
        Arc::new(MemoryTransportFactory::manual()) as Arc<dyn TransportFactory>,
        CredentialStore::new(dir.path().join("auth")),
        InstanceSettings::default(),
    );
    let app = router(GatewayState { manager }, AuthConfig { bearer_token });

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    Api {
        base: format!("http://{addr}"),
        client: reqwest::Client::new(),
        _dir: dir,
    }
}

#[tokio::test]
async fn create_list_get_roundtrip() {
    let api = serve_api(None).await;

    let response = api
        .client
        .post(format!("{}/v1/instances", api.base))
        .json(&serde_json::json!({"phone": "628123456789", "name": "I1"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["phone"], "628123456789");
    assert_eq!(body["data"]["status"], "connecting");

    let body: serde_json::Value = api
        .client
        .get(format!("{}/v1/instances", api.base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let body: serde_json::Value = api
        .client
        .get(format!("{}/v1/instances/628123456789", api.base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"]["name"], "I1");
}

#[tokio::test]
async fn error_statuses_follow_the_taxonomy() {
    let api = serve_api(None).await;

    // Unknown instance -> 404 with the envelope error code.
    let response = api
        .client
        .get(format!("{}/v1/instances/628000", api.base))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "not_found");

    // Duplicate phone -> 400.
    for _ in 0..2 {
        api.client
            .post(format!("{}/v1/instances", api.base))
            .json(&serde_json::json!({"phone": "628999", "name": "dup"}))
            .send()
            .await
            .unwrap();
    }
    let response = api
        .client
        .post(format!("{}/v1/instances", api.base))
        .json(&serde_json::json!({"phone": "628999", "name": "dup"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);

    // Send against a connecting instance -> 503.
    let response = api
        .client
        .post(format!("{}/v1/instances/628999/messages/text", api.base))
        .json(&serde_json::json!({"to": "628111", "message": "hi"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 503);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"], "not_connected");
}

#[tokio::test]
async fn bearer_auth_guards_api_but_not_health() {
    let api = serve_api(Some("seekrit".to_string())).await;

    let response = api
        .client
        .get(format!("{}/v1/instances", api.base))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);

    let response = api
        .client
        .get(format!("{}/v1/instances", api.base))
        .header("Authorization", "Bearer wrong")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);

    let response = api
        .client
        .get(format!("{}/v1/instances", api.base))
        .header("Authorization", "Bearer seekrit")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    // Liveness stays public.
    let response = api
        .client
        .get(format!("{}/health", api.base))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn webhook_crud_and_history_endpoints() {
    let api = serve_api(None).await;
    api.client
        .post(format!("{}/v1/instances", api.base))
        .json(&serde_json::json!({"phone": "628500", "name": "hooked"}))
        .send()
        .await
        .unwrap();

    // Bad URL is rejected up front.
    let response = api
        .client
        .post(format!("{}/v1/instances/628500/webhooks", api.base))
        .json(&serde_json::json!({"event": "message.received", "url": "ftp://nope"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);

    let response = api
        .client
        .post(format!("{}/v1/instances/628500/webhooks", api.base))
        .json(&serde_json::json!({
            "event": "message.received",
            "url": "https://example.com/hook"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);
    let body: serde_json::Value = response.json().await.unwrap();
    let webhook_id = body["data"]["id"].as_str().unwrap().to_string();

    // Disable it via PATCH.
    let response = api
        .client
        .patch(format!(
            "{}/v1/instances/628500/webhooks/{webhook_id}",
            api.base
        ))
        .json(&serde_json::json!({"enabled": false}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["data"]["enabled"], false);

    // Empty history for a fresh instance; stats shaped correctly.
    let body: serde_json::Value = api
        .client
        .get(format!("{}/v1/instances/628500/webhooks/history", api.base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"].as_array().unwrap().len(), 0);

    let body: serde_json::Value = api
        .client
        .get(format!("{}/v1/webhooks/stats", api.base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"]["success_count"], 0);

    let body: serde_json::Value = api
        .client
        .get(format!("{}/v1/webhooks/failures", api.base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"].as_array().unwrap().len(), 0);

    // Delete and confirm 404 afterwards.
    let response = api
        .client
        .delete(format!(
            "{}/v1/instances/628500/webhooks/{webhook_id}",
            api.base
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let response = api
        .client
        .delete(format!(
            "{}/v1/instances/628500/webhooks/{webhook_id}",
            api.base
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn plugin_endpoints_toggle_and_persist() {
    let api = serve_api(None).await;
    api.client
        .post(format!("{}/v1/instances", api.base))
        .json(&serde_json::json!({"phone": "628600", "name": "plugged"}))
        .send()
        .await
        .unwrap();

    let body: serde_json::Value = api
        .client
        .get(format!("{}/v1/instances/628600/plugins", api.base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let plugins = body["data"].as_array().unwrap();
    assert!(plugins.iter().all(|p| p["enabled"] == false));

    let response = api
        .client
        .post(format!(
            "{}/v1/instances/628600/plugins/welcome/enable",
            api.base
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let body: serde_json::Value = api
        .client
        .get(format!("{}/v1/instances/628600/plugins", api.base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let welcome = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .find(|p| p["name"] == "welcome")
        .unwrap();
    assert_eq!(welcome["enabled"], true);

    // Unknown plugin -> 404.
    let response = api
        .client
        .post(format!(
            "{}/v1/instances/628600/plugins/ghost/enable",
            api.base
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);
}
