// SPDX-FileCopyrightText: 2026 Wahub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `wahub serve` command implementation.
//!
//! Wires the full gateway: SQLite storage, the plugin registry, the
//! transport factory selected by `transport.driver`, the instance manager,
//! and the axum control plane. Supports graceful shutdown via SIGTERM and
//! SIGINT.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use wahub_config::{ServiceMode, WahubConfig};
use wahub_core::{TransportFactory, WahubError};
use wahub_gateway::ServerConfig;
use wahub_instance::{InstanceManager, InstanceSettings};
use wahub_plugin::PluginRegistry;
use wahub_storage::Database;
use wahub_transport::{CredentialStore, MemoryTransportFactory};

/// Runs the `wahub serve` command.
pub async fn run_serve(config: WahubConfig) -> Result<(), WahubError> {
    init_tracing(&config.service.log_level);
    info!("starting wahub serve");

    let db = Database::open_with_wal(&config.storage.database_path, config.storage.wal_mode)
        .await?;
    let registry = Arc::new(PluginRegistry::builtin());
    let creds = CredentialStore::new(&config.transport.auth_root);
    let factory = build_factory(&config)?;
    let settings = instance_settings(&config);

    let manager = InstanceManager::new(
        db.clone(),
        Arc::clone(&registry),
        factory,
        creds,
        settings,
    );

    match config.service.mode {
        ServiceMode::Multi | ServiceMode::Both => {
            manager.initialize().await?;
        }
        ServiceMode::Single => {}
    }
    if matches!(config.service.mode, ServiceMode::Single | ServiceMode::Both) {
        ensure_single_instance(&manager, &config).await?;
    }

    let server_config = ServerConfig {
        host: config.gateway.host.clone(),
        port: config.gateway.port,
        bearer_token: config.gateway.bearer_token.clone(),
    };

    let shutdown = install_signal_handler();
    let server_manager = Arc::clone(&manager);
    let mut server = tokio::spawn(async move {
        wahub_gateway::start_server(&server_config, server_manager).await
    });

    tokio::select! {
        _ = shutdown.cancelled() => {
            info!("shutdown signal received");
            server.abort();
        }
        result = &mut server => {
            match result {
                Ok(Ok(())) => info!("gateway server exited"),
                Ok(Err(e)) => error!(error = %e, "gateway server failed"),
                Err(e) => error!(error = %e, "gateway server task ended abnormally"),
            }
        }
    }

    manager.shutdown().await;
    db.close().await?;
    info!("wahub stopped");
    Ok(())
}

/// Build the transport factory selected by `transport.driver`.
///
/// `memory` is the in-process sandbox driver; a production wire-protocol
/// driver plugs in through the same seam.
fn build_factory(config: &WahubConfig) -> Result<Arc<dyn TransportFactory>, WahubError> {
    match config.transport.driver.as_str() {
        "memory" => Ok(Arc::new(MemoryTransportFactory::new())),
        other => Err(WahubError::Config(format!(
            "unknown transport driver {other:?} (available: memory)"
        ))),
    }
}

fn instance_settings(config: &WahubConfig) -> InstanceSettings {
    InstanceSettings {
        max_reconnect_attempts: config.transport.max_reconnect_attempts,
        reconnect_delay: Duration::from_secs(config.transport.reconnect_delay_secs),
        stream_restart_codes: config.transport.stream_restart_codes.clone(),
        webhook_timeout: Duration::from_secs(config.webhook.timeout_secs),
        ..InstanceSettings::default()
    }
}

/// Make sure the single-mode default instance exists and is running.
async fn ensure_single_instance(
    manager: &Arc<InstanceManager>,
    config: &WahubConfig,
) -> Result<(), WahubError> {
    let Some(ref phone) = config.service.single_phone else {
        return Err(WahubError::Config(
            "service.single_phone is required in single mode".into(),
        ));
    };

    match manager.create(phone, "default", None).await {
        Ok(_) => {
            info!(phone = %phone, "single-mode instance created");
            Ok(())
        }
        Err(WahubError::AlreadyExists { .. }) => {
            // Persisted from an earlier run; bring it up if it is not
            // already resident.
            if manager.get(phone).is_none() {
                manager.restart(phone).await?;
            }
            debug!(phone = %phone, "single-mode instance restored");
            Ok(())
        }
        Err(e) => Err(e),
    }
}

/// Installs signal handlers for SIGTERM and SIGINT.
///
/// Returns a [`CancellationToken`] cancelled when either signal arrives.
fn install_signal_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let token_clone = token.clone();

    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            let mut sigterm =
                signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");

            tokio::select! {
                _ = ctrl_c => {
                    info!("received SIGINT (Ctrl+C), initiating shutdown");
                }
                _ = sigterm.recv() => {
                    info!("received SIGTERM, initiating shutdown");
                }
            }
        }

        #[cfg(not(unix))]
        {
            let _ = ctrl_c.await;
            info!("received Ctrl+C, initiating shutdown");
        }

        token_clone.cancel();
    });

    token
}

fn init_tracing(level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_driver_is_a_config_error() {
        let mut config = WahubConfig::default();
        config.transport.driver = "carrier-pigeon".to_string();
        let err = build_factory(&config).unwrap_err();
        assert_eq!(err.code(), "config");
    }

    #[test]
    fn settings_map_from_config() {
        let mut config = WahubConfig::default();
        config.transport.max_reconnect_attempts = 3;
        config.transport.reconnect_delay_secs = 7;
        config.webhook.timeout_secs = 2;
        let settings = instance_settings(&config);
        assert_eq!(settings.max_reconnect_attempts, 3);
        assert_eq!(settings.reconnect_delay, Duration::from_secs(7));
        assert_eq!(settings.webhook_timeout, Duration::from_secs(2));
        // Untouched knobs keep their defaults.
        assert_eq!(settings.group_metadata_timeout, Duration::from_secs(10));
    }

    #[tokio::test]
    async fn single_mode_without_phone_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(dir.path().join("t.db").to_str().unwrap())
            .await
            .unwrap();
        let manager = InstanceManager::new(
            db,
            Arc::new(PluginRegistry::builtin()),
            Arc::new(MemoryTransportFactory::manual()) as Arc<dyn TransportFactory>,
            CredentialStore::new(dir.path().join("auth")),
            InstanceSettings::default(),
        );
        let config = WahubConfig::default();
        let err = ensure_single_instance(&manager, &config).await.unwrap_err();
        assert_eq!(err.code(), "config");
    }
}
