// SPDX-FileCopyrightText: 2026 Wahub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Wahub gateway.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Wahub configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable
/// overrides. All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WahubConfig {
    /// Service mode and logging settings.
    #[serde(default)]
    pub service: ServiceConfig,

    /// Control-plane HTTP server settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Chat transport settings.
    #[serde(default)]
    pub transport: TransportConfig,

    /// Webhook delivery settings.
    #[serde(default)]
    pub webhook: WebhookConfig,

    /// Data retention settings.
    #[serde(default)]
    pub retention: RetentionConfig,
}

/// Service mode selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceMode {
    /// One anonymous default instance (legacy single-session service).
    Single,
    /// The multi-tenant instance manager only.
    Multi,
    /// Both of the above.
    Both,
}

/// Service mode and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Which surfaces to run: single, multi, or both.
    #[serde(default = "default_mode")]
    pub mode: ServiceMode,

    /// Phone number of the default instance used in single mode.
    #[serde(default)]
    pub single_phone: Option<String>,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            mode: default_mode(),
            single_phone: None,
            log_level: default_log_level(),
        }
    }
}

fn default_mode() -> ServiceMode {
    ServiceMode::Multi
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Control-plane HTTP server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Bearer token for control-API auth. `None` disables auth (sandbox use).
    #[serde(default)]
    pub bearer_token: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            bearer_token: None,
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    "wahub.db".to_string()
}

fn default_wal_mode() -> bool {
    true
}

/// Chat transport configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TransportConfig {
    /// Root directory for per-phone credential blobs.
    #[serde(default = "default_auth_root")]
    pub auth_root: String,

    /// Transport driver name. `memory` is the in-process sandbox driver.
    #[serde(default = "default_driver")]
    pub driver: String,

    /// Maximum reconnection attempts before a session is considered logged out.
    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: u32,

    /// Delay between reconnection attempts, in seconds.
    #[serde(default = "default_reconnect_delay_secs")]
    pub reconnect_delay_secs: u64,

    /// Upstream close codes treated as transient even during a manual
    /// restart (a stream reset while a QR scan is in flight must not strand
    /// the user in `inactive`).
    #[serde(default = "default_stream_restart_codes")]
    pub stream_restart_codes: Vec<u16>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            auth_root: default_auth_root(),
            driver: default_driver(),
            max_reconnect_attempts: default_max_reconnect_attempts(),
            reconnect_delay_secs: default_reconnect_delay_secs(),
            stream_restart_codes: default_stream_restart_codes(),
        }
    }
}

fn default_auth_root() -> String {
    "auth".to_string()
}

fn default_driver() -> String {
    "memory".to_string()
}

fn default_max_reconnect_attempts() -> u32 {
    5
}

fn default_reconnect_delay_secs() -> u64 {
    5
}

fn default_stream_restart_codes() -> Vec<u16> {
    vec![515]
}

/// Webhook delivery configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WebhookConfig {
    /// Total per-delivery timeout, in seconds.
    #[serde(default = "default_webhook_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_webhook_timeout_secs(),
        }
    }
}

fn default_webhook_timeout_secs() -> u64 {
    5
}

/// Data retention configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RetentionConfig {
    /// Age cutoff for the retention sweep, in minutes. `None` disables it.
    #[serde(default)]
    pub max_age_minutes: Option<i64>,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            max_age_minutes: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reconnect_policy() {
        let config = WahubConfig::default();
        assert_eq!(config.transport.max_reconnect_attempts, 5);
        assert_eq!(config.transport.reconnect_delay_secs, 5);
        assert_eq!(config.webhook.timeout_secs, 5);
        assert_eq!(config.transport.stream_restart_codes, vec![515]);
    }

    #[test]
    fn default_mode_is_multi() {
        let config = WahubConfig::default();
        assert_eq!(config.service.mode, ServiceMode::Multi);
        assert!(config.service.single_phone.is_none());
    }

    #[test]
    fn mode_deserializes_snake_case() {
        let mode: ServiceMode = serde_json::from_str("\"both\"").unwrap();
        assert_eq!(mode, ServiceMode::Both);
    }
}
