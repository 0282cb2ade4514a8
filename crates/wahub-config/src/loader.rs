// SPDX-FileCopyrightText: 2026 Wahub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./wahub.toml` > `~/.config/wahub/wahub.toml` >
//! `/etc/wahub/wahub.toml` with environment variable overrides via the
//! `WAHUB_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::WahubConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/wahub/wahub.toml` (system-wide)
/// 3. `~/.config/wahub/wahub.toml` (user XDG config)
/// 4. `./wahub.toml` (local directory)
/// 5. `WAHUB_*` environment variables
pub fn load_config() -> Result<WahubConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(WahubConfig::default()))
        .merge(Toml::file("/etc/wahub/wahub.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("wahub/wahub.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("wahub.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from TOML content only (no XDG lookup, no env).
///
/// Used for testing and explicit config specification.
pub fn load_config_from_str(toml_content: &str) -> Result<WahubConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(WahubConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<WahubConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(WahubConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` NOT `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names: `WAHUB_TRANSPORT_AUTH_ROOT` must map to
/// `transport.auth_root`, not `transport.auth.root`.
fn env_provider() -> Env {
    Env::prefixed("WAHUB_").map(|key| {
        // `key` is the lowercased env var name with prefix stripped.
        // Example: WAHUB_TRANSPORT_AUTH_ROOT -> "transport_auth_root"
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("service_", "service.", 1)
            .replacen("gateway_", "gateway.", 1)
            .replacen("storage_", "storage.", 1)
            .replacen("transport_", "transport.", 1)
            .replacen("webhook_", "webhook.", 1)
            .replacen("retention_", "retention.", 1);
        mapped.into()
    })
}
