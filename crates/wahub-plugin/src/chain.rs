// SPDX-FileCopyrightText: 2026 Wahub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-instance plugin chain.
//!
//! Every instance holds its own override map (plugin name -> enabled). A
//! name absent from the map counts as disabled: new instances run nothing
//! until a plugin is switched on explicitly, regardless of the plugin's own
//! default-enabled flag.
//!
//! Dispatch runs all enabled handlers concurrently and waits for every one
//! to settle. A handler failure is logged with the plugin name and instance
//! phone; it never reaches the caller.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};
use wahub_core::WahubError;

use crate::event::PluginEvent;
use crate::registry::PluginRegistry;

/// One row of the chain's status view.
#[derive(Debug, Clone, Serialize)]
pub struct PluginStatusView {
    /// Plugin name.
    pub name: String,
    /// Plugin description from its manifest.
    pub description: String,
    /// The plugin's advertised default flag (informational).
    pub default_enabled: bool,
    /// Whether this instance runs the plugin.
    pub enabled: bool,
}

/// Per-instance plugin enablement and dispatch.
pub struct PluginChain {
    phone: String,
    registry: Arc<PluginRegistry>,
    overrides: RwLock<HashMap<String, bool>>,
}

impl PluginChain {
    /// New chain with every plugin disabled.
    pub fn new(phone: &str, registry: Arc<PluginRegistry>) -> Self {
        Self {
            phone: phone.to_string(),
            registry,
            overrides: RwLock::new(HashMap::new()),
        }
    }

    /// New chain seeded from a persisted override map.
    pub async fn with_overrides(
        phone: &str,
        registry: Arc<PluginRegistry>,
        overrides: HashMap<String, bool>,
    ) -> Self {
        let chain = Self::new(phone, registry);
        *chain.overrides.write().await = overrides;
        chain
    }

    /// Whether a plugin is enabled for this instance.
    pub async fn is_enabled(&self, name: &str) -> bool {
        self.overrides
            .read()
            .await
            .get(name)
            .copied()
            .unwrap_or(false)
    }

    /// Status of every registered plugin for this instance.
    pub async fn status(&self) -> Vec<PluginStatusView> {
        let overrides = self.overrides.read().await;
        self.registry
            .manifests()
            .into_iter()
            .map(|m| PluginStatusView {
                enabled: overrides.get(&m.name).copied().unwrap_or(false),
                name: m.name,
                description: m.description,
                default_enabled: m.default_enabled,
            })
            .collect()
    }

    /// Enable one plugin. Unknown names are an error.
    pub async fn enable(&self, name: &str) -> Result<(), WahubError> {
        self.set_one(name, true).await
    }

    /// Disable one plugin. Unknown names are an error.
    pub async fn disable(&self, name: &str) -> Result<(), WahubError> {
        self.set_one(name, false).await
    }

    async fn set_one(&self, name: &str, enabled: bool) -> Result<(), WahubError> {
        if self.registry.get(name).is_none() {
            return Err(WahubError::NotFound {
                resource: "plugin".to_string(),
                key: name.to_string(),
            });
        }
        self.overrides.write().await.insert(name.to_string(), enabled);
        info!(
            phone = %self.phone,
            plugin = %name,
            enabled,
            "plugin toggled"
        );
        Ok(())
    }

    /// Apply a partial override map. Unknown names are skipped with a warning.
    pub async fn set_map(&self, partial: HashMap<String, bool>) {
        let mut overrides = self.overrides.write().await;
        for (name, enabled) in partial {
            if self.registry.get(&name).is_none() {
                warn!(phone = %self.phone, plugin = %name, "ignoring unknown plugin in map");
                continue;
            }
            overrides.insert(name, enabled);
        }
    }

    /// Replace the whole override map from its persisted value, logging the
    /// diff against the current state.
    pub async fn sync_from_map(&self, persisted: HashMap<String, bool>) {
        let mut overrides = self.overrides.write().await;
        for name in self.registry.names() {
            let before = overrides.get(&name).copied().unwrap_or(false);
            let after = persisted.get(&name).copied().unwrap_or(false);
            if before != after {
                info!(
                    phone = %self.phone,
                    plugin = %name,
                    before,
                    after,
                    "plugin enablement synced from store"
                );
            }
        }
        *overrides = persisted;
    }

    /// The current override map, for persistence.
    pub async fn snapshot(&self) -> HashMap<String, bool> {
        self.overrides.read().await.clone()
    }

    /// Dispatch one event to every enabled plugin, concurrently.
    ///
    /// Waits for all handlers to settle. Never fails.
    pub async fn dispatch(&self, event: &PluginEvent) {
        let enabled: Vec<_> = {
            let overrides = self.overrides.read().await;
            self.registry
                .names()
                .into_iter()
                .filter(|name| overrides.get(name).copied().unwrap_or(false))
                .filter_map(|name| self.registry.get(&name).map(|p| (name, p)))
                .collect()
        };

        if enabled.is_empty() {
            return;
        }
        debug!(
            phone = %self.phone,
            count = enabled.len(),
            "dispatching event to plugin chain"
        );

        let futures = enabled.into_iter().map(|(name, plugin)| {
            let event = event.clone();
            let phone = self.phone.clone();
            async move {
                if let Err(e) = plugin.handle(&event).await {
                    error!(
                        phone = %phone,
                        plugin = %name,
                        error = %e,
                        "plugin handler failed"
                    );
                }
            }
        });
        join_all(futures).await;
    }
}
