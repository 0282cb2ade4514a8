// SPDX-FileCopyrightText: 2026 Wahub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Plugin registry for compiled-in event handlers.
//!
//! The handler set is fixed at process start: the built-in catalog lists the
//! available plugins and their constructors. `reload()` drops every handler
//! and re-runs the constructors; a constructor failure is logged and skipped
//! so one broken plugin never takes the others down.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use wahub_core::WahubError;

use crate::builtin;
use crate::event::PluginEvent;

/// Metadata describing one plugin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginManifest {
    /// Unique plugin name (e.g. "welcome").
    pub name: String,
    /// Semantic version string.
    pub version: String,
    /// Human-readable description.
    pub description: String,
    /// Whether the plugin advertises itself as enabled by default.
    ///
    /// Informational only: new instances start with every plugin disabled
    /// regardless of this flag.
    pub default_enabled: bool,
}

/// An event handler over the typed plugin envelope.
#[async_trait]
pub trait EventPlugin: Send + Sync {
    /// The plugin's manifest.
    fn manifest(&self) -> PluginManifest;

    /// Handle one event. Failures are contained by the chain.
    async fn handle(&self, event: &PluginEvent) -> Result<(), WahubError>;
}

/// Fallible constructor for one catalog entry.
pub type PluginConstructor = fn() -> Result<Arc<dyn EventPlugin>, WahubError>;

/// Registry of compiled-in plugins, keyed by name.
pub struct PluginRegistry {
    catalog: Vec<PluginConstructor>,
    plugins: RwLock<HashMap<String, Arc<dyn EventPlugin>>>,
}

impl PluginRegistry {
    /// Build a registry from an explicit catalog of constructors.
    pub fn from_catalog(catalog: Vec<PluginConstructor>) -> Self {
        let registry = Self {
            catalog,
            plugins: RwLock::new(HashMap::new()),
        };
        registry.reload();
        registry
    }

    /// Build the registry with the built-in catalog.
    pub fn builtin() -> Self {
        Self::from_catalog(builtin::builtin_catalog())
    }

    /// Drop all handlers and re-run every constructor.
    ///
    /// A failing constructor is logged and skipped.
    pub fn reload(&self) {
        let mut loaded: HashMap<String, Arc<dyn EventPlugin>> = HashMap::new();
        for constructor in &self.catalog {
            match constructor() {
                Ok(plugin) => {
                    let name = plugin.manifest().name;
                    loaded.insert(name, plugin);
                }
                Err(e) => {
                    warn!(error = %e, "plugin failed to load, skipping");
                }
            }
        }
        info!(count = loaded.len(), "plugin registry loaded");
        *self.write() = loaded;
    }

    /// Register an already-built plugin, replacing any previous one with the
    /// same name. Registrations made outside the catalog do not survive
    /// `reload()`.
    pub fn register(&self, plugin: Arc<dyn EventPlugin>) {
        let name = plugin.manifest().name;
        self.write().insert(name, plugin);
    }

    /// Get a plugin by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn EventPlugin>> {
        self.read().get(name).cloned()
    }

    /// Manifests of all loaded plugins, sorted by name.
    pub fn manifests(&self) -> Vec<PluginManifest> {
        let mut manifests: Vec<PluginManifest> =
            self.read().values().map(|p| p.manifest()).collect();
        manifests.sort_by(|a, b| a.name.cmp(&b.name));
        manifests
    }

    /// Names of all loaded plugins, sorted.
    pub fn names(&self) -> Vec<String> {
        self.manifests().into_iter().map(|m| m.name).collect()
    }

    /// Number of loaded plugins.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Whether the registry holds no plugins.
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, Arc<dyn EventPlugin>>> {
        self.plugins.read().unwrap_or_else(|p| p.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, Arc<dyn EventPlugin>>> {
        self.plugins.write().unwrap_or_else(|p| p.into_inner())
    }
}
