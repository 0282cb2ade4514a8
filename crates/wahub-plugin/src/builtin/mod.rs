// SPDX-FileCopyrightText: 2026 Wahub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Built-in plugin catalog.

use std::sync::Arc;

use wahub_core::WahubError;

use crate::registry::{EventPlugin, PluginConstructor};

pub mod autoresponder;
pub mod welcome;

pub use autoresponder::AutoresponderPlugin;
pub use welcome::WelcomePlugin;

fn make_welcome() -> Result<Arc<dyn EventPlugin>, WahubError> {
    Ok(Arc::new(WelcomePlugin::new()))
}

fn make_autoresponder() -> Result<Arc<dyn EventPlugin>, WahubError> {
    Ok(Arc::new(AutoresponderPlugin::new()))
}

/// Constructors for all built-in plugins.
pub fn builtin_catalog() -> Vec<PluginConstructor> {
    vec![make_welcome, make_autoresponder]
}
