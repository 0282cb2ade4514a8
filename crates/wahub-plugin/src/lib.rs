// SPDX-FileCopyrightText: 2026 Wahub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Plugin system for the Wahub gateway.
//!
//! A process-wide [`PluginRegistry`] holds the compiled-in handler set; each
//! instance owns a [`PluginChain`] with its private enablement map and
//! dispatches inbound events to the enabled subset concurrently.

pub mod builtin;
pub mod chain;
pub mod event;
pub mod registry;

pub use builtin::{AutoresponderPlugin, WelcomePlugin};
pub use chain::{PluginChain, PluginStatusView};
pub use event::{PluginEvent, PluginPayload};
pub use registry::{EventPlugin, PluginManifest, PluginRegistry};
