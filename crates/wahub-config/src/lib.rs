// SPDX-FileCopyrightText: 2026 Wahub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration for the Wahub gateway.
//!
//! TOML config models with layered loading (defaults < system < user < local
//! < environment) built on Figment.

pub mod loader;
pub mod model;

pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::{ServiceMode, WahubConfig};
