// SPDX-FileCopyrightText: 2026 Wahub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP control plane for the Wahub gateway.
//!
//! Exposes instance lifecycle, plugin enablement, outbound sends, webhook
//! CRUD, and delivery history over a uniform JSON envelope.

pub mod auth;
pub mod envelope;
pub mod handlers;
pub mod server;

pub use auth::AuthConfig;
pub use server::{router, start_server, GatewayState, ServerConfig};
