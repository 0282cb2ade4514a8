// SPDX-FileCopyrightText: 2026 Wahub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound send seam handed to plugin handlers.

use async_trait::async_trait;

use crate::error::WahubError;
use crate::types::MessageId;

/// Narrow send capability exposed to plugins.
///
/// Plugins never hold the transport directly; they send through the owning
/// instance so the outbound pipeline (status guard, persistence, webhook
/// emission) applies to plugin-originated messages too.
#[async_trait]
pub trait OutboundPort: Send + Sync {
    /// Sends a text message to a phone number or JID.
    async fn send_text(&self, to: &str, text: &str) -> Result<MessageId, WahubError>;
}
