// SPDX-FileCopyrightText: 2026 Wahub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The typed envelope handed to plugin handlers.

use std::sync::Arc;

use wahub_core::types::{GroupParticipantsUpdate, UpstreamMessage};
use wahub_core::OutboundPort;

/// Payload variants a plugin can receive.
#[derive(Debug, Clone)]
pub enum PluginPayload {
    /// An inbound chat message.
    Message(UpstreamMessage),
    /// A group membership change.
    GroupParticipants(GroupParticipantsUpdate),
}

/// Event envelope dispatched through a plugin chain.
///
/// `outbound` is the owning instance's send seam: anything a plugin sends
/// goes through the full outbound pipeline of that instance.
#[derive(Clone)]
pub struct PluginEvent {
    /// Phone of the owning instance.
    pub phone: String,
    /// The event payload.
    pub payload: PluginPayload,
    /// Send capability scoped to the owning instance.
    pub outbound: Arc<dyn OutboundPort>,
}

impl std::fmt::Debug for PluginEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginEvent")
            .field("phone", &self.phone)
            .field("payload", &self.payload)
            .finish()
    }
}
