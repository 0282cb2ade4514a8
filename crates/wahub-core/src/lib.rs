// SPDX-FileCopyrightText: 2026 Wahub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Wahub multi-tenant WhatsApp gateway.
//!
//! This crate provides the foundational trait definitions, error types, and
//! domain types used throughout the Wahub workspace: the error taxonomy, the
//! instance/message/webhook model, the transport event stream, and the
//! safe-serialisation rules for upstream envelopes.

pub mod error;
pub mod sanitize;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::WahubError;
pub use traits::{ChatTransport, OutboundPort, TransportFactory};
pub use types::{
    ConnectionPhase, DeliveryStatus, Direction, EventKind, InstanceSnapshot,
    InstanceStatus, MediaPayload, MessageId, MessageKind, MessageStatus, TransportEvent,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_variants_construct() {
        let _not_found = WahubError::instance_not_found("628123");
        let _exists = WahubError::AlreadyExists {
            phone: "628123".into(),
        };
        let _bad = WahubError::BadInput("empty destination".into());
        let _not_connected = WahubError::NotConnected {
            phone: "628123".into(),
            status: InstanceStatus::Reconnecting.to_string(),
        };
        let _storage = WahubError::Storage {
            source: Box::new(std::io::Error::other("test")),
        };
        let _upstream = WahubError::Upstream {
            message: "stream errored".into(),
            source: None,
        };
    }

    #[test]
    fn transport_event_is_cloneable() {
        let event = TransportEvent::QrCode("2@abc,def".into());
        let _cloned = event.clone();
    }
}
