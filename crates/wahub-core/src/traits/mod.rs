// SPDX-FileCopyrightText: 2026 Wahub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trait definitions for the seams between Wahub subsystems.

pub mod outbound;
pub mod transport;

pub use outbound::OutboundPort;
pub use transport::{ChatTransport, TransportFactory};
