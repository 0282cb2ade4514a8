// SPDX-FileCopyrightText: 2026 Wahub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared test infrastructure for the Wahub workspace.
//!
//! `TestHarness` wires a temp database, credential root, plugin registry,
//! and manually scripted in-memory transports into one manager; the
//! transport handles let tests drive connection lifecycles event by event.

pub mod harness;

pub use harness::{TestHarness, TestHarnessBuilder};
pub use wahub_transport::{MemoryTransport, MemoryTransportFactory, SentRecord};
