// SPDX-FileCopyrightText: 2026 Wahub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chat transport support for the Wahub gateway.
//!
//! The wire protocol itself lives behind the [`ChatTransport`] trait in
//! `wahub-core`; this crate carries everything an implementation and its
//! owning instance need around it: the on-disk credential store, JID
//! normalisation, upstream error classification, and the in-process `memory`
//! driver used by the sandbox mode and the test harness.
//!
//! [`ChatTransport`]: wahub_core::ChatTransport

pub mod auth_store;
pub mod error_class;
pub mod jid;
pub mod memory;

pub use auth_store::CredentialStore;
pub use error_class::{classify_upstream_error, log_upstream_error, UpstreamErrorClass};
pub use memory::{MemoryTransport, MemoryTransportFactory, SentRecord};
