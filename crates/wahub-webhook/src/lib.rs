// SPDX-FileCopyrightText: 2026 Wahub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook fan-out for the Wahub gateway.
//!
//! One dispatcher per instance delivers typed events to all enabled
//! subscriptions and records a history row per attempt.

pub mod dispatcher;

pub use dispatcher::{WebhookDispatcher, DEFAULT_TIMEOUT, USER_AGENT};
