// SPDX-FileCopyrightText: 2026 Wahub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Classification of upstream transport errors.
//!
//! The upstream library emits noisy error strings for conditions that are
//! harmless in practice (decryption retries, stream resets during pairing).
//! Instead of suppressing process-wide stderr, transports route error text
//! through [`classify_upstream_error`] and log through the standard
//! subscriber at the level the class deserves.

use tracing::{debug, warn};

/// Severity class of an upstream-reported error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamErrorClass {
    /// Message-authentication retry; the upstream resends transparently.
    BenignMacRetry,
    /// Stream reset, typically while a QR pairing is in flight.
    BenignStreamReset,
    /// Everything else.
    Fatal,
}

/// Classify upstream error text.
pub fn classify_upstream_error(message: &str) -> UpstreamErrorClass {
    let lower = message.to_lowercase();
    if lower.contains("bad mac") || lower.contains("failed to decrypt") {
        UpstreamErrorClass::BenignMacRetry
    } else if lower.contains("stream errored") || lower.contains("stream reset") {
        UpstreamErrorClass::BenignStreamReset
    } else {
        UpstreamErrorClass::Fatal
    }
}

/// Classify and log one upstream error for an instance.
///
/// Returns the class so callers can branch on it.
pub fn log_upstream_error(phone: &str, message: &str) -> UpstreamErrorClass {
    let class = classify_upstream_error(message);
    match class {
        UpstreamErrorClass::BenignMacRetry => {
            debug!(phone = %phone, error = %message, "benign mac retry from upstream");
        }
        UpstreamErrorClass::BenignStreamReset => {
            debug!(phone = %phone, error = %message, "benign stream reset from upstream");
        }
        UpstreamErrorClass::Fatal => {
            warn!(phone = %phone, error = %message, "upstream transport error");
        }
    }
    class
}
