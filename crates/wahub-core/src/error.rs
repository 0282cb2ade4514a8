// SPDX-FileCopyrightText: 2026 Wahub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Wahub gateway.

use thiserror::Error;

/// The primary error type used across all Wahub crates.
#[derive(Debug, Error)]
pub enum WahubError {
    /// Requested entity (instance, webhook, history row) does not exist.
    #[error("{resource} not found: {key}")]
    NotFound { resource: String, key: String },

    /// An instance with the same phone already exists.
    #[error("instance already exists for phone {phone}")]
    AlreadyExists { phone: String },

    /// Validation of an incoming payload failed.
    #[error("bad input: {0}")]
    BadInput(String),

    /// A send was attempted against an instance that is not connected.
    #[error("instance {phone} is not connected (status: {status})")]
    NotConnected { phone: String, status: String },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Upstream chat transport reported an error.
    #[error("transport error: {message}")]
    Upstream {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Storage backend errors (database connection, query failure).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Safe-serialisation produced a fallback object.
    #[error("serialisation error: {0}")]
    Serialization(String),

    /// Configuration errors (invalid TOML, missing required fields).
    #[error("configuration error: {0}")]
    Config(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl WahubError {
    /// Stable short code for the control-API error envelope.
    pub fn code(&self) -> &'static str {
        match self {
            WahubError::NotFound { .. } => "not_found",
            WahubError::AlreadyExists { .. } => "already_exists",
            WahubError::BadInput(_) => "bad_input",
            WahubError::NotConnected { .. } => "not_connected",
            WahubError::Timeout { .. } => "timeout",
            WahubError::Upstream { .. } => "upstream",
            WahubError::Storage { .. } => "storage",
            WahubError::Serialization(_) => "serialization",
            WahubError::Config(_) => "config",
            WahubError::Internal(_) => "internal",
        }
    }

    /// Shorthand for a `NotFound` over an instance phone.
    pub fn instance_not_found(phone: &str) -> Self {
        WahubError::NotFound {
            resource: "instance".to_string(),
            key: phone.to_string(),
        }
    }
}
