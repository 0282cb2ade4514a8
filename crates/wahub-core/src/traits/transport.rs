// SPDX-FileCopyrightText: 2026 Wahub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chat transport trait: the seam between an instance and the upstream
//! messaging protocol.

use std::path::Path;

use async_trait::async_trait;

use crate::error::WahubError;
use crate::types::{GroupMetadata, MediaPayload, MessageId, TransportEvent};

/// One authenticated duplex session against the upstream chat service.
///
/// Implementations own the wire protocol. An instance drives the session
/// from a single logical task: it calls [`next_event`](Self::next_event) in a
/// loop and reacts to the typed events. Concurrent sends from the same
/// instance are permitted and must not be serialised by the implementation.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Receives the next event from the session.
    ///
    /// Returns `Err` only when the session is gone for good; ordinary
    /// connection drops surface as [`TransportEvent::Close`].
    async fn next_event(&self) -> Result<TransportEvent, WahubError>;

    /// Sends a text message to the given JID.
    async fn send_text(&self, jid: &str, text: &str) -> Result<MessageId, WahubError>;

    /// Sends a media message to the given JID.
    async fn send_media(
        &self,
        jid: &str,
        media: &MediaPayload,
    ) -> Result<MessageId, WahubError>;

    /// Queries metadata for a group JID.
    async fn group_metadata(&self, jid: &str) -> Result<GroupMetadata, WahubError>;

    /// Logs the session out upstream, invalidating stored credentials.
    async fn logout(&self) -> Result<(), WahubError>;

    /// Closes the connection without logging out; credentials stay valid.
    async fn close(&self) -> Result<(), WahubError>;

    /// The bound upstream identity. `None` until a successful open.
    fn user_id(&self) -> Option<String>;
}

/// Creates transport sessions for instances.
///
/// The manager holds one factory and calls it on every start and restart;
/// `creds_dir` is the instance's private credential directory.
#[async_trait]
pub trait TransportFactory: Send + Sync {
    async fn create(
        &self,
        phone: &str,
        creds_dir: &Path,
    ) -> Result<Box<dyn ChatTransport>, WahubError>;
}

impl std::fmt::Debug for dyn TransportFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("dyn TransportFactory")
    }
}
