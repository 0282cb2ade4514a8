// SPDX-FileCopyrightText: 2026 Wahub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types used across the Wahub workspace.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::sanitize::RawValue;

/// Upstream message identifier returned by a transport send.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

/// Lifecycle status of an instance.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum InstanceStatus {
    Pending,
    Connecting,
    QrReady,
    Active,
    Reconnecting,
    Inactive,
    Error,
    LoggedOut,
}

/// Direction of a stored message.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Incoming,
    Outgoing,
}

/// Content kind of a message.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Text,
    Image,
    Video,
    Audio,
    Document,
    Other,
}

/// Delivery status of a stored message.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MessageStatus {
    Pending,
    Sent,
    Delivered,
    Read,
    Failed,
    Received,
}

/// Outcome of a single webhook delivery attempt.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Pending,
    Success,
    Failed,
    Timeout,
}

/// Severity of a persisted instance log entry.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

/// Sub-status carried by a `connection.update` webhook event.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ConnectionPhase {
    QrReady,
    Connecting,
    Connected,
    Reconnecting,
    LoggedOut,
    ManualRestart,
}

/// Typed event names emitted through the webhook dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    ConnectionUpdate,
    MessageReceived,
    MessageSent,
}

impl EventKind {
    /// Wire name of the event, as matched against webhook subscriptions.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::ConnectionUpdate => "connection.update",
            EventKind::MessageReceived => "message.received",
            EventKind::MessageSent => "message.sent",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// --- Transport event model ---

/// Close details reported by the transport when a session drops.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseInfo {
    /// Upstream protocol status code, when one was supplied.
    pub code: Option<u16>,
    /// Human-readable close reason from the upstream library.
    pub reason: String,
    /// Whether the close is a server-side logout (credentials invalidated).
    pub logout: bool,
}

/// A message as delivered by the upstream transport, before sanitisation.
#[derive(Debug, Clone)]
pub struct UpstreamMessage {
    /// Upstream message id.
    pub id: String,
    /// Chat JID the message belongs to (sender for DMs, group JID for groups).
    pub chat_jid: String,
    /// JID of the actual sender.
    pub sender_jid: String,
    /// Display name advertised by the sender.
    pub push_name: Option<String>,
    /// Content kind.
    pub kind: MessageKind,
    /// Extracted text content, when the message carries any.
    pub text: Option<String>,
    /// Upstream unix timestamp in seconds.
    pub timestamp: i64,
    /// True when this message was sent by the bound account itself.
    pub from_me: bool,
    /// Raw upstream envelope; sanitised before persistence.
    pub raw: RawValue,
}

/// Membership change action in a group.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ParticipantAction {
    Add,
    Remove,
    Promote,
    Demote,
}

/// A group membership change notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupParticipantsUpdate {
    /// Group JID the change happened in.
    pub group_jid: String,
    /// The membership action.
    pub action: ParticipantAction,
    /// Affected participant JIDs.
    pub participants: Vec<String>,
}

/// Delivery acknowledgement for a previously sent message.
#[derive(Debug, Clone)]
pub struct MessageAck {
    /// Upstream id of the acknowledged message.
    pub upstream_id: String,
    /// The delivery status the message advanced to.
    pub status: MessageStatus,
}

/// Events produced by a [`ChatTransport`](crate::traits::ChatTransport) session.
#[derive(Debug, Clone)]
pub enum TransportEvent {
    /// A pairing QR code was advertised for an unauthenticated session.
    QrCode(String),
    /// The transport is (re)establishing its connection.
    Connecting,
    /// The connection is open and authenticated.
    Open,
    /// The connection closed.
    Close(CloseInfo),
    /// Session credentials changed and must be persisted.
    CredentialsUpdate(Vec<u8>),
    /// A batch of inbound messages arrived.
    Messages(Vec<UpstreamMessage>),
    /// Group membership changed.
    GroupParticipants(GroupParticipantsUpdate),
    /// Delivery status advanced for an outbound message.
    Ack(MessageAck),
}

// --- Group metadata ---

/// Metadata for a group chat, as reported by the transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupMetadata {
    /// Group JID.
    pub jid: String,
    /// Group subject (title).
    pub subject: String,
    /// Member JIDs.
    pub participants: Vec<String>,
    /// JID of the group owner, when known.
    pub owner: Option<String>,
}

// --- Outbound media ---

/// Media payload accepted by the send-media operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaPayload {
    /// Media kind; `text` and `other` are rejected by validation.
    pub kind: MessageKind,
    /// Source URL the transport fetches the media from.
    pub url: String,
    /// Optional caption.
    #[serde(default)]
    pub caption: Option<String>,
    /// Optional filename, used for documents.
    #[serde(default)]
    pub filename: Option<String>,
}

// --- Snapshots ---

/// Point-in-time view of one instance, served by the control API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceSnapshot {
    /// Instance id.
    pub id: String,
    /// Phone the instance is keyed by.
    pub phone: String,
    /// Display name.
    pub name: String,
    /// Optional alias.
    pub alias: Option<String>,
    /// Status string; `disconnected` for persisted-but-not-resident instances.
    pub status: String,
    /// Whether a live authenticated transport session exists.
    pub is_connected: bool,
    /// Pending pairing QR payload, when status is qr_ready.
    pub qr_code: Option<String>,
    /// Reconnection attempts consumed since the last successful open.
    pub reconnect_attempts: u32,
    /// Bound upstream identity, available once connected.
    pub user_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn instance_status_round_trips_through_strings() {
        for status in [
            InstanceStatus::Pending,
            InstanceStatus::Connecting,
            InstanceStatus::QrReady,
            InstanceStatus::Active,
            InstanceStatus::Reconnecting,
            InstanceStatus::Inactive,
            InstanceStatus::Error,
            InstanceStatus::LoggedOut,
        ] {
            let s = status.to_string();
            let parsed = InstanceStatus::from_str(&s).expect("should parse back");
            assert_eq!(status, parsed);
        }
    }

    #[test]
    fn status_strings_are_snake_case() {
        assert_eq!(InstanceStatus::QrReady.to_string(), "qr_ready");
        assert_eq!(InstanceStatus::LoggedOut.to_string(), "logged_out");
        assert_eq!(ConnectionPhase::ManualRestart.to_string(), "manual_restart");
        assert_eq!(DeliveryStatus::Timeout.to_string(), "timeout");
    }

    #[test]
    fn event_kind_wire_names() {
        assert_eq!(EventKind::ConnectionUpdate.as_str(), "connection.update");
        assert_eq!(EventKind::MessageReceived.as_str(), "message.received");
        assert_eq!(EventKind::MessageSent.as_str(), "message.sent");
    }

    #[test]
    fn media_payload_deserializes_without_optionals() {
        let json = r#"{"kind": "image", "url": "https://example.com/a.jpg"}"#;
        let media: MediaPayload = serde_json::from_str(json).unwrap();
        assert_eq!(media.kind, MessageKind::Image);
        assert!(media.caption.is_none());
        assert!(media.filename.is_none());
    }

    #[test]
    fn participant_action_serializes_snake_case() {
        let json = serde_json::to_string(&ParticipantAction::Promote).unwrap();
        assert_eq!(json, "\"promote\"");
    }
}
