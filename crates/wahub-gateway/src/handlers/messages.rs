// SPDX-FileCopyrightText: 2026 Wahub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound send endpoints.

use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use wahub_core::types::MediaPayload;

use crate::envelope::{ok, ApiResult};
use crate::server::GatewayState;

/// Request body for POST /v1/instances/{phone}/messages/text.
#[derive(Debug, Deserialize)]
pub struct SendTextRequest {
    /// Destination phone number or user JID.
    pub to: String,
    /// Text content.
    pub message: String,
}

/// Request body for POST /v1/instances/{phone}/messages/group.
#[derive(Debug, Deserialize)]
pub struct SendGroupRequest {
    /// Group id or group JID.
    pub group_id: String,
    /// Text content.
    pub message: String,
}

/// Request body for POST /v1/instances/{phone}/messages/media.
#[derive(Debug, Deserialize)]
pub struct SendMediaRequest {
    /// Destination phone number, user JID, or group JID.
    pub to: String,
    /// The media payload.
    pub media: MediaPayload,
}

/// POST /v1/instances/{phone}/messages/text
pub async fn send_text(
    State(state): State<GatewayState>,
    Path(phone): Path<String>,
    Json(body): Json<SendTextRequest>,
) -> ApiResult {
    let message_id = state
        .manager
        .send_text(&phone, &body.to, &body.message)
        .await?;
    Ok(ok(json!({"message_id": message_id.0})))
}

/// POST /v1/instances/{phone}/messages/group
pub async fn send_group(
    State(state): State<GatewayState>,
    Path(phone): Path<String>,
    Json(body): Json<SendGroupRequest>,
) -> ApiResult {
    let message_id = state
        .manager
        .send_group_text(&phone, &body.group_id, &body.message)
        .await?;
    Ok(ok(json!({"message_id": message_id.0})))
}

/// POST /v1/instances/{phone}/messages/media
pub async fn send_media(
    State(state): State<GatewayState>,
    Path(phone): Path<String>,
    Json(body): Json<SendMediaRequest>,
) -> ApiResult {
    let message_id = state
        .manager
        .send_media(&phone, &body.to, &body.media)
        .await?;
    Ok(ok(json!({"message_id": message_id.0})))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wahub_core::types::MessageKind;

    #[test]
    fn send_text_request_deserializes() {
        let req: SendTextRequest =
            serde_json::from_str(r#"{"to": "628999", "message": "hi"}"#).unwrap();
        assert_eq!(req.to, "628999");
        assert_eq!(req.message, "hi");
    }

    #[test]
    fn send_media_request_deserializes_with_kind() {
        let req: SendMediaRequest = serde_json::from_str(
            r#"{"to": "628999", "media": {"kind": "image", "url": "https://x/a.jpg", "caption": "look"}}"#,
        )
        .unwrap();
        assert_eq!(req.media.kind, MessageKind::Image);
        assert_eq!(req.media.caption.as_deref(), Some("look"));
        assert!(req.media.filename.is_none());
    }
}
