// SPDX-FileCopyrightText: 2026 Wahub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Autoresponder plugin: canned replies for exact keywords.

use std::collections::HashMap;

use async_trait::async_trait;
use tracing::debug;
use wahub_core::types::MessageKind;
use wahub_core::WahubError;

use crate::event::{PluginEvent, PluginPayload};
use crate::registry::{EventPlugin, PluginManifest};

/// Replies to exact keyword matches in incoming text messages.
pub struct AutoresponderPlugin {
    replies: HashMap<String, String>,
}

impl AutoresponderPlugin {
    /// Plugin with the stock reply table.
    pub fn new() -> Self {
        let mut replies = HashMap::new();
        replies.insert("ping".to_string(), "pong".to_string());
        replies.insert(
            "help".to_string(),
            "This number is operated by an automated gateway.".to_string(),
        );
        Self { replies }
    }

    /// Plugin with a custom reply table.
    pub fn with_replies(replies: HashMap<String, String>) -> Self {
        Self { replies }
    }
}

impl Default for AutoresponderPlugin {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventPlugin for AutoresponderPlugin {
    fn manifest(&self) -> PluginManifest {
        PluginManifest {
            name: "autoresponder".to_string(),
            version: "0.1.0".to_string(),
            description: "Replies to exact keywords with canned responses".to_string(),
            default_enabled: false,
        }
    }

    async fn handle(&self, event: &PluginEvent) -> Result<(), WahubError> {
        let PluginPayload::Message(message) = &event.payload else {
            return Ok(());
        };
        if message.from_me || message.kind != MessageKind::Text {
            return Ok(());
        }
        let Some(text) = &message.text else {
            return Ok(());
        };

        let keyword = text.trim().to_lowercase();
        if let Some(reply) = self.replies.get(&keyword) {
            debug!(
                phone = %event.phone,
                chat = %message.chat_jid,
                keyword = %keyword,
                "autoresponder matched"
            );
            event.outbound.send_text(&message.chat_jid, reply).await?;
        }
        Ok(())
    }
}
