// SPDX-FileCopyrightText: 2026 Wahub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Welcome plugin: greets group joiners in one batched message.
//!
//! Joins within the batching window are collected per group and greeted with
//! a single text once the window elapses. A member who leaves before the
//! timer fires is dropped from the batch; when the batch empties, the
//! pending send is cancelled. The generation counter makes a stale timer a
//! no-op after the batch was re-armed or drained.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use wahub_core::WahubError;

use crate::event::{PluginEvent, PluginPayload};
use crate::registry::{EventPlugin, PluginManifest};

/// Batching window before the welcome message is sent.
pub const DEFAULT_DELAY: Duration = Duration::from_secs(300);

struct GroupBatch {
    participants: Vec<String>,
    generation: u64,
}

/// State shared between the handler and its spawned timers, keyed by
/// (instance phone, group JID).
type BatchMap = Arc<Mutex<HashMap<(String, String), GroupBatch>>>;

/// Greets new group participants with a single batched message.
pub struct WelcomePlugin {
    delay: Duration,
    batches: BatchMap,
}

impl WelcomePlugin {
    /// Plugin with the production 5-minute window.
    pub fn new() -> Self {
        Self::with_delay(DEFAULT_DELAY)
    }

    /// Plugin with an explicit window. Tests use short windows.
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            batches: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Number of participants currently pending for an instance's group.
    pub async fn pending_count(&self, phone: &str, group_jid: &str) -> usize {
        self.batches
            .lock()
            .await
            .get(&batch_key(phone, group_jid))
            .map(|b| b.participants.len())
            .unwrap_or(0)
    }

    async fn enqueue(&self, event: &PluginEvent, group_jid: &str, joined: &[String]) {
        let key = batch_key(&event.phone, group_jid);
        let generation = {
            let mut batches = self.batches.lock().await;
            let batch = batches.entry(key.clone()).or_insert(GroupBatch {
                participants: Vec::new(),
                generation: 0,
            });
            for participant in joined {
                if !batch.participants.contains(participant) {
                    batch.participants.push(participant.clone());
                }
            }
            // Re-arm: bump the generation so earlier timers become no-ops.
            batch.generation += 1;
            batch.generation
        };

        debug!(
            phone = %event.phone,
            group = %group_jid,
            joined = joined.len(),
            "welcome batch armed"
        );

        let batches = Arc::clone(&self.batches);
        let outbound = Arc::clone(&event.outbound);
        let phone = event.phone.clone();
        let group = group_jid.to_string();
        let delay = self.delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            let participants = {
                let mut batches = batches.lock().await;
                match batches.get(&key) {
                    Some(batch) if batch.generation == generation => {
                        batches.remove(&key).map(|b| b.participants)
                    }
                    // Re-armed or drained since this timer was set.
                    _ => None,
                }
            };

            let Some(participants) = participants else {
                return;
            };
            if participants.is_empty() {
                return;
            }

            let mentions: Vec<String> = participants
                .iter()
                .map(|jid| format!("@{}", jid.split('@').next().unwrap_or(jid)))
                .collect();
            let text = format!("Welcome to the group, {}!", mentions.join(", "));

            match outbound.send_text(&group, &text).await {
                Ok(_) => {
                    info!(
                        phone = %phone,
                        group = %group,
                        count = participants.len(),
                        "welcome message sent"
                    );
                }
                Err(e) => {
                    warn!(phone = %phone, group = %group, error = %e, "welcome send failed");
                }
            }
        });
    }

    async fn drain(&self, phone: &str, group_jid: &str, left: &[String]) {
        let key = batch_key(phone, group_jid);
        let mut batches = self.batches.lock().await;
        if let Some(batch) = batches.get_mut(&key) {
            batch.participants.retain(|p| !left.contains(p));
            if batch.participants.is_empty() {
                // Cancel-if-empty: dropping the entry orphans the timer.
                batches.remove(&key);
            }
        }
    }
}

/// Batch state is scoped to one instance's view of one group; two tenants
/// in the same group never share a batch.
fn batch_key(phone: &str, group_jid: &str) -> (String, String) {
    (phone.to_string(), group_jid.to_string())
}

impl Default for WelcomePlugin {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventPlugin for WelcomePlugin {
    fn manifest(&self) -> PluginManifest {
        PluginManifest {
            name: "welcome".to_string(),
            version: "0.1.0".to_string(),
            description: "Greets new group members with a batched welcome message".to_string(),
            default_enabled: false,
        }
    }

    async fn handle(&self, event: &PluginEvent) -> Result<(), WahubError> {
        let PluginPayload::GroupParticipants(update) = &event.payload else {
            return Ok(());
        };
        match update.action {
            wahub_core::types::ParticipantAction::Add => {
                self.enqueue(event, &update.group_jid, &update.participants).await;
            }
            wahub_core::types::ParticipantAction::Remove => {
                self.drain(&event.phone, &update.group_jid, &update.participants)
                    .await;
            }
            _ => {}
        }
        Ok(())
    }
}
