// SPDX-FileCopyrightText: 2026 Wahub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! One tenant session: the connection state machine, the inbound and
//! outbound pipelines, and the group metadata cache.
//!
//! An instance owns exactly one transport session at a time. Transport
//! events are handled in arrival order by a single spawned task; each
//! `start()` bumps an epoch so superseded loops and stale reconnect timers
//! become no-ops instead of fighting the new session.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex, RwLock as StdRwLock};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use wahub_core::sanitize::sanitize;
use wahub_core::types::{
    CloseInfo, ConnectionPhase, GroupMetadata, GroupParticipantsUpdate, InstanceSnapshot,
    MediaPayload, MessageKind, TransportEvent, UpstreamMessage,
};
use wahub_core::{
    ChatTransport, EventKind, InstanceStatus, MessageId, MessageStatus, OutboundPort,
    TransportFactory, WahubError,
};
use wahub_plugin::{PluginChain, PluginEvent, PluginPayload};
use wahub_storage::models::MessageRecord;
use wahub_storage::queries::{instances as instance_queries, logs, messages as message_queries};
use wahub_storage::{now_iso, Database};
use wahub_transport::{error_class, jid, CredentialStore};
use wahub_webhook::WebhookDispatcher;

/// Tunables for one instance's lifecycle.
#[derive(Debug, Clone)]
pub struct InstanceSettings {
    /// Reconnection attempts before the session is considered logged out.
    pub max_reconnect_attempts: u32,
    /// Delay between reconnection attempts.
    pub reconnect_delay: Duration,
    /// Quiescence window between close and re-open on a manual restart.
    pub restart_quiescence: Duration,
    /// Upstream close codes treated as transient even during manual restart.
    pub stream_restart_codes: Vec<u16>,
    /// Timeout for group metadata queries.
    pub group_metadata_timeout: Duration,
    /// Total timeout for webhook deliveries.
    pub webhook_timeout: Duration,
}

impl Default for InstanceSettings {
    fn default() -> Self {
        Self {
            max_reconnect_attempts: 5,
            reconnect_delay: Duration::from_secs(5),
            restart_quiescence: Duration::from_secs(1),
            stream_restart_codes: vec![515],
            group_metadata_timeout: Duration::from_secs(10),
            webhook_timeout: Duration::from_secs(5),
        }
    }
}

struct Profile {
    name: String,
    alias: Option<String>,
}

/// One live tenant session.
pub struct Instance {
    record_id: String,
    phone: String,
    profile: StdRwLock<Profile>,
    settings: InstanceSettings,
    db: Database,
    creds: CredentialStore,
    factory: Arc<dyn TransportFactory>,
    chain: Arc<PluginChain>,
    dispatcher: Arc<WebhookDispatcher>,

    status: StdRwLock<InstanceStatus>,
    qr_code: StdRwLock<Option<String>>,
    reconnect_attempts: AtomicU32,
    manual_restart: AtomicBool,
    epoch: AtomicU64,
    transport: RwLock<Option<Arc<dyn ChatTransport>>>,
    event_task: StdMutex<Option<JoinHandle<()>>>,
    group_cache: Mutex<HashMap<String, GroupMetadata>>,
    /// Upstream message id -> stored row id, for delivery acks.
    sent_index: Mutex<HashMap<String, String>>,
}

impl Instance {
    /// Build an instance around its persisted identity. Does not connect.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        record_id: &str,
        phone: &str,
        name: &str,
        alias: Option<String>,
        settings: InstanceSettings,
        db: Database,
        creds: CredentialStore,
        factory: Arc<dyn TransportFactory>,
        chain: Arc<PluginChain>,
    ) -> Arc<Self> {
        let dispatcher = Arc::new(WebhookDispatcher::with_timeout(
            db.clone(),
            record_id,
            phone,
            settings.webhook_timeout,
        ));
        Arc::new(Self {
            record_id: record_id.to_string(),
            phone: phone.to_string(),
            profile: StdRwLock::new(Profile {
                name: name.to_string(),
                alias,
            }),
            settings,
            db,
            creds,
            factory,
            chain,
            dispatcher,
            status: StdRwLock::new(InstanceStatus::Pending),
            qr_code: StdRwLock::new(None),
            reconnect_attempts: AtomicU32::new(0),
            manual_restart: AtomicBool::new(false),
            epoch: AtomicU64::new(0),
            transport: RwLock::new(None),
            event_task: StdMutex::new(None),
            group_cache: Mutex::new(HashMap::new()),
            sent_index: Mutex::new(HashMap::new()),
        })
    }

    /// The instance's persisted id.
    pub fn record_id(&self) -> &str {
        &self.record_id
    }

    /// The phone this instance is keyed by.
    pub fn phone(&self) -> &str {
        &self.phone
    }

    /// The per-instance plugin chain.
    pub fn chain(&self) -> &Arc<PluginChain> {
        &self.chain
    }

    /// The per-instance webhook dispatcher.
    pub fn dispatcher(&self) -> &Arc<WebhookDispatcher> {
        &self.dispatcher
    }

    /// Current in-memory status (authoritative within the process).
    pub fn status(&self) -> InstanceStatus {
        *self.read_lock(&self.status)
    }

    /// Reconnection attempts consumed since the last successful open.
    pub fn reconnect_attempts(&self) -> u32 {
        self.reconnect_attempts.load(Ordering::SeqCst)
    }

    /// Update the in-memory display name/alias (already persisted by the
    /// manager).
    pub fn set_profile(&self, name: Option<String>, alias: Option<String>) {
        let mut profile = self.write_lock(&self.profile);
        if let Some(name) = name {
            profile.name = name;
        }
        if let Some(alias) = alias {
            profile.alias = Some(alias);
        }
    }

    /// Point-in-time view served by the control API.
    pub async fn snapshot(&self) -> InstanceSnapshot {
        let status = self.status();
        let (name, alias) = {
            let profile = self.read_lock(&self.profile);
            (profile.name.clone(), profile.alias.clone())
        };
        let user_id = self
            .transport
            .read()
            .await
            .as_ref()
            .and_then(|t| t.user_id());
        InstanceSnapshot {
            id: self.record_id.clone(),
            phone: self.phone.clone(),
            name,
            alias,
            status: status.to_string(),
            is_connected: status == InstanceStatus::Active,
            qr_code: self.read_lock(&self.qr_code).clone(),
            reconnect_attempts: self.reconnect_attempts(),
            user_id,
        }
    }

    // --- Lifecycle ---

    /// Open a fresh transport session and spawn its event loop.
    ///
    /// Any previous session loop is superseded.
    pub async fn start(self: &Arc<Self>) -> Result<(), WahubError> {
        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(handle) = self.write_lock_task().take() {
            handle.abort();
        }

        self.set_status(InstanceStatus::Connecting).await;
        let creds_dir = self.creds.dir_for(&self.phone);
        let transport = match self.factory.create(&self.phone, &creds_dir).await {
            Ok(transport) => transport,
            Err(e) => {
                error!(phone = %self.phone, error = %e, "transport open failed");
                self.set_status(InstanceStatus::Error).await;
                self.log("error", &format!("transport open failed: {e}")).await;
                return Err(e);
            }
        };
        let transport: Arc<dyn ChatTransport> = Arc::from(transport);
        *self.transport.write().await = Some(Arc::clone(&transport));

        let handle = self.spawn_event_loop(transport, epoch);
        *self.write_lock_task() = Some(handle);
        info!(phone = %self.phone, "instance started");
        Ok(())
    }

    /// Mark a manual restart, close the session without logging out, wait
    /// the quiescence window, then re-open. Credentials are preserved.
    pub async fn restart(self: &Arc<Self>) -> Result<(), WahubError> {
        info!(phone = %self.phone, "manual restart requested");
        self.manual_restart.store(true, Ordering::SeqCst);

        if let Some(transport) = self.transport.write().await.take() {
            if let Err(e) = transport.close().await {
                warn!(phone = %self.phone, error = %e, "close during restart failed");
            }
        }
        self.emit_connection_update(ConnectionPhase::ManualRestart).await;
        tokio::time::sleep(self.settings.restart_quiescence).await;

        // Consume the flag if no close event did: a later unrelated close
        // must not be mistaken for this restart.
        self.manual_restart.store(false, Ordering::SeqCst);
        self.reconnect_attempts.store(0, Ordering::SeqCst);
        self.start().await
    }

    /// Best-effort close for process shutdown: no logout, credentials and
    /// persisted row untouched.
    pub async fn shutdown(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        if let Some(handle) = self.write_lock_task().take() {
            handle.abort();
        }
        if let Some(transport) = self.transport.write().await.take() {
            if let Err(e) = transport.close().await {
                warn!(phone = %self.phone, error = %e, "close during shutdown failed");
            }
        }
    }

    /// Tear the session down for deletion: log out upstream, close, drop
    /// runtime state, and remove the credential directory.
    pub async fn teardown(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        if let Some(handle) = self.write_lock_task().take() {
            handle.abort();
        }
        if let Some(transport) = self.transport.write().await.take() {
            if let Err(e) = transport.logout().await {
                warn!(phone = %self.phone, error = %e, "logout during teardown failed");
            }
            if let Err(e) = transport.close().await {
                warn!(phone = %self.phone, error = %e, "close during teardown failed");
            }
        }
        if let Err(e) = self.creds.delete(&self.phone).await {
            warn!(phone = %self.phone, error = %e, "credential cleanup failed");
        }
        *self.write_lock(&self.status) = InstanceStatus::LoggedOut;
    }

    // --- Event loop ---

    fn spawn_event_loop(
        self: &Arc<Self>,
        transport: Arc<dyn ChatTransport>,
        epoch: u64,
    ) -> JoinHandle<()> {
        let instance = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                let event = match transport.next_event().await {
                    Ok(event) => event,
                    Err(e) => {
                        // Route the upstream error text through the
                        // classifier rather than a blanket sink.
                        error_class::log_upstream_error(&instance.phone, &e.to_string());
                        break;
                    }
                };
                if instance.epoch.load(Ordering::SeqCst) != epoch {
                    // A newer session took over.
                    break;
                }
                match event {
                    TransportEvent::Close(info) => {
                        instance.handle_close(info).await;
                        break;
                    }
                    other => instance.handle_event(other).await,
                }
            }
        })
    }

    async fn handle_event(self: &Arc<Self>, event: TransportEvent) {
        match event {
            TransportEvent::QrCode(code) => {
                *self.write_lock(&self.qr_code) = Some(code);
                self.set_status(InstanceStatus::QrReady).await;
                self.emit_connection_update(ConnectionPhase::QrReady).await;
            }
            TransportEvent::Connecting => {
                self.set_status(InstanceStatus::Connecting).await;
                self.emit_connection_update(ConnectionPhase::Connecting).await;
            }
            TransportEvent::Open => {
                self.reconnect_attempts.store(0, Ordering::SeqCst);
                *self.write_lock(&self.qr_code) = None;
                self.set_status(InstanceStatus::Active).await;
                self.log("info", "connection established").await;
                self.emit_connection_update(ConnectionPhase::Connected).await;
            }
            TransportEvent::CredentialsUpdate(blob) => {
                if let Err(e) = self.creds.save(&self.phone, &blob).await {
                    error!(phone = %self.phone, error = %e, "credential save failed");
                }
            }
            TransportEvent::Messages(batch) => {
                for message in batch {
                    // Outbound acknowledgements bypass the inbound pipeline.
                    if message.from_me {
                        continue;
                    }
                    self.handle_inbound_message(message).await;
                }
            }
            TransportEvent::GroupParticipants(update) => {
                self.handle_group_update(update).await;
            }
            TransportEvent::Ack(ack) => {
                self.handle_ack(ack).await;
            }
            TransportEvent::Close(_) => unreachable!("close handled by the loop"),
        }
    }

    /// Advance a stored outgoing message to the acknowledged status.
    ///
    /// Acks for messages this process did not send (or sent before a
    /// restart) have no index entry and are dropped.
    async fn handle_ack(&self, ack: wahub_core::types::MessageAck) {
        let row_id = {
            let mut index = self.sent_index.lock().await;
            match ack.status {
                // Terminal statuses: the index entry is no longer needed.
                MessageStatus::Read | MessageStatus::Failed => index.remove(&ack.upstream_id),
                _ => index.get(&ack.upstream_id).cloned(),
            }
        };
        let Some(row_id) = row_id else {
            debug!(
                phone = %self.phone,
                upstream_id = %ack.upstream_id,
                "ack for unknown message"
            );
            return;
        };
        if let Err(e) =
            message_queries::update_message_status(&self.db, &row_id, &ack.status.to_string())
                .await
        {
            warn!(phone = %self.phone, error = %e, "message status update failed");
        }
    }

    /// The inbound pipeline: sanitise, persist, plugin chain, webhook.
    ///
    /// Each stage is contained: a failure is logged and the remaining
    /// stages still run.
    async fn handle_inbound_message(self: &Arc<Self>, message: UpstreamMessage) {
        let raw = sanitize(&message.raw);
        let content = json!({
            "text": message.text,
            "push_name": message.push_name,
            "upstream_id": message.id,
            "upstream_timestamp": message.timestamp,
            "raw": raw,
        });

        let record = MessageRecord {
            id: uuid::Uuid::new_v4().to_string(),
            instance_id: self.record_id.clone(),
            direction: "incoming".to_string(),
            from_jid: message.sender_jid.clone(),
            to_jid: self.bound_jid().await,
            kind: message.kind.to_string(),
            content: content.to_string(),
            status: "received".to_string(),
            sent_at: upstream_timestamp_iso(message.timestamp),
            created_at: now_iso(),
        };
        if let Err(e) = message_queries::insert_message(&self.db, &record).await {
            error!(phone = %self.phone, error = %e, "inbound message persistence failed");
        }

        let event = PluginEvent {
            phone: self.phone.clone(),
            payload: PluginPayload::Message(message.clone()),
            outbound: self.outbound_port(),
        };
        self.chain.dispatch(&event).await;

        let data = json!({
            "id": message.id,
            "from": message.chat_jid,
            "sender": message.sender_jid,
            "push_name": message.push_name,
            "kind": message.kind,
            "text": message.text,
            "timestamp": message.timestamp,
        });
        self.dispatcher.emit(EventKind::MessageReceived, data).await;
    }

    /// Group membership changes flow through plugins and webhooks only;
    /// nothing is persisted as a message.
    async fn handle_group_update(self: &Arc<Self>, update: GroupParticipantsUpdate) {
        let event = PluginEvent {
            phone: self.phone.clone(),
            payload: PluginPayload::GroupParticipants(update.clone()),
            outbound: self.outbound_port(),
        };
        self.chain.dispatch(&event).await;

        let data = json!({
            "type": "group_participants",
            "group": update.group_jid,
            "action": update.action,
            "participants": update.participants,
        });
        self.dispatcher.emit(EventKind::MessageReceived, data).await;
    }

    async fn handle_close(self: &Arc<Self>, info: CloseInfo) {
        // The manual-restart flag is single-shot: consumed by the first
        // close after it was set.
        let was_manual = self.manual_restart.swap(false, Ordering::SeqCst);
        let attempts = self.reconnect_attempts.load(Ordering::SeqCst);
        let transparent = info
            .code
            .map(|code| self.settings.stream_restart_codes.contains(&code))
            .unwrap_or(false);

        // The close reason carries the upstream's error text; classify it so
        // benign churn stays at debug and real failures surface at warn.
        error_class::log_upstream_error(&self.phone, &info.reason);
        debug!(
            phone = %self.phone,
            code = ?info.code,
            logout = info.logout,
            attempts,
            was_manual,
            "transport closed"
        );

        if info.logout {
            self.log("warn", "session logged out upstream").await;
            self.soft_clean().await;
            self.emit_connection_update(ConnectionPhase::LoggedOut).await;
            return;
        }

        if was_manual && !transparent {
            // Close requested by restart(): retain credentials and wait for
            // the follow-up start().
            self.set_status(InstanceStatus::Inactive).await;
            return;
        }

        if attempts >= self.settings.max_reconnect_attempts {
            self.log(
                "error",
                &format!("giving up after {attempts} reconnection attempts"),
            )
            .await;
            self.soft_clean().await;
            self.emit_connection_update(ConnectionPhase::LoggedOut).await;
            return;
        }

        let attempt = attempts + 1;
        self.reconnect_attempts.store(attempt, Ordering::SeqCst);
        self.set_status(InstanceStatus::Reconnecting).await;
        self.emit_connection_update(ConnectionPhase::Reconnecting).await;
        info!(
            phone = %self.phone,
            attempt,
            max = self.settings.max_reconnect_attempts,
            "scheduling reconnect"
        );

        let instance = Arc::clone(self);
        let epoch = self.epoch.load(Ordering::SeqCst);
        let delay = self.settings.reconnect_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if instance.epoch.load(Ordering::SeqCst) != epoch {
                return;
            }
            if instance.status() != InstanceStatus::Reconnecting {
                return;
            }
            if let Err(e) = instance.start().await {
                error!(phone = %instance.phone, error = %e, "reconnect failed");
            }
        });
    }

    /// Soft-clean: drop runtime handles and credential bytes; the persisted
    /// row stays (status `inactive`) so the tenant can re-authenticate.
    async fn soft_clean(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        if let Some(transport) = self.transport.write().await.take() {
            if let Err(e) = transport.close().await {
                warn!(phone = %self.phone, error = %e, "close during soft-clean failed");
            }
        }
        if let Err(e) = self.creds.delete(&self.phone).await {
            warn!(phone = %self.phone, error = %e, "credential cleanup failed");
        }
        *self.write_lock(&self.qr_code) = None;
        *self.write_lock(&self.status) = InstanceStatus::LoggedOut;
        if let Err(e) =
            instance_queries::update_instance_status(&self.db, &self.phone, "inactive").await
        {
            warn!(phone = %self.phone, error = %e, "status persistence failed");
        }
    }

    // --- Outbound pipeline ---

    /// Send a text message to a phone number or user JID.
    pub async fn send_text(&self, to: &str, text: &str) -> Result<MessageId, WahubError> {
        if text.is_empty() {
            return Err(WahubError::BadInput("message must not be empty".into()));
        }
        let jid = jid::to_user_jid(to)?;
        self.send_text_jid(&jid, text).await
    }

    /// Send a text message to a group.
    pub async fn send_group_text(
        &self,
        group_id: &str,
        text: &str,
    ) -> Result<MessageId, WahubError> {
        if text.is_empty() {
            return Err(WahubError::BadInput("message must not be empty".into()));
        }
        let jid = jid::to_group_jid(group_id)?;
        self.send_text_jid(&jid, text).await
    }

    async fn send_text_jid(&self, jid: &str, text: &str) -> Result<MessageId, WahubError> {
        let transport = self.connected_transport().await?;
        match transport.send_text(jid, text).await {
            Ok(message_id) => {
                self.record_outgoing(jid, MessageKind::Text, json!({"text": text}), &message_id)
                    .await;
                self.log("info", &format!("text sent to {jid}")).await;
                Ok(message_id)
            }
            Err(e) => {
                error_class::log_upstream_error(&self.phone, &e.to_string());
                self.log("error", &format!("send to {jid} failed: {e}")).await;
                Err(e)
            }
        }
    }

    /// Send a media message.
    pub async fn send_media(
        &self,
        to: &str,
        media: &MediaPayload,
    ) -> Result<MessageId, WahubError> {
        if !matches!(
            media.kind,
            MessageKind::Image | MessageKind::Video | MessageKind::Audio | MessageKind::Document
        ) {
            return Err(WahubError::BadInput(format!(
                "unsupported media kind: {}",
                media.kind
            )));
        }
        if media.url.is_empty() {
            return Err(WahubError::BadInput("media url must not be empty".into()));
        }
        let jid = if jid::is_group_jid(to) {
            to.to_string()
        } else {
            jid::to_user_jid(to)?
        };

        let transport = self.connected_transport().await?;
        match transport.send_media(&jid, media).await {
            Ok(message_id) => {
                self.record_outgoing(
                    &jid,
                    media.kind,
                    json!({
                        "url": media.url,
                        "caption": media.caption,
                        "filename": media.filename,
                    }),
                    &message_id,
                )
                .await;
                self.log("info", &format!("{} sent to {jid}", media.kind)).await;
                Ok(message_id)
            }
            Err(e) => {
                error_class::log_upstream_error(&self.phone, &e.to_string());
                self.log("error", &format!("media send to {jid} failed: {e}")).await;
                Err(e)
            }
        }
    }

    async fn connected_transport(&self) -> Result<Arc<dyn ChatTransport>, WahubError> {
        let status = self.status();
        if status != InstanceStatus::Active {
            return Err(WahubError::NotConnected {
                phone: self.phone.clone(),
                status: status.to_string(),
            });
        }
        self.transport
            .read()
            .await
            .clone()
            .ok_or_else(|| WahubError::NotConnected {
                phone: self.phone.clone(),
                status: status.to_string(),
            })
    }

    async fn record_outgoing(
        &self,
        to_jid: &str,
        kind: MessageKind,
        mut content: serde_json::Value,
        message_id: &MessageId,
    ) {
        content["upstream_id"] = json!(message_id.0);
        let record = MessageRecord {
            id: uuid::Uuid::new_v4().to_string(),
            instance_id: self.record_id.clone(),
            direction: "outgoing".to_string(),
            from_jid: self.bound_jid().await,
            to_jid: to_jid.to_string(),
            kind: kind.to_string(),
            content: content.to_string(),
            status: "sent".to_string(),
            sent_at: Some(now_iso()),
            created_at: now_iso(),
        };
        if let Err(e) = message_queries::insert_message(&self.db, &record).await {
            error!(phone = %self.phone, error = %e, "outgoing message persistence failed");
        }
        self.sent_index
            .lock()
            .await
            .insert(message_id.0.clone(), record.id.clone());

        let data = json!({
            "id": message_id.0,
            "to": to_jid,
            "kind": kind,
        });
        self.dispatcher.emit(EventKind::MessageSent, data).await;
    }

    // --- Group metadata cache ---

    /// Group metadata, memoised per JID for the life of the instance.
    ///
    /// A transport failure or timeout yields `None` and is not cached.
    pub async fn group_metadata(&self, group_jid: &str) -> Option<GroupMetadata> {
        if let Some(cached) = self.group_cache.lock().await.get(group_jid).cloned() {
            return Some(cached);
        }
        let transport = self.transport.read().await.clone()?;
        let result = tokio::time::timeout(
            self.settings.group_metadata_timeout,
            transport.group_metadata(group_jid),
        )
        .await;
        match result {
            Ok(Ok(metadata)) => {
                self.group_cache
                    .lock()
                    .await
                    .insert(group_jid.to_string(), metadata.clone());
                Some(metadata)
            }
            Ok(Err(e)) => {
                debug!(phone = %self.phone, group = %group_jid, error = %e, "group metadata query failed");
                None
            }
            Err(_) => {
                warn!(phone = %self.phone, group = %group_jid, "group metadata query timed out");
                None
            }
        }
    }

    // --- Helpers ---

    fn outbound_port(self: &Arc<Self>) -> Arc<dyn OutboundPort> {
        Arc::new(InstanceOutbound {
            instance: Arc::clone(self),
        })
    }

    async fn bound_jid(&self) -> String {
        self.transport
            .read()
            .await
            .as_ref()
            .and_then(|t| t.user_id())
            .unwrap_or_else(|| format!("{}{}", self.phone, jid::USER_SUFFIX))
    }

    async fn set_status(&self, status: InstanceStatus) {
        *self.write_lock(&self.status) = status;
        if let Err(e) =
            instance_queries::update_instance_status(&self.db, &self.phone, &status.to_string())
                .await
        {
            warn!(phone = %self.phone, error = %e, "status persistence failed");
        }
    }

    async fn emit_connection_update(&self, phase: ConnectionPhase) {
        let data = json!({
            "status": phase,
            "phone": self.phone,
        });
        self.dispatcher.emit(EventKind::ConnectionUpdate, data).await;
    }

    async fn log(&self, level: &str, message: &str) {
        if let Err(e) = logs::append_log(&self.db, &self.record_id, level, message).await {
            warn!(phone = %self.phone, error = %e, "instance log write failed");
        }
    }

    fn read_lock<'a, T>(&self, lock: &'a StdRwLock<T>) -> std::sync::RwLockReadGuard<'a, T> {
        lock.read().unwrap_or_else(|p| p.into_inner())
    }

    fn write_lock<'a, T>(&self, lock: &'a StdRwLock<T>) -> std::sync::RwLockWriteGuard<'a, T> {
        lock.write().unwrap_or_else(|p| p.into_inner())
    }

    fn write_lock_task(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        self.event_task.lock().unwrap_or_else(|p| p.into_inner())
    }
}

/// Send seam handed to plugins; routes through the full outbound pipeline.
struct InstanceOutbound {
    instance: Arc<Instance>,
}

#[async_trait]
impl OutboundPort for InstanceOutbound {
    async fn send_text(&self, to: &str, text: &str) -> Result<MessageId, WahubError> {
        if jid::is_group_jid(to) {
            self.instance.send_group_text(to, text).await
        } else {
            self.instance.send_text(to, text).await
        }
    }
}

fn upstream_timestamp_iso(timestamp: i64) -> Option<String> {
    chrono::DateTime::from_timestamp(timestamp, 0)
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_match_policy() {
        let settings = InstanceSettings::default();
        assert_eq!(settings.max_reconnect_attempts, 5);
        assert_eq!(settings.reconnect_delay, Duration::from_secs(5));
        assert_eq!(settings.group_metadata_timeout, Duration::from_secs(10));
        assert_eq!(settings.webhook_timeout, Duration::from_secs(5));
        assert_eq!(settings.stream_restart_codes, vec![515]);
    }

    #[test]
    fn upstream_timestamp_renders_iso() {
        let iso = upstream_timestamp_iso(1_760_000_000).unwrap();
        assert!(iso.starts_with("2025-10-09T"));
        assert!(iso.ends_with('Z'));
    }
}
