// SPDX-FileCopyrightText: 2026 Wahub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-process chat transport driver.
//!
//! `MemoryTransport` implements [`ChatTransport`] without any network: events
//! are injected into a queue and outbound sends are captured for inspection.
//! It backs the `memory` driver used by the sandbox mode and is the transport
//! used by the test harness. Cloning is cheap and shares the same session,
//! so a test can keep a handle to a transport it handed to an instance.

use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};

use wahub_core::types::{GroupMetadata, MediaPayload, TransportEvent};
use wahub_core::{ChatTransport, MessageId, TransportFactory, WahubError};

/// One captured outbound send.
#[derive(Debug, Clone)]
pub struct SentRecord {
    /// Destination JID.
    pub jid: String,
    /// Text content, or the media URL for media sends.
    pub content: String,
    /// Whether this was a media send.
    pub is_media: bool,
}

struct Inner {
    phone: String,
    events: Mutex<VecDeque<TransportEvent>>,
    notify: Notify,
    sent: Mutex<Vec<SentRecord>>,
    user_id: StdMutex<Option<String>>,
    fail_sends: AtomicBool,
    logged_out: AtomicBool,
    closed: AtomicBool,
    groups: Mutex<HashMap<String, GroupMetadata>>,
}

/// In-memory transport session.
#[derive(Clone)]
pub struct MemoryTransport {
    inner: Arc<Inner>,
}

impl MemoryTransport {
    /// Create a fresh unauthenticated session for `phone`.
    pub fn new(phone: &str) -> Self {
        Self {
            inner: Arc::new(Inner {
                phone: phone.to_string(),
                events: Mutex::new(VecDeque::new()),
                notify: Notify::new(),
                sent: Mutex::new(Vec::new()),
                user_id: StdMutex::new(None),
                fail_sends: AtomicBool::new(false),
                logged_out: AtomicBool::new(false),
                closed: AtomicBool::new(false),
                groups: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Inject an event; the next `next_event()` call will return it.
    pub async fn push_event(&self, event: TransportEvent) {
        self.inner.events.lock().await.push_back(event);
        self.inner.notify.notify_one();
    }

    /// All sends captured so far.
    pub async fn sent_messages(&self) -> Vec<SentRecord> {
        self.inner.sent.lock().await.clone()
    }

    /// Count of captured sends.
    pub async fn sent_count(&self) -> usize {
        self.inner.sent.lock().await.len()
    }

    /// Make subsequent sends fail with an upstream error.
    pub fn set_fail_sends(&self, fail: bool) {
        self.inner.fail_sends.store(fail, Ordering::SeqCst);
    }

    /// Register group metadata served by `group_metadata()`.
    pub async fn put_group(&self, metadata: GroupMetadata) {
        self.inner
            .groups
            .lock()
            .await
            .insert(metadata.jid.clone(), metadata);
    }

    /// Whether `logout()` was called on this session.
    pub fn was_logged_out(&self) -> bool {
        self.inner.logged_out.load(Ordering::SeqCst)
    }

    /// Whether `close()` was called on this session.
    pub fn was_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChatTransport for MemoryTransport {
    async fn next_event(&self) -> Result<TransportEvent, WahubError> {
        loop {
            {
                let mut queue = self.inner.events.lock().await;
                if let Some(event) = queue.pop_front() {
                    if matches!(event, TransportEvent::Open) {
                        let mut user_id = self
                            .inner
                            .user_id
                            .lock()
                            .unwrap_or_else(|p| p.into_inner());
                        *user_id = Some(format!("{}@s.whatsapp.net", self.inner.phone));
                    }
                    return Ok(event);
                }
            }
            self.inner.notify.notified().await;
        }
    }

    async fn send_text(&self, jid: &str, text: &str) -> Result<MessageId, WahubError> {
        if self.inner.fail_sends.load(Ordering::SeqCst) {
            return Err(WahubError::Upstream {
                message: "send rejected by upstream".to_string(),
                source: None,
            });
        }
        self.inner.sent.lock().await.push(SentRecord {
            jid: jid.to_string(),
            content: text.to_string(),
            is_media: false,
        });
        Ok(MessageId(format!("wamid-{}", uuid::Uuid::new_v4())))
    }

    async fn send_media(
        &self,
        jid: &str,
        media: &MediaPayload,
    ) -> Result<MessageId, WahubError> {
        if self.inner.fail_sends.load(Ordering::SeqCst) {
            return Err(WahubError::Upstream {
                message: "send rejected by upstream".to_string(),
                source: None,
            });
        }
        self.inner.sent.lock().await.push(SentRecord {
            jid: jid.to_string(),
            content: media.url.clone(),
            is_media: true,
        });
        Ok(MessageId(format!("wamid-{}", uuid::Uuid::new_v4())))
    }

    async fn group_metadata(&self, jid: &str) -> Result<GroupMetadata, WahubError> {
        self.inner
            .groups
            .lock()
            .await
            .get(jid)
            .cloned()
            .ok_or_else(|| WahubError::Upstream {
                message: format!("group {jid} not found upstream"),
                source: None,
            })
    }

    async fn logout(&self) -> Result<(), WahubError> {
        self.inner.logged_out.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn close(&self) -> Result<(), WahubError> {
        self.inner.closed.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn user_id(&self) -> Option<String> {
        self.inner
            .user_id
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }
}

/// Factory for [`MemoryTransport`] sessions.
///
/// Keeps a handle to every transport it creates, keyed by phone, so the
/// sandbox and tests can script events after the instance has taken
/// ownership. With `auto_script` enabled (the sandbox default), new sessions
/// immediately advertise a QR when no credentials exist and open directly
/// when they do.
pub struct MemoryTransportFactory {
    auto_script: bool,
    handles: StdMutex<HashMap<String, MemoryTransport>>,
    created: std::sync::atomic::AtomicUsize,
}

impl MemoryTransportFactory {
    /// Factory with sandbox auto-scripting.
    pub fn new() -> Self {
        Self {
            auto_script: true,
            handles: StdMutex::new(HashMap::new()),
            created: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    /// Factory whose sessions emit nothing until scripted. For tests.
    pub fn manual() -> Self {
        Self {
            auto_script: false,
            handles: StdMutex::new(HashMap::new()),
            created: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    /// Handle to the most recent session created for `phone`.
    pub fn handle(&self, phone: &str) -> Option<MemoryTransport> {
        self.handles
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .get(phone)
            .cloned()
    }

    /// Total sessions created so far. Lets tests detect a reconnect's fresh
    /// session.
    pub fn created_count(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }
}

impl Default for MemoryTransportFactory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TransportFactory for MemoryTransportFactory {
    async fn create(
        &self,
        phone: &str,
        creds_dir: &Path,
    ) -> Result<Box<dyn ChatTransport>, WahubError> {
        let transport = MemoryTransport::new(phone);

        if self.auto_script {
            transport.push_event(TransportEvent::Connecting).await;
            if creds_dir.join("creds.json").is_file() {
                transport.push_event(TransportEvent::Open).await;
            } else {
                transport
                    .push_event(TransportEvent::QrCode(format!(
                        "2@{},sandbox",
                        uuid::Uuid::new_v4()
                    )))
                    .await;
            }
        }

        self.handles
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .insert(phone.to_string(), transport.clone());
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(transport))
    }
}
