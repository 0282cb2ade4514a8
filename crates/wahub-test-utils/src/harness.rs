// SPDX-FileCopyrightText: 2026 Wahub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Isolated end-to-end harness: temp SQLite, temp credential root, a
//! manually scripted in-memory transport factory, and a manager wired to
//! all of them.
//!
//! Timings are shrunk so reconnection and restart paths run in
//! milliseconds. Each harness is fully independent; tests can run in
//! parallel.

use std::sync::Arc;
use std::time::Duration;

use wahub_core::types::TransportEvent;
use wahub_core::{InstanceStatus, TransportFactory};
use wahub_instance::{InstanceManager, InstanceSettings};
use wahub_plugin::PluginRegistry;
use wahub_storage::Database;
use wahub_transport::{CredentialStore, MemoryTransport, MemoryTransportFactory};

/// Builder for [`TestHarness`].
pub struct TestHarnessBuilder {
    settings: InstanceSettings,
}

impl TestHarnessBuilder {
    /// Override the instance settings entirely.
    pub fn with_settings(mut self, settings: InstanceSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Override just the reconnect delay.
    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.settings.reconnect_delay = delay;
        self
    }

    /// Build the harness.
    pub async fn build(self) -> TestHarness {
        let dir = tempfile::tempdir().expect("tempdir");
        let db = Database::open(dir.path().join("wahub.db").to_str().expect("utf-8 path"))
            .await
            .expect("database open");
        let creds = CredentialStore::new(dir.path().join("auth"));
        let factory = Arc::new(MemoryTransportFactory::manual());
        let registry = Arc::new(PluginRegistry::builtin());
        let manager = InstanceManager::new(
            db.clone(),
            Arc::clone(&registry),
            Arc::clone(&factory) as Arc<dyn TransportFactory>,
            creds.clone(),
            self.settings,
        );
        TestHarness {
            manager,
            registry,
            factory,
            creds,
            db,
            _dir: dir,
        }
    }
}

/// A fully wired, isolated gateway core for integration tests.
pub struct TestHarness {
    /// The manager under test.
    pub manager: Arc<InstanceManager>,
    /// The shared plugin registry.
    pub registry: Arc<PluginRegistry>,
    /// The transport factory; use it to reach per-phone session handles.
    pub factory: Arc<MemoryTransportFactory>,
    /// The credential store rooted in the harness temp dir.
    pub creds: CredentialStore,
    /// The backing database.
    pub db: Database,
    _dir: tempfile::TempDir,
}

impl TestHarness {
    /// Builder with millisecond timings.
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder {
            settings: InstanceSettings {
                reconnect_delay: Duration::from_millis(30),
                restart_quiescence: Duration::from_millis(10),
                ..InstanceSettings::default()
            },
        }
    }

    /// Create an instance and return its scripted transport handle.
    pub async fn create_instance(&self, phone: &str) -> MemoryTransport {
        self.manager
            .create(phone, &format!("harness-{phone}"), None)
            .await
            .expect("instance create");
        self.factory.handle(phone).expect("transport handle")
    }

    /// Create an instance and drive it to `active`.
    pub async fn create_connected_instance(&self, phone: &str) -> MemoryTransport {
        let transport = self.create_instance(phone).await;
        transport.push_event(TransportEvent::Open).await;
        self.wait_for_status(phone, InstanceStatus::Active).await;
        transport
    }

    /// Poll until the instance reaches `expected`, panicking after ~1s.
    pub async fn wait_for_status(&self, phone: &str, expected: InstanceStatus) {
        for _ in 0..100 {
            if let Some(instance) = self.manager.get(phone) {
                if instance.status() == expected {
                    return;
                }
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        let actual = self.manager.get(phone).map(|i| i.status());
        panic!("instance {phone} never reached {expected}, last seen {actual:?}");
    }
}
