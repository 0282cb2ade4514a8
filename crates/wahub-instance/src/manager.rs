// SPDX-FileCopyrightText: 2026 Wahub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Process-wide instance registry.
//!
//! The manager is an explicit value constructed at startup and threaded into
//! the control API; all registry mutation goes through it. The map is never
//! held across an await that re-enters instance operations: look up, clone
//! the Arc, release, operate.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use serde::Serialize;
use tracing::{error, info, warn};

use wahub_core::types::InstanceSnapshot;
use wahub_core::{InstanceStatus, MediaPayload, MessageId, TransportFactory, WahubError};
use wahub_plugin::{PluginChain, PluginRegistry};
use wahub_storage::models::InstanceRecord;
use wahub_storage::queries::instances as instance_queries;
use wahub_storage::{now_iso, retention, Database};
use wahub_transport::{jid, CredentialStore};

use crate::instance::{Instance, InstanceSettings};

/// Aggregate view returned by [`InstanceManager::status`].
#[derive(Debug, Clone, Serialize)]
pub struct ManagerStatus {
    /// Whether `initialize()` has completed.
    pub initialized: bool,
    /// Instances persisted in the store.
    pub persisted_count: i64,
    /// Instances resident in memory.
    pub resident_count: usize,
    /// Resident instances with an open authenticated session.
    pub connected_count: usize,
    /// Per-instance snapshots of resident instances.
    pub instances: Vec<InstanceSnapshot>,
}

/// Status string reported for persisted-but-not-resident instances.
const DEGRADED_STATUS: &str = "disconnected";

/// Single authority over the set of live instances.
pub struct InstanceManager {
    db: Database,
    registry: Arc<PluginRegistry>,
    factory: Arc<dyn TransportFactory>,
    creds: CredentialStore,
    settings: InstanceSettings,
    instances: DashMap<String, Arc<Instance>>,
    initialized: AtomicBool,
}

impl InstanceManager {
    /// Build a manager. No instances are loaded until `initialize()`.
    pub fn new(
        db: Database,
        registry: Arc<PluginRegistry>,
        factory: Arc<dyn TransportFactory>,
        creds: CredentialStore,
        settings: InstanceSettings,
    ) -> Arc<Self> {
        Arc::new(Self {
            db,
            registry,
            factory,
            creds,
            settings,
            instances: DashMap::new(),
            initialized: AtomicBool::new(false),
        })
    }

    /// The database handle shared with the control API layer.
    pub fn db(&self) -> &Database {
        &self.db
    }

    /// The process-wide plugin registry.
    pub fn registry(&self) -> &Arc<PluginRegistry> {
        &self.registry
    }

    /// Restore persisted instances and start those that were running.
    ///
    /// Idempotent: repeated calls are no-ops. Per-instance start failures
    /// are logged and do not abort initialization.
    pub async fn initialize(self: &Arc<Self>) -> Result<(), WahubError> {
        if self.initialized.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let records = instance_queries::list_instances(&self.db).await?;
        info!(count = records.len(), "restoring persisted instances");

        for record in records {
            let should_start = matches!(record.status.as_str(), "active" | "connecting");
            if !should_start {
                continue;
            }
            let instance = self.materialize(&record).await;
            self.instances.insert(record.phone.clone(), Arc::clone(&instance));
            if let Err(e) = instance.start().await {
                error!(
                    phone = %record.phone,
                    error = %e,
                    "instance restore failed; leaving it offline"
                );
            }
        }
        Ok(())
    }

    /// Create, persist, and start a new instance.
    pub async fn create(
        self: &Arc<Self>,
        phone: &str,
        name: &str,
        alias: Option<String>,
    ) -> Result<InstanceSnapshot, WahubError> {
        let phone = normalize_phone(phone)?;

        if self.instances.contains_key(&phone)
            || instance_queries::get_instance_by_phone(&self.db, &phone)
                .await?
                .is_some()
        {
            return Err(WahubError::AlreadyExists { phone });
        }

        let record = InstanceRecord {
            id: uuid::Uuid::new_v4().to_string(),
            phone: phone.clone(),
            name: name.to_string(),
            alias,
            status: InstanceStatus::Pending.to_string(),
            plugins: "{}".to_string(),
            created_at: now_iso(),
            updated_at: now_iso(),
        };
        instance_queries::create_instance(&self.db, &record).await?;

        let instance = self.materialize(&record).await;
        self.instances.insert(phone.clone(), Arc::clone(&instance));
        instance.start().await?;

        info!(phone = %phone, "instance created");
        Ok(instance.snapshot().await)
    }

    /// The in-memory handle for a phone, when resident.
    pub fn get(&self, phone: &str) -> Option<Arc<Instance>> {
        let phone = jid::digits_only(phone);
        self.instances.get(&phone).map(|entry| Arc::clone(&entry))
    }

    /// Snapshot of one instance.
    ///
    /// Falls back to a degraded view derived from the persisted record when
    /// the instance is not resident.
    pub async fn view(&self, phone: &str) -> Result<InstanceSnapshot, WahubError> {
        let phone = jid::digits_only(phone);
        if let Some(instance) = self.get(&phone) {
            return Ok(instance.snapshot().await);
        }
        let record = instance_queries::get_instance_by_phone(&self.db, &phone)
            .await?
            .ok_or_else(|| WahubError::instance_not_found(&phone))?;
        Ok(degraded_snapshot(&record))
    }

    /// Snapshots of every persisted instance (resident ones live, the rest
    /// degraded).
    pub async fn list_views(&self) -> Result<Vec<InstanceSnapshot>, WahubError> {
        let records = instance_queries::list_instances(&self.db).await?;
        let mut views = Vec::with_capacity(records.len());
        for record in records {
            match self.get(&record.phone) {
                Some(instance) => views.push(instance.snapshot().await),
                None => views.push(degraded_snapshot(&record)),
            }
        }
        Ok(views)
    }

    /// Patch name/alias, persisting first and mirroring into memory.
    pub async fn update(
        &self,
        phone: &str,
        name: Option<String>,
        alias: Option<String>,
    ) -> Result<InstanceSnapshot, WahubError> {
        let phone = jid::digits_only(phone);
        if instance_queries::get_instance_by_phone(&self.db, &phone)
            .await?
            .is_none()
        {
            return Err(WahubError::instance_not_found(&phone));
        }
        instance_queries::update_instance_profile(&self.db, &phone, name.clone(), alias.clone())
            .await?;
        if let Some(instance) = self.get(&phone) {
            instance.set_profile(name, alias);
        }
        self.view(&phone).await
    }

    /// Delete an instance.
    ///
    /// Logs the session out, drops runtime state, and removes credentials.
    /// With `keep_record` the persisted row survives as `inactive`;
    /// otherwise deletion cascades to every dependent row.
    pub async fn delete(&self, phone: &str, keep_record: bool) -> Result<(), WahubError> {
        let phone = jid::digits_only(phone);
        let record = instance_queries::get_instance_by_phone(&self.db, &phone)
            .await?
            .ok_or_else(|| WahubError::instance_not_found(&phone))?;

        if let Some((_, instance)) = self.instances.remove(&phone) {
            instance.teardown().await;
        } else if let Err(e) = self.creds.delete(&phone).await {
            warn!(phone = %phone, error = %e, "credential cleanup failed");
        }

        if keep_record {
            instance_queries::update_instance_status(
                &self.db,
                &phone,
                &InstanceStatus::Inactive.to_string(),
            )
            .await?;
        } else {
            instance_queries::delete_instance(&self.db, &phone, true).await?;
        }
        info!(phone = %phone, keep_record, instance_id = %record.id, "instance deleted");
        Ok(())
    }

    /// Restart an instance, preserving its credentials.
    ///
    /// A persisted-but-not-resident instance is materialized first, so a
    /// soft-cleaned tenant can re-authenticate.
    pub async fn restart(self: &Arc<Self>, phone: &str) -> Result<(), WahubError> {
        let phone = jid::digits_only(phone);
        if let Some(instance) = self.get(&phone) {
            return instance.restart().await;
        }
        let record = instance_queries::get_instance_by_phone(&self.db, &phone)
            .await?
            .ok_or_else(|| WahubError::instance_not_found(&phone))?;
        let instance = self.materialize(&record).await;
        self.instances.insert(phone, Arc::clone(&instance));
        instance.start().await
    }

    /// Send a text message through an instance.
    pub async fn send_text(
        &self,
        phone: &str,
        to: &str,
        message: &str,
    ) -> Result<MessageId, WahubError> {
        let instance = self
            .get(phone)
            .ok_or_else(|| WahubError::instance_not_found(phone))?;
        instance.send_text(to, message).await
    }

    /// Send a group text message through an instance.
    pub async fn send_group_text(
        &self,
        phone: &str,
        group_id: &str,
        message: &str,
    ) -> Result<MessageId, WahubError> {
        let instance = self
            .get(phone)
            .ok_or_else(|| WahubError::instance_not_found(phone))?;
        instance.send_group_text(group_id, message).await
    }

    /// Send a media message through an instance.
    pub async fn send_media(
        &self,
        phone: &str,
        to: &str,
        media: &MediaPayload,
    ) -> Result<MessageId, WahubError> {
        let instance = self
            .get(phone)
            .ok_or_else(|| WahubError::instance_not_found(phone))?;
        instance.send_media(to, media).await
    }

    /// Persist the current plugin override map of an instance.
    pub async fn persist_plugins(&self, phone: &str) -> Result<(), WahubError> {
        let instance = self
            .get(phone)
            .ok_or_else(|| WahubError::instance_not_found(phone))?;
        let snapshot = instance.chain().snapshot().await;
        let json = serde_json::to_string(&snapshot)
            .map_err(|e| WahubError::Serialization(e.to_string()))?;
        instance_queries::update_instance_plugins(&self.db, instance.phone(), &json).await
    }

    /// Replace an instance's plugin overrides from the persisted row.
    pub async fn sync_plugins(&self, phone: &str) -> Result<(), WahubError> {
        let phone = jid::digits_only(phone);
        let instance = self
            .get(&phone)
            .ok_or_else(|| WahubError::instance_not_found(&phone))?;
        let record = instance_queries::get_instance_by_phone(&self.db, &phone)
            .await?
            .ok_or_else(|| WahubError::instance_not_found(&phone))?;
        let overrides = parse_plugin_map(&record.plugins);
        instance.chain().sync_from_map(overrides).await;
        Ok(())
    }

    /// Aggregate manager status.
    pub async fn status(&self) -> Result<ManagerStatus, WahubError> {
        let persisted_count = instance_queries::count_instances(&self.db).await?;
        let mut snapshots = Vec::new();
        let residents: Vec<Arc<Instance>> = self
            .instances
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        for instance in &residents {
            snapshots.push(instance.snapshot().await);
        }
        let connected_count = snapshots.iter().filter(|s| s.is_connected).count();
        Ok(ManagerStatus {
            initialized: self.initialized.load(Ordering::SeqCst),
            persisted_count,
            resident_count: snapshots.len(),
            connected_count,
            instances: snapshots,
        })
    }

    /// Run the retention sweep and remove credential directories of deleted
    /// instances.
    pub async fn run_retention(&self, cutoff: &str) -> Result<retention::RetentionReport, WahubError> {
        let report = retention::sweep(&self.db, cutoff).await?;
        for phone in &report.deleted_phones {
            if let Some((_, instance)) = self.instances.remove(phone) {
                instance.shutdown().await;
            }
            if let Err(e) = self.creds.delete(phone).await {
                warn!(phone = %phone, error = %e, "credential cleanup failed");
            }
        }
        info!(
            history = report.webhook_history,
            logs = report.instance_logs,
            messages = report.messages,
            webhooks = report.webhooks,
            instances = report.instances,
            "retention sweep completed"
        );
        Ok(report)
    }

    /// Best-effort close of every resident instance.
    pub async fn shutdown(&self) {
        let residents: Vec<Arc<Instance>> = self
            .instances
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        info!(count = residents.len(), "shutting down instances");
        for instance in residents {
            instance.shutdown().await;
        }
        self.instances.clear();
    }

    async fn materialize(self: &Arc<Self>, record: &InstanceRecord) -> Arc<Instance> {
        let overrides = parse_plugin_map(&record.plugins);
        let chain = Arc::new(
            PluginChain::with_overrides(&record.phone, Arc::clone(&self.registry), overrides)
                .await,
        );
        Instance::new(
            &record.id,
            &record.phone,
            &record.name,
            record.alias.clone(),
            self.settings.clone(),
            self.db.clone(),
            self.creds.clone(),
            Arc::clone(&self.factory),
            chain,
        )
    }
}

fn normalize_phone(phone: &str) -> Result<String, WahubError> {
    let digits = jid::digits_only(phone);
    if digits.is_empty() {
        return Err(WahubError::BadInput(format!(
            "phone {phone:?} contains no digits"
        )));
    }
    Ok(digits)
}

fn parse_plugin_map(json: &str) -> HashMap<String, bool> {
    serde_json::from_str(json).unwrap_or_else(|e| {
        warn!(error = %e, "malformed plugin map in store, treating as empty");
        HashMap::new()
    })
}

fn degraded_snapshot(record: &InstanceRecord) -> InstanceSnapshot {
    InstanceSnapshot {
        id: record.id.clone(),
        phone: record.phone.clone(),
        name: record.name.clone(),
        alias: record.alias.clone(),
        status: DEGRADED_STATUS.to_string(),
        is_connected: false,
        qr_code: None,
        reconnect_attempts: 0,
        user_id: None,
    }
}
