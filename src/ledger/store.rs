//! Ledger store with file-based JSON persistence
//!
//! Directory layout:
//! ```text
//! <storage_dir>/
//! └── events/
//!     ├── evt-<uuid>.json
//!     └── ...
//! ```
//!
//! Appends are serialized by a single writer lock per store and persisted
//! to disk before they return, so a missing link can never be observed by a
//! caller. Events are immutable after append except for the sync-state
//! fields, which move monotonically pending → synced or
//! pending → failed → (retry) → synced/failed.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::ledger::chain::{self, ChainReport};
use crate::ledger::event::{
    AuditEvent, AuditEventDraft, EventStatus, EventType, SyncStatus,
};

/// Filters for reading events back out of the ledger
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    pub user_id: Option<String>,
    pub event_type: Option<EventType>,
    pub status: Option<EventStatus>,
    pub sync_status: Option<SyncStatus>,
}

/// In-memory ledger index backed by one JSON file per event
pub struct LedgerStore {
    events_dir: PathBuf,
    state: Arc<RwLock<StoreState>>,
    /// Serializes `append` so chain linkage can never race
    append_lock: Mutex<()>,
}

#[derive(Default)]
struct StoreState {
    events: Vec<AuditEvent>,
    /// Last committed (position, event_hash) per stream
    tails: HashMap<String, (u64, String)>,
}

impl LedgerStore {
    /// Open (or create) a ledger store at the given base directory and load
    /// all persisted events.
    pub async fn new(base_dir: PathBuf) -> Result<Self> {
        let events_dir = base_dir.join("events");
        tokio::fs::create_dir_all(&events_dir).await?;

        let store = Self {
            events_dir,
            state: Arc::new(RwLock::new(StoreState::default())),
            append_lock: Mutex::new(()),
        };

        store.load_from_disk().await;
        Ok(store)
    }

    /// Append a validated draft as the next event of its stream.
    ///
    /// The event is written to disk before this returns; a storage failure
    /// is fatal to the call and leaves the chain untouched.
    pub async fn append(&self, draft: AuditEventDraft) -> Result<AuditEvent> {
        draft.validate()?;

        let _guard = self.append_lock.lock().await;

        let tail = {
            let state = self.state.read().await;
            state.tails.get(&draft.trace_id).cloned()
        };

        let (chain_position, previous_hash) = match tail {
            Some((position, hash)) => (position + 1, Some(hash)),
            None => (1, None),
        };

        let mut event = AuditEvent {
            audit_id: format!("evt-{}", Uuid::new_v4()),
            trace_id: draft.trace_id,
            user_id: draft.user_id,
            session_id: draft.session_id,
            event_type: draft.event_type,
            action: draft.action,
            resource_type: draft.resource_type,
            resource_id: draft.resource_id,
            sensitivity_level: draft.sensitivity_level,
            processing_method: draft.processing_method,
            sanitization_applied: draft.sanitization_applied,
            external_service_used: false,
            compliance_flags: draft.compliance_flags,
            input_hash: draft.input_hash,
            output_hash: draft.output_hash,
            input_length: draft.input_length,
            output_length: draft.output_length,
            processing_time_ms: draft.processing_time_ms,
            model_used: draft.model_used,
            tokens_processed: draft.tokens_processed,
            memory_used_mb: draft.memory_used_mb,
            accelerator_utilization: draft.accelerator_utilization,
            status: draft.status,
            decision_verdict: draft.decision_verdict,
            decision_confidence: draft.decision_confidence,
            error_type: draft.error_type,
            error_message: draft.error_message,
            fallback_triggered: draft.fallback_triggered,
            fallback_reason: draft.fallback_reason,
            fallback_from: draft.fallback_from,
            fallback_to: draft.fallback_to,
            previous_hash,
            event_hash: String::new(),
            chain_position,
            sync_status: SyncStatus::Pending,
            sync_attempts: 0,
            sync_error: None,
            remote_id: None,
            last_synced_at: None,
            event_timestamp: draft.event_timestamp,
            client_platform: draft.client_platform,
        };
        event.event_hash = chain::event_hash(&event);

        self.persist_event(&event).await?;

        {
            let mut state = self.state.write().await;
            state
                .tails
                .insert(event.trace_id.clone(), (event.chain_position, event.event_hash.clone()));
            state.events.push(event.clone());
        }

        Ok(event)
    }

    /// Walk one stream in position order and report every integrity break.
    pub async fn validate_stream(&self, trace_id: &str) -> ChainReport {
        let events = self.events_for_trace(trace_id).await;
        chain::validate_chain(&events)
    }

    /// All events of a stream, sorted by chain position
    pub async fn events_for_trace(&self, trace_id: &str) -> Vec<AuditEvent> {
        let state = self.state.read().await;
        let mut events: Vec<AuditEvent> = state
            .events
            .iter()
            .filter(|e| e.trace_id == trace_id)
            .cloned()
            .collect();
        events.sort_by_key(|e| e.chain_position);
        events
    }

    /// Get a single event by ID
    pub async fn get(&self, audit_id: &str) -> Option<AuditEvent> {
        let state = self.state.read().await;
        state.events.iter().find(|e| e.audit_id == audit_id).cloned()
    }

    /// List events matching a filter, newest first, truncated to `take`
    pub async fn list(&self, filter: &EventFilter, take: Option<usize>) -> Vec<AuditEvent> {
        let state = self.state.read().await;
        let mut events: Vec<AuditEvent> = state
            .events
            .iter()
            .filter(|e| {
                if let Some(user_id) = &filter.user_id {
                    if &e.user_id != user_id {
                        return false;
                    }
                }
                if let Some(event_type) = filter.event_type {
                    if e.event_type != event_type {
                        return false;
                    }
                }
                if let Some(status) = filter.status {
                    if e.status != status {
                        return false;
                    }
                }
                if let Some(sync_status) = filter.sync_status {
                    if e.sync_status != sync_status {
                        return false;
                    }
                }
                true
            })
            .cloned()
            .collect();
        events.sort_by(|a, b| b.event_timestamp.cmp(&a.event_timestamp));
        if let Some(n) = take {
            events.truncate(n);
        }
        events
    }

    /// Events still awaiting their first successful sync
    pub async fn pending_sync(&self) -> Vec<AuditEvent> {
        self.list(
            &EventFilter {
                sync_status: Some(SyncStatus::Pending),
                ..Default::default()
            },
            None,
        )
        .await
    }

    /// Failed events still under the attempt cap, eligible for retry
    pub async fn retryable_syncs(&self, max_attempts: u32) -> Vec<AuditEvent> {
        let state = self.state.read().await;
        state
            .events
            .iter()
            .filter(|e| e.sync_status == SyncStatus::Failed && e.sync_attempts < max_attempts)
            .cloned()
            .collect()
    }

    /// Failed events at or over the attempt cap; operator attention required
    pub async fn exhausted_syncs(&self, max_attempts: u32) -> Vec<AuditEvent> {
        let state = self.state.read().await;
        state
            .events
            .iter()
            .filter(|e| e.sync_status == SyncStatus::Failed && e.sync_attempts >= max_attempts)
            .cloned()
            .collect()
    }

    /// Total number of events across all streams
    pub async fn len(&self) -> usize {
        self.state.read().await.events.len()
    }

    /// Whether the ledger holds no events
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Record a successful sync: attach the remote ID and stamp the time.
    ///
    /// Allowed from `pending` or `failed`; a `synced` event never moves
    /// again, and the attempt counter never decreases.
    pub async fn mark_synced(
        &self,
        audit_id: &str,
        sync_attempts: u32,
        remote_id: String,
    ) -> Result<AuditEvent> {
        self.update_sync_state(audit_id, |event| {
            if event.sync_status == SyncStatus::Synced {
                return Err(Error::Sync(format!(
                    "event {} is already synced",
                    event.audit_id
                )));
            }
            if sync_attempts < event.sync_attempts {
                return Err(Error::Sync(format!(
                    "sync_attempts may not decrease ({} -> {})",
                    event.sync_attempts, sync_attempts
                )));
            }
            event.sync_status = SyncStatus::Synced;
            event.sync_attempts = sync_attempts;
            event.sync_error = None;
            event.remote_id = Some(remote_id);
            event.last_synced_at = Some(chrono::Utc::now());
            Ok(())
        })
        .await
    }

    /// Record a failed sync attempt with its error
    pub async fn mark_sync_failed(
        &self,
        audit_id: &str,
        sync_attempts: u32,
        sync_error: String,
    ) -> Result<AuditEvent> {
        self.update_sync_state(audit_id, |event| {
            if event.sync_status == SyncStatus::Synced {
                return Err(Error::Sync(format!(
                    "event {} is already synced",
                    event.audit_id
                )));
            }
            if sync_attempts < event.sync_attempts {
                return Err(Error::Sync(format!(
                    "sync_attempts may not decrease ({} -> {})",
                    event.sync_attempts, sync_attempts
                )));
            }
            event.sync_status = SyncStatus::Failed;
            event.sync_attempts = sync_attempts;
            event.sync_error = Some(sync_error);
            Ok(())
        })
        .await
    }

    /// Apply a sync-state mutation, persist the updated event, then commit
    /// it to the in-memory index.
    async fn update_sync_state<F>(&self, audit_id: &str, mutate: F) -> Result<AuditEvent>
    where
        F: FnOnce(&mut AuditEvent) -> Result<()>,
    {
        let updated = {
            let state = self.state.read().await;
            let mut event = state
                .events
                .iter()
                .find(|e| e.audit_id == audit_id)
                .cloned()
                .ok_or_else(|| Error::Ledger(format!("event {} not found", audit_id)))?;
            mutate(&mut event)?;
            event
        };

        self.persist_event(&updated).await?;

        let mut state = self.state.write().await;
        if let Some(slot) = state.events.iter_mut().find(|e| e.audit_id == audit_id) {
            *slot = updated.clone();
        }
        Ok(updated)
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    /// Load all events from disk and rebuild per-stream tails
    async fn load_from_disk(&self) {
        let mut events = Self::load_json_files::<AuditEvent>(&self.events_dir);
        events.sort_by(|a, b| {
            a.trace_id
                .cmp(&b.trace_id)
                .then(a.chain_position.cmp(&b.chain_position))
        });

        let mut tails: HashMap<String, (u64, String)> = HashMap::new();
        for event in &events {
            let tail = tails.entry(event.trace_id.clone()).or_default();
            if event.chain_position >= tail.0 {
                *tail = (event.chain_position, event.event_hash.clone());
            }
        }

        let mut state = self.state.write().await;
        state.events = events;
        state.tails = tails;
    }

    /// Load all JSON files from a directory into a Vec
    fn load_json_files<T: serde::de::DeserializeOwned>(dir: &Path) -> Vec<T> {
        let mut items = Vec::new();
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!("Failed to read directory {}: {}", dir.display(), e);
                }
                return items;
            }
        };

        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match std::fs::read_to_string(&path) {
                Ok(data) => match serde_json::from_str(&data) {
                    Ok(item) => items.push(item),
                    Err(e) => {
                        tracing::warn!("Failed to parse {}: {}", path.display(), e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read {}: {}", path.display(), e);
                }
            }
        }

        items
    }

    /// Write an event file durably; the caller decides what a failure means
    async fn persist_event(&self, event: &AuditEvent) -> Result<()> {
        let path = self.events_dir.join(format!("{}.json", event.audit_id));
        let json = serde_json::to_string_pretty(event)?;
        tokio::fs::write(&path, json).await.map_err(|e| {
            Error::Ledger(format!(
                "failed to persist event {}: {}",
                event.audit_id, e
            ))
        })
    }
}
