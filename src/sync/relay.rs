//! Background sync relay
//!
//! Forwards newly appended ledger entries to the remote compliance store.
//! Each event gets its own fire-and-forget task with exponential backoff
//! (`base * 2^attempts`) up to the attempt cap; events that exhaust the cap
//! stay `failed` and are surfaced through the dashboard query rather than
//! dropped. `retry_failed_syncs` re-submits everything still under the cap.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::SyncConfig;
use crate::ledger::event::{AuditEvent, SyncStatus};
use crate::ledger::store::LedgerStore;
use crate::sync::remote::ComplianceRemote;

/// Replicates local ledger entries to the remote compliance store
pub struct SyncRelay {
    store: Arc<LedgerStore>,
    remote: Arc<dyn ComplianceRemote>,
    max_attempts: u32,
    backoff_base: Duration,
}

impl SyncRelay {
    pub fn new(
        store: Arc<LedgerStore>,
        remote: Arc<dyn ComplianceRemote>,
        config: &SyncConfig,
    ) -> Self {
        Self {
            store,
            remote,
            max_attempts: config.max_attempts,
            backoff_base: Duration::from_millis(config.backoff_base_ms),
        }
    }

    /// Consume newly appended event ids and sync each in its own task.
    /// Overlapping syncs for different events are safe and unordered.
    pub fn spawn(self: &Arc<Self>, mut rx: mpsc::UnboundedReceiver<String>) -> JoinHandle<()> {
        let relay = self.clone();
        tokio::spawn(async move {
            while let Some(audit_id) = rx.recv().await {
                let relay = relay.clone();
                tokio::spawn(async move {
                    relay.sync_event(&audit_id).await;
                });
            }
        })
    }

    /// Push one event to the remote store, retrying with backoff until it
    /// syncs or the attempt cap is reached. Resumes from the event's stored
    /// attempt count, so a retry pass only spends the remaining budget.
    pub async fn sync_event(&self, audit_id: &str) {
        let event = match self.store.get(audit_id).await {
            Some(event) => event,
            None => {
                tracing::warn!("Sync requested for unknown event {}", audit_id);
                return;
            }
        };
        if event.sync_status == SyncStatus::Synced {
            return;
        }

        let mut attempts = event.sync_attempts;
        while attempts < self.max_attempts {
            attempts += 1;

            let result = self
                .remote
                .register_event_with_metadata(
                    &event.trace_id,
                    &event.user_id,
                    &event.event_type.to_string(),
                    &event.action,
                    sync_metadata(&event),
                )
                .await;

            match result {
                Ok(remote_id) => {
                    if let Err(e) = self.store.mark_synced(audit_id, attempts, remote_id).await {
                        tracing::warn!("Failed to record sync success for {}: {}", audit_id, e);
                    }
                    return;
                }
                Err(e) => {
                    tracing::warn!(
                        "Sync attempt {}/{} failed for {}: {}",
                        attempts,
                        self.max_attempts,
                        audit_id,
                        e
                    );
                    if let Err(e) = self
                        .store
                        .mark_sync_failed(audit_id, attempts, e.to_string())
                        .await
                    {
                        tracing::warn!("Failed to record sync failure for {}: {}", audit_id, e);
                        return;
                    }
                    if attempts < self.max_attempts {
                        tokio::time::sleep(self.backoff_base * 2u32.pow(attempts)).await;
                    }
                }
            }
        }

        tracing::error!(
            "Event {} failed to sync after {} attempts; operator attention required",
            audit_id,
            self.max_attempts
        );
    }

    /// Re-submit every failed event still under the attempt cap. Used by a
    /// periodic job or a manual operator trigger. Returns how many events
    /// were resubmitted.
    pub async fn retry_failed_syncs(&self) -> usize {
        let retryable = self.store.retryable_syncs(self.max_attempts).await;
        let count = retryable.len();
        for event in retryable {
            self.sync_event(&event.audit_id).await;
        }
        count
    }

    /// Failed events that exhausted their attempts, for the dashboard
    pub async fn exhausted(&self) -> Vec<AuditEvent> {
        self.store.exhausted_syncs(self.max_attempts).await
    }
}

/// Redacted metadata forwarded with each registration — fingerprints and
/// flags only, never content.
fn sync_metadata(event: &AuditEvent) -> serde_json::Value {
    serde_json::json!({
        "eventHash": event.event_hash,
        "chainPosition": event.chain_position,
        "sensitivityLevel": event.sensitivity_level,
        "processingMethod": event.processing_method,
        "status": event.status,
        "complianceFlags": event.compliance_flags,
        "inputHash": event.input_hash,
        "outputHash": event.output_hash,
    })
}
