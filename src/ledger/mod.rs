//! Tamper-evident audit ledger
//!
//! An append-only, per-stream hash chain of audit events. Each event embeds
//! its predecessor's SHA-256 digest, so a retroactive edit anywhere in a
//! stream is detectable by re-walking the chain. Includes:
//! - Immutable event records with validated construction
//! - Serialized, durable appends (single writer per store)
//! - Whole-chain validation reporting every break
//! - Monotonic sync-state tracking for remote replication

pub mod chain;
pub mod event;
pub mod store;

pub use chain::{content_hash, event_hash, validate_chain, ChainReport};
pub use event::{
    AuditEvent, AuditEventDraft, EventStatus, EventType, ProcessingMethod, SensitivityLevel,
    SyncStatus, GENESIS_HASH,
};
pub use store::{EventFilter, LedgerStore};
