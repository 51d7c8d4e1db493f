//! Asynchronous replication to the remote compliance store
//!
//! Local-first: the ledger is authoritative, and entries drain to the
//! remote store eventually. Includes:
//! - `ComplianceRemote` trait and HTTP client
//! - Per-event background sync with exponential backoff and attempt cap
//! - Operator-facing retry and failed-sync surfacing

pub mod relay;
pub mod remote;

pub use relay::SyncRelay;
pub use remote::{ComplianceRemote, HttpComplianceRemote, RemoteChainReport};
