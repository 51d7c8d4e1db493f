//! Audit event types for the hash-chain ledger
//!
//! `AuditEvent` is immutable once appended: the only fields that may change
//! afterwards are the sync-state fields, and those only through
//! `LedgerStore`'s monotonic transition API. All wire types use camelCase
//! JSON serialization.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::error::{Error, Result};

/// Sentinel hash chained to by the first event of every stream.
///
/// 64 hex zeros — a value that can never be the SHA-256 of real data,
/// making genesis detection unambiguous.
pub const GENESIS_HASH: &str =
    "0000000000000000000000000000000000000000000000000000000000000000";

/// Data sensitivity tier assigned to a piece of text
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensitivityLevel {
    Public,
    Personal,
    Sensitive,
    Confidential,
}

impl std::fmt::Display for SensitivityLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Public => write!(f, "public"),
            Self::Personal => write!(f, "personal"),
            Self::Sensitive => write!(f, "sensitive"),
            Self::Confidential => write!(f, "confidential"),
        }
    }
}

impl std::str::FromStr for SensitivityLevel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "public" => Ok(Self::Public),
            "personal" => Ok(Self::Personal),
            "sensitive" => Ok(Self::Sensitive),
            "confidential" => Ok(Self::Confidential),
            other => Err(format!("unknown sensitivity level: {}", other)),
        }
    }
}

/// Capability tier that produced (or blocked) a decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingMethod {
    AcceleratedLocal,
    CpuFallback,
    PatternFallback,
    EmergencyBlock,
}

impl std::fmt::Display for ProcessingMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AcceleratedLocal => write!(f, "accelerated_local"),
            Self::CpuFallback => write!(f, "cpu_fallback"),
            Self::PatternFallback => write!(f, "pattern_fallback"),
            Self::EmergencyBlock => write!(f, "emergency_block"),
        }
    }
}

/// Classification of what a ledger entry records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// A capability tier produced a decision for a request
    ModelDecision,
    /// A capability tier was abandoned in favor of a weaker one
    FallbackTriggered,
    /// No tier could complete; the request was fail-safe rejected
    EmergencyBlock,
    /// The request was cancelled or timed out before a decision
    ProcessingAborted,
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ModelDecision => write!(f, "model_decision"),
            Self::FallbackTriggered => write!(f, "fallback_triggered"),
            Self::EmergencyBlock => write!(f, "emergency_block"),
            Self::ProcessingAborted => write!(f, "processing_aborted"),
        }
    }
}

/// Outcome recorded for a ledger entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    Success,
    Warning,
    Error,
    Blocked,
}

/// Replication state of an entry relative to the remote compliance store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    Pending,
    Synced,
    Failed,
}

/// A single entry in the audit ledger.
///
/// Created exactly once by [`LedgerStore::append`](crate::ledger::LedgerStore::append),
/// which assigns the chain linkage fields. Never stores raw user content —
/// only hashes, lengths, and redaction tags.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEvent {
    // Identity
    pub audit_id: String,
    pub trace_id: String,
    pub user_id: String,
    pub session_id: Option<String>,

    // Classification
    pub event_type: EventType,
    pub action: String,
    pub resource_type: Option<String>,
    pub resource_id: Option<String>,

    // Privacy
    pub sensitivity_level: SensitivityLevel,
    pub processing_method: ProcessingMethod,
    pub sanitization_applied: bool,
    /// Always false: this subsystem never sends content to an external
    /// model service. Enforced at draft validation.
    pub external_service_used: bool,
    pub compliance_flags: BTreeSet<String>,

    // Content fingerprints
    pub input_hash: String,
    pub output_hash: String,
    pub input_length: usize,
    pub output_length: usize,

    // Performance
    pub processing_time_ms: u64,
    pub model_used: String,
    pub tokens_processed: usize,
    pub memory_used_mb: Option<f64>,
    pub accelerator_utilization: Option<f64>,

    // Outcome
    pub status: EventStatus,
    /// Verdict string for decision events (`allow`/`flag`/`reject`)
    pub decision_verdict: Option<String>,
    /// Confidence of the decision, 0.0 to 1.0
    pub decision_confidence: Option<f64>,
    pub error_type: Option<String>,
    pub error_message: Option<String>,
    pub fallback_triggered: bool,
    pub fallback_reason: Option<String>,
    pub fallback_from: Option<ProcessingMethod>,
    pub fallback_to: Option<ProcessingMethod>,

    // Chain linkage
    /// `None` only for the very first event in a stream (serialized as the
    /// genesis sentinel in the canonical hash input).
    pub previous_hash: Option<String>,
    pub event_hash: String,
    /// 1-based, strictly increasing per stream
    pub chain_position: u64,

    // Sync state
    pub sync_status: SyncStatus,
    pub sync_attempts: u32,
    pub sync_error: Option<String>,
    pub remote_id: Option<String>,
    pub last_synced_at: Option<DateTime<Utc>>,

    // Provenance
    pub event_timestamp: DateTime<Utc>,
    pub client_platform: Option<String>,
}

/// Everything a caller supplies to append an event; the ledger assigns
/// identity, chain linkage, and sync state.
#[derive(Debug, Clone)]
pub struct AuditEventDraft {
    pub trace_id: String,
    pub user_id: String,
    pub session_id: Option<String>,
    pub event_type: EventType,
    pub action: String,
    pub resource_type: Option<String>,
    pub resource_id: Option<String>,
    pub sensitivity_level: SensitivityLevel,
    pub processing_method: ProcessingMethod,
    pub sanitization_applied: bool,
    pub compliance_flags: BTreeSet<String>,
    pub input_hash: String,
    pub output_hash: String,
    pub input_length: usize,
    pub output_length: usize,
    pub processing_time_ms: u64,
    pub model_used: String,
    pub tokens_processed: usize,
    pub memory_used_mb: Option<f64>,
    pub accelerator_utilization: Option<f64>,
    pub status: EventStatus,
    pub decision_verdict: Option<String>,
    pub decision_confidence: Option<f64>,
    pub error_type: Option<String>,
    pub error_message: Option<String>,
    pub fallback_triggered: bool,
    pub fallback_reason: Option<String>,
    pub fallback_from: Option<ProcessingMethod>,
    pub fallback_to: Option<ProcessingMethod>,
    pub event_timestamp: DateTime<Utc>,
    pub client_platform: Option<String>,
}

impl AuditEventDraft {
    /// Create a draft with the required identity and classification fields;
    /// everything else starts empty or zeroed.
    pub fn new(
        trace_id: impl Into<String>,
        user_id: impl Into<String>,
        event_type: EventType,
        action: impl Into<String>,
        sensitivity_level: SensitivityLevel,
        processing_method: ProcessingMethod,
    ) -> Self {
        Self {
            trace_id: trace_id.into(),
            user_id: user_id.into(),
            session_id: None,
            event_type,
            action: action.into(),
            resource_type: None,
            resource_id: None,
            sensitivity_level,
            processing_method,
            sanitization_applied: false,
            compliance_flags: BTreeSet::new(),
            input_hash: String::new(),
            output_hash: String::new(),
            input_length: 0,
            output_length: 0,
            processing_time_ms: 0,
            model_used: String::new(),
            tokens_processed: 0,
            memory_used_mb: None,
            accelerator_utilization: None,
            status: EventStatus::Success,
            decision_verdict: None,
            decision_confidence: None,
            error_type: None,
            error_message: None,
            fallback_triggered: false,
            fallback_reason: None,
            fallback_from: None,
            fallback_to: None,
            event_timestamp: Utc::now(),
            client_platform: None,
        }
    }

    /// Reject a malformed draft before anything touches the chain.
    ///
    /// Required: non-empty trace, user, and action; content fingerprints
    /// must be hex SHA-256 digests when present.
    pub fn validate(&self) -> Result<()> {
        if self.trace_id.trim().is_empty() {
            return Err(Error::Validation("trace_id must not be empty".to_string()));
        }
        if self.user_id.trim().is_empty() {
            return Err(Error::Validation("user_id must not be empty".to_string()));
        }
        if self.action.trim().is_empty() {
            return Err(Error::Validation("action must not be empty".to_string()));
        }
        for (name, hash) in [("input_hash", &self.input_hash), ("output_hash", &self.output_hash)] {
            if !hash.is_empty() && !is_hex_digest(hash) {
                return Err(Error::Validation(format!(
                    "{} must be a 64-char hex SHA-256 digest",
                    name
                )));
            }
        }
        Ok(())
    }
}

fn is_hex_digest(s: &str) -> bool {
    s.len() == 64 && s.chars().all(|c| c.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> AuditEventDraft {
        AuditEventDraft::new(
            "trace-1",
            "user-1",
            EventType::ModelDecision,
            "moderate",
            SensitivityLevel::Public,
            ProcessingMethod::PatternFallback,
        )
    }

    #[test]
    fn test_draft_validates() {
        assert!(draft().validate().is_ok());
    }

    #[test]
    fn test_empty_trace_rejected() {
        let mut d = draft();
        d.trace_id = "  ".to_string();
        assert!(matches!(d.validate(), Err(Error::Validation(_))));
    }

    #[test]
    fn test_empty_user_rejected() {
        let mut d = draft();
        d.user_id = String::new();
        assert!(matches!(d.validate(), Err(Error::Validation(_))));
    }

    #[test]
    fn test_bad_hash_rejected() {
        let mut d = draft();
        d.input_hash = "not-a-digest".to_string();
        assert!(matches!(d.validate(), Err(Error::Validation(_))));
    }

    #[test]
    fn test_hex_digest_accepted() {
        let mut d = draft();
        d.input_hash = "a".repeat(64);
        assert!(d.validate().is_ok());
    }

    #[test]
    fn test_sensitivity_ordering() {
        assert!(SensitivityLevel::Confidential > SensitivityLevel::Sensitive);
        assert!(SensitivityLevel::Sensitive > SensitivityLevel::Personal);
        assert!(SensitivityLevel::Personal > SensitivityLevel::Public);
    }

    #[test]
    fn test_level_round_trip() {
        for level in [
            SensitivityLevel::Public,
            SensitivityLevel::Personal,
            SensitivityLevel::Sensitive,
            SensitivityLevel::Confidential,
        ] {
            assert_eq!(level.to_string().parse::<SensitivityLevel>().unwrap(), level);
        }
        assert!("secret".parse::<SensitivityLevel>().is_err());
    }

    #[test]
    fn test_enum_wire_format() {
        let json = serde_json::to_string(&ProcessingMethod::AcceleratedLocal).unwrap();
        assert_eq!(json, "\"accelerated_local\"");
        let json = serde_json::to_string(&EventType::FallbackTriggered).unwrap();
        assert_eq!(json, "\"fallback_triggered\"");
        let json = serde_json::to_string(&SyncStatus::Pending).unwrap();
        assert_eq!(json, "\"pending\"");
    }
}
