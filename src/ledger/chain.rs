//! Hash chain computation and validation
//!
//! Each event commits to its predecessor through `previous_hash`, so a
//! retroactive edit to any stored field breaks either the event's own
//! recomputed digest or the next event's link. `validate_chain` reports
//! every break it finds and never repairs one.

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::ledger::event::{AuditEvent, GENESIS_HASH};

/// Compute the canonical SHA-256 digest of an event.
///
/// The canonical input is the nine identity/decision fields joined with `|`,
/// plus the previous hash (genesis sentinel for the first event of a
/// stream). The timestamp enters as Unix milliseconds so recomputing from a
/// stored event reproduces the stored digest exactly. The stored
/// `event_hash` field itself is not part of the input.
pub fn event_hash(event: &AuditEvent) -> String {
    let canonical = format!(
        "{}|{}|{}|{}|{}|{}|{}|{}|{}|{}",
        event.trace_id,
        event.user_id,
        event.event_type,
        event.action,
        event.processing_method,
        event.sensitivity_level,
        event.event_timestamp.timestamp_millis(),
        event.input_hash,
        event.output_hash,
        event.previous_hash.as_deref().unwrap_or(GENESIS_HASH),
    );
    let digest = Sha256::digest(canonical.as_bytes());
    hex_encode(&digest)
}

/// Compute the SHA-256 digest of raw content, hex-encoded.
///
/// Used for the `input_hash`/`output_hash` content fingerprints so raw text
/// never has to be persisted.
pub fn content_hash(content: &str) -> String {
    let digest = Sha256::digest(content.as_bytes());
    hex_encode(&digest)
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Result of walking one stream's chain
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainReport {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub length: usize,
}

/// Validate one stream's events, which must be supplied in position order.
///
/// Checks, for every event: the stored digest recomputes exactly, the
/// position sequence is 1, 2, 3, … with no gaps, and each `previous_hash`
/// equals the predecessor's `event_hash`. All breaks are collected, not
/// just the first.
pub fn validate_chain(events: &[AuditEvent]) -> ChainReport {
    let mut errors = Vec::new();

    for (idx, event) in events.iter().enumerate() {
        let expected_position = idx as u64 + 1;
        if event.chain_position != expected_position {
            errors.push(format!(
                "position {}: expected chain_position {}, found {}",
                expected_position, expected_position, event.chain_position
            ));
        }

        let recomputed = event_hash(event);
        if recomputed != event.event_hash {
            errors.push(format!(
                "position {}: stored event_hash does not match recomputed digest",
                event.chain_position
            ));
        }

        if idx == 0 {
            if event.previous_hash.is_some() {
                errors.push(format!(
                    "position {}: first event must not carry a previous_hash",
                    event.chain_position
                ));
            }
        } else {
            let prev = &events[idx - 1];
            if event.previous_hash.as_deref() != Some(prev.event_hash.as_str()) {
                errors.push(format!(
                    "position {}: previous_hash does not match event_hash at position {}",
                    event.chain_position, prev.chain_position
                ));
            }
        }
    }

    ChainReport {
        is_valid: errors.is_empty(),
        errors,
        length: events.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::event::*;
    use chrono::Utc;
    use std::collections::BTreeSet;

    fn make_event(position: u64, previous_hash: Option<String>) -> AuditEvent {
        let mut event = AuditEvent {
            audit_id: format!("evt-{}", position),
            trace_id: "trace-1".to_string(),
            user_id: "user-1".to_string(),
            session_id: None,
            event_type: EventType::ModelDecision,
            action: "moderate".to_string(),
            resource_type: None,
            resource_id: None,
            sensitivity_level: SensitivityLevel::Personal,
            processing_method: ProcessingMethod::PatternFallback,
            sanitization_applied: true,
            external_service_used: false,
            compliance_flags: BTreeSet::new(),
            input_hash: content_hash("input"),
            output_hash: content_hash("output"),
            input_length: 5,
            output_length: 6,
            processing_time_ms: 2,
            model_used: "pattern-rules-v1".to_string(),
            tokens_processed: 1,
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
            previous_hash,
            event_hash: String::new(),
            chain_position: position,
            sync_status: SyncStatus::Pending,
            sync_attempts: 0,
            sync_error: None,
            remote_id: None,
            last_synced_at: None,
            event_timestamp: Utc::now(),
            client_platform: None,
        };
        event.event_hash = event_hash(&event);
        event
    }

    fn make_chain(n: u64) -> Vec<AuditEvent> {
        let mut events: Vec<AuditEvent> = Vec::new();
        for position in 1..=n {
            let previous = events.last().map(|e: &AuditEvent| e.event_hash.clone());
            events.push(make_event(position, previous));
        }
        events
    }

    #[test]
    fn test_hash_determinism() {
        let event = make_event(1, None);
        assert_eq!(event_hash(&event), event.event_hash);
        assert_eq!(event_hash(&event), event_hash(&event));
    }

    #[test]
    fn test_hash_changes_with_fields() {
        let event = make_event(1, None);
        let mut other = event.clone();
        other.action = "different".to_string();
        assert_ne!(event_hash(&event), event_hash(&other));
    }

    #[test]
    fn test_content_hash_is_hex_sha256() {
        let hash = content_hash("hello");
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
        // Known SHA-256 of "hello"
        assert_eq!(
            hash,
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[test]
    fn test_valid_chain() {
        let events = make_chain(5);
        let report = validate_chain(&events);
        assert!(report.is_valid, "errors: {:?}", report.errors);
        assert_eq!(report.length, 5);
        assert!(report.errors.is_empty());
    }

    #[test]
    fn test_empty_chain_is_valid() {
        let report = validate_chain(&[]);
        assert!(report.is_valid);
        assert_eq!(report.length, 0);
    }

    #[test]
    fn test_tampered_field_detected_at_exact_position() {
        let mut events = make_chain(5);
        // Mutate a hashed field of the third event without recomputing.
        events[2].action = "tampered".to_string();

        let report = validate_chain(&events);
        assert!(!report.is_valid);
        assert_eq!(report.errors.len(), 1, "errors: {:?}", report.errors);
        assert!(report.errors[0].contains("position 3"));
    }

    #[test]
    fn test_tampered_stored_hash_breaks_next_link() {
        let mut events = make_chain(5);
        // Rewriting the stored digest itself breaks event 3's recomputation
        // match and event 4's previous_hash link.
        events[2].event_hash = "0".repeat(64);

        let report = validate_chain(&events);
        assert!(!report.is_valid);
        assert_eq!(report.errors.len(), 2, "errors: {:?}", report.errors);
        assert!(report.errors[0].contains("position 3"));
        assert!(report.errors[1].contains("position 4"));
    }

    #[test]
    fn test_position_gap_detected() {
        let mut events = make_chain(3);
        events[2].chain_position = 5;

        let report = validate_chain(&events);
        assert!(!report.is_valid);
        assert!(report
            .errors
            .iter()
            .any(|e| e.contains("expected chain_position 3")));
    }

    #[test]
    fn test_first_event_must_be_genesis() {
        let mut events = make_chain(2);
        events[0].previous_hash = Some("f".repeat(64));
        events[0].event_hash = event_hash(&events[0]);
        // Re-link the second event so only the genesis rule is violated.
        events[1].previous_hash = Some(events[0].event_hash.clone());
        events[1].event_hash = event_hash(&events[1]);

        let report = validate_chain(&events);
        assert!(!report.is_valid);
        assert!(report.errors.iter().any(|e| e.contains("first event")));
    }
}
