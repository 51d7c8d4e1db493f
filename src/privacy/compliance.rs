//! Compliance flag tagging for audit events
//!
//! Every ledger entry carries the fixed tags of the legal frameworks that
//! apply to automated decisions over user text, plus a sensitivity tag and,
//! for emergency blocks, an incident-response tag.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::ledger::event::{ProcessingMethod, SensitivityLevel};

/// Compliance framework identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ComplianceFramework {
    /// GDPR Art. 25 — data protection by design and by default
    DataProtectionByDesign,
    /// GDPR Art. 30 — records of processing activities
    RecordKeeping,
    /// Internal incident-response procedure for fail-safe blocks
    IncidentResponse,
}

impl ComplianceFramework {
    /// Stable tag persisted on events
    pub fn tag(&self) -> &'static str {
        match self {
            Self::DataProtectionByDesign => "gdpr:data-protection-by-design",
            Self::RecordKeeping => "gdpr:record-keeping",
            Self::IncidentResponse => "ops:incident-response",
        }
    }
}

impl std::fmt::Display for ComplianceFramework {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.tag())
    }
}

/// Build the compliance flag set for an event.
///
/// Fixed framework tags always apply; the sensitivity tag records the tier
/// the text was processed under; emergency blocks additionally carry the
/// incident-response tag.
pub fn compliance_flags(
    level: SensitivityLevel,
    method: ProcessingMethod,
) -> BTreeSet<String> {
    let mut flags = BTreeSet::new();
    flags.insert(ComplianceFramework::DataProtectionByDesign.tag().to_string());
    flags.insert(ComplianceFramework::RecordKeeping.tag().to_string());
    flags.insert(format!("sensitivity:{}", level));
    if method == ProcessingMethod::EmergencyBlock {
        flags.insert(ComplianceFramework::IncidentResponse.tag().to_string());
    }
    flags
}
