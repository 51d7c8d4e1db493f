//! Sensitivity classification and sanitization
//!
//! Inspects raw user text before any automated decision is made:
//! - Rule-based sensitivity classification (priority-ordered tiers)
//! - Tier-driven redaction with typed placeholder tokens and risk scoring
//! - Compliance flag tagging for ledger entries

pub mod classifier;
pub mod compliance;
pub mod sanitizer;

pub use classifier::SensitivityClassifier;
pub use compliance::{compliance_flags, ComplianceFramework};
pub use sanitizer::{SanitizationEngine, SanitizationResult};
