//! Sensitivity classifier for raw user text
//!
//! Deterministic and rule-based: no model dependency, so classification can
//! never fail silently. Tiers are evaluated in strict priority order
//! (confidential first) and the first matching tier wins — a text matching
//! both public and confidential patterns is confidential. Sensitivity must
//! never be under-estimated.

use regex::Regex;

use crate::error::{Error, Result};
use crate::ledger::event::SensitivityLevel;

/// A single compiled trigger rule
struct CompiledRule {
    name: String,
    pattern: Regex,
}

/// One sensitivity tier: its pattern triggers and the caller-supplied
/// category hints that short-circuit into it
struct Tier {
    level: SensitivityLevel,
    rules: Vec<CompiledRule>,
    hints: Vec<String>,
}

/// Priority-ordered sensitivity classifier
pub struct SensitivityClassifier {
    /// Highest tier first
    tiers: Vec<Tier>,
}

impl SensitivityClassifier {
    /// Create a classifier with the built-in trigger rules
    pub fn new() -> Result<Self> {
        let confidential = Tier {
            level: SensitivityLevel::Confidential,
            rules: vec![
                compile("payment_card", r"\b(?:\d[ -]?){12,18}\d\b")?,
                compile("iban", r"\b[A-Za-z]{2}\d{2}[A-Za-z0-9]{11,30}\b")?,
                compile("national_id", r"\b\d{3}-\d{2}-\d{4}\b|\b\d{9}\b")?,
                compile(
                    "monetary_amount",
                    r"(?i)[€$£]\s?\d+(?:[.,]\d+)?|\b\d+(?:[.,]\d+)?\s?(?:euro|eur|usd|dollars?)\b",
                )?,
                compile(
                    "medical_crisis",
                    r"(?i)\b(?:suicide|suicidal|self[- ]harm|overdose|crisis|diagnosis|medication|prescription)\b",
                )?,
            ],
            hints: Vec::new(),
        };

        let sensitive = Tier {
            level: SensitivityLevel::Sensitive,
            rules: vec![
                compile(
                    "relational",
                    r"(?i)\b(?:divorce|break[- ]?up|marriage|custody|cheating|affair)\b",
                )?,
                compile(
                    "mental_health",
                    r"(?i)\b(?:therapy|therapist|anxiety|depression|depressed|grief|burnout|panic attack|trauma)\b",
                )?,
            ],
            hints: vec!["mental-health".to_string(), "relationships".to_string()],
        };

        let personal = Tier {
            level: SensitivityLevel::Personal,
            rules: vec![compile(
                "personality_typing",
                r"(?i)\b(?:introvert(?:ed)?|extr[ao]vert(?:ed)?|mbti|infj|infp|intj|enfp|enneagram|personality (?:type|test))\b",
            )?],
            hints: vec!["personal".to_string(), "personality".to_string()],
        };

        Ok(Self {
            tiers: vec![confidential, sensitive, personal],
        })
    }

    /// Classify a piece of text, optionally steered by a caller-supplied
    /// category hint. Returns the highest tier whose triggers match;
    /// defaults to public.
    pub fn classify(&self, text: &str, category_hint: Option<&str>) -> SensitivityLevel {
        self.classify_detailed(text, category_hint).0
    }

    /// Classify and report which trigger decided the tier, for audit
    /// metadata. The trigger is a rule name or `hint:<category>` — never
    /// the matched text itself.
    pub fn classify_detailed(
        &self,
        text: &str,
        category_hint: Option<&str>,
    ) -> (SensitivityLevel, Option<String>) {
        let hint = category_hint.map(|h| h.trim().to_lowercase());

        for tier in &self.tiers {
            for rule in &tier.rules {
                if rule.pattern.is_match(text) {
                    return (tier.level, Some(rule.name.clone()));
                }
            }
            if let Some(hint) = &hint {
                if tier.hints.iter().any(|h| h == hint) {
                    return (tier.level, Some(format!("hint:{}", hint)));
                }
            }
        }

        (SensitivityLevel::Public, None)
    }
}

fn compile(name: &str, pattern: &str) -> Result<CompiledRule> {
    let pattern = Regex::new(pattern).map_err(|e| {
        Error::Privacy(format!("Invalid regex pattern for rule '{}': {}", name, e))
    })?;
    Ok(CompiledRule {
        name: name.to_string(),
        pattern,
    })
}
