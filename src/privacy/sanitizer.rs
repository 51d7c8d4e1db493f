//! Tier-driven sanitization engine
//!
//! Redacts text before it reaches any decision tier. Each sensitivity level
//! applies a strict superset of the redactions below it, replacing matches
//! with typed placeholder tokens. The function is pure: the caller persists
//! an audit event referencing the returned trail, never the raw matches.

use regex::Regex;

use crate::error::{Error, Result};
use crate::ledger::event::SensitivityLevel;

/// Placeholder token inserted for each redaction class
const EMAIL_TOKEN: &str = "[EMAIL]";
const PHONE_TOKEN: &str = "[PHONE]";
const POSTCODE_TOKEN: &str = "[POSTCODE]";
const IBAN_TOKEN: &str = "[IBAN]";
const CARD_TOKEN: &str = "[CREDITCARD]";
const AMOUNT_TOKEN: &str = "[AMOUNT]";
const NATIONAL_ID_TOKEN: &str = "[NATIONALID]";
const CONFIDENTIAL_TOKEN: &str = "[CONFIDENTIAL]";

/// Outcome of sanitizing one piece of text
#[derive(Debug, Clone)]
pub struct SanitizationResult {
    pub sanitized_text: String,
    pub sensitivity_level: SensitivityLevel,
    /// One tag per redaction class that fired (e.g. `iban`, `credit_card`)
    pub removed_element_tags: Vec<String>,
    /// 0.0 (harmless) to 1.0 (maximum caution)
    pub risk_score: f64,
    /// Human-readable step descriptions for audit metadata
    pub audit_trail: Vec<String>,
}

impl SanitizationResult {
    /// Whether any redaction fired
    pub fn sanitization_applied(&self) -> bool {
        !self.removed_element_tags.is_empty()
    }
}

/// Tiered redaction engine with compiled patterns
pub struct SanitizationEngine {
    email: Regex,
    phone: Regex,
    postcode: Regex,
    iban: Regex,
    card: Regex,
    amount: Regex,
    national_id: Regex,
    /// Built from the configured confidential term list; `None` when empty
    confidential_terms: Option<Regex>,
}

impl SanitizationEngine {
    /// Create an engine; `confidential_terms` come from configuration and
    /// are redacted whole-word, case-insensitive, at the confidential tier.
    pub fn new(confidential_terms: &[String]) -> Result<Self> {
        let confidential_terms = if confidential_terms.is_empty() {
            None
        } else {
            let alternation = confidential_terms
                .iter()
                .map(|t| regex::escape(t.trim()))
                .collect::<Vec<_>>()
                .join("|");
            Some(compile(
                "confidential_terms",
                &format!(r"(?i)\b(?:{})\b", alternation),
            )?)
        };

        Ok(Self {
            email: compile("email", r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}")?,
            phone: compile("phone", r"\+?[0-9][0-9 ()\-]{7,}[0-9]")?,
            postcode: compile("postcode", r"\b\d{4}\s?[A-Za-z]{2}\b")?,
            iban: compile("iban", r"\b[A-Za-z]{2}\d{2}[A-Za-z0-9]{11,30}\b")?,
            card: compile("card", r"\b(?:\d[ -]?){12,18}\d\b")?,
            amount: compile(
                "amount",
                r"(?i)[€$£]\s?\d+(?:[.,]\d+)?|\b\d+(?:[.,]\d+)?\s?(?:euro|eur|usd|dollars?)\b",
            )?,
            national_id: compile("national_id", r"\b\d{3}-\d{2}-\d{4}\b|\b\d{9}\b")?,
            confidential_terms,
        })
    }

    /// Redact `text` according to `level` and score the residual risk.
    pub fn sanitize(&self, text: &str, level: SensitivityLevel) -> SanitizationResult {
        let mut sanitized = text.to_string();
        let mut tags = Vec::new();
        let mut trail = Vec::new();
        let mut confidential_hit = false;

        // All tiers: collapse obvious spam runs (5+ repeats of one char).
        let (collapsed, runs) = collapse_repeats(&sanitized);
        if runs > 0 {
            sanitized = collapsed;
            tags.push("repeated_chars".to_string());
            trail.push(format!("collapsed {} repeated-character run(s)", runs));
        }

        // Personal and up: email addresses.
        if level >= SensitivityLevel::Personal {
            self.apply(&self.email, &mut sanitized, EMAIL_TOKEN, "email",
                "email address(es)", &mut tags, &mut trail);
        }

        // Confidential only — applied before the broader digit rules below
        // so card and IBAN sequences are not half-eaten as phone numbers.
        if level == SensitivityLevel::Confidential {
            confidential_hit |= self.apply(&self.iban, &mut sanitized, IBAN_TOKEN, "iban",
                "IBAN sequence(s)", &mut tags, &mut trail);
            confidential_hit |= self.apply(&self.card, &mut sanitized, CARD_TOKEN, "credit_card",
                "payment card sequence(s)", &mut tags, &mut trail);
            confidential_hit |= self.apply(&self.national_id, &mut sanitized, NATIONAL_ID_TOKEN,
                "national_id", "national-ID-like sequence(s)", &mut tags, &mut trail);
            confidential_hit |= self.apply(&self.amount, &mut sanitized, AMOUNT_TOKEN,
                "monetary_amount", "monetary amount(s)", &mut tags, &mut trail);
            if let Some(terms) = &self.confidential_terms {
                confidential_hit |= self.apply(terms, &mut sanitized, CONFIDENTIAL_TOKEN,
                    "confidential_term", "configured confidential term(s)", &mut tags, &mut trail);
            }
        }

        // Sensitive and up: phone numbers and postal/location codes.
        if level >= SensitivityLevel::Sensitive {
            self.apply(&self.phone, &mut sanitized, PHONE_TOKEN, "phone",
                "phone number(s)", &mut tags, &mut trail);
            self.apply(&self.postcode, &mut sanitized, POSTCODE_TOKEN, "postal_code",
                "postal code(s)", &mut tags, &mut trail);
        }

        let risk_score = risk_score(level, confidential_hit, &sanitized);

        SanitizationResult {
            sanitized_text: sanitized,
            sensitivity_level: level,
            removed_element_tags: tags,
            risk_score,
            audit_trail: trail,
        }
    }

    /// Replace all matches of `pattern` with `token`; record a tag and a
    /// trail step if anything fired. Returns whether it fired.
    #[allow(clippy::too_many_arguments)]
    fn apply(
        &self,
        pattern: &Regex,
        text: &mut String,
        token: &str,
        tag: &str,
        what: &str,
        tags: &mut Vec<String>,
        trail: &mut Vec<String>,
    ) -> bool {
        let count = pattern.find_iter(text).count();
        if count == 0 {
            return false;
        }
        *text = pattern.replace_all(text, token).into_owned();
        tags.push(tag.to_string());
        trail.push(format!("redacted {} {}", count, what));
        true
    }
}

/// Per-level base risk, raised for confidential redactions and for text
/// reduced to almost nothing, clamped to [0, 1].
fn risk_score(level: SensitivityLevel, confidential_hit: bool, sanitized: &str) -> f64 {
    let mut score: f64 = match level {
        SensitivityLevel::Public => 0.2,
        SensitivityLevel::Personal => 0.4,
        SensitivityLevel::Sensitive => 0.6,
        SensitivityLevel::Confidential => 0.8,
    };
    if confidential_hit {
        score += 0.15;
    }
    if sanitized.chars().count() < 10 {
        score += 0.1;
    }
    score.clamp(0.0, 1.0)
}

/// Collapse runs of 5 or more identical characters down to 3, returning the
/// collapsed text and the number of runs found. The regex crate has no
/// backreferences, so this is a plain scan.
fn collapse_repeats(text: &str) -> (String, usize) {
    let mut out = String::with_capacity(text.len());
    let mut runs = 0usize;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        let mut count = 1usize;
        while chars.peek() == Some(&c) {
            chars.next();
            count += 1;
        }
        if count >= 5 {
            runs += 1;
            for _ in 0..3 {
                out.push(c);
            }
        } else {
            for _ in 0..count {
                out.push(c);
            }
        }
    }

    (out, runs)
}

fn compile(name: &str, pattern: &str) -> Result<Regex> {
    Regex::new(pattern)
        .map_err(|e| Error::Privacy(format!("Invalid regex pattern for rule '{}': {}", name, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> SanitizationEngine {
        SanitizationEngine::new(&["diagnosis".to_string(), "medication".to_string()]).unwrap()
    }

    #[test]
    fn test_public_only_collapses_spam() {
        let e = engine();
        let result = e.sanitize(
            "greaaaaaaat, email me at test@example.com",
            SensitivityLevel::Public,
        );
        assert!(result.sanitized_text.contains("greaaat"));
        // Public tier must not touch emails.
        assert!(result.sanitized_text.contains("test@example.com"));
        assert_eq!(result.removed_element_tags, vec!["repeated_chars"]);
    }

    #[test]
    fn test_personal_redacts_email() {
        let e = engine();
        let result = e.sanitize("reach me at test@example.com", SensitivityLevel::Personal);
        assert!(!result.sanitized_text.contains("test@example.com"));
        assert!(result.sanitized_text.contains(EMAIL_TOKEN));
        assert!(result.removed_element_tags.contains(&"email".to_string()));
        assert!(result.sanitization_applied());
    }

    #[test]
    fn test_sensitive_redacts_phone_and_postcode() {
        let e = engine();
        let result = e.sanitize(
            "call me on +31 6 12345678, I live near 1012 AB",
            SensitivityLevel::Sensitive,
        );
        assert!(!result.sanitized_text.contains("12345678"));
        assert!(result.sanitized_text.contains(PHONE_TOKEN));
        assert!(result.sanitized_text.contains(POSTCODE_TOKEN));
        assert!(result.removed_element_tags.contains(&"phone".to_string()));
        assert!(result.removed_element_tags.contains(&"postal_code".to_string()));
    }

    #[test]
    fn test_confidential_redacts_iban_and_card() {
        let e = engine();
        let result = e.sanitize(
            "Mijn IBAN is NL91ABNA0417164300 en kaart 4111111111111111",
            SensitivityLevel::Confidential,
        );
        assert!(!result.sanitized_text.contains("NL91ABNA0417164300"));
        assert!(!result.sanitized_text.contains("4111111111111111"));
        assert!(result.sanitized_text.contains(IBAN_TOKEN));
        assert!(result.sanitized_text.contains(CARD_TOKEN));
        assert!(result.removed_element_tags.contains(&"iban".to_string()));
        assert!(result.removed_element_tags.contains(&"credit_card".to_string()));
        assert!(!result.audit_trail.is_empty());
    }

    #[test]
    fn test_confidential_redacts_amounts_and_terms() {
        let e = engine();
        let result = e.sanitize(
            "my diagnosis cost €120,50 at the clinic",
            SensitivityLevel::Confidential,
        );
        assert!(result.sanitized_text.contains(AMOUNT_TOKEN));
        assert!(result.sanitized_text.contains(CONFIDENTIAL_TOKEN));
        assert!(!result.sanitized_text.to_lowercase().contains("diagnosis"));
        assert!(result
            .removed_element_tags
            .contains(&"confidential_term".to_string()));
    }

    #[test]
    fn test_lower_tiers_do_not_apply_confidential_rules() {
        let e = engine();
        let result = e.sanitize(
            "IBAN NL91ABNA0417164300",
            SensitivityLevel::Personal,
        );
        // Personal tier leaves financial patterns alone.
        assert!(result.sanitized_text.contains("NL91ABNA0417164300"));
    }

    #[test]
    fn test_risk_score_bases() {
        let e = engine();
        let text = "nothing sensitive in this line at all";
        assert_eq!(e.sanitize(text, SensitivityLevel::Public).risk_score, 0.2);
        assert_eq!(e.sanitize(text, SensitivityLevel::Personal).risk_score, 0.4);
        assert_eq!(e.sanitize(text, SensitivityLevel::Sensitive).risk_score, 0.6);
        assert_eq!(e.sanitize(text, SensitivityLevel::Confidential).risk_score, 0.8);
    }

    #[test]
    fn test_risk_score_confidential_bump() {
        let e = engine();
        let result = e.sanitize(
            "kaart 4111111111111111 and plenty of surrounding text",
            SensitivityLevel::Confidential,
        );
        assert!((result.risk_score - 0.95).abs() < 1e-9);
    }

    #[test]
    fn test_risk_score_short_text_bump_and_clamp() {
        let e = engine();
        // Short result: 0.8 + 0.15 + 0.1 clamps to 1.0.
        let result = e.sanitize("€50", SensitivityLevel::Confidential);
        assert!(result.sanitized_text.chars().count() < 10);
        assert_eq!(result.risk_score, 1.0);
    }

    #[test]
    fn test_no_terms_configured() {
        let e = SanitizationEngine::new(&[]).unwrap();
        let result = e.sanitize("my diagnosis", SensitivityLevel::Confidential);
        // Without a configured term list only the built-in patterns apply.
        assert!(result.sanitized_text.contains("diagnosis"));
    }
}
