//! Capability tiers behind a common decision interface
//!
//! Each tier is a strategy over the same contract, so the orchestrator can
//! cascade from the highest-capability tier down to the rule-based last
//! resort without knowing what is inside any of them. The model-backed
//! tiers delegate to an injected [`ModelRuntime`]; inference itself is a
//! black-box capability here.

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::ledger::event::{ProcessingMethod, SensitivityLevel};

/// Terminal outcome of a moderation decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Allow,
    Flag,
    Reject,
}

/// A decision produced by one capability tier
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Decision {
    pub verdict: Verdict,
    /// 0.0 to 1.0
    pub confidence: f64,
    pub reasons: Vec<String>,
    pub recommendations: Vec<String>,
}

impl Decision {
    /// The fail-safe decision: reject with full confidence.
    pub fn emergency_reject() -> Self {
        Self {
            verdict: Verdict::Reject,
            confidence: 1.0,
            reasons: vec!["no processing tier could complete".to_string()],
            recommendations: vec!["try again later".to_string()],
        }
    }
}

/// Per-request identity and hints, threaded through the pipeline
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub trace_id: String,
    pub user_id: String,
    pub session_id: Option<String>,
    pub category_hint: Option<String>,
    pub client_platform: Option<String>,
    /// Whether the sanitizer changed the text before processing
    pub sanitization_applied: bool,
}

/// Black-box inference capability injected into the model-backed tiers.
///
/// The pipeline never talks to an external service; a runtime is an
/// in-process handle whose internals are out of scope.
#[async_trait]
pub trait ModelRuntime: Send + Sync {
    /// Model name reported in audit events
    fn model_name(&self) -> &str;

    /// Probe whether the capability is actually available
    async fn ready(&self) -> Result<()>;

    /// Evaluate sanitized text and produce a decision
    async fn evaluate(&self, text: &str, level: SensitivityLevel) -> Result<Decision>;
}

/// One capability tier in the fallback cascade
#[async_trait]
pub trait DecisionTier: Send + Sync {
    /// Which processing method this tier represents
    fn method(&self) -> ProcessingMethod;

    /// Model name reported in audit events
    fn model_name(&self) -> String;

    /// Attempt to initialize; failure advances the cascade
    async fn init(&self) -> Result<()>;

    /// Decide on sanitized text
    async fn decide(
        &self,
        text: &str,
        ctx: &RequestContext,
        level: SensitivityLevel,
    ) -> Result<Decision>;
}

/// Accelerator-backed local inference tier
pub struct AcceleratedLocalTier {
    runtime: Option<Arc<dyn ModelRuntime>>,
}

impl AcceleratedLocalTier {
    pub fn new(runtime: Option<Arc<dyn ModelRuntime>>) -> Self {
        Self { runtime }
    }
}

#[async_trait]
impl DecisionTier for AcceleratedLocalTier {
    fn method(&self) -> ProcessingMethod {
        ProcessingMethod::AcceleratedLocal
    }

    fn model_name(&self) -> String {
        self.runtime
            .as_ref()
            .map(|r| r.model_name().to_string())
            .unwrap_or_else(|| "accelerated-local".to_string())
    }

    async fn init(&self) -> Result<()> {
        match &self.runtime {
            Some(runtime) => runtime.ready().await,
            None => Err(Error::Capability(
                "no accelerated runtime registered".to_string(),
            )),
        }
    }

    async fn decide(
        &self,
        text: &str,
        _ctx: &RequestContext,
        level: SensitivityLevel,
    ) -> Result<Decision> {
        let runtime = self.runtime.as_ref().ok_or_else(|| {
            Error::Processing("accelerated runtime not available".to_string())
        })?;
        runtime.evaluate(text, level).await
    }
}

/// CPU-bound local inference tier
pub struct CpuFallbackTier {
    runtime: Option<Arc<dyn ModelRuntime>>,
}

impl CpuFallbackTier {
    pub fn new(runtime: Option<Arc<dyn ModelRuntime>>) -> Self {
        Self { runtime }
    }
}

#[async_trait]
impl DecisionTier for CpuFallbackTier {
    fn method(&self) -> ProcessingMethod {
        ProcessingMethod::CpuFallback
    }

    fn model_name(&self) -> String {
        self.runtime
            .as_ref()
            .map(|r| r.model_name().to_string())
            .unwrap_or_else(|| "cpu-fallback".to_string())
    }

    async fn init(&self) -> Result<()> {
        match &self.runtime {
            Some(runtime) => runtime.ready().await,
            None => Err(Error::Capability(
                "no CPU runtime registered".to_string(),
            )),
        }
    }

    async fn decide(
        &self,
        text: &str,
        _ctx: &RequestContext,
        level: SensitivityLevel,
    ) -> Result<Decision> {
        let runtime = self.runtime.as_ref().ok_or_else(|| {
            Error::Processing("CPU runtime not available".to_string())
        })?;
        runtime.evaluate(text, level).await
    }
}

/// Rule-based last resort. Pure pattern matching over sanitized text; has
/// no capability to probe, so initialization cannot fail.
pub struct PatternFallbackTier {
    threat: Regex,
    crisis: Regex,
}

impl PatternFallbackTier {
    pub fn new() -> Result<Self> {
        Ok(Self {
            threat: Regex::new(
                r"(?i)\b(?:kill (?:you|him|her|them)|hurt (?:you|him|her|them)|i will find you|beat (?:you|him|her) up)\b",
            )
            .map_err(|e| Error::Privacy(format!("Invalid threat pattern: {}", e)))?,
            crisis: Regex::new(
                r"(?i)\b(?:suicide|suicidal|self[- ]harm|overdose|end it all)\b",
            )
            .map_err(|e| Error::Privacy(format!("Invalid crisis pattern: {}", e)))?,
        })
    }
}

#[async_trait]
impl DecisionTier for PatternFallbackTier {
    fn method(&self) -> ProcessingMethod {
        ProcessingMethod::PatternFallback
    }

    fn model_name(&self) -> String {
        "pattern-rules-v1".to_string()
    }

    async fn init(&self) -> Result<()> {
        Ok(())
    }

    async fn decide(
        &self,
        text: &str,
        _ctx: &RequestContext,
        level: SensitivityLevel,
    ) -> Result<Decision> {
        if self.threat.is_match(text) {
            return Ok(Decision {
                verdict: Verdict::Reject,
                confidence: 0.9,
                reasons: vec!["threatening language detected".to_string()],
                recommendations: vec!["review community guidelines".to_string()],
            });
        }

        if self.crisis.is_match(text) {
            return Ok(Decision {
                verdict: Verdict::Flag,
                confidence: 0.85,
                reasons: vec!["crisis vocabulary detected".to_string()],
                recommendations: vec!["escalate to a human coach".to_string()],
            });
        }

        if level == SensitivityLevel::Confidential {
            return Ok(Decision {
                verdict: Verdict::Flag,
                confidence: 0.75,
                reasons: vec!["confidential data present".to_string()],
                recommendations: vec![
                    "handle under the confidential-data policy".to_string()
                ],
            });
        }

        Ok(Decision {
            verdict: Verdict::Allow,
            confidence: 0.7,
            reasons: Vec::new(),
            recommendations: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> RequestContext {
        RequestContext {
            trace_id: "trace-1".to_string(),
            user_id: "user-1".to_string(),
            session_id: None,
            category_hint: None,
            client_platform: None,
            sanitization_applied: false,
        }
    }

    #[tokio::test]
    async fn test_pattern_tier_init_cannot_fail() {
        let tier = PatternFallbackTier::new().unwrap();
        assert!(tier.init().await.is_ok());
    }

    #[tokio::test]
    async fn test_pattern_tier_rejects_threats() {
        let tier = PatternFallbackTier::new().unwrap();
        let decision = tier
            .decide("I will find you", &ctx(), SensitivityLevel::Public)
            .await
            .unwrap();
        assert_eq!(decision.verdict, Verdict::Reject);
        assert!(decision.confidence >= 0.9);
    }

    #[tokio::test]
    async fn test_pattern_tier_flags_crisis() {
        let tier = PatternFallbackTier::new().unwrap();
        let decision = tier
            .decide(
                "I keep thinking about self-harm",
                &ctx(),
                SensitivityLevel::Sensitive,
            )
            .await
            .unwrap();
        assert_eq!(decision.verdict, Verdict::Flag);
        assert!(decision
            .recommendations
            .iter()
            .any(|r| r.contains("human")));
    }

    #[tokio::test]
    async fn test_pattern_tier_flags_confidential() {
        let tier = PatternFallbackTier::new().unwrap();
        let decision = tier
            .decide("my card is [CREDITCARD]", &ctx(), SensitivityLevel::Confidential)
            .await
            .unwrap();
        assert_eq!(decision.verdict, Verdict::Flag);
    }

    #[tokio::test]
    async fn test_pattern_tier_allows_benign_text() {
        let tier = PatternFallbackTier::new().unwrap();
        let decision = tier
            .decide("what a lovely day", &ctx(), SensitivityLevel::Public)
            .await
            .unwrap();
        assert_eq!(decision.verdict, Verdict::Allow);
    }

    #[tokio::test]
    async fn test_unconfigured_model_tiers_fail_init() {
        assert!(AcceleratedLocalTier::new(None).init().await.is_err());
        assert!(CpuFallbackTier::new(None).init().await.is_err());
    }

    #[test]
    fn test_emergency_reject_shape() {
        let decision = Decision::emergency_reject();
        assert_eq!(decision.verdict, Verdict::Reject);
        assert_eq!(decision.confidence, 1.0);
        assert!(decision
            .recommendations
            .iter()
            .any(|r| r.contains("try again later")));
    }
}
