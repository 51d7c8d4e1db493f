//! Content-processing pipeline
//!
//! The ingress surface of the core: classify → sanitize → decide, with
//! every step audited through the ledger. The orchestrator owns the
//! capability cascade; this module wires it to the classifier and
//! sanitizer and shapes the caller-facing request/response types.

pub mod orchestrator;
pub mod tier;

pub use orchestrator::{ProcessingOrchestrator, ProcessingResult};
pub use tier::{
    AcceleratedLocalTier, CpuFallbackTier, Decision, DecisionTier, ModelRuntime,
    PatternFallbackTier, RequestContext, Verdict,
};

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::config::VeritrailConfig;
use crate::error::{Error, Result};
use crate::ledger::event::{ProcessingMethod, SensitivityLevel};
use crate::ledger::store::LedgerStore;
use crate::privacy::classifier::SensitivityClassifier;
use crate::privacy::sanitizer::SanitizationEngine;

/// A moderation request from the application collaborator
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModerationRequest {
    pub text: String,
    pub user_id: String,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub category_hint: Option<String>,
    #[serde(default)]
    pub client_platform: Option<String>,
}

/// The decision returned to the caller
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModerationResponse {
    pub trace_id: String,
    pub decision: Verdict,
    pub confidence: f64,
    pub reasons: Vec<String>,
    pub recommendations: Vec<String>,
    pub method: ProcessingMethod,
    pub sensitivity_level: SensitivityLevel,
    pub risk_score: f64,
}

/// End-to-end pipeline: classifier, sanitizer, and orchestrator over one
/// ledger. All components are stateless per call except the ledger append.
pub struct ModerationPipeline {
    classifier: SensitivityClassifier,
    sanitizer: SanitizationEngine,
    orchestrator: Arc<ProcessingOrchestrator>,
    ledger: Arc<LedgerStore>,
    request_timeout: Duration,
}

impl ModerationPipeline {
    /// Build the pipeline from configuration. Model runtimes are injected
    /// by the host; passing `None` for both leaves the rule-based tier as
    /// the only initializable mode.
    pub async fn new(
        config: &VeritrailConfig,
        ledger: Arc<LedgerStore>,
        accelerated: Option<Arc<dyn ModelRuntime>>,
        cpu: Option<Arc<dyn ModelRuntime>>,
        sync_tx: Option<mpsc::UnboundedSender<String>>,
    ) -> Result<Self> {
        let tiers: Vec<Arc<dyn DecisionTier>> = vec![
            Arc::new(AcceleratedLocalTier::new(accelerated)),
            Arc::new(CpuFallbackTier::new(cpu)),
            Arc::new(PatternFallbackTier::new()?),
        ];
        let orchestrator = Arc::new(ProcessingOrchestrator::with_tiers(
            ledger.clone(),
            tiers,
            sync_tx,
        )?);

        let startup_trace = format!("trace-startup-{}", Uuid::new_v4());
        orchestrator.initialize(&startup_trace).await?;

        Ok(Self {
            classifier: SensitivityClassifier::new()?,
            sanitizer: SanitizationEngine::new(&config.privacy.confidential_terms)?,
            orchestrator,
            ledger,
            request_timeout: Duration::from_millis(config.processing.request_timeout_ms),
        })
    }

    /// The ledger this pipeline audits into
    pub fn ledger(&self) -> &Arc<LedgerStore> {
        &self.ledger
    }

    /// The currently active processing method
    pub async fn active_method(&self) -> ProcessingMethod {
        self.orchestrator.active_method().await
    }

    /// Process one piece of user text. The caller always receives a
    /// decision: a timed-out request comes back as a fail-safe reject, and
    /// only a ledger failure (which would break auditability) is an error.
    pub async fn submit(&self, request: ModerationRequest) -> Result<ModerationResponse> {
        if request.text.trim().is_empty() {
            return Err(Error::Validation("text must not be empty".to_string()));
        }
        if request.user_id.trim().is_empty() {
            return Err(Error::Validation("user_id must not be empty".to_string()));
        }

        let trace_id = format!("trace-{}", Uuid::new_v4());
        let level = self
            .classifier
            .classify(&request.text, request.category_hint.as_deref());
        let sanitized = self.sanitizer.sanitize(&request.text, level);

        let ctx = RequestContext {
            trace_id: trace_id.clone(),
            user_id: request.user_id,
            session_id: request.session_id,
            category_hint: request.category_hint,
            client_platform: request.client_platform,
            sanitization_applied: sanitized.sanitization_applied(),
        };

        tracing::debug!(
            trace_id = %trace_id,
            level = %level,
            risk = sanitized.risk_score,
            redactions = ?sanitized.removed_element_tags,
            steps = ?sanitized.audit_trail,
            "Dispatching sanitized text to the active tier"
        );

        match self
            .orchestrator
            .process_with_deadline(&sanitized.sanitized_text, &ctx, level, self.request_timeout)
            .await
        {
            Ok(result) => Ok(ModerationResponse {
                trace_id,
                decision: result.decision.verdict,
                confidence: result.decision.confidence,
                reasons: result.decision.reasons,
                recommendations: result.decision.recommendations,
                method: result.method,
                sensitivity_level: level,
                risk_score: sanitized.risk_score,
            }),
            Err(Error::Cancelled(_)) => Ok(ModerationResponse {
                trace_id,
                decision: Verdict::Reject,
                confidence: 1.0,
                reasons: vec!["processing timed out".to_string()],
                recommendations: vec!["try again later".to_string()],
                method: ProcessingMethod::EmergencyBlock,
                sensitivity_level: level,
                risk_score: sanitized.risk_score,
            }),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::event::EventType;
    use tempfile::TempDir;

    async fn pipeline() -> (ModerationPipeline, TempDir) {
        let dir = TempDir::new().unwrap();
        let ledger = Arc::new(LedgerStore::new(dir.path().to_path_buf()).await.unwrap());
        let pipeline = ModerationPipeline::new(
            &VeritrailConfig::default(),
            ledger,
            None,
            None,
            None,
        )
        .await
        .unwrap();
        (pipeline, dir)
    }

    fn request(text: &str) -> ModerationRequest {
        ModerationRequest {
            text: text.to_string(),
            user_id: "user-1".to_string(),
            session_id: None,
            category_hint: None,
            client_platform: None,
        }
    }

    #[tokio::test]
    async fn test_submit_returns_decision_and_audits() {
        let (pipeline, _dir) = pipeline().await;

        let response = pipeline
            .submit(request("what a lovely day"))
            .await
            .unwrap();
        assert_eq!(response.decision, Verdict::Allow);
        assert_eq!(response.method, ProcessingMethod::PatternFallback);
        assert_eq!(response.sensitivity_level, SensitivityLevel::Public);

        let events = pipeline.ledger().events_for_trace(&response.trace_id).await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, EventType::ModelDecision);
        assert!(pipeline
            .ledger()
            .validate_stream(&response.trace_id)
            .await
            .is_valid);
    }

    #[tokio::test]
    async fn test_submit_confidential_text_is_sanitized_before_processing() {
        let (pipeline, _dir) = pipeline().await;

        let response = pipeline
            .submit(request(
                "Mijn IBAN is NL91ABNA0417164300 en kaart 4111111111111111",
            ))
            .await
            .unwrap();
        assert_eq!(response.sensitivity_level, SensitivityLevel::Confidential);
        assert_eq!(response.decision, Verdict::Flag);
        assert!(response.risk_score > 0.9);

        // The ledger must only ever see fingerprints of the sanitized text.
        let events = pipeline.ledger().events_for_trace(&response.trace_id).await;
        assert!(events[0].sanitization_applied);
        assert_eq!(events[0].input_hash.len(), 64);
    }

    #[tokio::test]
    async fn test_submit_rejects_empty_text() {
        let (pipeline, _dir) = pipeline().await;
        assert!(matches!(
            pipeline.submit(request("   ")).await,
            Err(Error::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_crisis_text_is_flagged_for_escalation() {
        let (pipeline, _dir) = pipeline().await;

        let response = pipeline
            .submit(request("I keep thinking about suicide lately"))
            .await
            .unwrap();
        assert_eq!(response.decision, Verdict::Flag);
        assert_eq!(response.sensitivity_level, SensitivityLevel::Confidential);
        assert!(response
            .recommendations
            .iter()
            .any(|r| r.contains("human")));
    }
}
