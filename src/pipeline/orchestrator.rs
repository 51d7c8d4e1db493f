//! Processing orchestrator — capability cascade with audited fallback
//!
//! Owns the ordered tier list and the active mode. Initialization walks the
//! tiers from strongest to weakest, auditing every demotion; per-request
//! failures get exactly one fallback to the rule-based tier before the
//! fail-safe emergency block. Every terminal state writes exactly one
//! ledger entry, including abandoned requests.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, RwLock};

use crate::error::{Error, Result};
use crate::ledger::chain::content_hash;
use crate::ledger::event::{
    AuditEventDraft, EventStatus, EventType, ProcessingMethod, SensitivityLevel,
};
use crate::ledger::store::LedgerStore;
use crate::pipeline::tier::{Decision, DecisionTier, RequestContext};
use crate::privacy::compliance::compliance_flags;

/// Outcome of one orchestrated request
#[derive(Debug, Clone)]
pub struct ProcessingResult {
    pub decision: Decision,
    pub method: ProcessingMethod,
    pub timing_ms: u64,
    pub fallbacks_triggered: u32,
}

/// Selects a capability tier, executes it, falls back on failure, and
/// always emits audit events through the ledger.
pub struct ProcessingOrchestrator {
    /// Ordered strongest-first; the last tier is the rule-based last resort
    tiers: Vec<Arc<dyn DecisionTier>>,
    /// Index of the currently active tier
    active: RwLock<usize>,
    ledger: Arc<LedgerStore>,
    /// Newly appended event ids are handed to the sync relay here
    sync_tx: Option<mpsc::UnboundedSender<String>>,
}

impl ProcessingOrchestrator {
    /// Create an orchestrator over an explicit tier list. The list must be
    /// non-empty and ordered strongest-first; the final entry is the
    /// fallback target for in-flight failures.
    pub fn with_tiers(
        ledger: Arc<LedgerStore>,
        tiers: Vec<Arc<dyn DecisionTier>>,
        sync_tx: Option<mpsc::UnboundedSender<String>>,
    ) -> Result<Self> {
        if tiers.is_empty() {
            return Err(Error::Config("orchestrator needs at least one tier".to_string()));
        }
        let active = RwLock::new(tiers.len() - 1);
        Ok(Self {
            tiers,
            active,
            ledger,
            sync_tx,
        })
    }

    /// The currently active processing method
    pub async fn active_method(&self) -> ProcessingMethod {
        let idx = *self.active.read().await;
        self.tiers[idx].method()
    }

    /// Walk the tiers strongest-first and activate the first one that
    /// initializes. Each failed probe writes a `FALLBACK_TRIGGERED` event.
    /// The rule-based last resort cannot fail to initialize, so this always
    /// lands on an active tier.
    pub async fn initialize(&self, startup_trace: &str) -> Result<ProcessingMethod> {
        let last = self.tiers.len() - 1;

        for (idx, tier) in self.tiers.iter().enumerate() {
            match tier.init().await {
                Ok(()) => {
                    *self.active.write().await = idx;
                    tracing::info!("Processing tier active: {}", tier.method());
                    return Ok(tier.method());
                }
                Err(e) => {
                    tracing::warn!(
                        "Tier {} failed to initialize: {}",
                        tier.method(),
                        e
                    );
                    if idx < last {
                        self.emit_fallback(
                            startup_trace,
                            tier.method(),
                            self.tiers[idx + 1].method(),
                            format!("initialization failed: {}", e),
                        )
                        .await?;
                    }
                }
            }
        }

        // Every probe failed; run on the last tier regardless.
        *self.active.write().await = last;
        Ok(self.tiers[last].method())
    }

    /// Decide on sanitized text. On an in-flight failure of the active
    /// tier, attempt exactly one fallback to the last-resort tier; if that
    /// also fails, return the fail-safe emergency block. The caller always
    /// receives a decision.
    pub async fn process(
        &self,
        sanitized_text: &str,
        ctx: &RequestContext,
        level: SensitivityLevel,
    ) -> Result<ProcessingResult> {
        let started = Instant::now();
        let active_idx = *self.active.read().await;
        let active_tier = self.tiers[active_idx].clone();

        match active_tier.decide(sanitized_text, ctx, level).await {
            Ok(decision) => {
                let timing_ms = started.elapsed().as_millis() as u64;
                self.emit_decision(
                    sanitized_text, ctx, level, &active_tier, &decision, timing_ms, false, None,
                )
                .await?;
                Ok(ProcessingResult {
                    decision,
                    method: active_tier.method(),
                    timing_ms,
                    fallbacks_triggered: 0,
                })
            }
            Err(primary_err) => {
                self.process_fallback(sanitized_text, ctx, level, active_idx, primary_err, started)
                    .await
            }
        }
    }

    /// Like [`process`](Self::process), but bounded by a deadline. An
    /// abandoned request still writes a `PROCESSING_ABORTED` ledger entry,
    /// so cancellation never leaves a gap in the audit trail.
    pub async fn process_with_deadline(
        &self,
        sanitized_text: &str,
        ctx: &RequestContext,
        level: SensitivityLevel,
        deadline: Duration,
    ) -> Result<ProcessingResult> {
        match tokio::time::timeout(deadline, self.process(sanitized_text, ctx, level)).await {
            Ok(result) => result,
            Err(_) => {
                let method = self.active_method().await;
                let mut draft = self.base_draft(
                    ctx,
                    EventType::ProcessingAborted,
                    "moderate_text",
                    level,
                    method,
                );
                draft.status = EventStatus::Warning;
                draft.error_type = Some("timeout".to_string());
                draft.error_message =
                    Some(format!("request abandoned after {:?}", deadline));
                draft.input_hash = content_hash(sanitized_text);
                draft.input_length = sanitized_text.len();
                self.append_and_notify(draft).await?;
                Err(Error::Cancelled(format!(
                    "deadline of {:?} elapsed before a decision",
                    deadline
                )))
            }
        }
    }

    async fn process_fallback(
        &self,
        sanitized_text: &str,
        ctx: &RequestContext,
        level: SensitivityLevel,
        active_idx: usize,
        primary_err: Error,
        started: Instant,
    ) -> Result<ProcessingResult> {
        let active_tier = &self.tiers[active_idx];
        let last = self.tiers.len() - 1;
        let mut fallbacks = 0u32;

        if active_idx < last {
            let fallback_tier = self.tiers[last].clone();
            fallbacks += 1;
            self.emit_fallback(
                &ctx.trace_id,
                active_tier.method(),
                fallback_tier.method(),
                format!("in-flight failure: {}", primary_err),
            )
            .await?;

            if let Ok(decision) = fallback_tier.decide(sanitized_text, ctx, level).await {
                let timing_ms = started.elapsed().as_millis() as u64;
                self.emit_decision(
                    sanitized_text,
                    ctx,
                    level,
                    &fallback_tier,
                    &decision,
                    timing_ms,
                    true,
                    Some(active_tier.method()),
                )
                .await?;
                return Ok(ProcessingResult {
                    decision,
                    method: fallback_tier.method(),
                    timing_ms,
                    fallbacks_triggered: fallbacks,
                });
            }
        }

        // Terminal fail-safe: never fail open.
        let timing_ms = started.elapsed().as_millis() as u64;
        let decision = Decision::emergency_reject();

        let mut draft = self.base_draft(
            ctx,
            EventType::EmergencyBlock,
            "moderate_text",
            level,
            ProcessingMethod::EmergencyBlock,
        );
        draft.status = EventStatus::Blocked;
        draft.decision_verdict = Some("reject".to_string());
        draft.decision_confidence = Some(decision.confidence);
        draft.error_type = Some("processing_failure".to_string());
        draft.error_message = Some(primary_err.to_string());
        draft.fallback_triggered = true;
        draft.fallback_reason = Some("all processing tiers failed".to_string());
        draft.input_hash = content_hash(sanitized_text);
        draft.input_length = sanitized_text.len();
        draft.processing_time_ms = timing_ms;
        self.append_and_notify(draft).await?;

        tracing::error!(
            trace_id = %ctx.trace_id,
            "Emergency block: no processing tier could complete"
        );

        Ok(ProcessingResult {
            decision,
            method: ProcessingMethod::EmergencyBlock,
            timing_ms,
            fallbacks_triggered: fallbacks,
        })
    }

    #[allow(clippy::too_many_arguments)]
    async fn emit_decision(
        &self,
        sanitized_text: &str,
        ctx: &RequestContext,
        level: SensitivityLevel,
        tier: &Arc<dyn DecisionTier>,
        decision: &Decision,
        timing_ms: u64,
        fell_back: bool,
        fallback_from: Option<ProcessingMethod>,
    ) -> Result<()> {
        let decision_json = serde_json::to_string(decision)?;
        let verdict_json = serde_json::to_string(&decision.verdict)?;

        let mut draft = self.base_draft(
            ctx,
            EventType::ModelDecision,
            "moderate_text",
            level,
            tier.method(),
        );
        draft.input_hash = content_hash(sanitized_text);
        draft.input_length = sanitized_text.len();
        draft.output_hash = content_hash(&decision_json);
        draft.output_length = decision_json.len();
        draft.processing_time_ms = timing_ms;
        draft.tokens_processed = sanitized_text.split_whitespace().count();
        draft.model_used = tier.model_name();
        draft.decision_verdict = Some(verdict_json.trim_matches('"').to_string());
        draft.decision_confidence = Some(decision.confidence);
        draft.fallback_triggered = fell_back;
        draft.fallback_from = fallback_from;
        if fell_back {
            draft.fallback_to = Some(tier.method());
        }
        self.append_and_notify(draft).await?;
        Ok(())
    }

    async fn emit_fallback(
        &self,
        trace_id: &str,
        from: ProcessingMethod,
        to: ProcessingMethod,
        reason: String,
    ) -> Result<()> {
        let mut draft = AuditEventDraft::new(
            trace_id,
            "system",
            EventType::FallbackTriggered,
            "mode_fallback",
            SensitivityLevel::Public,
            from,
        );
        draft.status = EventStatus::Warning;
        draft.fallback_triggered = true;
        draft.fallback_reason = Some(reason);
        draft.fallback_from = Some(from);
        draft.fallback_to = Some(to);
        draft.compliance_flags = compliance_flags(SensitivityLevel::Public, from);
        self.append_and_notify(draft).await?;
        Ok(())
    }

    fn base_draft(
        &self,
        ctx: &RequestContext,
        event_type: EventType,
        action: &str,
        level: SensitivityLevel,
        method: ProcessingMethod,
    ) -> AuditEventDraft {
        let mut draft = AuditEventDraft::new(
            &ctx.trace_id,
            &ctx.user_id,
            event_type,
            action,
            level,
            method,
        );
        draft.session_id = ctx.session_id.clone();
        draft.client_platform = ctx.client_platform.clone();
        draft.sanitization_applied = ctx.sanitization_applied;
        draft.compliance_flags = compliance_flags(level, method);
        draft
    }

    /// Append to the ledger and hand the new entry to the sync relay. A
    /// ledger failure is fatal to the request: a decision without its audit
    /// entry must never be returned.
    async fn append_and_notify(&self, draft: AuditEventDraft) -> Result<()> {
        let event = self.ledger.append(draft).await?;
        if let Some(tx) = &self.sync_tx {
            // Relay may already be shut down; the event stays pending and
            // is picked up by the periodic retry.
            let _ = tx.send(event.audit_id.clone());
        }
        Ok(())
    }
}
