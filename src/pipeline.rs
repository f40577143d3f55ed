//! Trade pipeline: policy engine in front of the swap executor
//!
//! The pipeline screens an intent without committing volume, then hands it to
//! the executor, whose own validation performs the single commit.

use crate::guardrails::{AuditLog, GuardrailEngine, PolicyDecision};
use crate::swap::SwapExecutor;
use crate::trade::{SwapFailure, SwapResult, SwapStage, TradeIntent};
use crate::ErrorKind;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

/// What happened to an intent
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TradeOutcome {
    Rejected { decision: PolicyDecision },
    Executed { result: SwapResult },
}

impl TradeOutcome {
    /// True only for a confirmed swap
    pub fn is_success(&self) -> bool {
        matches!(self, TradeOutcome::Executed { result } if result.success)
    }
}

pub struct TradePipeline {
    engine: Arc<GuardrailEngine>,
    executor: Option<SwapExecutor>,
    audit: Option<Arc<AuditLog>>,
}

impl TradePipeline {
    pub fn new(executor: SwapExecutor) -> Self {
        Self {
            engine: executor.engine().clone(),
            executor: Some(executor),
            audit: None,
        }
    }

    /// Policy checks only. `execute` on this pipeline reports an
    /// `InitializationError` for any trade that passes policy.
    pub fn preview_only(engine: Arc<GuardrailEngine>) -> Self {
        Self {
            engine,
            executor: None,
            audit: None,
        }
    }

    pub fn with_audit_log(mut self, audit: Arc<AuditLog>) -> Self {
        self.audit = Some(audit);
        self
    }

    pub fn engine(&self) -> &Arc<GuardrailEngine> {
        &self.engine
    }

    pub fn can_execute(&self) -> bool {
        self.executor.is_some()
    }

    /// Evaluate without committing volume or touching the chain
    pub async fn preview(&self, intent: &TradeIntent, cycle_id: Option<Uuid>) -> PolicyDecision {
        let decision = self.engine.evaluate(intent).await;
        self.audit(cycle_id, "policy_preview", &decision).await;
        decision
    }

    pub async fn execute(&self, intent: &TradeIntent, cycle_id: Option<Uuid>) -> TradeOutcome {
        let decision = self.engine.evaluate(intent).await;
        self.audit(cycle_id, "policy_decision", &decision).await;
        if !decision.is_valid() {
            return TradeOutcome::Rejected { decision };
        }

        let Some(executor) = &self.executor else {
            tracing::error!("Trade pipeline has no swap executor configured");
            return TradeOutcome::Executed {
                result: SwapResult::failed(
                    SwapFailure::new(
                        ErrorKind::InitializationError,
                        SwapStage::Init,
                        "no swap executor configured",
                    ),
                    0,
                ),
            };
        };

        let result = executor.execute_swap(intent).await;
        self.audit(cycle_id, "swap_result", &result).await;
        TradeOutcome::Executed { result }
    }

    async fn audit(&self, cycle_id: Option<Uuid>, entry_type: &str, payload: &impl Serialize) {
        if let Some(audit) = &self.audit {
            audit.record(cycle_id, entry_type, payload).await;
        }
    }
}
