//! Audit events emitted by the orchestrator, one per stage transition.
//!
//! RULE: every evaluation run leaves a replayable trail — the audit log
//! plus the deterministic rule engine reproduce how a decision was reached.
//! Variants are appended over time, never removed or reordered.

use crate::{
    decision::{DecisionSource, Outcome},
    rules::RuleOutcome,
    types::{ApplicationId, DecisionId, RuleId},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineEvent {
    RulesEvaluated {
        application_id: ApplicationId,
        outcome: RuleOutcome,
        failed_rules: Vec<RuleId>,
    },
    ContextAssembled {
        application_id: ApplicationId,
        similar_cases: usize,
    },
    ContextSkipped {
        application_id: ApplicationId,
        reason: String,
    },
    ReasoningCompleted {
        application_id: ApplicationId,
        explanation_chars: usize,
    },
    ReasoningSkipped {
        application_id: ApplicationId,
        reason: String,
    },
    DecisionMerged {
        application_id: ApplicationId,
        decision_id: DecisionId,
        outcome: Outcome,
        source: DecisionSource,
    },
}

impl PipelineEvent {
    /// Stable stage name used as the audit row discriminator.
    pub fn stage(&self) -> &'static str {
        match self {
            PipelineEvent::RulesEvaluated { .. } => "rules_evaluated",
            PipelineEvent::ContextAssembled { .. } => "context_assembled",
            PipelineEvent::ContextSkipped { .. } => "context_skipped",
            PipelineEvent::ReasoningCompleted { .. } => "reasoning_completed",
            PipelineEvent::ReasoningSkipped { .. } => "reasoning_skipped",
            PipelineEvent::DecisionMerged { .. } => "decision_merged",
        }
    }

    pub fn application_id(&self) -> &str {
        match self {
            PipelineEvent::RulesEvaluated { application_id, .. }
            | PipelineEvent::ContextAssembled { application_id, .. }
            | PipelineEvent::ContextSkipped { application_id, .. }
            | PipelineEvent::ReasoningCompleted { application_id, .. }
            | PipelineEvent::ReasoningSkipped { application_id, .. }
            | PipelineEvent::DecisionMerged { application_id, .. } => application_id,
        }
    }
}
