//! The reasoning orchestrator — the heart of the decision engine.
//!
//! One evaluation run is an explicit state machine:
//!
//!   RulesPending → RulesDone → ContextPending → ContextDone
//!     → ReasoningPending → ReasoningDone | ReasoningSkipped → Merged
//!
//! RULES:
//!   - Outcome authority belongs exclusively to the deterministic verdict.
//!     The generative step is advisory; its unavailability never blocks a
//!     lending decision.
//!   - A hard rule failure short-circuits context and reasoning — rejection
//!     never needs generative justification.
//!   - Recall and reasoning are the only suspension points, both bounded by
//!     a timeout. The reasoning call is retried at most once, only on
//!     transient transport failure, never on timeout.
//!   - Every transition is appended to the audit log.

use crate::{
    application::Application,
    config::DeskConfig,
    decision::{Decision, DecisionSource, Outcome, Provenance},
    error::{DeskError, DeskResult},
    pipeline_event::PipelineEvent,
    reasoning::{ReasoningClient, ReasoningRequest},
    recall::{SimilarCase, SimilarityIndex},
    rules::{self, RuleOutcome, RuleSet, RuleVerdict},
    store::DecisionLedger,
    types::new_decision_id,
};
use chrono::Utc;
use std::sync::Arc;
use tokio::time::timeout;

/// The run's state, carrying exactly the data each stage has produced.
enum EvalState {
    RulesPending,
    RulesDone {
        verdict: RuleVerdict,
    },
    ContextPending {
        verdict: RuleVerdict,
    },
    ContextDone {
        verdict: RuleVerdict,
        context: Vec<SimilarCase>,
    },
    ReasoningPending {
        verdict: RuleVerdict,
        context: Vec<SimilarCase>,
    },
    ReasoningDone {
        verdict: RuleVerdict,
        explanation: String,
    },
    ReasoningSkipped {
        verdict: RuleVerdict,
    },
    Merged {
        decision: Decision,
    },
}

pub struct Orchestrator {
    config: DeskConfig,
    rules: RuleSet,
    index: Arc<dyn SimilarityIndex>,
    reasoner: Arc<dyn ReasoningClient>,
}

impl Orchestrator {
    pub fn new(
        config: DeskConfig,
        rules: RuleSet,
        index: Arc<dyn SimilarityIndex>,
        reasoner: Arc<dyn ReasoningClient>,
    ) -> Self {
        Self {
            config,
            rules,
            index,
            reasoner,
        }
    }

    /// Build with the standard rule set derived from the config's policy.
    pub fn with_standard_rules(
        config: DeskConfig,
        index: Arc<dyn SimilarityIndex>,
        reasoner: Arc<dyn ReasoningClient>,
    ) -> Self {
        let rules = RuleSet::standard(&config.rules);
        Self::new(config, rules, index, reasoner)
    }

    /// Run one application through the full pipeline and persist the
    /// decision. A `Validation` error aborts the run with nothing
    /// persisted; every other well-formed run yields exactly one decision
    /// unless the ledger write itself fails.
    pub async fn evaluate(
        &self,
        ledger: &mut DecisionLedger,
        application: &Application,
        enable_reasoning: bool,
    ) -> DeskResult<Decision> {
        let mut state = EvalState::RulesPending;
        loop {
            match state {
                EvalState::Merged { decision } => return Ok(decision),
                other => state = self.step(ledger, application, enable_reasoning, other).await?,
            }
        }
    }

    /// Perform exactly one state transition.
    async fn step(
        &self,
        ledger: &mut DecisionLedger,
        application: &Application,
        enable_reasoning: bool,
        state: EvalState,
    ) -> DeskResult<EvalState> {
        let app_id = application.application_id.clone();
        match state {
            EvalState::RulesPending => {
                let verdict = rules::evaluate(application, &self.rules)?;
                // The deterministic verdict exists now; the application row
                // is safe to keep whatever happens downstream.
                ledger.record_application(application)?;
                ledger.append_audit(&PipelineEvent::RulesEvaluated {
                    application_id: app_id.clone(),
                    outcome: verdict.outcome,
                    failed_rules: verdict.failed_rule_ids(),
                })?;
                log::debug!(
                    "rules evaluated for {app_id}: {} ({} of {} failed)",
                    verdict.outcome,
                    verdict.failed().count(),
                    verdict.findings.len(),
                );
                Ok(EvalState::RulesDone { verdict })
            }

            EvalState::RulesDone { verdict } => Ok(EvalState::ContextPending { verdict }),

            EvalState::ContextPending { verdict } => {
                if verdict.outcome == RuleOutcome::Reject {
                    ledger.append_audit(&PipelineEvent::ContextSkipped {
                        application_id: app_id,
                        reason: "hard rule failure".to_string(),
                    })?;
                    return Ok(EvalState::ContextDone {
                        verdict,
                        context: Vec::new(),
                    });
                }
                if !self.config.recall.enabled {
                    ledger.append_audit(&PipelineEvent::ContextSkipped {
                        application_id: app_id,
                        reason: "recall disabled".to_string(),
                    })?;
                    return Ok(EvalState::ContextDone {
                        verdict,
                        context: Vec::new(),
                    });
                }

                let lookup = timeout(
                    self.config.recall_timeout(),
                    self.index.find_similar(application, self.config.recall.k),
                )
                .await;
                let context = match lookup {
                    Ok(Ok(cases)) => {
                        ledger.append_audit(&PipelineEvent::ContextAssembled {
                            application_id: app_id,
                            similar_cases: cases.len(),
                        })?;
                        cases
                    }
                    Ok(Err(e)) => {
                        let unavailable = DeskError::ExternalUnavailable {
                            capability: "similarity".to_string(),
                            reason: e.to_string(),
                        };
                        log::warn!("{unavailable}; proceeding with empty context");
                        ledger.append_audit(&PipelineEvent::ContextSkipped {
                            application_id: app_id,
                            reason: unavailable.to_string(),
                        })?;
                        Vec::new()
                    }
                    Err(_) => {
                        let unavailable = DeskError::ExternalUnavailable {
                            capability: "similarity".to_string(),
                            reason: format!("timed out after {}ms", self.config.recall.timeout_ms),
                        };
                        log::warn!("{unavailable}; proceeding with empty context");
                        ledger.append_audit(&PipelineEvent::ContextSkipped {
                            application_id: app_id,
                            reason: unavailable.to_string(),
                        })?;
                        Vec::new()
                    }
                };
                Ok(EvalState::ContextDone { verdict, context })
            }

            EvalState::ContextDone { verdict, context } => {
                if verdict.outcome == RuleOutcome::Reject {
                    ledger.append_audit(&PipelineEvent::ReasoningSkipped {
                        application_id: app_id,
                        reason: "hard rule failure".to_string(),
                    })?;
                    return Ok(EvalState::ReasoningSkipped { verdict });
                }
                if !enable_reasoning || !self.config.reasoning.enabled {
                    ledger.append_audit(&PipelineEvent::ReasoningSkipped {
                        application_id: app_id,
                        reason: "reasoning disabled".to_string(),
                    })?;
                    return Ok(EvalState::ReasoningSkipped { verdict });
                }
                Ok(EvalState::ReasoningPending { verdict, context })
            }

            EvalState::ReasoningPending { verdict, context } => {
                let request = ReasoningRequest {
                    application,
                    verdict: &verdict,
                    context: &context,
                };
                match self.attempt_reasoning(request).await {
                    Ok(explanation) => {
                        ledger.append_audit(&PipelineEvent::ReasoningCompleted {
                            application_id: app_id,
                            explanation_chars: explanation.len(),
                        })?;
                        Ok(EvalState::ReasoningDone {
                            verdict,
                            explanation,
                        })
                    }
                    Err(reason) => {
                        let unavailable = DeskError::ExternalUnavailable {
                            capability: "reasoning".to_string(),
                            reason,
                        };
                        log::warn!("{unavailable}; completing rules-only");
                        ledger.append_audit(&PipelineEvent::ReasoningSkipped {
                            application_id: app_id,
                            reason: unavailable.to_string(),
                        })?;
                        Ok(EvalState::ReasoningSkipped { verdict })
                    }
                }
            }

            EvalState::ReasoningDone {
                verdict,
                explanation,
            } => self.merge(ledger, application, verdict, Some(explanation)),

            EvalState::ReasoningSkipped { verdict } => {
                self.merge(ledger, application, verdict, None)
            }

            // evaluate() returns before stepping a merged run.
            EvalState::Merged { decision } => Ok(EvalState::Merged { decision }),
        }
    }

    /// One reasoning attempt under timeout, with a single retry on
    /// transient transport failure. Returns the skip reason on failure.
    async fn attempt_reasoning(&self, request: ReasoningRequest<'_>) -> Result<String, String> {
        let deadline = self.config.reasoning_timeout();
        match timeout(deadline, self.reasoner.explain(request)).await {
            Ok(Ok(text)) => Ok(text),
            Ok(Err(e)) if e.is_transient() => {
                log::warn!("reasoning transport failure, retrying once: {e}");
                match timeout(deadline, self.reasoner.explain(request)).await {
                    Ok(Ok(text)) => Ok(text),
                    Ok(Err(retry_err)) => Err(retry_err.to_string()),
                    Err(_) => Err(format!(
                        "timed out after {}ms on retry",
                        self.config.reasoning.timeout_ms
                    )),
                }
            }
            Ok(Err(e)) => Err(e.to_string()),
            Err(_) => Err(format!(
                "timed out after {}ms",
                self.config.reasoning.timeout_ms
            )),
        }
    }

    /// Terminal transition: derive the outcome from the verdict alone,
    /// attach the explanation for transparency, persist atomically.
    fn merge(
        &self,
        ledger: &mut DecisionLedger,
        application: &Application,
        verdict: RuleVerdict,
        explanation: Option<String>,
    ) -> DeskResult<EvalState> {
        let (provenance, source) = if explanation.is_some() {
            (Provenance::Generated, DecisionSource::RulesPlusReasoning)
        } else {
            (Provenance::Unavailable, DecisionSource::RulesOnly)
        };
        let decision = Decision {
            decision_id: new_decision_id(),
            application_id: application.application_id.clone(),
            outcome: Outcome::from(verdict.outcome),
            verdict,
            explanation,
            provenance,
            source,
            decided_at: Utc::now(),
        };

        ledger.record(&decision)?;
        ledger.append_audit(&PipelineEvent::DecisionMerged {
            application_id: decision.application_id.clone(),
            decision_id: decision.decision_id.clone(),
            outcome: decision.outcome,
            source: decision.source,
        })?;
        log::info!(
            "decision {} for {}: {} ({})",
            decision.decision_id,
            decision.application_id,
            decision.outcome,
            decision.source.as_str(),
        );
        Ok(EvalState::Merged { decision })
    }
}
