//! Decisions: the merged, auditable output of one evaluation run.
//!
//! Outcome authority belongs to the deterministic verdict alone. The
//! explanation is advisory — it rides along for transparency and never
//! changes the outcome.

use crate::{
    rules::{RuleOutcome, RuleVerdict},
    types::{ApplicationId, DecisionId},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Approve,
    Reject,
    Review,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Approve => "approve",
            Outcome::Reject => "reject",
            Outcome::Review => "review",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "approve" => Some(Outcome::Approve),
            "reject" => Some(Outcome::Reject),
            "review" => Some(Outcome::Review),
            _ => None,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// REJECT/FLAG/PASS map to REJECT/REVIEW/APPROVE. This is the entire
/// merge policy — nothing generative participates.
impl From<RuleOutcome> for Outcome {
    fn from(outcome: RuleOutcome) -> Self {
        match outcome {
            RuleOutcome::Pass => Outcome::Approve,
            RuleOutcome::Flag => Outcome::Review,
            RuleOutcome::Reject => Outcome::Reject,
        }
    }
}

/// Whether an explanation was actually generated, or is absent because the
/// reasoning step was skipped, disabled, or unreachable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    Generated,
    Unavailable,
}

impl Provenance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provenance::Generated => "generated",
            Provenance::Unavailable => "unavailable",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "generated" => Some(Provenance::Generated),
            "unavailable" => Some(Provenance::Unavailable),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionSource {
    RulesOnly,
    RulesPlusReasoning,
}

impl DecisionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionSource::RulesOnly => "rules_only",
            DecisionSource::RulesPlusReasoning => "rules_plus_reasoning",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "rules_only" => Some(DecisionSource::RulesOnly),
            "rules_plus_reasoning" => Some(DecisionSource::RulesPlusReasoning),
            _ => None,
        }
    }
}

/// An immutable, persisted decision. Exactly one exists per application;
/// re-evaluation means a new application and a new decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub decision_id: DecisionId,
    pub application_id: ApplicationId,
    pub outcome: Outcome,
    pub verdict: RuleVerdict,
    pub explanation: Option<String>,
    pub provenance: Provenance,
    pub source: DecisionSource,
    pub decided_at: DateTime<Utc>,
}
