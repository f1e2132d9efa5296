//! Read-side KPI aggregation over the ledger.
//!
//! Stateless: every call computes from the ledger's current snapshot.
//! An empty ledger yields a report of zeros, never a division error.

use crate::{error::DeskResult, store::DecisionLedger, types::RuleId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Inclusive date range; `None` bounds are open.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DateRange {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl DateRange {
    pub fn all() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleFailureCount {
    pub rule_id: RuleId,
    pub failures: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KpiReport {
    pub total_decisions: i64,
    pub approved: i64,
    pub reviewed: i64,
    pub rejected: i64,
    pub approval_rate: f64,
    pub review_rate: f64,
    pub reject_rate: f64,
    /// Mean credit score of decided applications; absent on an empty range.
    pub avg_credit_score: Option<f64>,
    /// Failures per rule, most frequent first.
    pub rule_failure_counts: Vec<RuleFailureCount>,
    /// Share of reasoning-eligible decisions (everything but rejections)
    /// that carry a generated explanation.
    pub reasoning_availability_rate: f64,
}

/// Build the KPI report for a date range.
pub fn summarize(ledger: &DecisionLedger, range: &DateRange) -> DeskResult<KpiReport> {
    let counts = ledger.outcome_counts(range)?;
    let reasoning = ledger.reasoning_counts(range)?;
    let failures = ledger.rule_failure_counts(range)?;
    let avg_credit_score = ledger.avg_credit_score(range)?;

    let rate = |n: i64| {
        if counts.total == 0 {
            0.0
        } else {
            n as f64 / counts.total as f64
        }
    };
    let availability = if reasoning.eligible == 0 {
        0.0
    } else {
        reasoning.generated as f64 / reasoning.eligible as f64
    };

    Ok(KpiReport {
        total_decisions: counts.total,
        approved: counts.approved,
        reviewed: counts.reviewed,
        rejected: counts.rejected,
        approval_rate: rate(counts.approved),
        review_rate: rate(counts.reviewed),
        reject_rate: rate(counts.rejected),
        avg_credit_score,
        rule_failure_counts: failures
            .into_iter()
            .map(|(rule_id, failures)| RuleFailureCount { rule_id, failures })
            .collect(),
        reasoning_availability_rate: availability,
    })
}
