//! Similarity recall: retrieval of semantically similar past decisions,
//! used only to enrich reasoning context.
//!
//! The index is a capability behind [`SimilarityIndex`] — read-only, free of
//! side effects, and swappable (an external ANN service fits the same
//! trait). Failures here never abort an evaluation: the orchestrator
//! degrades to an empty context.

use crate::{
    application::Application,
    decision::Outcome,
    store::DecisionLedger,
    types::ApplicationId,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Mutex;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RecallError {
    #[error("similarity index unavailable: {0}")]
    Unavailable(String),
}

/// A past decision retrieved as reasoning context, with its similarity
/// score in [0, 1].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarCase {
    pub application_id: ApplicationId,
    pub outcome: Outcome,
    pub summary: String,
    pub score: f64,
}

/// A decided application as the index sees it: the fields similarity is
/// computed over, plus what the prompt needs to cite.
#[derive(Debug, Clone)]
pub struct PastCase {
    pub application_id: ApplicationId,
    pub income: f64,
    pub loan_amount: f64,
    pub credit_score: i64,
    pub purpose: String,
    pub outcome: Outcome,
}

impl PastCase {
    fn summary(&self) -> String {
        format!(
            "Income: {:.0}, Credit: {}, Loan: {:.0}, Purpose: {}, Decision: {}",
            self.income, self.credit_score, self.loan_amount, self.purpose, self.outcome
        )
    }
}

#[async_trait]
pub trait SimilarityIndex: Send + Sync {
    /// Up to `k` similar past cases, descending score. Empty when the
    /// index is unavailable or holds nothing.
    async fn find_similar(
        &self,
        application: &Application,
        k: usize,
    ) -> Result<Vec<SimilarCase>, RecallError>;
}

// ── Scoring ──────────────────────────────────────────────────────────────────

/// Numeric profile of an application: log-damped money fields, normalized
/// score, capped leverage ratio.
fn feature_vector(income: f64, loan_amount: f64, credit_score: i64) -> [f64; 4] {
    let lti = if income <= 0.0 {
        20.0
    } else {
        (loan_amount / income).min(20.0)
    };
    [
        (1.0 + income.max(0.0)).ln(),
        (1.0 + loan_amount.max(0.0)).ln(),
        credit_score as f64 / 900.0,
        lti / 20.0,
    ]
}

fn cosine(a: &[f64; 4], b: &[f64; 4]) -> f64 {
    let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na: f64 = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let nb: f64 = b.iter().map(|x| x * x).sum::<f64>().sqrt();
    if na == 0.0 || nb == 0.0 {
        0.0
    } else {
        dot / (na * nb)
    }
}

fn purpose_tokens(purpose: &str) -> HashSet<String> {
    purpose
        .split_whitespace()
        .map(|t| t.to_lowercase())
        .collect()
}

fn purpose_overlap(a: &str, b: &str) -> f64 {
    let ta = purpose_tokens(a);
    let tb = purpose_tokens(b);
    if ta.is_empty() || tb.is_empty() {
        return 0.0;
    }
    let shared = ta.intersection(&tb).count() as f64;
    let union = ta.union(&tb).count() as f64;
    shared / union
}

/// Combined similarity of an application against a past case.
pub fn similarity_score(application: &Application, case: &PastCase) -> f64 {
    let qv = feature_vector(
        application.income,
        application.loan_amount,
        application.credit_score,
    );
    let cv = feature_vector(case.income, case.loan_amount, case.credit_score);
    0.8 * cosine(&qv, &cv) + 0.2 * purpose_overlap(&application.purpose, &case.purpose)
}

// ── Implementations ──────────────────────────────────────────────────────────

/// In-process index over the ledger's decided cases. Reads a fresh
/// snapshot per lookup, so new decisions become retrievable immediately.
pub struct LedgerIndex {
    ledger: Mutex<DecisionLedger>,
}

impl LedgerIndex {
    pub fn new(ledger: DecisionLedger) -> Self {
        Self {
            ledger: Mutex::new(ledger),
        }
    }
}

#[async_trait]
impl SimilarityIndex for LedgerIndex {
    async fn find_similar(
        &self,
        application: &Application,
        k: usize,
    ) -> Result<Vec<SimilarCase>, RecallError> {
        if k == 0 {
            return Ok(Vec::new());
        }
        let cases = {
            let ledger = self
                .ledger
                .lock()
                .map_err(|_| RecallError::Unavailable("index lock poisoned".to_string()))?;
            ledger
                .decided_cases()
                .map_err(|e| RecallError::Unavailable(e.to_string()))?
        };

        let mut scored: Vec<SimilarCase> = cases
            .iter()
            .filter(|c| c.application_id != application.application_id)
            .map(|c| SimilarCase {
                application_id: c.application_id.clone(),
                outcome: c.outcome,
                summary: c.summary(),
                score: similarity_score(application, c),
            })
            .collect();

        // Descending score; id as tie-break keeps ordering stable.
        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.application_id.cmp(&b.application_id))
        });
        scored.truncate(k);
        Ok(scored)
    }
}

/// Index that always returns nothing. Used when recall is disabled.
pub struct NullIndex;

#[async_trait]
impl SimilarityIndex for NullIndex {
    async fn find_similar(
        &self,
        _application: &Application,
        _k: usize,
    ) -> Result<Vec<SimilarCase>, RecallError> {
        Ok(Vec::new())
    }
}
