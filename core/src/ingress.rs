//! Transport-agnostic submission facade.
//!
//! The HTTP layer (whatever framework hosts this engine) maps one-to-one
//! onto [`ReviewService`]: `BadRequest` and `Conflict` and `NotFound` are
//! the 4xx family, `Internal` the 5xx family. Internal causes are logged
//! under a correlation id and never shown to the caller.

use crate::{
    application::ApplicationDraft,
    decision::{Decision, DecisionSource, Outcome, Provenance},
    error::DeskError,
    kpi::{self, DateRange, KpiReport},
    orchestrator::Orchestrator,
    store::{DecisionFilter, DecisionLedger},
    types::{new_correlation_id, ApplicationId},
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::sync::{Arc, Mutex};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid field '{field}': {message}")]
    BadRequest { field: String, message: String },

    #[error("no decision for application {application_id}")]
    NotFound { application_id: ApplicationId },

    #[error("a decision already exists for application {application_id}")]
    Conflict { application_id: ApplicationId },

    #[error("internal error; correlation id {correlation_id}")]
    Internal { correlation_id: String },
}

/// Caller-facing projection of a persisted decision.
#[derive(Debug, Clone, Serialize)]
pub struct DecisionView {
    pub application_id: ApplicationId,
    pub decision_id: String,
    pub outcome: Outcome,
    pub source: DecisionSource,
    pub provenance: Provenance,
    pub explanation: Option<String>,
    pub findings: Vec<FindingView>,
    pub decided_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FindingView {
    pub rule_id: String,
    pub category: String,
    pub severity: String,
    pub passed: bool,
    pub detail: String,
}

impl From<Decision> for DecisionView {
    fn from(decision: Decision) -> Self {
        Self {
            findings: decision
                .verdict
                .findings
                .iter()
                .map(|f| FindingView {
                    rule_id: f.rule_id.clone(),
                    category: f.category.as_str().to_string(),
                    severity: f.severity.as_str().to_string(),
                    passed: f.passed,
                    detail: f.detail.clone(),
                })
                .collect(),
            application_id: decision.application_id,
            decision_id: decision.decision_id,
            outcome: decision.outcome,
            source: decision.source,
            provenance: decision.provenance,
            explanation: decision.explanation,
            decided_at: decision.decided_at,
        }
    }
}

pub struct ReviewService {
    orchestrator: Arc<Orchestrator>,
    ledger: Mutex<DecisionLedger>,
}

impl ReviewService {
    pub fn new(orchestrator: Orchestrator, ledger: DecisionLedger) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
            ledger: Mutex::new(ledger),
        }
    }

    /// Submit an application and wait for its decision.
    ///
    /// The evaluation runs as a detached task on its own ledger
    /// connection: if the caller goes away mid-run, the pipeline still
    /// completes and the rules-derived decision still persists — only the
    /// caller's wait is abandoned.
    pub async fn submit(
        &self,
        draft: ApplicationDraft,
        enable_reasoning: bool,
    ) -> Result<DecisionView, ApiError> {
        let application = draft.submit().map_err(to_api_error)?;
        let mut run_ledger = self.reopen_ledger()?;
        let orchestrator = Arc::clone(&self.orchestrator);

        let handle = tokio::spawn(async move {
            orchestrator
                .evaluate(&mut run_ledger, &application, enable_reasoning)
                .await
        });
        match handle.await {
            Ok(Ok(decision)) => Ok(DecisionView::from(decision)),
            Ok(Err(e)) => Err(to_api_error(e)),
            Err(join_err) => Err(internal(format!("evaluation task failed: {join_err}"))),
        }
    }

    /// Fetch the decision for an application.
    pub fn decision(&self, application_id: &str) -> Result<DecisionView, ApiError> {
        let ledger = self.lock_ledger()?;
        ledger
            .get(application_id)
            .map(DecisionView::from)
            .map_err(to_api_error)
    }

    /// Paginated decision listing for the dashboard.
    pub fn decisions(&self, filter: &DecisionFilter) -> Result<Vec<DecisionView>, ApiError> {
        let ledger = self.lock_ledger()?;
        Ok(ledger
            .list(filter)
            .map_err(to_api_error)?
            .into_iter()
            .map(DecisionView::from)
            .collect())
    }

    /// KPI report for the dashboard.
    pub fn kpis(&self, range: &DateRange) -> Result<KpiReport, ApiError> {
        let ledger = self.lock_ledger()?;
        kpi::summarize(&ledger, range).map_err(to_api_error)
    }

    fn lock_ledger(&self) -> Result<std::sync::MutexGuard<'_, DecisionLedger>, ApiError> {
        self.ledger
            .lock()
            .map_err(|_| internal("ledger lock poisoned"))
    }

    fn reopen_ledger(&self) -> Result<DecisionLedger, ApiError> {
        let ledger = self.lock_ledger()?;
        ledger
            .reopen()
            .map_err(|e| internal(format!("cannot open ledger connection: {e}")))
    }
}

fn to_api_error(e: DeskError) -> ApiError {
    match e {
        DeskError::Validation { field, message } => ApiError::BadRequest { field, message },
        DeskError::Duplicate(application_id) => ApiError::Conflict { application_id },
        DeskError::DecisionNotFound(application_id)
        | DeskError::ApplicationNotFound(application_id) => ApiError::NotFound { application_id },
        other => internal(other),
    }
}

/// Log the cause, hand the caller only an opaque correlation id.
fn internal(cause: impl fmt::Display) -> ApiError {
    let correlation_id = new_correlation_id();
    log::error!("[{correlation_id}] {cause}");
    ApiError::Internal { correlation_id }
}
