//! End-to-end submission scenarios through the ingress facade, on a
//! file-backed ledger so every worker connection sees the same database.

mod common;

use common::{clean_draft, fast_config, ReasonerBehavior, StubIndex, StubReasoner};
use loandesk_core::{
    decision::{DecisionSource, Outcome, Provenance},
    ingress::{ApiError, ReviewService},
    kpi::DateRange,
    orchestrator::Orchestrator,
    reasoning::ReasoningClient,
    recall::SimilarityIndex,
    store::{DecisionFilter, DecisionLedger},
};
use std::sync::Arc;

fn service(reasoner: StubReasoner) -> (ReviewService, tempfile::NamedTempFile) {
    let file = tempfile::NamedTempFile::new().expect("temp db");
    let ledger = DecisionLedger::open(file.path().to_str().unwrap()).unwrap();
    ledger.migrate().unwrap();

    let orchestrator = Orchestrator::with_standard_rules(
        fast_config(),
        Arc::new(StubIndex::empty()) as Arc<dyn SimilarityIndex>,
        Arc::new(reasoner) as Arc<dyn ReasoningClient>,
    );
    (ReviewService::new(orchestrator, ledger), file)
}

#[tokio::test]
async fn very_low_credit_score_is_rejected_rules_only() {
    // Credit 300, below the hard floor of 500: rejection with no
    // explanation even though reasoning is enabled.
    let (service, _db) = service(StubReasoner::replying("must not appear"));
    let mut draft = clean_draft("Hard Reject");
    draft.credit_score = 300;

    let view = service.submit(draft, true).await.unwrap();
    assert_eq!(view.outcome, Outcome::Reject);
    assert_eq!(view.source, DecisionSource::RulesOnly);
    assert_eq!(view.provenance, Provenance::Unavailable);
    assert!(view.explanation.is_none());
    assert!(view
        .findings
        .iter()
        .any(|f| f.rule_id == "credit_hard_floor" && !f.passed));
}

#[tokio::test]
async fn passing_application_with_reasoning_carries_the_text() {
    let (service, _db) = service(StubReasoner::replying("Stable income, low DTI"));

    let view = service.submit(clean_draft("Happy Path"), true).await.unwrap();
    assert_eq!(view.outcome, Outcome::Approve);
    assert_eq!(view.source, DecisionSource::RulesPlusReasoning);
    assert_eq!(view.explanation.as_deref(), Some("Stable income, low DTI"));

    // The decision is durable and readable back through the facade.
    let fetched = service.decision(&view.application_id).unwrap();
    assert_eq!(fetched.decision_id, view.decision_id);
    assert_eq!(fetched.outcome, Outcome::Approve);
}

#[tokio::test]
async fn reasoning_timeout_still_approves_rules_only() {
    let (service, _db) = service(StubReasoner::new(ReasonerBehavior::Slow(
        "too late".to_string(),
    )));

    let view = service.submit(clean_draft("Timed Out"), true).await.unwrap();
    assert_eq!(view.outcome, Outcome::Approve);
    assert_eq!(view.source, DecisionSource::RulesOnly);
    assert_eq!(view.provenance, Provenance::Unavailable);
    assert!(view.explanation.is_none());
}

#[tokio::test]
async fn malformed_submission_surfaces_field_detail() {
    let (service, _db) = service(StubReasoner::replying("unused"));
    let mut draft = clean_draft("Too Young");
    draft.age = 15;

    let err = service.submit(draft, true).await.unwrap_err();
    match err {
        ApiError::BadRequest { field, .. } => assert_eq!(field, "age"),
        other => panic!("expected BadRequest, got {other:?}"),
    }
}

#[tokio::test]
async fn unknown_application_is_not_found() {
    let (service, _db) = service(StubReasoner::replying("unused"));
    assert!(matches!(
        service.decision("app-nope"),
        Err(ApiError::NotFound { .. })
    ));
}

#[tokio::test]
async fn listing_and_kpis_reflect_submissions() {
    let (service, _db) = service(StubReasoner::replying("Looks fine"));

    service.submit(clean_draft("One"), true).await.unwrap();
    let mut flagged = clean_draft("Two");
    flagged.credit_score = 580;
    service.submit(flagged, false).await.unwrap();

    let listed = service.decisions(&DecisionFilter::default()).unwrap();
    assert_eq!(listed.len(), 2);

    let report = service.kpis(&DateRange::all()).unwrap();
    assert_eq!(report.total_decisions, 2);
    assert_eq!(report.approved, 1);
    assert_eq!(report.reviewed, 1);
    // Reasoning ran for the first submission only.
    assert!((report.reasoning_availability_rate - 0.5).abs() < 1e-9);
}
