//! KPI aggregation over ledger snapshots.

mod common;

use chrono::{TimeZone, Utc};
use common::clean_draft;
use loandesk_core::{
    config::RulePolicy,
    decision::{Decision, DecisionSource, Outcome, Provenance},
    kpi::{summarize, DateRange},
    rules::{evaluate, RuleSet},
    store::DecisionLedger,
    types::new_decision_id,
};

fn ledger() -> DecisionLedger {
    let ledger = DecisionLedger::in_memory().expect("in-memory ledger");
    ledger.migrate().expect("migration");
    ledger
}

/// Record one decided application with the given credit score and
/// explanation, decided at a controlled instant.
fn seed(
    ledger: &mut DecisionLedger,
    name: &str,
    credit_score: i64,
    explanation: Option<&str>,
    decided_at_secs: i64,
) -> Decision {
    let mut draft = clean_draft(name);
    draft.credit_score = credit_score;
    let app = draft.submit().unwrap();
    ledger.record_application(&app).unwrap();

    let verdict = evaluate(&app, &RuleSet::standard(&RulePolicy::default())).unwrap();
    let (provenance, source) = if explanation.is_some() {
        (Provenance::Generated, DecisionSource::RulesPlusReasoning)
    } else {
        (Provenance::Unavailable, DecisionSource::RulesOnly)
    };
    let decision = Decision {
        decision_id: new_decision_id(),
        application_id: app.application_id.clone(),
        outcome: Outcome::from(verdict.outcome),
        verdict,
        explanation: explanation.map(str::to_string),
        provenance,
        source,
        decided_at: Utc.timestamp_opt(1_754_000_000 + decided_at_secs, 0).unwrap(),
    };
    ledger.record(&decision).unwrap();
    decision
}

#[test]
fn empty_ledger_reports_zeros_not_errors() {
    let ledger = ledger();
    let report = summarize(&ledger, &DateRange::all()).unwrap();

    assert_eq!(report.total_decisions, 0);
    assert_eq!(report.approval_rate, 0.0);
    assert_eq!(report.review_rate, 0.0);
    assert_eq!(report.reject_rate, 0.0);
    assert_eq!(report.reasoning_availability_rate, 0.0);
    assert!(report.avg_credit_score.is_none());
    assert!(report.rule_failure_counts.is_empty());
}

#[test]
fn rates_and_breakdowns_over_mixed_outcomes() {
    let mut ledger = ledger();
    seed(&mut ledger, "Approve A", 720, Some("Solid profile"), 0);
    seed(&mut ledger, "Approve B", 700, None, 60);
    seed(&mut ledger, "Review", 580, None, 120);
    seed(&mut ledger, "Reject", 300, None, 180);

    let report = summarize(&ledger, &DateRange::all()).unwrap();
    assert_eq!(report.total_decisions, 4);
    assert_eq!(report.approved, 2);
    assert_eq!(report.reviewed, 1);
    assert_eq!(report.rejected, 1);
    assert!((report.approval_rate - 0.5).abs() < 1e-9);
    assert!((report.review_rate - 0.25).abs() < 1e-9);
    assert!((report.reject_rate - 0.25).abs() < 1e-9);

    // One generated explanation among three reasoning-eligible decisions.
    assert!((report.reasoning_availability_rate - 1.0 / 3.0).abs() < 1e-9);

    let avg = report.avg_credit_score.unwrap();
    assert!((avg - (720.0 + 700.0 + 580.0 + 300.0) / 4.0).abs() < 1e-9);

    // The 300-score application fails both credit floors; the 580 one
    // fails only the review floor.
    let failures: Vec<(&str, i64)> = report
        .rule_failure_counts
        .iter()
        .map(|f| (f.rule_id.as_str(), f.failures))
        .collect();
    assert!(failures.contains(&("credit_review_floor", 2)));
    assert!(failures.contains(&("credit_hard_floor", 1)));
}

#[test]
fn date_range_restricts_the_report() {
    let mut ledger = ledger();
    seed(&mut ledger, "Early", 720, None, 0);
    seed(&mut ledger, "Late", 300, None, 3_600);

    let early_only = DateRange {
        from: None,
        to: Some(Utc.timestamp_opt(1_754_000_000 + 1_800, 0).unwrap()),
    };
    let report = summarize(&ledger, &early_only).unwrap();
    assert_eq!(report.total_decisions, 1);
    assert_eq!(report.approved, 1);
    assert_eq!(report.rejected, 0);

    let late_only = DateRange {
        from: Some(Utc.timestamp_opt(1_754_000_000 + 1_800, 0).unwrap()),
        to: None,
    };
    let report = summarize(&ledger, &late_only).unwrap();
    assert_eq!(report.total_decisions, 1);
    assert_eq!(report.rejected, 1);
}
