//! THE MOST IMPORTANT PROPERTY IN THE ENGINE.
//!
//! The verdict is a pure function of (application, rule set). Two runs
//! over the same inputs — sequential or concurrent — must produce
//! identical verdicts, because the verdict alone carries outcome
//! authority.

mod common;

use common::clean_draft;
use loandesk_core::{
    config::RulePolicy,
    rules::{evaluate, RuleSet},
};
use std::sync::Arc;

#[test]
fn repeated_evaluation_is_identical() {
    let app = clean_draft("Deterministic").submit().unwrap();
    let rules = RuleSet::standard(&RulePolicy::default());

    let first = evaluate(&app, &rules).unwrap();
    for _ in 0..100 {
        let again = evaluate(&app, &rules).unwrap();
        assert_eq!(again, first, "verdict diverged across calls");
    }
}

#[test]
fn concurrent_evaluation_is_identical() {
    let app = Arc::new(clean_draft("Concurrent").submit().unwrap());
    let rules = Arc::new(RuleSet::standard(&RulePolicy::default()));
    let reference = evaluate(&app, &rules).unwrap();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let app = Arc::clone(&app);
            let rules = Arc::clone(&rules);
            std::thread::spawn(move || evaluate(&app, &rules).unwrap())
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), reference);
    }
}

#[test]
fn tightened_policy_changes_the_verdict_not_the_engine() {
    let mut draft = clean_draft("Policy Sensitive");
    draft.credit_score = 640;
    let app = draft.submit().unwrap();

    let default_rules = RuleSet::standard(&RulePolicy::default());
    let verdict = evaluate(&app, &default_rules).unwrap();
    assert_eq!(verdict.outcome, loandesk_core::RuleOutcome::Pass);

    let strict_rules = RuleSet::standard(&RulePolicy {
        credit_review_floor: 680,
        ..RulePolicy::default()
    });
    let verdict = evaluate(&app, &strict_rules).unwrap();
    assert_eq!(verdict.outcome, loandesk_core::RuleOutcome::Flag);
}
