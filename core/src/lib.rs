//! Loan decision orchestration engine.
//!
//! Composes a deterministic rule engine with an optional, unreliable
//! generative reasoning step, merges both into one auditable decision, and
//! persists it in an append-only ledger. Outcome authority is strictly
//! deterministic; the generative step only ever contributes an explanation.

pub mod application;
pub mod config;
pub mod decision;
pub mod error;
pub mod ingress;
pub mod kpi;
pub mod orchestrator;
pub mod pipeline_event;
pub mod reasoning;
pub mod recall;
pub mod rules;
pub mod store;
pub mod types;

pub use application::{Application, ApplicationDraft, EmploymentStatus, KycDocument};
pub use config::DeskConfig;
pub use decision::{Decision, DecisionSource, Outcome, Provenance};
pub use error::{DeskError, DeskResult};
pub use kpi::{DateRange, KpiReport};
pub use orchestrator::Orchestrator;
pub use rules::{RuleOutcome, RuleSet, RuleVerdict};
pub use store::{DecisionFilter, DecisionLedger};
