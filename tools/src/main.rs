//! review-runner: headless batch runner for the loan decision engine.
//!
//! Usage:
//!   review-runner --seed 42 --count 25 --db reviews.db
//!   review-runner --config config/desk.json --enable-reasoning
//!
//! Generates a deterministic batch of sample applications (same seed =
//! same batch), runs each through the full pipeline, then prints the KPI
//! report. Reasoning is off by default so the runner works without a
//! generation backend.

use anyhow::Result;
use loandesk_core::{
    application::{ApplicationDraft, EmploymentStatus, KycDocument},
    config::DeskConfig,
    kpi::{self, DateRange},
    orchestrator::Orchestrator,
    reasoning::{OllamaClient, ReasoningClient},
    recall::{LedgerIndex, NullIndex, SimilarityIndex},
    store::DecisionLedger,
};
use rand::{seq::SliceRandom, Rng, SeedableRng};
use rand_pcg::Pcg64;
use std::env;
use std::sync::Arc;

const FIRST_NAMES: &[&str] = &[
    "Ayesha", "John", "Jane", "Sunil", "Maria", "Chen", "Fatima", "Lucas", "Priya", "Omar",
    "Elena", "David", "Amara", "Tomás", "Yuki", "Nadia",
];

const LAST_NAMES: &[&str] = &[
    "Perera", "Doe", "Smith", "Silva", "García", "Wei", "Khan", "Costa", "Patel", "Hassan",
    "Popescu", "Miller", "Okafor", "Rossi", "Tanaka", "Novak",
];

const PURPOSES: &[&str] = &[
    "home renovation",
    "vehicle purchase",
    "education",
    "debt consolidation",
    "medical expenses",
    "small business",
    "wedding",
    "travel",
];

const EMPLOYMENT: &[EmploymentStatus] = &[
    EmploymentStatus::Employed,
    EmploymentStatus::Employed,
    EmploymentStatus::Employed,
    EmploymentStatus::SelfEmployed,
    EmploymentStatus::Contract,
    EmploymentStatus::Student,
    EmploymentStatus::Retired,
    EmploymentStatus::Unemployed,
];

fn sample_draft(rng: &mut Pcg64) -> ApplicationDraft {
    let first = FIRST_NAMES.choose(rng).unwrap();
    let last = LAST_NAMES.choose(rng).unwrap();
    let income = rng.gen_range(9_000.0..150_000.0_f64).round();
    let loan_amount = rng.gen_range(1_000.0..120_000.0_f64).round();

    ApplicationDraft {
        name: format!("{first} {last}"),
        age: rng.gen_range(19..=78),
        income,
        employment: *EMPLOYMENT.choose(rng).unwrap(),
        credit_score: rng.gen_range(320..=830),
        loan_amount,
        term_months: *[12i64, 24, 36, 48, 60, 84].choose(rng).unwrap(),
        interest_rate: (rng.gen_range(3.5..14.0_f64) * 10.0).round() / 10.0,
        purpose: PURPOSES.choose(rng).unwrap().to_string(),
        identity_verified: rng.gen_bool(0.95),
        pep_flagged: rng.gen_bool(0.03),
        documents: vec![KycDocument {
            kind: "passport".to_string(),
            expired: rng.gen_bool(0.05),
        }],
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let seed = parse_arg(&args, "--seed", 42u64);
    let count = parse_arg(&args, "--count", 25u64);
    let enable_reasoning = args.iter().any(|a| a == "--enable-reasoning");
    let db = args
        .windows(2)
        .find(|w| w[0] == "--db")
        .map(|w| w[1].as_str())
        .unwrap_or(":memory:");

    let config = match args.windows(2).find(|w| w[0] == "--config") {
        Some(w) => DeskConfig::load(&w[1])?,
        None => DeskConfig::default(),
    };

    let mut ledger = DecisionLedger::open(db)?;
    ledger.migrate()?;

    // The index gets its own connection; on :memory: databases that
    // connection is isolated, so recall only contributes with a file db.
    let index: Arc<dyn SimilarityIndex> = if config.recall.enabled && db != ":memory:" {
        Arc::new(LedgerIndex::new(ledger.reopen()?))
    } else {
        Arc::new(NullIndex)
    };
    let reasoner: Arc<dyn ReasoningClient> = Arc::new(OllamaClient::new(config.reasoning.clone()));
    let orchestrator = Orchestrator::with_standard_rules(config, index, reasoner);

    log::info!("evaluating {count} sample applications (seed {seed}, db {db})");
    let mut rng = Pcg64::seed_from_u64(seed);
    for _ in 0..count {
        let draft = sample_draft(&mut rng);
        let name = draft.name.clone();
        let application = draft.submit()?;
        let decision = orchestrator
            .evaluate(&mut ledger, &application, enable_reasoning)
            .await?;
        println!(
            "{name:<22} credit={:<4} amount={:<9.0} -> {:<8} [{}]",
            application.credit_score,
            application.loan_amount,
            decision.outcome.to_string(),
            decision.source.as_str(),
        );
    }

    let report = kpi::summarize(&ledger, &DateRange::all())?;
    println!("\n{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn parse_arg<T: std::str::FromStr>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}
