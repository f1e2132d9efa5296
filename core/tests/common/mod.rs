//! Shared fixtures: a clean application draft, stub capabilities with call
//! counters, and a config with test-sized timeouts.
#![allow(dead_code)]

use async_trait::async_trait;
use loandesk_core::{
    application::{ApplicationDraft, EmploymentStatus, KycDocument},
    config::DeskConfig,
    reasoning::{ReasoningClient, ReasoningError, ReasoningRequest},
    recall::{RecallError, SimilarCase, SimilarityIndex},
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// A draft that passes every standard rule.
pub fn clean_draft(name: &str) -> ApplicationDraft {
    ApplicationDraft {
        name: name.to_string(),
        age: 35,
        income: 72_000.0,
        employment: EmploymentStatus::Employed,
        credit_score: 715,
        loan_amount: 18_000.0,
        term_months: 36,
        interest_rate: 6.0,
        purpose: "home renovation".to_string(),
        identity_verified: true,
        pep_flagged: false,
        documents: vec![KycDocument {
            kind: "passport".to_string(),
            expired: false,
        }],
    }
}

/// Config with timeouts small enough for the slow-capability tests to run
/// in milliseconds.
pub fn fast_config() -> DeskConfig {
    let mut config = DeskConfig::default();
    config.recall.timeout_ms = 100;
    config.reasoning.timeout_ms = 80;
    config
}

/// How long the slow stubs sleep — comfortably past both test timeouts.
pub const SLOW: Duration = Duration::from_millis(300);

// ── Stub reasoning capability ────────────────────────────────────────────────

pub enum ReasonerBehavior {
    Reply(String),
    Slow(String),
    TransportFail,
    TransportFailOnceThenReply(String),
    BackendError(u16),
}

pub struct StubReasoner {
    behavior: ReasonerBehavior,
    pub calls: AtomicUsize,
}

impl StubReasoner {
    pub fn new(behavior: ReasonerBehavior) -> Self {
        Self {
            behavior,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn replying(text: &str) -> Self {
        Self::new(ReasonerBehavior::Reply(text.to_string()))
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReasoningClient for StubReasoner {
    async fn explain(&self, _request: ReasoningRequest<'_>) -> Result<String, ReasoningError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            ReasonerBehavior::Reply(text) => Ok(text.clone()),
            ReasonerBehavior::Slow(text) => {
                tokio::time::sleep(SLOW).await;
                Ok(text.clone())
            }
            ReasonerBehavior::TransportFail => {
                Err(ReasoningError::Transport("connection refused".to_string()))
            }
            ReasonerBehavior::TransportFailOnceThenReply(text) => {
                if n == 0 {
                    Err(ReasoningError::Transport("connection reset".to_string()))
                } else {
                    Ok(text.clone())
                }
            }
            ReasonerBehavior::BackendError(status) => {
                Err(ReasoningError::Backend { status: *status })
            }
        }
    }
}

// ── Stub similarity index ────────────────────────────────────────────────────

pub enum IndexBehavior {
    Empty,
    Cases(Vec<SimilarCase>),
    Fail,
    Slow,
}

pub struct StubIndex {
    behavior: IndexBehavior,
    pub calls: AtomicUsize,
}

impl StubIndex {
    pub fn new(behavior: IndexBehavior) -> Self {
        Self {
            behavior,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn empty() -> Self {
        Self::new(IndexBehavior::Empty)
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SimilarityIndex for StubIndex {
    async fn find_similar(
        &self,
        _application: &loandesk_core::Application,
        k: usize,
    ) -> Result<Vec<SimilarCase>, RecallError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            IndexBehavior::Empty => Ok(Vec::new()),
            IndexBehavior::Cases(cases) => Ok(cases.iter().take(k).cloned().collect()),
            IndexBehavior::Fail => Err(RecallError::Unavailable("index offline".to_string())),
            IndexBehavior::Slow => {
                tokio::time::sleep(SLOW).await;
                Ok(Vec::new())
            }
        }
    }
}
