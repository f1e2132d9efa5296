//! The generative reasoning capability: an untrusted, unreliable external
//! backend that turns a verdict into a human-readable justification.
//!
//! The backend is consumed behind [`ReasoningClient`]. The orchestrator owns
//! timeout and retry policy; this module owns the wire format and the
//! prompt. Nothing returned from here has outcome authority.

use crate::{application::Application, config::ReasoningConfig, recall::SimilarCase, rules::RuleVerdict};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReasoningError {
    #[error("transport failure: {0}")]
    Transport(String),

    #[error("reasoning backend returned status {status}")]
    Backend { status: u16 },

    #[error("malformed backend response: {0}")]
    Malformed(String),

    #[error("backend returned an empty completion")]
    EmptyCompletion,
}

impl ReasoningError {
    /// Only transient transport failures qualify for the orchestrator's
    /// single retry. A timeout is handled upstream and never retried.
    pub fn is_transient(&self) -> bool {
        matches!(self, ReasoningError::Transport(_))
    }
}

/// Everything the backend is given for one explanation.
#[derive(Debug, Clone, Copy)]
pub struct ReasoningRequest<'a> {
    pub application: &'a Application,
    pub verdict: &'a RuleVerdict,
    pub context: &'a [SimilarCase],
}

#[async_trait]
pub trait ReasoningClient: Send + Sync {
    /// One short free-text rationale for the verdict.
    async fn explain(&self, request: ReasoningRequest<'_>) -> Result<String, ReasoningError>;
}

/// Build the underwriter prompt from the request.
pub fn build_prompt(request: ReasoningRequest<'_>) -> String {
    let application = serde_json::to_string(request.application).unwrap_or_default();
    let findings: Vec<String> = request
        .verdict
        .findings
        .iter()
        .map(|f| {
            format!(
                "- [{}] {}: {}",
                if f.passed { "pass" } else { "FAIL" },
                f.rule_id,
                f.detail
            )
        })
        .collect();
    let similar: Vec<String> = request
        .context
        .iter()
        .map(|c| format!("- {} (score {:.2})", c.summary, c.score))
        .collect();

    format!(
        "You are a senior underwriter. Return one short sentence (no bullets) \
         explaining the decision.\n\
         Application={application}\n\
         RuleOutcome={}\n\
         Findings:\n{}\n\
         SimilarCases:\n{}",
        request.verdict.outcome,
        findings.join("\n"),
        if similar.is_empty() {
            "None".to_string()
        } else {
            similar.join("\n")
        },
    )
}

// ── Ollama-compatible HTTP client ────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

/// Client for an Ollama-compatible `/api/generate` backend.
pub struct OllamaClient {
    http: reqwest::Client,
    config: ReasoningConfig,
}

impl OllamaClient {
    pub fn new(config: ReasoningConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    fn generate_url(&self) -> String {
        format!("{}/api/generate", self.config.endpoint.trim_end_matches('/'))
    }
}

#[async_trait]
impl ReasoningClient for OllamaClient {
    async fn explain(&self, request: ReasoningRequest<'_>) -> Result<String, ReasoningError> {
        let body = json!({
            "model": self.config.model,
            "prompt": build_prompt(request),
            "stream": false,
            "options": {
                "temperature": self.config.temperature,
                "top_p": self.config.top_p,
                "num_predict": self.config.max_tokens,
            },
        });

        let response = self
            .http
            .post(self.generate_url())
            .json(&body)
            .send()
            .await
            .map_err(|e| ReasoningError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ReasoningError::Backend {
                status: status.as_u16(),
            });
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| ReasoningError::Malformed(e.to_string()))?;

        // Keep only the first line; the backend is prompted for one
        // sentence but is not trusted to comply.
        let text = parsed
            .response
            .lines()
            .next()
            .unwrap_or("")
            .trim()
            .to_string();
        if text.is_empty() {
            return Err(ReasoningError::EmptyCompletion);
        }
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::{ApplicationDraft, EmploymentStatus, KycDocument};
    use crate::config::RulePolicy;
    use crate::rules::{evaluate, RuleSet};

    #[test]
    fn prompt_carries_verdict_and_context() {
        let app = ApplicationDraft {
            name: "Jane Smith".to_string(),
            age: 29,
            income: 48_000.0,
            employment: EmploymentStatus::Employed,
            credit_score: 705,
            loan_amount: 12_000.0,
            term_months: 24,
            interest_rate: 7.0,
            purpose: "education".to_string(),
            identity_verified: true,
            pep_flagged: false,
            documents: vec![KycDocument {
                kind: "id_card".to_string(),
                expired: false,
            }],
        }
        .submit()
        .unwrap();
        let verdict = evaluate(&app, &RuleSet::standard(&RulePolicy::default())).unwrap();
        let prompt = build_prompt(ReasoningRequest {
            application: &app,
            verdict: &verdict,
            context: &[],
        });
        assert!(prompt.contains("senior underwriter"));
        assert!(prompt.contains("Jane Smith"));
        assert!(prompt.contains("RuleOutcome=pass"));
        assert!(prompt.contains("SimilarCases:\nNone"));
    }

    #[test]
    fn transient_classification() {
        assert!(ReasoningError::Transport("connection refused".to_string()).is_transient());
        assert!(!ReasoningError::Backend { status: 500 }.is_transient());
        assert!(!ReasoningError::EmptyCompletion.is_transient());
    }
}
