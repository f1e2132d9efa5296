//! Engine configuration: rule thresholds, capability timeouts, reasoning
//! endpoint. Loaded once at process start and passed explicitly — nothing
//! in the engine reads configuration from globals.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Thresholds the default rule set is built from.
///
/// These are policy parameters, not constants: the hard credit floor, the
/// review floor, and the leverage caps differ per deployment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RulePolicy {
    /// Credit score below this is a hard rejection.
    pub credit_hard_floor: i64,
    /// Credit score below this (but at or above the hard floor) flags for review.
    pub credit_review_floor: i64,
    /// Requested amount above this multiple of annual income flags for review.
    pub max_loan_to_income: f64,
    /// For student/unemployed applicants, amount above this multiple of
    /// income flags for review.
    pub risk_employment_ratio: f64,
}

impl Default for RulePolicy {
    fn default() -> Self {
        Self {
            credit_hard_floor: 500,
            credit_review_floor: 620,
            max_loan_to_income: 10.0,
            risk_employment_ratio: 0.5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecallConfig {
    pub enabled: bool,
    /// Maximum number of similar past cases to retrieve.
    pub k: usize,
    pub timeout_ms: u64,
}

impl Default for RecallConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            k: 3,
            timeout_ms: 2_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReasoningConfig {
    pub enabled: bool,
    /// Base URL of the generation backend (Ollama-compatible).
    pub endpoint: String,
    pub model: String,
    pub timeout_ms: u64,
    pub temperature: f64,
    pub top_p: f64,
    pub max_tokens: u32,
}

impl Default for ReasoningConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: "http://127.0.0.1:11434".to_string(),
            model: "llama3.2:3b".to_string(),
            timeout_ms: 15_000,
            temperature: 0.2,
            top_p: 0.9,
            max_tokens: 220,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeskConfig {
    #[serde(default)]
    pub rules: RulePolicy,
    #[serde(default)]
    pub recall: RecallConfig,
    #[serde(default)]
    pub reasoning: ReasoningConfig,
}

impl DeskConfig {
    /// Load from a JSON file. Missing sections fall back to defaults.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: DeskConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    pub fn recall_timeout(&self) -> Duration {
        Duration::from_millis(self.recall.timeout_ms)
    }

    pub fn reasoning_timeout(&self) -> Duration {
        Duration::from_millis(self.reasoning.timeout_ms)
    }
}
