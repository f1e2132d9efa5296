//! The deterministic rule engine.
//!
//! RULES:
//!   - Every rule is evaluated, every run — no short-circuit. The verdict
//!     enumerates all failures, not just the first.
//!   - Rules are configuration data: a tagged check over policy thresholds,
//!     never code generated at runtime.
//!   - `evaluate` is pure. Same application + same rule set = same verdict,
//!     on every call, on any thread.

use crate::{
    application::Application,
    config::RulePolicy,
    error::{DeskError, DeskResult},
    types::RuleId,
};
use serde::{Deserialize, Serialize};
use std::fmt;

// ── Rule definitions ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleCategory {
    Kyc,
    Credit,
}

impl RuleCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleCategory::Kyc => "kyc",
            RuleCategory::Credit => "credit",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "kyc" => Some(RuleCategory::Kyc),
            "credit" => Some(RuleCategory::Credit),
            _ => None,
        }
    }
}

/// What a failed rule does to the aggregate outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Failure alone forces rejection.
    HardFail,
    /// Failure alone only flags for review.
    SoftFlag,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::HardFail => "hard_fail",
            Severity::SoftFlag => "soft_flag",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "hard_fail" => Some(Severity::HardFail),
            "soft_flag" => Some(Severity::SoftFlag),
            _ => None,
        }
    }
}

/// The check a rule performs, as a tagged variant over configured
/// thresholds. Each variant is a pure predicate over application fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuleCheck {
    IdentityVerified,
    DocumentsCurrent,
    PepScreen,
    CreditScoreFloor { min: i64 },
    LoanToIncomeCap { max_ratio: f64 },
    EmploymentRisk { max_ratio: f64 },
}

impl RuleCheck {
    /// Run the check. Returns pass/fail plus a human-readable detail line
    /// that goes into the verdict either way.
    fn run(&self, app: &Application) -> (bool, String) {
        match self {
            RuleCheck::IdentityVerified => {
                if app.identity_verified {
                    (true, "identity verified".to_string())
                } else {
                    (false, "applicant identity is not verified".to_string())
                }
            }
            RuleCheck::DocumentsCurrent => {
                if app.documents.is_empty() {
                    return (false, "no KYC documents on file".to_string());
                }
                let expired: Vec<&str> = app
                    .documents
                    .iter()
                    .filter(|d| d.expired)
                    .map(|d| d.kind.as_str())
                    .collect();
                if expired.is_empty() {
                    (true, format!("{} document(s) on file, all current", app.documents.len()))
                } else {
                    (false, format!("expired document(s): {}", expired.join(", ")))
                }
            }
            RuleCheck::PepScreen => {
                if app.pep_flagged {
                    (false, "politically exposed person match".to_string())
                } else {
                    (true, "no PEP match".to_string())
                }
            }
            RuleCheck::CreditScoreFloor { min } => {
                if app.credit_score >= *min {
                    (true, format!("credit score {} at or above {}", app.credit_score, min))
                } else {
                    (false, format!("credit score {} below {}", app.credit_score, min))
                }
            }
            RuleCheck::LoanToIncomeCap { max_ratio } => {
                let ratio = app.loan_to_income();
                if ratio <= *max_ratio {
                    (true, format!("amount is {ratio:.2}x annual income (cap {max_ratio}x)"))
                } else if ratio.is_infinite() {
                    (false, "requested amount with no declared income".to_string())
                } else {
                    (false, format!("amount is {ratio:.2}x annual income, above cap {max_ratio}x"))
                }
            }
            RuleCheck::EmploymentRisk { max_ratio } => {
                if app.employment.is_high_risk() && app.loan_to_income() > *max_ratio {
                    (
                        false,
                        format!(
                            "{} applicant requesting over {max_ratio}x annual income",
                            app.employment
                        ),
                    )
                } else {
                    (true, format!("employment profile ({}) acceptable", app.employment))
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub rule_id: RuleId,
    pub category: RuleCategory,
    pub severity: Severity,
    pub description: String,
    pub check: RuleCheck,
}

/// Ordered, non-empty set of rules. Fixed for the lifetime of an
/// evaluation run — built once from policy at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    pub fn new(rules: Vec<Rule>) -> DeskResult<Self> {
        if rules.is_empty() {
            return Err(DeskError::EmptyRuleSet);
        }
        Ok(Self { rules })
    }

    /// The standard underwriting rule set, parameterized by policy.
    pub fn standard(policy: &RulePolicy) -> Self {
        let rule = |rule_id: &str, category, severity, description: &str, check| Rule {
            rule_id: rule_id.to_string(),
            category,
            severity,
            description: description.to_string(),
            check,
        };
        Self {
            rules: vec![
                rule(
                    "kyc_identity",
                    RuleCategory::Kyc,
                    Severity::HardFail,
                    "Applicant identity must be verified",
                    RuleCheck::IdentityVerified,
                ),
                rule(
                    "kyc_documents",
                    RuleCategory::Kyc,
                    Severity::HardFail,
                    "KYC documents must be on file and current",
                    RuleCheck::DocumentsCurrent,
                ),
                rule(
                    "kyc_pep",
                    RuleCategory::Kyc,
                    Severity::SoftFlag,
                    "PEP matches require review",
                    RuleCheck::PepScreen,
                ),
                rule(
                    "credit_hard_floor",
                    RuleCategory::Credit,
                    Severity::HardFail,
                    "Very low credit score",
                    RuleCheck::CreditScoreFloor {
                        min: policy.credit_hard_floor,
                    },
                ),
                rule(
                    "credit_review_floor",
                    RuleCategory::Credit,
                    Severity::SoftFlag,
                    "Low credit score",
                    RuleCheck::CreditScoreFloor {
                        min: policy.credit_review_floor,
                    },
                ),
                rule(
                    "credit_leverage",
                    RuleCategory::Credit,
                    Severity::SoftFlag,
                    "Requested amount relative to income",
                    RuleCheck::LoanToIncomeCap {
                        max_ratio: policy.max_loan_to_income,
                    },
                ),
                rule(
                    "credit_employment_risk",
                    RuleCategory::Credit,
                    Severity::SoftFlag,
                    "High-risk employment with large request",
                    RuleCheck::EmploymentRisk {
                        max_ratio: policy.risk_employment_ratio,
                    },
                ),
            ],
        }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

// ── Verdict ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleOutcome {
    Pass,
    Flag,
    Reject,
}

impl RuleOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleOutcome::Pass => "pass",
            RuleOutcome::Flag => "flag",
            RuleOutcome::Reject => "reject",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pass" => Some(RuleOutcome::Pass),
            "flag" => Some(RuleOutcome::Flag),
            "reject" => Some(RuleOutcome::Reject),
            _ => None,
        }
    }
}

impl fmt::Display for RuleOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One rule's result within a verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleFinding {
    pub rule_id: RuleId,
    pub category: RuleCategory,
    pub severity: Severity,
    pub passed: bool,
    pub detail: String,
}

/// The full deterministic verdict: every rule's finding, in rule-set order,
/// plus the aggregate outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleVerdict {
    pub findings: Vec<RuleFinding>,
    pub outcome: RuleOutcome,
}

impl RuleVerdict {
    /// Aggregate policy: any failed hard-fail → Reject; otherwise any
    /// failed soft-flag → Flag; otherwise Pass.
    pub fn from_findings(findings: Vec<RuleFinding>) -> Self {
        let any_hard = findings
            .iter()
            .any(|f| !f.passed && f.severity == Severity::HardFail);
        let any_soft = findings
            .iter()
            .any(|f| !f.passed && f.severity == Severity::SoftFlag);
        let outcome = if any_hard {
            RuleOutcome::Reject
        } else if any_soft {
            RuleOutcome::Flag
        } else {
            RuleOutcome::Pass
        };
        Self { findings, outcome }
    }

    pub fn failed(&self) -> impl Iterator<Item = &RuleFinding> {
        self.findings.iter().filter(|f| !f.passed)
    }

    pub fn failed_rule_ids(&self) -> Vec<RuleId> {
        self.failed().map(|f| f.rule_id.clone()).collect()
    }
}

// ── Engine ───────────────────────────────────────────────────────────────────

/// Evaluate every rule against the application.
///
/// Fails only on malformed application data — a business rejection is a
/// verdict, never an error. No side effects.
pub fn evaluate(application: &Application, rules: &RuleSet) -> DeskResult<RuleVerdict> {
    if rules.is_empty() {
        return Err(DeskError::EmptyRuleSet);
    }
    application.validate()?;

    let findings = rules
        .rules()
        .iter()
        .map(|rule| {
            let (passed, detail) = rule.check.run(application);
            RuleFinding {
                rule_id: rule.rule_id.clone(),
                category: rule.category,
                severity: rule.severity,
                passed,
                detail,
            }
        })
        .collect();

    Ok(RuleVerdict::from_findings(findings))
}
