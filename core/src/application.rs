//! Loan applications: the immutable input record of every evaluation run.
//!
//! An [`ApplicationDraft`] is what callers submit; [`ApplicationDraft::submit`]
//! validates field by field and mints the immutable [`Application`]. Nothing
//! downstream ever mutates an application — resubmission creates a new one
//! with a fresh id.

use crate::{
    error::{DeskError, DeskResult},
    types::{new_application_id, ApplicationId},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EmploymentStatus {
    Employed,
    SelfEmployed,
    Contract,
    Student,
    Retired,
    Unemployed,
}

impl EmploymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmploymentStatus::Employed => "employed",
            EmploymentStatus::SelfEmployed => "self-employed",
            EmploymentStatus::Contract => "contract",
            EmploymentStatus::Student => "student",
            EmploymentStatus::Retired => "retired",
            EmploymentStatus::Unemployed => "unemployed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "employed" => Some(EmploymentStatus::Employed),
            "self-employed" => Some(EmploymentStatus::SelfEmployed),
            "contract" => Some(EmploymentStatus::Contract),
            "student" => Some(EmploymentStatus::Student),
            "retired" => Some(EmploymentStatus::Retired),
            "unemployed" => Some(EmploymentStatus::Unemployed),
            _ => None,
        }
    }

    /// Statuses that tighten the leverage cap when combined with a large
    /// requested amount.
    pub fn is_high_risk(&self) -> bool {
        matches!(self, EmploymentStatus::Student | EmploymentStatus::Unemployed)
    }
}

impl fmt::Display for EmploymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Metadata of one submitted KYC document. The document itself lives
/// outside this system; only verification state is carried here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KycDocument {
    pub kind: String,
    pub expired: bool,
}

/// A validated, immutable loan application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub application_id: ApplicationId,
    pub name: String,
    pub age: i64,
    /// Annual income.
    pub income: f64,
    pub employment: EmploymentStatus,
    pub credit_score: i64,
    pub loan_amount: f64,
    pub term_months: i64,
    pub interest_rate: f64,
    pub purpose: String,
    pub identity_verified: bool,
    pub pep_flagged: bool,
    pub documents: Vec<KycDocument>,
    pub submitted_at: DateTime<Utc>,
}

impl Application {
    /// Requested amount as a multiple of annual income.
    /// Infinite when income is zero — every cap rule fails on it.
    pub fn loan_to_income(&self) -> f64 {
        if self.income <= 0.0 {
            f64::INFINITY
        } else {
            self.loan_amount / self.income
        }
    }

    /// Re-check the field invariants. Drafts run this on submit; the rule
    /// engine runs it again so a hand-built application cannot smuggle
    /// malformed data past evaluation.
    pub fn validate(&self) -> DeskResult<()> {
        if self.name.trim().is_empty() {
            return Err(DeskError::validation("name", "must not be empty"));
        }
        if !(18..=100).contains(&self.age) {
            return Err(DeskError::validation("age", "must be between 18 and 100"));
        }
        if !self.income.is_finite() || self.income < 0.0 {
            return Err(DeskError::validation("income", "must be a non-negative number"));
        }
        if !(300..=900).contains(&self.credit_score) {
            return Err(DeskError::validation(
                "credit_score",
                "must be between 300 and 900",
            ));
        }
        if !self.loan_amount.is_finite() || self.loan_amount <= 0.0 {
            return Err(DeskError::validation("loan_amount", "must be positive"));
        }
        if self.term_months <= 0 {
            return Err(DeskError::validation("term_months", "must be positive"));
        }
        if !self.interest_rate.is_finite() || self.interest_rate < 0.0 {
            return Err(DeskError::validation(
                "interest_rate",
                "must be a non-negative number",
            ));
        }
        Ok(())
    }
}

/// Caller-supplied application fields, before an id and timestamp exist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationDraft {
    pub name: String,
    pub age: i64,
    pub income: f64,
    pub employment: EmploymentStatus,
    pub credit_score: i64,
    pub loan_amount: f64,
    pub term_months: i64,
    pub interest_rate: f64,
    #[serde(default)]
    pub purpose: String,
    pub identity_verified: bool,
    #[serde(default)]
    pub pep_flagged: bool,
    #[serde(default)]
    pub documents: Vec<KycDocument>,
}

impl ApplicationDraft {
    /// Validate and mint the immutable application record.
    pub fn submit(self) -> DeskResult<Application> {
        let purpose = self.purpose.trim().to_string();
        let application = Application {
            application_id: new_application_id(),
            name: self.name.trim().to_string(),
            age: self.age,
            income: self.income,
            employment: self.employment,
            credit_score: self.credit_score,
            loan_amount: self.loan_amount,
            term_months: self.term_months,
            interest_rate: self.interest_rate,
            purpose: if purpose.is_empty() {
                "unspecified".to_string()
            } else {
                purpose
            },
            identity_verified: self.identity_verified,
            pep_flagged: self.pep_flagged,
            documents: self.documents,
            submitted_at: Utc::now(),
        };
        application.validate()?;
        Ok(application)
    }
}
