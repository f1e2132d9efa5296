//! Shared primitive types used across the decision engine.

/// Unique identifier of a loan application (`app-` prefixed UUID).
pub type ApplicationId = String;

/// Unique identifier of a persisted decision (`dec-` prefixed UUID).
pub type DecisionId = String;

/// Stable identifier of a rule within the configured rule set.
pub type RuleId = String;

/// Row id returned by the ledger on a successful decision write.
pub type RecordId = i64;

/// Mint a fresh application id.
pub fn new_application_id() -> ApplicationId {
    format!("app-{}", uuid::Uuid::new_v4())
}

/// Mint a fresh decision id.
pub fn new_decision_id() -> DecisionId {
    format!("dec-{}", uuid::Uuid::new_v4())
}

/// Mint an opaque correlation id for caller-visible internal errors.
pub fn new_correlation_id() -> String {
    format!("err-{}", uuid::Uuid::new_v4())
}
