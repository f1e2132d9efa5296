//! SQLite persistence layer — the decision ledger.
//!
//! RULE: Only the store talks to the database. The orchestrator and the
//! KPI aggregator call store methods — they never execute SQL directly.
//!
//! The ledger is append-only: decisions are inserted, read, and listed;
//! no update or delete statement exists in this module. At-most-one
//! decision per application is enforced by the UNIQUE constraint on
//! `decision.application_id`, so concurrent writers race to exactly one
//! success and the rest surface `DeskError::Duplicate`.

mod application;
mod audit;
mod kpi;

use crate::{
    decision::{Decision, DecisionSource, Outcome, Provenance},
    error::{DeskError, DeskResult},
    types::RecordId,
};
use anyhow::anyhow;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};

pub use audit::AuditEntry;

pub struct DecisionLedger {
    conn: Connection,
    path: Option<String>, // None for :memory:, Some(path) for file
}

impl DecisionLedger {
    /// Open (or create) the ledger database at `path`.
    pub fn open(path: &str) -> DeskResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        // WAL mode only for real files (:memory: ignores it). Busy timeout
        // so concurrent writers queue instead of failing spuriously.
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        conn.execute_batch("PRAGMA busy_timeout=5000;")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self {
            conn,
            path: Some(path.to_string()),
        })
    }

    /// Open an in-memory ledger (used in tests).
    pub fn in_memory() -> DeskResult<Self> {
        let conn = Connection::open(":memory:")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn, path: None })
    }

    /// Open an independent connection to the same database. Concurrent
    /// evaluation workers each hold their own connection.
    /// For in-memory ledgers this returns a new, isolated database.
    pub fn reopen(&self) -> DeskResult<Self> {
        match &self.path {
            Some(p) => Self::open(p),
            None => Self::in_memory(),
        }
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> DeskResult<()> {
        self.conn
            .execute_batch(include_str!("../../../migrations/001_foundation.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/002_audit.sql"))?;
        Ok(())
    }

    // ── Decisions ─────────────────────────────────────────────────────────

    /// Persist a decision atomically: the decision row, its findings, and
    /// the explanation commit together or not at all.
    pub fn record(&mut self, decision: &Decision) -> DeskResult<RecordId> {
        let verdict_json = serde_json::to_string(&decision.verdict)?;
        let tx = self.conn.transaction()?;

        let inserted = tx.execute(
            "INSERT INTO decision (
                decision_id, application_id, outcome, source, verdict,
                explanation, provenance, decided_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                decision.decision_id,
                decision.application_id,
                decision.outcome.as_str(),
                decision.source.as_str(),
                verdict_json,
                decision.explanation,
                decision.provenance.as_str(),
                format_ts(&decision.decided_at),
            ],
        );
        match inserted {
            Ok(_) => {}
            Err(e) if is_decision_unique_violation(&e) => {
                return Err(DeskError::Duplicate(decision.application_id.clone()));
            }
            Err(e) => return Err(e.into()),
        }
        let record_id = tx.last_insert_rowid();

        for (position, finding) in decision.verdict.findings.iter().enumerate() {
            tx.execute(
                "INSERT INTO rule_finding (
                    decision_id, position, rule_id, category, severity, passed, detail
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    decision.decision_id,
                    position as i64,
                    finding.rule_id,
                    finding.category.as_str(),
                    finding.severity.as_str(),
                    if finding.passed { 1 } else { 0 },
                    finding.detail,
                ],
            )?;
        }

        tx.commit()?;
        Ok(record_id)
    }

    /// Fetch the decision for an application.
    pub fn get(&self, application_id: &str) -> DeskResult<Decision> {
        let raw = self
            .conn
            .query_row(
                "SELECT decision_id, application_id, outcome, source, verdict,
                        explanation, provenance, decided_at
                 FROM decision WHERE application_id = ?1",
                params![application_id],
                RawDecision::from_row,
            )
            .optional()?;
        match raw {
            Some(raw) => raw.into_decision(),
            None => Err(DeskError::DecisionNotFound(application_id.to_string())),
        }
    }

    /// List decisions, decided-at ascending, honoring the filter.
    pub fn list(&self, filter: &DecisionFilter) -> DeskResult<Vec<Decision>> {
        let mut sql = String::from(
            "SELECT decision_id, application_id, outcome, source, verdict,
                    explanation, provenance, decided_at
             FROM decision WHERE 1=1",
        );
        let mut args: Vec<String> = Vec::new();

        if let Some(from) = &filter.decided_from {
            args.push(format_ts(from));
            sql.push_str(&format!(" AND decided_at >= ?{}", args.len()));
        }
        if let Some(to) = &filter.decided_to {
            args.push(format_ts(to));
            sql.push_str(&format!(" AND decided_at <= ?{}", args.len()));
        }
        if let Some(outcome) = filter.outcome {
            args.push(outcome.as_str().to_string());
            sql.push_str(&format!(" AND outcome = ?{}", args.len()));
        }
        sql.push_str(" ORDER BY decided_at ASC, rowid ASC");
        match (filter.limit, filter.offset) {
            (Some(limit), offset) => {
                sql.push_str(&format!(" LIMIT {limit} OFFSET {offset}"));
            }
            (None, offset) if offset > 0 => {
                sql.push_str(&format!(" LIMIT -1 OFFSET {offset}"));
            }
            _ => {}
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(rusqlite::params_from_iter(args.iter()), RawDecision::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(RawDecision::into_decision).collect()
    }
}

/// Range and outcome filter for decision listings.
#[derive(Debug, Clone, Default)]
pub struct DecisionFilter {
    pub decided_from: Option<DateTime<Utc>>,
    pub decided_to: Option<DateTime<Utc>>,
    pub outcome: Option<Outcome>,
    pub limit: Option<u32>,
    pub offset: u32,
}

// ── Row plumbing ─────────────────────────────────────────────────────────────

struct RawDecision {
    decision_id: String,
    application_id: String,
    outcome: String,
    source: String,
    verdict: String,
    explanation: Option<String>,
    provenance: String,
    decided_at: String,
}

impl RawDecision {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            decision_id: row.get(0)?,
            application_id: row.get(1)?,
            outcome: row.get(2)?,
            source: row.get(3)?,
            verdict: row.get(4)?,
            explanation: row.get(5)?,
            provenance: row.get(6)?,
            decided_at: row.get(7)?,
        })
    }

    fn into_decision(self) -> DeskResult<Decision> {
        Ok(Decision {
            outcome: Outcome::parse(&self.outcome)
                .ok_or_else(|| anyhow!("unknown outcome '{}' in ledger", self.outcome))?,
            source: DecisionSource::parse(&self.source)
                .ok_or_else(|| anyhow!("unknown decision source '{}' in ledger", self.source))?,
            provenance: Provenance::parse(&self.provenance)
                .ok_or_else(|| anyhow!("unknown provenance '{}' in ledger", self.provenance))?,
            verdict: serde_json::from_str(&self.verdict)?,
            decided_at: parse_ts(&self.decided_at)?,
            decision_id: self.decision_id,
            application_id: self.application_id,
            explanation: self.explanation,
        })
    }
}

/// RFC 3339 with fixed nine fractional digits: lexicographic order equals
/// chronological order, and parsing returns the exact instant.
pub(crate) fn format_ts(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

pub(crate) fn parse_ts(s: &str) -> DeskResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DeskError::Other(anyhow!("bad timestamp '{s}' in ledger: {e}")))
}

fn is_decision_unique_violation(e: &rusqlite::Error) -> bool {
    match e {
        rusqlite::Error::SqliteFailure(failure, Some(message)) => {
            failure.code == rusqlite::ErrorCode::ConstraintViolation
                && message.contains("decision.application_id")
        }
        _ => false,
    }
}
