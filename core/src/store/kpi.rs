use super::{format_ts, DecisionLedger};
use crate::{error::DeskResult, kpi::DateRange};
use rusqlite::params_from_iter;

/// Decision totals per outcome within a range.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct OutcomeCounts {
    pub total: i64,
    pub approved: i64,
    pub reviewed: i64,
    pub rejected: i64,
}

/// Reasoning coverage within a range: decisions eligible for reasoning
/// (everything but hard rejections) and how many carry a generated
/// explanation.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct ReasoningCounts {
    pub eligible: i64,
    pub generated: i64,
}

fn range_clause(column: &str, range: &DateRange, args: &mut Vec<String>) -> String {
    let mut clause = String::new();
    if let Some(from) = &range.from {
        args.push(format_ts(from));
        clause.push_str(&format!(" AND {column} >= ?{}", args.len()));
    }
    if let Some(to) = &range.to {
        args.push(format_ts(to));
        clause.push_str(&format!(" AND {column} <= ?{}", args.len()));
    }
    clause
}

impl DecisionLedger {
    // ── KPI queries ───────────────────────────────────────────────────────

    pub(crate) fn outcome_counts(&self, range: &DateRange) -> DeskResult<OutcomeCounts> {
        let mut args = Vec::new();
        let clause = range_clause("decided_at", range, &mut args);
        let mut stmt = self.conn.prepare(&format!(
            "SELECT outcome, COUNT(*) FROM decision WHERE 1=1{clause} GROUP BY outcome"
        ))?;
        let rows = stmt
            .query_map(params_from_iter(args.iter()), |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut counts = OutcomeCounts::default();
        for (outcome, n) in rows {
            counts.total += n;
            match outcome.as_str() {
                "approve" => counts.approved = n,
                "review" => counts.reviewed = n,
                "reject" => counts.rejected = n,
                _ => {}
            }
        }
        Ok(counts)
    }

    /// Failure count per rule id, most frequent first.
    pub(crate) fn rule_failure_counts(&self, range: &DateRange) -> DeskResult<Vec<(String, i64)>> {
        let mut args = Vec::new();
        let clause = range_clause("d.decided_at", range, &mut args);
        let mut stmt = self.conn.prepare(&format!(
            "SELECT f.rule_id, COUNT(*)
             FROM rule_finding f
             JOIN decision d ON d.decision_id = f.decision_id
             WHERE f.passed = 0{clause}
             GROUP BY f.rule_id
             ORDER BY COUNT(*) DESC, f.rule_id ASC"
        ))?;
        let rows = stmt
            .query_map(params_from_iter(args.iter()), |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub(crate) fn reasoning_counts(&self, range: &DateRange) -> DeskResult<ReasoningCounts> {
        let mut args = Vec::new();
        let clause = range_clause("decided_at", range, &mut args);
        let (eligible, generated) = self.conn.query_row(
            &format!(
                "SELECT COUNT(*),
                        SUM(CASE WHEN provenance = 'generated' THEN 1 ELSE 0 END)
                 FROM decision WHERE outcome != 'reject'{clause}"
            ),
            params_from_iter(args.iter()),
            |row| Ok((row.get::<_, i64>(0)?, row.get::<_, Option<i64>>(1)?)),
        )?;
        Ok(ReasoningCounts {
            eligible,
            generated: generated.unwrap_or(0),
        })
    }

    pub(crate) fn avg_credit_score(&self, range: &DateRange) -> DeskResult<Option<f64>> {
        let mut args = Vec::new();
        let clause = range_clause("d.decided_at", range, &mut args);
        let avg = self.conn.query_row(
            &format!(
                "SELECT AVG(a.credit_score)
                 FROM decision d
                 JOIN application a ON a.application_id = d.application_id
                 WHERE 1=1{clause}"
            ),
            params_from_iter(args.iter()),
            |row| row.get::<_, Option<f64>>(0),
        )?;
        Ok(avg)
    }
}
