use super::{format_ts, parse_ts, DecisionLedger};
use crate::{
    application::{Application, EmploymentStatus},
    decision::Outcome,
    error::{DeskError, DeskResult},
    recall::PastCase,
};
use anyhow::anyhow;
use rusqlite::{params, OptionalExtension};

impl DecisionLedger {
    // ── Applications ──────────────────────────────────────────────────────

    pub fn record_application(&self, application: &Application) -> DeskResult<()> {
        self.conn.execute(
            "INSERT INTO application (
                application_id, name, age, income, employment, credit_score,
                loan_amount, term_months, interest_rate, purpose,
                identity_verified, pep_flagged, documents_json, submitted_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            params![
                application.application_id,
                application.name,
                application.age,
                application.income,
                application.employment.as_str(),
                application.credit_score,
                application.loan_amount,
                application.term_months,
                application.interest_rate,
                application.purpose,
                if application.identity_verified { 1 } else { 0 },
                if application.pep_flagged { 1 } else { 0 },
                serde_json::to_string(&application.documents)?,
                format_ts(&application.submitted_at),
            ],
        )?;
        Ok(())
    }

    pub fn get_application(&self, application_id: &str) -> DeskResult<Application> {
        let raw = self
            .conn
            .query_row(
                "SELECT application_id, name, age, income, employment, credit_score,
                        loan_amount, term_months, interest_rate, purpose,
                        identity_verified, pep_flagged, documents_json, submitted_at
                 FROM application WHERE application_id = ?1",
                params![application_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, f64>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, i64>(5)?,
                        row.get::<_, f64>(6)?,
                        row.get::<_, i64>(7)?,
                        row.get::<_, f64>(8)?,
                        row.get::<_, String>(9)?,
                        row.get::<_, i64>(10)?,
                        row.get::<_, i64>(11)?,
                        row.get::<_, String>(12)?,
                        row.get::<_, String>(13)?,
                    ))
                },
            )
            .optional()?;

        let Some((
            application_id,
            name,
            age,
            income,
            employment,
            credit_score,
            loan_amount,
            term_months,
            interest_rate,
            purpose,
            identity_verified,
            pep_flagged,
            documents_json,
            submitted_at,
        )) = raw
        else {
            return Err(DeskError::ApplicationNotFound(application_id.to_string()));
        };

        Ok(Application {
            employment: EmploymentStatus::parse(&employment)
                .ok_or_else(|| anyhow!("unknown employment '{employment}' in ledger"))?,
            documents: serde_json::from_str(&documents_json)?,
            submitted_at: parse_ts(&submitted_at)?,
            application_id,
            name,
            age,
            income,
            credit_score,
            loan_amount,
            term_months,
            interest_rate,
            purpose,
            identity_verified: identity_verified != 0,
            pep_flagged: pep_flagged != 0,
        })
    }

    /// Decided applications as the similarity index sees them, oldest first.
    pub fn decided_cases(&self) -> DeskResult<Vec<PastCase>> {
        let mut stmt = self.conn.prepare(
            "SELECT a.application_id, a.income, a.loan_amount, a.credit_score,
                    a.purpose, d.outcome
             FROM application a
             JOIN decision d ON d.application_id = a.application_id
             ORDER BY d.decided_at ASC, d.rowid ASC",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, f64>(1)?,
                    row.get::<_, f64>(2)?,
                    row.get::<_, i64>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(application_id, income, loan_amount, credit_score, purpose, outcome)| {
                Ok(PastCase {
                    outcome: Outcome::parse(&outcome)
                        .ok_or_else(|| anyhow!("unknown outcome '{outcome}' in ledger"))?,
                    application_id,
                    income,
                    loan_amount,
                    credit_score,
                    purpose,
                })
            })
            .collect()
    }
}
