use super::{format_ts, DecisionLedger};
use crate::{error::DeskResult, pipeline_event::PipelineEvent};
use chrono::Utc;
use rusqlite::params;

/// One persisted audit row.
#[derive(Debug, Clone)]
pub struct AuditEntry {
    pub id: i64,
    pub application_id: String,
    pub stage: String,
    pub payload: String,
    pub recorded_at: String,
}

impl DecisionLedger {
    // ── Pipeline audit log ────────────────────────────────────────────────

    pub fn append_audit(&self, event: &PipelineEvent) -> DeskResult<()> {
        self.conn.execute(
            "INSERT INTO pipeline_audit (application_id, stage, payload, recorded_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                event.application_id(),
                event.stage(),
                serde_json::to_string(event)?,
                format_ts(&Utc::now()),
            ],
        )?;
        Ok(())
    }

    /// Full stage trail for one application, in emission order.
    pub fn audit_trail(&self, application_id: &str) -> DeskResult<Vec<AuditEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, application_id, stage, payload, recorded_at
             FROM pipeline_audit WHERE application_id = ?1
             ORDER BY id ASC",
        )?;
        let entries = stmt
            .query_map(params![application_id], |row| {
                Ok(AuditEntry {
                    id: row.get(0)?,
                    application_id: row.get(1)?,
                    stage: row.get(2)?,
                    payload: row.get(3)?,
                    recorded_at: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }
}
