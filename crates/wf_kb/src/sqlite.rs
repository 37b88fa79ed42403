//! SQLite-backed knowledge base.

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use tracing::{debug, info};

use crate::error::{KbError, KbResult};
use crate::models::{
    AgentPrompt, Incident, KbStats, NewIncident, Patch, SaveOutcome, SessionRecord, SessionStatus,
};
use crate::schema;
use crate::signature::distinguishing_suffix;
use crate::store::{IncidentStore, PromptStore, SessionLedger};
use crate::{INITIAL_CONFIDENCE, REPEAT_SUCCESS_BONUS};

/// How long a writer waits for a lock held by another session.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const INCIDENT_COLUMNS: &str = "id, signature, raw_log, fix_context, patch, agent, attempts, \
                                confidence, created_at, updated_at";

const SESSION_COLUMNS: &str = "session_id, spec, status, started_at, ended_at, output_location";

/// Knowledge base handle (single connection shared by all callers).
pub struct KnowledgeBase {
    conn: Mutex<Connection>,
}

impl KnowledgeBase {
    /// Open or create a knowledge base at the given path and migrate it.
    pub fn open(path: impl AsRef<Path>) -> KbResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            ",
        )?;
        schema::run_migrations(&conn)?;

        info!(path = %path.display(), "Opened knowledge base");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory knowledge base (for testing)
    pub fn open_in_memory() -> KbResult<Self> {
        let conn = Connection::open_in_memory()?;
        schema::run_migrations(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Aggregate statistics.
    pub fn stats(&self) -> KbResult<KbStats> {
        let conn = self.conn.lock();
        let (incidents, average_confidence): (i64, Option<f64>) = conn.query_row(
            "SELECT COUNT(*), AVG(confidence) FROM incidents",
            [],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )?;

        let mut stats = KbStats {
            incidents,
            average_confidence,
            ..Default::default()
        };

        let mut stmt = conn.prepare("SELECT status, COUNT(*) FROM sessions GROUP BY status")?;
        let rows = stmt.query_map([], |r| Ok((r.get::<_, String>(0)?, r.get::<_, i64>(1)?)))?;
        for row in rows {
            let (status, count) = row?;
            match SessionStatus::parse(&status) {
                Some(SessionStatus::InProgress) => stats.sessions_in_progress = count,
                Some(SessionStatus::Success) => stats.sessions_success = count,
                Some(SessionStatus::Failed) => stats.sessions_failed = count,
                None => {}
            }
        }

        stats.active_prompts = conn.query_row(
            "SELECT COUNT(*) FROM agent_prompts WHERE is_active = 1",
            [],
            |r| r.get(0),
        )?;

        Ok(stats)
    }

    fn read_incident(row: &Row) -> rusqlite::Result<IncidentRow> {
        Ok(IncidentRow {
            id: row.get("id")?,
            signature: row.get("signature")?,
            raw_log: row.get("raw_log")?,
            fix_context: row.get("fix_context")?,
            patch: row.get("patch")?,
            agent: row.get("agent")?,
            attempts: row.get("attempts")?,
            confidence: row.get("confidence")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    fn read_session(row: &Row) -> rusqlite::Result<SessionRow> {
        Ok(SessionRow {
            session_id: row.get("session_id")?,
            spec: row.get("spec")?,
            status: row.get("status")?,
            started_at: row.get("started_at")?,
            ended_at: row.get("ended_at")?,
            output_location: row.get("output_location")?,
        })
    }
}

struct IncidentRow {
    id: i64,
    signature: String,
    raw_log: String,
    fix_context: String,
    patch: String,
    agent: String,
    attempts: i64,
    confidence: f64,
    created_at: String,
    updated_at: String,
}

impl IncidentRow {
    fn into_incident(self) -> KbResult<Incident> {
        let patch = decode_patch(&self.signature, &self.patch)?;
        let fix_context = serde_json::from_str(&self.fix_context).unwrap_or(serde_json::Value::Null);
        Ok(Incident {
            id: self.id,
            created_at: parse_time(&self.signature, &self.created_at)?,
            updated_at: parse_time(&self.signature, &self.updated_at)?,
            signature: self.signature,
            raw_log: self.raw_log,
            fix_context,
            patch,
            agent: self.agent,
            attempts: self.attempts.max(0) as u32,
            confidence: self.confidence,
        })
    }
}

struct SessionRow {
    session_id: String,
    spec: String,
    status: String,
    started_at: String,
    ended_at: Option<String>,
    output_location: Option<String>,
}

impl SessionRow {
    fn into_record(self) -> KbResult<SessionRecord> {
        let status = SessionStatus::parse(&self.status).ok_or_else(|| KbError::Corrupt {
            key: self.session_id.clone(),
            message: format!("unknown status '{}'", self.status),
        })?;
        let ended_at = match &self.ended_at {
            Some(s) => Some(parse_time(&self.session_id, s)?),
            None => None,
        };
        Ok(SessionRecord {
            spec: serde_json::from_str(&self.spec).unwrap_or(serde_json::Value::Null),
            status,
            started_at: parse_time(&self.session_id, &self.started_at)?,
            ended_at,
            output_location: self.output_location,
            session_id: self.session_id,
        })
    }
}

fn decode_patch(key: &str, raw: &str) -> KbResult<Patch> {
    serde_json::from_str(raw).map_err(|e| KbError::Corrupt {
        key: key.to_string(),
        message: format!("patch is not a file replacement: {}", e),
    })
}

fn parse_time(key: &str, raw: &str) -> KbResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| KbError::Corrupt {
            key: key.to_string(),
            message: format!("bad timestamp '{}': {}", raw, e),
        })
}

fn escape_like(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn now() -> String {
    Utc::now().to_rfc3339()
}

impl IncidentStore for KnowledgeBase {
    fn find_known_solution(&self, signature: &str) -> KbResult<Option<Patch>> {
        let conn = self.conn.lock();
        let raw: Option<String> = conn
            .query_row(
                "SELECT patch FROM incidents WHERE signature = ?1 ORDER BY confidence DESC LIMIT 1",
                [signature],
                |r| r.get(0),
            )
            .optional()?;
        raw.map(|r| decode_patch(signature, &r)).transpose()
    }

    fn find_similar_incidents(&self, signature: &str, limit: usize) -> KbResult<Vec<Incident>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let pattern = format!("%{}%", escape_like(distinguishing_suffix(signature)));

        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM incidents WHERE signature LIKE ?1 ESCAPE '\\'
             ORDER BY confidence DESC, updated_at DESC LIMIT ?2",
            INCIDENT_COLUMNS
        ))?;
        let rows = stmt
            .query_map(params![pattern, limit as i64], Self::read_incident)?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter().map(IncidentRow::into_incident).collect()
    }

    fn save_incident(&self, incident: &NewIncident) -> KbResult<SaveOutcome> {
        if incident.signature.trim().is_empty() {
            return Err(KbError::InvalidArgument("empty signature".to_string()));
        }

        let mut conn = self.conn.lock();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let existing: Option<f64> = tx
            .query_row(
                "SELECT confidence FROM incidents WHERE signature = ?1",
                [&incident.signature],
                |r| r.get(0),
            )
            .optional()?;

        let outcome = match existing {
            Some(confidence) => {
                let confidence = confidence + REPEAT_SUCCESS_BONUS;
                tx.execute(
                    "UPDATE incidents SET confidence = ?1, updated_at = ?2 WHERE signature = ?3",
                    params![confidence, now(), incident.signature],
                )?;
                SaveOutcome::Reinforced { confidence }
            }
            None => {
                let stamp = now();
                tx.execute(
                    "INSERT INTO incidents (signature, raw_log, fix_context, patch, agent, attempts,
                                            confidence, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
                    params![
                        incident.signature,
                        incident.raw_log,
                        incident.fix_context.to_string(),
                        serde_json::to_string(&incident.patch)?,
                        incident.agent,
                        incident.attempts as i64,
                        INITIAL_CONFIDENCE,
                        stamp,
                    ],
                )?;
                SaveOutcome::Inserted
            }
        };
        tx.commit()?;

        debug!(signature = %incident.signature, ?outcome, "Saved incident");
        Ok(outcome)
    }

    fn reinforce(&self, signature: &str, delta: f64) -> KbResult<Option<f64>> {
        if !(delta.is_finite() && delta >= 0.0) {
            return Err(KbError::InvalidArgument(format!(
                "reinforcement delta must be >= 0, got {}",
                delta
            )));
        }

        let conn = self.conn.lock();
        let changed = conn.execute(
            "UPDATE incidents SET confidence = confidence + ?1, updated_at = ?2 WHERE signature = ?3",
            params![delta, now(), signature],
        )?;
        if changed == 0 {
            return Ok(None);
        }
        let confidence = conn.query_row(
            "SELECT confidence FROM incidents WHERE signature = ?1",
            [signature],
            |r| r.get(0),
        )?;
        Ok(Some(confidence))
    }

    fn penalize(&self, signature: &str, delta: f64, floor: f64) -> KbResult<Option<f64>> {
        if !(floor.is_finite() && floor > 0.0) {
            return Err(KbError::InvalidArgument(format!(
                "confidence floor must be > 0, got {}",
                floor
            )));
        }
        if !(delta.is_finite() && delta >= 0.0) {
            return Err(KbError::InvalidArgument(format!(
                "penalty delta must be >= 0, got {}",
                delta
            )));
        }

        let conn = self.conn.lock();
        // A penalty never raises a score that already sits below the floor.
        let changed = conn.execute(
            "UPDATE incidents
             SET confidence = MIN(confidence, MAX(?1, confidence - ?2)), updated_at = ?3
             WHERE signature = ?4",
            params![floor, delta, now(), signature],
        )?;
        if changed == 0 {
            return Ok(None);
        }
        let confidence = conn.query_row(
            "SELECT confidence FROM incidents WHERE signature = ?1",
            [signature],
            |r| r.get(0),
        )?;
        Ok(Some(confidence))
    }

    fn failed_solutions(&self, signature: &str, limit: usize) -> KbResult<Vec<Patch>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT patch FROM incidents WHERE signature = ?1 AND confidence < ?2
             ORDER BY updated_at DESC LIMIT ?3",
        )?;
        let rows = stmt
            .query_map(
                params![signature, INITIAL_CONFIDENCE, limit as i64],
                |r| r.get::<_, String>(0),
            )?
            .collect::<Result<Vec<_>, _>>()?;

        rows.iter().map(|raw| decode_patch(signature, raw)).collect()
    }

    fn get_incident(&self, signature: &str) -> KbResult<Option<Incident>> {
        let conn = self.conn.lock();
        let row = conn
            .query_row(
                &format!("SELECT {} FROM incidents WHERE signature = ?1", INCIDENT_COLUMNS),
                [signature],
                Self::read_incident,
            )
            .optional()?;
        row.map(IncidentRow::into_incident).transpose()
    }
}

impl SessionLedger for KnowledgeBase {
    fn begin(&self, spec: &serde_json::Value) -> KbResult<String> {
        let session_id = uuid::Uuid::new_v4().to_string();
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO sessions (session_id, spec, status, started_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                session_id,
                spec.to_string(),
                SessionStatus::InProgress.as_str(),
                now()
            ],
        )?;
        info!(session_id = %session_id, "Session started");
        Ok(session_id)
    }

    fn complete(
        &self,
        session_id: &str,
        status: SessionStatus,
        output_location: Option<&str>,
    ) -> KbResult<bool> {
        if !status.is_terminal() {
            return Err(KbError::InvalidArgument(
                "a session can only be completed with a terminal status".to_string(),
            ));
        }

        let conn = self.conn.lock();
        let changed = conn.execute(
            "UPDATE sessions
             SET status = ?1, ended_at = ?2, output_location = COALESCE(?3, output_location)
             WHERE session_id = ?4 AND status = 'in_progress'",
            params![status.as_str(), now(), output_location, session_id],
        )?;
        if changed == 1 {
            info!(session_id = %session_id, status = %status, "Session completed");
            return Ok(true);
        }

        let exists: Option<String> = conn
            .query_row(
                "SELECT status FROM sessions WHERE session_id = ?1",
                [session_id],
                |r| r.get(0),
            )
            .optional()?;
        match exists {
            Some(current) => {
                debug!(session_id = %session_id, current = %current, "Session already terminal");
                Ok(false)
            }
            None => Err(KbError::SessionNotFound(session_id.to_string())),
        }
    }

    fn get_session(&self, session_id: &str) -> KbResult<Option<SessionRecord>> {
        let conn = self.conn.lock();
        let row = conn
            .query_row(
                &format!("SELECT {} FROM sessions WHERE session_id = ?1", SESSION_COLUMNS),
                [session_id],
                Self::read_session,
            )
            .optional()?;
        row.map(SessionRow::into_record).transpose()
    }

    fn recent_sessions(&self, limit: usize) -> KbResult<Vec<SessionRecord>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM sessions ORDER BY started_at DESC LIMIT ?1",
            SESSION_COLUMNS
        ))?;
        let rows = stmt
            .query_map([limit as i64], Self::read_session)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(SessionRow::into_record).collect()
    }
}

impl PromptStore for KnowledgeBase {
    fn active_prompt(&self, role: &str) -> KbResult<Option<AgentPrompt>> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT role, prompt_text, version FROM agent_prompts
             WHERE role = ?1 AND is_active = 1 ORDER BY version DESC LIMIT 1",
            [role],
            |r| {
                Ok(AgentPrompt {
                    role: r.get(0)?,
                    prompt_text: r.get(1)?,
                    version: r.get(2)?,
                })
            },
        )
        .optional()
        .map_err(KbError::from)
    }

    fn set_prompt(&self, role: &str, prompt_text: &str) -> KbResult<AgentPrompt> {
        if role.trim().is_empty() || prompt_text.trim().is_empty() {
            return Err(KbError::InvalidArgument(
                "role and prompt text must not be empty".to_string(),
            ));
        }

        let mut conn = self.conn.lock();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let version: i64 = tx.query_row(
            "SELECT COALESCE(MAX(version), 0) + 1 FROM agent_prompts WHERE role = ?1",
            [role],
            |r| r.get(0),
        )?;
        tx.execute("UPDATE agent_prompts SET is_active = 0 WHERE role = ?1", [role])?;
        tx.execute(
            "INSERT INTO agent_prompts (role, prompt_text, version, is_active, created_at)
             VALUES (?1, ?2, ?3, 1, ?4)",
            params![role, prompt_text, version, now()],
        )?;
        tx.commit()?;

        info!(role = %role, version, "Stored prompt override");
        Ok(AgentPrompt {
            role: role.to_string(),
            prompt_text: prompt_text.to_string(),
            version,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("100%_done\\"), "100\\%\\_done\\\\");
        assert_eq!(escape_like("plain"), "plain");
    }

    #[test]
    fn test_stats_on_empty_store() {
        let kb = KnowledgeBase::open_in_memory().unwrap();
        let stats = kb.stats().unwrap();
        assert_eq!(stats.incidents, 0);
        assert!(stats.average_confidence.is_none());
        assert_eq!(stats.sessions_success, 0);
    }
}
