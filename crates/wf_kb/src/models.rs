//! Knowledge-base records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Full-file replacement that fixed a failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patch {
    pub file_path: String,
    pub content: String,
}

impl Patch {
    pub fn new(file_path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            file_path: file_path.into(),
            content: content.into(),
        }
    }
}

/// A stored incident.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Incident {
    pub id: i64,
    pub signature: String,
    pub raw_log: String,
    /// Diagnosis context that produced the fix
    pub fix_context: serde_json::Value,
    pub patch: Patch,
    /// Agent that produced the fix
    pub agent: String,
    /// Attempts consumed before the fix held
    pub attempts: u32,
    pub confidence: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Incident data supplied by the fix cycle.
#[derive(Debug, Clone)]
pub struct NewIncident {
    pub signature: String,
    pub raw_log: String,
    pub fix_context: serde_json::Value,
    pub patch: Patch,
    pub agent: String,
    pub attempts: u32,
}

/// What `save_incident` did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SaveOutcome {
    Inserted,
    Reinforced { confidence: f64 },
}

/// Lifecycle status of a generation session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    InProgress,
    Success,
    Failed,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InProgress => "in_progress",
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "in_progress" => Some(Self::InProgress),
            "success" => Some(Self::Success),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::InProgress)
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One row of the session ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub session_id: String,
    pub spec: serde_json::Value,
    pub status: SessionStatus,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub output_location: Option<String>,
}

/// Prompt override for an agent role.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentPrompt {
    pub role: String,
    pub prompt_text: String,
    pub version: i64,
}

/// Aggregate numbers for `wf kb stats`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct KbStats {
    pub incidents: i64,
    pub average_confidence: Option<f64>,
    pub sessions_in_progress: i64,
    pub sessions_success: i64,
    pub sessions_failed: i64,
    pub active_prompts: i64,
}
