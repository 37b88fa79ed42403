//! Persistent progress report of a generation run.
//!
//! Written to `<output>/.wf/progress.json` after every phase. A failed run
//! returns it as its partial progress detail.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CoreError, CoreResult};

/// Directory inside the output tree that holds run bookkeeping.
pub const STATE_DIR: &str = ".wf";

/// Progress report file name.
pub const PROGRESS_FILE: &str = "progress.json";

/// Run state.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionState {
    #[default]
    Pending,
    Running,
    Completed,
    Failed,
}

/// Outcome of one phase.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PhaseRecord {
    pub phase: String,
    pub success: bool,
    /// Gate runs or task attempts used
    pub attempts: u32,
    pub message: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

/// Progress of one run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProgressReport {
    pub session_id: String,
    pub state: ExecutionState,
    /// Ordered phase names
    pub phases: Vec<String>,
    /// Index of the current or last phase
    pub current_phase_index: usize,
    pub results: Vec<PhaseRecord>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

impl ProgressReport {
    pub fn new(session_id: impl Into<String>, phases: Vec<String>) -> Self {
        Self {
            session_id: session_id.into(),
            state: ExecutionState::Pending,
            phases,
            current_phase_index: 0,
            results: Vec::new(),
            started_at: None,
            completed_at: None,
            last_error: None,
        }
    }

    /// Report location for an output directory.
    pub fn path_for(output_dir: &Path) -> PathBuf {
        output_dir.join(STATE_DIR).join(PROGRESS_FILE)
    }

    pub fn start(&mut self) {
        self.state = ExecutionState::Running;
        if self.started_at.is_none() {
            self.started_at = Some(Utc::now());
        }
    }

    pub fn record(&mut self, record: PhaseRecord) {
        self.results.push(record);
    }

    pub fn complete(&mut self) {
        self.state = ExecutionState::Completed;
        self.completed_at = Some(Utc::now());
    }

    pub fn fail(&mut self, last_error: impl Into<String>) {
        self.state = ExecutionState::Failed;
        self.last_error = Some(last_error.into());
        self.completed_at = Some(Utc::now());
    }

    /// Name of the phase that failed, if the run failed.
    pub fn failed_phase(&self) -> Option<&str> {
        if self.state == ExecutionState::Failed {
            self.phases.get(self.current_phase_index).map(|s| s.as_str())
        } else {
            None
        }
    }

    pub fn completed_phases(&self) -> usize {
        self.results.iter().filter(|r| r.success).count()
    }

    pub fn save(&self, output_dir: &Path) -> CoreResult<()> {
        let path = Self::path_for(output_dir);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| CoreError::Serialization(e.to_string()))?;
        fs::write(&path, json)?;
        debug!("Saved progress report to {:?}", path);
        Ok(())
    }

    pub fn load(path: &Path) -> CoreResult<Self> {
        let content = fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| CoreError::Serialization(e.to_string()))
    }
}
