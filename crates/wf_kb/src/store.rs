//! Storage traits used by the pipeline.
//!
//! The fix cycle and the orchestrator only see these traits, so the SQLite
//! store, the offline store and test doubles are interchangeable.

use crate::error::KbResult;
use crate::models::{AgentPrompt, Incident, NewIncident, Patch, SaveOutcome, SessionRecord, SessionStatus};

/// Incident knowledge base.
pub trait IncidentStore: Send + Sync {
    /// Highest-confidence patch stored for exactly this signature.
    fn find_known_solution(&self, signature: &str) -> KbResult<Option<Patch>>;

    /// Incidents whose signature contains the distinguishing suffix of
    /// `signature`, highest confidence first, at most `limit`.
    fn find_similar_incidents(&self, signature: &str, limit: usize) -> KbResult<Vec<Incident>>;

    /// Insert a new incident at the initial confidence, or reinforce the
    /// existing one with the same signature.
    fn save_incident(&self, incident: &NewIncident) -> KbResult<SaveOutcome>;

    /// Raise the confidence of a signature. Returns the new confidence, or
    /// `None` when the signature is unknown.
    fn reinforce(&self, signature: &str, delta: f64) -> KbResult<Option<f64>>;

    /// Lower the confidence of a signature, never below `floor`.
    fn penalize(&self, signature: &str, delta: f64, floor: f64) -> KbResult<Option<f64>>;

    /// Patches for a signature whose confidence fell below the initial
    /// value, most recently updated first.
    fn failed_solutions(&self, signature: &str, limit: usize) -> KbResult<Vec<Patch>>;

    /// Full incident record for a signature.
    fn get_incident(&self, signature: &str) -> KbResult<Option<Incident>>;
}

/// Session ledger. Only the orchestrator writes to it.
pub trait SessionLedger: Send + Sync {
    /// Record a new in-progress session and return its id.
    fn begin(&self, spec: &serde_json::Value) -> KbResult<String>;

    /// Move a session to a terminal status.
    ///
    /// Returns `false` when the session already reached a terminal status;
    /// terminal statuses are never overwritten.
    fn complete(
        &self,
        session_id: &str,
        status: SessionStatus,
        output_location: Option<&str>,
    ) -> KbResult<bool>;

    fn get_session(&self, session_id: &str) -> KbResult<Option<SessionRecord>>;

    /// Most recent sessions first.
    fn recent_sessions(&self, limit: usize) -> KbResult<Vec<SessionRecord>>;
}

/// Prompt overrides per agent role.
pub trait PromptStore: Send + Sync {
    /// The active prompt for a role, highest version first.
    fn active_prompt(&self, role: &str) -> KbResult<Option<AgentPrompt>>;

    /// Store a new prompt version for a role and make it the active one.
    fn set_prompt(&self, role: &str, prompt_text: &str) -> KbResult<AgentPrompt>;
}
