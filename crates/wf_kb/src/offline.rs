//! Store used when the knowledge base cannot be opened.
//!
//! Every call reports [`KbError::Unavailable`], so callers take their
//! "no knowledge base" path and the pipeline keeps running without caching.

use crate::error::{KbError, KbResult};
use crate::models::{AgentPrompt, Incident, NewIncident, Patch, SaveOutcome, SessionRecord, SessionStatus};
use crate::store::{IncidentStore, PromptStore, SessionLedger};

/// Knowledge base stand-in that is always unavailable.
#[derive(Debug, Clone)]
pub struct OfflineStore {
    reason: String,
}

impl OfflineStore {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    fn unavailable<T>(&self) -> KbResult<T> {
        Err(KbError::Unavailable(self.reason.clone()))
    }
}

impl IncidentStore for OfflineStore {
    fn find_known_solution(&self, _signature: &str) -> KbResult<Option<Patch>> {
        self.unavailable()
    }

    fn find_similar_incidents(&self, _signature: &str, _limit: usize) -> KbResult<Vec<Incident>> {
        self.unavailable()
    }

    fn save_incident(&self, _incident: &NewIncident) -> KbResult<SaveOutcome> {
        self.unavailable()
    }

    fn reinforce(&self, _signature: &str, _delta: f64) -> KbResult<Option<f64>> {
        self.unavailable()
    }

    fn penalize(&self, _signature: &str, _delta: f64, _floor: f64) -> KbResult<Option<f64>> {
        self.unavailable()
    }

    fn failed_solutions(&self, _signature: &str, _limit: usize) -> KbResult<Vec<Patch>> {
        self.unavailable()
    }

    fn get_incident(&self, _signature: &str) -> KbResult<Option<Incident>> {
        self.unavailable()
    }
}

impl SessionLedger for OfflineStore {
    fn begin(&self, _spec: &serde_json::Value) -> KbResult<String> {
        self.unavailable()
    }

    fn complete(
        &self,
        _session_id: &str,
        _status: SessionStatus,
        _output_location: Option<&str>,
    ) -> KbResult<bool> {
        self.unavailable()
    }

    fn get_session(&self, _session_id: &str) -> KbResult<Option<SessionRecord>> {
        self.unavailable()
    }

    fn recent_sessions(&self, _limit: usize) -> KbResult<Vec<SessionRecord>> {
        self.unavailable()
    }
}

impl PromptStore for OfflineStore {
    fn active_prompt(&self, _role: &str) -> KbResult<Option<AgentPrompt>> {
        self.unavailable()
    }

    fn set_prompt(&self, _role: &str, _prompt_text: &str) -> KbResult<AgentPrompt> {
        self.unavailable()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offline_store_is_unavailable() {
        let store = OfflineStore::new("connection refused");
        assert!(matches!(
            store.find_known_solution("build_error:x"),
            Err(KbError::Unavailable(r)) if r == "connection refused"
        ));
        assert!(store.begin(&serde_json::json!({})).is_err());
        assert!(store.active_prompt("debugger").is_err());
    }
}
