//! Fix-cycle controller.
//!
//! One diagnose/patch pass for one failure. The controller never retries;
//! the caller owns the attempt budget and re-runs the gate afterwards.
//!
//! Known and similar solutions from the knowledge base are only handed to
//! diagnosis as references. A patch is written only after the diagnosed
//! file resolves to exactly one file in the current snapshot.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{debug, info, warn};
use wf_kb::{IncidentStore, NewIncident, Patch, SaveOutcome};
use wf_oracle::{DiagnosisRequest, KnownSolutionHint, PatchRequest, ReasoningGateway};

use crate::artifact::ArtifactStore;
use crate::error::CoreResult;
use crate::resolver::resolve_target;

/// Agent recorded on incidents produced by the fix cycle.
pub const DEFAULT_FIX_AGENT: &str = "AI_RootCauseAnalysis";

/// Regressed solutions passed to diagnosis.
const FAILED_SOLUTION_LIMIT: usize = 3;

/// One failure to repair.
#[derive(Debug, Clone)]
pub struct FixRequest<'a> {
    pub log: &'a str,
    /// Error kind, e.g. `frontend_build`
    pub error_kind: &'a str,
    /// Attempt number within the caller's budget, from 1
    pub attempt: u32,
    pub agent: &'a str,
}

impl<'a> FixRequest<'a> {
    pub fn new(log: &'a str, error_kind: &'a str, attempt: u32) -> Self {
        Self {
            log,
            error_kind,
            attempt,
            agent: DEFAULT_FIX_AGENT,
        }
    }
}

/// Why a cycle ended without touching the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotApplied {
    NoDiagnosis,
    UnresolvedTarget(String),
    NoPatch,
    /// The patch response named a different file than the resolved target
    PatchTargetMismatch { expected: String, got: String },
}

impl std::fmt::Display for NotApplied {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoDiagnosis => write!(f, "no usable diagnosis"),
            Self::UnresolvedTarget(file) => write!(f, "could not resolve '{}'", file),
            Self::NoPatch => write!(f, "no usable patch"),
            Self::PatchTargetMismatch { expected, got } => {
                write!(f, "patch targets '{}' instead of '{}'", got, expected)
            }
        }
    }
}

/// Result of one cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum FixOutcome {
    Applied {
        /// `None` when the log had no recognizable error
        signature: Option<String>,
        file: String,
        /// A stored solution existed for this signature
        had_known_solution: bool,
    },
    NotApplied(NotApplied),
}

impl FixOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }
}

#[derive(Default)]
struct Precedent {
    known: Option<Patch>,
    similar: Vec<Value>,
    failed: Vec<Value>,
}

/// Runs fix cycles against one project tree.
#[derive(Clone)]
pub struct FixCycleController {
    gateway: ReasoningGateway,
    store: Arc<dyn IncidentStore>,
    artifacts: Arc<dyn ArtifactStore>,
    similar_limit: usize,
}

impl FixCycleController {
    pub fn new(
        gateway: ReasoningGateway,
        store: Arc<dyn IncidentStore>,
        artifacts: Arc<dyn ArtifactStore>,
    ) -> Self {
        Self {
            gateway,
            store,
            artifacts,
            similar_limit: 3,
        }
    }

    pub fn with_similar_limit(mut self, limit: usize) -> Self {
        self.similar_limit = limit;
        self
    }

    /// Run one cycle. Only artifact I/O faults are returned as errors.
    pub async fn run(&self, request: &FixRequest<'_>) -> CoreResult<FixOutcome> {
        let signature = wf_kb::signature(request.log);
        match &signature {
            Some(sig) => info!(signature = %sig, attempt = request.attempt, "Starting fix cycle"),
            None => info!(
                attempt = request.attempt,
                "Starting fix cycle without a recognizable error signature"
            ),
        }

        let snapshot = self.artifacts.snapshot()?;
        let available: Vec<String> = snapshot.keys().cloned().collect();

        let relevant = self
            .gateway
            .locate_relevant_files(request.log, &available)
            .await;
        let codebase: BTreeMap<String, String> = if relevant.is_empty() {
            debug!("No relevant files located, using the full snapshot");
            snapshot.clone()
        } else {
            relevant
                .iter()
                .filter_map(|path| snapshot.get(path).map(|c| (path.clone(), c.clone())))
                .collect()
        };

        let precedent = match &signature {
            Some(sig) => self.precedent(sig),
            None => Precedent::default(),
        };
        let had_known_solution = precedent.known.is_some();

        let diagnosis_request = DiagnosisRequest {
            error_log: request.log.to_string(),
            error_type: request.error_kind.to_string(),
            codebase,
            similar_past_incidents: precedent.similar,
            known_solution_suggestion: precedent
                .known
                .map(|patch| KnownSolutionHint::new(json!(patch))),
            failed_solutions: precedent.failed,
        };

        let Some(diagnosis) = self.gateway.diagnose(&diagnosis_request).await else {
            warn!("Fix cycle aborted: no usable diagnosis");
            return Ok(FixOutcome::NotApplied(NotApplied::NoDiagnosis));
        };

        let Some(target) = resolve_target(&diagnosis.file_to_fix, &available) else {
            warn!(file = %diagnosis.file_to_fix, "Fix cycle aborted: diagnosed file not found");
            return Ok(FixOutcome::NotApplied(NotApplied::UnresolvedTarget(
                diagnosis.file_to_fix,
            )));
        };
        info!(file = %target, "Root cause: {}", diagnosis.root_cause_analysis);

        let current = snapshot.get(&target).cloned().unwrap_or_default();
        let patch_request = PatchRequest::new(
            &target,
            current,
            &diagnosis,
            request.error_kind,
            request.attempt,
        );
        let Some(patch) = self.gateway.patch(&patch_request).await else {
            warn!(file = %target, "Fix cycle aborted: no usable patch");
            return Ok(FixOutcome::NotApplied(NotApplied::NoPatch));
        };

        if resolve_target(&patch.filename, std::slice::from_ref(&target)).is_none() {
            warn!(expected = %target, got = %patch.filename, "Fix cycle aborted: patch names another file");
            return Ok(FixOutcome::NotApplied(NotApplied::PatchTargetMismatch {
                expected: target,
                got: patch.filename,
            }));
        }

        self.artifacts.write(&target, &patch.content)?;
        info!(file = %target, "Patch applied");

        if let Some(sig) = &signature {
            let incident = NewIncident {
                signature: sig.clone(),
                raw_log: request.log.to_string(),
                fix_context: json!({
                    "error_type": request.error_kind,
                    "root_cause_analysis": diagnosis.root_cause_analysis,
                    "fix_suggestion": diagnosis.fix_suggestion,
                    "relevant_files": relevant,
                }),
                patch: Patch::new(&target, &patch.content),
                agent: request.agent.to_string(),
                attempts: request.attempt,
            };
            match self.store.save_incident(&incident) {
                Ok(SaveOutcome::Inserted) => debug!(signature = %sig, "Incident recorded"),
                Ok(SaveOutcome::Reinforced { confidence }) => {
                    debug!(signature = %sig, confidence, "Incident reinforced")
                }
                Err(e) => warn!(signature = %sig, "Could not record incident: {}", e),
            }
        }

        Ok(FixOutcome::Applied {
            signature,
            file: target,
            had_known_solution,
        })
    }

    /// Prior solutions for a signature. Store failures are logged and
    /// treated as "nothing known".
    fn precedent(&self, signature: &str) -> Precedent {
        let known = self.store.find_known_solution(signature).unwrap_or_else(|e| {
            warn!("Knowledge base lookup failed, continuing without it: {}", e);
            None
        });
        if known.is_some() {
            info!(signature, "Known solution found, passing it to diagnosis as a reference");
        }

        let similar = self
            .store
            .find_similar_incidents(signature, self.similar_limit)
            .unwrap_or_else(|e| {
                warn!("Similar incident lookup failed: {}", e);
                Vec::new()
            })
            .into_iter()
            .map(|incident| {
                json!({
                    "signature": incident.signature,
                    "patch": incident.patch,
                    "confidence": incident.confidence,
                })
            })
            .collect();

        let failed = self
            .store
            .failed_solutions(signature, FAILED_SOLUTION_LIMIT)
            .unwrap_or_else(|e| {
                warn!("Failed solution lookup failed: {}", e);
                Vec::new()
            })
            .into_iter()
            .map(|patch| json!(patch))
            .collect();

        Precedent {
            known,
            similar,
            failed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::FsArtifactStore;
    use mockall::mock;
    use tempfile::TempDir;
    use wf_kb::{Incident, KbError, KbResult};
    use wf_oracle::{AgentRole, DirectiveSet, ScriptedClient};

    mock! {
        pub Store {}
        impl IncidentStore for Store {
            fn find_known_solution(&self, signature: &str) -> KbResult<Option<Patch>>;
            fn find_similar_incidents(&self, signature: &str, limit: usize) -> KbResult<Vec<Incident>>;
            fn save_incident(&self, incident: &NewIncident) -> KbResult<SaveOutcome>;
            fn reinforce(&self, signature: &str, delta: f64) -> KbResult<Option<f64>>;
            fn penalize(&self, signature: &str, delta: f64, floor: f64) -> KbResult<Option<f64>>;
            fn failed_solutions(&self, signature: &str, limit: usize) -> KbResult<Vec<Patch>>;
            fn get_incident(&self, signature: &str) -> KbResult<Option<Incident>>;
        }
    }

    const LOG: &str = "Error: Module not found: Can't resolve './Hero'\n    at build";

    fn tree() -> (TempDir, Arc<FsArtifactStore>) {
        let dir = TempDir::new().unwrap();
        let store = FsArtifactStore::new(dir.path());
        store.write("app/page.tsx", "import Hero from './Hero'").unwrap();
        store.write("app/components/Hero.tsx", "export default 1").unwrap();
        (dir, Arc::new(store))
    }

    fn unavailable_store() -> MockStore {
        let mut store = MockStore::new();
        store
            .expect_find_known_solution()
            .returning(|_| Err(KbError::Unavailable("down".to_string())));
        store
            .expect_find_similar_incidents()
            .returning(|_, _| Err(KbError::Unavailable("down".to_string())));
        store
            .expect_failed_solutions()
            .returning(|_, _| Err(KbError::Unavailable("down".to_string())));
        store
            .expect_save_incident()
            .returning(|_| Err(KbError::Unavailable("down".to_string())));
        store
    }

    fn controller(
        client: ScriptedClient,
        store: MockStore,
        artifacts: Arc<FsArtifactStore>,
    ) -> FixCycleController {
        let gateway = ReasoningGateway::new(Arc::new(client), DirectiveSet::builtin());
        FixCycleController::new(gateway, Arc::new(store), artifacts)
    }

    #[tokio::test]
    async fn test_applies_patch_to_resolved_file() {
        let (_dir, artifacts) = tree();
        let client = ScriptedClient::new()
            .reply(AgentRole::Analyst, json!({ "relevant_files": ["app/page.tsx"] }))
            .reply(
                AgentRole::Debugger,
                json!({
                    "file_to_fix": "page.tsx",
                    "root_cause_analysis": "wrong import path",
                    "fix_suggestion": "import from ./components/Hero",
                }),
            )
            .reply(
                AgentRole::FrontendDev,
                json!({ "filename": "app/page.tsx", "content": "import Hero from './components/Hero'" }),
            );

        let mut store = MockStore::new();
        store.expect_find_known_solution().returning(|_| Ok(None));
        store.expect_find_similar_incidents().returning(|_, _| Ok(Vec::new()));
        store.expect_failed_solutions().returning(|_, _| Ok(Vec::new()));
        store
            .expect_save_incident()
            .withf(|incident| {
                incident.signature == "build_error:Module not found: Can't resolve './Hero'"
                    && incident.patch.file_path == "app/page.tsx"
                    && incident.agent == DEFAULT_FIX_AGENT
                    && incident.attempts == 2
            })
            .times(1)
            .returning(|_| Ok(SaveOutcome::Inserted));

        let fixer = controller(client.clone(), store, artifacts.clone());
        let outcome = fixer
            .run(&FixRequest::new(LOG, "frontend_build", 2))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            FixOutcome::Applied {
                signature: Some("build_error:Module not found: Can't resolve './Hero'".to_string()),
                file: "app/page.tsx".to_string(),
                had_known_solution: false,
            }
        );
        assert_eq!(
            artifacts.read("app/page.tsx").unwrap().as_deref(),
            Some("import Hero from './components/Hero'")
        );

        // Diagnosis only saw the located file.
        let diagnosis = &client.calls_for(AgentRole::Debugger)[0].task;
        assert!(diagnosis["codebase"].get("app/page.tsx").is_some());
        assert!(diagnosis["codebase"].get("app/components/Hero.tsx").is_none());
        assert!(diagnosis.get("known_solution_suggestion").is_none());
    }

    #[tokio::test]
    async fn test_known_solution_is_only_a_reference() {
        let (_dir, artifacts) = tree();
        let client = ScriptedClient::new()
            .reply(AgentRole::Analyst, json!({ "relevant_files": [] }))
            .reply(AgentRole::Debugger, json!({ "file_to_fix": "" }));

        let mut store = MockStore::new();
        store
            .expect_find_known_solution()
            .returning(|_| Ok(Some(Patch::new("app/page.tsx", "stale fix"))));
        store.expect_find_similar_incidents().returning(|_, _| Ok(Vec::new()));
        store.expect_failed_solutions().returning(|_, _| Ok(Vec::new()));
        store.expect_save_incident().times(0);

        let fixer = controller(client.clone(), store, artifacts.clone());
        let outcome = fixer
            .run(&FixRequest::new(LOG, "frontend_build", 1))
            .await
            .unwrap();

        assert_eq!(outcome, FixOutcome::NotApplied(NotApplied::NoDiagnosis));
        assert_eq!(
            artifacts.read("app/page.tsx").unwrap().as_deref(),
            Some("import Hero from './Hero'")
        );

        let diagnosis = &client.calls_for(AgentRole::Debugger)[0].task;
        assert_eq!(
            diagnosis["known_solution_suggestion"]["previous_solution"]["content"],
            "stale fix"
        );
        // Nothing located: the whole snapshot is passed on.
        assert_eq!(diagnosis["codebase"].as_object().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_unresolved_target_leaves_tree_untouched() {
        let (_dir, artifacts) = tree();
        artifacts.write("src/page.tsx", "other").unwrap();
        let before = artifacts.snapshot().unwrap();

        let client = ScriptedClient::new()
            .reply(AgentRole::Analyst, json!({ "relevant_files": [] }))
            .reply(AgentRole::Debugger, json!({ "file_to_fix": "page.tsx" }));

        let fixer = controller(client.clone(), unavailable_store(), artifacts.clone());
        let outcome = fixer
            .run(&FixRequest::new(LOG, "frontend_build", 1))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            FixOutcome::NotApplied(NotApplied::UnresolvedTarget("page.tsx".to_string()))
        );
        assert_eq!(artifacts.snapshot().unwrap(), before);
        assert_eq!(client.call_count(AgentRole::FrontendDev), 0);
    }

    #[tokio::test]
    async fn test_patch_for_another_file_is_rejected() {
        let (_dir, artifacts) = tree();
        let client = ScriptedClient::new()
            .reply(AgentRole::Analyst, json!({ "relevant_files": [] }))
            .reply(AgentRole::Debugger, json!({ "file_to_fix": "app/page.tsx" }))
            .reply(
                AgentRole::FrontendDev,
                json!({ "filename": "app/components/Hero.tsx", "content": "changed" }),
            );

        let fixer = controller(client, unavailable_store(), artifacts.clone());
        let outcome = fixer
            .run(&FixRequest::new(LOG, "frontend_build", 1))
            .await
            .unwrap();

        assert!(matches!(
            outcome,
            FixOutcome::NotApplied(NotApplied::PatchTargetMismatch { .. })
        ));
        assert_eq!(
            artifacts.read("app/components/Hero.tsx").unwrap().as_deref(),
            Some("export default 1")
        );
    }

    #[tokio::test]
    async fn test_unavailable_store_is_bypassed() {
        let (_dir, artifacts) = tree();
        let client = ScriptedClient::new()
            .reply(AgentRole::Analyst, json!({ "relevant_files": ["app/page.tsx"] }))
            .reply(AgentRole::Debugger, json!({ "file_to_fix": "app/page.tsx" }))
            .reply(
                AgentRole::FrontendDev,
                json!({ "filename": "app/page.tsx", "content": "fixed" }),
            );

        let fixer = controller(client, unavailable_store(), artifacts.clone());
        let outcome = fixer
            .run(&FixRequest::new(LOG, "frontend_build", 1))
            .await
            .unwrap();

        assert!(outcome.is_applied());
        assert_eq!(artifacts.read("app/page.tsx").unwrap().as_deref(), Some("fixed"));
    }

    #[tokio::test]
    async fn test_unrecognized_log_skips_knowledge_base() {
        let (_dir, artifacts) = tree();
        let client = ScriptedClient::new()
            .reply(AgentRole::Analyst, json!({ "relevant_files": [] }))
            .reply(AgentRole::Debugger, json!({ "file_to_fix": "app/page.tsx" }))
            .reply(
                AgentRole::FrontendDev,
                json!({ "filename": "app/page.tsx", "content": "fixed" }),
            );

        let mut store = MockStore::new();
        store.expect_find_known_solution().times(0);
        store.expect_save_incident().times(0);

        let fixer = controller(client, store, artifacts);
        let outcome = fixer
            .run(&FixRequest::new("something went sideways", "frontend_build", 1))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            FixOutcome::Applied {
                signature: None,
                file: "app/page.tsx".to_string(),
                had_known_solution: false,
            }
        );
    }
}
