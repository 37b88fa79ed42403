//! Reasoning oracle gateway.
//!
//! Typed operations over an [`LlmClient`]. Every operation returns `None`
//! (or an empty list) when the backend fails, times out or answers with
//! something that does not decode to the expected shape.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{debug, warn};
use wf_spec::ProjectPlan;

use crate::client::LlmClient;
use crate::parse::extract_json_object;
use crate::roles::{AgentRole, DirectiveSet};

/// Default bound on one gateway call, on top of the client's own timeout.
const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(300);

const KNOWN_SOLUTION_NOTE: &str = "This solution fixed a failure with the same signature \
    before. Check whether it addresses the root cause of this failure before reusing it; \
    it may have been a symptomatic patch.";

/// A generated or patched file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilePayload {
    pub filename: String,
    pub content: String,
}

impl FilePayload {
    /// Both a filename and non-empty content are required.
    fn from_map(map: &Map<String, Value>) -> Option<Self> {
        let filename = map.get("filename")?.as_str()?.trim();
        let content = map.get("content")?.as_str()?;
        if filename.is_empty() || content.trim().is_empty() {
            return None;
        }
        Some(Self {
            filename: filename.to_string(),
            content: content.to_string(),
        })
    }
}

/// Outcome of root-cause diagnosis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnosis {
    pub file_to_fix: String,
    pub root_cause_analysis: String,
    pub fix_suggestion: String,
}

/// A prior solution passed to diagnosis as a reference.
#[derive(Debug, Clone, Serialize)]
pub struct KnownSolutionHint {
    pub note: String,
    pub previous_solution: Value,
}

impl KnownSolutionHint {
    pub fn new(previous_solution: Value) -> Self {
        Self {
            note: KNOWN_SOLUTION_NOTE.to_string(),
            previous_solution,
        }
    }
}

/// Task payload for diagnosis.
#[derive(Debug, Clone, Serialize)]
pub struct DiagnosisRequest {
    pub error_log: String,
    pub error_type: String,
    /// Relevant files, path to content
    pub codebase: BTreeMap<String, String>,
    pub similar_past_incidents: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub known_solution_suggestion: Option<KnownSolutionHint>,
    /// Solutions that regressed before; not to be repeated
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failed_solutions: Vec<Value>,
}

/// Task payload for a patch.
#[derive(Debug, Clone, Serialize)]
pub struct PatchRequest {
    pub task: &'static str,
    pub file_to_fix: String,
    pub code_to_fix: String,
    pub root_cause_analysis: String,
    pub fix_instructions: String,
    pub context: String,
}

impl PatchRequest {
    pub fn new(
        file_to_fix: impl Into<String>,
        code_to_fix: impl Into<String>,
        diagnosis: &Diagnosis,
        error_type: &str,
        attempt: u32,
    ) -> Self {
        Self {
            task: "fix_root_cause",
            file_to_fix: file_to_fix.into(),
            code_to_fix: code_to_fix.into(),
            root_cause_analysis: diagnosis.root_cause_analysis.clone(),
            fix_instructions: diagnosis.fix_suggestion.clone(),
            context: format!(
                "Attempt {} to fix a {} failure. Fix the root cause; do not suppress the symptom.",
                attempt, error_type
            ),
        }
    }
}

/// Backend architecture produced by the architect role.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BackendDesign {
    #[serde(default)]
    pub api_endpoints: Vec<Value>,
    #[serde(default)]
    pub models: Vec<Value>,
    #[serde(default)]
    pub architecture_notes: String,
}

impl BackendDesign {
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Integrator decision for one component.
#[derive(Debug, Clone, PartialEq)]
pub enum IntegrationUpdate {
    Unchanged,
    Rewrite(FilePayload),
}

/// Typed oracle operations.
#[derive(Clone)]
pub struct ReasoningGateway {
    client: Arc<dyn LlmClient>,
    directives: DirectiveSet,
    call_timeout: Duration,
}

impl ReasoningGateway {
    pub fn new(client: Arc<dyn LlmClient>, directives: DirectiveSet) -> Self {
        Self {
            client,
            directives,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub fn client(&self) -> &Arc<dyn LlmClient> {
        &self.client
    }

    /// One call in a role. `None` on any failure.
    async fn ask(&self, role: AgentRole, task: &Value) -> Option<Map<String, Value>> {
        let directive = self.directives.directive(role);
        let call = self.client.execute(&directive, task);
        let reply = match tokio::time::timeout(self.call_timeout, call).await {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => {
                warn!(role = %role, "Oracle call failed: {}", e);
                return None;
            }
            Err(_) => {
                warn!(
                    role = %role,
                    timeout_secs = self.call_timeout.as_secs(),
                    "Oracle call timed out"
                );
                return None;
            }
        };

        let parsed = extract_json_object(&reply);
        if parsed.is_none() {
            let preview: String = reply.chars().take(200).collect();
            warn!(role = %role, "Oracle returned invalid JSON: {}", preview);
        }
        parsed
    }

    async fn ask_as<T: DeserializeOwned>(&self, role: AgentRole, task: &Value) -> Option<T> {
        let map = self.ask(role, task).await?;
        match serde_json::from_value(Value::Object(map)) {
            Ok(v) => Some(v),
            Err(e) => {
                warn!(role = %role, "Oracle response has the wrong shape: {}", e);
                None
            }
        }
    }

    async fn ask_file(&self, role: AgentRole, task: &Value) -> Option<FilePayload> {
        let map = self.ask(role, task).await?;
        let file = FilePayload::from_map(&map);
        if file.is_none() {
            warn!(role = %role, "Oracle response lacks filename or content");
        }
        file
    }

    // Fix cycle operations

    /// Files most likely involved in a failure, restricted to `available_files`.
    pub async fn locate_relevant_files(
        &self,
        error_log: &str,
        available_files: &[String],
    ) -> Vec<String> {
        #[derive(Deserialize)]
        struct Reply {
            #[serde(default)]
            relevant_files: Vec<Value>,
        }

        let task = json!({ "error_log": error_log, "available_files": available_files });
        let Some(reply) = self.ask_as::<Reply>(AgentRole::Analyst, &task).await else {
            return Vec::new();
        };

        let mut files: Vec<String> = Vec::new();
        for path in reply.relevant_files.iter().filter_map(Value::as_str) {
            if available_files.iter().any(|f| f == path) && !files.iter().any(|f| f == path) {
                files.push(path.to_string());
            }
        }
        debug!(count = files.len(), "Relevant files located");
        files
    }

    /// Root-cause diagnosis. Requires a non-empty `file_to_fix`.
    pub async fn diagnose(&self, request: &DiagnosisRequest) -> Option<Diagnosis> {
        let task = serde_json::to_value(request).ok()?;
        let map = self.ask(AgentRole::Debugger, &task).await?;

        let file_to_fix = map
            .get("file_to_fix")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|f| !f.is_empty())?;
        let text = |key: &str| {
            map.get(key)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        let root_cause_analysis =
            text("root_cause_analysis").unwrap_or_else(|| "Not provided".to_string());
        let fix_suggestion = text("fix_suggestion").unwrap_or_else(|| root_cause_analysis.clone());

        Some(Diagnosis {
            file_to_fix: file_to_fix.to_string(),
            root_cause_analysis,
            fix_suggestion,
        })
    }

    /// Full replacement content for the file named in the request.
    pub async fn patch(&self, request: &PatchRequest) -> Option<FilePayload> {
        let task = serde_json::to_value(request).ok()?;
        self.ask_file(AgentRole::FrontendDev, &task).await
    }

    // Generation operations

    pub async fn plan(&self, checklist: &Value) -> Option<ProjectPlan> {
        let map = self.ask(AgentRole::Pm, &json!({ "checklist": checklist })).await?;
        ProjectPlan::from_value(&Value::Object(map))
    }

    /// Design spec for a component. Always carries a `props` object.
    pub async fn design_component(
        &self,
        name: &str,
        details: &Value,
    ) -> Option<Map<String, Value>> {
        let mut spec = self
            .ask(AgentRole::UiDesigner, &json!({ "component": name, "props": details }))
            .await?;
        if !spec.get("props").map_or(false, Value::is_object) {
            spec.insert("props".to_string(), Value::Object(Map::new()));
        }
        Some(spec)
    }

    pub async fn write_copy(&self, design_spec: &Map<String, Value>) -> Option<Map<String, Value>> {
        self.ask(AgentRole::Copywriter, &json!({ "design_spec": design_spec }))
            .await
    }

    pub async fn write_component(&self, design_spec: &Map<String, Value>) -> Option<FilePayload> {
        self.ask_file(AgentRole::FrontendDev, &json!({ "componentSpec": design_spec }))
            .await
    }

    pub async fn write_page(&self, name: &str, details: &Value) -> Option<FilePayload> {
        self.ask_file(
            AgentRole::FrontendDev,
            &json!({ "pageName": name, "componentsToImport": details }),
        )
        .await
    }

    pub async fn design_backend(
        &self,
        checklist: &Value,
        components: &[String],
    ) -> Option<BackendDesign> {
        self.ask_as(
            AgentRole::BackendArchitect,
            &json!({ "checklist": checklist, "components": components }),
        )
        .await
    }

    pub async fn write_server(&self, design: &BackendDesign) -> Option<FilePayload> {
        self.ask_file(
            AgentRole::BackendDev,
            &json!({ "task": "generate_server", "api_spec": design }),
        )
        .await
    }

    pub async fn write_route(&self, endpoint: &Value) -> Option<FilePayload> {
        self.ask_file(
            AgentRole::BackendDev,
            &json!({ "task": "generate_route", "endpoint": endpoint }),
        )
        .await
    }

    pub async fn write_model(&self, model: &Value) -> Option<FilePayload> {
        self.ask_file(
            AgentRole::BackendDev,
            &json!({ "task": "generate_model", "model": model }),
        )
        .await
    }

    pub async fn write_api_tests(&self, design: &BackendDesign) -> Option<FilePayload> {
        self.ask_file(AgentRole::ApiTester, &json!({ "api_spec": design }))
            .await
    }

    pub async fn write_api_client(&self, design: &BackendDesign) -> Option<FilePayload> {
        self.ask_file(
            AgentRole::Integrator,
            &json!({ "task": "generate_api_client", "api_spec": design }),
        )
        .await
    }

    pub async fn integrate_component(
        &self,
        name: &str,
        code: &str,
        design: &BackendDesign,
    ) -> Option<IntegrationUpdate> {
        let map = self
            .ask(
                AgentRole::Integrator,
                &json!({
                    "task": "integrate_component",
                    "component_name": name,
                    "component_code": code,
                    "api_spec": design,
                }),
            )
            .await?;

        if !map.get("needs_update").and_then(Value::as_bool).unwrap_or(false) {
            return Some(IntegrationUpdate::Unchanged);
        }
        FilePayload::from_map(&map).map(IntegrationUpdate::Rewrite)
    }

    pub async fn write_e2e_tests(&self, checklist: &Value) -> Option<FilePayload> {
        self.ask_file(AgentRole::E2eTester, &json!({ "checklist": checklist }))
            .await
    }
}
