//! State carried through the phases of one generation run.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use wf_oracle::BackendDesign;
use wf_spec::{Checklist, ProjectPlan, Task, TaskKind};

/// A file produced for a named task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedFile {
    pub name: String,
    pub path: String,
}

impl GeneratedFile {
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }
}

/// Counts reported on success.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationCounts {
    pub components: usize,
    pub pages: usize,
    pub backend_files: usize,
    pub test_files: usize,
    pub integrated_components: usize,
}

/// Mutable run state. Owned by the orchestrator, lent to one phase at a time.
#[derive(Debug, Clone)]
pub struct PipelineContext {
    pub session_id: String,
    pub output_dir: PathBuf,
    pub checklist: Checklist,
    /// Checklist as sent to the oracle
    pub checklist_value: Value,
    pub plan: ProjectPlan,
    pub components: Vec<GeneratedFile>,
    pub pages: Vec<GeneratedFile>,
    pub backend: Option<BackendDesign>,
    pub backend_files: Vec<GeneratedFile>,
    pub test_files: Vec<GeneratedFile>,
    pub api_client: Option<GeneratedFile>,
    /// Integration units derived from the generated components
    pub integration_tasks: Vec<Task>,
    pub integrated_components: usize,
}

impl PipelineContext {
    pub fn new(
        session_id: impl Into<String>,
        output_dir: impl Into<PathBuf>,
        checklist: Checklist,
    ) -> Self {
        let checklist_value = checklist.to_value();
        Self {
            session_id: session_id.into(),
            output_dir: output_dir.into(),
            checklist,
            checklist_value,
            plan: ProjectPlan::default(),
            components: Vec::new(),
            pages: Vec::new(),
            backend: None,
            backend_files: Vec::new(),
            test_files: Vec::new(),
            api_client: None,
            integration_tasks: Vec::new(),
            integrated_components: 0,
        }
    }

    pub fn with_plan(mut self, plan: ProjectPlan) -> Self {
        self.plan = plan;
        self
    }

    /// Planned tasks of one kind, in plan order.
    pub fn tasks(&self, kind: TaskKind) -> Vec<Task> {
        self.plan.of_kind(kind)
    }

    pub fn component_names(&self) -> Vec<String> {
        self.components.iter().map(|c| c.name.clone()).collect()
    }

    pub fn counts(&self) -> GenerationCounts {
        GenerationCounts {
            components: self.components.len(),
            pages: self.pages.len(),
            backend_files: self.backend_files.len(),
            test_files: self.test_files.len(),
            integrated_components: self.integrated_components,
        }
    }
}
