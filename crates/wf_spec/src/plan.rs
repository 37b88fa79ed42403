//! Generation plan: the tasks a run works through.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Kind of generation work a task represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    Component,
    Page,
    BackendEndpoint,
    BackendModel,
    IntegrationUnit,
}

impl TaskKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Component => "component",
            Self::Page => "page",
            Self::BackendEndpoint => "backend_endpoint",
            Self::BackendModel => "backend_model",
            Self::IntegrationUnit => "integration_unit",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "component" => Some(Self::Component),
            "page" => Some(Self::Page),
            "backend_endpoint" | "endpoint" => Some(Self::BackendEndpoint),
            "backend_model" | "model" => Some(Self::BackendModel),
            "integration_unit" | "integration" => Some(Self::IntegrationUnit),
            _ => None,
        }
    }
}

impl std::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A unit of generation work. Immutable once planned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub kind: TaskKind,
    pub name: String,
    /// Kind-specific payload handed to the generating role.
    pub details: serde_json::Value,
}

impl Task {
    pub fn new(kind: TaskKind, name: impl Into<String>, details: serde_json::Value) -> Self {
        Self {
            kind,
            name: name.into(),
            details,
        }
    }

    /// A backend endpoint task from an API design entry (`method`, `path`, ...).
    pub fn backend_endpoint(endpoint: serde_json::Value) -> Self {
        let method = endpoint.get("method").and_then(|v| v.as_str()).unwrap_or("GET");
        let path = endpoint.get("path").and_then(|v| v.as_str()).unwrap_or("/");
        let name = format!("{} {}", method.to_uppercase(), path);
        Self::new(TaskKind::BackendEndpoint, name, endpoint)
    }

    /// A backend model task from an API design entry (`name`, `schema`).
    pub fn backend_model(model: serde_json::Value) -> Self {
        let name = model
            .get("name")
            .and_then(|v| v.as_str())
            .unwrap_or("Model")
            .to_string();
        Self::new(TaskKind::BackendModel, name, model)
    }
}

/// Task entry as produced by the planning role.
#[derive(Debug, Deserialize)]
struct RawTask {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    details: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct RawPlan {
    tasks: Vec<RawTask>,
}

/// Ordered list of planned tasks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectPlan {
    pub tasks: Vec<Task>,
}

impl ProjectPlan {
    pub fn new(tasks: Vec<Task>) -> Self {
        Self { tasks }
    }

    /// Build a plan from a planning response object (`{"tasks": [...]}`).
    ///
    /// Entries with an unknown `type` or without a name are dropped. Returns
    /// `None` when the value has no `tasks` array.
    pub fn from_value(value: &serde_json::Value) -> Option<Self> {
        let raw: RawPlan = serde_json::from_value(value.clone()).ok()?;
        let tasks = raw
            .tasks
            .into_iter()
            .filter_map(|t| {
                let kind = match TaskKind::from_str(&t.kind) {
                    Some(kind) => kind,
                    None => {
                        debug!("Ignoring planned task with unknown type '{}'", t.kind);
                        return None;
                    }
                };
                let name = t.name.filter(|n| !n.trim().is_empty())?;
                Some(Task::new(kind, name, t.details))
            })
            .collect();
        Some(Self { tasks })
    }

    /// Tasks of one kind, in plan order.
    pub fn of_kind(&self, kind: TaskKind) -> Vec<Task> {
        self.tasks.iter().filter(|t| t.kind == kind).cloned().collect()
    }

    pub fn count(&self, kind: TaskKind) -> usize {
        self.tasks.iter().filter(|t| t.kind == kind).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plan_from_value_filters_unknown_kinds() {
        let value = json!({
            "tasks": [
                { "type": "component", "name": "Header", "details": { "links": 3 } },
                { "type": "page", "name": "Home", "details": ["Header"] },
                { "type": "deploy", "name": "Ship it" },
                { "type": "component" }
            ]
        });

        let plan = ProjectPlan::from_value(&value).unwrap();
        assert_eq!(plan.tasks.len(), 2);
        assert_eq!(plan.count(TaskKind::Component), 1);
        assert_eq!(plan.of_kind(TaskKind::Page)[0].name, "Home");
    }

    #[test]
    fn test_plan_requires_tasks_array() {
        assert!(ProjectPlan::from_value(&json!({ "steps": [] })).is_none());
    }

    #[test]
    fn test_backend_endpoint_name() {
        let task = Task::backend_endpoint(json!({ "method": "post", "path": "/api/contact" }));
        assert_eq!(task.kind, TaskKind::BackendEndpoint);
        assert_eq!(task.name, "POST /api/contact");
    }

    #[test]
    fn test_task_kind_round_trip_names() {
        assert_eq!(TaskKind::from_str("Integration"), Some(TaskKind::IntegrationUnit));
        assert_eq!(TaskKind::BackendModel.as_str(), "backend_model");
    }
}
