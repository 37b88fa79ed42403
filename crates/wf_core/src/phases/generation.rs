//! Generation phases: components, pages, backend, integration.
//!
//! Every generation task gets `budgets.task_attempts` tries. A task that
//! never yields a usable answer ends the run.

use std::future::Future;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use wf_oracle::{FilePayload, IntegrationUpdate};
use wf_spec::{Task, TaskKind};

use crate::context::{GeneratedFile, PipelineContext};
use crate::error::{CoreError, CoreResult};
use crate::phase::{Phase, PhaseEnv, PhaseReport};

/// Retry `produce` within the task budget until it yields a value.
pub async fn attempt_task<T, F, Fut>(
    env: &PhaseEnv,
    phase: &str,
    what: &str,
    mut produce: F,
) -> CoreResult<(T, u32)>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Option<T>>,
{
    let budget = env.budgets.task_attempts;
    for attempt in 1..=budget {
        if let Some(value) = produce().await {
            return Ok((value, attempt));
        }
        warn!(phase, attempt, budget, "{}: no usable result", what);
    }
    Err(exhausted(phase, what, budget))
}

/// Like [`attempt_task`] for a generated file, which is also written. A file
/// with an unsafe path counts as a failed attempt.
pub async fn generate_file<F, Fut>(
    env: &PhaseEnv,
    phase: &str,
    what: &str,
    mut produce: F,
) -> CoreResult<(FilePayload, u32)>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Option<FilePayload>>,
{
    let budget = env.budgets.task_attempts;
    for attempt in 1..=budget {
        if let Some(file) = produce().await {
            if env.write_generated(&file)? {
                info!(phase, file = %file.filename, "{} generated", what);
                return Ok((file, attempt));
            }
        }
        warn!(phase, attempt, budget, "{}: no usable file", what);
    }
    Err(exhausted(phase, what, budget))
}

fn exhausted(phase: &str, what: &str, budget: u32) -> CoreError {
    CoreError::BudgetExhausted {
        phase: phase.to_string(),
        attempts: budget,
        last_error: format!("{}: no usable result after {} attempt(s)", what, budget),
    }
}

/// Design, copy and code for one component.
async fn component_attempt(env: &PhaseEnv, task: &Task) -> Option<FilePayload> {
    let mut spec = env
        .gateway
        .design_component(&task.name, &task.details)
        .await?;

    match env.gateway.write_copy(&spec).await {
        Some(copy) => {
            if let Some(Value::Object(props)) = spec.get_mut("props") {
                props.extend(copy);
            }
        }
        None => warn!(component = %task.name, "No copy written, keeping design props"),
    }

    env.gateway.write_component(&spec).await
}

/// Generates every planned component.
pub struct ComponentPhase;

#[async_trait]
impl Phase for ComponentPhase {
    fn name(&self) -> &str {
        "components"
    }

    fn description(&self) -> &str {
        "Designs, writes copy for and codes every planned component"
    }

    async fn run(&self, env: &PhaseEnv, ctx: &mut PipelineContext) -> CoreResult<PhaseReport> {
        let tasks = ctx.tasks(TaskKind::Component);
        if tasks.is_empty() {
            return Err(CoreError::Planning(
                "the plan contains no components".to_string(),
            ));
        }

        let mut attempts = 0;
        for task in &tasks {
            let what = format!("component '{}'", task.name);
            let (file, used) =
                generate_file(env, self.name(), &what, || component_attempt(env, task)).await?;
            attempts += used;
            ctx.components
                .push(GeneratedFile::new(&task.name, file.filename));
        }

        Ok(PhaseReport::new(attempts)
            .with_message(format!("{} component(s) generated", ctx.components.len())))
    }
}

/// Generates every planned page.
pub struct PagePhase;

impl PagePhase {
    /// Components a page imports: the planned details, or the page's
    /// sections in the checklist when the plan has none.
    fn components_to_import(ctx: &PipelineContext, task: &Task) -> Value {
        if !task.details.is_null() {
            return task.details.clone();
        }
        let components: Vec<&str> = ctx
            .checklist
            .pages
            .iter()
            .filter(|p| p.name == task.name)
            .flat_map(|p| p.sections.iter().map(|s| s.component.as_str()))
            .collect();
        json!(components)
    }
}

#[async_trait]
impl Phase for PagePhase {
    fn name(&self) -> &str {
        "pages"
    }

    fn description(&self) -> &str {
        "Codes every planned page from the generated components"
    }

    async fn run(&self, env: &PhaseEnv, ctx: &mut PipelineContext) -> CoreResult<PhaseReport> {
        let tasks = ctx.tasks(TaskKind::Page);
        if tasks.is_empty() {
            warn!("The plan contains no pages");
            return Ok(PhaseReport::new(0).with_message("no pages planned"));
        }

        let mut attempts = 0;
        for task in &tasks {
            let what = format!("page '{}'", task.name);
            let imports = Self::components_to_import(ctx, task);
            let (file, used) = generate_file(env, self.name(), &what, || {
                env.gateway.write_page(&task.name, &imports)
            })
            .await?;
            attempts += used;
            ctx.pages.push(GeneratedFile::new(&task.name, file.filename));
        }

        Ok(PhaseReport::new(attempts)
            .with_message(format!("{} page(s) generated", ctx.pages.len())))
    }
}

/// Designs the backend and writes the server, routes and models.
pub struct BackendPhase;

#[async_trait]
impl Phase for BackendPhase {
    fn name(&self) -> &str {
        "backend"
    }

    fn description(&self) -> &str {
        "Designs the API and generates the server, one route per endpoint and one file per model"
    }

    async fn run(&self, env: &PhaseEnv, ctx: &mut PipelineContext) -> CoreResult<PhaseReport> {
        let checklist = ctx.checklist_value.clone();
        let components = ctx.component_names();
        let (design, mut attempts) = attempt_task(env, self.name(), "backend design", || {
            env.gateway.design_backend(&checklist, &components)
        })
        .await?;
        info!(
            endpoints = design.api_endpoints.len(),
            models = design.models.len(),
            "Backend designed"
        );

        let (server, used) =
            generate_file(env, self.name(), "server entry", || env.gateway.write_server(&design))
                .await?;
        attempts += used;
        ctx.backend_files
            .push(GeneratedFile::new("server", server.filename));

        let endpoints = design.api_endpoints.iter().cloned().map(Task::backend_endpoint);
        let models = design.models.iter().cloned().map(Task::backend_model);
        for task in endpoints.chain(models) {
            let what = format!("{} '{}'", task.kind.as_str(), task.name);
            let (file, used) = match task.kind {
                TaskKind::BackendModel => {
                    generate_file(env, self.name(), &what, || env.gateway.write_model(&task.details))
                        .await?
                }
                _ => {
                    generate_file(env, self.name(), &what, || env.gateway.write_route(&task.details))
                        .await?
                }
            };
            attempts += used;
            ctx.backend_files.push(GeneratedFile::new(&task.name, file.filename));
        }

        ctx.backend = Some(design);
        Ok(PhaseReport::new(attempts)
            .with_message(format!("{} backend file(s) generated", ctx.backend_files.len())))
    }
}

/// Writes the API client and wires components to the backend.
pub struct IntegrationPhase;

#[async_trait]
impl Phase for IntegrationPhase {
    fn name(&self) -> &str {
        "integration"
    }

    fn description(&self) -> &str {
        "Generates the API client and updates components that need backend data"
    }

    async fn run(&self, env: &PhaseEnv, ctx: &mut PipelineContext) -> CoreResult<PhaseReport> {
        let design = ctx.backend.clone().unwrap_or_default();
        let (client, mut attempts) =
            generate_file(env, self.name(), "API client", || env.gateway.write_api_client(&design))
                .await?;
        ctx.api_client = Some(GeneratedFile::new("api_client", client.filename));

        for component in ctx.components.clone() {
            let task = Task::new(
                TaskKind::IntegrationUnit,
                &component.name,
                json!({ "path": component.path }),
            );
            ctx.integration_tasks.push(task.clone());

            let code = env.artifacts.read(&component.path)?.unwrap_or_default();
            let what = format!("integration of '{}'", task.name);
            let (update, used) = attempt_task(env, self.name(), &what, || {
                env.gateway.integrate_component(&task.name, &code, &design)
            })
            .await?;
            attempts += used;

            match update {
                IntegrationUpdate::Unchanged => debug!(component = %task.name, "No integration needed"),
                IntegrationUpdate::Rewrite(file) => {
                    if env.write_generated(&file)? {
                        info!(component = %task.name, file = %file.filename, "Component integrated");
                        ctx.integrated_components += 1;
                    }
                }
            }
        }

        Ok(PhaseReport::new(attempts).with_message(format!(
            "{} of {} component(s) updated",
            ctx.integrated_components,
            ctx.components.len()
        )))
    }
}
