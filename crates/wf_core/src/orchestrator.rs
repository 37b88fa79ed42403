//! Phase orchestrator: one generation session from request to result.
//!
//! Sets up the output directory, asks for a plan, then runs the phases in
//! order. The first phase error ends the session as failed; no partial
//! success is ever reported. Every session that begins reaches a terminal
//! status in the ledger, including when the run future is dropped midway.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use tracing::{error, info, warn};
use uuid::Uuid;
use wf_kb::{IncidentStore, SessionLedger, SessionStatus};
use wf_oracle::ReasoningGateway;
use wf_runner::{CommandRunner, RunConfig};
use wf_spec::{Checklist, GenerateRequest, TaskKind};

use crate::artifact::{ArtifactStore, FsArtifactStore};
use crate::config::FactoryConfig;
use crate::context::{GenerationCounts, PipelineContext};
use crate::error::{CoreError, CoreResult};
use crate::fix_cycle::FixCycleController;
use crate::phase::{Phase, PhaseEnv, PhaseReport};
use crate::phases::default_phases;
use crate::pipeline::{PhaseRecord, ProgressReport};
use crate::workspace::{apply_branding, copy_scaffold, create_output_dir};

const SETUP_PHASE: &str = "setup";
const PLANNING_PHASE: &str = "planning";

/// Result of one session.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum GenerationOutcome {
    Success {
        session_id: String,
        output: PathBuf,
        counts: GenerationCounts,
    },
    Failure {
        session_id: String,
        failed_phase: String,
        last_error: String,
        progress: ProgressReport,
    },
}

impl GenerationOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn session_id(&self) -> &str {
        match self {
            Self::Success { session_id, .. } | Self::Failure { session_id, .. } => session_id,
        }
    }
}

/// Writes the terminal ledger status exactly once. Dropping it without
/// [`SessionGuard::finish`] marks the session failed.
struct SessionGuard {
    ledger: Arc<dyn SessionLedger>,
    session_id: String,
    output: Option<String>,
    finished: bool,
}

impl SessionGuard {
    fn begin(ledger: Arc<dyn SessionLedger>, spec: &serde_json::Value) -> Self {
        let session_id = match ledger.begin(spec) {
            Ok(id) => id,
            Err(e) => {
                let id = Uuid::new_v4().to_string();
                warn!(session_id = %id, "Session ledger unavailable, using a local id: {}", e);
                id
            }
        };
        Self {
            ledger,
            session_id,
            output: None,
            finished: false,
        }
    }

    fn set_output(&mut self, output: &Path) {
        self.output = Some(output.display().to_string());
    }

    fn finish(mut self, status: SessionStatus) {
        self.finished = true;
        self.write(status);
    }

    fn write(&self, status: SessionStatus) {
        match self
            .ledger
            .complete(&self.session_id, status, self.output.as_deref())
        {
            Ok(true) => info!(session_id = %self.session_id, status = %status, "Session completed"),
            Ok(false) => warn!(session_id = %self.session_id, "Session already had a terminal status"),
            Err(e) => warn!(session_id = %self.session_id, "Could not record session status: {}", e),
        }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        if !self.finished {
            warn!(session_id = %self.session_id, "Session ended unexpectedly, marking it failed");
            self.write(SessionStatus::Failed);
        }
    }
}

/// Drives generation sessions.
pub struct Orchestrator {
    config: FactoryConfig,
    gateway: ReasoningGateway,
    runner: Arc<dyn CommandRunner>,
    store: Arc<dyn IncidentStore>,
    ledger: Arc<dyn SessionLedger>,
    phases: Vec<Arc<dyn Phase>>,
}

impl Orchestrator {
    pub fn new(
        config: FactoryConfig,
        gateway: ReasoningGateway,
        runner: Arc<dyn CommandRunner>,
        store: Arc<dyn IncidentStore>,
        ledger: Arc<dyn SessionLedger>,
    ) -> Self {
        let phases = default_phases(&config.toolchain);
        Self {
            config,
            gateway,
            runner,
            store,
            ledger,
            phases,
        }
    }

    /// Replace the phase sequence.
    pub fn with_phases(mut self, phases: Vec<Arc<dyn Phase>>) -> Self {
        self.phases = phases;
        self
    }

    /// All step names in progress-report order, setup and planning included.
    pub fn step_names(&self) -> Vec<String> {
        let mut names = vec![SETUP_PHASE.to_string(), PLANNING_PHASE.to_string()];
        names.extend(self.phases.iter().map(|p| p.name().to_string()));
        names
    }

    /// Run one session.
    pub async fn generate(&self, request: &GenerateRequest) -> GenerationOutcome {
        let spec = json!({ "checklist": request.checklist.to_value() });
        let mut session = SessionGuard::begin(self.ledger.clone(), &spec);
        let session_id = session.session_id.clone();
        info!(session_id = %session_id, pages = request.checklist.pages.len(), "Generation session started");

        let mut progress = ProgressReport::new(&session_id, self.step_names());
        progress.start();
        let mut output_dir: Option<PathBuf> = None;

        let result = self
            .run(request, &session_id, &mut progress, &mut output_dir)
            .await;
        if let Some(dir) = &output_dir {
            session.set_output(dir);
        }

        match result {
            Ok(ctx) => {
                progress.complete();
                save_progress(&progress, output_dir.as_deref());
                session.finish(SessionStatus::Success);
                let counts = ctx.counts();
                info!(session_id = %session_id, ?counts, "Generation session succeeded");
                GenerationOutcome::Success {
                    session_id,
                    output: ctx.output_dir,
                    counts,
                }
            }
            Err(e) => {
                let last_error = e.last_error();
                progress.fail(&last_error);
                let failed_phase = progress.failed_phase().unwrap_or("unknown").to_string();
                error!(session_id = %session_id, phase = %failed_phase, "Generation session failed: {}", e);
                save_progress(&progress, output_dir.as_deref());
                session.finish(SessionStatus::Failed);
                GenerationOutcome::Failure {
                    session_id,
                    failed_phase,
                    last_error,
                    progress,
                }
            }
        }
    }

    async fn run(
        &self,
        request: &GenerateRequest,
        session_id: &str,
        progress: &mut ProgressReport,
        output_dir: &mut Option<PathBuf>,
    ) -> CoreResult<PipelineContext> {
        // Setup
        progress.current_phase_index = 0;
        let started = Utc::now();
        let dir = match create_output_dir(&self.config.output.base_dir) {
            Ok(dir) => dir,
            Err(e) => {
                record(progress, SETUP_PHASE, started, Err(&e));
                return Err(e);
            }
        };
        *output_dir = Some(dir.clone());
        let setup = self.prepare_workspace(&dir, &request.checklist).await;
        let prepared = PhaseReport::new(1);
        record(progress, SETUP_PHASE, started, setup.as_ref().map(|_| &prepared));
        setup?;
        save_progress(progress, Some(&dir));

        // Planning
        progress.current_phase_index = 1;
        let started = Utc::now();
        let mut ctx = PipelineContext::new(session_id, &dir, request.checklist.clone());
        let plan = self.gateway.plan(&ctx.checklist_value).await.ok_or_else(|| {
            CoreError::Planning("the project plan could not be parsed".to_string())
        });
        let plan = match plan {
            Ok(plan) => {
                let report = PhaseReport::new(1).with_message(format!(
                    "{} component(s), {} page(s) planned",
                    plan.count(TaskKind::Component),
                    plan.count(TaskKind::Page)
                ));
                record(progress, PLANNING_PHASE, started, Ok(&report));
                plan
            }
            Err(e) => {
                record(progress, PLANNING_PHASE, started, Err(&e));
                return Err(e);
            }
        };
        ctx = ctx.with_plan(plan);
        save_progress(progress, Some(&dir));

        let env = self.phase_env(&dir);
        let total = self.phases.len();
        for (i, phase) in self.phases.iter().enumerate() {
            progress.current_phase_index = i + 2;
            info!(session_id, "Running phase [{}/{}]: {}", i + 1, total, phase.name());

            let started = Utc::now();
            let result = phase.run(&env, &mut ctx).await;
            record(progress, phase.name(), started, result.as_ref());
            save_progress(progress, Some(&dir));
            result?;
        }

        Ok(ctx)
    }

    /// Scaffold, branding and dependency install.
    async fn prepare_workspace(&self, dir: &Path, checklist: &Checklist) -> CoreResult<()> {
        if let Some(scaffold) = &self.config.output.scaffold_dir {
            copy_scaffold(scaffold, dir)?;
            if let Err(e) = apply_branding(dir, &checklist.branding) {
                warn!("Could not apply branding: {}", e);
            }
        }

        let install = &self.config.toolchain.install;
        if install.trim().is_empty() {
            return Ok(());
        }
        let config = RunConfig::default().timeout(self.config.toolchain.timeout_secs);
        match self.runner.run(install, dir, &config).await {
            Ok(result) if result.success() => info!("Dependencies installed"),
            Ok(result) => warn!(
                "Dependency install failed, continuing: {}",
                result.combined_output().trim()
            ),
            Err(e) => warn!("Dependency install could not run, continuing: {}", e),
        }
        Ok(())
    }

    fn phase_env(&self, dir: &Path) -> PhaseEnv {
        let artifacts: Arc<dyn ArtifactStore> = Arc::new(FsArtifactStore::new(dir));
        let fixer = FixCycleController::new(
            self.gateway.clone(),
            self.store.clone(),
            artifacts.clone(),
        )
        .with_similar_limit(self.config.knowledge_base.similar_incident_limit);

        PhaseEnv {
            gateway: self.gateway.clone(),
            artifacts,
            runner: self.runner.clone(),
            store: self.store.clone(),
            fixer,
            toolchain: self.config.toolchain.clone(),
            budgets: self.config.budgets,
            knowledge_base: self.config.knowledge_base.clone(),
        }
    }
}

fn record(
    progress: &mut ProgressReport,
    phase: &str,
    started_at: DateTime<Utc>,
    result: Result<&PhaseReport, &CoreError>,
) {
    let (success, attempts, message) = match result {
        Ok(report) => (true, report.attempts, report.message.clone()),
        Err(e) => {
            let attempts = match e {
                CoreError::BudgetExhausted { attempts, .. } => *attempts,
                _ => 0,
            };
            (false, attempts, Some(e.to_string()))
        }
    };
    progress.record(PhaseRecord {
        phase: phase.to_string(),
        success,
        attempts,
        message,
        started_at,
        completed_at: Utc::now(),
    });
}

fn save_progress(progress: &ProgressReport, output_dir: Option<&Path>) {
    let Some(dir) = output_dir else {
        return;
    };
    if let Err(e) = progress.save(dir) {
        warn!("Could not save progress report: {}", e);
    }
}
