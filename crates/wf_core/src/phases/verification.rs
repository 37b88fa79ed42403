//! Verification phases: run a gate, repair, re-run.

use async_trait::async_trait;
use tracing::{error, info, warn};

use crate::context::{GeneratedFile, PipelineContext};
use crate::error::{CoreError, CoreResult};
use crate::fix_cycle::{FixOutcome, FixRequest};
use crate::gate::{decide, Gate, GateObservation, PhaseDecision};
use crate::phase::{Phase, PhaseEnv, PhaseReport};
use crate::phases::generation::generate_file;

/// Run `gate` until it passes or `budget` runs are used.
///
/// Returns the number of gate runs. A failing run is followed by either a
/// dependency reinstall or one fix cycle, and the same gate runs again.
/// When a gate fails with the signature a fix was just applied for, that
/// signature is penalized in the knowledge base.
pub async fn run_gate(env: &PhaseEnv, gate: &Gate, budget: u32) -> CoreResult<u32> {
    let Some(command) = gate.command(&env.toolchain) else {
        info!(gate = %gate, "Gate not configured, skipping");
        return Ok(0);
    };

    let mut last_fix: Option<String> = None;
    let mut last_log = String::new();

    for attempt in 1..=budget {
        info!(gate = %gate, attempt, budget, "Running gate");
        let result = env.run_command(&command).await?;
        let log = result.combined_output();

        let observation = if result.success() {
            GateObservation::passed()
        } else {
            let dependency_failure = gate.detects_dependency_failures()
                && env.toolchain.is_dependency_failure(&log);
            GateObservation::failed(dependency_failure)
        };

        let fixed_signature = last_fix.take();
        if !observation.passed {
            if let Some(sig) = fixed_signature {
                penalize_if_regressed(env, &sig, &log);
            }
        }

        match decide(observation, attempt, budget) {
            PhaseDecision::Advance => {
                info!(gate = %gate, attempt, "Gate passed");
                return Ok(attempt);
            }
            PhaseDecision::Fail => {
                error!(gate = %gate, attempts = attempt, "Gate failed, budget exhausted");
                return Err(CoreError::BudgetExhausted {
                    phase: gate.error_kind().to_string(),
                    attempts: attempt,
                    last_error: log,
                });
            }
            PhaseDecision::ReinstallDependencies => {
                warn!(gate = %gate, attempt, "Dependency resolution failure, reinstalling");
                let reinstall = env.run_command(&env.toolchain.reinstall).await?;
                if !reinstall.success() {
                    warn!("Dependency reinstall failed: {}", reinstall.stderr.trim());
                }
            }
            PhaseDecision::Repair => {
                warn!(gate = %gate, attempt, "Gate failed, starting fix cycle");
                let request = FixRequest::new(&log, gate.error_kind(), attempt);
                match env.fixer.run(&request).await? {
                    FixOutcome::Applied {
                        signature, file, ..
                    } => {
                        info!(gate = %gate, file = %file, "Fix applied, re-running gate");
                        last_fix = signature;
                    }
                    FixOutcome::NotApplied(reason) => {
                        warn!(gate = %gate, "No fix applied: {}", reason);
                    }
                }
            }
        }
        last_log = log;
    }

    Err(CoreError::BudgetExhausted {
        phase: gate.error_kind().to_string(),
        attempts: budget,
        last_error: last_log,
    })
}

fn penalize_if_regressed(env: &PhaseEnv, fixed_signature: &str, log: &str) {
    if wf_kb::signature(log).as_deref() != Some(fixed_signature) {
        return;
    }
    let kb = &env.knowledge_base;
    match env
        .store
        .penalize(fixed_signature, kb.penalty_delta, kb.confidence_floor)
    {
        Ok(Some(confidence)) => {
            warn!(signature = fixed_signature, confidence, "Applied fix did not hold, penalized")
        }
        Ok(None) => {}
        Err(e) => warn!("Could not penalize regressed fix: {}", e),
    }
}

/// Production build of the frontend.
pub struct FrontendBuildPhase;

#[async_trait]
impl Phase for FrontendBuildPhase {
    fn name(&self) -> &str {
        "frontend_build"
    }

    fn description(&self) -> &str {
        "Builds the frontend and repairs build failures"
    }

    async fn run(&self, env: &PhaseEnv, _ctx: &mut PipelineContext) -> CoreResult<PhaseReport> {
        let runs = run_gate(env, &Gate::FrontendBuild, env.budgets.frontend_build).await?;
        Ok(PhaseReport::new(runs))
    }
}

/// Generates API tests and runs them.
pub struct ApiVerificationPhase;

#[async_trait]
impl Phase for ApiVerificationPhase {
    fn name(&self) -> &str {
        "api_verification"
    }

    fn description(&self) -> &str {
        "Generates API tests and repairs the backend until they pass"
    }

    async fn run(&self, env: &PhaseEnv, ctx: &mut PipelineContext) -> CoreResult<PhaseReport> {
        let design = ctx.backend.clone().unwrap_or_default();
        let (file, generated) =
            generate_file(env, self.name(), "API tests", || env.gateway.write_api_tests(&design))
                .await?;
        ctx.test_files
            .push(GeneratedFile::new("api_tests", file.filename.clone()));

        let gate = Gate::ApiTests {
            file: file.filename,
        };
        let runs = run_gate(env, &gate, env.budgets.api_tests).await?;
        Ok(PhaseReport::new(generated + runs))
    }
}

/// Generates end-to-end tests and runs them.
pub struct EndToEndPhase;

#[async_trait]
impl Phase for EndToEndPhase {
    fn name(&self) -> &str {
        "e2e_verification"
    }

    fn description(&self) -> &str {
        "Generates end-to-end tests and repairs the site until they pass"
    }

    async fn run(&self, env: &PhaseEnv, ctx: &mut PipelineContext) -> CoreResult<PhaseReport> {
        let checklist = ctx.checklist_value.clone();
        let (file, generated) = generate_file(env, self.name(), "E2E tests", || {
            env.gateway.write_e2e_tests(&checklist)
        })
        .await?;
        ctx.test_files.push(GeneratedFile::new("e2e_tests", file.filename));

        let runs = run_gate(env, &Gate::EndToEnd, env.budgets.e2e_tests).await?;
        Ok(PhaseReport::new(generated + runs))
    }
}

/// Optional performance/accessibility gate.
pub struct QualityGatePhase;

#[async_trait]
impl Phase for QualityGatePhase {
    fn name(&self) -> &str {
        "quality_gate"
    }

    fn description(&self) -> &str {
        "Runs the performance and accessibility gate"
    }

    async fn run(&self, env: &PhaseEnv, _ctx: &mut PipelineContext) -> CoreResult<PhaseReport> {
        let runs = run_gate(env, &Gate::QualityGate, env.budgets.quality_gate).await?;
        Ok(PhaseReport::new(runs))
    }
}
