//! Phase definitions and the services phases share.
//!
//! A phase is one stage of a generation run with its own attempt budget.
//! Phases run strictly in order; a phase that returns an error ends the run.
//!
//! # Example
//!
//! ```rust,ignore
//! use async_trait::async_trait;
//! use wf_core::{CoreResult, Phase, PhaseEnv, PhaseReport, PipelineContext};
//!
//! struct Lint;
//!
//! #[async_trait]
//! impl Phase for Lint {
//!     fn name(&self) -> &str { "lint" }
//!     fn description(&self) -> &str { "Runs the linter" }
//!
//!     async fn run(&self, env: &PhaseEnv, ctx: &mut PipelineContext) -> CoreResult<PhaseReport> {
//!         Ok(PhaseReport::new(1))
//!     }
//! }
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};
use wf_kb::IncidentStore;
use wf_oracle::{FilePayload, ReasoningGateway};
use wf_runner::{CommandRunner, ExecutionResult, RunConfig, Toolchain};

use crate::artifact::ArtifactStore;
use crate::config::{Budgets, KnowledgeBaseConfig};
use crate::context::PipelineContext;
use crate::error::{CoreError, CoreResult};
use crate::fix_cycle::FixCycleController;

/// Result of a successful phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseReport {
    /// Gate runs or task attempts used
    pub attempts: u32,
    pub message: Option<String>,
}

impl PhaseReport {
    pub fn new(attempts: u32) -> Self {
        Self {
            attempts,
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// One stage of the pipeline.
#[async_trait]
pub trait Phase: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// Run the phase. Errors are fatal for the run.
    async fn run(&self, env: &PhaseEnv, ctx: &mut PipelineContext) -> CoreResult<PhaseReport>;
}

/// Services shared by the phases of one run.
#[derive(Clone)]
pub struct PhaseEnv {
    pub gateway: ReasoningGateway,
    pub artifacts: Arc<dyn ArtifactStore>,
    pub runner: Arc<dyn CommandRunner>,
    pub store: Arc<dyn IncidentStore>,
    pub fixer: FixCycleController,
    pub toolchain: Toolchain,
    pub budgets: Budgets,
    pub knowledge_base: KnowledgeBaseConfig,
}

impl PhaseEnv {
    /// Run a toolchain command in the project root.
    pub async fn run_command(&self, command: &str) -> CoreResult<ExecutionResult> {
        let config = RunConfig::default().timeout(self.toolchain.timeout_secs);
        let result = self
            .runner
            .run(command, self.artifacts.root(), &config)
            .await?;
        debug!(
            command,
            success = result.success(),
            duration_ms = result.duration_ms,
            "Command finished"
        );
        Ok(result)
    }

    /// Write a generated file. A path the oracle should not have produced
    /// counts as an unusable answer and yields `false`.
    pub fn write_generated(&self, file: &FilePayload) -> CoreResult<bool> {
        match self.artifacts.write(&file.filename, &file.content) {
            Ok(()) => Ok(true),
            Err(CoreError::UnsafePath(path)) => {
                warn!("Ignoring generated file with unsafe path: {}", path);
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }
}
