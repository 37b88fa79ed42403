//! # wf_core
//!
//! Self-healing generation pipeline for Website Factory.
//!
//! A generation session runs a fixed sequence of phases. Generation phases
//! ask the reasoning oracle for files and write them; verification phases
//! run a build or test gate and, when it fails, run one fix cycle and the
//! same gate again until it passes or the phase budget is spent.
//!
//! # Architecture
//!
//! - **Artifact store**: the generated project tree, snapshots and atomic writes
//! - **Resolver**: matches a file named by the oracle against the tree
//! - **Fix cycle**: signature, precedent lookup, diagnosis, patch, incident record
//! - **Gates**: verification commands and the pure [`decide`] function
//! - **Phases**: the ordered stages of a session, each with its own budget
//! - **Orchestrator**: setup, planning, phases, progress report, session ledger
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use wf_core::{FactoryConfig, Orchestrator};
//! use wf_kb::KnowledgeBase;
//! use wf_oracle::{build_client, DirectiveSet, ReasoningGateway};
//! use wf_runner::ShellRunner;
//! use wf_spec::SpecReader;
//!
//! let config = FactoryConfig::load(None)?;
//! let kb = Arc::new(KnowledgeBase::open(&config.knowledge_base.path)?);
//! let client = build_client(config.oracle_settings()?)?;
//! let gateway = ReasoningGateway::new(client, wf_core::load_directives(kb.as_ref()));
//!
//! let orchestrator = Orchestrator::new(config, gateway, Arc::new(ShellRunner::new()), kb.clone(), kb);
//! let outcome = orchestrator.generate(&SpecReader::read_request("site.json")?).await;
//! ```

pub mod artifact;
pub mod config;
pub mod context;
pub mod directives;
pub mod error;
pub mod fix_cycle;
pub mod gate;
pub mod orchestrator;
pub mod phase;
pub mod phases;
pub mod pipeline;
pub mod resolver;
pub mod workspace;

// Re-export main types for convenience
pub use artifact::{ArtifactSnapshot, ArtifactStore, FsArtifactStore};
pub use config::{Budgets, FactoryConfig, KnowledgeBaseConfig, OutputConfig, DEFAULT_CONFIG_FILE};
pub use context::{GeneratedFile, GenerationCounts, PipelineContext};
pub use directives::load_directives;
pub use error::{CoreError, CoreResult};
pub use fix_cycle::{FixCycleController, FixOutcome, FixRequest, NotApplied, DEFAULT_FIX_AGENT};
pub use gate::{decide, Gate, GateObservation, PhaseDecision};
pub use orchestrator::{GenerationOutcome, Orchestrator};
pub use phase::{Phase, PhaseEnv, PhaseReport};
pub use phases::{default_phases, run_gate};
pub use pipeline::{ExecutionState, PhaseRecord, ProgressReport};
pub use resolver::resolve_target;
