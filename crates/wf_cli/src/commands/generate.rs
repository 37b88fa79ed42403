//! Generate command - Run one generation session.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use thiserror::Error;
use tracing::{info, warn};

use wf_core::{load_directives, GenerationOutcome, Orchestrator};
use wf_oracle::{build_client, ReasoningGateway};
use wf_runner::ShellRunner;
use wf_spec::{SpecReader, SpecValidator};

use super::{open_stores, GlobalOptions};

#[derive(Args)]
pub struct GenerateArgs {
    /// Checklist file (.json, .yaml, .yml or .toml)
    #[arg(short, long)]
    spec: PathBuf,

    /// Base directory for generated sites (overrides the configuration)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

/// A session ran and ended in failure. Its detail is already on stdout.
#[derive(Debug, Error)]
#[error("Generation session {session_id} failed in phase '{phase}'")]
pub struct GenerationFailed {
    pub session_id: String,
    pub phase: String,
}

pub async fn execute(args: GenerateArgs, global: &GlobalOptions) -> Result<()> {
    let mut config = global.load_config()?;
    if let Some(output) = args.output {
        config.output.base_dir = output;
    }
    let settings = config.oracle_settings().context("Invalid configuration")?;

    let request = SpecReader::read_request(&args.spec)
        .with_context(|| format!("Failed to read checklist {:?}", args.spec))?;
    let validation = SpecValidator::validate_checklist(&request.checklist);
    for warning in &validation.warnings {
        warn!("{}", warning);
    }
    if !validation.valid {
        anyhow::bail!(
            "Checklist validation failed: {}",
            validation.errors.join("; ")
        );
    }

    let stores = open_stores(&config);
    let directives = load_directives(stores.prompts.as_ref());
    info!(
        provider = %settings.provider,
        model = %settings.model,
        "Using reasoning backend"
    );
    let timeout = settings.request_timeout;
    let client = build_client(settings).context("Failed to create reasoning client")?;
    let gateway = ReasoningGateway::new(client, directives).with_timeout(timeout);

    let orchestrator = Orchestrator::new(
        config,
        gateway,
        Arc::new(ShellRunner::new()),
        stores.incidents,
        stores.ledger,
    );

    // Dropping the session future on Ctrl-C marks the session failed.
    let outcome = tokio::select! {
        outcome = orchestrator.generate(&request) => outcome,
        _ = tokio::signal::ctrl_c() => {
            anyhow::bail!("Generation interrupted");
        }
    };

    let rendered =
        serde_json::to_string_pretty(&outcome).context("Failed to serialize the session result")?;
    println!("{}", rendered);

    match outcome {
        GenerationOutcome::Success { output, .. } => {
            eprintln!("✅ Website generated in {}", output.display());
            Ok(())
        }
        GenerationOutcome::Failure {
            session_id,
            failed_phase,
            ..
        } => Err(GenerationFailed {
            session_id,
            phase: failed_phase,
        }
        .into()),
    }
}
