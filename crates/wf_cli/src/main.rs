//! Website Factory CLI - Main entry point.
//!
//! Exit codes:
//! - 0: Success
//! - 1: General error
//! - 2: Invalid arguments
//! - 3: Validation failure
//! - 4: Generation failure
//! - 5: Configuration error

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use wf_core::CoreError;
use wf_spec::SpecError;

mod commands;

use commands::{Cli, Commands};

/// CI-friendly exit codes
pub struct ExitCodes;

impl ExitCodes {
    pub const SUCCESS: u8 = 0;
    pub const GENERAL_ERROR: u8 = 1;
    pub const INVALID_ARGS: u8 = 2;
    pub const VALIDATION_FAILURE: u8 = 3;
    pub const GENERATION_FAILURE: u8 = 4;
    pub const CONFIG_ERROR: u8 = 5;
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.json_logs);

    let global = cli.global();
    let result = match cli.command {
        Commands::Generate(args) => commands::generate::execute(args, &global).await,
        Commands::Kb(args) => commands::kb::execute(args, &global).await,
        Commands::Sessions(args) => commands::sessions::execute(args, &global).await,
        Commands::Signature(args) => commands::signature::execute(args).await,
        Commands::CheckConfig(args) => commands::check_config::execute(args, &global).await,
    };

    match result {
        Ok(()) => ExitCode::from(ExitCodes::SUCCESS),
        Err(e) => {
            let exit_code = categorize_error(&e);
            eprintln!("❌ Error: {:#}", e);
            ExitCode::from(exit_code)
        }
    }
}

/// Logs go to stderr so command output on stdout stays machine-readable.
fn init_logging(verbose: bool, json: bool) {
    let default = if verbose { "wf=debug,warn" } else { "wf=info,warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let (human, structured) = if json {
        let layer = fmt::layer().json().with_writer(std::io::stderr);
        (None, Some(layer))
    } else {
        let layer = fmt::layer().with_target(false).with_writer(std::io::stderr);
        (Some(layer), None)
    };

    // Already initialized is fine.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(human)
        .with(structured)
        .try_init();
}

/// Categorize error to determine exit code
fn categorize_error(e: &anyhow::Error) -> u8 {
    for cause in e.chain() {
        if cause.is::<commands::generate::GenerationFailed>() {
            return ExitCodes::GENERATION_FAILURE;
        }
        if let Some(core) = cause.downcast_ref::<CoreError>() {
            match core {
                CoreError::Config(_) | CoreError::Oracle(_) => return ExitCodes::CONFIG_ERROR,
                CoreError::Spec(SpecError::NotFound(_)) => return ExitCodes::INVALID_ARGS,
                CoreError::Spec(_) => return ExitCodes::VALIDATION_FAILURE,
                _ => {}
            }
        }
        if let Some(spec) = cause.downcast_ref::<SpecError>() {
            return match spec {
                SpecError::NotFound(_) | SpecError::UnsupportedFormat(_) => ExitCodes::INVALID_ARGS,
                _ => ExitCodes::VALIDATION_FAILURE,
            };
        }
        if cause.is::<wf_oracle::OracleError>() {
            return ExitCodes::CONFIG_ERROR;
        }
    }

    let msg = e.to_string().to_lowercase();
    if msg.contains("validation") {
        ExitCodes::VALIDATION_FAILURE
    } else if msg.contains("configuration") || msg.contains("credential") {
        ExitCodes::CONFIG_ERROR
    } else if msg.contains("argument") || msg.contains("unknown role") || msg.contains("not found") {
        ExitCodes::INVALID_ARGS
    } else {
        ExitCodes::GENERAL_ERROR
    }
}
