//! CLI command definitions.
//!
//! This module defines the command structure for the Website Factory CLI.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::warn;
use wf_core::FactoryConfig;
use wf_kb::{IncidentStore, KnowledgeBase, OfflineStore, PromptStore, SessionLedger};

pub mod check_config;
pub mod generate;
pub mod kb;
pub mod sessions;
pub mod signature;

/// Website Factory - self-healing website generation
#[derive(Parser)]
#[command(name = "wf")]
#[command(version, about = "Website Factory - self-healing website generation")]
#[command(long_about = r#"
Website Factory turns a website checklist into a generated project, then
builds and tests it, repairing failures with a root-cause fix cycle that
learns from every incident it resolves.

COMMANDS:
  generate      → Run one generation session for a checklist
  kb            → Inspect and curate the knowledge base
  sessions      → List recent generation sessions
  signature     → Extract the error signature from a log file
  check-config  → Validate configuration and credentials

EXIT CODES:
  0 - Success
  1 - General error
  2 - Invalid arguments
  3 - Validation failure
  4 - Generation failure
  5 - Configuration error
"#)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Configuration file (defaults to ./wf.toml when present)
    #[arg(short, long, global = true, env = "WF_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn global(&self) -> GlobalOptions {
        GlobalOptions {
            config: self.config.clone(),
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate a website from a checklist
    Generate(generate::GenerateArgs),

    /// Knowledge base curation
    Kb(kb::KbArgs),

    /// List recent generation sessions
    Sessions(sessions::SessionsArgs),

    /// Print the error signature of a failure log
    Signature(signature::SignatureArgs),

    /// Validate configuration and credentials
    #[command(name = "check-config")]
    CheckConfig(check_config::CheckConfigArgs),
}

/// Options shared by every command.
#[derive(Debug, Clone, Default)]
pub struct GlobalOptions {
    pub config: Option<PathBuf>,
}

impl GlobalOptions {
    pub fn load_config(&self) -> Result<FactoryConfig> {
        FactoryConfig::load(self.config.as_deref()).context("Failed to load configuration")
    }
}

/// Knowledge-base handles for one process.
pub struct Stores {
    pub incidents: Arc<dyn IncidentStore>,
    pub ledger: Arc<dyn SessionLedger>,
    pub prompts: Arc<dyn PromptStore>,
    pub offline: bool,
}

impl Stores {
    fn from_kb(kb: KnowledgeBase) -> Self {
        let kb = Arc::new(kb);
        Self {
            incidents: kb.clone(),
            ledger: kb.clone(),
            prompts: kb,
            offline: false,
        }
    }

    fn offline(reason: String) -> Self {
        let store = Arc::new(OfflineStore::new(reason));
        Self {
            incidents: store.clone(),
            ledger: store.clone(),
            prompts: store,
            offline: true,
        }
    }
}

/// Open the configured knowledge base, or run without one when it cannot be opened.
pub fn open_stores(config: &FactoryConfig) -> Stores {
    match KnowledgeBase::open(&config.knowledge_base.path) {
        Ok(kb) => Stores::from_kb(kb),
        Err(e) => {
            warn!(
                "Knowledge base {:?} unavailable, continuing without it: {}",
                config.knowledge_base.path, e
            );
            Stores::offline(e.to_string())
        }
    }
}

/// Open the configured knowledge base for curation commands, which need it.
pub fn open_kb(config: &FactoryConfig) -> Result<KnowledgeBase> {
    KnowledgeBase::open(&config.knowledge_base.path).with_context(|| {
        format!(
            "Failed to open knowledge base {:?}",
            config.knowledge_base.path
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "wf",
            "generate",
            "--spec",
            "site.json",
            "--config",
            "custom.toml",
            "--json-logs",
        ])
        .unwrap();
        assert!(cli.json_logs);
        assert_eq!(cli.global().config, Some(PathBuf::from("custom.toml")));
        assert!(matches!(cli.command, Commands::Generate(_)));
    }

    #[test]
    fn test_kb_subcommands_parse() {
        let cli = Cli::try_parse_from([
            "wf",
            "kb",
            "penalize",
            "build_error:Module not found",
            "--delta",
            "0.25",
        ])
        .unwrap();
        assert!(matches!(cli.command, Commands::Kb(_)));

        assert!(Cli::try_parse_from(["wf", "kb", "similar"]).is_err());
    }

    #[test]
    fn test_offline_stores_when_database_cannot_open() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut config = FactoryConfig::default();
        // A directory cannot be opened as a database file.
        config.knowledge_base.path = dir.path().to_path_buf();

        let stores = open_stores(&config);
        assert!(stores.offline);
        assert!(stores.incidents.find_known_solution("build_error:x").is_err());
        assert!(open_kb(&config).is_err());
    }
}
