//! Kb command - Inspect and curate the knowledge base.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use tracing::info;

use wf_kb::{
    IncidentStore, KnowledgeBase, PromptStore, DEFAULT_CONFIDENCE_FLOOR, DEFAULT_PENALTY,
    REPEAT_SUCCESS_BONUS,
};
use wf_oracle::AgentRole;

use super::{open_kb, GlobalOptions};

#[derive(Args)]
pub struct KbArgs {
    #[command(subcommand)]
    command: KbCommand,
}

#[derive(Subcommand)]
enum KbCommand {
    /// Show the incident stored for a signature
    Lookup {
        signature: String,
    },

    /// List incidents similar to a signature
    Similar {
        signature: String,

        #[arg(short, long, default_value_t = 5)]
        limit: usize,
    },

    /// Raise the confidence of a stored fix
    Reinforce {
        signature: String,

        #[arg(long, default_value_t = REPEAT_SUCCESS_BONUS)]
        delta: f64,
    },

    /// Lower the confidence of a stored fix
    Penalize {
        signature: String,

        #[arg(long, default_value_t = DEFAULT_PENALTY)]
        delta: f64,

        #[arg(long, default_value_t = DEFAULT_CONFIDENCE_FLOOR)]
        floor: f64,
    },

    /// Show knowledge base statistics
    Stats,

    /// Store a new active prompt for an agent role
    #[command(name = "set-prompt")]
    SetPrompt {
        /// Agent role, e.g. debugger or frontend_dev
        role: String,

        /// File holding the prompt text
        file: PathBuf,
    },
}

pub async fn execute(args: KbArgs, global: &GlobalOptions) -> Result<()> {
    let config = global.load_config()?;
    let kb = open_kb(&config)?;
    run(&kb, args.command)
}

fn run(kb: &KnowledgeBase, command: KbCommand) -> Result<()> {
    match command {
        KbCommand::Lookup { signature } => {
            let incident = kb
                .get_incident(&signature)
                .context("Failed to look up incident")?
                .with_context(|| format!("Incident not found: {}", signature))?;
            println!("{}", serde_json::to_string_pretty(&incident)?);
        }
        KbCommand::Similar { signature, limit } => {
            let incidents = kb
                .find_similar_incidents(&signature, limit)
                .context("Failed to search incidents")?;
            if incidents.is_empty() {
                println!("No similar incidents for {}", signature);
            }
            for incident in incidents {
                println!(
                    "{:>5.2}  {}  -> {}",
                    incident.confidence, incident.signature, incident.patch.file_path
                );
            }
        }
        KbCommand::Reinforce { signature, delta } => {
            let confidence = kb
                .reinforce(&signature, delta)
                .context("Failed to reinforce incident")?
                .with_context(|| format!("Incident not found: {}", signature))?;
            info!(signature = %signature, confidence, "Incident reinforced");
            println!("✅ {} confidence is now {:.2}", signature, confidence);
        }
        KbCommand::Penalize {
            signature,
            delta,
            floor,
        } => {
            if floor <= 0.0 || delta < 0.0 {
                anyhow::bail!("Invalid argument: floor must be > 0 and delta >= 0");
            }
            let confidence = kb
                .penalize(&signature, delta, floor)
                .context("Failed to penalize incident")?
                .with_context(|| format!("Incident not found: {}", signature))?;
            info!(signature = %signature, confidence, "Incident penalized");
            println!("✅ {} confidence is now {:.2}", signature, confidence);
        }
        KbCommand::Stats => {
            let stats = kb.stats().context("Failed to read statistics")?;
            println!("Incidents:       {}", stats.incidents);
            match stats.average_confidence {
                Some(avg) => println!("Avg confidence:  {:.2}", avg),
                None => println!("Avg confidence:  -"),
            }
            println!(
                "Sessions:        {} succeeded, {} failed, {} in progress",
                stats.sessions_success, stats.sessions_failed, stats.sessions_in_progress
            );
            println!("Active prompts:  {}", stats.active_prompts);
        }
        KbCommand::SetPrompt { role, file } => {
            let role = AgentRole::parse(&role).with_context(|| {
                let known: Vec<&str> = AgentRole::all().iter().map(|r| r.as_str()).collect();
                format!("Unknown role '{}' (expected one of: {})", role, known.join(", "))
            })?;
            let text = fs::read_to_string(&file)
                .with_context(|| format!("Failed to read prompt file {:?}", file))?;
            if text.trim().is_empty() {
                anyhow::bail!("Invalid argument: prompt file {:?} is empty", file);
            }
            let prompt = kb
                .set_prompt(role.as_str(), &text)
                .context("Failed to store prompt")?;
            println!("✅ Prompt for {} stored as version {}", prompt.role, prompt.version);
        }
    }
    Ok(())
}
