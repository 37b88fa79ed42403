//! Sessions command - List recent generation sessions.

use anyhow::{Context, Result};
use chrono::Local;
use clap::Args;

use wf_kb::{SessionLedger, SessionRecord};

use super::{open_kb, GlobalOptions};

#[derive(Args)]
pub struct SessionsArgs {
    /// Number of sessions to show
    #[arg(short, long, default_value_t = 10)]
    limit: usize,

    /// Output format (text, json)
    #[arg(long, default_value = "text")]
    format: String,
}

pub async fn execute(args: SessionsArgs, global: &GlobalOptions) -> Result<()> {
    let config = global.load_config()?;
    let kb = open_kb(&config)?;
    let sessions = kb
        .recent_sessions(args.limit)
        .context("Failed to read sessions")?;

    match args.format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&sessions)?),
        "text" => {
            if sessions.is_empty() {
                println!("No sessions recorded yet");
            }
            for session in &sessions {
                println!("{}", render(session));
            }
        }
        other => anyhow::bail!("Invalid argument: unknown format '{}'", other),
    }
    Ok(())
}

fn render(session: &SessionRecord) -> String {
    let started = session
        .started_at
        .with_timezone(&Local)
        .format("%Y-%m-%d %H:%M:%S");
    format!(
        "{}  {:<11}  {}  {}",
        session.session_id,
        session.status.as_str(),
        started,
        session.output_location.as_deref().unwrap_or("-")
    )
}
