//! Check-config command - Validate configuration and credentials.

use anyhow::{Context, Result};
use clap::Args;

use wf_core::FactoryConfig;

use super::{open_stores, GlobalOptions};

#[derive(Args)]
pub struct CheckConfigArgs {
    /// Also open the knowledge base
    #[arg(long)]
    kb: bool,
}

pub async fn execute(args: CheckConfigArgs, global: &GlobalOptions) -> Result<()> {
    let config = global.load_config()?;
    let settings = config.oracle_settings().context("Invalid configuration")?;

    println!("📋 Configuration");
    println!("   Provider:        {}", settings.provider);
    println!("   Model:           {}", settings.model);
    println!("   Max tokens:      {}", settings.max_tokens);
    println!("   Temperature:     {}", settings.temperature);
    print_paths(&config);

    if args.kb {
        let stores = open_stores(&config);
        if stores.offline {
            println!("   ⚠️  Knowledge base unavailable, sessions will run without it");
        } else {
            println!("   ✅ Knowledge base opened");
        }
    }

    println!();
    println!("✅ Configuration is valid");
    Ok(())
}

fn print_paths(config: &FactoryConfig) {
    let b = &config.budgets;
    println!("   Knowledge base:  {}", config.knowledge_base.path.display());
    println!("   Output:          {}", config.output.base_dir.display());
    if let Some(scaffold) = &config.output.scaffold_dir {
        println!("   Scaffold:        {}", scaffold.display());
    }
    println!(
        "   Budgets:         tasks {}, build {}, api {}, e2e {}, quality {}",
        b.task_attempts, b.frontend_build, b.api_tests, b.e2e_tests, b.quality_gate
    );
    println!("   Build command:   {}", config.toolchain.build);
    if let Some(gate) = &config.toolchain.quality_gate {
        println!("   Quality gate:    {}", gate);
    }
}
