//! Signature command - Extract the error signature of a failure log.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

#[derive(Args)]
pub struct SignatureArgs {
    /// Log file holding build or test output
    log_file: PathBuf,
}

pub async fn execute(args: SignatureArgs) -> Result<()> {
    let log = fs::read_to_string(&args.log_file)
        .with_context(|| format!("Failed to read log file {:?}", args.log_file))?;
    println!("{}", describe(&log));
    Ok(())
}

fn describe(log: &str) -> String {
    match wf_kb::signature(log) {
        Some(sig) => sig,
        None => "No recognizable error signature".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe() {
        assert_eq!(
            describe("Error: Module not found: Can't resolve './Hero'\n"),
            "build_error:Module not found: Can't resolve './Hero'"
        );
        assert_eq!(
            describe("everything compiled"),
            "No recognizable error signature"
        );
    }

    #[tokio::test]
    async fn test_missing_log_file() {
        let err = execute(SignatureArgs {
            log_file: PathBuf::from("/nonexistent/build.log"),
        })
        .await
        .unwrap_err();
        assert!(err.to_string().contains("Failed to read log file"));
    }
}
