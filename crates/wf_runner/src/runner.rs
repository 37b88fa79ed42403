//! Command runner trait and types.

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::RunConfig;
use crate::error::RunnerResult;

/// Result of running one external command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// The command line that was run
    pub command: String,
    /// Exit code, `None` when killed by a signal or on timeout
    pub exit_code: Option<i32>,
    /// Captured stdout
    pub stdout: String,
    /// Captured stderr
    pub stderr: String,
    /// Whether the command was killed for exceeding its timeout
    pub timed_out: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

impl ExecutionResult {
    /// Result for a command killed after `seconds`.
    pub fn timed_out(command: impl Into<String>, seconds: u64, started_at: DateTime<Utc>) -> Self {
        let finished_at = Utc::now();
        Self {
            command: command.into(),
            exit_code: None,
            stdout: String::new(),
            stderr: format!("Command timed out after {} seconds.", seconds),
            timed_out: true,
            started_at,
            finished_at,
            duration_ms: (finished_at - started_at).num_milliseconds().max(0) as u64,
        }
    }

    /// Check if the command exited with code 0.
    pub fn success(&self) -> bool {
        !self.timed_out && self.exit_code == Some(0)
    }

    /// Combined output (stdout followed by stderr), the log handed to the fix cycle.
    pub fn combined_output(&self) -> String {
        if self.stdout.is_empty() {
            self.stderr.clone()
        } else if self.stderr.is_empty() {
            self.stdout.clone()
        } else {
            format!("{}\n{}", self.stdout, self.stderr)
        }
    }
}

/// Executes external verification commands.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `command` through the platform shell in `cwd`.
    ///
    /// Non-zero exits and timeouts are reported in the returned result.
    /// Only a failure to start the command is an error.
    async fn run(
        &self,
        command: &str,
        cwd: &Path,
        config: &RunConfig,
    ) -> RunnerResult<ExecutionResult>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(stdout: &str, stderr: &str, exit_code: Option<i32>) -> ExecutionResult {
        let now = Utc::now();
        ExecutionResult {
            command: "npm run build".to_string(),
            exit_code,
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
            timed_out: false,
            started_at: now,
            finished_at: now,
            duration_ms: 0,
        }
    }

    #[test]
    fn test_combined_output() {
        assert_eq!(result("out", "err", Some(1)).combined_output(), "out\nerr");
        assert_eq!(result("", "err", Some(1)).combined_output(), "err");
        assert_eq!(result("out", "", Some(0)).combined_output(), "out");
    }

    #[test]
    fn test_success_requires_zero_exit() {
        assert!(result("", "", Some(0)).success());
        assert!(!result("", "", Some(2)).success());
        assert!(!result("", "", None).success());
    }

    #[test]
    fn test_timed_out_result() {
        let r = ExecutionResult::timed_out("npm test", 5, Utc::now());
        assert!(!r.success());
        assert_eq!(r.combined_output(), "Command timed out after 5 seconds.");
    }
}
