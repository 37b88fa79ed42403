//! Mock command runner for testing.
//!
//! Provides a scripted implementation of the CommandRunner trait so gate and
//! orchestration logic can be tested without spawning processes.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;

use crate::config::RunConfig;
use crate::error::{RunnerError, RunnerResult};
use crate::runner::{CommandRunner, ExecutionResult};

/// Predefined mock response for a command.
#[derive(Debug, Clone)]
pub struct MockResponse {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub timed_out: bool,
}

impl MockResponse {
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            exit_code: 0,
            stdout: stdout.into(),
            stderr: String::new(),
            timed_out: false,
        }
    }

    pub fn failure(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            exit_code,
            stdout: String::new(),
            stderr: stderr.into(),
            timed_out: false,
        }
    }

    pub fn timeout() -> Self {
        Self {
            exit_code: -1,
            stdout: String::new(),
            stderr: String::new(),
            timed_out: true,
        }
    }
}

/// Captured call information for verification.
#[derive(Debug, Clone)]
pub struct CapturedCall {
    pub command: String,
    pub cwd: PathBuf,
    pub timeout_seconds: u64,
}

#[derive(Debug)]
struct Rule {
    pattern: String,
    responses: Vec<MockResponse>,
    next: usize,
}

/// Mock command runner for testing.
///
/// Commands are matched against rules by substring, first rule wins. Each
/// rule hands out its responses in order and keeps repeating the last one.
/// Unmatched commands succeed with empty output.
#[derive(Clone, Default)]
pub struct MockRunner {
    rules: Arc<RwLock<Vec<Rule>>>,
    captured_calls: Arc<RwLock<Vec<CapturedCall>>>,
    simulate_failure: Arc<RwLock<Option<String>>>,
}

impl MockRunner {
    /// Create a new mock runner.
    pub fn new() -> Self {
        Self::default()
    }

    /// Script responses for commands containing `pattern`.
    pub fn respond_to(self, pattern: impl Into<String>, responses: Vec<MockResponse>) -> Self {
        self.rules.write().push(Rule {
            pattern: pattern.into(),
            responses,
            next: 0,
        });
        self
    }

    /// Make every call fail to spawn.
    pub fn simulate_failure(self, message: impl Into<String>) -> Self {
        *self.simulate_failure.write() = Some(message.into());
        self
    }

    /// Get all captured calls.
    pub fn get_calls(&self) -> Vec<CapturedCall> {
        self.captured_calls.read().clone()
    }

    /// Get the number of calls made.
    pub fn call_count(&self) -> usize {
        self.captured_calls.read().len()
    }

    /// Number of calls whose command contains `pattern`.
    pub fn count_matching(&self, pattern: &str) -> usize {
        self.captured_calls
            .read()
            .iter()
            .filter(|c| c.command.contains(pattern))
            .count()
    }

    /// Commands in call order.
    pub fn commands(&self) -> Vec<String> {
        self.captured_calls
            .read()
            .iter()
            .map(|c| c.command.clone())
            .collect()
    }

    fn next_response(&self, command: &str) -> MockResponse {
        let mut rules = self.rules.write();
        let Some(rule) = rules.iter_mut().find(|r| command.contains(&r.pattern)) else {
            return MockResponse::success("");
        };
        if rule.responses.is_empty() {
            return MockResponse::success("");
        }
        let index = rule.next.min(rule.responses.len() - 1);
        rule.next += 1;
        rule.responses[index].clone()
    }
}

#[async_trait]
impl CommandRunner for MockRunner {
    async fn run(
        &self,
        command: &str,
        cwd: &Path,
        config: &RunConfig,
    ) -> RunnerResult<ExecutionResult> {
        self.captured_calls.write().push(CapturedCall {
            command: command.to_string(),
            cwd: cwd.to_path_buf(),
            timeout_seconds: config.timeout_seconds,
        });

        if let Some(message) = self.simulate_failure.read().clone() {
            return Err(RunnerError::SpawnFailed {
                command: command.to_string(),
                message,
            });
        }

        let response = self.next_response(command);
        let started_at = Utc::now();
        if response.timed_out {
            return Ok(ExecutionResult::timed_out(
                command,
                config.timeout_seconds,
                started_at,
            ));
        }

        Ok(ExecutionResult {
            command: command.to_string(),
            exit_code: Some(response.exit_code),
            stdout: response.stdout,
            stderr: response.stderr,
            timed_out: false,
            started_at,
            finished_at: Utc::now(),
            duration_ms: 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_runner_default_success() {
        let runner = MockRunner::new();
        let result = runner
            .run("npm run build", Path::new("."), &RunConfig::default())
            .await
            .unwrap();

        assert!(result.success());
        assert_eq!(runner.call_count(), 1);
    }

    #[tokio::test]
    async fn test_mock_runner_sequence_repeats_last() {
        let runner = MockRunner::new().respond_to(
            "build",
            vec![
                MockResponse::failure(1, "Error: first\n"),
                MockResponse::success("compiled"),
            ],
        );
        let cfg = RunConfig::default();

        let r1 = runner.run("npm run build", Path::new("."), &cfg).await.unwrap();
        let r2 = runner.run("npm run build", Path::new("."), &cfg).await.unwrap();
        let r3 = runner.run("npm run build", Path::new("."), &cfg).await.unwrap();

        assert!(!r1.success());
        assert_eq!(r1.stderr, "Error: first\n");
        assert!(r2.success());
        assert_eq!(r3.stdout, "compiled");
        assert_eq!(runner.count_matching("build"), 3);
    }

    #[tokio::test]
    async fn test_mock_runner_rules_match_by_substring() {
        let runner = MockRunner::new()
            .respond_to("playwright", vec![MockResponse::failure(1, "e2e failed")])
            .respond_to("npm test", vec![MockResponse::success("ok")]);
        let cfg = RunConfig::default().timeout(30);

        let e2e = runner
            .run("npx playwright test --reporter=line", Path::new("/tmp"), &cfg)
            .await
            .unwrap();
        let unit = runner
            .run("npm test -- tests/a.test.js", Path::new("/tmp"), &cfg)
            .await
            .unwrap();

        assert!(!e2e.success());
        assert!(unit.success());
        assert_eq!(runner.get_calls()[0].timeout_seconds, 30);
    }

    #[tokio::test]
    async fn test_mock_runner_timeout_and_failure() {
        let runner = MockRunner::new().respond_to("slow", vec![MockResponse::timeout()]);
        let result = runner
            .run("slow", Path::new("."), &RunConfig::default().timeout(7))
            .await
            .unwrap();
        assert!(result.timed_out);
        assert!(result.combined_output().contains("timed out after 7 seconds"));

        let broken = MockRunner::new().simulate_failure("no shell");
        let err = broken
            .run("anything", Path::new("."), &RunConfig::default())
            .await;
        assert!(matches!(err, Err(RunnerError::SpawnFailed { .. })));
    }
}
