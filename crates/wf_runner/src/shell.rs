//! Shell-based command runner.

use std::io;
use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::RunConfig;
use crate::error::{RunnerError, RunnerResult};
use crate::runner::{CommandRunner, ExecutionResult};

/// Runs commands through the platform shell with `tokio::process`.
#[derive(Debug, Clone, Default)]
pub struct ShellRunner;

impl ShellRunner {
    pub fn new() -> Self {
        Self
    }

    fn shell_command(command: &str) -> Command {
        if cfg!(windows) {
            let mut cmd = Command::new("cmd");
            cmd.arg("/C").arg(command);
            cmd
        } else {
            let mut cmd = Command::new("sh");
            cmd.arg("-c").arg(command);
            cmd
        }
    }
}

#[async_trait]
impl CommandRunner for ShellRunner {
    async fn run(
        &self,
        command: &str,
        cwd: &Path,
        config: &RunConfig,
    ) -> RunnerResult<ExecutionResult> {
        if command.trim().is_empty() {
            return Err(RunnerError::EmptyCommand);
        }
        if !cwd.is_dir() {
            return Err(RunnerError::MissingWorkdir(cwd.display().to_string()));
        }

        info!(command = %command, cwd = %cwd.display(), "Running command");

        let mut cmd = Self::shell_command(command);
        cmd.current_dir(cwd)
            .envs(&config.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        // The shell leads its own process group so a kill reaches every descendant.
        #[cfg(unix)]
        cmd.process_group(0);

        let mut child = cmd.spawn().map_err(|e| RunnerError::SpawnFailed {
            command: command.to_string(),
            message: e.to_string(),
        })?;
        let pid = child.id();

        let stdout = child.stdout.take().map(|pipe| tokio::spawn(read_pipe(pipe)));
        let stderr = child.stderr.take().map(|pipe| tokio::spawn(read_pipe(pipe)));

        let started_at = Utc::now();
        let start = Instant::now();

        let status = if config.timeout_seconds > 0 {
            let limit = Duration::from_secs(config.timeout_seconds);
            match tokio::time::timeout(limit, child.wait()).await {
                Ok(status) => status?,
                Err(_) => {
                    kill_process_group(pid);
                    if let Err(e) = child.kill().await {
                        debug!(error = %e, "Shell already gone after group kill");
                    }
                    for task in [stdout, stderr].into_iter().flatten() {
                        task.abort();
                    }
                    warn!(
                        command = %command,
                        timeout_secs = config.timeout_seconds,
                        "Command timed out and was killed"
                    );
                    return Ok(ExecutionResult::timed_out(
                        command,
                        config.timeout_seconds,
                        started_at,
                    ));
                }
            }
        } else {
            child.wait().await?
        };

        // Background jobs left by the shell would keep the pipes open.
        kill_process_group(pid);
        let stdout = collect(stdout).await?;
        let stderr = collect(stderr).await?;

        let duration_ms = start.elapsed().as_millis() as u64;
        let result = ExecutionResult {
            command: command.to_string(),
            exit_code: status.code(),
            stdout: String::from_utf8_lossy(&stdout).into_owned(),
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
            timed_out: false,
            started_at,
            finished_at: Utc::now(),
            duration_ms,
        };

        debug!(
            command = %command,
            exit_code = ?result.exit_code,
            duration_ms,
            "Command finished"
        );

        Ok(result)
    }
}

async fn read_pipe<R>(mut pipe: R) -> io::Result<Vec<u8>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let mut buf = Vec::new();
    pipe.read_to_end(&mut buf).await?;
    Ok(buf)
}

async fn collect(task: Option<JoinHandle<io::Result<Vec<u8>>>>) -> io::Result<Vec<u8>> {
    match task {
        Some(task) => task
            .await
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?,
        None => Ok(Vec::new()),
    }
}

/// SIGKILL the process group led by the shell.
#[cfg(unix)]
fn kill_process_group(pid: Option<u32>) {
    use nix::errno::Errno;
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    let Some(pid) = pid else {
        return;
    };
    match killpg(Pid::from_raw(pid as i32), Signal::SIGKILL) {
        Ok(()) => debug!(pgid = pid, "Killed process group"),
        Err(Errno::ESRCH) => {}
        Err(e) => warn!(pgid = pid, error = %e, "Failed to kill process group"),
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: Option<u32>) {}
