//! Error types for the runner module.

use thiserror::Error;

/// Result type alias for runner operations.
pub type RunnerResult<T> = Result<T, RunnerError>;

/// Errors that can occur while running external commands.
///
/// A command that starts and exits non-zero (or times out) is not an error;
/// it is an [`ExecutionResult`](crate::ExecutionResult) with `success() == false`.
#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("Failed to spawn '{command}': {message}")]
    SpawnFailed { command: String, message: String },

    #[error("Working directory does not exist: {0}")]
    MissingWorkdir(String),

    #[error("Empty command")]
    EmptyCommand,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
