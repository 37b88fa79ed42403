//! Error types for the core module.

use thiserror::Error;

/// Result type alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur during a generation run.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Phase '{phase}' failed after {attempts} attempt(s)")]
    BudgetExhausted {
        phase: String,
        attempts: u32,
        last_error: String,
    },

    #[error("Planning failed: {0}")]
    Planning(String),

    #[error("Scaffold error: {0}")]
    Scaffold(String),

    #[error("Refusing to write outside the project: {0}")]
    UnsafePath(String),

    #[error("Oracle error: {0}")]
    Oracle(#[from] wf_oracle::OracleError),

    #[error("Runner error: {0}")]
    Runner(#[from] wf_runner::RunnerError),

    #[error("Knowledge base error: {0}")]
    Kb(#[from] wf_kb::KbError),

    #[error("Spec error: {0}")]
    Spec(#[from] wf_spec::SpecError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl CoreError {
    /// The most specific failure detail available, e.g. the last gate log.
    pub fn last_error(&self) -> String {
        match self {
            Self::BudgetExhausted { last_error, .. } => last_error.clone(),
            other => other.to_string(),
        }
    }
}
