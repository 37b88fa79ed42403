//! Error types for the oracle gateway.

use thiserror::Error;

/// Result type alias for oracle operations.
pub type OracleResult<T> = Result<T, OracleError>;

/// Errors that can occur while talking to a reasoning backend.
#[derive(Error, Debug)]
pub enum OracleError {
    #[error("Missing credential for {provider}: set {env_var}")]
    MissingCredential {
        provider: String,
        env_var: &'static str,
    },

    #[error("Unknown provider '{0}' (expected 'openai' or 'anthropic')")]
    UnknownProvider(String),

    #[error("Invalid oracle configuration: {0}")]
    InvalidConfig(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("{provider} API error {status}: {body}")]
    Api {
        provider: String,
        status: u16,
        body: String,
    },

    #[error("No response content from {0}")]
    EmptyResponse(String),

    #[error("Oracle call timed out after {0} seconds")]
    Timeout(u64),

    #[error("No scripted response for role {0}")]
    Unscripted(String),
}

impl From<reqwest::Error> for OracleError {
    fn from(err: reqwest::Error) -> Self {
        OracleError::Http(err.to_string())
    }
}
