//! Error types for the knowledge base.

use thiserror::Error;

/// Result type alias for knowledge-base operations.
pub type KbResult<T> = Result<T, KbError>;

/// Errors that can occur while using the knowledge base.
#[derive(Error, Debug)]
pub enum KbError {
    #[error("Knowledge base unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Corrupt record for '{key}': {message}")]
    Corrupt { key: String, message: String },

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
