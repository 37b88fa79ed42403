//! Command run configuration.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Default command timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 600;

/// Run configuration with timeout and environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Timeout in seconds (0 = no timeout)
    pub timeout_seconds: u64,
    /// Extra environment variables for the command
    pub env: HashMap<String, String>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: DEFAULT_TIMEOUT_SECS,
            env: HashMap::new(),
        }
    }
}

impl RunConfig {
    pub fn timeout(mut self, seconds: u64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    pub fn no_timeout(mut self) -> Self {
        self.timeout_seconds = 0;
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }
}
