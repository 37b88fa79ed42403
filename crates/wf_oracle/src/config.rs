//! Oracle configuration and startup validation.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{OracleError, OracleResult};

/// Reasoning backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Provider {
    #[serde(rename = "openai")]
    OpenAi,
    #[serde(rename = "anthropic")]
    Anthropic,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
        }
    }

    pub fn parse(s: &str) -> OracleResult<Self> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "anthropic" | "claude" => Ok(Self::Anthropic),
            other => Err(OracleError::UnknownProvider(other.to_string())),
        }
    }

    /// Environment variable holding the provider's API key.
    pub fn api_key_env(&self) -> &'static str {
        match self {
            Self::OpenAi => "OPENAI_API_KEY",
            Self::Anthropic => "ANTHROPIC_API_KEY",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            Self::OpenAi => "gpt-4o-mini",
            Self::Anthropic => "claude-3-haiku-20240307",
        }
    }

    pub fn default_max_tokens(&self) -> u32 {
        match self {
            Self::OpenAi => 8192,
            Self::Anthropic => 4096,
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Oracle section of the factory configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    pub provider: Provider,
    /// Model identifier, provider default when unset
    pub model: Option<String>,
    /// Maximum response size in tokens, provider default when unset
    pub max_tokens: Option<u32>,
    pub temperature: f32,
    /// Upper bound for one oracle call including retries
    pub request_timeout_secs: u64,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            provider: Provider::OpenAi,
            model: None,
            max_tokens: None,
            temperature: 0.5,
            request_timeout_secs: 180,
        }
    }
}

impl OracleConfig {
    /// Check value ranges. Does not look at credentials.
    pub fn validate(&self) -> OracleResult<()> {
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(OracleError::InvalidConfig(format!(
                "temperature must be within [0, 2], got {}",
                self.temperature
            )));
        }
        if self.max_tokens == Some(0) {
            return Err(OracleError::InvalidConfig(
                "max_tokens must be greater than 0".to_string(),
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(OracleError::InvalidConfig(
                "request_timeout_secs must be greater than 0".to_string(),
            ));
        }
        if matches!(&self.model, Some(m) if m.trim().is_empty()) {
            return Err(OracleError::InvalidConfig("model must not be empty".to_string()));
        }
        Ok(())
    }

    /// Validate and resolve against the process environment.
    pub fn resolve(&self) -> OracleResult<OracleSettings> {
        self.resolve_with(|name| std::env::var(name).ok())
    }

    /// Validate and resolve, reading credentials through `lookup`.
    ///
    /// Fails when the selected provider's key is absent or empty.
    pub fn resolve_with<F>(&self, lookup: F) -> OracleResult<OracleSettings>
    where
        F: Fn(&str) -> Option<String>,
    {
        self.validate()?;

        let env_var = self.provider.api_key_env();
        let api_key = lookup(env_var)
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .ok_or_else(|| OracleError::MissingCredential {
                provider: self.provider.to_string(),
                env_var,
            })?;

        Ok(OracleSettings {
            provider: self.provider,
            model: self
                .model
                .clone()
                .unwrap_or_else(|| self.provider.default_model().to_string()),
            max_tokens: self
                .max_tokens
                .unwrap_or_else(|| self.provider.default_max_tokens()),
            temperature: self.temperature,
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            api_key,
        })
    }
}

/// Fully resolved, immutable oracle settings.
#[derive(Clone)]
pub struct OracleSettings {
    pub provider: Provider,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub request_timeout: Duration,
    pub api_key: String,
}

impl std::fmt::Debug for OracleSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OracleSettings")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("request_timeout", &self.request_timeout)
            .field("api_key", &"<redacted>")
            .finish()
    }
}
