//! Factory configuration.
//!
//! Built once at startup from an optional TOML file plus environment
//! overrides, validated, then passed to every component that needs it.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;
use wf_oracle::{OracleConfig, OracleSettings, Provider};
use wf_runner::Toolchain;

use crate::error::{CoreError, CoreResult};

/// Configuration file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "wf.toml";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FactoryConfig {
    pub oracle: OracleConfig,
    pub knowledge_base: KnowledgeBaseConfig,
    pub output: OutputConfig,
    pub budgets: Budgets,
    pub toolchain: Toolchain,
}

/// Knowledge base location and confidence tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KnowledgeBaseConfig {
    pub path: PathBuf,
    /// Similar incidents handed to diagnosis
    pub similar_incident_limit: usize,
    /// Confidence removed when a fix regresses
    pub penalty_delta: f64,
    /// Penalized confidence never drops below this
    pub confidence_floor: f64,
}

impl Default for KnowledgeBaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("wf-kb.sqlite"),
            similar_incident_limit: 3,
            penalty_delta: wf_kb::DEFAULT_PENALTY,
            confidence_floor: wf_kb::DEFAULT_CONFIDENCE_FLOOR,
        }
    }
}

/// Where generated projects go.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub base_dir: PathBuf,
    /// Project skeleton copied into every new output directory
    pub scaffold_dir: Option<PathBuf>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("generated_sites"),
            scaffold_dir: None,
        }
    }
}

/// Attempt budgets per phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Budgets {
    /// Per generation task (one component, one page, one backend file)
    pub task_attempts: u32,
    pub frontend_build: u32,
    pub api_tests: u32,
    pub e2e_tests: u32,
    pub quality_gate: u32,
}

impl Default for Budgets {
    fn default() -> Self {
        Self {
            task_attempts: 3,
            frontend_build: 10,
            api_tests: 5,
            e2e_tests: 5,
            quality_gate: 5,
        }
    }
}

impl Budgets {
    fn validate(&self) -> CoreResult<()> {
        let budgets = [
            ("task_attempts", self.task_attempts),
            ("frontend_build", self.frontend_build),
            ("api_tests", self.api_tests),
            ("e2e_tests", self.e2e_tests),
            ("quality_gate", self.quality_gate),
        ];
        for (name, value) in budgets {
            if value == 0 {
                return Err(CoreError::Config(format!(
                    "budgets.{} must be at least 1",
                    name
                )));
            }
        }
        Ok(())
    }
}

impl FactoryConfig {
    /// Load from `path`, or from `wf.toml` in the working directory when it
    /// exists, then apply environment overrides.
    pub fn load(path: Option<&Path>) -> CoreResult<Self> {
        let mut config = match path {
            Some(path) => {
                if !path.exists() {
                    return Err(CoreError::Config(format!(
                        "Config file not found: {}",
                        path.display()
                    )));
                }
                Self::from_file(path)?
            }
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if default.exists() {
                    Self::from_file(default)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_env(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> CoreResult<Self> {
        debug!("Reading configuration from {:?}", path);
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> CoreResult<Self> {
        toml::from_str(content).map_err(|e| CoreError::Config(e.to_string()))
    }

    /// Apply `WF_*` overrides read through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> CoreResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("WF_AI_PROVIDER") {
            self.oracle.provider = Provider::parse(&v)?;
        }
        if let Some(v) = lookup("WF_AI_MODEL") {
            self.oracle.model = Some(v);
        }
        if let Some(v) = lookup("WF_AI_TEMPERATURE") {
            self.oracle.temperature = parse_env("WF_AI_TEMPERATURE", &v)?;
        }
        if let Some(v) = lookup("WF_AI_MAX_TOKENS") {
            self.oracle.max_tokens = Some(parse_env("WF_AI_MAX_TOKENS", &v)?);
        }
        if let Some(v) = lookup("WF_KB_PATH") {
            self.knowledge_base.path = PathBuf::from(v);
        }
        if let Some(v) = lookup("WF_OUTPUT_DIR") {
            self.output.base_dir = PathBuf::from(v);
        }
        Ok(())
    }

    /// Check every value range. Credentials are checked by [`Self::oracle_settings`].
    pub fn validate(&self) -> CoreResult<()> {
        self.oracle.validate()?;
        self.budgets.validate()?;

        let kb = &self.knowledge_base;
        if !(kb.confidence_floor > 0.0) {
            return Err(CoreError::Config(
                "knowledge_base.confidence_floor must be greater than 0".to_string(),
            ));
        }
        if !(kb.penalty_delta >= 0.0) {
            return Err(CoreError::Config(
                "knowledge_base.penalty_delta must not be negative".to_string(),
            ));
        }
        if self.toolchain.timeout_secs == 0 {
            return Err(CoreError::Config(
                "toolchain.timeout_secs must be greater than 0".to_string(),
            ));
        }
        if self.toolchain.build.trim().is_empty() || self.toolchain.e2e.trim().is_empty() {
            return Err(CoreError::Config(
                "toolchain.build and toolchain.e2e must be set".to_string(),
            ));
        }
        Ok(())
    }

    /// Validate and resolve the oracle settings, failing when the selected
    /// provider's credential is missing.
    pub fn oracle_settings(&self) -> CoreResult<OracleSettings> {
        self.validate()?;
        Ok(self.oracle.resolve()?)
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, value: &str) -> CoreResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| CoreError::Config(format!("{} has an invalid value: {}", name, value)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = FactoryConfig::default();
        assert_eq!(config.budgets.task_attempts, 3);
        assert_eq!(config.budgets.frontend_build, 10);
        assert_eq!(config.budgets.e2e_tests, 5);
        assert_eq!(config.knowledge_base.similar_incident_limit, 3);
        assert_eq!(config.output.base_dir, PathBuf::from("generated_sites"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml() {
        let config = FactoryConfig::from_toml_str(
            r#"
            [oracle]
            provider = "anthropic"
            temperature = 0.2

            [budgets]
            frontend_build = 4

            [toolchain]
            quality_gate = "npx lhci autorun"
            "#,
        )
        .unwrap();

        assert_eq!(config.oracle.provider, Provider::Anthropic);
        assert_eq!(config.oracle.temperature, 0.2);
        assert_eq!(config.budgets.frontend_build, 4);
        assert_eq!(config.budgets.task_attempts, 3);
        assert_eq!(config.toolchain.quality_gate.as_deref(), Some("npx lhci autorun"));
        assert_eq!(config.toolchain.build, "npm run build");
    }

    #[test]
    fn test_env_overrides() {
        let mut config = FactoryConfig::default();
        config
            .apply_env(|name| match name {
                "WF_AI_PROVIDER" => Some("claude".to_string()),
                "WF_AI_MAX_TOKENS" => Some("2048".to_string()),
                "WF_OUTPUT_DIR" => Some("/tmp/sites".to_string()),
                _ => None,
            })
            .unwrap();

        assert_eq!(config.oracle.provider, Provider::Anthropic);
        assert_eq!(config.oracle.max_tokens, Some(2048));
        assert_eq!(config.output.base_dir, PathBuf::from("/tmp/sites"));

        let err = config
            .apply_env(|name| (name == "WF_AI_TEMPERATURE").then(|| "warm".to_string()))
            .unwrap_err();
        assert!(matches!(err, CoreError::Config(_)));
    }

    #[test]
    fn test_validation_failures() {
        let mut config = FactoryConfig::default();
        config.budgets.api_tests = 0;
        assert!(config.validate().is_err());

        let mut config = FactoryConfig::default();
        config.knowledge_base.confidence_floor = 0.0;
        assert!(config.validate().is_err());

        let mut config = FactoryConfig::default();
        config.oracle.temperature = 3.0;
        assert!(matches!(config.validate(), Err(CoreError::Oracle(_))));
    }

    #[test]
    fn test_missing_explicit_file() {
        let err = FactoryConfig::load(Some(Path::new("/nonexistent/wf.toml"))).unwrap_err();
        assert!(matches!(err, CoreError::Config(_)));
    }
}
