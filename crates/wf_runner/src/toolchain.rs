//! Toolchain command sets.
//!
//! A [`Toolchain`] names the concrete commands each verification gate runs
//! for a generated project. The core pipeline only ever refers to gates by
//! role (install, build, unit test, ...), never to a specific tool.

use serde::{Deserialize, Serialize};

use crate::config::DEFAULT_TIMEOUT_SECS;

/// Placeholder replaced by a test file path in [`Toolchain::unit_test`].
pub const FILE_PLACEHOLDER: &str = "{file}";

/// Commands used by the verification gates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Toolchain {
    /// Install dependencies after scaffolding
    pub install: String,
    /// Wipe and reinstall dependencies after a dependency-resolution failure
    pub reinstall: String,
    /// Frontend production build
    pub build: String,
    /// Unit/API test command, `{file}` is replaced by the test file
    pub unit_test: String,
    /// End-to-end test command
    pub e2e: String,
    /// Optional performance/accessibility gate
    pub quality_gate: Option<String>,
    /// Timeout for every command, in seconds
    pub timeout_secs: u64,
    /// All of these must appear in a build log for it to count as a
    /// dependency-resolution failure
    pub dependency_markers: Vec<String>,
}

impl Default for Toolchain {
    fn default() -> Self {
        presets::nextjs()
    }
}

impl Toolchain {
    /// Unit test command for one test file.
    ///
    /// The file name comes from generated content, so it is shell-quoted
    /// before it is spliced into the command line.
    pub fn unit_test_for(&self, file: &str) -> String {
        let quoted = shell_words::quote(file);
        if self.unit_test.contains(FILE_PLACEHOLDER) {
            self.unit_test.replace(FILE_PLACEHOLDER, &quoted)
        } else {
            format!("{} {}", self.unit_test, quoted)
        }
    }

    /// Whether a log shows a dependency-resolution failure rather than a code defect.
    pub fn is_dependency_failure(&self, log: &str) -> bool {
        !self.dependency_markers.is_empty()
            && self.dependency_markers.iter().all(|m| log.contains(m.as_str()))
    }

    pub fn with_quality_gate(mut self, command: impl Into<String>) -> Self {
        self.quality_gate = Some(command.into());
        self
    }

    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout_secs = seconds;
        self
    }
}

/// Predefined toolchains.
pub mod presets {
    use super::*;

    /// Next.js frontend with an Express backend, Jest and Playwright.
    pub fn nextjs() -> Toolchain {
        Toolchain {
            install: "npm install --force".to_string(),
            reinstall: "rm -rf node_modules package-lock.json || true && npm cache clean --force || true && npm install".to_string(),
            build: "npm run build".to_string(),
            unit_test: "npm test -- {file}".to_string(),
            e2e: "npx playwright test --reporter=line".to_string(),
            quality_gate: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            dependency_markers: vec![
                "Cannot find module".to_string(),
                "node_modules".to_string(),
            ],
        }
    }

    /// Next.js toolchain with a Lighthouse CI quality gate.
    pub fn nextjs_with_lighthouse() -> Toolchain {
        nextjs().with_quality_gate("npx lhci autorun")
    }
}
