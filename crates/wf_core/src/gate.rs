//! Verification gates and the phase decision function.
//!
//! [`decide`] is pure: given what the last gate run showed and how many
//! attempts were used, it picks the next step. The I/O lives in
//! `phases::verification`.

use serde::{Deserialize, Serialize};
use wf_runner::Toolchain;

/// An external verification step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gate {
    FrontendBuild,
    /// Unit/API tests for one test file
    ApiTests { file: String },
    EndToEnd,
    QualityGate,
}

impl Gate {
    /// Error kind passed to the fix cycle.
    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::FrontendBuild => "frontend_build",
            Self::ApiTests { .. } => "api_test",
            Self::EndToEnd => "e2e_test",
            Self::QualityGate => "quality_gate",
        }
    }

    /// Command for this gate, `None` when the toolchain has no such step.
    pub fn command(&self, toolchain: &Toolchain) -> Option<String> {
        match self {
            Self::FrontendBuild => Some(toolchain.build.clone()),
            Self::ApiTests { file } => Some(toolchain.unit_test_for(file)),
            Self::EndToEnd => Some(toolchain.e2e.clone()),
            Self::QualityGate => toolchain.quality_gate.clone(),
        }
    }

    /// Whether dependency-resolution failures are recognized on this gate.
    pub fn detects_dependency_failures(&self) -> bool {
        matches!(self, Self::FrontendBuild)
    }
}

impl std::fmt::Display for Gate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.error_kind())
    }
}

/// What one gate run showed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateObservation {
    pub passed: bool,
    /// The log matches the toolchain's dependency-failure markers
    pub dependency_failure: bool,
}

impl GateObservation {
    pub fn passed() -> Self {
        Self {
            passed: true,
            dependency_failure: false,
        }
    }

    pub fn failed(dependency_failure: bool) -> Self {
        Self {
            passed: false,
            dependency_failure,
        }
    }
}

/// Next step after a gate run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseDecision {
    Advance,
    /// Run a fix cycle on the gate log, then re-run the gate
    Repair,
    /// Reinstall dependencies, then re-run the gate
    ReinstallDependencies,
    /// Budget exhausted
    Fail,
}

/// Decide what follows gate run number `attempt` (from 1) of `budget`.
///
/// Only a passing gate advances. A failure on the last attempt fails the
/// phase, whatever its cause.
pub fn decide(observation: GateObservation, attempt: u32, budget: u32) -> PhaseDecision {
    if observation.passed {
        PhaseDecision::Advance
    } else if attempt >= budget {
        PhaseDecision::Fail
    } else if observation.dependency_failure {
        PhaseDecision::ReinstallDependencies
    } else {
        PhaseDecision::Repair
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wf_runner::presets;

    #[test]
    fn test_passing_gate_advances() {
        for attempt in 1..=3 {
            assert_eq!(decide(GateObservation::passed(), attempt, 3), PhaseDecision::Advance);
        }
    }

    #[test]
    fn test_failure_never_advances() {
        for attempt in 1..=5 {
            for dependency_failure in [false, true] {
                let decision = decide(GateObservation::failed(dependency_failure), attempt, 5);
                assert_ne!(decision, PhaseDecision::Advance);
            }
        }
    }

    #[test]
    fn test_failure_within_budget() {
        assert_eq!(decide(GateObservation::failed(false), 1, 3), PhaseDecision::Repair);
        assert_eq!(
            decide(GateObservation::failed(true), 2, 3),
            PhaseDecision::ReinstallDependencies
        );
    }

    #[test]
    fn test_last_attempt_fails() {
        assert_eq!(decide(GateObservation::failed(false), 3, 3), PhaseDecision::Fail);
        assert_eq!(decide(GateObservation::failed(true), 3, 3), PhaseDecision::Fail);
        assert_eq!(decide(GateObservation::failed(false), 1, 1), PhaseDecision::Fail);
    }

    #[test]
    fn test_gate_commands() {
        let toolchain = presets::nextjs();
        assert_eq!(
            Gate::FrontendBuild.command(&toolchain).as_deref(),
            Some("npm run build")
        );
        assert_eq!(
            Gate::ApiTests { file: "__tests__/api.test.js".to_string() }
                .command(&toolchain)
                .as_deref(),
            Some("npm test -- __tests__/api.test.js")
        );
        assert_eq!(Gate::QualityGate.command(&toolchain), None);
        assert_eq!(
            Gate::QualityGate
                .command(&presets::nextjs_with_lighthouse())
                .as_deref(),
            Some("npx lhci autorun")
        );
        assert_eq!(Gate::EndToEnd.error_kind(), "e2e_test");
    }
}
