//! Phase implementations.

pub mod generation;
pub mod verification;

use std::sync::Arc;

use wf_runner::Toolchain;

use crate::phase::Phase;

pub use generation::{BackendPhase, ComponentPhase, IntegrationPhase, PagePhase};
pub use verification::{
    run_gate, ApiVerificationPhase, EndToEndPhase, FrontendBuildPhase, QualityGatePhase,
};

/// The fixed phase order. The quality gate is included only when the
/// toolchain defines one.
pub fn default_phases(toolchain: &Toolchain) -> Vec<Arc<dyn Phase>> {
    let mut phases: Vec<Arc<dyn Phase>> = vec![
        Arc::new(ComponentPhase),
        Arc::new(PagePhase),
        Arc::new(FrontendBuildPhase),
        Arc::new(BackendPhase),
        Arc::new(ApiVerificationPhase),
        Arc::new(IntegrationPhase),
        Arc::new(EndToEndPhase),
    ];
    if toolchain.quality_gate.is_some() {
        phases.push(Arc::new(QualityGatePhase));
    }
    phases
}

#[cfg(test)]
mod tests {
    use super::*;
    use wf_runner::presets;

    #[test]
    fn test_phase_order() {
        let names: Vec<String> = default_phases(&presets::nextjs())
            .iter()
            .map(|p| p.name().to_string())
            .collect();
        assert_eq!(
            names,
            vec![
                "components",
                "pages",
                "frontend_build",
                "backend",
                "api_verification",
                "integration",
                "e2e_verification",
            ]
        );

        let with_gate = default_phases(&presets::nextjs_with_lighthouse());
        assert_eq!(with_gate.last().map(|p| p.name()), Some("quality_gate"));
    }
}
