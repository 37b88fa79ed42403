//! Agent roles and their directives.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Role an oracle call is made in. Each role has its own directive and
/// expected JSON response shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    Pm,
    UiDesigner,
    Copywriter,
    FrontendDev,
    BackendArchitect,
    BackendDev,
    ApiTester,
    Integrator,
    Debugger,
    Analyst,
    E2eTester,
}

impl AgentRole {
    pub fn all() -> &'static [AgentRole] {
        &[
            AgentRole::Pm,
            AgentRole::UiDesigner,
            AgentRole::Copywriter,
            AgentRole::FrontendDev,
            AgentRole::BackendArchitect,
            AgentRole::BackendDev,
            AgentRole::ApiTester,
            AgentRole::Integrator,
            AgentRole::Debugger,
            AgentRole::Analyst,
            AgentRole::E2eTester,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pm => "pm",
            Self::UiDesigner => "ui_designer",
            Self::Copywriter => "copywriter",
            Self::FrontendDev => "frontend_dev",
            Self::BackendArchitect => "backend_architect",
            Self::BackendDev => "backend_dev",
            Self::ApiTester => "api_tester",
            Self::Integrator => "integrator",
            Self::Debugger => "debugger",
            Self::Analyst => "analyst",
            Self::E2eTester => "e2e_tester",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        let key = s.trim().to_lowercase().replace('-', "_");
        Self::all().iter().copied().find(|r| r.as_str() == key)
    }

    /// Built-in directive text.
    pub fn builtin_directive(&self) -> &'static str {
        match self {
            Self::Pm => "You plan website builds. Turn the checklist you receive into a JSON \
                object with a 'tasks' array. Each task has 'type' ('component' or 'page'), \
                'name' and 'details'. List every component before any page. Pages use the \
                Next.js App Router layout, e.g. 'app/page.tsx' or 'app/contact/page.tsx'.",
            Self::UiDesigner => "You design UI components. Given a component name and its \
                props, answer with one JSON object describing its structure under a 'props' \
                object. Use bracketed placeholders such as \"[HERO_TITLE]\" for all text.",
            Self::Copywriter => "You write website copy. Given a component design spec with \
                bracketed placeholders, answer with one JSON object mapping each placeholder \
                prop to its final text. Return only text content.",
            Self::FrontendDev => "You write Next.js, React and TypeScript code. Components \
                live in 'src/components/', pages in 'app/'. When asked to fix a file, return \
                the complete corrected file that removes the root cause. Answer with one JSON \
                object with 'filename' and 'content'.",
            Self::BackendArchitect => "You design Express backends. From the checklist and \
                the component list, decide which API the site needs. Answer with JSON holding \
                'api_endpoints' (array of {method, path, description, requestBody, \
                responseBody}), 'models' (array of {name, schema}) and 'architecture_notes'.",
            Self::BackendDev => "You write Node.js Express code in TypeScript with input \
                validation and error handling. The 'task' field says whether to write the \
                server entry, one route or one model. Answer with one JSON object with \
                'filename' and 'content'.",
            Self::ApiTester => "You write API tests with Jest and Supertest covering success \
                and error responses of every endpoint in the API spec. Answer with one JSON \
                object with 'filename' and 'content'.",
            Self::Integrator => "You connect the frontend to the backend. For \
                'generate_api_client' answer with the client module as 'filename' and \
                'content'. For 'integrate_component' answer with 'needs_update' (boolean) and, \
                when true, the full updated component as 'filename' and 'content'.",
            Self::Debugger => "You find root causes of build and test failures. You receive \
                the failure log, the error type and the relevant files. Prior solutions, when \
                present, are references only: check whether they address the root cause of \
                this failure before reusing them, and do not repeat solutions listed as \
                failed. Answer with JSON holding 'file_to_fix' (a path from the codebase you \
                were given), 'root_cause_analysis' and 'fix_suggestion'.",
            Self::Analyst => "You read failure logs and pick the source files most likely to \
                cause them. Only choose paths from 'available_files', spelled exactly as \
                listed. Answer with JSON holding 'relevant_files', an array of paths.",
            Self::E2eTester => "You write Playwright end-to-end tests for the site described \
                by the checklist. Answer with one JSON object with 'filename' \
                (tests/e2e.spec.ts) and 'content'.",
        }
    }
}

impl std::fmt::Display for AgentRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A role paired with the directive text sent as the system prompt.
#[derive(Debug, Clone, PartialEq)]
pub struct RoleDirective {
    pub role: AgentRole,
    pub text: String,
}

/// Directive texts for every role: built-ins with optional overrides.
#[derive(Debug, Clone, Default)]
pub struct DirectiveSet {
    overrides: HashMap<AgentRole, String>,
}

impl DirectiveSet {
    pub fn builtin() -> Self {
        Self::default()
    }

    /// Replace the directive of one role.
    pub fn with_override(mut self, role: AgentRole, text: impl Into<String>) -> Self {
        self.overrides.insert(role, text.into());
        self
    }

    pub fn directive(&self, role: AgentRole) -> RoleDirective {
        let text = self
            .overrides
            .get(&role)
            .cloned()
            .unwrap_or_else(|| role.builtin_directive().to_string());
        RoleDirective { role, text }
    }

    pub fn is_overridden(&self, role: AgentRole) -> bool {
        self.overrides.contains_key(&role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_names_round_trip() {
        for role in AgentRole::all() {
            assert_eq!(AgentRole::parse(role.as_str()), Some(*role));
        }
        assert_eq!(AgentRole::parse("E2E-Tester"), Some(AgentRole::E2eTester));
        assert_eq!(AgentRole::parse("qa"), None);
    }

    #[test]
    fn test_overrides_replace_builtin() {
        let set = DirectiveSet::builtin().with_override(AgentRole::Debugger, "custom");
        assert_eq!(set.directive(AgentRole::Debugger).text, "custom");
        assert!(set.directive(AgentRole::Analyst).text.contains("relevant_files"));
        assert!(set.is_overridden(AgentRole::Debugger));
    }
}
