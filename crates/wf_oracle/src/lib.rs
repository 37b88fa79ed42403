//! # wf_oracle
//!
//! Reasoning oracle gateway for Website Factory.
//!
//! Every piece of natural-language reasoning in a generation run (planning,
//! design, code, diagnosis, patches) is a request to an [`LlmClient`]: a
//! role directive plus a structured JSON task in, one text response out.
//! Two backends are provided, OpenAI and Anthropic, selected once from
//! [`OracleConfig`] at startup.
//!
//! Responses are untrusted. The [`ReasoningGateway`] parses them strictly
//! and turns every failure (transport error, timeout, malformed or incomplete
//! JSON) into "no result" so callers never crash on a bad answer.

pub mod client;
pub mod config;
pub mod error;
pub mod gateway;
pub mod http;
pub mod parse;
pub mod roles;
pub mod scripted;

pub use client::{build_client, LlmClient};
pub use config::{OracleConfig, OracleSettings, Provider};
pub use error::{OracleError, OracleResult};
pub use gateway::{
    BackendDesign, Diagnosis, DiagnosisRequest, FilePayload, IntegrationUpdate, KnownSolutionHint,
    PatchRequest, ReasoningGateway,
};
pub use http::{AnthropicClient, OpenAiClient};
pub use parse::{extract_json_object, parse_response};
pub use roles::{AgentRole, DirectiveSet, RoleDirective};
pub use scripted::{RecordedCall, ScriptedClient};
