//! Provider-neutral oracle capability.

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{OracleSettings, Provider};
use crate::error::OracleResult;
use crate::http::{AnthropicClient, OpenAiClient};
use crate::roles::RoleDirective;

/// A reasoning backend: a role directive and a JSON task in, one text out.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn execute(
        &self,
        directive: &RoleDirective,
        task: &serde_json::Value,
    ) -> OracleResult<String>;

    fn provider(&self) -> Provider;

    fn model(&self) -> &str;
}

/// Build the client for the configured provider.
pub fn build_client(settings: OracleSettings) -> OracleResult<Arc<dyn LlmClient>> {
    let client: Arc<dyn LlmClient> = match settings.provider {
        Provider::OpenAi => Arc::new(OpenAiClient::new(settings)?),
        Provider::Anthropic => Arc::new(AnthropicClient::new(settings)?),
    };
    Ok(client)
}
