//! HTTP backends for OpenAI and Anthropic.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::client::LlmClient;
use crate::config::{OracleSettings, Provider};
use crate::error::{OracleError, OracleResult};
use crate::roles::RoleDirective;

const OPENAI_URL: &str = "https://api.openai.com/v1/chat/completions";
const ANTHROPIC_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Attempts per call for transient failures (network, 429, 5xx).
const MAX_RETRIES: u32 = 3;

fn http_client(settings: &OracleSettings) -> OracleResult<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(settings.request_timeout)
        .build()?)
}

fn user_content(task: &serde_json::Value) -> String {
    serde_json::to_string_pretty(task).unwrap_or_else(|_| task.to_string())
}

/// Send a request, retrying transient failures with exponential backoff (2s, 4s).
async fn send_with_retry<F>(provider: Provider, build: F) -> OracleResult<reqwest::Response>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let mut last_error = None;

    for attempt in 0..MAX_RETRIES {
        if attempt > 0 {
            let delay = Duration::from_secs(1 << attempt);
            debug!(%provider, attempt, ?delay, "Retrying oracle request");
            tokio::time::sleep(delay).await;
        }

        let response = match build().send().await {
            Ok(resp) => resp,
            Err(e) => {
                warn!(%provider, attempt = attempt + 1, "Network error: {}", e);
                last_error = Some(OracleError::Http(format!("Network error: {}", e)));
                continue;
            }
        };

        let status = response.status();
        if status.is_server_error() || status.as_u16() == 429 {
            let body = response.text().await.unwrap_or_default();
            warn!(
                %provider,
                status = status.as_u16(),
                "Transient API error (attempt {}/{})",
                attempt + 1,
                MAX_RETRIES
            );
            last_error = Some(OracleError::Api {
                provider: provider.to_string(),
                status: status.as_u16(),
                body,
            });
            continue;
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(OracleError::Api {
                provider: provider.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        return Ok(response);
    }

    Err(last_error.unwrap_or_else(|| OracleError::Http("Max retries exceeded".to_string())))
}

/// OpenAI chat completions backend.
pub struct OpenAiClient {
    settings: OracleSettings,
    url: String,
    client: reqwest::Client,
}

impl OpenAiClient {
    pub fn new(settings: OracleSettings) -> OracleResult<Self> {
        Ok(Self {
            client: http_client(&settings)?,
            url: OPENAI_URL.to_string(),
            settings,
        })
    }

    /// Point the client at a compatible endpoint.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    fn request_body(&self, directive: &RoleDirective, task: &serde_json::Value) -> OpenAiRequest {
        OpenAiRequest {
            model: self.settings.model.clone(),
            messages: vec![
                OpenAiMessage {
                    role: "system".to_string(),
                    content: directive.text.clone(),
                },
                OpenAiMessage {
                    role: "user".to_string(),
                    content: user_content(task),
                },
            ],
            response_format: ResponseFormat {
                kind: "json_object".to_string(),
            },
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
        }
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn execute(
        &self,
        directive: &RoleDirective,
        task: &serde_json::Value,
    ) -> OracleResult<String> {
        let request = self.request_body(directive, task);
        debug!(role = %directive.role, model = %self.settings.model, "OpenAI request");

        let response = send_with_retry(Provider::OpenAi, || {
            self.client
                .post(&self.url)
                .bearer_auth(&self.settings.api_key)
                .json(&request)
        })
        .await?;

        let result: OpenAiResponse = response.json().await?;
        result
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| OracleError::EmptyResponse("OpenAI".to_string()))
    }

    fn provider(&self) -> Provider {
        Provider::OpenAi
    }

    fn model(&self) -> &str {
        &self.settings.model
    }
}

/// Anthropic messages backend.
pub struct AnthropicClient {
    settings: OracleSettings,
    url: String,
    client: reqwest::Client,
}

impl AnthropicClient {
    pub fn new(settings: OracleSettings) -> OracleResult<Self> {
        Ok(Self {
            client: http_client(&settings)?,
            url: ANTHROPIC_URL.to_string(),
            settings,
        })
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    fn request_body(
        &self,
        directive: &RoleDirective,
        task: &serde_json::Value,
    ) -> AnthropicRequest {
        AnthropicRequest {
            model: self.settings.model.clone(),
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
            system: directive.text.clone(),
            messages: vec![AnthropicMessage {
                role: "user".to_string(),
                content: user_content(task),
            }],
        }
    }
}

#[async_trait]
impl LlmClient for AnthropicClient {
    async fn execute(
        &self,
        directive: &RoleDirective,
        task: &serde_json::Value,
    ) -> OracleResult<String> {
        let request = self.request_body(directive, task);
        debug!(role = %directive.role, model = %self.settings.model, "Anthropic request");

        let response = send_with_retry(Provider::Anthropic, || {
            self.client
                .post(&self.url)
                .header("x-api-key", &self.settings.api_key)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .json(&request)
        })
        .await?;

        let result: AnthropicResponse = response.json().await?;
        result
            .content
            .into_iter()
            .find_map(|c| c.text)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| OracleError::EmptyResponse("Anthropic".to_string()))
    }

    fn provider(&self) -> Provider {
        Provider::Anthropic
    }

    fn model(&self) -> &str {
        &self.settings.model
    }
}

// OpenAI API types
#[derive(Debug, Serialize)]
struct OpenAiRequest {
    model: String,
    messages: Vec<OpenAiMessage>,
    response_format: ResponseFormat,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Serialize)]
struct OpenAiMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiResponseMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponseMessage {
    content: Option<String>,
}

// Anthropic API types
#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    temperature: f32,
    system: String,
    messages: Vec<AnthropicMessage>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContent>,
}

#[derive(Debug, Deserialize)]
struct AnthropicContent {
    text: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OracleConfig;
    use crate::roles::{AgentRole, DirectiveSet};
    use serde_json::json;

    fn settings(provider: Provider) -> OracleSettings {
        OracleConfig {
            provider,
            ..Default::default()
        }
        .resolve_with(|_| Some("test-key".to_string()))
        .unwrap()
    }

    #[test]
    fn test_openai_request_asks_for_json_object() {
        let client = OpenAiClient::new(settings(Provider::OpenAi)).unwrap();
        let directive = DirectiveSet::builtin().directive(AgentRole::Analyst);
        let body = client.request_body(&directive, &json!({ "error_log": "Error: x" }));
        let value = serde_json::to_value(&body).unwrap();

        assert_eq!(value["response_format"]["type"], "json_object");
        assert_eq!(value["messages"][0]["role"], "system");
        assert_eq!(value["max_tokens"], 8192);
        assert!(value["messages"][1]["content"]
            .as_str()
            .unwrap()
            .contains("\"error_log\""));
    }

    #[test]
    fn test_anthropic_request_separates_system() {
        let client = AnthropicClient::new(settings(Provider::Anthropic)).unwrap();
        let directive = DirectiveSet::builtin().directive(AgentRole::Debugger);
        let body = client.request_body(&directive, &json!({}));
        let value = serde_json::to_value(&body).unwrap();

        assert_eq!(value["model"], "claude-3-haiku-20240307");
        assert_eq!(value["messages"].as_array().unwrap().len(), 1);
        assert!(value["system"].as_str().unwrap().contains("root causes"));
    }

    #[test]
    fn test_response_decoding() {
        let openai: OpenAiResponse = serde_json::from_value(json!({
            "choices": [ { "message": { "content": "{\"a\":1}" } } ]
        }))
        .unwrap();
        assert_eq!(openai.choices[0].message.content.as_deref(), Some("{\"a\":1}"));

        let anthropic: AnthropicResponse = serde_json::from_value(json!({
            "content": [ { "type": "text", "text": "{}" } ]
        }))
        .unwrap();
        assert_eq!(anthropic.content[0].text.as_deref(), Some("{}"));
    }
}
