//! Chat-completions provider client
//!
//! Both configured providers speak the same chat-completions dialect, so a
//! single HTTP client covers primary and fallback. Every reply is reduced to
//! a `ModelTurn` before the orchestrator sees it.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::ProviderSettings;
use crate::errors::{AgentError, Result};
use crate::provider::types::{FinalAnswer, ModelTurn, ToolCall, ToolCallRequest, Usage};
use crate::types::conversation::{ChatMessage, ConversationState, ToolCallItem};
use crate::tools::ToolSchema;

/// Seam between the orchestrator and any concrete provider
#[async_trait]
pub trait ProviderClient: Send + Sync {
    /// Short provider label used in errors and attempt records
    fn name(&self) -> &str;

    /// Model identifier sent with each request
    fn model(&self) -> &str;

    /// Issue one completion over the full conversation so far
    async fn complete(&self, conversation: &ConversationState, tools: &[ToolSchema]) -> Result<ModelTurn>;

    /// Cheap reachability probe; transport-backed clients override it
    async fn probe(&self) -> bool {
        true
    }
}

/// HTTP client for one configured chat-completions endpoint
pub struct ChatProviderClient {
    client: Client,
    name: String,
    base_url: String,
    api_key: String,
    model: String,
    parallel_tool_calls: Option<bool>,
    timeout: Duration,
}

impl ChatProviderClient {
    /// Create a new client with an explicit timeout
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(AgentError::HttpError)?;

        Ok(Self {
            client,
            name: name.into(),
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
            parallel_tool_calls: None,
            timeout,
        })
    }

    /// Build from a config section, resolving the API key from its env var
    pub fn from_settings(settings: &ProviderSettings) -> Result<Self> {
        let api_key = std::env::var(&settings.api_key_env).map_err(|_| {
            AgentError::ConfigError(format!(
                "provider '{}' needs the {} environment variable",
                settings.name, settings.api_key_env
            ))
        })?;

        let mut client = Self::new(
            settings.name.clone(),
            settings.base_url.clone(),
            api_key,
            settings.model.clone(),
            Duration::from_secs(settings.timeout_secs),
        )?;
        client.parallel_tool_calls = settings.parallel_tool_calls;
        Ok(client)
    }

    /// Force single tool calls per turn, needed by some fallback endpoints
    pub fn with_parallel_tool_calls(mut self, enabled: bool) -> Self {
        self.parallel_tool_calls = Some(enabled);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }

    /// Cheap reachability probe against the models listing
    pub async fn health_check(&self) -> bool {
        let url = format!("{}/models", self.base_url.trim_end_matches('/'));
        match self.client.get(&url).bearer_auth(&self.api_key).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    fn transport_error(&self, error: reqwest::Error) -> AgentError {
        if error.is_timeout() {
            AgentError::Unavailable {
                source_name: self.name.clone(),
                detail: format!("request timed out after {}ms", self.timeout.as_millis()),
            }
        } else {
            AgentError::Unavailable {
                source_name: self.name.clone(),
                detail: error.to_string(),
            }
        }
    }

    fn reduce(&self, completion: ChatCompletionResponse, turn_index: usize) -> Result<ModelTurn> {
        let usage = completion.usage.unwrap_or_default();
        let choice = completion
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AgentError::MalformedResponse {
                detail: format!("provider '{}' returned no choices", self.name),
            })?;

        let message = choice.message;
        if let Some(items) = message.tool_calls.filter(|calls| !calls.is_empty()) {
            let calls = items
                .iter()
                .map(|item| ToolCall::from_wire(item, turn_index))
                .collect::<Result<Vec<_>>>()?;
            return Ok(ModelTurn::ToolCallRequest(ToolCallRequest { calls, usage }));
        }

        match message.content {
            Some(raw) if !raw.trim().is_empty() => Ok(ModelTurn::FinalAnswer(FinalAnswer { raw, usage })),
            _ => Err(AgentError::MalformedResponse {
                detail: format!("provider '{}' reply had neither content nor tool calls", self.name),
            }),
        }
    }
}

#[async_trait]
impl ProviderClient for ChatProviderClient {
    fn name(&self) -> &str {
        &self.name
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn probe(&self) -> bool {
        self.health_check().await
    }

    async fn complete(&self, conversation: &ConversationState, tools: &[ToolSchema]) -> Result<ModelTurn> {
        let request = ChatCompletionRequest {
            model: &self.model,
            messages: conversation.turns(),
            tools: tools.iter().map(WireTool::from_schema).collect(),
            tool_choice: "auto",
            parallel_tool_calls: self.parallel_tool_calls,
        };

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(AgentError::RateLimited {
                provider: self.name.clone(),
            });
        }
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AgentError::Unavailable {
                source_name: self.name.clone(),
                detail: format!("HTTP {}: {}", status, error_text),
            });
        }

        let completion: ChatCompletionResponse =
            response.json().await.map_err(|e| AgentError::MalformedResponse {
                detail: format!("undecodable completion body: {}", e),
            })?;

        self.reduce(completion, conversation.len())
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    tools: Vec<WireTool<'a>>,
    tool_choice: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    parallel_tool_calls: Option<bool>,
}

#[derive(Debug, Serialize)]
struct WireTool<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    function: WireFunction<'a>,
}

impl<'a> WireTool<'a> {
    fn from_schema(schema: &'a ToolSchema) -> Self {
        Self {
            kind: "function",
            function: WireFunction {
                name: &schema.name,
                description: &schema.description,
                parameters: &schema.parameters,
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct WireFunction<'a> {
    name: &'a str,
    description: &'a str,
    parameters: &'a Value,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: WireMessage,
}

#[derive(Debug, Deserialize)]
struct WireMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ToolCallItem>>,
}
