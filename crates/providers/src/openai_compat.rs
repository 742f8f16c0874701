//! OpenAI-compatible model client.
//!
//! Works with: OpenAI, OpenRouter, Ollama, vLLM, Together AI, and any
//! endpoint exposing `/chat/completions` with function calling.
//!
//! The conversation model keeps tool outcomes as assistant messages carrying
//! `tool_results`. On the wire every outcome becomes a `tool` message keyed by
//! its call id, and a permission denial becomes a `tool` message for the call
//! it refused. Calls left without any answer get a placeholder so the request
//! stays well-formed.

use async_trait::async_trait;
use clawloop_config::ProviderConfig;
use clawloop_core::error::ProviderError;
use clawloop_core::message::{Message, Role};
use clawloop_core::model::{ModelClient, ModelRequest, ModelResponse, Usage};
use clawloop_core::tool::{ToolCall, ToolDefinition};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, warn};

use crate::tiers::TierModels;

pub struct OpenAiCompatClient {
    name: String,
    base_url: String,
    api_key: String,
    models: TierModels,
    temperature: f32,
    max_tokens: Option<u32>,
    client: reqwest::Client,
}

impl OpenAiCompatClient {
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        models: TierModels,
    ) -> Result<Self, ProviderError> {
        Self::with_timeout(name, base_url, api_key, models, 120)
    }

    fn with_timeout(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        models: TierModels,
        timeout_secs: u64,
    ) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ProviderError::NotConfigured(format!("HTTP client: {e}")))?;

        Ok(Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            models,
            temperature: 0.2,
            max_tokens: None,
            client,
        })
    }

    /// Build from the `[provider]` and `[tiers]` config sections.
    pub fn from_config(config: &ProviderConfig, models: TierModels) -> Result<Self, ProviderError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| ProviderError::NotConfigured(format!("No API key for '{}'", config.name)))?;

        let mut client = Self::with_timeout(
            &config.name,
            &config.base_url,
            api_key,
            models,
            config.timeout_secs,
        )?;
        client.temperature = config.temperature;
        client.max_tokens = Some(config.max_tokens);
        Ok(client)
    }

    /// OpenRouter with the given tier models (convenience constructor).
    pub fn openrouter(api_key: impl Into<String>, models: TierModels) -> Result<Self, ProviderError> {
        Self::new("openrouter", "https://openrouter.ai/api/v1", api_key, models)
    }

    /// Convert conversation messages to OpenAI API format.
    fn to_api_messages(messages: &[Message]) -> Vec<ApiMessage> {
        let mut out = Vec::with_capacity(messages.len());
        let mut pending: Vec<String> = Vec::new();

        for m in messages {
            if !m.tool_results.is_empty() {
                for result in &m.tool_results {
                    pending.retain(|id| id != &result.call_id);
                    let content = match &result.payload {
                        Some(payload) => format!("{}\n{}", result.summary, payload),
                        None => result.summary.clone(),
                    };
                    out.push(ApiMessage::tool(&result.call_id, content));
                }
                continue;
            }

            if let Some(call_id) = m.denied_call() {
                pending.retain(|id| id != call_id);
                out.push(ApiMessage::tool(call_id, m.content.clone()));
                continue;
            }

            Self::close_pending(&mut pending, &mut out);

            let role = match m.role {
                Role::User => "user",
                Role::Assistant => "assistant",
                Role::System => "system",
            };
            let tool_calls = (!m.tool_calls.is_empty()).then(|| {
                m.tool_calls
                    .iter()
                    .map(|tc| ApiToolCall {
                        id: tc.id.clone(),
                        r#type: "function".into(),
                        function: ApiFunction {
                            name: tc.name.clone(),
                            arguments: tc.arguments.to_string(),
                        },
                    })
                    .collect()
            });
            pending.extend(m.tool_calls.iter().map(|tc| tc.id.clone()));

            out.push(ApiMessage {
                role: role.into(),
                content: Some(m.content.clone()),
                tool_calls,
                tool_call_id: None,
            });
        }

        Self::close_pending(&mut pending, &mut out);
        out
    }

    fn close_pending(pending: &mut Vec<String>, out: &mut Vec<ApiMessage>) {
        for id in pending.drain(..) {
            out.push(ApiMessage::tool(&id, "No result recorded for this call.".into()));
        }
    }

    /// Convert tool definitions to OpenAI API format.
    fn to_api_tools(tools: &[ToolDefinition]) -> Vec<ApiToolDefinition> {
        tools
            .iter()
            .map(|t| ApiToolDefinition {
                r#type: "function".into(),
                function: ApiToolFunction {
                    name: t.name.clone(),
                    description: t.description.clone(),
                    parameters: t.parameters.clone(),
                },
            })
            .collect()
    }

    /// Map a non-200 status to the error taxonomy.
    fn classify_error(status: u16, body: String) -> ProviderError {
        let lowered = body.to_lowercase();
        let mentions_quota = lowered.contains("quota")
            || lowered.contains("insufficient_quota")
            || lowered.contains("credits");
        match status {
            402 => ProviderError::QuotaExhausted(body),
            429 if mentions_quota => ProviderError::QuotaExhausted(body),
            429 => ProviderError::RateLimited { retry_after_secs: 5 },
            401 | 403 => ProviderError::AuthenticationFailed(
                "Invalid API key or insufficient permissions".into(),
            ),
            404 => ProviderError::ModelNotFound(body),
            _ => ProviderError::ApiError {
                status_code: status,
                message: body,
            },
        }
    }

    fn parse_response(api_response: ApiResponse) -> Result<ModelResponse, ProviderError> {
        let choice = api_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::ApiError {
                status_code: 200,
                message: "No choices in response".into(),
            })?;

        let tool_calls: Vec<ToolCall> = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|tc| {
                // Keep unparseable arguments as a string; the dispatcher rejects them.
                let arguments = serde_json::from_str(&tc.function.arguments)
                    .unwrap_or(serde_json::Value::String(tc.function.arguments));
                ToolCall::new(tc.id, tc.function.name, arguments)
            })
            .collect();

        let completion_signal =
            tool_calls.is_empty() && choice.finish_reason.as_deref() == Some("stop");

        Ok(ModelResponse {
            content: choice.message.content.unwrap_or_default(),
            tool_calls,
            completion_signal,
            usage: api_response.usage.map(|u| Usage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            }),
            model: api_response.model,
        })
    }
}

#[async_trait]
impl ModelClient for OpenAiCompatClient {
    fn name(&self) -> &str {
        &self.name
    }

    async fn invoke(&self, request: ModelRequest) -> Result<ModelResponse, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url);
        let model = self.models.model_for(request.tier);

        let mut body = serde_json::json!({
            "model": model,
            "messages": Self::to_api_messages(&request.messages),
            "temperature": self.temperature,
            "stream": false,
        });
        if let Some(max_tokens) = self.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }
        if !request.tools.is_empty() {
            body["tools"] = serde_json::json!(Self::to_api_tools(&request.tools));
        }

        debug!(
            provider = %self.name,
            model = %model,
            tier = %request.tier,
            phase = %request.phase,
            messages = request.messages.len(),
            "Sending completion request"
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(e.to_string())
                } else {
                    ProviderError::Network(e.to_string())
                }
            })?;

        let status = response.status().as_u16();
        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Provider returned error");
            return Err(Self::classify_error(status, error_body));
        }

        let api_response: ApiResponse =
            response.json().await.map_err(|e| ProviderError::ApiError {
                status_code: 200,
                message: format!("Failed to parse response: {e}"),
            })?;

        Self::parse_response(api_response)
    }

    async fn health_check(&self) -> Result<bool, ProviderError> {
        let url = format!("{}/models", self.base_url);
        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        Ok(response.status().is_success())
    }
}

// --- OpenAI API types (internal) ---

#[derive(Debug, Serialize, Deserialize)]
struct ApiMessage {
    role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ApiToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

impl ApiMessage {
    fn tool(call_id: &str, content: String) -> Self {
        Self {
            role: "tool".into(),
            content: Some(content),
            tool_calls: None,
            tool_call_id: Some(call_id.to_string()),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolCall {
    id: String,
    r#type: String,
    function: ApiFunction,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiFunction {
    name: String,
    arguments: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolDefinition {
    r#type: String,
    function: ApiToolFunction,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    model: String,
    choices: Vec<ApiChoice>,
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}
