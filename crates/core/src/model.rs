//! ModelClient trait: the abstraction over the language-model backend.
//!
//! The control loop never names a concrete model. It asks for a
//! [`ModelTier`] and hands the client a snapshot of the conversation; the
//! client decides which backend model serves that tier.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ProviderError;
use crate::message::Message;
use crate::tool::{ToolCall, ToolDefinition};

/// A cost/capability class of model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelTier {
    Low,
    Mid,
    High,
}

impl fmt::Display for ModelTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ModelTier::Low => "low",
            ModelTier::Mid => "mid",
            ModelTier::High => "high",
        };
        f.write_str(s)
    }
}

/// The phase of the control loop that issues a model call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    QuotaCheck,
    TopicDetect,
    Processing,
    Compaction,
    Summarize,
    Plan,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::QuotaCheck => "quota_check",
            Phase::TopicDetect => "topic_detect",
            Phase::Processing => "processing",
            Phase::Compaction => "compaction",
            Phase::Summarize => "summarize",
            Phase::Plan => "plan",
        };
        f.write_str(s)
    }
}

/// One model invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelRequest {
    /// Which tier should serve the call
    pub tier: ModelTier,

    /// Which loop phase issued it (diagnostics only)
    pub phase: Phase,

    /// The conversation snapshot
    pub messages: Vec<Message>,

    /// Tools the model may call (empty for housekeeping phases)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDefinition>,
}

impl ModelRequest {
    pub fn new(tier: ModelTier, phase: Phase, messages: Vec<Message>) -> Self {
        Self {
            tier,
            phase,
            messages,
            tools: Vec::new(),
        }
    }

    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = tools;
        self
    }
}

/// Token usage information.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// A complete response from the model.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelResponse {
    /// Assistant text
    pub content: String,

    /// Tool calls, in the order the model emitted them
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,

    /// The model declared the task finished
    #[serde(default)]
    pub completion_signal: bool,

    /// Token usage statistics
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,

    /// Which model actually responded
    #[serde(default)]
    pub model: String,
}

impl ModelResponse {
    /// A plain text response with no tool calls.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }

    /// Mark this response as the model's completion signal.
    pub fn completed(mut self) -> Self {
        self.completion_signal = true;
        self
    }

    pub fn with_tool_calls(mut self, tool_calls: Vec<ToolCall>) -> Self {
        self.tool_calls = tool_calls;
        self
    }
}

/// The core ModelClient trait.
///
/// A failure (network, quota, malformed response) is returned as
/// [`ProviderError`]; the loop treats any error as an absent response.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// A human-readable name for this client (e.g., "openrouter").
    fn name(&self) -> &str;

    /// Send a request and get a complete response.
    async fn invoke(&self, request: ModelRequest) -> Result<ModelResponse, ProviderError>;

    /// Health check: can we reach the backend?
    async fn health_check(&self) -> Result<bool, ProviderError> {
        Ok(true)
    }
}
