//! Scripted collaborators for the agent crate's unit tests.

use async_trait::async_trait;
use clawloop_core::context::Context;
use clawloop_core::error::{ProviderError, ToolError};
use clawloop_core::model::{ModelClient, ModelRequest, ModelResponse, ModelTier, Phase};
use clawloop_core::permission::PermissionGate;
use clawloop_core::todo::SessionId;
use clawloop_core::tool::{ToolCall, ToolExecutor, ToolOutput};
use clawloop_core::workspace::Workspace;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use crate::session::AgentSession;

pub fn root_session(max_depth: usize) -> AgentSession {
    AgentSession::root(
        SessionId::from("root"),
        Context::new(Workspace::default()),
        max_depth,
    )
}

/// What the scripted client saw for one call.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub tier: ModelTier,
    pub phase: Phase,
    pub message_count: usize,
    pub last_content: String,
    pub tool_names: Vec<String>,
}

/// A model client answering from per-phase queues.
///
/// When a phase's queue is empty it falls back to a benign default: quota
/// passes, topic is a continuation, processing completes, summaries and
/// compactions return short text.
#[derive(Default)]
pub struct ScriptedModelClient {
    scripts: Mutex<HashMap<Phase, VecDeque<Result<ModelResponse, ProviderError>>>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl ScriptedModelClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, phase: Phase, response: Result<ModelResponse, ProviderError>) -> &Self {
        self.scripts
            .lock()
            .unwrap()
            .entry(phase)
            .or_default()
            .push_back(response);
        self
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn phases(&self) -> Vec<Phase> {
        self.requests().iter().map(|r| r.phase).collect()
    }

    fn default_for(phase: Phase) -> ModelResponse {
        match phase {
            Phase::QuotaCheck => ModelResponse::text("ok"),
            Phase::TopicDetect => ModelResponse::text("continuation"),
            Phase::Processing | Phase::Plan => ModelResponse::text("done").completed(),
            Phase::Compaction => ModelResponse::text("<compressed_context>compressed</compressed_context>"),
            Phase::Summarize => ModelResponse::text("session summary"),
        }
    }
}

#[async_trait]
impl ModelClient for ScriptedModelClient {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn invoke(&self, request: ModelRequest) -> Result<ModelResponse, ProviderError> {
        self.requests.lock().unwrap().push(RecordedRequest {
            tier: request.tier,
            phase: request.phase,
            message_count: request.messages.len(),
            last_content: request
                .messages
                .last()
                .map(|m| m.content.clone())
                .unwrap_or_default(),
            tool_names: request.tools.iter().map(|t| t.name.clone()).collect(),
        });

        let scripted = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(&request.phase)
            .and_then(|q| q.pop_front());
        scripted.unwrap_or_else(|| Ok(Self::default_for(request.phase)))
    }
}

/// A gate with a fixed answer that remembers what it was asked.
pub struct RecordingGate {
    allow: bool,
    requests: Mutex<Vec<String>>,
}

impl RecordingGate {
    pub fn new(allow: bool) -> Self {
        Self {
            allow,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl PermissionGate for RecordingGate {
    fn name(&self) -> &str {
        "recording"
    }

    async fn request(&self, call: &ToolCall) -> bool {
        self.requests.lock().unwrap().push(call.name.clone());
        self.allow
    }
}

/// A tool that succeeds with its arguments echoed back, or fails on demand.
pub struct RecordingTool {
    name: String,
    fail: bool,
    calls: Mutex<Vec<serde_json::Value>>,
}

impl RecordingTool {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.into(),
            fail: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(name: &str) -> Self {
        Self {
            fail: true,
            ..Self::new(name)
        }
    }

    pub fn calls(&self) -> Vec<serde_json::Value> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ToolExecutor for RecordingTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "Records its arguments"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({ "type": "object" })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolOutput, ToolError> {
        self.calls.lock().unwrap().push(arguments.clone());
        if self.fail {
            return Err(ToolError::ExecutionFailed {
                tool_name: self.name.clone(),
                reason: "exit status 1".into(),
            });
        }
        Ok(ToolOutput::ok(format!("{} ran", self.name)).with_payload(arguments))
    }
}
