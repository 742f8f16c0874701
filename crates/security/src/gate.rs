//! Permission gates: who decides whether a gated tool call may run.
//!
//! [`PolicyGate`] answers from the `[permissions]` config section and falls
//! back to an [`ApprovalPrompt`] (typically the terminal) in `ask` mode.
//! Without a prompt, `ask` fails closed.

use async_trait::async_trait;
use clawloop_config::{PermissionConfig, PermissionMode};
use clawloop_core::permission::PermissionGate;
use clawloop_core::tool::ToolCall;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

/// Interactive confirmation for a single tool call.
#[async_trait]
pub trait ApprovalPrompt: Send + Sync {
    async fn confirm(&self, call: &ToolCall) -> bool;
}

/// Config-driven gate.
pub struct PolicyGate {
    mode: PermissionMode,
    always_allow: HashSet<String>,
    always_deny: HashSet<String>,
    prompt: Option<Arc<dyn ApprovalPrompt>>,
}

impl PolicyGate {
    pub fn new(config: &PermissionConfig) -> Self {
        Self {
            mode: config.mode,
            always_allow: config.always_allow.iter().cloned().collect(),
            always_deny: config.always_deny.iter().cloned().collect(),
            prompt: None,
        }
    }

    pub fn with_prompt(mut self, prompt: Arc<dyn ApprovalPrompt>) -> Self {
        self.prompt = Some(prompt);
        self
    }
}

#[async_trait]
impl PermissionGate for PolicyGate {
    fn name(&self) -> &str {
        "policy"
    }

    async fn request(&self, call: &ToolCall) -> bool {
        if self.always_deny.contains(&call.name) {
            info!(tool = %call.name, "Tool call denied by policy");
            return false;
        }
        if self.always_allow.contains(&call.name) {
            debug!(tool = %call.name, "Tool call allowed by policy");
            return true;
        }

        match self.mode {
            PermissionMode::Auto => true,
            PermissionMode::Deny => {
                info!(tool = %call.name, "Tool call denied (deny mode)");
                false
            }
            PermissionMode::Ask => match &self.prompt {
                Some(prompt) => prompt.confirm(call).await,
                None => {
                    info!(tool = %call.name, "No approval prompt available, denying");
                    false
                }
            },
        }
    }
}

/// Approves everything. For non-interactive runs in trusted sandboxes.
pub struct AutoApprove;

#[async_trait]
impl PermissionGate for AutoApprove {
    fn name(&self) -> &str {
        "auto"
    }

    async fn request(&self, _call: &ToolCall) -> bool {
        true
    }
}

/// Refuses everything.
pub struct DenyAll;

#[async_trait]
impl PermissionGate for DenyAll {
    fn name(&self) -> &str {
        "deny"
    }

    async fn request(&self, _call: &ToolCall) -> bool {
        false
    }
}
