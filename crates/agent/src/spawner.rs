//! Sub-agent spawner: runs a delegated task in an isolated child session.
//!
//! The child sees one user message and the parent's project metadata. The
//! parent sees one thing back: `{task, result}`, where `result` is the
//! child's final answer. Everything the child did on the way is dropped
//! with its session.

use chrono::Utc;
use clawloop_core::context::Context;
use clawloop_core::event::{DomainEvent, EventBus};
use clawloop_core::tool::{ToolCall, ToolResult};
use futures::future::BoxFuture;
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::LoopError;
use crate::loop_runner::RunOutcome;
use crate::prompts::NO_FINAL_ANSWER;
use crate::session::AgentSession;

/// Runs a child session through the full control loop.
///
/// The boxed future is what lets the loop recurse into itself.
pub trait ChildRunner: Send + Sync {
    fn run_child<'a>(&'a self, child: &'a mut AgentSession) -> BoxFuture<'a, Result<RunOutcome, LoopError>>;
}

/// Final answer of a finished session.
pub fn extract_final_result(context: &Context) -> String {
    context
        .last_answer()
        .map(|m| m.content.trim().to_string())
        .unwrap_or_else(|| NO_FINAL_ANSWER.to_string())
}

#[derive(Clone)]
pub struct SubAgentSpawner {
    events: Arc<EventBus>,
}

impl SubAgentSpawner {
    pub fn new(events: Arc<EventBus>) -> Self {
        Self { events }
    }

    /// Run `task` in a child of `parent`.
    ///
    /// A parent at its depth limit gets a failed [`ToolResult`] and no child
    /// is created. A child whose run fails takes the parent down with it.
    pub async fn spawn(
        &self,
        runner: &dyn ChildRunner,
        parent: &mut AgentSession,
        call: &ToolCall,
        task: &str,
    ) -> Result<ToolResult, LoopError> {
        let mut child = match parent.spawn_child(task) {
            Ok(child) => child,
            Err(e) => {
                warn!(session = %parent.id(), depth = parent.depth(), "Sub-agent spawn rejected: {e}");
                return Ok(ToolResult::failure(&call.id, &call.name, e.to_string())
                    .with_payload(json!({ "task": task, "error": e.to_string() })));
            }
        };

        info!(
            parent = %parent.id(),
            child = %child.id(),
            depth = child.depth(),
            "Spawning sub-agent"
        );
        self.events.publish(DomainEvent::SubAgentSpawned {
            parent_session: parent.id().to_string(),
            child_session: child.id().to_string(),
            depth: child.depth(),
            timestamp: Utc::now(),
        });

        let outcome = runner.run_child(&mut child).await;
        self.events.publish(DomainEvent::SubAgentFinished {
            child_session: child.id().to_string(),
            success: outcome.is_ok(),
            timestamp: Utc::now(),
        });

        if let Err(e) = outcome {
            return Err(LoopError::SubAgent {
                depth: child.depth(),
                source: Box::new(e),
            });
        }

        let result = extract_final_result(&child.context);
        Ok(ToolResult::success(&call.id, &call.name, result.clone())
            .with_payload(json!({ "task": task, "result": result })))
    }
}
