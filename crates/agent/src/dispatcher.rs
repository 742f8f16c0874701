//! Tool dispatcher: resolves each tool call to a handler and folds the
//! outcome back into the calling session's Context.
//!
//! Handlers are looked up by name in one table built at construction.
//! `Task`, `TodoWrite` and `TodoRead` are internal bookkeeping and skip the
//! permission gate; every executor-backed tool asks the gate first.

use chrono::Utc;
use clawloop_core::event::{DomainEvent, EventBus};
use clawloop_core::message::Message;
use clawloop_core::permission::PermissionGate;
use clawloop_core::todo::{TodoItem, TodoRecord};
use clawloop_core::tool::{ToolCall, ToolDefinition, ToolExecutor, ToolRegistry, ToolResult};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::error::LoopError;
use crate::session::AgentSession;
use crate::spawner::{ChildRunner, SubAgentSpawner};
use crate::todo_sync::TodoSynchronizer;

pub const TASK_TOOL: &str = "Task";
pub const TODO_WRITE_TOOL: &str = "TodoWrite";
pub const TODO_READ_TOOL: &str = "TodoRead";

enum Handler {
    SpawnSubAgent,
    TodoWrite,
    TodoRead,
    Executor(Arc<dyn ToolExecutor>),
}

impl Handler {
    fn is_gated(&self) -> bool {
        matches!(self, Handler::Executor(_))
    }
}

pub struct ToolDispatcher {
    handlers: HashMap<String, Handler>,
    definitions: Vec<ToolDefinition>,
    gate: Arc<dyn PermissionGate>,
    todos: TodoSynchronizer,
    spawner: SubAgentSpawner,
    events: Arc<EventBus>,
}

impl ToolDispatcher {
    pub fn new(
        registry: &ToolRegistry,
        gate: Arc<dyn PermissionGate>,
        todos: TodoSynchronizer,
        events: Arc<EventBus>,
    ) -> Self {
        let mut handlers = HashMap::new();
        let mut definitions = internal_definitions();

        for def in registry.definitions() {
            if is_internal(&def.name) {
                warn!(tool = %def.name, "Executor shadowed by internal tool, ignoring");
                continue;
            }
            if let Some(executor) = registry.get(&def.name) {
                handlers.insert(def.name.clone(), Handler::Executor(executor));
                definitions.push(def);
            }
        }
        handlers.insert(TASK_TOOL.into(), Handler::SpawnSubAgent);
        handlers.insert(TODO_WRITE_TOOL.into(), Handler::TodoWrite);
        handlers.insert(TODO_READ_TOOL.into(), Handler::TodoRead);

        Self {
            handlers,
            definitions,
            gate,
            todos,
            spawner: SubAgentSpawner::new(events.clone()),
            events,
        }
    }

    /// Every tool the model may call, internal ones first.
    pub fn definitions(&self) -> &[ToolDefinition] {
        &self.definitions
    }

    pub fn todos(&self) -> &TodoSynchronizer {
        &self.todos
    }

    /// Dispatch one call and append its outcome to `session.context`.
    ///
    /// Only a failed sub-agent run is an error; every other failure becomes
    /// a failed [`ToolResult`] or a denial message.
    pub async fn dispatch(
        &self,
        call: &ToolCall,
        session: &mut AgentSession,
        runner: &dyn ChildRunner,
    ) -> Result<(), LoopError> {
        let Some(handler) = self.handlers.get(&call.name) else {
            warn!(session = %session.id(), tool = %call.name, "Unknown tool requested");
            let result = ToolResult::failure(&call.id, &call.name, format!("Unknown tool: {}", call.name));
            session.context.push(Message::tool_outcome(result));
            return Ok(());
        };

        if !call.arguments.is_object() {
            let result = ToolResult::failure(&call.id, &call.name, "Tool arguments must be a JSON object");
            session.context.push(Message::tool_outcome(result));
            return Ok(());
        }

        if handler.is_gated() && !self.gate.request(call).await {
            info!(session = %session.id(), tool = %call.name, gate = self.gate.name(), "Tool call denied");
            self.events.publish(DomainEvent::PermissionDenied {
                session: session.id().to_string(),
                tool_name: call.name.clone(),
                timestamp: Utc::now(),
            });
            session.context.push(Message::denial(call));
            return Ok(());
        }

        let result = match handler {
            Handler::SpawnSubAgent => match task_description(call) {
                Some(task) => self.spawner.spawn(runner, session, call, &task).await?,
                None => ToolResult::failure(
                    &call.id,
                    &call.name,
                    "Task requires a non-empty `task` or `description` string",
                ),
            },
            Handler::TodoWrite => self.write_todos(call, session).await,
            Handler::TodoRead => read_todos(call, &session.context.todo_list),
            Handler::Executor(executor) => self.execute(executor.as_ref(), call, session).await,
        };

        session.context.push(Message::tool_outcome(result));
        Ok(())
    }

    async fn execute(&self, executor: &dyn ToolExecutor, call: &ToolCall, session: &AgentSession) -> ToolResult {
        debug!(session = %session.id(), tool = %call.name, "Executing tool");
        let started = Instant::now();

        let result = match executor.execute(call.arguments.clone()).await {
            Ok(output) => ToolResult::from_output(call, output),
            Err(e) => {
                warn!(session = %session.id(), tool = %call.name, error = %e, "Tool execution failed");
                ToolResult::failure(&call.id, &call.name, e.to_string())
            }
        };

        self.events.publish(DomainEvent::ToolExecuted {
            session: session.id().to_string(),
            tool_name: call.name.clone(),
            success: result.success,
            duration_ms: started.elapsed().as_millis() as u64,
            timestamp: Utc::now(),
        });
        result
    }

    async fn write_todos(&self, call: &ToolCall, session: &mut AgentSession) -> ToolResult {
        let records: Vec<TodoRecord> = match call
            .arguments
            .get("todos")
            .cloned()
            .map(serde_json::from_value)
        {
            Some(Ok(records)) => records,
            Some(Err(e)) => {
                return ToolResult::failure(&call.id, &call.name, format!("Invalid todos: {e}"));
            }
            None => {
                return ToolResult::failure(&call.id, &call.name, "TodoWrite requires a `todos` array");
            }
        };

        let items = TodoItem::from_records(records);

        // Only a saved list replaces the in-memory one.
        match self.todos.save(session.id(), &items).await {
            Ok(snapshot) => {
                session.context.todo_list = items.clone();
                let done = items.iter().filter(|i| i.completed).count();
                ToolResult::success(
                    &call.id,
                    &call.name,
                    format!("Saved {} todos ({done} completed)", items.len()),
                )
                .with_payload(json!({ "snapshot": snapshot.to_string(), "todos": items }))
            }
            Err(e) => {
                warn!(session = %session.id(), error = %e, "Saving todos failed");
                ToolResult::failure(&call.id, &call.name, format!("Saving todos failed: {e}"))
                    .with_payload(json!({ "todos": items }))
            }
        }
    }
}

fn read_todos(call: &ToolCall, todos: &[TodoItem]) -> ToolResult {
    let summary = if todos.is_empty() {
        "No todos".to_string()
    } else {
        let done = todos.iter().filter(|i| i.completed).count();
        format!("{} todos ({done} completed)", todos.len())
    };
    ToolResult::success(&call.id, &call.name, summary).with_payload(json!({ "todos": todos }))
}

fn task_description(call: &ToolCall) -> Option<String> {
    ["task", "description"]
        .iter()
        .filter_map(|key| call.arguments.get(*key).and_then(|v| v.as_str()))
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

fn is_internal(name: &str) -> bool {
    matches!(name, TASK_TOOL | TODO_WRITE_TOOL | TODO_READ_TOOL)
}

fn internal_definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: TASK_TOOL.into(),
            description: "Delegate a self-contained task to a sub-agent with a fresh context. \
Only the sub-agent's final answer is returned."
                .into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "task": { "type": "string", "description": "What the sub-agent should do" }
                },
                "required": ["task"]
            }),
        },
        ToolDefinition {
            name: TODO_WRITE_TOOL.into(),
            description: "Replace the todo list. Send the full list every time.".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "todos": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "description": { "type": "string" },
                                "completed": { "type": "boolean" }
                            },
                            "required": ["description"]
                        }
                    }
                },
                "required": ["todos"]
            }),
        },
        ToolDefinition {
            name: TODO_READ_TOOL.into(),
            description: "Return the current todo list.".into(),
            parameters: json!({ "type": "object", "properties": {} }),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loop_runner::{RunOutcome, RunStatus};
    use crate::test_helpers::{RecordingGate, RecordingTool, root_session};
    use clawloop_core::message::Role;
    use clawloop_core::error::StoreError;
    use clawloop_core::todo::{SessionId, SnapshotId, TodoStore};
    use clawloop_memory::InMemoryTodoStore;
    use futures::FutureExt;
    use futures::future::BoxFuture;

    /// Answers every child run with a fixed final message.
    struct CannedRunner;

    impl ChildRunner for CannedRunner {
        fn run_child<'a>(&'a self, child: &'a mut AgentSession) -> BoxFuture<'a, Result<RunOutcome, LoopError>> {
            async move {
                child.context.push(Message::assistant("intermediate grep output"));
                child.context.push(Message::tool_outcome(ToolResult::success("c", "grep", "3 matches")));
                child.context.push(Message::assistant("found 3 TODOs"));
                Ok(RunOutcome {
                    status: RunStatus::Completed,
                    iterations: 1,
                    final_response: "found 3 TODOs".into(),
                    summary: None,
                })
            }
            .boxed()
        }
    }

    struct Fixture {
        dispatcher: ToolDispatcher,
        gate: Arc<RecordingGate>,
        tool: Arc<RecordingTool>,
        store: InMemoryTodoStore,
    }

    fn fixture(allow: bool) -> Fixture {
        fixture_with(allow, RecordingTool::new("shell"))
    }

    fn fixture_with(allow: bool, tool: RecordingTool) -> Fixture {
        let tool = Arc::new(tool);
        let mut registry = ToolRegistry::new();
        registry.register(tool.clone());
        let gate = Arc::new(RecordingGate::new(allow));
        let store = InMemoryTodoStore::new();
        let events = Arc::new(EventBus::default());
        let dispatcher = ToolDispatcher::new(
            &registry,
            gate.clone(),
            TodoSynchronizer::new(Arc::new(store.clone()), events.clone()),
            events,
        );
        Fixture { dispatcher, gate, tool, store }
    }

    /// Reads as empty, refuses every write.
    struct ReadOnlyStore;

    #[async_trait::async_trait]
    impl TodoStore for ReadOnlyStore {
        fn name(&self) -> &str {
            "read-only"
        }
        async fn list_snapshots(&self, _s: &SessionId) -> Result<Vec<SnapshotId>, StoreError> {
            Ok(Vec::new())
        }
        async fn read(&self, _s: &SessionId, id: &SnapshotId) -> Result<Vec<TodoRecord>, StoreError> {
            Err(StoreError::NotFound(id.to_string()))
        }
        async fn write(&self, _s: &SessionId, _r: &[TodoRecord]) -> Result<SnapshotId, StoreError> {
            Err(StoreError::Storage("read-only filesystem".into()))
        }
    }

    #[tokio::test]
    async fn approved_call_runs_executor() {
        let f = fixture(true);
        let mut session = root_session(1);
        let call = ToolCall::new("c1", "shell", json!({"command": "ls"}));

        f.dispatcher.dispatch(&call, &mut session, &CannedRunner).await.unwrap();

        assert_eq!(f.gate.requests(), vec!["shell".to_string()]);
        assert_eq!(f.tool.calls().len(), 1);
        let last = session.context.messages().last().unwrap();
        assert_eq!(last.role, Role::Assistant);
        assert_eq!(last.tool_results[0].call_id, "c1");
        assert!(last.tool_results[0].success);
    }

    #[tokio::test]
    async fn denied_call_records_denial_not_result() {
        let f = fixture(false);
        let mut session = root_session(1);
        let call = ToolCall::new("c1", "shell", json!({"command": "rm -rf /"}));

        f.dispatcher.dispatch(&call, &mut session, &CannedRunner).await.unwrap();

        assert!(f.tool.calls().is_empty());
        let last = session.context.messages().last().unwrap();
        assert!(last.tool_results.is_empty());
        assert_eq!(last.denied_call(), Some("c1"));
        assert!(last.content.contains("Permission denied"));
    }

    #[tokio::test]
    async fn internal_tools_skip_the_gate() {
        let f = fixture(false);
        let mut session = root_session(1);

        let write = ToolCall::new(
            "t1",
            TODO_WRITE_TOOL,
            json!({"todos": [{"description": "write tests"}]}),
        );
        f.dispatcher.dispatch(&write, &mut session, &CannedRunner).await.unwrap();
        let read = ToolCall::new("t2", TODO_READ_TOOL, json!({}));
        f.dispatcher.dispatch(&read, &mut session, &CannedRunner).await.unwrap();
        let task = ToolCall::new("t3", TASK_TOOL, json!({"task": "find all TODOs"}));
        f.dispatcher.dispatch(&task, &mut session, &CannedRunner).await.unwrap();

        assert!(f.gate.requests().is_empty());
        assert_eq!(session.context.todo_list.len(), 1);
        assert_eq!(f.store.snapshot_count(&SessionId::from("root")).await, 1);
        let snapshots = f.store.list_snapshots(&SessionId::from("root")).await.unwrap();
        assert_eq!(snapshots.len(), 1);
    }

    #[tokio::test]
    async fn task_folds_only_the_final_result() {
        let f = fixture(true);
        let mut session = root_session(1);
        let before = session.context.len();
        let call = ToolCall::new("t1", TASK_TOOL, json!({"description": "find all TODOs"}));

        f.dispatcher.dispatch(&call, &mut session, &CannedRunner).await.unwrap();

        assert_eq!(session.context.len(), before + 1);
        assert_eq!(session.children_spawned(), 1);
        let result = &session.context.messages()[before].tool_results[0];
        assert!(result.success);
        assert_eq!(
            result.payload,
            Some(json!({"task": "find all TODOs", "result": "found 3 TODOs"}))
        );
        assert!(
            session
                .context
                .messages()
                .iter()
                .all(|m| !m.content.contains("intermediate grep output"))
        );
    }

    #[tokio::test]
    async fn task_at_depth_limit_is_a_failed_result() {
        let f = fixture(true);
        let mut session = root_session(0);
        let call = ToolCall::new("t1", TASK_TOOL, json!({"task": "deeper"}));

        f.dispatcher.dispatch(&call, &mut session, &CannedRunner).await.unwrap();

        assert_eq!(session.children_spawned(), 0);
        let result = &session.context.messages().last().unwrap().tool_results[0];
        assert!(!result.success);
        assert!(result.summary.contains("depth limit exceeded"));
    }

    #[tokio::test]
    async fn malformed_calls_fail_softly() {
        let f = fixture(true);
        let mut session = root_session(1);

        let unknown = ToolCall::new("u1", "teleport", json!({}));
        f.dispatcher.dispatch(&unknown, &mut session, &CannedRunner).await.unwrap();
        let bad_args = ToolCall::new("u2", "shell", json!("ls"));
        f.dispatcher.dispatch(&bad_args, &mut session, &CannedRunner).await.unwrap();
        let empty_task = ToolCall::new("u3", TASK_TOOL, json!({"task": "  "}));
        f.dispatcher.dispatch(&empty_task, &mut session, &CannedRunner).await.unwrap();
        let no_todos = ToolCall::new("u4", TODO_WRITE_TOOL, json!({}));
        f.dispatcher.dispatch(&no_todos, &mut session, &CannedRunner).await.unwrap();

        let results: Vec<&ToolResult> = session
            .context
            .messages()
            .iter()
            .flat_map(|m| m.tool_results.iter())
            .collect();
        assert_eq!(results.len(), 4);
        assert!(results.iter().all(|r| !r.success));
        assert!(results[0].summary.contains("Unknown tool"));
        assert!(f.gate.requests().is_empty());
        assert_eq!(session.children_spawned(), 0);
    }

    #[tokio::test]
    async fn executor_failure_is_folded_into_the_result() {
        let f = fixture_with(true, RecordingTool::failing("shell"));
        let mut session = root_session(1);
        let call = ToolCall::new("c1", "shell", json!({"command": "false"}));

        let dispatched = f.dispatcher.dispatch(&call, &mut session, &CannedRunner).await;

        assert!(dispatched.is_ok());
        assert_eq!(f.tool.calls().len(), 1);
        let last = session.context.messages().last().unwrap();
        let result = &last.tool_results[0];
        assert_eq!(result.call_id, "c1");
        assert!(!result.success);
        assert!(result.summary.contains("exit status 1"));
    }

    #[tokio::test]
    async fn failed_todo_save_keeps_the_previous_list() {
        let events = Arc::new(EventBus::default());
        let dispatcher = ToolDispatcher::new(
            &ToolRegistry::new(),
            Arc::new(RecordingGate::new(true)),
            TodoSynchronizer::new(Arc::new(ReadOnlyStore), events.clone()),
            events,
        );
        let mut session = root_session(1);
        let previous = vec![TodoItem {
            id: 0,
            description: "keep me".into(),
            completed: false,
        }];
        session.context.todo_list = previous.clone();
        let call = ToolCall::new(
            "t1",
            TODO_WRITE_TOOL,
            json!({"todos": [{"description": "replacement", "completed": true}]}),
        );

        dispatcher.dispatch(&call, &mut session, &CannedRunner).await.unwrap();

        assert_eq!(session.context.todo_list, previous);
        let result = &session.context.messages().last().unwrap().tool_results[0];
        assert!(!result.success);
        assert!(result.summary.contains("read-only filesystem"));
    }

    #[test]
    fn definitions_list_internal_tools_once() {
        let f = fixture(true);
        let names: Vec<&str> = f.dispatcher.definitions().iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec![TASK_TOOL, TODO_WRITE_TOOL, TODO_READ_TOOL, "shell"]);
    }
}
