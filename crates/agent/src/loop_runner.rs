//! The control loop.
//!
//! One run walks `QUOTA_CHECK → TOPIC_DETECT → REMINDER_INJECT →
//! PROCESSING → SUMMARIZE`. PROCESSING repeats compaction check, todo sync,
//! one model call and sequential tool dispatch until the model signals
//! completion or every todo is done.

use chrono::Utc;
use clawloop_core::context::Context;
use clawloop_core::error::ProviderError;
use clawloop_core::event::{DomainEvent, EventBus};
use clawloop_core::message::Message;
use clawloop_core::model::{ModelClient, ModelRequest, ModelResponse, Phase};
use clawloop_core::permission::PermissionGate;
use clawloop_core::summary::SummarySink;
use clawloop_core::todo::{TodoItem, TodoStore};
use clawloop_core::tool::{ToolDefinition, ToolRegistry};
use futures::FutureExt;
use futures::future::BoxFuture;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::compaction::{compacted_message, compaction_request, needs_compaction};
use crate::dispatcher::ToolDispatcher;
use crate::error::LoopError;
use crate::prompts::{
    ENVIRONMENT_REMINDER, QUOTA_CHECK_PROMPT, SUMMARY_PROMPT, TODO_REMINDER, environment_reminder,
    is_new_topic, title_for, todo_reminder, topic_prompt,
};
use crate::router::ModelRouter;
use crate::session::{AgentSession, SharedSession};
use crate::spawner::{ChildRunner, extract_final_result};
use crate::todo_sync::TodoSynchronizer;
use crate::token::estimate_messages_tokens;

pub const DEFAULT_COMPACTION_THRESHOLD: usize = 100_000;
pub const DEFAULT_MAX_ITERATIONS: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// The model signalled completion or every todo was done
    Completed,
    /// PROCESSING was cut off by the iteration guard
    IterationLimit,
}

/// What a finished run hands back to its caller.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub status: RunStatus,
    pub iterations: usize,
    pub final_response: String,
    pub summary: Option<String>,
}

pub struct AgentLoop {
    client: Arc<dyn ModelClient>,
    dispatcher: ToolDispatcher,
    summaries: Option<Arc<dyn SummarySink>>,
    events: Arc<EventBus>,
    compaction_threshold: usize,
    max_iterations: usize,
}

impl AgentLoop {
    pub fn new(
        client: Arc<dyn ModelClient>,
        tools: &ToolRegistry,
        gate: Arc<dyn PermissionGate>,
        todo_store: Arc<dyn TodoStore>,
        events: Arc<EventBus>,
    ) -> Self {
        let todos = TodoSynchronizer::new(todo_store, events.clone());
        Self {
            client,
            dispatcher: ToolDispatcher::new(tools, gate, todos, events.clone()),
            summaries: None,
            events,
            compaction_threshold: DEFAULT_COMPACTION_THRESHOLD,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }

    /// Persist root-session summaries to `sink`.
    pub fn with_summary_sink(mut self, sink: Arc<dyn SummarySink>) -> Self {
        self.summaries = Some(sink);
        self
    }

    /// Estimated token count above which history is compacted.
    pub fn with_compaction_threshold(mut self, tokens: usize) -> Self {
        self.compaction_threshold = tokens;
        self
    }

    /// Cap on PROCESSING iterations per run.
    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    pub fn tool_definitions(&self) -> &[ToolDefinition] {
        self.dispatcher.definitions()
    }

    /// Seed `context` with the summary of the previous session, if the sink
    /// has one. A sink error leaves the context untouched.
    pub async fn load_previous_summary(&self, context: &mut Context) {
        let Some(sink) = &self.summaries else {
            return;
        };
        match sink.latest().await {
            Ok(summary) => context.previous_summary = summary,
            Err(e) => warn!(sink = sink.name(), error = %e, "Reading previous summary failed"),
        }
    }

    /// Process one user input on `session`.
    ///
    /// The exclusive borrow is the run token: no two runs of one session can
    /// interleave.
    pub async fn run(&self, session: &mut AgentSession, user_input: &str) -> Result<RunOutcome, LoopError> {
        self.execute(session, user_input, true).await
    }

    /// [`run`](Self::run) for a session shared between tasks. Fails with
    /// [`LoopError::AlreadyRunning`] if another run holds it.
    pub async fn run_shared(&self, session: &SharedSession, user_input: &str) -> Result<RunOutcome, LoopError> {
        let mut guard = session.try_claim()?;
        self.execute(&mut guard, user_input, true).await
    }

    async fn execute(
        &self,
        session: &mut AgentSession,
        user_input: &str,
        seat_input: bool,
    ) -> Result<RunOutcome, LoopError> {
        info!(
            session = %session.id(),
            depth = session.depth(),
            messages = session.context.len(),
            "Run started"
        );

        // ── QUOTA_CHECK ──
        let check = ModelRequest::new(
            ModelRouter::select(Phase::QuotaCheck),
            Phase::QuotaCheck,
            vec![Message::user(QUOTA_CHECK_PROMPT)],
        );
        if let Err(e) = self.call_model(session, check).await {
            warn!(session = %session.id(), error = %e, "Quota check failed, aborting run");
            return Err(LoopError::QuotaExceeded(e));
        }

        // ── TOPIC_DETECT ──
        let topic = ModelRequest::new(
            ModelRouter::select(Phase::TopicDetect),
            Phase::TopicDetect,
            vec![Message::user(topic_prompt(user_input))],
        );
        let answer = self
            .call_model(session, topic)
            .await
            .map_err(|source| LoopError::ModelCall {
                phase: Phase::TopicDetect,
                source,
            })?;
        if is_new_topic(&answer.content) {
            let title = title_for(user_input);
            debug!(session = %session.id(), title = %title, "New topic");
            self.events.publish(DomainEvent::TitleChanged {
                session: session.id().to_string(),
                title,
                timestamp: Utc::now(),
            });
        }

        // ── REMINDER_INJECT ──
        self.inject_reminders(session).await;
        if seat_input {
            session.context.push(Message::user(user_input));
        }

        // ── PROCESSING ──
        let mut iterations = 0;
        let mut status = RunStatus::Completed;
        loop {
            if iterations >= self.max_iterations {
                warn!(
                    session = %session.id(),
                    iterations,
                    "Iteration limit reached, stopping processing"
                );
                status = RunStatus::IterationLimit;
                break;
            }
            iterations += 1;
            debug!(session = %session.id(), depth = session.depth(), iteration = iterations, "Processing iteration");

            self.compact_if_needed(session).await?;

            let todos = self.dispatcher.todos().load(session.id()).await;
            if !todos.is_empty() {
                session.context.todo_list = todos;
            }

            let request = ModelRequest::new(
                ModelRouter::select(Phase::Processing),
                Phase::Processing,
                session.context.messages().to_vec(),
            )
            .with_tools(self.dispatcher.definitions().to_vec());
            let response = self
                .call_model(session, request)
                .await
                .map_err(|source| LoopError::ModelCall {
                    phase: Phase::Processing,
                    source,
                })?;

            session
                .context
                .push(Message::assistant(response.content.clone()).with_tool_calls(response.tool_calls.clone()));

            for call in &response.tool_calls {
                self.dispatcher.dispatch(call, session, self).await?;
            }

            if response.completion_signal || TodoItem::all_completed(&session.context.todo_list) {
                debug!(
                    session = %session.id(),
                    signalled = response.completion_signal,
                    "Exit condition met"
                );
                break;
            }
        }

        // ── SUMMARIZE ──
        let summary = self.summarize(session).await?;
        let final_response = extract_final_result(&session.context);

        info!(
            session = %session.id(),
            depth = session.depth(),
            iterations,
            status = ?status,
            "Run finished"
        );
        Ok(RunOutcome {
            status,
            iterations,
            final_response,
            summary,
        })
    }

    /// Environment reminder at index 0, todo reminder appended.
    async fn inject_reminders(&self, session: &mut AgentSession) {
        let todos = self.dispatcher.todos().load(session.id()).await;
        if !todos.is_empty() {
            session.context.todo_list = todos;
        }

        let env = Message::reminder(ENVIRONMENT_REMINDER, environment_reminder(&session.context));
        let has_env = session
            .context
            .messages()
            .first()
            .and_then(|m| m.reminder_kind())
            == Some(ENVIRONMENT_REMINDER);
        if has_env {
            session.context.replace(0, env);
        } else {
            session.context.insert(0, env);
        }

        let todo = Message::reminder(TODO_REMINDER, todo_reminder(&session.context.todo_list));
        session.context.push(todo);
    }

    async fn compact_if_needed(&self, session: &mut AgentSession) -> Result<(), LoopError> {
        if !needs_compaction(session.context.messages(), self.compaction_threshold) {
            return Ok(());
        }

        let messages_before = session.context.len();
        let tokens_before = estimate_messages_tokens(session.context.messages());
        info!(
            session = %session.id(),
            messages = messages_before,
            tokens = tokens_before,
            threshold = self.compaction_threshold,
            "Compacting context"
        );

        let request = compaction_request(session.context.messages());
        let response = self
            .call_model(session, request)
            .await
            .map_err(|e| LoopError::CompactionFailed(e.to_string()))?;
        session.context.replace_all(compacted_message(&response)?);

        self.events.publish(DomainEvent::ContextCompacted {
            session: session.id().to_string(),
            messages_before,
            tokens_before,
            timestamp: Utc::now(),
        });
        Ok(())
    }

    async fn summarize(&self, session: &mut AgentSession) -> Result<Option<String>, LoopError> {
        let mut transcript = session.context.messages().to_vec();
        transcript.push(Message::user(SUMMARY_PROMPT));
        let request = ModelRequest::new(ModelRouter::select(Phase::Summarize), Phase::Summarize, transcript);
        let response = self
            .call_model(session, request)
            .await
            .map_err(|source| LoopError::ModelCall {
                phase: Phase::Summarize,
                source,
            })?;

        let summary = response.content.trim().to_string();
        if summary.is_empty() {
            return Ok(None);
        }

        // Children report through their final result only.
        if session.depth() == 0
            && let Some(sink) = &self.summaries
            && let Err(e) = sink.save(session.id(), &summary).await
        {
            warn!(session = %session.id(), sink = sink.name(), error = %e, "Saving session summary failed");
        }
        Ok(Some(summary))
    }

    async fn call_model(&self, session: &mut AgentSession, request: ModelRequest) -> Result<ModelResponse, ProviderError> {
        session.tier = request.tier;
        debug!(
            session = %session.id(),
            depth = session.depth(),
            phase = %request.phase,
            tier = %request.tier,
            messages = request.messages.len(),
            "Model call"
        );
        self.events.publish(DomainEvent::PhaseEntered {
            session: session.id().to_string(),
            depth: session.depth(),
            phase: request.phase,
            timestamp: Utc::now(),
        });
        self.client.invoke(request).await
    }
}

impl ChildRunner for AgentLoop {
    fn run_child<'a>(&'a self, child: &'a mut AgentSession) -> BoxFuture<'a, Result<RunOutcome, LoopError>> {
        async move {
            let task = child
                .context
                .first_user_index()
                .map(|i| child.context.messages()[i].content.clone())
                .unwrap_or_default();
            self.execute(child, &task, false).await
        }
        .boxed()
    }
}
