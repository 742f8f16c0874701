//! Wiring shared by `run` and `chat`: config in, agent loop and root session out.

use std::sync::Arc;

use clawloop_agent::{AgentLoop, AgentSession};
use clawloop_config::AppConfig;
use clawloop_core::context::Context;
use clawloop_core::event::{DomainEvent, EventBus};
use clawloop_core::summary::SummarySink;
use clawloop_core::todo::SessionId;
use clawloop_core::workspace::{Workspace, platform_info};
use clawloop_memory::{FileSummarySink, FileTodoStore, NoopSummarySink};
use clawloop_providers::{OpenAiCompatClient, TierModels};
use clawloop_security::PolicyGate;
use tokio::sync::broadcast::error::RecvError;
use tracing::debug;

use crate::prompt::StdinPrompt;

pub fn build_agent(config: &AppConfig, interactive: bool) -> Result<AgentLoop, Box<dyn std::error::Error>> {
    if !config.has_api_key() {
        print_key_help();
        return Err("No API key found. See above for setup instructions.".into());
    }

    let client = OpenAiCompatClient::from_config(&config.provider, TierModels::from(&config.tiers))?;
    let cwd = std::env::current_dir()?;
    let tools = clawloop_tools::default_registry(&cwd, &config.permissions);

    let mut gate = PolicyGate::new(&config.permissions);
    if interactive {
        gate = gate.with_prompt(Arc::new(StdinPrompt));
    }

    let summaries: Arc<dyn SummarySink> = if config.summaries.enabled {
        Arc::new(FileSummarySink::new(&config.summaries.dir))
    } else {
        Arc::new(NoopSummarySink)
    };

    let events = Arc::new(EventBus::default());
    spawn_event_printer(&events);

    Ok(AgentLoop::new(
        Arc::new(client),
        &tools,
        Arc::new(gate),
        Arc::new(FileTodoStore::new(&config.todos.dir)),
        events,
    )
    .with_summary_sink(summaries)
    .with_compaction_threshold(config.agent.compaction_threshold_tokens)
    .with_max_iterations(config.agent.max_iterations as usize))
}

/// The root session for this invocation.
///
/// The id comes from `--session`, then `agent.session_id`, then a fresh UUID.
pub async fn root_session(
    agent: &AgentLoop,
    config: &AppConfig,
    session: Option<String>,
) -> Result<AgentSession, Box<dyn std::error::Error>> {
    let id = session
        .or_else(|| config.agent.session_id.clone())
        .map(|s| SessionId::from(&s))
        .unwrap_or_else(SessionId::new);

    let cwd = std::env::current_dir()?;
    let workspace = if config.workspace.load_project_instructions {
        Workspace::load(cwd, Some(config.workspace.instructions_file.as_path()))
    } else {
        Workspace {
            working_directory: cwd,
            platform_info: platform_info(),
            ..Workspace::default()
        }
    };

    let mut context = Context::new(workspace);
    agent.load_previous_summary(&mut context).await;
    debug!(
        session = %id,
        max_depth = config.agent.max_depth,
        previous_summary = context.previous_summary.is_some(),
        "Root session ready"
    );
    Ok(AgentSession::root(id, context, config.agent.max_depth))
}

/// Surface the events a terminal user cares about on stderr.
fn spawn_event_printer(events: &Arc<EventBus>) {
    let mut rx = events.subscribe();
    tokio::spawn(async move {
        loop {
            let event = match rx.recv().await {
                Ok(event) => event,
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            };
            match event.as_ref() {
                DomainEvent::TitleChanged { title, .. } => eprintln!("  ── {title} ──"),
                DomainEvent::SubAgentSpawned { child_session, .. } => {
                    eprintln!("  ↳ sub-agent {child_session} started")
                }
                DomainEvent::ContextCompacted { messages_before, .. } => {
                    eprintln!("  (compacted {messages_before} messages)")
                }
                _ => {}
            }
        }
    });
}

fn print_key_help() {
    eprintln!();
    eprintln!("  ERROR: No API key configured!");
    eprintln!();
    eprintln!("  Set one of these environment variables:");
    eprintln!("    CLAWLOOP_API_KEY    = 'sk-...'         (generic)");
    eprintln!("    OPENROUTER_API_KEY  = 'sk-or-v1-...'   (recommended)");
    eprintln!("    OPENAI_API_KEY      = 'sk-...'         (for OpenAI direct)");
    eprintln!();
    eprintln!("  Or add it to the [provider] section of:");
    eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
    eprintln!();
}
