//! `clawloop todos`: inspect persisted todo lists.

use std::sync::Arc;

use clawloop_agent::TodoSynchronizer;
use clawloop_config::AppConfig;
use clawloop_core::event::EventBus;
use clawloop_core::todo::{SessionId, TodoItem};
use clawloop_memory::{FileTodoStore, session_from_file_name};

pub async fn run(session: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let store = FileTodoStore::new(&config.todos.dir);

    let Some(session) = session.or_else(|| config.agent.session_id.clone()) else {
        let sessions = list_sessions(&store)?;
        if sessions.is_empty() {
            println!("  No todo lists under {}", store.root().display());
        } else {
            println!("  Sessions with todo lists:");
            for s in sessions {
                println!("    {s}");
            }
        }
        return Ok(());
    };

    let sync = TodoSynchronizer::new(Arc::new(store), Arc::new(EventBus::default()));
    let items = sync.load(&SessionId::from(&session)).await;
    print!("{}", render(&session, &items));
    Ok(())
}

fn list_sessions(store: &FileTodoStore) -> std::io::Result<Vec<String>> {
    let read_dir = match std::fs::read_dir(store.root()) {
        Ok(rd) => rd,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };
    let mut names: Vec<String> = read_dir
        .filter_map(Result::ok)
        .filter(|e| e.path().is_dir())
        .filter_map(|e| e.file_name().to_str().and_then(session_from_file_name))
        .map(|id| id.0)
        .collect();
    names.sort();
    Ok(names)
}

fn render(session: &str, items: &[TodoItem]) -> String {
    if items.is_empty() {
        return format!("  No todos for session {session}\n");
    }
    let done = items.iter().filter(|i| i.completed).count();
    let mut out = format!("  Todos for {session} ({done}/{} done)\n", items.len());
    for item in items {
        let mark = if item.completed { "x" } else { " " };
        out.push_str(&format!("    {}. [{mark}] {}\n", item.id, item.description));
    }
    out
}
