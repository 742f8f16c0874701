//! Context: the conversation state owned by exactly one agent.
//!
//! Messages are append-only; the only wholesale replacement is compaction.
//! Project metadata (working directory, instructions, commits, platform) is
//! copied by value into sub-agent contexts and never shared.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::message::{Message, Role};
use crate::todo::TodoItem;
use crate::workspace::Workspace;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Context {
    messages: Vec<Message>,

    /// In-memory todo list, replaced wholesale on load/save
    pub todo_list: Vec<TodoItem>,

    pub working_directory: PathBuf,

    pub project_instructions: String,

    pub recent_commits: Vec<String>,

    pub platform_info: BTreeMap<String, String>,

    /// Summary carried over from the previous session, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_summary: Option<String>,
}

impl Context {
    /// Create an empty context for the given workspace.
    pub fn new(workspace: Workspace) -> Self {
        Self {
            messages: Vec::new(),
            todo_list: Vec::new(),
            working_directory: workspace.working_directory,
            project_instructions: workspace.project_instructions,
            recent_commits: workspace.recent_commits,
            platform_info: workspace.platform_info,
            previous_summary: None,
        }
    }

    /// A fresh context for a delegated task: one user message, no todos,
    /// project metadata copied from `self`.
    pub fn for_task(&self, task_description: &str) -> Self {
        Self {
            messages: vec![Message::user(task_description)],
            todo_list: Vec::new(),
            working_directory: self.working_directory.clone(),
            project_instructions: self.project_instructions.clone(),
            recent_commits: self.recent_commits.clone(),
            platform_info: self.platform_info.clone(),
            previous_summary: None,
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Append a message.
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Insert a message at `index`. Used only for reminder placement.
    pub fn insert(&mut self, index: usize, message: Message) {
        let index = index.min(self.messages.len());
        self.messages.insert(index, message);
    }

    /// Replace the message at `index`. Used only for reminder placement.
    pub fn replace(&mut self, index: usize, message: Message) {
        if let Some(slot) = self.messages.get_mut(index) {
            *slot = message;
        }
    }

    /// Discard every message and keep only `compacted`.
    pub fn replace_all(&mut self, compacted: Message) {
        self.messages = vec![compacted];
    }

    /// Position of the first user message, if any.
    pub fn first_user_index(&self) -> Option<usize> {
        self.messages.iter().position(|m| m.role == Role::User)
    }

    /// The last assistant message that is a real answer (not a tool outcome
    /// or a permission denial).
    pub fn last_answer(&self) -> Option<&Message> {
        self.messages
            .iter()
            .rev()
            .find(|m| {
                m.role == Role::Assistant
                    && m.tool_results.is_empty()
                    && m.denied_call().is_none()
                    && !m.content.trim().is_empty()
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::ToolResult;

    fn workspace() -> Workspace {
        Workspace {
            working_directory: PathBuf::from("/repo"),
            project_instructions: "Use cargo fmt".into(),
            recent_commits: vec!["abc123 fix parser".into()],
            platform_info: BTreeMap::from([("os".to_string(), "linux".to_string())]),
        }
    }

    #[test]
    fn task_context_inherits_metadata_only() {
        let mut parent = Context::new(workspace());
        parent.push(Message::user("parent question"));
        parent.todo_list.push(TodoItem { id: 0, description: "x".into(), completed: false });

        let child = parent.for_task("find all TODOs");
        assert_eq!(child.len(), 1);
        assert_eq!(child.messages()[0].role, Role::User);
        assert_eq!(child.messages()[0].content, "find all TODOs");
        assert!(child.todo_list.is_empty());
        assert_eq!(child.working_directory, PathBuf::from("/repo"));
        assert_eq!(child.project_instructions, "Use cargo fmt");
        assert_eq!(child.recent_commits, parent.recent_commits);
        assert_eq!(child.platform_info, parent.platform_info);
    }

    #[test]
    fn replace_all_leaves_single_message() {
        let mut ctx = Context::new(workspace());
        ctx.push(Message::user("a"));
        ctx.push(Message::assistant("b"));
        ctx.replace_all(Message::system("summary"));
        assert_eq!(ctx.len(), 1);
        assert_eq!(ctx.messages()[0].role, Role::System);
    }

    #[test]
    fn last_answer_skips_tool_outcomes() {
        let mut ctx = Context::new(workspace());
        ctx.push(Message::assistant("found 3 files"));
        ctx.push(Message::tool_outcome(ToolResult::success("c1", "grep", "3 matches")));
        assert_eq!(ctx.last_answer().map(|m| m.content.as_str()), Some("found 3 files"));
    }
}
