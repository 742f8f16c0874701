//! Prompt text the loop sends on its own behalf.

use clawloop_core::context::Context;
use clawloop_core::todo::TodoItem;
use std::fmt::Write;

/// Reminder kinds, stored in message metadata.
pub const ENVIRONMENT_REMINDER: &str = "environment";
pub const TODO_REMINDER: &str = "todo";

/// Body of the quota check.
pub const QUOTA_CHECK_PROMPT: &str = "quota";

/// Marker the topic classifier answers with for a new topic.
pub const NEW_TOPIC_MARKER: &str = "new_topic";

/// Maximum title length published on a topic change.
pub const TITLE_MAX_CHARS: usize = 60;

/// Returned as a sub-agent result when the child never answered in prose.
pub const NO_FINAL_ANSWER: &str = "Sub-agent finished without a final answer.";

pub const COMPACTION_PROMPT: &str = "Compress the conversation above into a single block of text. \
Preserve every important fact, decision, file path, open question and pending task. \
Answer with the compressed text only, wrapped in <compressed_context>...</compressed_context>.";

pub const SUMMARY_PROMPT: &str = "Summarize this session for future reference. \
Include key decisions, completed tasks, and any pending items. Be brief.";

pub fn topic_prompt(user_input: &str) -> String {
    format!(
        "Is the following message a new topic, or a continuation of an ongoing conversation? \
Answer with exactly `{NEW_TOPIC_MARKER}` or `continuation`.\n\n{user_input}"
    )
}

/// Whether a topic-detection answer classifies the input as new.
pub fn is_new_topic(answer: &str) -> bool {
    answer.to_lowercase().contains(NEW_TOPIC_MARKER)
}

/// First line of the input, at most [`TITLE_MAX_CHARS`] characters.
pub fn title_for(user_input: &str) -> String {
    user_input
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("")
        .chars()
        .take(TITLE_MAX_CHARS)
        .collect()
}

/// Environment snapshot placed at the start of the conversation.
pub fn environment_reminder(context: &Context) -> String {
    let mut out = String::from("<system-reminder>\n# Environment\n");
    let _ = writeln!(out, "Working directory: {}", context.working_directory.display());
    for (key, value) in &context.platform_info {
        let _ = writeln!(out, "{key}: {value}");
    }

    if !context.recent_commits.is_empty() {
        out.push_str("\n# Recent commits\n");
        for commit in &context.recent_commits {
            let _ = writeln!(out, "- {commit}");
        }
    }

    if !context.project_instructions.is_empty() {
        out.push_str("\n# Project instructions\n");
        out.push_str(&context.project_instructions);
        out.push('\n');
    }

    if let Some(summary) = &context.previous_summary {
        out.push_str("\n# Previous session\n");
        out.push_str(summary);
        out.push('\n');
    }

    out.push_str("</system-reminder>");
    out
}

/// Todo-memory reminder appended after the environment snapshot.
pub fn todo_reminder(todos: &[TodoItem]) -> String {
    let mut out = String::from("<system-reminder>\n");
    if todos.is_empty() {
        out.push_str(
            "The todo list is empty. For multi-step work, record the steps with TodoWrite \
and mark each one completed as you finish it.\n",
        );
    } else {
        out.push_str("Current todo list:\n");
        for item in todos {
            let mark = if item.completed { "x" } else { " " };
            let _ = writeln!(out, "{}. [{mark}] {}", item.id, item.description);
        }
        out.push_str("Keep it current with TodoWrite.\n");
    }
    out.push_str("</system-reminder>");
    out
}

/// Strip the optional `<compressed_context>` wrapper.
pub fn unwrap_compressed(text: &str) -> &str {
    let trimmed = text.trim();
    trimmed
        .strip_prefix("<compressed_context>")
        .and_then(|rest| rest.strip_suffix("</compressed_context>"))
        .map(str::trim)
        .unwrap_or(trimmed)
}
