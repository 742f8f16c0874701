//! Message domain type.
//!
//! Messages are the unit of conversation state: the control loop appends them
//! to a [`Context`](crate::context::Context), the model client reads them, and
//! compaction replaces them wholesale.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::tool::{ToolCall, ToolResult};

/// Metadata key marking a message injected by the control loop as a reminder.
pub const REMINDER_KEY: &str = "reminder";

/// Metadata key carrying the call id a permission denial refers to.
pub const DENIED_CALL_KEY: &str = "denied_call";

/// The role of a message sender in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The end user
    User,
    /// The model, including folded tool outcomes
    Assistant,
    /// Instructions and reminders injected by the loop
    System,
}

/// A single message in a conversation. Immutable once appended.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Unique message ID
    pub id: String,

    /// Who sent this message
    pub role: Role,

    /// The text content
    pub content: String,

    /// Tool calls requested by the model, in emission order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,

    /// Tool outcomes folded back into the conversation
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_results: Vec<ToolResult>,

    /// Timestamp
    pub timestamp: DateTime<Utc>,

    /// Optional metadata (reminder kind, denial markers, ...)
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl Message {
    fn with_role(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_results: Vec::new(),
            timestamp: Utc::now(),
            metadata: serde_json::Map::new(),
        }
    }

    /// Create a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role(Role::User, content)
    }

    /// Create a new assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::with_role(Role::Assistant, content)
    }

    /// Create a new system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::with_role(Role::System, content)
    }

    /// Create a system message tagged as a loop-injected reminder.
    pub fn reminder(kind: &str, content: impl Into<String>) -> Self {
        let mut msg = Self::system(content);
        msg.metadata
            .insert(REMINDER_KEY.into(), serde_json::Value::String(kind.into()));
        msg
    }

    /// Create an assistant message carrying one tool outcome.
    pub fn tool_outcome(result: ToolResult) -> Self {
        let mut msg = Self::assistant(format!("{}: {}", result.tool_name, result.summary));
        msg.tool_results.push(result);
        msg
    }

    /// Create the assistant message recorded when the permission gate refuses
    /// `call`. It carries no tool result.
    pub fn denial(call: &ToolCall) -> Self {
        let mut msg = Self::assistant(format!("Permission denied for tool '{}'", call.name));
        msg.metadata
            .insert(DENIED_CALL_KEY.into(), serde_json::Value::String(call.id.clone()));
        msg
    }

    /// Attach the tool calls the model requested.
    pub fn with_tool_calls(mut self, tool_calls: Vec<ToolCall>) -> Self {
        self.tool_calls = tool_calls;
        self
    }

    /// The reminder kind, if this message was injected as a reminder.
    pub fn reminder_kind(&self) -> Option<&str> {
        self.metadata.get(REMINDER_KEY).and_then(|v| v.as_str())
    }

    /// The call id this message denies, if it is a permission denial.
    pub fn denied_call(&self) -> Option<&str> {
        self.metadata.get(DENIED_CALL_KEY).and_then(|v| v.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_user_message() {
        let msg = Message::user("Hello, agent!");
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.content, "Hello, agent!");
        assert!(msg.tool_calls.is_empty());
        assert!(msg.tool_results.is_empty());
    }

    #[test]
    fn denial_has_no_tool_results() {
        let call = ToolCall::new("c7", "shell", serde_json::json!({"command": "ls"}));
        let msg = Message::denial(&call);
        assert_eq!(msg.role, Role::Assistant);
        assert!(msg.tool_results.is_empty());
        assert_eq!(msg.denied_call(), Some("c7"));
        assert!(msg.content.contains("shell"));
    }

    #[test]
    fn reminder_is_tagged_system_message() {
        let msg = Message::reminder("environment", "cwd: /tmp");
        assert_eq!(msg.role, Role::System);
        assert_eq!(msg.reminder_kind(), Some("environment"));
        assert_eq!(Message::system("plain").reminder_kind(), None);
    }

    #[test]
    fn tool_outcome_carries_result() {
        let result = ToolResult::success("call_1", "grep", "3 matches");
        let msg = Message::tool_outcome(result);
        assert_eq!(msg.role, Role::Assistant);
        assert_eq!(msg.tool_results.len(), 1);
        assert!(msg.content.contains("3 matches"));
    }

    #[test]
    fn message_serialization_skips_empty_collections() {
        let msg = Message::user("Test message");
        let json = serde_json::to_string(&msg).unwrap();
        assert!(!json.contains("tool_calls"));
        let deserialized: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized.content, "Test message");
        assert_eq!(deserialized.role, Role::User);
    }
}
