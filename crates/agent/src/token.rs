//! Token estimation utilities.
//!
//! Character heuristic: ~4 characters per token, rounded up, plus a fixed
//! per-message overhead for role and delimiters. Tool calls and results count
//! by their serialized JSON length.

use clawloop_core::message::Message;

const MESSAGE_OVERHEAD: usize = 4;

/// Estimate the token count for a string.
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(4)
}

/// Estimate tokens for a single message including per-message overhead.
pub fn estimate_message_tokens(message: &Message) -> usize {
    let mut tokens = MESSAGE_OVERHEAD + estimate_tokens(&message.content);
    if !message.tool_calls.is_empty() {
        let json = serde_json::to_string(&message.tool_calls).unwrap_or_default();
        tokens += estimate_tokens(&json);
    }
    if !message.tool_results.is_empty() {
        let json = serde_json::to_string(&message.tool_results).unwrap_or_default();
        tokens += estimate_tokens(&json);
    }
    tokens
}

/// Estimate tokens for a slice of messages.
pub fn estimate_messages_tokens(messages: &[Message]) -> usize {
    messages.iter().map(estimate_message_tokens).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clawloop_core::tool::{ToolCall, ToolResult};

    #[test]
    fn empty_string_is_zero() {
        assert_eq!(estimate_tokens(""), 0);
    }

    #[test]
    fn four_chars_is_one_token() {
        assert_eq!(estimate_tokens("test"), 1);
    }

    #[test]
    fn five_chars_rounds_up() {
        assert_eq!(estimate_tokens("hello"), 2);
    }

    #[test]
    fn counts_characters_not_bytes() {
        // Four chars, twelve bytes.
        assert_eq!(estimate_tokens("日本語だ"), 1);
        assert_eq!(estimate_tokens("héllo"), 2);
    }

    #[test]
    fn message_includes_overhead() {
        let msg = Message::user("test");
        assert_eq!(estimate_message_tokens(&msg), 5);
    }

    #[test]
    fn multiple_messages() {
        let msgs = vec![Message::user("hello"), Message::assistant("hi")];
        // (4 + 2) + (4 + 1)
        assert_eq!(estimate_messages_tokens(&msgs), 11);
    }

    #[test]
    fn tool_payloads_count() {
        let plain = Message::assistant("x");
        let with_call = Message::assistant("x").with_tool_calls(vec![ToolCall::new(
            "c1",
            "grep",
            serde_json::json!({"pattern": "a".repeat(400)}),
        )]);
        assert!(estimate_message_tokens(&with_call) > estimate_message_tokens(&plain) + 100);

        let outcome = Message::tool_outcome(ToolResult::success("c1", "grep", "ok"));
        assert!(estimate_message_tokens(&outcome) > MESSAGE_OVERHEAD + estimate_tokens(&outcome.content));
    }
}
