//! Context compaction: size-triggered, lossy replacement of the whole
//! message history with one system message.

use clawloop_core::message::Message;
use clawloop_core::model::{ModelRequest, ModelResponse, Phase};

use crate::error::LoopError;
use crate::prompts::{COMPACTION_PROMPT, unwrap_compressed};
use crate::router::ModelRouter;
use crate::token::estimate_messages_tokens;

/// Metadata key marking the compacted transcript.
pub const COMPACTED_KEY: &str = "compacted";

/// True when the estimated size strictly exceeds `threshold` tokens.
pub fn needs_compaction(messages: &[Message], threshold: usize) -> bool {
    estimate_messages_tokens(messages) > threshold
}

/// The request that asks the model to compress `messages`.
pub fn compaction_request(messages: &[Message]) -> ModelRequest {
    let mut transcript = messages.to_vec();
    transcript.push(Message::user(COMPACTION_PROMPT));
    ModelRequest::new(
        ModelRouter::select(Phase::Compaction),
        Phase::Compaction,
        transcript,
    )
}

/// Turn the model's answer into the single replacement message.
///
/// An empty answer is a failure: replacing history with nothing would lose
/// everything without shrinking the problem.
pub fn compacted_message(response: &ModelResponse) -> Result<Message, LoopError> {
    let body = unwrap_compressed(&response.content);
    if body.is_empty() {
        return Err(LoopError::CompactionFailed(
            "model returned an empty transcript".into(),
        ));
    }
    let mut msg = Message::system(body);
    msg.metadata
        .insert(COMPACTED_KEY.into(), serde_json::Value::Bool(true));
    Ok(msg)
}
