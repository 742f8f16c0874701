//! PermissionGate trait: the user-facing approval prompt for side-effecting tools.

use async_trait::async_trait;

use crate::tool::ToolCall;

/// Decides whether a generic tool call may run.
///
/// The dispatcher consults the gate before every call that is not internal
/// bookkeeping (`Task`, `TodoWrite`, `TodoRead`). A `false` answer means the
/// call is skipped and a denial record is appended to the conversation.
#[async_trait]
pub trait PermissionGate: Send + Sync {
    /// A human-readable name for this gate (e.g., "policy", "interactive").
    fn name(&self) -> &str;

    /// Ask whether `call` may execute.
    async fn request(&self, call: &ToolCall) -> bool;
}
