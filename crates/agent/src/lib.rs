//! The ClawLoop control loop.
//!
//! An [`AgentLoop`] drives one [`AgentSession`] through a run:
//!
//! 1. **Quota check** on the cheap tier; failure ends the run untouched
//! 2. **Topic detection**, publishing a title on a new topic
//! 3. **Reminder injection**: environment snapshot and todo memory
//! 4. **Processing**: compact if oversized, sync todos, call the primary
//!    tier, dispatch tool calls in order, until the model signals completion
//!    or every todo is done
//! 5. **Summarize** for the next session
//!
//! `Task` tool calls run a child session through the same loop, one level
//! down and with its own Context; only the child's final answer comes back.

pub mod compaction;
pub mod dispatcher;
pub mod error;
pub mod loop_runner;
pub mod prompts;
pub mod router;
pub mod session;
pub mod spawner;
pub mod todo_sync;
pub mod token;

#[cfg(test)]
mod test_helpers;

pub use dispatcher::{TASK_TOOL, TODO_READ_TOOL, TODO_WRITE_TOOL, ToolDispatcher};
pub use error::{LoopError, SpawnError};
pub use loop_runner::{AgentLoop, DEFAULT_COMPACTION_THRESHOLD, DEFAULT_MAX_ITERATIONS, RunOutcome, RunStatus};
pub use router::ModelRouter;
pub use session::{AgentSession, DEFAULT_MAX_DEPTH, SharedSession};
pub use spawner::{ChildRunner, SubAgentSpawner};
pub use todo_sync::TodoSynchronizer;
