//! # ClawLoop Core
//!
//! Domain types, collaborator traits, and error definitions for the ClawLoop
//! agent control loop. This crate has **no framework dependencies**: it defines
//! the domain model that every other crate implements against.
//!
//! ## Design Philosophy
//!
//! Everything the control loop talks to is a trait here: the model backend
//! (`ModelClient`), tool implementations (`ToolExecutor`), the permission prompt
//! (`PermissionGate`), todo persistence (`TodoStore`) and the session summary
//! sink (`SummarySink`). Implementations live in their own crates, which keeps
//! the loop testable with in-memory stand-ins.

pub mod context;
pub mod error;
pub mod event;
pub mod message;
pub mod model;
pub mod permission;
pub mod summary;
pub mod todo;
pub mod tool;
pub mod workspace;

// Re-export key types at crate root for ergonomics
pub use context::Context;
pub use error::{ProviderError, StoreError, ToolError};
pub use event::{DomainEvent, EventBus};
pub use message::{Message, Role};
pub use model::{ModelClient, ModelRequest, ModelResponse, ModelTier, Phase, Usage};
pub use permission::PermissionGate;
pub use summary::SummarySink;
pub use todo::{SessionId, SnapshotId, TodoItem, TodoRecord, TodoStore};
pub use tool::{ToolCall, ToolDefinition, ToolExecutor, ToolOutput, ToolRegistry, ToolResult};
pub use workspace::Workspace;
