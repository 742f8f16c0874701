//! Security module for ClawLoop: permission gates and path sandboxing.
//!
//! Provides:
//! - **Permission gates**: policy, auto-approve and deny-all implementations
//!   of `clawloop_core::PermissionGate`
//! - **Path validation**: filesystem sandboxing for the file tools

pub mod gate;
pub mod path;

pub use gate::{ApprovalPrompt, AutoApprove, DenyAll, PolicyGate};
pub use path::{PathPolicy, PathValidationError};
