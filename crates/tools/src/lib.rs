//! Built-in tool implementations for ClawLoop.
//!
//! Tools give the agent the ability to act on the working directory:
//! run shell commands, read, write and edit files, list directories,
//! search by file name or content, and fetch web pages. Every file tool
//! resolves paths through a [`PathPolicy`].

pub mod exit_plan_mode;
pub mod file_edit;
pub mod file_read;
pub mod file_write;
pub mod list_dir;
pub mod search;
pub mod shell;
pub mod web_fetch;

use clawloop_config::PermissionConfig;
use clawloop_core::tool::ToolRegistry;
use clawloop_security::PathPolicy;
use std::path::Path;
use std::sync::Arc;

pub use exit_plan_mode::ExitPlanModeTool;
pub use file_edit::FileEditTool;
pub use file_read::FileReadTool;
pub use file_write::FileWriteTool;
pub use list_dir::ListDirTool;
pub use search::{GlobTool, GrepTool};
pub use shell::ShellTool;
pub use web_fetch::WebFetchTool;

/// Create a registry with every built-in tool, scoped to `working_directory`.
///
/// Path restrictions and the shell allowlist come from `permissions`.
pub fn default_registry(working_directory: &Path, permissions: &PermissionConfig) -> ToolRegistry {
    let policy = PathPolicy::from_config(working_directory, permissions);

    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(ShellTool::new(
        working_directory,
        permissions.allowed_commands.clone(),
    )));
    registry.register(Arc::new(FileReadTool::new(policy.clone())));
    registry.register(Arc::new(FileWriteTool::new(policy.clone())));
    registry.register(Arc::new(FileEditTool::new(policy.clone())));
    registry.register(Arc::new(ListDirTool::new(policy.clone())));
    registry.register(Arc::new(GlobTool::new(policy.clone())));
    registry.register(Arc::new(GrepTool::new(policy)));
    registry.register(Arc::new(ExitPlanModeTool));
    registry.register(Arc::new(WebFetchTool::new()));
    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_registry_has_all_tools() {
        let registry = default_registry(Path::new("."), &PermissionConfig::default());
        let mut names = registry.names();
        names.sort();
        assert_eq!(
            names,
            vec![
                "exit_plan_mode",
                "file_edit",
                "file_read",
                "file_write",
                "glob",
                "grep",
                "list_dir",
                "shell",
                "web_fetch"
            ]
        );
    }
}
