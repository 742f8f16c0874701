//! Shell tool: execute system commands.
//!
//! Supports command allowlisting, working-directory scoping, and timeout.

use async_trait::async_trait;
use clawloop_core::error::ToolError;
use clawloop_core::tool::{ToolExecutor, ToolOutput};
use serde_json::json;
use std::path::PathBuf;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Execute shell commands with safety constraints.
pub struct ShellTool {
    /// If non-empty, only these commands are allowed.
    allowed_commands: Vec<String>,
    working_directory: PathBuf,
    timeout: Duration,
}

impl ShellTool {
    pub fn new(working_directory: impl Into<PathBuf>, allowed_commands: Vec<String>) -> Self {
        Self {
            allowed_commands,
            working_directory: working_directory.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn is_command_allowed(&self, command: &str) -> bool {
        if self.allowed_commands.is_empty() {
            return true;
        }

        let base_cmd = command.split_whitespace().next().unwrap_or("").trim();
        self.allowed_commands.iter().any(|a| a == base_cmd)
    }
}

#[async_trait]
impl ToolExecutor for ShellTool {
    fn name(&self) -> &str {
        "shell"
    }

    fn description(&self) -> &str {
        "Execute a shell command in the working directory and return stdout/stderr."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "command": {
                    "type": "string",
                    "description": "The shell command to execute"
                }
            },
            "required": ["command"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolOutput, ToolError> {
        let command = arguments["command"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'command' argument".into()))?;

        if !self.is_command_allowed(command) {
            return Err(ToolError::PermissionDenied {
                tool_name: "shell".into(),
                reason: format!(
                    "Command '{}' not in allowlist",
                    command.split_whitespace().next().unwrap_or("")
                ),
            });
        }

        debug!(command = %command, cwd = %self.working_directory.display(), "Executing shell command");

        let mut cmd = if cfg!(target_os = "windows") {
            let mut c = Command::new("cmd");
            c.args(["/C", command]);
            c
        } else {
            let mut c = Command::new("sh");
            c.args(["-c", command]);
            c
        };
        cmd.current_dir(&self.working_directory).kill_on_drop(true);

        let output = tokio::time::timeout(self.timeout, cmd.output())
            .await
            .map_err(|_| ToolError::Timeout {
                tool_name: "shell".into(),
                timeout_secs: self.timeout.as_secs(),
            })?
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: "shell".into(),
                reason: e.to_string(),
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        let code = output.status.code().unwrap_or(-1);
        let payload = json!({
            "command": command,
            "exit_code": code,
            "stdout": stdout,
            "stderr": stderr,
        });

        if output.status.success() {
            let first_line = stdout.lines().next().unwrap_or("").trim();
            let summary = if first_line.is_empty() {
                format!("`{command}` succeeded")
            } else {
                format!("`{command}` succeeded: {first_line}")
            };
            Ok(ToolOutput::ok(summary).with_payload(payload))
        } else {
            warn!(command = %command, exit_code = code, "Command failed");
            Ok(ToolOutput::failed(format!("`{command}` exited with code {code}")).with_payload(payload))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allowlist_check() {
        let tool = ShellTool::new(".", vec!["ls".into(), "cat".into(), "git".into()]);
        assert!(tool.is_command_allowed("ls -la"));
        assert!(tool.is_command_allowed("git status"));
        assert!(!tool.is_command_allowed("rm -rf /"));
        assert!(!tool.is_command_allowed("sudo something"));
    }

    #[test]
    fn empty_allowlist_allows_all() {
        let tool = ShellTool::new(".", vec![]);
        assert!(tool.is_command_allowed("anything goes"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn runs_in_working_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("marker.txt"), "").unwrap();
        let tool = ShellTool::new(dir.path(), vec![]);
        let output = tool.execute(json!({"command": "ls"})).await.unwrap();
        assert!(output.success);
        let payload = output.payload.unwrap();
        assert!(payload["stdout"].as_str().unwrap().contains("marker.txt"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn nonzero_exit_is_a_failed_output() {
        let tool = ShellTool::new(".", vec![]);
        let output = tool.execute(json!({"command": "exit 3"})).await.unwrap();
        assert!(!output.success);
        assert_eq!(output.payload.unwrap()["exit_code"], 3);
    }

    #[tokio::test]
    async fn blocked_command() {
        let tool = ShellTool::new(".", vec!["ls".into()]);
        let result = tool.execute(json!({"command": "rm -rf /"})).await;
        assert!(matches!(result, Err(ToolError::PermissionDenied { .. })));
    }

    #[tokio::test]
    async fn missing_command_argument() {
        let tool = ShellTool::new(".", vec![]);
        let result = tool.execute(json!({})).await;
        assert!(matches!(result, Err(ToolError::InvalidArguments(_))));
    }
}
