//! Directory listing tool.

use async_trait::async_trait;
use clawloop_core::error::ToolError;
use clawloop_core::tool::{ToolExecutor, ToolOutput};
use clawloop_security::PathPolicy;
use serde_json::json;

pub struct ListDirTool {
    policy: PathPolicy,
}

impl ListDirTool {
    pub fn new(policy: PathPolicy) -> Self {
        Self { policy }
    }
}

#[async_trait]
impl ToolExecutor for ListDirTool {
    fn name(&self) -> &str {
        "list_dir"
    }

    fn description(&self) -> &str {
        "List the entries of a directory. Directories are suffixed with '/'."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Directory to list (defaults to the working directory)"
                }
            }
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolOutput, ToolError> {
        let path = arguments["path"].as_str().unwrap_or(".");
        let resolved = self.policy.resolve(path).map_err(|e| ToolError::PermissionDenied {
            tool_name: "list_dir".into(),
            reason: e.to_string(),
        })?;

        let mut read_dir = match tokio::fs::read_dir(&resolved).await {
            Ok(rd) => rd,
            Err(e) => return Ok(ToolOutput::failed(format!("Failed to list {path}: {e}"))),
        };

        let mut entries = Vec::new();
        while let Ok(Some(entry)) = read_dir.next_entry().await {
            let mut name = entry.file_name().to_string_lossy().into_owned();
            if entry.file_type().await.is_ok_and(|t| t.is_dir()) {
                name.push('/');
            }
            entries.push(name);
        }
        entries.sort();

        Ok(ToolOutput::ok(format!("{} entries in {path}", entries.len()))
            .with_payload(json!({ "path": path, "entries": entries })))
    }
}
