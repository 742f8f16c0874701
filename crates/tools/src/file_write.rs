//! File write tool: write or create files with path validation.

use async_trait::async_trait;
use clawloop_core::error::ToolError;
use clawloop_core::tool::{ToolExecutor, ToolOutput};
use clawloop_security::PathPolicy;
use serde_json::json;

pub struct FileWriteTool {
    policy: PathPolicy,
}

impl FileWriteTool {
    pub fn new(policy: PathPolicy) -> Self {
        Self { policy }
    }
}

#[async_trait]
impl ToolExecutor for FileWriteTool {
    fn name(&self) -> &str {
        "file_write"
    }

    fn description(&self) -> &str {
        "Write content to a file. Creates the file and missing parent directories if needed, overwrites otherwise."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "The file path to write to"
                },
                "content": {
                    "type": "string",
                    "description": "The content to write"
                }
            },
            "required": ["path", "content"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolOutput, ToolError> {
        let path = arguments["path"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'path' argument".into()))?;
        let content = arguments["content"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'content' argument".into()))?;

        let resolved = self.policy.resolve(path).map_err(|e| ToolError::PermissionDenied {
            tool_name: "file_write".into(),
            reason: e.to_string(),
        })?;

        if let Some(parent) = resolved.parent()
            && let Err(e) = tokio::fs::create_dir_all(parent).await
        {
            return Ok(ToolOutput::failed(format!("Failed to create directories for {path}: {e}")));
        }

        match tokio::fs::write(&resolved, content).await {
            Ok(()) => Ok(ToolOutput::ok(format!("Wrote {} bytes to {path}", content.len()))
                .with_payload(json!({ "path": path, "bytes": content.len() }))),
            Err(e) => Ok(ToolOutput::failed(format!("Failed to write {path}: {e}"))),
        }
    }
}
