//! File read tool: read file contents with path validation.

use async_trait::async_trait;
use clawloop_core::error::ToolError;
use clawloop_core::tool::{ToolExecutor, ToolOutput};
use clawloop_security::PathPolicy;
use serde_json::json;

/// Files larger than this are truncated in the payload.
const MAX_READ_BYTES: usize = 256 * 1024;

pub struct FileReadTool {
    policy: PathPolicy,
}

impl FileReadTool {
    pub fn new(policy: PathPolicy) -> Self {
        Self { policy }
    }
}

#[async_trait]
impl ToolExecutor for FileReadTool {
    fn name(&self) -> &str {
        "file_read"
    }

    fn description(&self) -> &str {
        "Read the contents of a file. Relative paths resolve against the working directory."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "The file path to read"
                }
            },
            "required": ["path"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolOutput, ToolError> {
        let path = arguments["path"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'path' argument".into()))?;

        let resolved = self.policy.resolve(path).map_err(|e| ToolError::PermissionDenied {
            tool_name: "file_read".into(),
            reason: e.to_string(),
        })?;

        match tokio::fs::read_to_string(&resolved).await {
            Ok(mut content) => {
                let lines = content.lines().count();
                let truncated = content.len() > MAX_READ_BYTES;
                if truncated {
                    let mut cut = MAX_READ_BYTES;
                    while !content.is_char_boundary(cut) {
                        cut -= 1;
                    }
                    content.truncate(cut);
                }
                Ok(ToolOutput::ok(format!("Read {path} ({lines} lines)")).with_payload(json!({
                    "path": path,
                    "content": content,
                    "truncated": truncated,
                })))
            }
            Err(e) => Ok(ToolOutput::failed(format!("Failed to read {path}: {e}"))),
        }
    }
}
