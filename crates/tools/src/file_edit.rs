//! File edit tool: exact string replacement inside an existing file.

use async_trait::async_trait;
use clawloop_core::error::ToolError;
use clawloop_core::tool::{ToolExecutor, ToolOutput};
use clawloop_security::PathPolicy;
use serde_json::json;

pub struct FileEditTool {
    policy: PathPolicy,
}

impl FileEditTool {
    pub fn new(policy: PathPolicy) -> Self {
        Self { policy }
    }
}

/// Replace `search` with `replace` in `content`.
///
/// Without `replace_all` the search text must occur exactly once, so the
/// model cannot silently edit the wrong site.
fn apply_edit(content: &str, search: &str, replace: &str, replace_all: bool) -> Result<(String, usize), String> {
    if search.is_empty() {
        return Err("'old_string' must not be empty".into());
    }
    let count = content.matches(search).count();
    match (count, replace_all) {
        (0, _) => Err("'old_string' not found".into()),
        (n, false) if n > 1 => Err(format!(
            "'old_string' occurs {n} times; pass replace_all or add surrounding context"
        )),
        (n, true) => Ok((content.replace(search, replace), n)),
        (_, false) => Ok((content.replacen(search, replace, 1), 1)),
    }
}

#[async_trait]
impl ToolExecutor for FileEditTool {
    fn name(&self) -> &str {
        "file_edit"
    }

    fn description(&self) -> &str {
        "Replace an exact string in an existing file. The string must be unique unless replace_all is true."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "path": { "type": "string", "description": "File to edit" },
                "old_string": { "type": "string", "description": "Exact text to replace" },
                "new_string": { "type": "string", "description": "Replacement text" },
                "replace_all": { "type": "boolean", "description": "Replace every occurrence", "default": false }
            },
            "required": ["path", "old_string", "new_string"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolOutput, ToolError> {
        let path = arguments["path"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'path' argument".into()))?;
        let old_string = arguments["old_string"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'old_string' argument".into()))?;
        let new_string = arguments["new_string"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'new_string' argument".into()))?;
        let replace_all = arguments["replace_all"].as_bool().unwrap_or(false);

        let resolved = self.policy.resolve(path).map_err(|e| ToolError::PermissionDenied {
            tool_name: "file_edit".into(),
            reason: e.to_string(),
        })?;

        let before = match tokio::fs::read_to_string(&resolved).await {
            Ok(c) => c,
            Err(e) => return Ok(ToolOutput::failed(format!("Failed to read {path}: {e}"))),
        };

        let (after, replacements) = match apply_edit(&before, old_string, new_string, replace_all) {
            Ok(r) => r,
            Err(reason) => return Ok(ToolOutput::failed(format!("Edit of {path} failed: {reason}"))),
        };

        if let Err(e) = tokio::fs::write(&resolved, &after).await {
            return Ok(ToolOutput::failed(format!("Failed to write {path}: {e}")));
        }

        Ok(ToolOutput::ok(format!("Edited {path} ({replacements} replacement(s))"))
            .with_payload(json!({ "path": path, "replacements": replacements })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_match_is_replaced() {
        let (out, n) = apply_edit("let x = 1;", "1", "2", false).unwrap();
        assert_eq!(out, "let x = 2;");
        assert_eq!(n, 1);
    }

    #[test]
    fn ambiguous_match_needs_replace_all() {
        assert!(apply_edit("a a", "a", "b", false).is_err());
        let (out, n) = apply_edit("a a", "a", "b", true).unwrap();
        assert_eq!(out, "b b");
        assert_eq!(n, 2);
    }

    #[test]
    fn missing_and_empty_search() {
        assert!(apply_edit("abc", "z", "y", false).is_err());
        assert!(apply_edit("abc", "", "y", true).is_err());
    }

    #[tokio::test]
    async fn edits_file_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("main.rs"), "fn main() { old(); }").unwrap();
        let tool = FileEditTool::new(PathPolicy::new(dir.path()));

        let output = tool
            .execute(json!({"path": "main.rs", "old_string": "old()", "new_string": "new()"}))
            .await
            .unwrap();
        assert!(output.success);
        assert_eq!(
            std::fs::read_to_string(dir.path().join("main.rs")).unwrap(),
            "fn main() { new(); }"
        );
    }

    #[tokio::test]
    async fn failed_edit_leaves_file_untouched() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("f.txt"), "same").unwrap();
        let tool = FileEditTool::new(PathPolicy::new(dir.path()));

        let output = tool
            .execute(json!({"path": "f.txt", "old_string": "absent", "new_string": "x"}))
            .await
            .unwrap();
        assert!(!output.success);
        assert_eq!(std::fs::read_to_string(dir.path().join("f.txt")).unwrap(), "same");
    }
}
