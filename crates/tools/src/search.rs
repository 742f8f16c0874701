//! Workspace search tools: `glob` for file names, `grep` for file contents.
//!
//! Both walk the search root with `ignore`, honouring `.gitignore` unless the
//! caller opts out, and skip `.git/` and `target/`. Walking is blocking work
//! and runs on the blocking pool.

use async_trait::async_trait;
use clawloop_core::error::ToolError;
use clawloop_core::tool::{ToolExecutor, ToolOutput};
use clawloop_security::PathPolicy;
use ignore::WalkBuilder;
use serde_json::{Value, json};
use std::path::{Path, PathBuf};

const DEFAULT_LIMIT: usize = 200;

fn should_skip(rel: &Path) -> bool {
    rel.components()
        .any(|c| c.as_os_str() == ".git" || c.as_os_str() == "target")
}

fn walk(root: &Path, respect_gitignore: bool) -> Vec<PathBuf> {
    let mut builder = WalkBuilder::new(root);
    builder.hidden(false);
    builder.follow_links(false);
    builder.parents(respect_gitignore);
    builder.git_ignore(respect_gitignore);
    builder.git_global(respect_gitignore);
    builder.git_exclude(respect_gitignore);
    builder.require_git(false);

    builder
        .build()
        .filter_map(Result::ok)
        .map(|entry| entry.into_path())
        .filter(|p| p.strip_prefix(root).is_ok_and(|rel| !should_skip(rel)))
        .collect()
}

fn rel_string(path: &Path, root: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    if rel.as_os_str().is_empty() {
        return None;
    }
    Some(rel.to_string_lossy().replace('\\', "/"))
}

fn limit_arg(arguments: &Value) -> usize {
    arguments["limit"]
        .as_u64()
        .map(|v| v as usize)
        .unwrap_or(DEFAULT_LIMIT)
}

fn join_error(tool: &str, e: tokio::task::JoinError) -> ToolError {
    ToolError::ExecutionFailed {
        tool_name: tool.into(),
        reason: e.to_string(),
    }
}

pub struct GlobTool {
    policy: PathPolicy,
}

impl GlobTool {
    pub fn new(policy: PathPolicy) -> Self {
        Self { policy }
    }
}

#[async_trait]
impl ToolExecutor for GlobTool {
    fn name(&self) -> &str {
        "glob"
    }

    fn description(&self) -> &str {
        "Find files whose path (relative to the search root) matches a glob pattern such as 'src/**/*.rs'."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "pattern": { "type": "string", "description": "Glob pattern" },
                "path": { "type": "string", "description": "Search root (defaults to the working directory)" },
                "limit": { "type": "integer", "description": "Maximum matches", "default": DEFAULT_LIMIT },
                "respect_gitignore": { "type": "boolean", "default": true }
            },
            "required": ["pattern"]
        })
    }

    async fn execute(&self, arguments: Value) -> Result<ToolOutput, ToolError> {
        let pattern = arguments["pattern"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'pattern' argument".into()))?
            .to_string();
        let compiled = glob::Pattern::new(&pattern)
            .map_err(|e| ToolError::InvalidArguments(format!("Invalid glob pattern '{pattern}': {e}")))?;
        let root = self
            .policy
            .resolve(arguments["path"].as_str().unwrap_or("."))
            .map_err(|e| ToolError::PermissionDenied {
                tool_name: "glob".into(),
                reason: e.to_string(),
            })?;
        let limit = limit_arg(&arguments);
        let respect_gitignore = arguments["respect_gitignore"].as_bool().unwrap_or(true);

        let matches = tokio::task::spawn_blocking(move || {
            walk(&root, respect_gitignore)
                .iter()
                .filter_map(|p| rel_string(p, &root))
                .filter(|rel| compiled.matches(rel))
                .take(limit)
                .collect::<Vec<_>>()
        })
        .await
        .map_err(|e| join_error("glob", e))?;

        Ok(ToolOutput::ok(format!("{} match(es) for {pattern}", matches.len()))
            .with_payload(json!({ "pattern": pattern, "matches": matches })))
    }
}

pub struct GrepTool {
    policy: PathPolicy,
}

impl GrepTool {
    pub fn new(policy: PathPolicy) -> Self {
        Self { policy }
    }
}

#[async_trait]
impl ToolExecutor for GrepTool {
    fn name(&self) -> &str {
        "grep"
    }

    fn description(&self) -> &str {
        "Search file contents with a regular expression. Returns path, line number, and line text for each match."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "pattern": { "type": "string", "description": "Regular expression" },
                "path": { "type": "string", "description": "Search root (defaults to the working directory)" },
                "glob": { "type": "string", "description": "Only search files matching this glob", "default": "**/*" },
                "case_sensitive": { "type": "boolean", "default": true },
                "limit": { "type": "integer", "description": "Maximum matches", "default": DEFAULT_LIMIT },
                "respect_gitignore": { "type": "boolean", "default": true }
            },
            "required": ["pattern"]
        })
    }

    async fn execute(&self, arguments: Value) -> Result<ToolOutput, ToolError> {
        let pattern = arguments["pattern"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'pattern' argument".into()))?
            .to_string();
        let glob_pattern = arguments["glob"].as_str().unwrap_or("**/*").to_string();
        let case_sensitive = arguments["case_sensitive"].as_bool().unwrap_or(true);

        let file_filter = glob::Pattern::new(&glob_pattern).map_err(|e| {
            ToolError::InvalidArguments(format!("Invalid glob pattern '{glob_pattern}': {e}"))
        })?;
        let regex = regex::RegexBuilder::new(&pattern)
            .case_insensitive(!case_sensitive)
            .build()
            .map_err(|e| ToolError::InvalidArguments(format!("Invalid regex '{pattern}': {e}")))?;
        let root = self
            .policy
            .resolve(arguments["path"].as_str().unwrap_or("."))
            .map_err(|e| ToolError::PermissionDenied {
                tool_name: "grep".into(),
                reason: e.to_string(),
            })?;
        let limit = limit_arg(&arguments);
        let respect_gitignore = arguments["respect_gitignore"].as_bool().unwrap_or(true);

        let matches = tokio::task::spawn_blocking(move || {
            let mut matches = Vec::new();
            for path in walk(&root, respect_gitignore) {
                if !path.is_file() {
                    continue;
                }
                let Some(rel) = rel_string(&path, &root) else {
                    continue;
                };
                if !file_filter.matches(&rel) {
                    continue;
                }
                let Ok(bytes) = std::fs::read(&path) else {
                    continue;
                };
                // Skip binaries: NUL in the first block.
                if bytes.iter().take(8192).any(|b| *b == 0) {
                    continue;
                }
                let Ok(content) = String::from_utf8(bytes) else {
                    continue;
                };
                for (idx, line) in content.lines().enumerate() {
                    if regex.is_match(line) {
                        matches.push(json!({ "path": rel, "line": idx + 1, "text": line }));
                        if matches.len() >= limit {
                            return matches;
                        }
                    }
                }
            }
            matches
        })
        .await
        .map_err(|e| join_error("grep", e))?;

        Ok(ToolOutput::ok(format!("{} match(es) for /{pattern}/", matches.len()))
            .with_payload(json!({ "pattern": pattern, "glob": glob_pattern, "matches": matches })))
    }
}
