//! Path validation: filesystem sandboxing for the file tools.
//!
//! Relative paths resolve against the agent's working directory. The
//! resolved path must sit under one of the allowed roots (when any are
//! configured) and outside every forbidden prefix (e.g., `~/.ssh`, `/etc`).

use clawloop_config::PermissionConfig;
use std::path::{Path, PathBuf};

/// Error returned when path validation fails.
#[derive(Debug, thiserror::Error)]
pub enum PathValidationError {
    #[error("Path '{path}' is outside allowed roots")]
    OutsideAllowedRoots { path: String },

    #[error("Path '{path}' matches forbidden pattern '{pattern}'")]
    ForbiddenPath { path: String, pattern: String },

    #[error("Path traversal detected in '{path}'")]
    PathTraversal { path: String },

    #[error("Failed to canonicalize path '{path}': {reason}")]
    CanonicalizeFailed { path: String, reason: String },
}

/// Where file tools may read and write.
#[derive(Debug, Clone, Default)]
pub struct PathPolicy {
    base: PathBuf,
    allowed_roots: Vec<String>,
    forbidden_paths: Vec<String>,
}

impl PathPolicy {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self {
            base: base.into(),
            ..Self::default()
        }
    }

    /// Policy from the `[permissions]` config section, anchored at `base`.
    pub fn from_config(base: impl Into<PathBuf>, config: &PermissionConfig) -> Self {
        Self {
            base: base.into(),
            allowed_roots: config.allowed_roots.clone(),
            forbidden_paths: config.forbidden_paths.clone(),
        }
    }

    pub fn with_allowed_roots(mut self, roots: Vec<String>) -> Self {
        self.allowed_roots = roots;
        self
    }

    pub fn with_forbidden_paths(mut self, paths: Vec<String>) -> Self {
        self.forbidden_paths = paths;
        self
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Resolve `raw` and check it against the policy.
    ///
    /// Returns the canonical path when the target (or its parent, for files
    /// about to be created) exists, otherwise the joined path as-is.
    pub fn resolve(&self, raw: &str) -> Result<PathBuf, PathValidationError> {
        let normalized = raw.replace('\\', "/");
        if normalized.split('/').any(|part| part == "..") {
            return Err(PathValidationError::PathTraversal { path: raw.into() });
        }

        let joined = {
            let p = Path::new(raw);
            if p.is_absolute() {
                p.to_path_buf()
            } else {
                self.base.join(p)
            }
        };
        let canonical = canonicalize_lenient(&joined, raw)?;
        let canonical_str = normalize(&canonical.to_string_lossy());

        for forbidden in &self.forbidden_paths {
            if is_under(&canonical_str, &normalize(&expand_tilde(forbidden))) {
                return Err(PathValidationError::ForbiddenPath {
                    path: raw.into(),
                    pattern: forbidden.clone(),
                });
            }
        }

        if !self.allowed_roots.is_empty() {
            let inside = self.allowed_roots.iter().any(|root| {
                let root = canonicalize_lenient(Path::new(&expand_tilde(root)), root)
                    .map(|p| normalize(&p.to_string_lossy()))
                    .unwrap_or_else(|_| normalize(&expand_tilde(root)));
                is_under(&canonical_str, &root)
            });
            if !inside {
                return Err(PathValidationError::OutsideAllowedRoots { path: raw.into() });
            }
        }

        Ok(canonical)
    }
}

fn canonicalize_lenient(path: &Path, raw: &str) -> Result<PathBuf, PathValidationError> {
    if path.exists() {
        return path
            .canonicalize()
            .map_err(|e| PathValidationError::CanonicalizeFailed {
                path: raw.into(),
                reason: e.to_string(),
            });
    }
    if let Some(parent) = path.parent()
        && parent.exists()
        && let Some(name) = path.file_name()
    {
        let parent = parent
            .canonicalize()
            .map_err(|e| PathValidationError::CanonicalizeFailed {
                path: raw.into(),
                reason: format!("Parent dir: {e}"),
            })?;
        return Ok(parent.join(name));
    }
    Ok(path.to_path_buf())
}

/// Lowercased, forward-slashed, without the Windows `\\?\` prefix.
fn normalize(path: &str) -> String {
    let lowered = path.replace('\\', "/").to_lowercase();
    lowered
        .strip_prefix("//?/")
        .map(str::to_string)
        .unwrap_or(lowered)
}

/// Component-wise prefix test, so `/etc` does not cover `/etcetera`.
fn is_under(path: &str, prefix: &str) -> bool {
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        return true;
    }
    path == prefix || path.starts_with(&format!("{prefix}/"))
}

/// Expand ~ to the user's home directory.
fn expand_tilde(path: &str) -> String {
    if (path.starts_with("~/") || path == "~")
        && let Some(home) = home_dir()
    {
        return path.replacen('~', &home, 1);
    }
    path.to_string()
}

fn home_dir() -> Option<String> {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE").ok()
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME").ok()
    }
}
