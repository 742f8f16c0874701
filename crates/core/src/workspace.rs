//! Workspace metadata: what every Context inherits about the project.
//!
//! Project instructions follow a small hierarchy (later sections append):
//!
//! 1. **Instructions file**: `.clawloop/INSTRUCTIONS.md` by default
//! 2. **Context directory**: every `.md`/`.txt` file in `.clawloop/context/`,
//!    sorted alphabetically
//!
//! Each file is optional. Missing or unreadable files are skipped.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Default project instructions file, relative to the working directory.
pub const INSTRUCTIONS_FILE: &str = ".clawloop/INSTRUCTIONS.md";

/// Project-local context directory, relative to the working directory.
pub const CONTEXT_DIR: &str = ".clawloop/context";

/// Maximum bytes read from any single instructions file.
const MAX_FILE_BYTES: u64 = 64 * 1024;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Workspace {
    pub working_directory: PathBuf,
    pub project_instructions: String,
    pub recent_commits: Vec<String>,
    pub platform_info: BTreeMap<String, String>,
}

impl Workspace {
    /// Load project metadata for `working_directory`.
    ///
    /// `instructions_file` is resolved relative to the working directory when
    /// it is not absolute. Recent commits start empty; callers that inspect
    /// version control supply them with [`Workspace::with_recent_commits`].
    pub fn load(working_directory: impl Into<PathBuf>, instructions_file: Option<&Path>) -> Self {
        let working_directory = working_directory.into();
        let instructions_path = match instructions_file {
            Some(p) if p.is_absolute() => p.to_path_buf(),
            Some(p) => working_directory.join(p),
            None => working_directory.join(INSTRUCTIONS_FILE),
        };

        let mut sections: Vec<String> = Vec::new();
        if let Some(content) = read_file_safe(&instructions_path) {
            debug!(file = %instructions_path.display(), "Loaded project instructions");
            sections.push(content);
        }
        sections.extend(load_context_directory(&working_directory.join(CONTEXT_DIR)));

        Self {
            working_directory,
            project_instructions: sections.join("\n\n"),
            recent_commits: Vec::new(),
            platform_info: platform_info(),
        }
    }

    pub fn with_recent_commits(mut self, commits: Vec<String>) -> Self {
        self.recent_commits = commits;
        self
    }
}

/// Snapshot of the host platform.
pub fn platform_info() -> BTreeMap<String, String> {
    BTreeMap::from([
        ("os".to_string(), std::env::consts::OS.to_string()),
        ("arch".to_string(), std::env::consts::ARCH.to_string()),
        ("family".to_string(), std::env::consts::FAMILY.to_string()),
        ("clawloop_version".to_string(), env!("CARGO_PKG_VERSION").to_string()),
    ])
}

/// Load all .md/.txt files from a context directory (sorted alphabetically).
fn load_context_directory(dir: &Path) -> Vec<String> {
    let Ok(read_dir) = std::fs::read_dir(dir) else {
        return Vec::new();
    };

    let mut entries: Vec<PathBuf> = read_dir
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext == "md" || ext == "txt")
        })
        .collect();
    entries.sort();

    entries.iter().filter_map(|p| read_file_safe(p)).collect()
}

/// Read a file if it exists, is small enough, and is non-empty.
fn read_file_safe(path: &Path) -> Option<String> {
    let meta = std::fs::metadata(path).ok()?;
    if meta.len() > MAX_FILE_BYTES {
        warn!(file = %path.display(), size = meta.len(), "Instructions file too large, skipping");
        return None;
    }
    let content = std::fs::read_to_string(path).ok()?;
    if content.trim().is_empty() {
        None
    } else {
        Some(content.trim().to_string())
    }
}
