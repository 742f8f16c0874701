//! Configuration loading, validation, and management for ClawLoop.
//!
//! Loads configuration from `~/.clawloop/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.clawloop/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Model backend connection
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Model name per tier
    #[serde(default)]
    pub tiers: TierConfig,

    /// Control loop limits
    #[serde(default)]
    pub agent: AgentConfig,

    /// Todo snapshot storage
    #[serde(default)]
    pub todos: TodoConfig,

    /// Session summary storage
    #[serde(default)]
    pub summaries: SummaryConfig,

    /// Tool approval policy
    #[serde(default)]
    pub permissions: PermissionConfig,

    /// Project metadata loading
    #[serde(default)]
    pub workspace: WorkspaceConfig,
}

fn default_true() -> bool {
    true
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default = "default_provider_name")]
    pub name: String,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_provider_name() -> String {
    "openrouter".into()
}
fn default_base_url() -> String {
    "https://openrouter.ai/api/v1".into()
}
fn default_temperature() -> f32 {
    0.2
}
fn default_max_tokens() -> u32 {
    8192
}
fn default_timeout_secs() -> u64 {
    120
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            name: default_provider_name(),
            base_url: default_base_url(),
            api_key: None,
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Redact a secret for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("name", &self.name)
            .field("base_url", &self.base_url)
            .field("api_key", &redact(&self.api_key))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierConfig {
    #[serde(default = "default_low_model")]
    pub low: String,

    #[serde(default = "default_mid_model")]
    pub mid: String,

    #[serde(default = "default_high_model")]
    pub high: String,
}

fn default_low_model() -> String {
    "anthropic/claude-3.5-haiku".into()
}
fn default_mid_model() -> String {
    "anthropic/claude-sonnet-4".into()
}
fn default_high_model() -> String {
    "anthropic/claude-sonnet-4".into()
}

impl Default for TierConfig {
    fn default() -> Self {
        Self {
            low: default_low_model(),
            mid: default_mid_model(),
            high: default_high_model(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Estimated token size above which history is compacted
    #[serde(default = "default_compaction_threshold")]
    pub compaction_threshold_tokens: usize,

    /// Deepest sub-agent level allowed (root is 0)
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Processing iterations per run before the loop gives up
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    /// Fixed session id; a random one is generated when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

fn default_compaction_threshold() -> usize {
    100_000
}
fn default_max_depth() -> usize {
    1
}
fn default_max_iterations() -> u32 {
    50
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            compaction_threshold_tokens: default_compaction_threshold(),
            max_depth: default_max_depth(),
            max_iterations: default_max_iterations(),
            session_id: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TodoConfig {
    #[serde(default = "default_todo_dir")]
    pub dir: PathBuf,
}

fn default_todo_dir() -> PathBuf {
    AppConfig::config_dir().join("todos")
}

impl Default for TodoConfig {
    fn default() -> Self {
        Self { dir: default_todo_dir() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_summary_dir")]
    pub dir: PathBuf,
}

fn default_summary_dir() -> PathBuf {
    AppConfig::config_dir().join("summaries")
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: default_summary_dir(),
        }
    }
}

/// How generic tool calls are approved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionMode {
    /// Prompt the user for anything not on an allow/deny list
    #[default]
    Ask,
    /// Approve anything not explicitly denied
    Auto,
    /// Refuse anything not explicitly allowed
    Deny,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionConfig {
    #[serde(default)]
    pub mode: PermissionMode,

    /// Tools approved without prompting
    #[serde(default = "default_always_allow")]
    pub always_allow: Vec<String>,

    /// Tools refused without prompting
    #[serde(default)]
    pub always_deny: Vec<String>,

    /// Shell allowlist (first word of the command). Empty = any command.
    #[serde(default)]
    pub allowed_commands: Vec<String>,

    #[serde(default = "default_forbidden_paths")]
    pub forbidden_paths: Vec<String>,

    #[serde(default)]
    pub allowed_roots: Vec<String>,
}

fn default_always_allow() -> Vec<String> {
    vec![
        "file_read".into(),
        "list_dir".into(),
        "glob".into(),
        "grep".into(),
    ]
}

fn default_forbidden_paths() -> Vec<String> {
    vec![
        "/etc".into(),
        "/proc".into(),
        "/sys".into(),
        "~/.ssh".into(),
        "~/.gnupg".into(),
        "~/.aws".into(),
    ]
}

impl Default for PermissionConfig {
    fn default() -> Self {
        Self {
            mode: PermissionMode::default(),
            always_allow: default_always_allow(),
            always_deny: vec![],
            allowed_commands: vec![],
            forbidden_paths: default_forbidden_paths(),
            allowed_roots: vec![],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    /// Project instructions file, relative to the working directory
    #[serde(default = "default_instructions_file")]
    pub instructions_file: PathBuf,

    #[serde(default = "default_true")]
    pub load_project_instructions: bool,
}

fn default_instructions_file() -> PathBuf {
    PathBuf::from(".clawloop/INSTRUCTIONS.md")
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            instructions_file: default_instructions_file(),
            load_project_instructions: true,
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.clawloop/config.toml).
    ///
    /// Environment overrides:
    /// - `CLAWLOOP_API_KEY`, then `OPENROUTER_API_KEY`, then `OPENAI_API_KEY`
    /// - `CLAWLOOP_BASE_URL`
    /// - `CLAWLOOP_TODO_DIR`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if self.provider.api_key.is_none() {
            self.provider.api_key = std::env::var("CLAWLOOP_API_KEY")
                .ok()
                .or_else(|| std::env::var("OPENROUTER_API_KEY").ok())
                .or_else(|| std::env::var("OPENAI_API_KEY").ok());
        }

        if let Ok(url) = std::env::var("CLAWLOOP_BASE_URL") {
            self.provider.base_url = url;
        }

        if let Ok(dir) = std::env::var("CLAWLOOP_TODO_DIR") {
            self.todos.dir = PathBuf::from(dir);
        }
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".clawloop")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.provider.temperature < 0.0 || self.provider.temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "provider.temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.agent.compaction_threshold_tokens == 0 {
            return Err(ConfigError::ValidationError(
                "agent.compaction_threshold_tokens must be > 0".into(),
            ));
        }

        if self.agent.max_iterations == 0 {
            return Err(ConfigError::ValidationError(
                "agent.max_iterations must be > 0".into(),
            ));
        }

        if let Some(tool) = self
            .permissions
            .always_allow
            .iter()
            .find(|t| self.permissions.always_deny.contains(t))
        {
            return Err(ConfigError::ValidationError(format!(
                "tool '{tool}' is in both permissions.always_allow and permissions.always_deny"
            )));
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.provider.api_key.is_some()
    }

    /// Render the effective configuration as TOML (secrets omitted).
    pub fn to_toml_redacted(&self) -> String {
        let mut copy = self.clone();
        copy.provider.api_key = None;
        toml::to_string_pretty(&copy).unwrap_or_default()
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
