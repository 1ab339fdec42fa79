//! Global configuration parsing, validation, and path resolution.

use std::collections::BTreeMap;
use std::env;
use std::fmt::{Display, Formatter};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::privacy::{default_redact_patterns, default_sensitive_patterns, PrivacyChecker};
use crate::{AppError, Result};

/// Directory name used under the platform config and data directories.
pub const APP_DIR: &str = "gryph";

const CONFIG_FILE: &str = "config.yaml";
const DB_FILE: &str = "audit.db";

/// How much event content is kept. Ordered `Minimal < Standard < Full`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum LoggingLevel {
    /// Event metadata only; previews and outputs stripped.
    Minimal,
    /// Metadata plus truncated previews.
    Standard,
    /// Everything, including diffs and raw hook payloads.
    Full,
}

impl LoggingLevel {
    /// Machine name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Minimal => "minimal",
            Self::Standard => "standard",
            Self::Full => "full",
        }
    }
}

impl Display for LoggingLevel {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LoggingLevel {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "minimal" => Ok(Self::Minimal),
            "standard" => Ok(Self::Standard),
            "full" => Ok(Self::Full),
            other => Err(AppError::Config(format!(
                "invalid logging level: {other} (must be minimal, standard, or full)"
            ))),
        }
    }
}

/// Event content settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Global logging level.
    #[serde(default = "default_level")]
    pub level: LoggingLevel,
    /// Whether written/read content is hashed with SHA-256.
    #[serde(default = "default_true")]
    pub content_hash: bool,
    /// Maximum characters of standard output kept.
    #[serde(default = "default_stdout_max_chars")]
    pub stdout_max_chars: usize,
    /// Maximum characters of standard error kept.
    #[serde(default = "default_stderr_max_chars")]
    pub stderr_max_chars: usize,
    /// Maximum characters of conversation context kept.
    #[serde(default = "default_context_max_chars")]
    pub context_max_chars: usize,
}

fn default_level() -> LoggingLevel {
    LoggingLevel::Minimal
}

fn default_true() -> bool {
    true
}

fn default_stdout_max_chars() -> usize {
    1000
}

fn default_stderr_max_chars() -> usize {
    500
}

fn default_context_max_chars() -> usize {
    5000
}

fn default_retention_days() -> u32 {
    90
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            content_hash: true,
            stdout_max_chars: default_stdout_max_chars(),
            stderr_max_chars: default_stderr_max_chars(),
            context_max_chars: default_context_max_chars(),
        }
    }
}

/// Store location and retention.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct StorageConfig {
    /// Store file; empty means the platform data directory.
    #[serde(default)]
    pub path: String,
    /// Days of events kept; `0` disables retention.
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: String::new(),
            retention_days: default_retention_days(),
        }
    }
}

/// Sensitive paths and redaction rules.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct PrivacyConfig {
    /// Legacy switch for content hashing; `false` overrides `logging.content_hash`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash_file_contents: Option<bool>,
    /// Glob patterns of sensitive paths.
    #[serde(default = "default_sensitive_patterns")]
    pub sensitive_paths: Vec<String>,
    /// Regexes replaced with `[REDACTED]`.
    #[serde(default = "default_redact_patterns")]
    pub redact_patterns: Vec<String>,
}

impl Default for PrivacyConfig {
    fn default() -> Self {
        Self {
            hash_file_contents: None,
            sensitive_paths: default_sensitive_patterns(),
            redact_patterns: default_redact_patterns(),
        }
    }
}

/// Per-agent switches.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct AgentConfig {
    /// Whether hook events from this agent are recorded.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Overrides the global logging level for this agent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logging_level: Option<LoggingLevel>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            logging_level: None,
        }
    }
}

/// Global configuration parsed from `config.yaml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct GlobalConfig {
    /// Event content settings.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Store settings.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Privacy rules.
    #[serde(default)]
    pub privacy: PrivacyConfig,
    /// Per-agent settings keyed by agent machine name.
    #[serde(default)]
    pub agents: BTreeMap<String, AgentConfig>,
}

impl GlobalConfig {
    /// Load and validate configuration from a YAML file path.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the file cannot be read or contains
    /// invalid YAML, or if validation fails.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|err| AppError::Config(format!("failed to read config: {err}")))?;
        Self::from_yaml_str(&raw)
    }

    /// Load the configuration file at `path`, or the platform default
    /// location, falling back to defaults when the file does not exist.
    /// Environment overrides are applied last.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if an existing file is invalid.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path.map_or_else(config_file_path, Path::to_path_buf);
        let mut config = if path.exists() {
            Self::load_from_path(&path)?
        } else {
            debug!(path = %path.display(), "config file not found, using defaults");
            Self::default()
        };
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if parsing or validation fails.
    pub fn from_yaml_str(raw: &str) -> Result<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Render the configuration as YAML.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if serialization fails.
    pub fn to_yaml_string(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Apply `GRYPH_LOGGING_LEVEL`, `GRYPH_STORAGE_PATH` and
    /// `GRYPH_STORAGE_RETENTION_DAYS` when set.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if an override has an invalid value.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(level) = env::var("GRYPH_LOGGING_LEVEL") {
            self.logging.level = level.parse()?;
        }
        if let Ok(path) = env::var("GRYPH_STORAGE_PATH") {
            self.storage.path = path;
        }
        if let Ok(days) = env::var("GRYPH_STORAGE_RETENTION_DAYS") {
            self.storage.retention_days = days.parse().map_err(|err| {
                AppError::Config(format!("invalid GRYPH_STORAGE_RETENTION_DAYS: {err}"))
            })?;
        }
        Ok(())
    }

    /// Logging level for `agent`: its override, or the global level.
    #[must_use]
    pub fn effective_level(&self, agent: &str) -> LoggingLevel {
        self.agents
            .get(agent)
            .and_then(|a| a.logging_level)
            .unwrap_or(self.logging.level)
    }

    /// Whether hook events from `agent` are recorded. Unlisted agents are enabled.
    #[must_use]
    pub fn agent_enabled(&self, agent: &str) -> bool {
        self.agents.get(agent).is_none_or(|a| a.enabled)
    }

    /// Whether content hashes are computed.
    #[must_use]
    pub fn content_hash(&self) -> bool {
        self.logging.content_hash && self.privacy.hash_file_contents.unwrap_or(true)
    }

    /// Build the privacy checker for this configuration.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Privacy` if a pattern fails to compile.
    pub fn privacy_checker(&self) -> Result<PrivacyChecker> {
        PrivacyChecker::new(&self.privacy.sensitive_paths, &self.privacy.redact_patterns)
    }

    /// Absolute path of the store file.
    #[must_use]
    pub fn db_path(&self) -> PathBuf {
        if self.storage.path.trim().is_empty() {
            data_dir().join(DB_FILE)
        } else {
            PathBuf::from(&self.storage.path)
        }
    }

    /// Read a dotted key (e.g. `logging.level`) as YAML text.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the key does not exist.
    pub fn get_key(&self, key: &str) -> Result<String> {
        let root = serde_yaml::to_value(self)?;
        let mut node = &root;
        for part in key.split('.') {
            node = node
                .get(part)
                .ok_or_else(|| AppError::NotFound(format!("config key {key}")))?;
        }
        Ok(render_scalar(node))
    }

    /// Return a copy with dotted `key` set to `value` (parsed as YAML).
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the resulting configuration is invalid.
    pub fn with_key(&self, key: &str, value: &str) -> Result<Self> {
        let mut root = serde_yaml::to_value(self)?;
        let parsed: serde_yaml::Value = serde_yaml::from_str(value)?;
        let parts: Vec<&str> = key.split('.').collect();
        let Some((last, parents)) = parts.split_last() else {
            return Err(AppError::Config("empty config key".into()));
        };
        let mut node = &mut root;
        for part in parents {
            let map = node
                .as_mapping_mut()
                .ok_or_else(|| AppError::Config(format!("{key}: {part} is not a section")))?;
            node = map
                .entry(serde_yaml::Value::String((*part).to_owned()))
                .or_insert_with(|| serde_yaml::Value::Mapping(serde_yaml::Mapping::new()));
        }
        let map = node
            .as_mapping_mut()
            .ok_or_else(|| AppError::Config(format!("{key}: parent is not a section")))?;
        map.insert(serde_yaml::Value::String((*last).to_owned()), parsed);

        let updated: Self = serde_yaml::from_value(root)?;
        updated.validate()?;
        Ok(updated)
    }

    /// Write the configuration to `path`, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the file cannot be written.
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|err| AppError::Config(format!("failed to create config dir: {err}")))?;
        }
        fs::write(path, self.to_yaml_string()?)
            .map_err(|err| AppError::Config(format!("failed to write config: {err}")))
    }

    fn validate(&self) -> Result<()> {
        for (index, pattern) in self.privacy.redact_patterns.iter().enumerate() {
            if let Err(err) = regex::Regex::new(pattern) {
                return Err(AppError::Config(format!(
                    "invalid redact pattern at index {index}: {err}"
                )));
            }
        }
        if let Err(err) = self.privacy_checker() {
            return Err(AppError::Config(err.to_string()));
        }
        if self.agents.keys().any(|name| name.trim().is_empty()) {
            return Err(AppError::Config("agent names must not be empty".into()));
        }
        Ok(())
    }
}

fn render_scalar(node: &serde_yaml::Value) -> String {
    match node {
        serde_yaml::Value::String(s) => s.clone(),
        serde_yaml::Value::Bool(b) => b.to_string(),
        serde_yaml::Value::Number(n) => n.to_string(),
        serde_yaml::Value::Null => String::new(),
        other => serde_yaml::to_string(other)
            .unwrap_or_default()
            .trim_end()
            .to_owned(),
    }
}

fn home_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
}

/// Platform configuration directory for gryph.
#[must_use]
pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| home_dir().join(".config"))
        .join(APP_DIR)
}

/// Platform data directory for gryph.
#[must_use]
pub fn data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| home_dir().join(".local").join("share"))
        .join(APP_DIR)
}

/// Directory holding settings-file backups made during hook installation.
#[must_use]
pub fn backups_dir() -> PathBuf {
    data_dir().join("backups")
}

/// Default configuration file path.
#[must_use]
pub fn config_file_path() -> PathBuf {
    config_dir().join(CONFIG_FILE)
}
