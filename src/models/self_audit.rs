//! Records of gryph's own lifecycle actions.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{AppError, Result};

/// Lifecycle action recorded in the self-audit log.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SelfAuditAction {
    /// Hooks were installed into an agent.
    Install,
    /// Hooks were removed from an agent.
    Uninstall,
    /// A configuration key changed.
    ConfigChange,
    /// Events were exported.
    Export,
    /// Data was purged on operator request.
    Purge,
    /// The tool was upgraded.
    Upgrade,
    /// The store was created.
    DatabaseInit,
    /// The retention policy deleted old events.
    RetentionCleanup,
}

impl SelfAuditAction {
    /// Machine name, as persisted.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Install => "install",
            Self::Uninstall => "uninstall",
            Self::ConfigChange => "config_change",
            Self::Export => "export",
            Self::Purge => "purge",
            Self::Upgrade => "upgrade",
            Self::DatabaseInit => "database_init",
            Self::RetentionCleanup => "retention_cleanup",
        }
    }
}

impl Display for SelfAuditAction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SelfAuditAction {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "install" => Ok(Self::Install),
            "uninstall" => Ok(Self::Uninstall),
            "config_change" => Ok(Self::ConfigChange),
            "export" => Ok(Self::Export),
            "purge" => Ok(Self::Purge),
            "upgrade" => Ok(Self::Upgrade),
            "database_init" => Ok(Self::DatabaseInit),
            "retention_cleanup" => Ok(Self::RetentionCleanup),
            other => Err(AppError::Validation(format!(
                "unknown self-audit action: {other}"
            ))),
        }
    }
}

/// Outcome of a self-audited action.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SelfAuditResult {
    /// Action completed.
    Success,
    /// Action failed.
    Error,
    /// Action was not needed.
    Skipped,
}

impl SelfAuditResult {
    /// Machine name, as persisted.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Skipped => "skipped",
        }
    }
}

impl FromStr for SelfAuditResult {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "success" => Ok(Self::Success),
            "error" => Ok(Self::Error),
            "skipped" => Ok(Self::Skipped),
            other => Err(AppError::Validation(format!(
                "unknown self-audit result: {other}"
            ))),
        }
    }
}

/// One self-audit record. Never removed by retention cleanup.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SelfAudit {
    /// Unique identifier.
    pub id: Uuid,
    /// When the action happened (UTC).
    pub timestamp: DateTime<Utc>,
    /// Action kind.
    pub action: SelfAuditAction,
    /// Agent the action concerned, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_name: Option<String>,
    /// Action-specific details.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    /// Outcome.
    pub result: SelfAuditResult,
    /// Failure description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Version of gryph that performed the action.
    pub tool_version: String,
}

impl SelfAudit {
    /// Construct a successful record for `action`, stamped with the crate version.
    #[must_use]
    pub fn new(action: SelfAuditAction) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            action,
            agent_name: None,
            details: None,
            result: SelfAuditResult::Success,
            error_message: None,
            tool_version: env!("CARGO_PKG_VERSION").to_owned(),
        }
    }

    /// Set the agent this record concerns.
    #[must_use]
    pub fn with_agent(mut self, agent_name: &str) -> Self {
        self.agent_name = Some(agent_name.to_owned());
        self
    }

    /// Attach serialized details. Details that fail to serialize are dropped.
    #[must_use]
    pub fn with_details<T: Serialize>(mut self, details: &T) -> Self {
        self.details = serde_json::to_value(details).ok();
        self
    }

    /// Mark the record as failed with `message`.
    #[must_use]
    pub fn with_error(mut self, message: String) -> Self {
        self.result = SelfAuditResult::Error;
        self.error_message = Some(message);
        self
    }

    /// Mark the record as skipped.
    #[must_use]
    pub fn skipped(mut self) -> Self {
        self.result = SelfAuditResult::Skipped;
        self
    }
}

/// Details of an `install` record.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct InstallDetails {
    /// Hook types written to the agent's settings.
    pub hooks_installed: Vec<String>,
    /// Backup of the previous settings file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup_path: Option<String>,
}

/// Details of an `uninstall` record.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct UninstallDetails {
    /// Hook types removed from the agent's settings.
    pub hooks_removed: Vec<String>,
    /// Whether a backup was restored instead of editing.
    pub backup_restored: bool,
}

/// Details of a `config_change` record.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConfigChangeDetails {
    /// Dotted configuration key.
    pub key: String,
    /// Previous value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_value: Option<String>,
    /// New value.
    pub new_value: String,
}

/// Details of an `export` record.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExportDetails {
    /// Output format.
    pub format: String,
    /// Number of events written.
    pub event_count: u64,
    /// Destination file, absent for stdout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_path: Option<String>,
}

/// Details of a `retention_cleanup` record.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RetentionCleanupDetails {
    /// Number of events deleted.
    pub events_deleted: u64,
    /// Configured retention window.
    pub retention_days: u32,
    /// Cutoff used for deletion.
    pub cutoff_time: Option<DateTime<Utc>>,
    /// Timestamp of the oldest event left in the store.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oldest_remaining: Option<DateTime<Utc>>,
}

/// Details of a `database_init` record.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DatabaseInitDetails {
    /// Store file path.
    pub path: String,
    /// Schema version written.
    pub schema_version: String,
}
