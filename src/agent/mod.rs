//! Agent adapters: one per supported coding agent.
//!
//! The [`Adapter`] trait decouples the hook dispatcher from each agent's
//! wire format. An adapter turns the JSON an agent writes to a hook's
//! standard input into a canonical [`Event`], and knows where and how the
//! agent's hook registration lives on disk.

pub mod claude_code;
pub mod cursor;
pub mod filter;
pub mod gemini;
pub mod install;
pub mod openclaw;
pub mod opencode;
pub mod parse;
pub mod pi_agent;
pub mod registry;
pub mod windsurf;

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;

use crate::config::LoggingLevel;
use crate::models::event::Event;
use crate::privacy::PrivacyChecker;
use crate::Result;

pub use install::{HookStatus, InstallOptions, InstallReport, UninstallReport};
pub use registry::Registry;

/// Settings needed while parsing a hook payload.
#[derive(Debug, Clone)]
pub struct ParseContext {
    /// Shared sensitive-path and redaction rules.
    pub privacy: Arc<PrivacyChecker>,
    /// Effective logging level for the agent.
    pub level: LoggingLevel,
    /// Whether SHA-256 content hashes are computed.
    pub content_hash: bool,
}

impl ParseContext {
    /// Build a parse context.
    #[must_use]
    pub fn new(privacy: Arc<PrivacyChecker>, level: LoggingLevel, content_hash: bool) -> Self {
        Self {
            privacy,
            level,
            content_hash,
        }
    }

    /// Whether diffs and raw payloads are kept.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.level >= LoggingLevel::Full
    }
}

/// How an agent expects the hook's decision to be reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseMode {
    /// Exit code plus stderr only.
    ExitCode,
    /// `{"decision": "allow"|"block", "reason"?}` on stdout.
    DecisionJson,
    /// `{"decision": "allow"|"deny", "reason"?}` on stdout.
    AllowDenyJson,
    /// `{"permission": "allow"|"deny", "user_message"?}` on stdout.
    PermissionJson,
}

/// Outcome of a hook invocation as reported back to the agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookResponse {
    /// Let the action proceed.
    Allow,
    /// Refuse the action; carries the reason shown to the user.
    Block(String),
    /// Internal failure; the agent proceeds.
    Error(String),
}

#[derive(Serialize)]
struct DecisionBody<'a> {
    decision: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<&'a str>,
}

#[derive(Serialize)]
struct PermissionBody<'a> {
    permission: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    user_message: Option<&'a str>,
}

impl HookResponse {
    /// Process exit code under the hook protocol.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Allow => 0,
            Self::Error(_) => 1,
            Self::Block(_) => 2,
        }
    }

    /// Text written to stderr, empty for allow.
    #[must_use]
    pub fn stderr(&self) -> &str {
        match self {
            Self::Allow => "",
            Self::Block(msg) | Self::Error(msg) => msg,
        }
    }

    /// Body written to stdout for `mode`, if the agent expects one.
    ///
    /// Errors are reported as allow: the agent must keep working.
    #[must_use]
    pub fn to_json(&self, mode: ResponseMode) -> Option<String> {
        let reason = match self {
            Self::Block(msg) => Some(msg.as_str()),
            Self::Allow | Self::Error(_) => None,
        };
        let blocked = reason.is_some();
        let body = match mode {
            ResponseMode::ExitCode => return None,
            ResponseMode::DecisionJson => serde_json::to_string(&DecisionBody {
                decision: if blocked { "block" } else { "allow" },
                reason,
            }),
            ResponseMode::AllowDenyJson => serde_json::to_string(&DecisionBody {
                decision: if blocked { "deny" } else { "allow" },
                reason,
            }),
            ResponseMode::PermissionJson => serde_json::to_string(&PermissionBody {
                permission: if blocked { "deny" } else { "allow" },
                user_message: reason,
            }),
        };
        body.ok()
    }
}

/// Shape of an agent's hook settings file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsLayout {
    /// `{"hooks": {Type: [{"matcher"?, "hooks": [{"type": "command", "command"}]}]}}`.
    MatcherNested,
    /// `{"version": 1, "hooks": {type: [{"command"}]}}`.
    Versioned,
    /// `{"hooks": {type: [{"command"}]}}`.
    Flat,
}

/// Where an agent keeps its hook registration, relative to the home directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookTarget {
    /// A JSON settings file gryph can edit.
    Settings {
        /// Agent configuration directory.
        dir: &'static str,
        /// Settings file inside `dir`.
        file: &'static str,
        /// File layout.
        layout: SettingsLayout,
    },
    /// A plugin the operator installs by hand.
    Plugin {
        /// Agent configuration directory.
        dir: &'static str,
        /// Plugin file inside `dir`.
        plugin_file: &'static str,
    },
}

impl HookTarget {
    /// Agent configuration directory under `home`.
    #[must_use]
    pub fn config_dir(&self, home: &Path) -> std::path::PathBuf {
        match self {
            Self::Settings { dir, .. } | Self::Plugin { dir, .. } => home.join(dir),
        }
    }
}

/// Result of probing the host for an agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Detection {
    /// Agent machine name.
    pub agent: String,
    /// Whether the agent's configuration directory exists.
    pub installed: bool,
    /// Configuration directory probed.
    pub config_dir: String,
}

/// One supported coding agent.
pub trait Adapter: Send + Sync {
    /// Machine name used on the command line and in the store.
    fn name(&self) -> &'static str;

    /// Human-readable name.
    fn display_name(&self) -> &'static str;

    /// Hook types registered on install.
    fn hook_types(&self) -> &'static [&'static str];

    /// Environment variable that overrides the agent session string.
    fn session_env_var(&self) -> &'static str;

    /// Hook registration location.
    fn hook_target(&self) -> HookTarget;

    /// Response flavour for `hook_type`.
    fn response_mode(&self, hook_type: &str) -> ResponseMode;

    /// Parse one hook payload into an event.
    ///
    /// Unrecognised hook types yield an [`ActionType::Unknown`](crate::models::event::ActionType::Unknown)
    /// event rather than an error.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Parse` if `raw` is not the JSON the agent sends.
    fn parse_event(&self, hook_type: &str, raw: &[u8], ctx: &ParseContext) -> Result<Event>;

    /// Probe `home` for the agent.
    fn detect(&self, home: &Path) -> Detection {
        let dir = self.hook_target().config_dir(home);
        Detection {
            agent: self.name().to_owned(),
            installed: dir.is_dir(),
            config_dir: dir.display().to_string(),
        }
    }

    /// Register gryph's hook commands with the agent.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the agent is not detected and
    /// `force` is unset, or `AppError::Io`/`AppError::Config` if the
    /// settings file cannot be read or written.
    fn install(&self, opts: &InstallOptions) -> Result<InstallReport> {
        install::install_hooks(self.name(), self.hook_types(), self.hook_target(), opts)
    }

    /// Remove gryph's hook commands from the agent.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Io`/`AppError::Config` if the settings file
    /// cannot be read or written.
    fn uninstall(&self, opts: &InstallOptions) -> Result<UninstallReport> {
        install::uninstall_hooks(self.name(), self.hook_target(), opts)
    }

    /// Which of the agent's hooks are currently registered.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the settings file is not valid JSON.
    fn status(&self, home: &Path) -> Result<HookStatus> {
        install::hook_status(self.name(), self.hook_types(), self.hook_target(), home)
    }
}
