//! Typed payload variants carried by [`super::event::Event`].

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::event::ActionType;

/// A payload variant bound to one or more action types.
pub trait TypedPayload: Serialize + DeserializeOwned {
    /// Variant name used in error messages.
    const NAME: &'static str;

    /// Whether this variant is the payload of `action`.
    fn accepts(action: ActionType) -> bool;
}

/// Body of a `file_read` event.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileReadPayload {
    /// File that was read.
    pub path: String,
    /// Search pattern for grep/glob style reads.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    /// Size of the content read.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<i64>,
    /// SHA-256 hex digest of the content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<String>,
}

/// Body of a `file_write` event.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileWritePayload {
    /// File that was written.
    pub path: String,
    /// Size of the new content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<i64>,
    /// SHA-256 hex digest of the full written content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<String>,
    /// Truncated start of the written content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_preview: Option<String>,
    /// Truncated replaced text of an edit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_string: Option<String>,
    /// Truncated replacement text of an edit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_string: Option<String>,
    /// Number of lines added.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lines_added: Option<i64>,
    /// Number of lines removed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lines_removed: Option<i64>,
}

/// Body of a `file_delete` event.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileDeletePayload {
    /// File that was removed.
    pub path: String,
}

/// Body of a `command_exec` event.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommandExecPayload {
    /// Full command line.
    pub command: String,
    /// Agent-supplied description of the command.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Separate arguments, when the agent reports them.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    /// Process exit code, when reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i64>,
    /// Truncated combined output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    /// Truncated standard output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stdout_preview: Option<String>,
    /// Truncated standard error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stderr_preview: Option<String>,
    /// Execution time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<i64>,
}

/// Body of a `tool_use` event.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ToolUsePayload {
    /// Tool name (MCP tools are `server/tool`).
    pub tool_name: String,
    /// Raw tool input.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<serde_json::Value>,
    /// Raw tool output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<serde_json::Value>,
    /// Truncated textual rendering of the output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_preview: Option<String>,
}

/// Body of a `session_start` event.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionStartPayload {
    /// What started the session (`startup`, `resume`, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Model the agent runs on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Agent or subagent type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_type: Option<String>,
}

/// Body of a `session_end` event.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionEndPayload {
    /// Why the session ended.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Body of a `notification` event.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct NotificationPayload {
    /// Notification text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Notification category.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub notification_type: Option<String>,
}

macro_rules! bind_payload {
    ($ty:ty, $name:literal, $($action:ident)|+) => {
        impl TypedPayload for $ty {
            const NAME: &'static str = $name;

            fn accepts(action: ActionType) -> bool {
                matches!(action, $(ActionType::$action)|+)
            }
        }
    };
}

bind_payload!(FileReadPayload, "file_read", FileRead);
bind_payload!(FileWritePayload, "file_write", FileWrite);
bind_payload!(FileDeletePayload, "file_delete", FileDelete);
bind_payload!(CommandExecPayload, "command_exec", CommandExec);
bind_payload!(ToolUsePayload, "tool_use", ToolUse | NetworkRequest);
bind_payload!(SessionStartPayload, "session_start", SessionStart);
bind_payload!(SessionEndPayload, "session_end", SessionEnd);
bind_payload!(NotificationPayload, "notification", Notification);
