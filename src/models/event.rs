//! Canonical audit event and its classification enums.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::payload::TypedPayload;
use crate::{AppError, Result};

/// Identifies the JSON schema of an exported event.
pub const EVENT_SCHEMA_URL: &str =
    "https://raw.githubusercontent.com/safedep/gryph/main/schema/event.schema.json";

/// Kind of action an agent performed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    /// File was read.
    FileRead,
    /// File was created or modified.
    FileWrite,
    /// File was removed.
    FileDelete,
    /// Shell command was executed.
    CommandExec,
    /// Outbound network request.
    NetworkRequest,
    /// Generic or MCP tool invocation.
    ToolUse,
    /// Agent session began.
    SessionStart,
    /// Agent session ended.
    SessionEnd,
    /// Informational notification from the agent.
    Notification,
    /// Hook type the adapter did not recognise.
    Unknown,
}

impl ActionType {
    /// Every variant, in declaration order.
    pub const ALL: [Self; 10] = [
        Self::FileRead,
        Self::FileWrite,
        Self::FileDelete,
        Self::CommandExec,
        Self::NetworkRequest,
        Self::ToolUse,
        Self::SessionStart,
        Self::SessionEnd,
        Self::Notification,
        Self::Unknown,
    ];

    /// Long machine name, as persisted.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FileRead => "file_read",
            Self::FileWrite => "file_write",
            Self::FileDelete => "file_delete",
            Self::CommandExec => "command_exec",
            Self::NetworkRequest => "network_request",
            Self::ToolUse => "tool_use",
            Self::SessionStart => "session_start",
            Self::SessionEnd => "session_end",
            Self::Notification => "notification",
            Self::Unknown => "unknown",
        }
    }

    /// Short human form used by the CLI.
    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            Self::FileRead => "read",
            Self::FileWrite => "write",
            Self::FileDelete => "delete",
            Self::CommandExec => "exec",
            Self::NetworkRequest => "http",
            Self::ToolUse => "tool",
            Self::SessionStart => "session_start",
            Self::SessionEnd => "session_end",
            Self::Notification => "notification",
            Self::Unknown => "unknown",
        }
    }

    /// Whether this is one of the `file_*` actions whose payload carries a path.
    #[must_use]
    pub fn is_file_action(self) -> bool {
        matches!(self, Self::FileRead | Self::FileWrite | Self::FileDelete)
    }
}

impl Display for ActionType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionType {
    type Err = AppError;

    /// Accepts either the long (`file_read`) or short (`read`) form.
    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|a| a.as_str() == s || a.display_name() == s)
            .ok_or_else(|| AppError::Validation(format!("unknown action type: {s}")))
    }
}

/// Outcome of an action.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ResultStatus {
    /// Action completed (or has not yet reported failure).
    Success,
    /// Action failed.
    Error,
    /// Action was blocked by a hook.
    Blocked,
    /// Action was rejected by the user.
    Rejected,
}

impl ResultStatus {
    /// Machine name, as persisted.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Blocked => "blocked",
            Self::Rejected => "rejected",
        }
    }
}

impl Display for ResultStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResultStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "success" => Ok(Self::Success),
            "error" => Ok(Self::Error),
            "blocked" => Ok(Self::Blocked),
            "rejected" => Ok(Self::Rejected),
            other => Err(AppError::Validation(format!("unknown result status: {other}"))),
        }
    }
}

/// One recorded agent action.
///
/// `payload` holds the variant body as opaque JSON; use [`Event::set_payload`]
/// and [`Event::payload`] to move between it and the typed payload structs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Event {
    /// Globally unique identifier.
    pub id: Uuid,
    /// Deterministic session identifier.
    pub session_id: Uuid,
    /// Opaque session string the agent supplied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_session_id: Option<String>,
    /// Position within the session, assigned by the store (starts at 1).
    pub sequence: i64,
    /// When the action happened (UTC).
    pub timestamp: DateTime<Utc>,
    /// Wall-clock duration of the action.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<i64>,
    /// Agent machine name (e.g. `claude-code`).
    pub agent_name: String,
    /// Agent version string, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_version: Option<String>,
    /// Working directory of the agent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_directory: Option<String>,
    /// Action classification.
    pub action_type: ActionType,
    /// Tool name exactly as the agent reported it.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub tool_name: String,
    /// Outcome.
    pub result_status: ResultStatus,
    /// Failure description when `result_status` is `error`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Variant body, keyed by `action_type`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
    /// Unified diff of a write, kept only at the `full` logging level.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diff_content: Option<String>,
    /// Original hook payload, kept only at the `full` logging level.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_event: Option<String>,
    /// Conversation excerpt, kept only at the `full` logging level.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_context: Option<String>,
    /// Whether the action touched a sensitive path.
    #[serde(default)]
    pub is_sensitive: bool,
}

impl Event {
    /// Construct an event with a fresh id, the current time and `success` status.
    #[must_use]
    pub fn new(session_id: Uuid, agent_name: &str, action_type: ActionType) -> Self {
        Self {
            id: Uuid::new_v4(),
            session_id,
            agent_session_id: None,
            sequence: 0,
            timestamp: Utc::now(),
            duration_ms: None,
            agent_name: agent_name.to_owned(),
            agent_version: None,
            working_directory: None,
            action_type,
            tool_name: String::new(),
            result_status: ResultStatus::Success,
            error_message: None,
            payload: None,
            diff_content: None,
            raw_event: None,
            conversation_context: None,
            is_sensitive: false,
        }
    }

    /// Serialize `payload` into the event's opaque payload field.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` if the payload variant does not belong
    /// to this event's action type, or `AppError::Parse` if it cannot be
    /// serialized.
    pub fn set_payload<P: TypedPayload>(&mut self, payload: &P) -> Result<()> {
        if !P::accepts(self.action_type) {
            return Err(AppError::Validation(format!(
                "{} payload does not fit a {} event",
                P::NAME,
                self.action_type
            )));
        }
        self.payload = Some(serde_json::to_value(payload)?);
        Ok(())
    }

    /// Decode the payload as variant `P`.
    ///
    /// Returns `None` when there is no payload, the action type does not
    /// match `P`, or the body does not decode.
    #[must_use]
    pub fn payload<P: TypedPayload>(&self) -> Option<P> {
        if !P::accepts(self.action_type) {
            return None;
        }
        let value = self.payload.as_ref()?;
        serde_json::from_value(value.clone()).ok()
    }

    /// Primary path of a file action, when present.
    #[must_use]
    pub fn file_path(&self) -> Option<String> {
        if !self.action_type.is_file_action() {
            return None;
        }
        self.payload
            .as_ref()?
            .get("path")?
            .as_str()
            .map(str::to_owned)
    }

    /// Command string of a `command_exec` event, when present.
    #[must_use]
    pub fn command(&self) -> Option<String> {
        if self.action_type != ActionType::CommandExec {
            return None;
        }
        self.payload
            .as_ref()?
            .get("command")?
            .as_str()
            .map(str::to_owned)
    }

    /// Render the event as an export record carrying the `$schema` field.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Parse` if the event cannot be serialized.
    pub fn to_export_value(&self) -> Result<serde_json::Value> {
        let mut value = serde_json::to_value(self)?;
        if let Some(obj) = value.as_object_mut() {
            obj.insert(
                "$schema".to_owned(),
                serde_json::Value::String(EVENT_SCHEMA_URL.to_owned()),
            );
        }
        Ok(value)
    }
}
