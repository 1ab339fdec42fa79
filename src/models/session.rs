//! Session model and lifecycle helpers.

use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::event::{ActionType, Event, ResultStatus};

/// One continuous working session of one agent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Session {
    /// Deterministic identifier derived from the agent session string.
    pub id: Uuid,
    /// Opaque session string the agent supplied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_session_id: Option<String>,
    /// Agent machine name.
    pub agent_name: String,
    /// Agent version, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_version: Option<String>,
    /// Timestamp of the first recorded event.
    pub started_at: DateTime<Utc>,
    /// Set once a `session_end` event is recorded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    /// Working directory of the agent at session start.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_directory: Option<String>,
    /// Base name of the working directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,
    /// Number of events recorded.
    pub total_actions: i64,
    /// Number of `file_read` events.
    pub files_read: i64,
    /// Number of `file_write` events.
    pub files_written: i64,
    /// Number of `command_exec` events.
    pub commands_executed: i64,
    /// Number of events with `error` status.
    pub errors: i64,
}

impl Session {
    /// Construct an empty session for `agent_name` with the given id.
    #[must_use]
    pub fn new(id: Uuid, agent_name: &str) -> Self {
        Self {
            id,
            agent_session_id: None,
            agent_name: agent_name.to_owned(),
            agent_version: None,
            started_at: Utc::now(),
            ended_at: None,
            working_directory: None,
            project_name: None,
            total_actions: 0,
            files_read: 0,
            files_written: 0,
            commands_executed: 0,
            errors: 0,
        }
    }

    /// Build the session an event implicitly opens.
    #[must_use]
    pub fn from_event(event: &Event) -> Self {
        let mut session = Self::new(event.session_id, &event.agent_name);
        session.agent_session_id.clone_from(&event.agent_session_id);
        session.agent_version.clone_from(&event.agent_version);
        session.started_at = event.timestamp;
        session.working_directory.clone_from(&event.working_directory);
        session.project_name = event
            .working_directory
            .as_deref()
            .and_then(detect_project_name);
        session
    }

    /// Whether the session has not been ended.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.ended_at.is_none()
    }

    /// Elapsed time from start to end, or to now while active.
    #[must_use]
    pub fn duration(&self) -> Duration {
        self.ended_at.unwrap_or_else(Utc::now) - self.started_at
    }

    /// Fold one recorded event into the denormalized counters.
    pub fn record(&mut self, event: &Event) {
        self.total_actions += 1;
        match event.action_type {
            ActionType::FileRead => self.files_read += 1,
            ActionType::FileWrite => self.files_written += 1,
            ActionType::CommandExec => self.commands_executed += 1,
            _ => {}
        }
        if event.result_status == ResultStatus::Error {
            self.errors += 1;
        }
        if event.action_type == ActionType::SessionEnd && self.ended_at.is_none() {
            self.ended_at = Some(event.timestamp.max(self.started_at));
        }
    }
}

/// Project name for a working directory: its last path component.
#[must_use]
pub fn detect_project_name(working_directory: &str) -> Option<String> {
    let trimmed = working_directory.trim_end_matches(['/', '\\']);
    if trimmed.is_empty() {
        return None;
    }
    Path::new(trimmed)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
}
