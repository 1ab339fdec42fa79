//! Query filters for events, sessions and self-audit records.

use chrono::{DateTime, Duration, Local, NaiveTime, TimeZone, Utc};
use tracing::warn;
use uuid::Uuid;

use super::event::{ActionType, Event, ResultStatus};
use super::self_audit::SelfAuditAction;

const DEFAULT_EVENT_LIMIT: i64 = 100;
const DEFAULT_SESSION_LIMIT: i64 = 20;

/// Criteria for selecting events. Empty collections mean "any".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventFilter {
    /// Inclusive lower time bound.
    pub since: Option<DateTime<Utc>>,
    /// Exclusive upper time bound.
    pub until: Option<DateTime<Utc>>,
    /// Agent machine names.
    pub agents: Vec<String>,
    /// Single session.
    pub session_id: Option<Uuid>,
    /// Action types.
    pub actions: Vec<ActionType>,
    /// Result statuses.
    pub statuses: Vec<ResultStatus>,
    /// Glob over the primary path of file actions.
    pub file_pattern: Option<String>,
    /// Glob over the command string of exec actions.
    pub command_pattern: Option<String>,
    /// Maximum rows returned; `0` means unlimited.
    pub limit: i64,
    /// Rows skipped before the first returned.
    pub offset: i64,
}

impl Default for EventFilter {
    fn default() -> Self {
        Self {
            since: None,
            until: None,
            agents: Vec::new(),
            session_id: None,
            actions: Vec::new(),
            statuses: Vec::new(),
            file_pattern: None,
            command_pattern: None,
            limit: DEFAULT_EVENT_LIMIT,
            offset: 0,
        }
    }
}

impl EventFilter {
    /// Filter with the default limit and no constraints.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Events since local midnight today.
    #[must_use]
    pub fn today() -> Self {
        Self::new().with_since(local_midnight(0))
    }

    /// Events between local midnight yesterday and local midnight today.
    #[must_use]
    pub fn yesterday() -> Self {
        Self::new()
            .with_since(local_midnight(1))
            .with_until(local_midnight(0))
    }

    /// Set the inclusive lower time bound.
    #[must_use]
    pub fn with_since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    /// Set the exclusive upper time bound.
    #[must_use]
    pub fn with_until(mut self, until: DateTime<Utc>) -> Self {
        self.until = Some(until);
        self
    }

    /// Restrict to the given agents.
    #[must_use]
    pub fn with_agents(mut self, agents: Vec<String>) -> Self {
        self.agents = agents;
        self
    }

    /// Restrict to one session.
    #[must_use]
    pub fn with_session(mut self, session_id: Uuid) -> Self {
        self.session_id = Some(session_id);
        self
    }

    /// Restrict to the given action types.
    #[must_use]
    pub fn with_actions(mut self, actions: Vec<ActionType>) -> Self {
        self.actions = actions;
        self
    }

    /// Restrict to the given result statuses.
    #[must_use]
    pub fn with_statuses(mut self, statuses: Vec<ResultStatus>) -> Self {
        self.statuses = statuses;
        self
    }

    /// Restrict to file events whose path matches `pattern`.
    #[must_use]
    pub fn with_file_pattern(mut self, pattern: &str) -> Self {
        self.file_pattern = Some(pattern.to_owned());
        self
    }

    /// Restrict to exec events whose command matches `pattern`.
    #[must_use]
    pub fn with_command_pattern(mut self, pattern: &str) -> Self {
        self.command_pattern = Some(pattern.to_owned());
        self
    }

    /// Set the row limit; `0` disables it.
    #[must_use]
    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = limit;
        self
    }

    /// Set the row offset.
    #[must_use]
    pub fn with_offset(mut self, offset: i64) -> Self {
        self.offset = offset;
        self
    }

    /// Whether a glob predicate must be evaluated on decoded payloads.
    #[must_use]
    pub fn has_payload_predicates(&self) -> bool {
        self.file_pattern.is_some() || self.command_pattern.is_some()
    }

    /// Evaluate the payload glob predicates against a decoded event.
    ///
    /// An invalid glob matches nothing.
    #[must_use]
    pub fn matches_payload(&self, event: &Event) -> bool {
        if let Some(ref pattern) = self.file_pattern {
            match event.file_path() {
                Some(path) if glob_matches(pattern, &path) => {}
                _ => return false,
            }
        }
        if let Some(ref pattern) = self.command_pattern {
            match event.command() {
                Some(cmd) if glob_matches(pattern, &cmd) => {}
                _ => return false,
            }
        }
        true
    }
}

/// Criteria for selecting sessions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionFilter {
    /// Agent machine name.
    pub agent: Option<String>,
    /// Sessions started at or after.
    pub since: Option<DateTime<Utc>>,
    /// Sessions started before.
    pub until: Option<DateTime<Utc>>,
    /// Only sessions without an end time.
    pub active_only: bool,
    /// Maximum rows returned; `0` means unlimited.
    pub limit: i64,
    /// Rows skipped before the first returned.
    pub offset: i64,
}

impl Default for SessionFilter {
    fn default() -> Self {
        Self {
            agent: None,
            since: None,
            until: None,
            active_only: false,
            limit: DEFAULT_SESSION_LIMIT,
            offset: 0,
        }
    }
}

/// Criteria for selecting self-audit records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelfAuditFilter {
    /// Records at or after.
    pub since: Option<DateTime<Utc>>,
    /// Single action kind.
    pub action: Option<SelfAuditAction>,
    /// Maximum rows returned; `0` means unlimited.
    pub limit: i64,
}

fn glob_matches(pattern: &str, candidate: &str) -> bool {
    match glob::Pattern::new(pattern) {
        Ok(p) => p.matches(candidate),
        Err(err) => {
            warn!(%pattern, %err, "invalid glob in event filter");
            false
        }
    }
}

fn local_midnight(days_ago: i64) -> DateTime<Utc> {
    let date = Local::now().date_naive() - Duration::days(days_ago);
    let naive = date.and_time(NaiveTime::MIN);
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map_or_else(|| naive.and_utc(), |dt| dt.with_timezone(&Utc))
}
