//! Audit event repository for `SQLite` persistence.
//!
//! [`EventRepo::save`] is the only writer. It runs session lookup, sequence
//! allocation, the insert and the counter update in one transaction, so
//! concurrent hook processes writing into the same session converge.

use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite};
use tracing::debug;
use uuid::Uuid;

use crate::models::event::{ActionType, Event, ResultStatus};
use crate::models::filter::EventFilter;
use crate::models::session::Session;
use crate::{AppError, Result};

use super::db::Database;
use super::{parse_db_time, parse_db_uuid, to_db_time};

/// Attempts made when a concurrent writer took the same sequence number.
const MAX_SEQUENCE_RETRIES: u32 = 5;

const EVENT_COLUMNS: &str = "id, session_id, agent_session_id, sequence, timestamp, duration_ms, \
     agent_name, agent_version, working_directory, action_type, tool_name, result_status, \
     error_message, payload, diff_content, raw_event, conversation_context, is_sensitive";

/// Repository for audit event records.
#[derive(Clone)]
pub struct EventRepo {
    db: Arc<Database>,
}

/// Internal row struct for `SQLite` deserialization.
#[derive(sqlx::FromRow)]
struct EventRow {
    id: String,
    session_id: String,
    agent_session_id: Option<String>,
    sequence: i64,
    timestamp: String,
    duration_ms: Option<i64>,
    agent_name: String,
    agent_version: Option<String>,
    working_directory: Option<String>,
    action_type: String,
    tool_name: String,
    result_status: String,
    error_message: Option<String>,
    payload: Option<String>,
    diff_content: Option<String>,
    raw_event: Option<String>,
    conversation_context: Option<String>,
    is_sensitive: i64,
}

impl EventRow {
    fn into_event(self) -> Result<Event> {
        let action_type = ActionType::from_str(&self.action_type)
            .map_err(|e| AppError::Db(format!("invalid action_type: {e}")))?;
        let result_status = ResultStatus::from_str(&self.result_status)
            .map_err(|e| AppError::Db(format!("invalid result_status: {e}")))?;
        let payload = self
            .payload
            .as_deref()
            .map(serde_json::from_str)
            .transpose()
            .map_err(|e| AppError::Db(format!("invalid payload: {e}")))?;

        Ok(Event {
            id: parse_db_uuid(&self.id, "event id")?,
            session_id: parse_db_uuid(&self.session_id, "session_id")?,
            agent_session_id: self.agent_session_id,
            sequence: self.sequence,
            timestamp: parse_db_time(&self.timestamp, "timestamp")?,
            duration_ms: self.duration_ms,
            agent_name: self.agent_name,
            agent_version: self.agent_version,
            working_directory: self.working_directory,
            action_type,
            tool_name: self.tool_name,
            result_status,
            error_message: self.error_message,
            payload,
            diff_content: self.diff_content,
            raw_event: self.raw_event,
            conversation_context: self.conversation_context,
            is_sensitive: self.is_sensitive != 0,
        })
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(e) if e.is_unique_violation())
}

impl EventRepo {
    /// Create a new repository instance.
    #[must_use]
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Persist `event`, assigning its sequence number.
    ///
    /// Creates the session on first sight and folds the event into the
    /// session counters in the same transaction. A `session_end` event sets
    /// the session's end time once; later events do not reopen it.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the write fails, including after
    /// exhausting sequence-collision retries.
    pub async fn save(&self, event: &mut Event) -> Result<()> {
        let mut attempt = 0;
        loop {
            match self.try_save(event).await {
                Ok(sequence) => {
                    event.sequence = sequence;
                    return Ok(());
                }
                Err(err) if is_unique_violation(&err) && attempt < MAX_SEQUENCE_RETRIES => {
                    attempt += 1;
                    debug!(session_id = %event.session_id, attempt, "sequence collision, retrying");
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    async fn try_save(&self, event: &Event) -> std::result::Result<i64, sqlx::Error> {
        let mut tx = self.db.begin().await?;
        let session_id = event.session_id.to_string();

        // The first statement writes, so the transaction holds the write
        // lock before the sequence is read.
        let session = Session::from_event(event);
        sqlx::query(
            "INSERT INTO sessions (id, agent_session_id, agent_name, agent_version, started_at,
                working_directory, project_name)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(id) DO NOTHING",
        )
        .bind(&session_id)
        .bind(&session.agent_session_id)
        .bind(&session.agent_name)
        .bind(&session.agent_version)
        .bind(to_db_time(session.started_at))
        .bind(&session.working_directory)
        .bind(&session.project_name)
        .execute(&mut *tx)
        .await?;

        let (sequence,): (i64,) = sqlx::query_as(
            "SELECT COALESCE(MAX(sequence), 0) + 1 FROM audit_events WHERE session_id = ?1",
        )
        .bind(&session_id)
        .fetch_one(&mut *tx)
        .await?;

        let payload = event.payload.as_ref().map(ToString::to_string);
        sqlx::query(
            "INSERT INTO audit_events (id, session_id, agent_session_id, sequence, timestamp,
                duration_ms, agent_name, agent_version, working_directory, action_type, tool_name,
                result_status, error_message, payload, diff_content, raw_event,
                conversation_context, is_sensitive)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)",
        )
        .bind(event.id.to_string())
        .bind(&session_id)
        .bind(&event.agent_session_id)
        .bind(sequence)
        .bind(to_db_time(event.timestamp))
        .bind(event.duration_ms)
        .bind(&event.agent_name)
        .bind(&event.agent_version)
        .bind(&event.working_directory)
        .bind(event.action_type.as_str())
        .bind(&event.tool_name)
        .bind(event.result_status.as_str())
        .bind(&event.error_message)
        .bind(payload)
        .bind(&event.diff_content)
        .bind(&event.raw_event)
        .bind(&event.conversation_context)
        .bind(i64::from(event.is_sensitive))
        .execute(&mut *tx)
        .await?;

        let is_end = event.action_type == ActionType::SessionEnd;
        sqlx::query(
            "UPDATE sessions SET
                total_actions = total_actions + 1,
                files_read = files_read + ?2,
                files_written = files_written + ?3,
                commands_executed = commands_executed + ?4,
                errors = errors + ?5,
                agent_session_id = COALESCE(agent_session_id, ?6),
                ended_at = CASE WHEN ?7 = 1 AND ended_at IS NULL
                    THEN MAX(?8, started_at) ELSE ended_at END
             WHERE id = ?1",
        )
        .bind(&session_id)
        .bind(i64::from(event.action_type == ActionType::FileRead))
        .bind(i64::from(event.action_type == ActionType::FileWrite))
        .bind(i64::from(event.action_type == ActionType::CommandExec))
        .bind(i64::from(event.result_status == ResultStatus::Error))
        .bind(&event.agent_session_id)
        .bind(i64::from(is_end))
        .bind(to_db_time(event.timestamp))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(sequence)
    }

    /// Retrieve an event by identifier.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if no event has this id.
    pub async fn get(&self, id: Uuid) -> Result<Event> {
        let row: Option<EventRow> = sqlx::query_as(&format!(
            "SELECT {EVENT_COLUMNS} FROM audit_events WHERE id = ?1"
        ))
        .bind(id.to_string())
        .fetch_optional(self.db.as_ref())
        .await?;
        row.ok_or_else(|| AppError::NotFound(format!("event {id}")))?
            .into_event()
    }

    /// Retrieve the single event whose id starts with `prefix`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if nothing matches or
    /// `AppError::Validation` if the prefix is ambiguous.
    pub async fn get_by_prefix(&self, prefix: &str) -> Result<Event> {
        let rows: Vec<EventRow> = sqlx::query_as(&format!(
            "SELECT {EVENT_COLUMNS} FROM audit_events WHERE id LIKE ?1 || '%' LIMIT 2"
        ))
        .bind(prefix.to_lowercase())
        .fetch_all(self.db.as_ref())
        .await?;
        let mut rows = rows.into_iter();
        match (rows.next(), rows.next()) {
            (Some(row), None) => row.into_event(),
            (None, _) => Err(AppError::NotFound(format!("event {prefix}"))),
            (Some(_), Some(_)) => Err(AppError::Validation(format!(
                "event prefix {prefix} is ambiguous"
            ))),
        }
    }

    /// Events matching `filter`, newest first.
    ///
    /// Path and command globs are evaluated on decoded payloads, before
    /// limit and offset apply.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn query(&self, filter: &EventFilter) -> Result<Vec<Event>> {
        let mut qb =
            QueryBuilder::<Sqlite>::new(format!("SELECT {EVENT_COLUMNS} FROM audit_events"));
        push_filter(&mut qb, filter);
        qb.push(" ORDER BY timestamp DESC, id DESC");

        if !filter.has_payload_predicates() {
            push_limit(&mut qb, filter.limit, filter.offset);
            let rows: Vec<EventRow> = qb.build_query_as().fetch_all(self.db.as_ref()).await?;
            return rows.into_iter().map(EventRow::into_event).collect();
        }

        let rows: Vec<EventRow> = qb.build_query_as().fetch_all(self.db.as_ref()).await?;
        let mut matched = Vec::new();
        for row in rows {
            let event = row.into_event()?;
            if filter.matches_payload(&event) {
                matched.push(event);
            }
        }
        let skip = usize::try_from(filter.offset).unwrap_or(0);
        let take = usize::try_from(filter.limit)
            .ok()
            .filter(|n| *n > 0)
            .unwrap_or(usize::MAX);
        Ok(matched.into_iter().skip(skip).take(take).collect())
    }

    /// Number of events matching `filter`, ignoring limit and offset.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn count(&self, filter: &EventFilter) -> Result<i64> {
        if filter.has_payload_predicates() {
            let unbounded = filter.clone().with_limit(0).with_offset(0);
            let events = self.query(&unbounded).await?;
            return Ok(i64::try_from(events.len()).unwrap_or(i64::MAX));
        }
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM audit_events");
        push_filter(&mut qb, filter);
        let (count,): (i64,) = qb.build_query_as().fetch_one(self.db.as_ref()).await?;
        Ok(count)
    }

    /// Next batch of events after the `(timestamp, id)` cursor, oldest first.
    ///
    /// The cursor keeps events that share a timestamp from being skipped at
    /// batch boundaries. Time, agent, session, action and status constraints
    /// of `filter` apply; its globs, limit and offset do not.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn query_after(
        &self,
        filter: &EventFilter,
        after: Option<(DateTime<Utc>, Uuid)>,
        limit: i64,
    ) -> Result<Vec<Event>> {
        let mut qb =
            QueryBuilder::<Sqlite>::new(format!("SELECT {EVENT_COLUMNS} FROM audit_events"));
        let has_where = push_filter(&mut qb, filter);
        if let Some((ts, id)) = after {
            qb.push(if has_where { " AND " } else { " WHERE " });
            let ts = to_db_time(ts);
            qb.push("(timestamp > ")
                .push_bind(ts.clone())
                .push(" OR (timestamp = ")
                .push_bind(ts)
                .push(" AND id > ")
                .push_bind(id.to_string())
                .push("))");
        }
        qb.push(" ORDER BY timestamp ASC, id ASC");
        push_limit(&mut qb, limit, 0);
        let rows: Vec<EventRow> = qb.build_query_as().fetch_all(self.db.as_ref()).await?;
        rows.into_iter().map(EventRow::into_event).collect()
    }

    /// Every event of a session in sequence order.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn get_by_session(&self, session_id: Uuid) -> Result<Vec<Event>> {
        let rows: Vec<EventRow> = sqlx::query_as(&format!(
            "SELECT {EVENT_COLUMNS} FROM audit_events WHERE session_id = ?1 ORDER BY sequence ASC"
        ))
        .bind(session_id.to_string())
        .fetch_all(self.db.as_ref())
        .await?;
        rows.into_iter().map(EventRow::into_event).collect()
    }

    /// Delete events strictly older than `before`.
    ///
    /// Returns the number of rows deleted.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the delete fails.
    pub async fn delete_before(&self, before: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM audit_events WHERE timestamp < ?1")
            .bind(to_db_time(before))
            .execute(self.db.as_ref())
            .await?;
        Ok(result.rows_affected())
    }

    /// Number of events strictly older than `before`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn count_before(&self, before: DateTime<Utc>) -> Result<i64> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM audit_events WHERE timestamp < ?1")
                .bind(to_db_time(before))
                .fetch_one(self.db.as_ref())
                .await?;
        Ok(count)
    }

    /// Total number of events.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn count_all(&self) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM audit_events")
            .fetch_one(self.db.as_ref())
            .await?;
        Ok(count)
    }

    /// Timestamps of the oldest and newest events.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails or a timestamp is malformed.
    pub async fn time_span(&self) -> Result<(Option<DateTime<Utc>>, Option<DateTime<Utc>>)> {
        let (oldest, newest): (Option<String>, Option<String>) =
            sqlx::query_as("SELECT MIN(timestamp), MAX(timestamp) FROM audit_events")
                .fetch_one(self.db.as_ref())
                .await?;
        Ok((
            oldest.map(|t| parse_db_time(&t, "timestamp")).transpose()?,
            newest.map(|t| parse_db_time(&t, "timestamp")).transpose()?,
        ))
    }
}

/// Append the SQL-expressible part of `filter` as a `WHERE` clause.
///
/// Returns whether a clause was written.
fn push_filter(qb: &mut QueryBuilder<'_, Sqlite>, filter: &EventFilter) -> bool {
    let mut has_where = false;

    if let Some(since) = filter.since {
        next_clause(qb, &mut has_where);
        qb.push("timestamp >= ").push_bind(to_db_time(since));
    }
    if let Some(until) = filter.until {
        next_clause(qb, &mut has_where);
        qb.push("timestamp < ").push_bind(to_db_time(until));
    }
    if let Some(session_id) = filter.session_id {
        next_clause(qb, &mut has_where);
        qb.push("session_id = ").push_bind(session_id.to_string());
    }
    if !filter.agents.is_empty() {
        next_clause(qb, &mut has_where);
        qb.push("agent_name IN (");
        let mut list = qb.separated(", ");
        for agent in &filter.agents {
            list.push_bind(agent.clone());
        }
        list.push_unseparated(")");
    }
    if !filter.actions.is_empty() {
        next_clause(qb, &mut has_where);
        qb.push("action_type IN (");
        let mut list = qb.separated(", ");
        for action in &filter.actions {
            list.push_bind(action.as_str());
        }
        list.push_unseparated(")");
    }
    if !filter.statuses.is_empty() {
        next_clause(qb, &mut has_where);
        qb.push("result_status IN (");
        let mut list = qb.separated(", ");
        for status in &filter.statuses {
            list.push_bind(status.as_str());
        }
        list.push_unseparated(")");
    }
    has_where
}

fn next_clause(qb: &mut QueryBuilder<'_, Sqlite>, has_where: &mut bool) {
    qb.push(if *has_where { " AND " } else { " WHERE " });
    *has_where = true;
}

/// Append `LIMIT`/`OFFSET`; a non-positive limit means unlimited.
fn push_limit(qb: &mut QueryBuilder<'_, Sqlite>, limit: i64, offset: i64) {
    qb.push(" LIMIT ").push_bind(if limit > 0 { limit } else { -1 });
    if offset > 0 {
        qb.push(" OFFSET ").push_bind(offset);
    }
}
