//! Session repository for `SQLite` persistence.

use std::sync::Arc;

use serde::Serialize;
use sqlx::{QueryBuilder, Sqlite};
use uuid::Uuid;

use crate::models::filter::SessionFilter;
use crate::models::session::Session;
use crate::{AppError, Result};

use super::db::Database;
use super::{parse_db_time, parse_db_uuid, to_db_time};

const SESSION_COLUMNS: &str = "id, agent_session_id, agent_name, agent_version, started_at, \
     ended_at, working_directory, project_name, total_actions, files_read, files_written, \
     commands_executed, errors";

/// Repository for session records.
#[derive(Clone)]
pub struct SessionRepo {
    db: Arc<Database>,
}

/// Internal row struct for `SQLite` deserialization.
#[derive(sqlx::FromRow)]
struct SessionRow {
    id: String,
    agent_session_id: Option<String>,
    agent_name: String,
    agent_version: Option<String>,
    started_at: String,
    ended_at: Option<String>,
    working_directory: Option<String>,
    project_name: Option<String>,
    total_actions: i64,
    files_read: i64,
    files_written: i64,
    commands_executed: i64,
    errors: i64,
}

impl SessionRow {
    fn into_session(self) -> Result<Session> {
        Ok(Session {
            id: parse_db_uuid(&self.id, "session id")?,
            agent_session_id: self.agent_session_id,
            agent_name: self.agent_name,
            agent_version: self.agent_version,
            started_at: parse_db_time(&self.started_at, "started_at")?,
            ended_at: self
                .ended_at
                .map(|t| parse_db_time(&t, "ended_at"))
                .transpose()?,
            working_directory: self.working_directory,
            project_name: self.project_name,
            total_actions: self.total_actions,
            files_read: self.files_read,
            files_written: self.files_written,
            commands_executed: self.commands_executed,
            errors: self.errors,
        })
    }
}

/// Per-agent session and action totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct AgentStats {
    /// Agent machine name.
    pub agent_name: String,
    /// Number of sessions.
    pub sessions: i64,
    /// Sessions without an end time.
    pub active_sessions: i64,
    /// Sum of recorded actions.
    pub total_actions: i64,
    /// Sum of recorded errors.
    pub errors: i64,
}

impl SessionRepo {
    /// Create a new repository instance.
    #[must_use]
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Insert a new session record.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the insert fails (including a duplicate id).
    pub async fn save(&self, session: &Session) -> Result<()> {
        sqlx::query(&format!(
            "INSERT INTO sessions ({SESSION_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)"
        ))
        .bind(session.id.to_string())
        .bind(&session.agent_session_id)
        .bind(&session.agent_name)
        .bind(&session.agent_version)
        .bind(to_db_time(session.started_at))
        .bind(session.ended_at.map(to_db_time))
        .bind(&session.working_directory)
        .bind(&session.project_name)
        .bind(session.total_actions)
        .bind(session.files_read)
        .bind(session.files_written)
        .bind(session.commands_executed)
        .bind(session.errors)
        .execute(self.db.as_ref())
        .await?;
        Ok(())
    }

    /// Overwrite every mutable field of an existing session.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the session does not exist.
    pub async fn update(&self, session: &Session) -> Result<()> {
        let result = sqlx::query(
            "UPDATE sessions SET agent_session_id = ?2, agent_name = ?3, agent_version = ?4,
                started_at = ?5, ended_at = ?6, working_directory = ?7, project_name = ?8,
                total_actions = ?9, files_read = ?10, files_written = ?11,
                commands_executed = ?12, errors = ?13
             WHERE id = ?1",
        )
        .bind(session.id.to_string())
        .bind(&session.agent_session_id)
        .bind(&session.agent_name)
        .bind(&session.agent_version)
        .bind(to_db_time(session.started_at))
        .bind(session.ended_at.map(to_db_time))
        .bind(&session.working_directory)
        .bind(&session.project_name)
        .bind(session.total_actions)
        .bind(session.files_read)
        .bind(session.files_written)
        .bind(session.commands_executed)
        .bind(session.errors)
        .execute(self.db.as_ref())
        .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("session {}", session.id)));
        }
        Ok(())
    }

    /// Retrieve a session by identifier.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the session does not exist.
    pub async fn get(&self, id: Uuid) -> Result<Session> {
        let row: Option<SessionRow> = sqlx::query_as(&format!(
            "SELECT {SESSION_COLUMNS} FROM sessions WHERE id = ?1"
        ))
        .bind(id.to_string())
        .fetch_optional(self.db.as_ref())
        .await?;
        row.ok_or_else(|| AppError::NotFound(format!("session {id}")))?
            .into_session()
    }

    /// Retrieve the single session whose id starts with `prefix`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if nothing matches or
    /// `AppError::Validation` if the prefix is ambiguous.
    pub async fn get_by_prefix(&self, prefix: &str) -> Result<Session> {
        let rows: Vec<SessionRow> = sqlx::query_as(&format!(
            "SELECT {SESSION_COLUMNS} FROM sessions WHERE id LIKE ?1 || '%' LIMIT 2"
        ))
        .bind(prefix.to_lowercase())
        .fetch_all(self.db.as_ref())
        .await?;
        let mut rows = rows.into_iter();
        match (rows.next(), rows.next()) {
            (Some(row), None) => row.into_session(),
            (None, _) => Err(AppError::NotFound(format!("session {prefix}"))),
            (Some(_), Some(_)) => Err(AppError::Validation(format!(
                "session prefix {prefix} is ambiguous"
            ))),
        }
    }

    /// Sessions matching `filter`, most recently started first.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn query(&self, filter: &SessionFilter) -> Result<Vec<Session>> {
        let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT {SESSION_COLUMNS} FROM sessions"));
        let mut has_where = false;
        let mut clause = |qb: &mut QueryBuilder<'_, Sqlite>| {
            qb.push(if has_where { " AND " } else { " WHERE " });
            has_where = true;
        };
        if let Some(ref agent) = filter.agent {
            clause(&mut qb);
            qb.push("agent_name = ").push_bind(agent.clone());
        }
        if let Some(since) = filter.since {
            clause(&mut qb);
            qb.push("started_at >= ").push_bind(to_db_time(since));
        }
        if let Some(until) = filter.until {
            clause(&mut qb);
            qb.push("started_at < ").push_bind(to_db_time(until));
        }
        if filter.active_only {
            clause(&mut qb);
            qb.push("ended_at IS NULL");
        }
        qb.push(" ORDER BY started_at DESC, id DESC LIMIT ")
            .push_bind(if filter.limit > 0 { filter.limit } else { -1 });
        if filter.offset > 0 {
            qb.push(" OFFSET ").push_bind(filter.offset);
        }
        let rows: Vec<SessionRow> = qb.build_query_as().fetch_all(self.db.as_ref()).await?;
        rows.into_iter().map(SessionRow::into_session).collect()
    }

    /// Most recently started session of `agent` that has not ended.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn get_active(&self, agent: &str) -> Result<Option<Session>> {
        let row: Option<SessionRow> = sqlx::query_as(&format!(
            "SELECT {SESSION_COLUMNS} FROM sessions
             WHERE agent_name = ?1 AND ended_at IS NULL
             ORDER BY started_at DESC LIMIT 1"
        ))
        .bind(agent)
        .fetch_optional(self.db.as_ref())
        .await?;
        row.map(SessionRow::into_session).transpose()
    }

    /// Session totals grouped by agent, by agent name.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn stats(&self) -> Result<Vec<AgentStats>> {
        let rows: Vec<AgentStats> = sqlx::query_as(
            "SELECT agent_name,
                COUNT(*) AS sessions,
                SUM(CASE WHEN ended_at IS NULL THEN 1 ELSE 0 END) AS active_sessions,
                SUM(total_actions) AS total_actions,
                SUM(errors) AS errors
             FROM sessions GROUP BY agent_name ORDER BY agent_name",
        )
        .fetch_all(self.db.as_ref())
        .await?;
        Ok(rows)
    }

    /// Total number of sessions.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn count(&self) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM sessions")
            .fetch_one(self.db.as_ref())
            .await?;
        Ok(count)
    }
}
