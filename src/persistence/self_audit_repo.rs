//! Self-audit repository for `SQLite` persistence.
//!
//! Records here are never touched by retention cleanup.

use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite};
use uuid::Uuid;

use crate::models::filter::SelfAuditFilter;
use crate::models::self_audit::{SelfAudit, SelfAuditAction, SelfAuditResult};
use crate::{AppError, Result};

use super::db::Database;
use super::{parse_db_time, parse_db_uuid, to_db_time};

const SELF_AUDIT_COLUMNS: &str =
    "id, timestamp, action, agent_name, details, result, error_message, tool_version";

/// Repository for self-audit records.
#[derive(Clone)]
pub struct SelfAuditRepo {
    db: Arc<Database>,
}

/// Internal row struct for `SQLite` deserialization.
#[derive(sqlx::FromRow)]
struct SelfAuditRow {
    id: String,
    timestamp: String,
    action: String,
    agent_name: Option<String>,
    details: Option<String>,
    result: String,
    error_message: Option<String>,
    tool_version: String,
}

impl SelfAuditRow {
    fn into_self_audit(self) -> Result<SelfAudit> {
        let action = SelfAuditAction::from_str(&self.action)
            .map_err(|e| AppError::Db(format!("invalid action: {e}")))?;
        let result = SelfAuditResult::from_str(&self.result)
            .map_err(|e| AppError::Db(format!("invalid result: {e}")))?;
        let details = self
            .details
            .as_deref()
            .map(serde_json::from_str)
            .transpose()
            .map_err(|e| AppError::Db(format!("invalid details: {e}")))?;

        Ok(SelfAudit {
            id: parse_db_uuid(&self.id, "self-audit id")?,
            timestamp: parse_db_time(&self.timestamp, "timestamp")?,
            action,
            agent_name: self.agent_name,
            details,
            result,
            error_message: self.error_message,
            tool_version: self.tool_version,
        })
    }
}

impl SelfAuditRepo {
    /// Create a new repository instance.
    #[must_use]
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Insert a self-audit record.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the insert fails.
    pub async fn save(&self, record: &SelfAudit) -> Result<()> {
        sqlx::query(&format!(
            "INSERT INTO self_audits ({SELF_AUDIT_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"
        ))
        .bind(record.id.to_string())
        .bind(to_db_time(record.timestamp))
        .bind(record.action.as_str())
        .bind(&record.agent_name)
        .bind(record.details.as_ref().map(ToString::to_string))
        .bind(record.result.as_str())
        .bind(&record.error_message)
        .bind(&record.tool_version)
        .execute(self.db.as_ref())
        .await?;
        Ok(())
    }

    /// Records matching `filter`, newest first.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn query(&self, filter: &SelfAuditFilter) -> Result<Vec<SelfAudit>> {
        let mut qb =
            QueryBuilder::<Sqlite>::new(format!("SELECT {SELF_AUDIT_COLUMNS} FROM self_audits"));
        match (filter.since, filter.action) {
            (Some(since), Some(action)) => {
                qb.push(" WHERE timestamp >= ")
                    .push_bind(to_db_time(since))
                    .push(" AND action = ")
                    .push_bind(action.as_str());
            }
            (Some(since), None) => {
                qb.push(" WHERE timestamp >= ").push_bind(to_db_time(since));
            }
            (None, Some(action)) => {
                qb.push(" WHERE action = ").push_bind(action.as_str());
            }
            (None, None) => {}
        }
        qb.push(" ORDER BY timestamp DESC, id DESC LIMIT ")
            .push_bind(if filter.limit > 0 { filter.limit } else { -1 });
        let rows: Vec<SelfAuditRow> = qb.build_query_as().fetch_all(self.db.as_ref()).await?;
        rows.into_iter().map(SelfAuditRow::into_self_audit).collect()
    }

    /// Next batch of records after the `(timestamp, id)` cursor, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn query_after(
        &self,
        after: Option<(DateTime<Utc>, Uuid)>,
        limit: i64,
    ) -> Result<Vec<SelfAudit>> {
        let mut qb =
            QueryBuilder::<Sqlite>::new(format!("SELECT {SELF_AUDIT_COLUMNS} FROM self_audits"));
        if let Some((ts, id)) = after {
            let ts = to_db_time(ts);
            qb.push(" WHERE timestamp > ")
                .push_bind(ts.clone())
                .push(" OR (timestamp = ")
                .push_bind(ts)
                .push(" AND id > ")
                .push_bind(id.to_string())
                .push(")");
        }
        qb.push(" ORDER BY timestamp ASC, id ASC LIMIT ")
            .push_bind(if limit > 0 { limit } else { -1 });
        let rows: Vec<SelfAuditRow> = qb.build_query_as().fetch_all(self.db.as_ref()).await?;
        rows.into_iter().map(SelfAuditRow::into_self_audit).collect()
    }

    /// Newest record of `action`, if any.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn latest(&self, action: SelfAuditAction) -> Result<Option<SelfAudit>> {
        let row: Option<SelfAuditRow> = sqlx::query_as(&format!(
            "SELECT {SELF_AUDIT_COLUMNS} FROM self_audits WHERE action = ?1
             ORDER BY timestamp DESC LIMIT 1"
        ))
        .bind(action.as_str())
        .fetch_optional(self.db.as_ref())
        .await?;
        row.map(SelfAuditRow::into_self_audit).transpose()
    }

    /// Total number of records.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn count(&self) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM self_audits")
            .fetch_one(self.db.as_ref())
            .await?;
        Ok(count)
    }
}
