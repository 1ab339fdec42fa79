//! Persistence layer: `SQLite` pool, repositories and the [`Store`] facade.

pub mod db;
pub mod event_repo;
pub mod retention;
pub mod schema;
pub mod self_audit_repo;
pub mod session_repo;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use tracing::info;

use crate::models::self_audit::{DatabaseInitDetails, SelfAudit, SelfAuditAction};
use crate::{AppError, Result};

pub use db::Database;
pub use event_repo::EventRepo;
pub use self_audit_repo::SelfAuditRepo;
pub use session_repo::SessionRepo;

/// Render a timestamp for storage.
///
/// Fixed-width UTC with microseconds so that text order equals time order.
pub(crate) fn to_db_time(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a stored timestamp.
pub(crate) fn parse_db_time(raw: &str, field: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| AppError::Db(format!("invalid {field}: {e}")))
}

pub(crate) fn parse_db_uuid(raw: &str, field: &str) -> Result<uuid::Uuid> {
    uuid::Uuid::parse_str(raw).map_err(|e| AppError::Db(format!("invalid {field}: {e}")))
}

/// Summary of the store shown by `gryph info`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DatabaseInfo {
    /// Store file, absent for in-memory stores.
    pub path: Option<String>,
    /// File size in bytes.
    pub size_bytes: Option<u64>,
    /// Number of events.
    pub event_count: i64,
    /// Number of sessions.
    pub session_count: i64,
    /// Number of self-audit records.
    pub self_audit_count: i64,
    /// Timestamp of the oldest event.
    pub oldest_event: Option<DateTime<Utc>>,
    /// Timestamp of the newest event.
    pub newest_event: Option<DateTime<Utc>>,
}

/// All repositories over one pool.
#[derive(Clone)]
pub struct Store {
    db: Arc<Database>,
    path: Option<PathBuf>,
    /// Audit events.
    pub events: EventRepo,
    /// Sessions.
    pub sessions: SessionRepo,
    /// Self-audit records.
    pub self_audits: SelfAuditRepo,
}

impl Store {
    /// Wrap an existing pool.
    #[must_use]
    pub fn from_database(db: Arc<Database>) -> Self {
        Self {
            events: EventRepo::new(Arc::clone(&db)),
            sessions: SessionRepo::new(Arc::clone(&db)),
            self_audits: SelfAuditRepo::new(Arc::clone(&db)),
            db,
            path: None,
        }
    }

    /// Open the store file at `path`, creating it and its schema when absent.
    ///
    /// A newly created file gets a `database_init` self-audit record.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the file cannot be opened or initialised.
    pub async fn open(path: &Path) -> Result<Self> {
        let created = !path.exists();
        let db = Arc::new(db::connect(path).await?);
        let mut store = Self::from_database(db);
        store.path = Some(path.to_path_buf());

        if created {
            info!(path = %path.display(), "created audit store");
            let record = SelfAudit::new(SelfAuditAction::DatabaseInit).with_details(
                &DatabaseInitDetails {
                    path: path.display().to_string(),
                    schema_version: schema::SCHEMA_VERSION.to_owned(),
                },
            );
            store.self_audits.save(&record).await?;
        }
        Ok(store)
    }

    /// Fresh in-memory store.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the pool cannot be created.
    pub async fn open_memory() -> Result<Self> {
        Ok(Self::from_database(Arc::new(db::connect_memory().await?)))
    }

    /// Shared pool handle.
    #[must_use]
    pub fn database(&self) -> Arc<Database> {
        Arc::clone(&self.db)
    }

    /// Close every pooled connection. Later calls fail with `AppError::Db`.
    pub async fn close(&self) {
        self.db.close().await;
    }

    /// Counts and time span of the stored data.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if a query fails.
    pub async fn database_info(&self) -> Result<DatabaseInfo> {
        let (oldest_event, newest_event) = self.events.time_span().await?;
        Ok(DatabaseInfo {
            path: self.path.as_ref().map(|p| p.display().to_string()),
            size_bytes: self
                .path
                .as_ref()
                .and_then(|p| std::fs::metadata(p).ok())
                .map(|m| m.len()),
            event_count: self.events.count_all().await?,
            session_count: self.sessions.count().await?,
            self_audit_count: self.self_audits.count().await?,
            oldest_event,
            newest_event,
        })
    }
}
