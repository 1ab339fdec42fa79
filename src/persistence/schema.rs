//! `SQLite` schema bootstrap logic.
//!
//! All definitions use `IF NOT EXISTS` and are re-run on every open.

use sqlx::SqlitePool;

use crate::Result;

/// Schema version recorded in the `database_init` self-audit.
pub const SCHEMA_VERSION: &str = "1";

/// Apply all table and index definitions.
///
/// # Errors
///
/// Returns `AppError::Db` if any DDL statement fails.
pub async fn bootstrap_schema(pool: &SqlitePool) -> Result<()> {
    let ddl = r"
CREATE TABLE IF NOT EXISTS sessions (
    id                  TEXT PRIMARY KEY NOT NULL,
    agent_session_id    TEXT,
    agent_name          TEXT NOT NULL,
    agent_version       TEXT,
    started_at          TEXT NOT NULL,
    ended_at            TEXT,
    working_directory   TEXT,
    project_name        TEXT,
    total_actions       INTEGER NOT NULL DEFAULT 0,
    files_read          INTEGER NOT NULL DEFAULT 0,
    files_written       INTEGER NOT NULL DEFAULT 0,
    commands_executed   INTEGER NOT NULL DEFAULT 0,
    errors              INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS audit_events (
    id                  TEXT PRIMARY KEY NOT NULL,
    session_id          TEXT NOT NULL,
    agent_session_id    TEXT,
    sequence            INTEGER NOT NULL,
    timestamp           TEXT NOT NULL,
    duration_ms         INTEGER,
    agent_name          TEXT NOT NULL,
    agent_version       TEXT,
    working_directory   TEXT,
    action_type         TEXT NOT NULL,
    tool_name           TEXT NOT NULL DEFAULT '',
    result_status       TEXT NOT NULL CHECK(result_status IN ('success','error','blocked','rejected')),
    error_message       TEXT,
    payload             TEXT,
    diff_content        TEXT,
    raw_event           TEXT,
    conversation_context TEXT,
    is_sensitive        INTEGER NOT NULL DEFAULT 0,
    UNIQUE(session_id, sequence)
);

CREATE TABLE IF NOT EXISTS self_audits (
    id                  TEXT PRIMARY KEY NOT NULL,
    timestamp           TEXT NOT NULL,
    action              TEXT NOT NULL,
    agent_name          TEXT,
    details             TEXT,
    result              TEXT NOT NULL CHECK(result IN ('success','error','skipped')),
    error_message       TEXT,
    tool_version        TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_events_timestamp ON audit_events(timestamp);
CREATE INDEX IF NOT EXISTS idx_events_session ON audit_events(session_id);
CREATE INDEX IF NOT EXISTS idx_events_agent ON audit_events(agent_name);
CREATE INDEX IF NOT EXISTS idx_events_action ON audit_events(action_type);
CREATE INDEX IF NOT EXISTS idx_sessions_started ON sessions(started_at);
CREATE INDEX IF NOT EXISTS idx_self_audits_timestamp ON self_audits(timestamp);
";

    sqlx::raw_sql(ddl).execute(pool).await?;
    Ok(())
}
