//! Error types shared across the application.

use std::fmt::{Display, Formatter};

/// Shared application result type.
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error enumeration covering all domain failure modes.
#[derive(Debug)]
pub enum AppError {
    /// Configuration parsing or validation failure.
    Config(String),
    /// Persistence failure when interacting with `SQLite`.
    Db(String),
    /// Hook payload could not be decoded.
    Parse(String),
    /// Event or input violates a model invariant.
    Validation(String),
    /// A security check refused the action; carries the reason.
    PolicyBlock(String),
    /// No adapter is registered under the requested agent name.
    UnknownAgent(String),
    /// The hook invocation exceeded its time budget.
    Timeout(String),
    /// Sensitive-path glob or redaction regex failed to compile.
    Privacy(String),
    /// Requested entity does not exist.
    NotFound(String),
    /// File-system or I/O operation failure.
    Io(String),
}

impl AppError {
    /// Process exit code for this error under the hook protocol.
    ///
    /// Only a deliberate block yields `2`. A timeout is fail-open (`0`);
    /// every other failure is informational (`1`) and lets the agent proceed.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::PolicyBlock(_) => 2,
            Self::Timeout(_) => 0,
            _ => 1,
        }
    }
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Db(msg) => write!(f, "db: {msg}"),
            Self::Parse(msg) => write!(f, "parse: {msg}"),
            Self::Validation(msg) => write!(f, "validation: {msg}"),
            Self::PolicyBlock(msg) => write!(f, "blocked: {msg}"),
            Self::UnknownAgent(msg) => write!(f, "unknown agent: {msg}"),
            Self::Timeout(msg) => write!(f, "timeout: {msg}"),
            Self::Privacy(msg) => write!(f, "privacy: {msg}"),
            Self::NotFound(msg) => write!(f, "not found: {msg}"),
            Self::Io(msg) => write!(f, "io: {msg}"),
        }
    }
}

impl std::error::Error for AppError {}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Config(format!("invalid config: {err}"))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        Self::Db(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
