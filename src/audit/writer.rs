//! Store-backed self-audit writer.

use tracing::{debug, warn};

use crate::models::self_audit::SelfAudit;
use crate::persistence::SelfAuditRepo;
use crate::Result;

/// Appends self-audit records to the store.
#[derive(Clone)]
pub struct SelfAuditWriter {
    repo: SelfAuditRepo,
}

impl SelfAuditWriter {
    /// Writer over `repo`.
    #[must_use]
    pub fn new(repo: SelfAuditRepo) -> Self {
        Self { repo }
    }

    /// Persist `record`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the insert fails.
    pub async fn write(&self, record: &SelfAudit) -> Result<()> {
        self.repo.save(record).await?;
        debug!(action = %record.action, result = record.result.as_str(), "self-audit recorded");
        Ok(())
    }

    /// Persist `record`; a failure is logged, not returned.
    pub async fn write_or_warn(&self, record: &SelfAudit) {
        if let Err(err) = self.write(record).await {
            warn!(%err, action = %record.action, "failed to write self-audit record");
        }
    }
}
