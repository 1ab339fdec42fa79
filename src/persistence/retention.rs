//! Retention policy for time-based event deletion.
//!
//! Only audit events are deleted. Sessions stay as metadata and
//! self-audit records are always kept.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{debug, info};

use crate::models::self_audit::{RetentionCleanupDetails, SelfAudit, SelfAuditAction};
use crate::Result;

use super::Store;

/// Minimum spacing between opportunistic cleanups run from the hook path.
const AUTO_CLEANUP_INTERVAL_HOURS: i64 = 24;

/// How long events are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    /// Retention window in days; `0` disables deletion.
    pub days: u32,
    /// Always `true`: self-audit records are exempt from deletion.
    pub keep_self_audit: bool,
}

impl RetentionPolicy {
    /// Policy keeping events for `days` days.
    #[must_use]
    pub fn new(days: u32) -> Self {
        Self {
            days,
            keep_self_audit: true,
        }
    }

    /// Whether any deletion happens.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.days > 0
    }

    /// Events strictly older than this are deleted; `None` when disabled.
    #[must_use]
    pub fn cutoff_time(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.is_enabled()
            .then(|| now - Duration::days(i64::from(self.days)))
    }

    /// Whether an event stamped `timestamp` is past retention at `now`.
    #[must_use]
    pub fn should_delete(&self, timestamp: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        self.cutoff_time(now).is_some_and(|cutoff| timestamp < cutoff)
    }
}

/// Outcome of a cleanup run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    /// Events deleted, or that would be deleted on a dry run.
    pub events_deleted: u64,
    /// Cutoff applied; `None` when retention is disabled.
    pub cutoff_time: Option<DateTime<Utc>>,
    /// Oldest event left after the run.
    pub oldest_remaining: Option<DateTime<Utc>>,
    /// Whether nothing was deleted because this was a dry run.
    pub dry_run: bool,
}

/// Delete events past `policy` and record a `retention_cleanup` self-audit.
///
/// A disabled policy deletes nothing and records a skipped entry. A dry
/// run only counts and records nothing.
///
/// # Errors
///
/// Returns `AppError::Db` if the count, delete or self-audit write fails.
pub async fn run_cleanup(
    store: &Store,
    policy: RetentionPolicy,
    now: DateTime<Utc>,
    dry_run: bool,
) -> Result<CleanupReport> {
    let cutoff = policy.cutoff_time(now);
    let events_deleted = match cutoff {
        None => 0,
        Some(cutoff) if dry_run => {
            u64::try_from(store.events.count_before(cutoff).await?).unwrap_or(0)
        }
        Some(cutoff) => store.events.delete_before(cutoff).await?,
    };
    let (oldest_remaining, _) = store.events.time_span().await?;
    let report = CleanupReport {
        events_deleted,
        cutoff_time: cutoff,
        oldest_remaining,
        dry_run,
    };
    if dry_run {
        return Ok(report);
    }

    let mut record = SelfAudit::new(SelfAuditAction::RetentionCleanup).with_details(
        &RetentionCleanupDetails {
            events_deleted,
            retention_days: policy.days,
            cutoff_time: cutoff,
            oldest_remaining,
        },
    );
    if !policy.is_enabled() {
        record = record.skipped();
    }
    store.self_audits.save(&record).await?;
    info!(events_deleted, retention_days = policy.days, "retention cleanup completed");
    Ok(report)
}

/// Run [`run_cleanup`] unless one was recorded within the last day.
///
/// Returns `None` when the policy is disabled or a recent run exists.
///
/// # Errors
///
/// Returns `AppError::Db` if the lookup or the cleanup fails.
pub async fn cleanup_if_due(
    store: &Store,
    policy: RetentionPolicy,
    now: DateTime<Utc>,
) -> Result<Option<CleanupReport>> {
    if !policy.is_enabled() {
        return Ok(None);
    }
    if let Some(last) = store.self_audits.latest(SelfAuditAction::RetentionCleanup).await? {
        if now - last.timestamp < Duration::hours(AUTO_CLEANUP_INTERVAL_HOURS) {
            debug!(last = %last.timestamp, "retention cleanup not due");
            return Ok(None);
        }
    }
    run_cleanup(store, policy, now, false).await.map(Some)
}
