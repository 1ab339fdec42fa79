//! Self-audit trail of gryph's own lifecycle actions.
//!
//! Install, uninstall, config changes, exports and purges are written to
//! the `self_audits` table through [`SelfAuditWriter`]. Retention cleanup
//! never deletes these records.

pub mod writer;

use crate::agent::{InstallReport, UninstallReport};
use crate::models::self_audit::{
    ConfigChangeDetails, ExportDetails, InstallDetails, SelfAudit, SelfAuditAction,
    UninstallDetails,
};

pub use writer::SelfAuditWriter;

/// Record for a hook installation.
#[must_use]
pub fn install_record(report: &InstallReport) -> SelfAudit {
    let record = SelfAudit::new(SelfAuditAction::Install)
        .with_agent(&report.agent)
        .with_details(&InstallDetails {
            hooks_installed: report.hooks_installed.clone(),
            backup_path: report.backup_path.clone(),
        });
    if report.already_installed || report.hooks_installed.is_empty() {
        record.skipped()
    } else {
        record
    }
}

/// Record for a hook removal.
#[must_use]
pub fn uninstall_record(report: &UninstallReport) -> SelfAudit {
    let record = SelfAudit::new(SelfAuditAction::Uninstall)
        .with_agent(&report.agent)
        .with_details(&UninstallDetails {
            hooks_removed: report.hooks_removed.clone(),
            backup_restored: report.backup_restored,
        });
    if report.hooks_removed.is_empty() && !report.backup_restored {
        record.skipped()
    } else {
        record
    }
}

/// Record for a configuration change.
#[must_use]
pub fn config_change_record(key: &str, old_value: Option<String>, new_value: &str) -> SelfAudit {
    SelfAudit::new(SelfAuditAction::ConfigChange).with_details(&ConfigChangeDetails {
        key: key.to_owned(),
        old_value,
        new_value: new_value.to_owned(),
    })
}

/// Record for an export run.
#[must_use]
pub fn export_record(details: &ExportDetails) -> SelfAudit {
    SelfAudit::new(SelfAuditAction::Export).with_details(details)
}

/// Record for a failed action.
#[must_use]
pub fn failure_record(action: SelfAuditAction, agent: Option<&str>, message: String) -> SelfAudit {
    let record = SelfAudit::new(action).with_error(message);
    match agent {
        Some(agent) => record.with_agent(agent),
        None => record,
    }
}
