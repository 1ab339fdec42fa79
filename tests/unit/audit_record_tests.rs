use gryph::agent::{InstallReport, UninstallReport};
use gryph::audit::{self, SelfAuditWriter};
use gryph::models::filter::SelfAuditFilter;
use gryph::models::self_audit::{SelfAuditAction, SelfAuditResult};
use gryph::persistence::Store;

#[test]
fn install_record_success_and_skip() {
    let report = InstallReport {
        agent: "claude-code".into(),
        hooks_installed: vec!["PreToolUse".into()],
        backup_path: Some("/b/settings.json.backup.1".into()),
        ..InstallReport::default()
    };
    let record = audit::install_record(&report);
    assert_eq!(record.action, SelfAuditAction::Install);
    assert_eq!(record.result, SelfAuditResult::Success);
    assert_eq!(record.agent_name.as_deref(), Some("claude-code"));
    let details = record.details.expect("details");
    assert_eq!(details["hooks_installed"][0], "PreToolUse");
    assert_eq!(details["backup_path"], "/b/settings.json.backup.1");

    let again = InstallReport {
        agent: "claude-code".into(),
        already_installed: true,
        ..InstallReport::default()
    };
    assert_eq!(audit::install_record(&again).result, SelfAuditResult::Skipped);
}

#[test]
fn uninstall_record_skips_when_nothing_changed() {
    let nothing = UninstallReport {
        agent: "cursor".into(),
        ..UninstallReport::default()
    };
    assert_eq!(audit::uninstall_record(&nothing).result, SelfAuditResult::Skipped);

    let restored = UninstallReport {
        agent: "cursor".into(),
        backup_restored: true,
        ..UninstallReport::default()
    };
    assert_eq!(audit::uninstall_record(&restored).result, SelfAuditResult::Success);
}

#[test]
fn config_change_and_failure_records() {
    let record = audit::config_change_record("logging.level", Some("minimal".into()), "full");
    assert_eq!(record.action, SelfAuditAction::ConfigChange);
    let details = record.details.expect("details");
    assert_eq!(details["key"], "logging.level");
    assert_eq!(details["old_value"], "minimal");
    assert_eq!(details["new_value"], "full");

    let failed = audit::failure_record(SelfAuditAction::Install, Some("gemini"), "not found".into());
    assert_eq!(failed.result, SelfAuditResult::Error);
    assert_eq!(failed.agent_name.as_deref(), Some("gemini"));
    assert_eq!(failed.error_message.as_deref(), Some("not found"));
}

#[tokio::test]
async fn writer_persists_and_swallows_failures() {
    let store = Store::open_memory().await.expect("store");
    let writer = SelfAuditWriter::new(store.self_audits.clone());
    writer
        .write(&audit::config_change_record("storage.retention_days", None, "30"))
        .await
        .expect("write");
    let stored = store
        .self_audits
        .query(&SelfAuditFilter::default())
        .await
        .expect("query");
    assert_eq!(stored.len(), 1);

    store.close().await;
    assert!(writer
        .write(&audit::config_change_record("a", None, "b"))
        .await
        .is_err());
    writer
        .write_or_warn(&audit::config_change_record("a", None, "b"))
        .await;
}
