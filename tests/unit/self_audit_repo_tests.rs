use chrono::{Duration, Utc};
use gryph::models::filter::SelfAuditFilter;
use gryph::models::self_audit::{
    ExportDetails, SelfAudit, SelfAuditAction, SelfAuditResult,
};
use gryph::persistence::Store;

#[tokio::test]
async fn save_and_query_newest_first() {
    let store = Store::open_memory().await.expect("store");
    let mut older = SelfAudit::new(SelfAuditAction::Install).with_agent("cursor");
    older.timestamp = Utc::now() - Duration::hours(2);
    let newer = SelfAudit::new(SelfAuditAction::Export).with_details(&ExportDetails {
        format: "jsonl".into(),
        event_count: 3,
        output_path: None,
    });
    store.self_audits.save(&older).await.expect("save");
    store.self_audits.save(&newer).await.expect("save");

    let all = store
        .self_audits
        .query(&SelfAuditFilter::default())
        .await
        .expect("query");
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].id, newer.id);
    assert_eq!(all[0].details.as_ref().map(|d| d["event_count"].clone()), Some(3.into()));
    assert_eq!(all[1].agent_name.as_deref(), Some("cursor"));
    assert_eq!(all[1].tool_version, env!("CARGO_PKG_VERSION"));

    let installs = SelfAuditFilter {
        action: Some(SelfAuditAction::Install),
        ..SelfAuditFilter::default()
    };
    assert_eq!(store.self_audits.query(&installs).await.expect("q").len(), 1);

    let recent = SelfAuditFilter {
        since: Some(Utc::now() - Duration::hours(1)),
        limit: 10,
        ..SelfAuditFilter::default()
    };
    let found = store.self_audits.query(&recent).await.expect("q");
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].action, SelfAuditAction::Export);
}

#[tokio::test]
async fn latest_and_results() {
    let store = Store::open_memory().await.expect("store");
    assert!(store
        .self_audits
        .latest(SelfAuditAction::RetentionCleanup)
        .await
        .expect("latest")
        .is_none());

    let failed = SelfAudit::new(SelfAuditAction::Uninstall).with_error("io: denied".into());
    let skipped = SelfAudit::new(SelfAuditAction::RetentionCleanup).skipped();
    store.self_audits.save(&failed).await.expect("save");
    store.self_audits.save(&skipped).await.expect("save");

    let latest = store
        .self_audits
        .latest(SelfAuditAction::RetentionCleanup)
        .await
        .expect("latest")
        .expect("present");
    assert_eq!(latest.result, SelfAuditResult::Skipped);

    let uninstall = store
        .self_audits
        .latest(SelfAuditAction::Uninstall)
        .await
        .expect("latest")
        .expect("present");
    assert_eq!(uninstall.result, SelfAuditResult::Error);
    assert_eq!(uninstall.error_message.as_deref(), Some("io: denied"));
    assert_eq!(store.self_audits.count().await.expect("count"), 2);
}

#[tokio::test]
async fn query_after_walks_everything() {
    let store = Store::open_memory().await.expect("store");
    for _ in 0..5 {
        store
            .self_audits
            .save(&SelfAudit::new(SelfAuditAction::ConfigChange))
            .await
            .expect("save");
    }
    let mut cursor = None;
    let mut seen = 0;
    loop {
        let batch = store.self_audits.query_after(cursor, 2).await.expect("page");
        let Some(last) = batch.last() else { break };
        cursor = Some((last.timestamp, last.id));
        seen += batch.len();
    }
    assert_eq!(seen, 5);
}
