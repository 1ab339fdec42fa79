//! Event repository against an in-memory store.

use chrono::{Duration, Utc};
use gryph::errors::AppError;
use gryph::models::event::{ActionType, Event, ResultStatus};
use gryph::models::filter::EventFilter;
use gryph::models::payload::{CommandExecPayload, FileWritePayload};
use gryph::persistence::Store;
use uuid::Uuid;

fn write_event(session: Uuid, path: &str, minutes_ago: i64) -> Event {
    let mut event = Event::new(session, "claude-code", ActionType::FileWrite);
    event.timestamp = Utc::now() - Duration::minutes(minutes_ago);
    event
        .set_payload(&FileWritePayload {
            path: path.into(),
            ..FileWritePayload::default()
        })
        .expect("payload");
    event
}

fn exec_event(session: Uuid, agent: &str, command: &str, minutes_ago: i64) -> Event {
    let mut event = Event::new(session, agent, ActionType::CommandExec);
    event.timestamp = Utc::now() - Duration::minutes(minutes_ago);
    event
        .set_payload(&CommandExecPayload {
            command: command.into(),
            ..CommandExecPayload::default()
        })
        .expect("payload");
    event
}

#[tokio::test]
async fn save_assigns_sequences_and_round_trips() {
    let store = Store::open_memory().await.expect("store");
    let session = Uuid::new_v4();

    let mut first = write_event(session, "/p/a.rs", 2);
    first.working_directory = Some("/p".into());
    first.diff_content = Some("--- a/p/a.rs".into());
    first.is_sensitive = true;
    let mut second = exec_event(session, "claude-code", "ls", 1);
    second.result_status = ResultStatus::Error;
    second.error_message = Some("boom".into());

    store.events.save(&mut first).await.expect("save first");
    store.events.save(&mut second).await.expect("save second");
    assert_eq!(first.sequence, 1);
    assert_eq!(second.sequence, 2);

    let loaded = store.events.get(first.id).await.expect("get");
    assert_eq!(loaded.session_id, session);
    assert_eq!(loaded.sequence, 1);
    assert_eq!(loaded.action_type, ActionType::FileWrite);
    assert_eq!(loaded.payload, first.payload);
    assert_eq!(loaded.diff_content, first.diff_content);
    assert!(loaded.is_sensitive);
    assert_eq!(
        loaded.timestamp.timestamp_micros(),
        first.timestamp.timestamp_micros()
    );

    let loaded = store.events.get(second.id).await.expect("get");
    assert_eq!(loaded.result_status, ResultStatus::Error);
    assert_eq!(loaded.error_message.as_deref(), Some("boom"));
    assert_eq!(loaded.command().as_deref(), Some("ls"));
}

#[tokio::test]
async fn sequences_are_per_session() {
    let store = Store::open_memory().await.expect("store");
    let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
    let mut e1 = write_event(a, "/x", 3);
    let mut e2 = write_event(b, "/y", 2);
    let mut e3 = write_event(a, "/z", 1);
    for event in [&mut e1, &mut e2, &mut e3] {
        store.events.save(event).await.expect("save");
    }
    assert_eq!((e1.sequence, e2.sequence, e3.sequence), (1, 1, 2));

    let in_a = store.events.get_by_session(a).await.expect("by session");
    let sequences: Vec<i64> = in_a.iter().map(|e| e.sequence).collect();
    assert_eq!(sequences, vec![1, 2]);
}

#[tokio::test]
async fn get_missing_and_prefix_lookup() {
    let store = Store::open_memory().await.expect("store");
    let err = store.events.get(Uuid::new_v4()).await.expect_err("missing");
    assert!(matches!(err, AppError::NotFound(_)));

    let mut event = write_event(Uuid::new_v4(), "/a", 0);
    store.events.save(&mut event).await.expect("save");
    let prefix = &event.id.to_string()[..8];
    let found = store.events.get_by_prefix(prefix).await.expect("prefix");
    assert_eq!(found.id, event.id);

    let err = store.events.get_by_prefix("zzzz").await.expect_err("no match");
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn query_orders_newest_first_and_filters() {
    let store = Store::open_memory().await.expect("store");
    let session = Uuid::new_v4();
    let mut events = vec![
        write_event(session, "/src/a.rs", 50),
        exec_event(session, "claude-code", "cargo test", 40),
        exec_event(Uuid::new_v4(), "cursor", "npm install", 30),
        write_event(session, "/docs/readme.md", 20),
    ];
    for event in &mut events {
        store.events.save(event).await.expect("save");
    }

    let all = store.events.query(&EventFilter::new()).await.expect("query");
    assert_eq!(all.len(), 4);
    assert!(all.windows(2).all(|w| w[0].timestamp >= w[1].timestamp));
    assert_eq!(all[0].id, events[3].id);

    let cursor_only = EventFilter::new().with_agents(vec!["cursor".into()]);
    assert_eq!(store.events.count(&cursor_only).await.expect("count"), 1);

    let writes = EventFilter::new().with_actions(vec![ActionType::FileWrite]);
    assert_eq!(store.events.query(&writes).await.expect("writes").len(), 2);

    let rs_files = EventFilter::new().with_file_pattern("*.rs");
    let matched = store.events.query(&rs_files).await.expect("glob");
    assert_eq!(matched.len(), 1);
    assert_eq!(matched[0].file_path().as_deref(), Some("/src/a.rs"));
    assert_eq!(store.events.count(&rs_files).await.expect("count"), 1);

    let cargo = EventFilter::new().with_command_pattern("cargo *");
    assert_eq!(store.events.query(&cargo).await.expect("cmd").len(), 1);

    let recent = EventFilter::new().with_since(Utc::now() - Duration::minutes(35));
    assert_eq!(store.events.count(&recent).await.expect("count"), 2);

    let window = EventFilter::new().with_limit(2).with_offset(1);
    let page = store.events.query(&window).await.expect("page");
    assert_eq!(page.len(), 2);
    assert_eq!(page[0].id, events[2].id);

    let unlimited = EventFilter::new().with_limit(0);
    assert_eq!(store.events.query(&unlimited).await.expect("all").len(), 4);
}

#[tokio::test]
async fn query_after_pages_oldest_first() {
    let store = Store::open_memory().await.expect("store");
    let session = Uuid::new_v4();
    let stamp = Utc::now() - Duration::minutes(5);
    let mut ids = Vec::new();
    for _ in 0..5 {
        let mut event = write_event(session, "/f", 0);
        event.timestamp = stamp;
        store.events.save(&mut event).await.expect("save");
        ids.push(event.id);
    }
    ids.sort();

    let filter = EventFilter::new();
    let first = store.events.query_after(&filter, None, 2).await.expect("page 1");
    let last = first.last().expect("non-empty");
    let rest = store
        .events
        .query_after(&filter, Some((last.timestamp, last.id)), 10)
        .await
        .expect("page 2");
    let seen: Vec<Uuid> = first.iter().chain(rest.iter()).map(|e| e.id).collect();
    assert_eq!(seen, ids, "shared timestamps must not be skipped");
}

#[tokio::test]
async fn delete_before_and_time_span() {
    let store = Store::open_memory().await.expect("store");
    let session = Uuid::new_v4();
    let now = Utc::now();
    let mut old = write_event(session, "/old", 0);
    old.timestamp = now - Duration::days(100);
    let mut fresh = write_event(session, "/new", 0);
    fresh.timestamp = now - Duration::days(1);
    store.events.save(&mut old).await.expect("save old");
    store.events.save(&mut fresh).await.expect("save fresh");

    let (oldest, newest) = store.events.time_span().await.expect("span");
    assert_eq!(oldest.map(|t| t.timestamp()), Some(old.timestamp.timestamp()));
    assert_eq!(newest.map(|t| t.timestamp()), Some(fresh.timestamp.timestamp()));

    let cutoff = now - Duration::days(90);
    assert_eq!(store.events.count_before(cutoff).await.expect("count"), 1);
    assert_eq!(store.events.delete_before(cutoff).await.expect("delete"), 1);
    assert_eq!(store.events.count_all().await.expect("count"), 1);
    assert!(store.events.get(old.id).await.is_err());
}

#[tokio::test]
async fn closed_store_reports_db_error() {
    let store = Store::open_memory().await.expect("store");
    store.close().await;
    let mut event = write_event(Uuid::new_v4(), "/a", 0);
    let err = store.events.save(&mut event).await.expect_err("closed");
    assert!(matches!(err, AppError::Db(_)));
}
