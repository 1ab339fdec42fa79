//! Concurrent writers sharing one store file.

use std::collections::BTreeSet;

use chrono::Utc;
use gryph::persistence::Store;
use uuid::Uuid;

use super::test_helpers::write_event_at;

#[tokio::test]
async fn two_handles_one_session_distinct_sequences() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("gryph.db");
    let a = Store::open(&path).await.expect("open a");
    let b = Store::open(&path).await.expect("open b");
    let session = Uuid::new_v4();

    let mut first = write_event_at(session, "/one", Utc::now());
    let mut second = write_event_at(session, "/two", Utc::now());
    let (ra, rb) = tokio::join!(a.events.save(&mut first), b.events.save(&mut second));
    ra.expect("save a");
    rb.expect("save b");

    let sequences: BTreeSet<i64> = [first.sequence, second.sequence].into_iter().collect();
    assert_eq!(sequences, BTreeSet::from([1, 2]));

    let session = a.sessions.get(session).await.expect("session");
    assert_eq!(session.total_actions, 2);
}

#[tokio::test]
async fn many_writers_leave_no_gaps() {
    const WRITERS: i64 = 24;

    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("gryph.db");
    let handles = [
        Store::open(&path).await.expect("open"),
        Store::open(&path).await.expect("open"),
        Store::open(&path).await.expect("open"),
    ];
    let session = Uuid::new_v4();

    let mut tasks = Vec::new();
    for i in 0..WRITERS {
        let store = handles[usize::try_from(i).expect("index") % handles.len()].clone();
        tasks.push(tokio::spawn(async move {
            let mut event = write_event_at(session, &format!("/f{i}"), Utc::now());
            store.events.save(&mut event).await.map(|()| event.sequence)
        }));
    }
    let mut sequences = Vec::new();
    for task in tasks {
        sequences.push(task.await.expect("join").expect("save"));
    }
    sequences.sort_unstable();
    assert_eq!(sequences, (1..=WRITERS).collect::<Vec<_>>());

    let stored = handles[0].events.get_by_session(session).await.expect("events");
    assert_eq!(stored.len(), usize::try_from(WRITERS).expect("len"));
    let session = handles[0].sessions.get(session).await.expect("session");
    assert_eq!(session.total_actions, WRITERS);
}

#[tokio::test]
async fn reopening_does_not_reinitialize() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("nested/dir/gryph.db");
    let store = Store::open(&path).await.expect("create");
    store.close().await;
    let store = Store::open(&path).await.expect("reopen");

    let info = store.database_info().await.expect("info");
    assert_eq!(info.self_audit_count, 1, "database_init is written once");
    assert_eq!(info.event_count, 0);
    assert!(info.path.is_some());
    assert!(info.size_bytes.is_some());
}
