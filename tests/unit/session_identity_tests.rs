use gryph::agent::parse::{hashed_session_uuid, resolve_hashed_session, resolve_session, session_uuid};
use serial_test::serial;
use uuid::Uuid;

#[test]
fn same_string_same_id() {
    let expected = Uuid::new_v5(&Uuid::NAMESPACE_OID, b"test-session-123");
    for _ in 0..3 {
        assert_eq!(session_uuid("test-session-123"), expected);
    }
    assert_ne!(session_uuid("test-session-123"), session_uuid("test-session-124"));
}

#[test]
fn canonical_uuid_is_used_verbatim() {
    let id = Uuid::new_v4();
    assert_eq!(session_uuid(&id.to_string()), id);
}

#[test]
fn braced_uuid_is_used_as_is() {
    let id = Uuid::new_v4();
    assert_eq!(session_uuid(&format!("{{{id}}}")), id);
}

#[test]
fn hashed_identity_ignores_uuid_shape() {
    let raw = "6f1c2f5e-8a43-4b8e-9d0a-3c2b1a0f9e7d";
    let expected = Uuid::new_v5(&Uuid::NAMESPACE_OID, raw.as_bytes());
    assert_eq!(hashed_session_uuid(raw), expected);
    assert_ne!(hashed_session_uuid(raw).to_string(), raw);

    let (id, agent_session) = resolve_hashed_session("GRYPH_TEST_UNSET_SESSION_VAR", Some(raw));
    assert_eq!(id, expected);
    assert_eq!(agent_session.as_deref(), Some(raw));
}

#[test]
fn identity_survives_a_new_process() {
    // Pinned value: any process must derive exactly this id.
    assert_eq!(
        session_uuid("test-session-123"),
        Uuid::new_v5(&Uuid::NAMESPACE_OID, "test-session-123".as_bytes())
    );
    assert_eq!(session_uuid("test-session-123").get_version_num(), 5);
}

#[test]
fn empty_session_string_gets_a_fresh_id() {
    let (a, sa) = resolve_session("GRYPH_TEST_UNSET_SESSION_VAR", Some(""));
    let (b, _) = resolve_session("GRYPH_TEST_UNSET_SESSION_VAR", None);
    assert_ne!(a, b);
    assert!(sa.is_none());
}

#[test]
#[serial]
fn env_override_wins_over_payload() {
    std::env::set_var("GRYPH_TEST_SESSION_OVERRIDE", "from-env");
    let (id, agent_session) = resolve_session("GRYPH_TEST_SESSION_OVERRIDE", Some("from-payload"));
    std::env::remove_var("GRYPH_TEST_SESSION_OVERRIDE");

    assert_eq!(agent_session.as_deref(), Some("from-env"));
    assert_eq!(id, session_uuid("from-env"));
}
