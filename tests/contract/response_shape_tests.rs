//! JSON bodies written to stdout for agents that read one.

use gryph::agent::{HookResponse, ResponseMode};
use serde_json::{json, Value};

fn body(response: &HookResponse, mode: ResponseMode) -> Value {
    serde_json::from_str(&response.to_json(mode).expect("body")).expect("json")
}

#[test]
fn exit_code_mode_writes_nothing() {
    assert!(HookResponse::Allow.to_json(ResponseMode::ExitCode).is_none());
    assert!(HookResponse::Block("no".into())
        .to_json(ResponseMode::ExitCode)
        .is_none());
}

#[test]
fn decision_json() {
    let mode = ResponseMode::DecisionJson;
    assert_eq!(body(&HookResponse::Allow, mode), json!({"decision": "allow"}));
    assert_eq!(
        body(&HookResponse::Block("secret file".into()), mode),
        json!({"decision": "block", "reason": "secret file"})
    );
}

#[test]
fn allow_deny_json() {
    let mode = ResponseMode::AllowDenyJson;
    assert_eq!(body(&HookResponse::Allow, mode), json!({"decision": "allow"}));
    assert_eq!(
        body(&HookResponse::Block("nope".into()), mode),
        json!({"decision": "deny", "reason": "nope"})
    );
}

#[test]
fn permission_json() {
    let mode = ResponseMode::PermissionJson;
    assert_eq!(body(&HookResponse::Allow, mode), json!({"permission": "allow"}));
    assert_eq!(
        body(&HookResponse::Block("nope".into()), mode),
        json!({"permission": "deny", "user_message": "nope"})
    );
}

#[test]
fn errors_render_as_allow_in_every_mode() {
    let err = HookResponse::Error("db: locked".into());
    assert_eq!(body(&err, ResponseMode::DecisionJson), json!({"decision": "allow"}));
    assert_eq!(body(&err, ResponseMode::AllowDenyJson), json!({"decision": "allow"}));
    assert_eq!(body(&err, ResponseMode::PermissionJson), json!({"permission": "allow"}));
    assert_eq!(err.stderr(), "db: locked");
}
