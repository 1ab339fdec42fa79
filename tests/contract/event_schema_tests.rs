//! Shape of persisted and exported event records.

use chrono::DateTime;
use gryph::export::export_jsonl;
use gryph::models::event::{ActionType, Event, ResultStatus, EVENT_SCHEMA_URL};
use gryph::models::filter::EventFilter;
use gryph::models::payload::CommandExecPayload;
use gryph::persistence::Store;
use serde_json::Value;
use uuid::Uuid;

const REQUIRED_KEYS: [&str; 8] = [
    "id",
    "session_id",
    "sequence",
    "timestamp",
    "agent_name",
    "action_type",
    "result_status",
    "is_sensitive",
];

fn sample() -> Event {
    let mut event = Event::new(Uuid::new_v4(), "cursor", ActionType::CommandExec);
    event.tool_name = "Shell".into();
    event.agent_session_id = Some("conv-1".into());
    event.result_status = ResultStatus::Error;
    event.error_message = Some("exit 1".into());
    event
        .set_payload(&CommandExecPayload {
            command: "make".into(),
            exit_code: Some(1),
            ..CommandExecPayload::default()
        })
        .expect("payload");
    event
}

#[test]
fn machine_names_are_stable() {
    let names: Vec<&str> = ActionType::ALL.iter().map(|a| a.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "file_read",
            "file_write",
            "file_delete",
            "command_exec",
            "network_request",
            "tool_use",
            "session_start",
            "session_end",
            "notification",
            "unknown",
        ]
    );
    for action in ActionType::ALL {
        assert_eq!(
            serde_json::to_value(action).expect("serialize"),
            Value::String(action.as_str().to_owned())
        );
    }
    assert_eq!(ResultStatus::Blocked.as_str(), "blocked");
    assert_eq!(ResultStatus::Rejected.as_str(), "rejected");
}

#[test]
fn export_record_shape() {
    let value = sample().to_export_value().expect("export value");
    let obj = value.as_object().expect("object");
    assert_eq!(obj["$schema"], EVENT_SCHEMA_URL);
    for key in REQUIRED_KEYS {
        assert!(obj.contains_key(key), "missing {key}");
    }
    for key in obj.keys().filter(|k| k.as_str() != "$schema") {
        assert!(
            key.chars().all(|c| c.is_ascii_lowercase() || c == '_'),
            "{key} is not snake_case"
        );
    }
    assert_eq!(obj["id"].as_str().map(str::len), Some(36));
    assert_eq!(obj["session_id"].as_str().map(str::len), Some(36));
    assert!(DateTime::parse_from_rfc3339(obj["timestamp"].as_str().expect("timestamp")).is_ok());
    assert_eq!(obj["action_type"], "command_exec");
    assert_eq!(obj["result_status"], "error");
    assert_eq!(obj["payload"]["command"], "make");
    assert!(!obj.contains_key("raw_event"), "absent optionals are omitted");
}

#[test]
fn export_value_deserializes_back() {
    let event = sample();
    let value = event.to_export_value().expect("export value");
    let back: Event = serde_json::from_value(value).expect("decode");
    assert_eq!(back, event);
}

#[tokio::test]
async fn exported_lines_carry_store_assigned_fields() {
    let store = Store::open_memory().await.expect("store");
    let mut event = sample();
    store.events.save(&mut event).await.expect("save");

    let mut out = Vec::new();
    export_jsonl(&store, &EventFilter::new(), &mut out, None)
        .await
        .expect("export");
    let line: Value = serde_json::from_slice(out.split(|b| *b == b'\n').next().expect("line"))
        .expect("json");
    assert_eq!(line["sequence"], 1);
    assert_eq!(line["id"], event.id.to_string());
    assert_eq!(line["agent_session_id"], "conv-1");
    assert_eq!(line["$schema"], EVENT_SCHEMA_URL);
}
