//! Logging-level filter: idempotence and the sensitive downgrade at `full`.

use std::sync::Arc;

use gryph::agent::filter::apply_logging_level;
use gryph::agent::gemini::GeminiAdapter;
use gryph::agent::{Adapter, ParseContext};
use gryph::config::LoggingLevel;
use gryph::models::event::{ActionType, Event};
use gryph::models::payload::{CommandExecPayload, FileWritePayload, ToolUsePayload};
use gryph::privacy::PrivacyChecker;
use uuid::Uuid;

fn ctx(level: LoggingLevel) -> ParseContext {
    ParseContext::new(
        Arc::new(PrivacyChecker::with_defaults().unwrap()),
        level,
        true,
    )
}

fn rich_events() -> Vec<Event> {
    let session = Uuid::new_v4();
    let mut write = Event::new(session, "claude-code", ActionType::FileWrite);
    write
        .set_payload(&FileWritePayload {
            path: "/src/a.rs".into(),
            content_preview: Some("fn a() {}".into()),
            old_string: Some("x".into()),
            new_string: Some("y".into()),
            ..FileWritePayload::default()
        })
        .unwrap();
    write.diff_content = Some("--- a/src/a.rs\n".into());

    let mut exec = Event::new(session, "claude-code", ActionType::CommandExec);
    exec.set_payload(&CommandExecPayload {
        command: "ls".into(),
        output: Some("a\nb".into()),
        stdout_preview: Some("a".into()),
        ..CommandExecPayload::default()
    })
    .unwrap();

    let mut tool = Event::new(session, "claude-code", ActionType::ToolUse);
    tool.set_payload(&ToolUsePayload {
        tool_name: "WebFetch".into(),
        input: Some(serde_json::json!({"url": "https://example.com"})),
        output_preview: Some("<html>".into()),
        ..ToolUsePayload::default()
    })
    .unwrap();

    let mut events = vec![write, exec, tool];
    for event in &mut events {
        event.raw_event = Some("{}".into());
        event.conversation_context = Some("user asked".into());
    }
    let mut sensitive = events[0].clone();
    sensitive.is_sensitive = true;
    events.push(sensitive);
    events
}

#[test]
fn filter_is_idempotent_at_every_level() {
    for level in [LoggingLevel::Minimal, LoggingLevel::Standard, LoggingLevel::Full] {
        for original in rich_events() {
            let mut once = original.clone();
            apply_logging_level(&mut once, level);
            let mut twice = once.clone();
            apply_logging_level(&mut twice, level);
            assert_eq!(once, twice, "{level} not idempotent for {}", original.action_type);
        }
    }
}

#[test]
fn minimal_strips_command_and_tool_content() {
    for mut event in rich_events() {
        apply_logging_level(&mut event, LoggingLevel::Minimal);
        assert!(event.raw_event.is_none());
        match event.action_type {
            ActionType::CommandExec => {
                let payload = event.payload::<CommandExecPayload>().unwrap();
                assert_eq!(payload.command, "ls");
                assert!(payload.output.is_none());
                assert!(payload.stdout_preview.is_none());
            }
            ActionType::ToolUse => {
                let payload = event.payload::<ToolUsePayload>().unwrap();
                assert_eq!(payload.tool_name, "WebFetch");
                assert!(payload.input.is_none());
                assert!(payload.output_preview.is_none());
            }
            ActionType::FileWrite => {
                let payload = event.payload::<FileWritePayload>().unwrap();
                assert!(payload.old_string.is_none());
                assert!(payload.new_string.is_none());
            }
            _ => {}
        }
    }
}

#[test]
fn sensitive_event_at_full_behaves_like_standard() {
    let events = rich_events();
    let mut sensitive = events[3].clone();
    apply_logging_level(&mut sensitive, LoggingLevel::Full);
    assert!(sensitive.raw_event.is_none());
    assert!(sensitive.diff_content.is_none());
    assert!(sensitive.conversation_context.is_none());
    let payload = sensitive.payload::<FileWritePayload>().unwrap();
    assert_eq!(payload.content_preview.as_deref(), Some("fn a() {}"));
}

#[test]
fn sensitive_gemini_write_keeps_preview_but_drops_raw() {
    let raw = br#"{"session_id":"x","hook_event_name":"BeforeTool","tool_name":"write_file","tool_input":{"file_path":"/home/u/.env","content":"SECRET=1"}}"#;
    let context = ctx(LoggingLevel::Full);
    let mut event = GeminiAdapter.parse_event("BeforeTool", raw, &context).unwrap();
    assert!(event.is_sensitive);
    assert!(event.raw_event.is_some(), "raw kept until filtered");

    apply_logging_level(&mut event, LoggingLevel::Full);
    assert!(event.raw_event.is_none());
    assert!(event.diff_content.is_none());
    assert!(event.conversation_context.is_none());
    let payload = event.payload::<FileWritePayload>().unwrap();
    assert_eq!(payload.content_preview.as_deref(), Some("SECRET=1"));
}
