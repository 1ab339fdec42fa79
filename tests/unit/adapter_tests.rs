//! Hook payload parsing for the settings-file agents.

use std::sync::Arc;

use gryph::agent::claude_code::{self, ClaudeCodeAdapter};
use gryph::agent::cursor::CursorAdapter;
use gryph::agent::gemini::GeminiAdapter;
use gryph::agent::parse::hash_content;
use gryph::agent::{Adapter, ParseContext, ResponseMode};
use gryph::config::LoggingLevel;
use gryph::errors::AppError;
use gryph::models::event::{ActionType, ResultStatus};
use gryph::models::payload::{
    CommandExecPayload, FileReadPayload, FileWritePayload, NotificationPayload,
    SessionEndPayload, SessionStartPayload, ToolUsePayload,
};
use gryph::privacy::PrivacyChecker;

fn ctx(level: LoggingLevel) -> ParseContext {
    ParseContext::new(
        Arc::new(PrivacyChecker::with_defaults().expect("default patterns")),
        level,
        true,
    )
}

// ── Claude Code ──────────────────────────────────────────

#[test]
fn claude_write_at_standard_level() {
    let raw = br#"{"session_id":"abc","cwd":"/p","tool_name":"Write","tool_input":{"file_path":"/p/main.go","content":"package main\n"}}"#;
    let event = ClaudeCodeAdapter
        .parse_event("PreToolUse", raw, &ctx(LoggingLevel::Standard))
        .expect("parse");

    assert_eq!(event.action_type, ActionType::FileWrite);
    assert_eq!(event.tool_name, "Write");
    assert_eq!(event.agent_name, "claude-code");
    assert_eq!(event.working_directory.as_deref(), Some("/p"));
    assert_eq!(event.result_status, ResultStatus::Success);
    assert!(!event.is_sensitive);
    assert!(event.raw_event.is_none());
    assert!(event.diff_content.is_none());

    let payload: FileWritePayload = event.payload().expect("file write payload");
    assert_eq!(payload.path, "/p/main.go");
    assert_eq!(payload.content_hash, hash_content("package main\n"));
    assert_eq!(payload.content_preview.as_deref(), Some("package main\n"));
    assert_eq!(payload.lines_added, Some(1));
    assert_eq!(payload.lines_removed, Some(0));
}

#[test]
fn claude_edit_at_full_level_keeps_diff_and_raw() {
    let raw = br#"{"session_id":"abc","tool_name":"Edit","tool_input":{"file_path":"src/lib.rs","old_string":"a\n","new_string":"b\n"}}"#;
    let event = ClaudeCodeAdapter
        .parse_event("PreToolUse", raw, &ctx(LoggingLevel::Full))
        .expect("parse");

    let diff = event.diff_content.expect("diff at full level");
    assert!(diff.starts_with("--- a/src/lib.rs\n+++ b/src/lib.rs\n"));
    assert!(diff.contains("-a"));
    assert!(diff.contains("+b"));
    assert!(event.raw_event.is_some());
}

#[test]
fn claude_post_tool_error_response() {
    let raw = br#"{"session_id":"abc","tool_name":"Bash","tool_input":{"command":"ls /root"},"tool_response":{"error":"denied"}}"#;
    let event = ClaudeCodeAdapter
        .parse_event("PostToolUse", raw, &ctx(LoggingLevel::Standard))
        .expect("parse");

    assert_eq!(event.action_type, ActionType::CommandExec);
    assert_eq!(event.result_status, ResultStatus::Error);
    assert_eq!(event.error_message.as_deref(), Some("denied"));
    let payload: CommandExecPayload = event.payload().expect("command payload");
    assert_eq!(payload.command, "ls /root");
}

#[test]
fn claude_post_tool_failure_uses_error_field() {
    let raw = br#"{"session_id":"abc","tool_name":"Read","tool_input":{"file_path":"/x"},"error":"no access"}"#;
    let event = ClaudeCodeAdapter
        .parse_event("PostToolUseFailure", raw, &ctx(LoggingLevel::Minimal))
        .expect("parse");
    assert_eq!(event.action_type, ActionType::FileRead);
    assert_eq!(event.result_status, ResultStatus::Error);
    assert_eq!(event.error_message.as_deref(), Some("no access"));
}

#[test]
fn claude_command_output_is_redacted() {
    let raw = br#"{"session_id":"abc","tool_name":"Bash","tool_input":{"command":"echo hi"},"tool_response":{"stdout":"token=abcdef123"}}"#;
    let event = ClaudeCodeAdapter
        .parse_event("PostToolUse", raw, &ctx(LoggingLevel::Standard))
        .expect("parse");
    let payload: CommandExecPayload = event.payload().expect("command payload");
    let preview = payload.stdout_preview.expect("stdout preview");
    assert!(!preview.contains("abcdef123"), "{preview}");
    assert!(preview.contains("[REDACTED]"));
}

#[test]
fn claude_sensitive_read() {
    let raw = br#"{"session_id":"abc","tool_name":"Read","tool_input":{"file_path":"/home/u/project/.env"}}"#;
    let event = ClaudeCodeAdapter
        .parse_event("PreToolUse", raw, &ctx(LoggingLevel::Standard))
        .expect("parse");
    assert!(event.is_sensitive);
    let payload: FileReadPayload = event.payload().expect("read payload");
    assert_eq!(payload.path, "/home/u/project/.env");
}

#[test]
fn claude_multi_edit_sums_lines() {
    let raw = br#"{"session_id":"abc","tool_name":"MultiEdit","tool_input":{"file_path":"/a.txt","edits":[{"old_string":"x\n","new_string":"y\n"},{"old_string":"p\n","new_string":"q\nr\n"}]}}"#;
    let event = ClaudeCodeAdapter
        .parse_event("PreToolUse", raw, &ctx(LoggingLevel::Standard))
        .expect("parse");
    let payload: FileWritePayload = event.payload().expect("write payload");
    assert_eq!(payload.lines_added, Some(3));
    assert_eq!(payload.lines_removed, Some(2));
    assert_eq!(payload.old_string.as_deref(), Some("x\n"));
}

#[test]
fn claude_session_lifecycle_events() {
    let level = ctx(LoggingLevel::Minimal);
    let start = ClaudeCodeAdapter
        .parse_event(
            "SessionStart",
            br#"{"session_id":"abc","source":"startup","model":"m1"}"#,
            &level,
        )
        .expect("start");
    assert_eq!(start.action_type, ActionType::SessionStart);
    let payload: SessionStartPayload = start.payload().expect("start payload");
    assert_eq!(payload.source.as_deref(), Some("startup"));
    assert_eq!(payload.model.as_deref(), Some("m1"));

    let end = ClaudeCodeAdapter
        .parse_event("SessionEnd", br#"{"session_id":"abc","reason":"exit"}"#, &level)
        .expect("end");
    assert_eq!(end.session_id, start.session_id);
    let payload: SessionEndPayload = end.payload().expect("end payload");
    assert_eq!(payload.reason.as_deref(), Some("exit"));

    let note = ClaudeCodeAdapter
        .parse_event(
            "Notification",
            br#"{"session_id":"abc","message":"waiting","notification_type":"idle"}"#,
            &level,
        )
        .expect("notification");
    let payload: NotificationPayload = note.payload().expect("notification payload");
    assert_eq!(payload.message.as_deref(), Some("waiting"));
}

#[test]
fn claude_tool_mapping() {
    assert_eq!(claude_code::action_for_tool("Grep"), ActionType::FileRead);
    assert_eq!(claude_code::action_for_tool("NotebookEdit"), ActionType::FileWrite);
    assert_eq!(claude_code::action_for_tool("Bash"), ActionType::CommandExec);
    assert_eq!(claude_code::action_for_tool("mcp__github__search"), ActionType::ToolUse);
}

#[test]
fn unknown_hook_type_yields_unknown_event() {
    let event = ClaudeCodeAdapter
        .parse_event("SubagentStop", br#"{"session_id":"abc"}"#, &ctx(LoggingLevel::Full))
        .expect("parse");
    assert_eq!(event.action_type, ActionType::Unknown);
    assert_eq!(event.tool_name, "SubagentStop");
    assert!(event.raw_event.is_some());
}

#[test]
fn malformed_payload_is_a_parse_error() {
    for adapter in [
        &ClaudeCodeAdapter as &dyn Adapter,
        &GeminiAdapter as &dyn Adapter,
        &CursorAdapter as &dyn Adapter,
    ] {
        let err = adapter
            .parse_event(adapter.hook_types()[0], b"{not json", &ctx(LoggingLevel::Minimal))
            .expect_err("must fail");
        assert!(matches!(err, AppError::Parse(_)), "{}: {err}", adapter.name());
    }
}

// ── Gemini ───────────────────────────────────────────────

#[test]
fn gemini_shell_command_after_tool() {
    let raw = br#"{"session_id":"g1","hook_event_name":"AfterTool","tool_name":"run_shell_command","tool_input":{"command":"cargo --version"},"tool_response":{"output":"cargo 1.80"}}"#;
    let event = GeminiAdapter
        .parse_event("AfterTool", raw, &ctx(LoggingLevel::Standard))
        .expect("parse");
    assert_eq!(event.action_type, ActionType::CommandExec);
    assert_eq!(event.result_status, ResultStatus::Success);
    let payload: CommandExecPayload = event.payload().expect("command payload");
    assert_eq!(payload.output.as_deref(), Some("cargo 1.80"));
}

#[test]
fn gemini_hook_name_falls_back_to_payload() {
    let raw = br#"{"session_id":"g1","hook_event_name":"BeforeTool","tool_name":"read_file","tool_input":{"absolute_path":"/r/a.md"}}"#;
    let event = GeminiAdapter
        .parse_event("", raw, &ctx(LoggingLevel::Standard))
        .expect("parse");
    assert_eq!(event.action_type, ActionType::FileRead);
    assert_eq!(event.file_path().as_deref(), Some("/r/a.md"));
}

#[test]
fn gemini_unknown_tool_is_tool_use() {
    let raw = br#"{"session_id":"g1","tool_name":"google_web_search","tool_input":{"query":"rust"}}"#;
    let event = GeminiAdapter
        .parse_event("BeforeTool", raw, &ctx(LoggingLevel::Standard))
        .expect("parse");
    assert_eq!(event.action_type, ActionType::ToolUse);
    let payload: ToolUsePayload = event.payload().expect("tool payload");
    assert_eq!(payload.tool_name, "google_web_search");
    assert_eq!(payload.input, Some(serde_json::json!({"query": "rust"})));
}

// ── Cursor ───────────────────────────────────────────────

#[test]
fn cursor_response_modes() {
    assert_eq!(
        CursorAdapter.response_mode("beforeShellExecution"),
        ResponseMode::PermissionJson
    );
    assert_eq!(CursorAdapter.response_mode("afterFileEdit"), ResponseMode::AllowDenyJson);
    assert_eq!(GeminiAdapter.response_mode("BeforeTool"), ResponseMode::DecisionJson);
    assert_eq!(ClaudeCodeAdapter.response_mode("PreToolUse"), ResponseMode::ExitCode);
}

#[test]
fn cursor_after_shell_nonzero_exit_is_error() {
    let raw = br#"{"conversation_id":"c1","workspace_roots":["/ws"],"command":"make","output":"build ok","exit_code":2,"duration":12.7}"#;
    let event = CursorAdapter
        .parse_event("afterShellExecution", raw, &ctx(LoggingLevel::Standard))
        .expect("parse");
    assert_eq!(event.action_type, ActionType::CommandExec);
    assert_eq!(event.working_directory.as_deref(), Some("/ws"));
    assert_eq!(event.result_status, ResultStatus::Error);
    assert_eq!(event.error_message.as_deref(), Some("command exited with code 2"));
    assert_eq!(event.duration_ms, Some(12));
    let payload: CommandExecPayload = event.payload().expect("command payload");
    assert_eq!(payload.exit_code, Some(2));
}

#[test]
fn cursor_file_edit_and_read() {
    let level = ctx(LoggingLevel::Standard);
    let edit = CursorAdapter
        .parse_event(
            "afterFileEdit",
            br#"{"conversation_id":"c1","file_path":"/ws/a.ts","edits":[{"old_string":"let a","new_string":"const a"}]}"#,
            &level,
        )
        .expect("edit");
    assert_eq!(edit.action_type, ActionType::FileWrite);
    let payload: FileWritePayload = edit.payload().expect("write payload");
    assert_eq!(payload.lines_added, Some(1));
    assert_eq!(payload.lines_removed, Some(1));

    let read = CursorAdapter
        .parse_event(
            "beforeReadFile",
            br#"{"conversation_id":"c1","file_path":"/ws/server.pem","content":"KEY"}"#,
            &level,
        )
        .expect("read");
    assert_eq!(read.action_type, ActionType::FileRead);
    assert!(read.is_sensitive);
    let payload: FileReadPayload = read.payload().expect("read payload");
    assert_eq!(payload.size_bytes, Some(3));
    assert_eq!(payload.content_hash, hash_content("KEY"));
}

#[test]
fn cursor_mcp_tool_is_qualified_by_server() {
    let raw = br#"{"conversation_id":"c1","tool_name":"search","server":"github","tool_input":{"q":"x"}}"#;
    let event = CursorAdapter
        .parse_event("beforeMCPExecution", raw, &ctx(LoggingLevel::Standard))
        .expect("parse");
    let payload: ToolUsePayload = event.payload().expect("tool payload");
    assert_eq!(payload.tool_name, "github/search");
}

#[test]
fn cursor_prompt_and_stop() {
    let level = ctx(LoggingLevel::Standard);
    let prompt = CursorAdapter
        .parse_event("beforeSubmitPrompt", br#"{"conversation_id":"c1","prompt":"hi"}"#, &level)
        .expect("prompt");
    assert_eq!(prompt.action_type, ActionType::ToolUse);

    let stop = CursorAdapter
        .parse_event("stop", br#"{"conversation_id":"c1"}"#, &level)
        .expect("stop");
    assert_eq!(stop.action_type, ActionType::SessionEnd);
    let payload: SessionEndPayload = stop.payload().expect("end payload");
    assert_eq!(payload.reason.as_deref(), Some("completed"));
}
