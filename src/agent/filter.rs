//! Logging-level filter applied to parsed events before they are stored.
//!
//! | level      | raw / diff / context | payload previews |
//! |------------|----------------------|------------------|
//! | `full`     | kept                 | kept             |
//! | `standard` | cleared              | kept             |
//! | `minimal`  | cleared              | cleared          |
//!
//! A sensitive event at `full` is treated as `standard`.

use serde::de::DeserializeOwned;

use crate::config::LoggingLevel;
use crate::models::event::{ActionType, Event};
use crate::models::payload::{CommandExecPayload, FileWritePayload, ToolUsePayload, TypedPayload};

/// Strip fields from `event` according to `level`. Idempotent.
pub fn apply_logging_level(event: &mut Event, level: LoggingLevel) {
    if level >= LoggingLevel::Full && !event.is_sensitive {
        return;
    }
    event.raw_event = None;
    event.diff_content = None;
    event.conversation_context = None;
    if level < LoggingLevel::Standard {
        strip_payload_content(event);
    }
}

fn strip_payload_content(event: &mut Event) {
    match event.action_type {
        ActionType::FileWrite => rewrite::<FileWritePayload>(event, |p| {
            p.content_preview = None;
            p.old_string = None;
            p.new_string = None;
        }),
        ActionType::CommandExec => rewrite::<CommandExecPayload>(event, |p| {
            p.output = None;
            p.stdout_preview = None;
            p.stderr_preview = None;
        }),
        ActionType::ToolUse => rewrite::<ToolUsePayload>(event, |p| {
            p.input = None;
            p.output = None;
            p.output_preview = None;
        }),
        _ => {}
    }
}

/// Decode, edit and re-encode the payload. A body that does not decode is left alone.
fn rewrite<P: TypedPayload + DeserializeOwned>(event: &mut Event, edit: impl FnOnce(&mut P)) {
    let Some(mut payload) = event.payload::<P>() else {
        return;
    };
    edit(&mut payload);
    if let Ok(value) = serde_json::to_value(&payload) {
        event.payload = Some(value);
    }
}
