//! Parsing helpers shared by the adapters.

use serde::de::DeserializeOwned;
use serde_json::Value;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::ParseContext;
use crate::models::event::{ActionType, Event, ResultStatus};
use crate::models::payload::{
    CommandExecPayload, FileDeletePayload, FileReadPayload, FileWritePayload, ToolUsePayload,
};
use crate::{AppError, Result};

/// Preview limit for file-related text fields, in bytes.
pub const FILE_PREVIEW_MAX: usize = 200;

/// Preview limit for command output and error messages, in bytes.
pub const OUTPUT_PREVIEW_MAX: usize = 500;

/// Lower-cased output fragments that mark a tool result as failed.
const ERROR_MARKERS: [&str; 5] = [
    "error:",
    "failed:",
    "permission denied",
    "command not found",
    "no such file",
];

/// Keep at most `max_len` bytes of `text`, cut at a char boundary, and
/// append `"..."` when anything was dropped.
#[must_use]
pub fn truncate(text: &str, max_len: usize) -> String {
    if text.len() <= max_len {
        return text.to_owned();
    }
    let boundary = text
        .char_indices()
        .map(|(i, _)| i)
        .take_while(|&i| i <= max_len)
        .last()
        .unwrap_or(0);
    format!("{}...", &text[..boundary])
}

/// SHA-256 hex digest of `content`; `None` for empty content.
#[must_use]
pub fn hash_content(content: &str) -> Option<String> {
    if content.is_empty() {
        return None;
    }
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    Some(format!("{:x}", hasher.finalize()))
}

/// Unified diff (three lines of context) with `a/` and `b/` headers.
///
/// Returns `None` when the two sides are identical.
#[must_use]
pub fn unified_diff(path: &str, old: &str, new: &str) -> Option<String> {
    let patch = diffy::create_patch(old, new);
    if patch.hunks().is_empty() {
        return None;
    }
    let rendered = patch.to_string();
    let body = rendered.splitn(3, '\n').nth(2).unwrap_or_default();
    Some(format!("--- a/{path}\n+++ b/{path}\n{body}"))
}

/// Lines added and removed going from `old` to `new`.
#[must_use]
pub fn count_diff_lines(old: &str, new: &str) -> (i64, i64) {
    if old.is_empty() {
        return (count_lines(new), 0);
    }
    let patch = diffy::create_patch(old, new);
    let mut added = 0;
    let mut removed = 0;
    for hunk in patch.hunks() {
        for line in hunk.lines() {
            match line {
                diffy::Line::Insert(_) => added += 1,
                diffy::Line::Delete(_) => removed += 1,
                diffy::Line::Context(_) => {}
            }
        }
    }
    (added, removed)
}

fn count_lines(text: &str) -> i64 {
    i64::try_from(text.lines().count()).unwrap_or(i64::MAX)
}

/// Session identifier for an agent-supplied session string.
///
/// A string that parses as a UUID (hyphenated, simple, braced or URN form)
/// is used as is; any other non-empty string is hashed with UUIDv5 in the
/// OID namespace; an empty string yields a random UUIDv4.
#[must_use]
pub fn session_uuid(agent_session: &str) -> Uuid {
    if agent_session.is_empty() {
        return Uuid::new_v4();
    }
    Uuid::parse_str(agent_session).unwrap_or_else(|_| hashed_session_uuid(agent_session))
}

/// UUIDv5 of `agent_session` in the OID namespace, even when it is already a UUID.
///
/// An empty string yields a random UUIDv4.
#[must_use]
pub fn hashed_session_uuid(agent_session: &str) -> Uuid {
    if agent_session.is_empty() {
        return Uuid::new_v4();
    }
    Uuid::new_v5(&Uuid::NAMESPACE_OID, agent_session.as_bytes())
}

/// Apply the agent's `<AGENT>_SESSION_ID` override, then derive the session id.
///
/// Returns the id and the effective agent session string (if any).
#[must_use]
pub fn resolve_session(env_var: &str, supplied: Option<&str>) -> (Uuid, Option<String>) {
    resolve_session_with(env_var, supplied, session_uuid)
}

/// [`resolve_session`] for agents whose session strings are always hashed.
#[must_use]
pub fn resolve_hashed_session(env_var: &str, supplied: Option<&str>) -> (Uuid, Option<String>) {
    resolve_session_with(env_var, supplied, hashed_session_uuid)
}

fn resolve_session_with(
    env_var: &str,
    supplied: Option<&str>,
    derive: fn(&str) -> Uuid,
) -> (Uuid, Option<String>) {
    let agent_session = std::env::var(env_var)
        .ok()
        .filter(|v| !v.is_empty())
        .or_else(|| supplied.filter(|s| !s.is_empty()).map(str::to_owned));
    let id = derive(agent_session.as_deref().unwrap_or_default());
    (id, agent_session)
}

/// Decode a hook payload.
///
/// # Errors
///
/// Returns `AppError::Parse` naming `what` when `raw` does not decode.
pub fn decode<T: DeserializeOwned>(raw: &[u8], what: &str) -> Result<T> {
    serde_json::from_slice(raw)
        .map_err(|err| AppError::Parse(format!("failed to parse {what} input: {err}")))
}

/// First non-empty string among `keys` of a JSON object.
#[must_use]
pub fn str_field<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|k| value.get(*k).and_then(Value::as_str))
        .find(|s| !s.is_empty())
}

/// Integer field among `keys`, accepting JSON floats.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn int_field(value: &Value, keys: &[&str]) -> Option<i64> {
    keys.iter().find_map(|k| {
        let v = value.get(*k)?;
        v.as_i64().or_else(|| v.as_f64().map(|f| f as i64))
    })
}

/// Best textual rendering of a tool response.
///
/// Strings are used as is; objects yield `output`, `stdout` or `result`;
/// arrays yield the first `{"text": ...}` element.
#[must_use]
pub fn response_text(response: &Value) -> Option<String> {
    match response {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Object(_) => str_field(response, &["output", "stdout", "result"]).map(str::to_owned),
        Value::Array(items) => items
            .iter()
            .find_map(|item| item.get("text").and_then(Value::as_str))
            .map(str::to_owned),
        _ => None,
    }
}

/// Failure description for a tool response, if it looks failed.
///
/// Checks, in order: a non-empty `error` string, `success: false`, and
/// well-known error fragments in the output.
#[must_use]
pub fn detect_response_error(response: &Value) -> Option<String> {
    if let Some(err) = str_field(response, &["error"]) {
        return Some(truncate(err, OUTPUT_PREVIEW_MAX));
    }
    if response.get("success").and_then(Value::as_bool) == Some(false) {
        let msg = str_field(response, &["message"]).unwrap_or("tool reported failure");
        return Some(truncate(msg, OUTPUT_PREVIEW_MAX));
    }
    let output = response_text(response)?;
    let lowered = output.to_lowercase();
    ERROR_MARKERS
        .iter()
        .any(|marker| lowered.contains(marker))
        .then(|| truncate(&output, OUTPUT_PREVIEW_MAX))
}

/// Record a post-execution result: `success`, upgraded to `error` when the
/// response looks failed.
pub fn apply_result(event: &mut Event, response: Option<&Value>) {
    event.result_status = ResultStatus::Success;
    if let Some(message) = response.and_then(detect_response_error) {
        mark_error(event, &message);
    }
}

/// Set `error` status and message.
pub fn mark_error(event: &mut Event, message: &str) {
    event.result_status = ResultStatus::Error;
    event.error_message = Some(truncate(message, OUTPUT_PREVIEW_MAX));
}

/// Input keys an agent uses for file tools.
#[derive(Debug, Clone, Copy)]
pub struct ToolKeys {
    /// Candidate keys holding the primary path.
    pub path: &'static [&'static str],
    /// Key holding full written content.
    pub content: &'static str,
    /// Key holding the replaced text of an edit.
    pub old: &'static str,
    /// Key holding the replacement text of an edit.
    pub new: &'static str,
}

/// `file_path`/`path`, `content`, `old_string`/`new_string`.
pub const STANDARD_KEYS: ToolKeys = ToolKeys {
    path: &["file_path", "path"],
    content: "content",
    old: "old_string",
    new: "new_string",
};

/// Populate the payload of a tool event from the tool input and optional
/// response, then mark sensitivity.
///
/// # Errors
///
/// Returns `AppError::Validation` if the payload does not fit the action.
pub fn build_tool_payload(
    event: &mut Event,
    input: &Value,
    response: Option<&Value>,
    keys: ToolKeys,
    ctx: &ParseContext,
) -> Result<()> {
    match event.action_type {
        ActionType::FileRead => {
            let path = str_field(input, keys.path).unwrap_or_default().to_owned();
            event.is_sensitive = ctx.privacy.is_sensitive_path(&path);
            event.set_payload(&FileReadPayload {
                path,
                pattern: str_field(input, &["pattern"]).map(str::to_owned),
                ..FileReadPayload::default()
            })?;
        }
        ActionType::FileWrite => {
            let path = str_field(input, keys.path).unwrap_or_default();
            let content = str_field(input, &[keys.content]).unwrap_or_default();
            let old = str_field(input, &[keys.old]).unwrap_or_default();
            let new = str_field(input, &[keys.new]).unwrap_or_default();
            let (payload, diff) = file_write(path, content, old, new, ctx);
            event.is_sensitive = ctx.privacy.is_sensitive_path(path);
            event.set_payload(&payload)?;
            event.diff_content = diff;
        }
        ActionType::FileDelete => {
            let path = str_field(input, keys.path).unwrap_or_default().to_owned();
            event.is_sensitive = ctx.privacy.is_sensitive_path(&path);
            event.set_payload(&FileDeletePayload { path })?;
        }
        ActionType::CommandExec => {
            let command = str_field(input, &["command", "cmd"]).unwrap_or_default();
            event.is_sensitive = ctx.privacy.is_sensitive_command(command);
            let mut payload = CommandExecPayload {
                command: ctx.privacy.redact(command),
                description: str_field(input, &["description"]).map(str::to_owned),
                ..CommandExecPayload::default()
            };
            if let Some(resp) = response {
                fill_command_result(&mut payload, resp, ctx);
            }
            event.set_payload(&payload)?;
        }
        _ => {
            let tool_name = event.tool_name.clone();
            event.set_payload(&tool_use(&tool_name, Some(input), response, ctx))?;
        }
    }
    Ok(())
}

/// File-write payload and optional diff from the full texts of a write or edit.
#[must_use]
pub fn file_write(
    path: &str,
    content: &str,
    old: &str,
    new: &str,
    ctx: &ParseContext,
) -> (FileWritePayload, Option<String>) {
    let is_edit = !old.is_empty() || !new.is_empty();
    let mut payload = FileWritePayload {
        path: path.to_owned(),
        ..FileWritePayload::default()
    };
    if ctx.content_hash {
        payload.content_hash = if content.is_empty() {
            hash_content(&format!("{old}{new}"))
        } else {
            hash_content(content)
        };
    }
    if !content.is_empty() {
        payload.size_bytes = i64::try_from(content.len()).ok();
        payload.content_preview = Some(truncate(content, FILE_PREVIEW_MAX));
    }
    if !old.is_empty() {
        payload.old_string = Some(truncate(old, FILE_PREVIEW_MAX));
    }
    if !new.is_empty() {
        payload.new_string = Some(truncate(new, FILE_PREVIEW_MAX));
    }
    let (added, removed) = if is_edit {
        count_diff_lines(old, new)
    } else {
        count_diff_lines("", content)
    };
    if is_edit || !content.is_empty() {
        payload.lines_added = Some(added);
        payload.lines_removed = Some(removed);
    }
    let diff = if !ctx.is_full() {
        None
    } else if is_edit {
        unified_diff(path, old, new)
    } else if !content.is_empty() {
        unified_diff(path, "", content)
    } else {
        None
    };
    (payload, diff)
}

/// Copy output, previews and exit code from a command response.
pub fn fill_command_result(payload: &mut CommandExecPayload, response: &Value, ctx: &ParseContext) {
    if let Some(text) = response_text(response) {
        payload.output = Some(ctx.privacy.redact(&truncate(&text, OUTPUT_PREVIEW_MAX)));
    }
    if let Some(stdout) = str_field(response, &["stdout"]) {
        payload.stdout_preview = Some(ctx.privacy.redact(&truncate(stdout, OUTPUT_PREVIEW_MAX)));
    }
    if let Some(stderr) = str_field(response, &["stderr"]) {
        payload.stderr_preview = Some(ctx.privacy.redact(&truncate(stderr, OUTPUT_PREVIEW_MAX)));
    }
    payload.exit_code = int_field(response, &["exitCode", "exit_code"]);
    payload.duration_ms = int_field(response, &["duration_ms", "duration"]);
}

/// Generic tool payload.
#[must_use]
pub fn tool_use(
    tool_name: &str,
    input: Option<&Value>,
    output: Option<&Value>,
    ctx: &ParseContext,
) -> ToolUsePayload {
    ToolUsePayload {
        tool_name: tool_name.to_owned(),
        input: input.filter(|v| !v.is_null()).cloned(),
        output: output.filter(|v| !v.is_null()).cloned(),
        output_preview: output
            .and_then(response_text)
            .map(|text| ctx.privacy.redact(&truncate(&text, OUTPUT_PREVIEW_MAX))),
    }
}

/// Keep the original payload on the event when the level allows it.
pub fn keep_raw(event: &mut Event, raw: &[u8], ctx: &ParseContext) {
    if ctx.is_full() {
        event.raw_event = Some(String::from_utf8_lossy(raw).into_owned());
    }
}

/// Identity shared by every event parsed from one hook payload.
#[derive(Debug, Clone)]
pub struct Origin {
    /// Agent machine name.
    pub agent: &'static str,
    /// Derived session id.
    pub session_id: Uuid,
    /// Agent-supplied session string.
    pub agent_session_id: Option<String>,
    /// Working directory reported by the agent.
    pub working_directory: Option<String>,
}

impl Origin {
    /// Origin for `agent` from a resolved session.
    #[must_use]
    pub fn new(agent: &'static str, session: (Uuid, Option<String>)) -> Self {
        Self {
            agent,
            session_id: session.0,
            agent_session_id: session.1,
            working_directory: None,
        }
    }

    /// Set the working directory, ignoring empty strings.
    #[must_use]
    pub fn with_cwd(mut self, cwd: Option<&str>) -> Self {
        self.working_directory = cwd.filter(|c| !c.is_empty()).map(str::to_owned);
        self
    }

    /// Fresh event of `action` stamped with this origin.
    #[must_use]
    pub fn event(&self, action: ActionType) -> Event {
        let mut event = Event::new(self.session_id, self.agent, action);
        event.agent_session_id.clone_from(&self.agent_session_id);
        event.working_directory.clone_from(&self.working_directory);
        event
    }

    /// Event for a hook type the adapter does not recognise.
    #[must_use]
    pub fn unknown(&self, hook_type: &str, raw: &[u8], ctx: &ParseContext) -> Event {
        let mut event = self.event(ActionType::Unknown);
        event.tool_name = hook_type.to_owned();
        keep_raw(&mut event, raw, ctx);
        event
    }
}

/// File-write payload and optional diff for a list of `(old, new)` edits.
///
/// Line counts are summed, the first edit is previewed, the hash covers every
/// edit concatenated and the per-edit diffs are joined.
#[must_use]
pub fn file_write_edits(
    path: &str,
    edits: &[(String, String)],
    ctx: &ParseContext,
) -> (FileWritePayload, Option<String>) {
    let mut payload = FileWritePayload {
        path: path.to_owned(),
        ..FileWritePayload::default()
    };
    let Some((first_old, first_new)) = edits.first() else {
        return (payload, None);
    };
    let (mut added, mut removed) = (0, 0);
    for (old, new) in edits {
        let (a, r) = count_diff_lines(old, new);
        added += a;
        removed += r;
    }
    payload.lines_added = Some(added);
    payload.lines_removed = Some(removed);
    payload.old_string = Some(truncate(first_old, FILE_PREVIEW_MAX)).filter(|s| !s.is_empty());
    payload.new_string = Some(truncate(first_new, FILE_PREVIEW_MAX)).filter(|s| !s.is_empty());
    if ctx.content_hash {
        let combined: String = edits.iter().map(|(o, n)| format!("{o}{n}")).collect();
        payload.content_hash = hash_content(&combined);
    }
    let diff = if ctx.is_full() {
        let joined: String = edits
            .iter()
            .filter_map(|(o, n)| unified_diff(path, o, n))
            .collect();
        Some(joined).filter(|d| !d.is_empty())
    } else {
        None
    };
    (payload, diff)
}

/// `(old_string, new_string)` pairs from a JSON `edits` array.
#[must_use]
pub fn edits_from(value: Option<&Value>, old_key: &str, new_key: &str) -> Vec<(String, String)> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .map(|e| {
                    (
                        str_field(e, &[old_key]).unwrap_or_default().to_owned(),
                        str_field(e, &[new_key]).unwrap_or_default().to_owned(),
                    )
                })
                .collect()
        })
        .unwrap_or_default()
}
