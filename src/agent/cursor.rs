//! Cursor adapter.
//!
//! Cursor reads hooks from `~/.cursor/hooks.json` (`{"version": 1, "hooks": ...}`).
//! `before*` hooks answer with a `permission` body, every other hook with
//! a `decision` body.

use serde::Deserialize;
use serde_json::{json, Value};

use super::parse::{self, Origin, STANDARD_KEYS};
use super::{Adapter, HookTarget, ParseContext, ResponseMode, SettingsLayout};
use crate::models::event::{ActionType, Event};
use crate::models::payload::{
    CommandExecPayload, FileReadPayload, NotificationPayload, SessionEndPayload,
    SessionStartPayload,
};
use crate::Result;

/// Machine name.
pub const AGENT_NAME: &str = "cursor";

const HOOK_TYPES: &[&str] = &[
    "preToolUse",
    "beforeShellExecution",
    "beforeMCPExecution",
    "beforeReadFile",
    "beforeTabFileRead",
    "beforeSubmitPrompt",
    "postToolUse",
    "postToolUseFailure",
    "afterFileEdit",
    "afterTabFileEdit",
    "afterShellExecution",
    "afterMCPExecution",
    "afterAgentResponse",
    "afterAgentThought",
    "sessionStart",
    "sessionEnd",
    "stop",
    "subagentStart",
    "subagentStop",
    "preCompact",
];

#[derive(Debug, Default, Deserialize)]
struct Edit {
    #[serde(default)]
    old_string: String,
    #[serde(default)]
    new_string: String,
}

#[derive(Debug, Default, Deserialize)]
struct HookInput {
    #[serde(default)]
    conversation_id: String,
    #[serde(default)]
    hook_event_name: String,
    #[serde(default)]
    workspace_roots: Vec<String>,
    #[serde(default)]
    tool_name: String,
    #[serde(default)]
    tool_input: Value,
    #[serde(default)]
    tool_output: Option<Value>,
    #[serde(default)]
    file_path: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    edits: Vec<Edit>,
    #[serde(default)]
    command: Option<String>,
    #[serde(default)]
    cwd: Option<String>,
    #[serde(default)]
    output: Option<String>,
    #[serde(default)]
    exit_code: Option<i64>,
    #[serde(default)]
    duration: Option<f64>,
    #[serde(default)]
    server: Option<String>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    reason: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    prompt: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Action recorded for a Cursor agent tool.
#[must_use]
pub fn action_for_tool(tool: &str) -> ActionType {
    match tool {
        "Shell" => ActionType::CommandExec,
        "Read" | "Grep" | "Glob" => ActionType::FileRead,
        "Write" | "Edit" => ActionType::FileWrite,
        _ => ActionType::ToolUse,
    }
}

/// Adapter for Cursor.
#[derive(Debug, Clone, Copy, Default)]
pub struct CursorAdapter;

impl CursorAdapter {
    fn generic_tool(
        origin: &Origin,
        hook: &str,
        input: &HookInput,
        ctx: &ParseContext,
    ) -> Result<Event> {
        let mut event = origin.event(action_for_tool(&input.tool_name));
        event.tool_name.clone_from(&input.tool_name);
        let is_post = hook != "preToolUse";
        let response = input.tool_output.as_ref().filter(|_| is_post);
        parse::build_tool_payload(&mut event, &input.tool_input, response, STANDARD_KEYS, ctx)?;
        if is_post {
            parse::apply_result(&mut event, response);
        }
        if hook == "postToolUseFailure" {
            let message = input.error.as_deref().unwrap_or("tool call failed");
            parse::mark_error(&mut event, message);
        }
        Ok(event)
    }

    fn shell(origin: &Origin, hook: &str, input: &HookInput, ctx: &ParseContext) -> Result<Event> {
        let mut event = origin.event(ActionType::CommandExec);
        event.tool_name = "Shell".into();
        if let Some(cwd) = input.cwd.as_deref().filter(|c| !c.is_empty()) {
            event.working_directory = Some(cwd.to_owned());
        }
        let command = input.command.as_deref().unwrap_or_default();
        event.is_sensitive = ctx.privacy.is_sensitive_command(command);
        let mut payload = CommandExecPayload {
            command: ctx.privacy.redact(command),
            ..CommandExecPayload::default()
        };
        if hook == "afterShellExecution" {
            let output = input.output.as_deref().unwrap_or_default();
            if !output.is_empty() {
                payload.output = Some(ctx.privacy.redact(&parse::truncate(
                    output,
                    parse::OUTPUT_PREVIEW_MAX,
                )));
            }
            payload.exit_code = input.exit_code;
            #[allow(clippy::cast_possible_truncation)]
            let duration = input.duration.map(|d| d as i64);
            payload.duration_ms = duration;
            event.duration_ms = duration;
            parse::apply_result(&mut event, Some(&json!({ "output": output })));
            if let Some(code) = input.exit_code.filter(|c| *c != 0) {
                if event.error_message.is_none() {
                    parse::mark_error(&mut event, &format!("command exited with code {code}"));
                }
            }
        }
        event.set_payload(&payload)?;
        Ok(event)
    }

    fn read_file(origin: &Origin, input: &HookInput, ctx: &ParseContext) -> Result<Event> {
        let mut event = origin.event(ActionType::FileRead);
        event.tool_name = "Read".into();
        let path = input.file_path.clone().unwrap_or_default();
        event.is_sensitive = ctx.privacy.is_sensitive_path(&path);
        let content = input.content.as_deref().unwrap_or_default();
        event.set_payload(&FileReadPayload {
            path,
            size_bytes: Some(content.len())
                .filter(|n| *n > 0)
                .and_then(|n| i64::try_from(n).ok()),
            content_hash: if ctx.content_hash {
                parse::hash_content(content)
            } else {
                None
            },
            ..FileReadPayload::default()
        })?;
        Ok(event)
    }

    fn file_edit(origin: &Origin, input: &HookInput, ctx: &ParseContext) -> Result<Event> {
        let mut event = origin.event(ActionType::FileWrite);
        event.tool_name = "Edit".into();
        let path = input.file_path.as_deref().unwrap_or_default();
        let edits: Vec<(String, String)> = input
            .edits
            .iter()
            .map(|e| (e.old_string.clone(), e.new_string.clone()))
            .collect();
        let (payload, diff) = parse::file_write_edits(path, &edits, ctx);
        event.is_sensitive = ctx.privacy.is_sensitive_path(path);
        event.set_payload(&payload)?;
        event.diff_content = diff;
        Ok(event)
    }

    fn mcp(origin: &Origin, hook: &str, input: &HookInput, ctx: &ParseContext) -> Result<Event> {
        let mut event = origin.event(ActionType::ToolUse);
        event.tool_name.clone_from(&input.tool_name);
        let qualified = match input.server.as_deref().filter(|s| !s.is_empty()) {
            Some(server) => format!("{server}/{}", input.tool_name),
            None => input.tool_name.clone(),
        };
        let output = input.tool_output.as_ref().filter(|_| hook == "afterMCPExecution");
        event.set_payload(&parse::tool_use(&qualified, Some(&input.tool_input), output, ctx))?;
        if hook == "afterMCPExecution" {
            parse::apply_result(&mut event, output);
        }
        Ok(event)
    }

    fn notification(origin: &Origin, hook: &str, input: &HookInput) -> Result<Event> {
        let mut event = origin.event(ActionType::Notification);
        event.tool_name = hook.to_owned();
        let message = input
            .text
            .as_deref()
            .or(input.reason.as_deref())
            .map(|m| parse::truncate(m, parse::OUTPUT_PREVIEW_MAX));
        event.set_payload(&NotificationPayload {
            message,
            notification_type: Some(hook.to_owned()),
        })?;
        Ok(event)
    }
}

impl Adapter for CursorAdapter {
    fn name(&self) -> &'static str {
        AGENT_NAME
    }

    fn display_name(&self) -> &'static str {
        "Cursor"
    }

    fn hook_types(&self) -> &'static [&'static str] {
        HOOK_TYPES
    }

    fn session_env_var(&self) -> &'static str {
        "CURSOR_SESSION_ID"
    }

    fn hook_target(&self) -> HookTarget {
        HookTarget::Settings {
            dir: ".cursor",
            file: "hooks.json",
            layout: SettingsLayout::Versioned,
        }
    }

    fn response_mode(&self, hook_type: &str) -> ResponseMode {
        if hook_type.starts_with("before") {
            ResponseMode::PermissionJson
        } else {
            ResponseMode::AllowDenyJson
        }
    }

    fn parse_event(&self, hook_type: &str, raw: &[u8], ctx: &ParseContext) -> Result<Event> {
        let input: HookInput = parse::decode(raw, "cursor hook")?;
        let session = parse::resolve_session(self.session_env_var(), Some(&input.conversation_id));
        let origin = Origin::new(AGENT_NAME, session)
            .with_cwd(input.workspace_roots.first().map(String::as_str));
        let hook = if hook_type.is_empty() {
            input.hook_event_name.as_str()
        } else {
            hook_type
        };

        let mut event = match hook {
            "preToolUse" | "postToolUse" | "postToolUseFailure" => {
                Self::generic_tool(&origin, hook, &input, ctx)?
            }
            "beforeShellExecution" | "afterShellExecution" => Self::shell(&origin, hook, &input, ctx)?,
            "beforeReadFile" | "beforeTabFileRead" => Self::read_file(&origin, &input, ctx)?,
            "afterFileEdit" | "afterTabFileEdit" => Self::file_edit(&origin, &input, ctx)?,
            "beforeMCPExecution" | "afterMCPExecution" => Self::mcp(&origin, hook, &input, ctx)?,
            "beforeSubmitPrompt" => {
                let mut event = origin.event(ActionType::ToolUse);
                event.tool_name = hook.to_owned();
                let prompt = input.prompt.as_ref().map(|p| json!({ "prompt": p }));
                event.set_payload(&parse::tool_use(hook, prompt.as_ref(), None, ctx))?;
                event
            }
            "sessionStart" => {
                let mut event = origin.event(ActionType::SessionStart);
                event.set_payload(&SessionStartPayload {
                    model: input.model.clone(),
                    ..SessionStartPayload::default()
                })?;
                event
            }
            "sessionEnd" | "stop" => {
                let mut event = origin.event(ActionType::SessionEnd);
                event.tool_name = hook.to_owned();
                let reason = input
                    .reason
                    .clone()
                    .filter(|r| !r.is_empty())
                    .unwrap_or_else(|| "completed".into());
                event.set_payload(&SessionEndPayload {
                    reason: Some(reason),
                })?;
                event
            }
            "afterAgentResponse" | "afterAgentThought" | "subagentStart" | "subagentStop"
            | "preCompact" => Self::notification(&origin, hook, &input)?,
            other => return Ok(origin.unknown(other, raw, ctx)),
        };
        parse::keep_raw(&mut event, raw, ctx);
        Ok(event)
    }
}
