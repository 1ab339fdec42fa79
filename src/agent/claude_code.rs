//! Claude Code adapter.
//!
//! Hooks are registered in `~/.claude/settings.json`. Tool hooks carry
//! `tool_name`, `tool_input` and (after execution) `tool_response`; the
//! decision is reported through the exit code alone.

use serde::Deserialize;
use serde_json::Value;

use super::parse::{self, Origin, STANDARD_KEYS};
use super::{Adapter, HookTarget, ParseContext, ResponseMode, SettingsLayout};
use crate::models::event::{ActionType, Event};
use crate::models::payload::{NotificationPayload, SessionEndPayload, SessionStartPayload};
use crate::Result;

/// Machine name.
pub const AGENT_NAME: &str = "claude-code";

const HOOK_TYPES: &[&str] = &[
    "PreToolUse",
    "PostToolUse",
    "PostToolUseFailure",
    "SessionStart",
    "SessionEnd",
    "Notification",
];

#[derive(Debug, Default, Deserialize)]
struct HookInput {
    #[serde(default)]
    session_id: String,
    #[serde(default)]
    cwd: Option<String>,
    #[serde(default)]
    tool_name: String,
    #[serde(default)]
    tool_input: Value,
    #[serde(default)]
    tool_response: Option<Value>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    reason: Option<String>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    agent_type: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    notification_type: Option<String>,
}

/// Action recorded for a Claude Code tool.
#[must_use]
pub fn action_for_tool(tool: &str) -> ActionType {
    match tool {
        "Read" | "View" | "Grep" | "Glob" | "LS" => ActionType::FileRead,
        "Write" | "Edit" | "MultiEdit" | "NotebookEdit" => ActionType::FileWrite,
        "Bash" | "Execute" => ActionType::CommandExec,
        _ => ActionType::ToolUse,
    }
}

/// Adapter for Claude Code.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClaudeCodeAdapter;

impl ClaudeCodeAdapter {
    fn tool_event(
        origin: &Origin,
        hook_type: &str,
        input: &HookInput,
        ctx: &ParseContext,
    ) -> Result<Event> {
        let action = action_for_tool(&input.tool_name);
        let mut event = origin.event(action);
        event.tool_name.clone_from(&input.tool_name);

        let is_post = hook_type != "PreToolUse";
        let response = input.tool_response.as_ref().filter(|_| is_post);

        if input.tool_name == "MultiEdit" {
            let path = parse::str_field(&input.tool_input, STANDARD_KEYS.path).unwrap_or_default();
            let edits = parse::edits_from(input.tool_input.get("edits"), "old_string", "new_string");
            let (payload, diff) = parse::file_write_edits(path, &edits, ctx);
            event.is_sensitive = ctx.privacy.is_sensitive_path(path);
            event.set_payload(&payload)?;
            event.diff_content = diff;
        } else {
            parse::build_tool_payload(&mut event, &input.tool_input, response, STANDARD_KEYS, ctx)?;
        }

        if is_post {
            parse::apply_result(&mut event, response);
        }
        if hook_type == "PostToolUseFailure" {
            let message = input
                .error
                .as_deref()
                .or(event.error_message.as_deref())
                .unwrap_or("tool call failed")
                .to_owned();
            parse::mark_error(&mut event, &message);
        }
        Ok(event)
    }
}

impl Adapter for ClaudeCodeAdapter {
    fn name(&self) -> &'static str {
        AGENT_NAME
    }

    fn display_name(&self) -> &'static str {
        "Claude Code"
    }

    fn hook_types(&self) -> &'static [&'static str] {
        HOOK_TYPES
    }

    fn session_env_var(&self) -> &'static str {
        "CLAUDE_SESSION_ID"
    }

    fn hook_target(&self) -> HookTarget {
        HookTarget::Settings {
            dir: ".claude",
            file: "settings.json",
            layout: SettingsLayout::MatcherNested,
        }
    }

    fn response_mode(&self, _hook_type: &str) -> ResponseMode {
        ResponseMode::ExitCode
    }

    fn parse_event(&self, hook_type: &str, raw: &[u8], ctx: &ParseContext) -> Result<Event> {
        let input: HookInput = parse::decode(raw, "claude-code hook")?;
        let session = parse::resolve_session(self.session_env_var(), Some(&input.session_id));
        let origin = Origin::new(AGENT_NAME, session).with_cwd(input.cwd.as_deref());

        let mut event = match hook_type {
            "PreToolUse" | "PostToolUse" | "PostToolUseFailure" => {
                Self::tool_event(&origin, hook_type, &input, ctx)?
            }
            "SessionStart" => {
                let mut event = origin.event(ActionType::SessionStart);
                event.set_payload(&SessionStartPayload {
                    source: input.source.clone(),
                    model: input.model.clone(),
                    agent_type: input.agent_type.clone(),
                })?;
                event
            }
            "SessionEnd" => {
                let mut event = origin.event(ActionType::SessionEnd);
                event.set_payload(&SessionEndPayload {
                    reason: input.reason.clone(),
                })?;
                event
            }
            "Notification" => {
                let mut event = origin.event(ActionType::Notification);
                event.set_payload(&NotificationPayload {
                    message: input.message.clone(),
                    notification_type: input.notification_type.clone(),
                })?;
                event
            }
            other => return Ok(origin.unknown(other, raw, ctx)),
        };
        parse::keep_raw(&mut event, raw, ctx);
        Ok(event)
    }
}
