//! `OpenClaw` adapter.
//!
//! `OpenClaw` runs a TypeScript extension that pipes tool and session
//! events into `gryph _hook openclaw <hook>`.

use serde::Deserialize;
use serde_json::Value;

use super::parse::{self, Origin, STANDARD_KEYS};
use super::{Adapter, HookTarget, ParseContext, ResponseMode};
use crate::models::event::{ActionType, Event};
use crate::models::payload::{SessionEndPayload, SessionStartPayload};
use crate::Result;

/// Machine name.
pub const AGENT_NAME: &str = "openclaw";

const HOOK_TYPES: &[&str] = &[
    "before_tool_call",
    "after_tool_call",
    "session_start",
    "session_end",
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
    params: Value,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    reason: Option<String>,
}

/// Action recorded for an `OpenClaw` tool.
#[must_use]
pub fn action_for_tool(tool: &str) -> ActionType {
    match tool {
        "read" | "grep" | "glob" | "list" => ActionType::FileRead,
        "write" | "edit" => ActionType::FileWrite,
        "exec" | "bash" => ActionType::CommandExec,
        _ => ActionType::ToolUse,
    }
}

/// Adapter for `OpenClaw`.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenClawAdapter;

impl Adapter for OpenClawAdapter {
    fn name(&self) -> &'static str {
        AGENT_NAME
    }

    fn display_name(&self) -> &'static str {
        "OpenClaw"
    }

    fn hook_types(&self) -> &'static [&'static str] {
        HOOK_TYPES
    }

    fn session_env_var(&self) -> &'static str {
        "OPENCLAW_SESSION_ID"
    }

    fn hook_target(&self) -> HookTarget {
        HookTarget::Plugin {
            dir: ".openclaw",
            plugin_file: "extensions/gryph/index.ts",
        }
    }

    fn response_mode(&self, _hook_type: &str) -> ResponseMode {
        ResponseMode::ExitCode
    }

    fn parse_event(&self, hook_type: &str, raw: &[u8], ctx: &ParseContext) -> Result<Event> {
        let input: HookInput = parse::decode(raw, "openclaw hook")?;
        let session = parse::resolve_session(self.session_env_var(), Some(&input.session_id));
        let origin = Origin::new(AGENT_NAME, session).with_cwd(input.cwd.as_deref());

        let mut event = match hook_type {
            "before_tool_call" | "after_tool_call" => {
                let mut event = origin.event(action_for_tool(&input.tool_name));
                event.tool_name.clone_from(&input.tool_name);
                let is_after = hook_type == "after_tool_call";
                let response = input.result.as_ref().filter(|_| is_after);
                parse::build_tool_payload(&mut event, &input.params, response, STANDARD_KEYS, ctx)?;
                if is_after {
                    parse::apply_result(&mut event, response);
                    if let Some(err) = input.error.as_deref().filter(|e| !e.is_empty()) {
                        parse::mark_error(&mut event, err);
                    }
                }
                event
            }
            "session_start" => {
                let mut event = origin.event(ActionType::SessionStart);
                event.set_payload(&SessionStartPayload::default())?;
                event
            }
            "session_end" => {
                let mut event = origin.event(ActionType::SessionEnd);
                event.set_payload(&SessionEndPayload {
                    reason: input.reason.clone(),
                })?;
                event
            }
            other => return Ok(origin.unknown(other, raw, ctx)),
        };
        parse::keep_raw(&mut event, raw, ctx);
        Ok(event)
    }
}
