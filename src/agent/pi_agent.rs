//! Pi Agent adapter.
//!
//! Pi loads a TypeScript extension from `~/.pi/agent/extensions`. Tool
//! calls carry `input`; results carry a `content` array of text blocks and
//! an `is_error` flag instead of a structured response.

use serde::Deserialize;
use serde_json::{json, Value};

use super::parse::{self, Origin, ToolKeys};
use super::{Adapter, HookTarget, ParseContext, ResponseMode};
use crate::models::event::{ActionType, Event, ResultStatus};
use crate::models::payload::{FileWritePayload, SessionEndPayload, SessionStartPayload};
use crate::Result;

/// Machine name.
pub const AGENT_NAME: &str = "pi-agent";

const HOOK_TYPES: &[&str] = &["tool_call", "tool_result", "session_start", "session_shutdown"];

const KEYS: ToolKeys = ToolKeys {
    path: &["path"],
    content: "content",
    old: "oldText",
    new: "newText",
};

#[derive(Debug, Default, Deserialize)]
struct ContentBlock {
    #[serde(default, rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

#[derive(Debug, Default, Deserialize)]
struct HookInput {
    #[serde(default)]
    session_id: String,
    #[serde(default)]
    cwd: Option<String>,
    #[serde(default)]
    hook_event_name: String,
    #[serde(default)]
    tool_name: String,
    #[serde(default)]
    input: Value,
    #[serde(default)]
    content: Vec<ContentBlock>,
    #[serde(default)]
    is_error: bool,
}

impl HookInput {
    fn output_text(&self) -> Option<&str> {
        self.content
            .iter()
            .find(|b| b.kind.is_empty() || b.kind == "text")
            .map(|b| b.text.as_str())
            .filter(|t| !t.is_empty())
    }
}

/// Action recorded for a Pi tool.
#[must_use]
pub fn action_for_tool(tool: &str) -> ActionType {
    match tool {
        "read" | "grep" | "find" | "ls" => ActionType::FileRead,
        "write" | "edit" => ActionType::FileWrite,
        "bash" => ActionType::CommandExec,
        _ => ActionType::ToolUse,
    }
}

/// Adapter for Pi Agent.
#[derive(Debug, Clone, Copy, Default)]
pub struct PiAgentAdapter;

impl PiAgentAdapter {
    fn tool_result(origin: &Origin, input: &HookInput, ctx: &ParseContext) -> Result<Event> {
        let action = action_for_tool(&input.tool_name);
        let mut event = origin.event(action);
        event.tool_name.clone_from(&input.tool_name);
        let output = input.output_text().map(|text| json!({ "output": text }));

        if action == ActionType::FileWrite {
            // The call already recorded the edit; the result only confirms it.
            let path = parse::str_field(&input.input, KEYS.path).unwrap_or_default();
            event.is_sensitive = ctx.privacy.is_sensitive_path(path);
            event.set_payload(&FileWritePayload {
                path: path.to_owned(),
                ..FileWritePayload::default()
            })?;
        } else {
            parse::build_tool_payload(&mut event, &input.input, output.as_ref(), KEYS, ctx)?;
        }

        if input.is_error {
            let message = input.output_text().unwrap_or("tool reported failure");
            parse::mark_error(&mut event, message);
        } else {
            event.result_status = ResultStatus::Success;
        }
        Ok(event)
    }
}

impl Adapter for PiAgentAdapter {
    fn name(&self) -> &'static str {
        AGENT_NAME
    }

    fn display_name(&self) -> &'static str {
        "Pi Agent"
    }

    fn hook_types(&self) -> &'static [&'static str] {
        HOOK_TYPES
    }

    fn session_env_var(&self) -> &'static str {
        "PI_SESSION_ID"
    }

    fn hook_target(&self) -> HookTarget {
        HookTarget::Plugin {
            dir: ".pi/agent",
            plugin_file: "extensions/gryph-hooks.ts",
        }
    }

    fn response_mode(&self, _hook_type: &str) -> ResponseMode {
        ResponseMode::ExitCode
    }

    fn parse_event(&self, hook_type: &str, raw: &[u8], ctx: &ParseContext) -> Result<Event> {
        let input: HookInput = parse::decode(raw, "pi-agent hook")?;
        let session = parse::resolve_session(self.session_env_var(), Some(&input.session_id));
        let origin = Origin::new(AGENT_NAME, session).with_cwd(input.cwd.as_deref());
        let hook = if hook_type.is_empty() {
            input.hook_event_name.as_str()
        } else {
            hook_type
        };

        let mut event = match hook {
            "tool_call" => {
                let mut event = origin.event(action_for_tool(&input.tool_name));
                event.tool_name.clone_from(&input.tool_name);
                parse::build_tool_payload(&mut event, &input.input, None, KEYS, ctx)?;
                event
            }
            "tool_result" => Self::tool_result(&origin, &input, ctx)?,
            "session_start" => {
                let mut event = origin.event(ActionType::SessionStart);
                event.set_payload(&SessionStartPayload {
                    source: Some("startup".into()),
                    ..SessionStartPayload::default()
                })?;
                event
            }
            "session_shutdown" => {
                let mut event = origin.event(ActionType::SessionEnd);
                event.set_payload(&SessionEndPayload {
                    reason: Some("shutdown".into()),
                })?;
                event
            }
            other => return Ok(origin.unknown(other, raw, ctx)),
        };
        parse::keep_raw(&mut event, raw, ctx);
        Ok(event)
    }
}
