//! Gemini CLI adapter.
//!
//! Hooks live in `~/.gemini/settings.json` using the same matcher-nested
//! layout as Claude Code. Gemini reads a `{decision, reason}` JSON body
//! from the hook's stdout.

use serde::Deserialize;
use serde_json::Value;

use super::parse::{self, Origin, ToolKeys};
use super::{Adapter, HookTarget, ParseContext, ResponseMode, SettingsLayout};
use crate::models::event::{ActionType, Event};
use crate::models::payload::{NotificationPayload, SessionEndPayload, SessionStartPayload};
use crate::Result;

/// Machine name.
pub const AGENT_NAME: &str = "gemini";

const HOOK_TYPES: &[&str] = &[
    "BeforeTool",
    "AfterTool",
    "SessionStart",
    "SessionEnd",
    "Notification",
];

const KEYS: ToolKeys = ToolKeys {
    path: &["file_path", "absolute_path", "path", "dir_path"],
    content: "content",
    old: "old_string",
    new: "new_string",
};

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
    tool_input: Value,
    #[serde(default)]
    tool_response: Option<Value>,
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    reason: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    notification_type: Option<String>,
}

/// Action recorded for a Gemini CLI tool.
#[must_use]
pub fn action_for_tool(tool: &str) -> ActionType {
    match tool {
        "read_file" | "read_many_files" | "list_directory" | "glob" | "search_file_content" => {
            ActionType::FileRead
        }
        "write_file" | "replace" => ActionType::FileWrite,
        "run_shell_command" => ActionType::CommandExec,
        _ => ActionType::ToolUse,
    }
}

/// Adapter for Gemini CLI.
#[derive(Debug, Clone, Copy, Default)]
pub struct GeminiAdapter;

impl Adapter for GeminiAdapter {
    fn name(&self) -> &'static str {
        AGENT_NAME
    }

    fn display_name(&self) -> &'static str {
        "Gemini CLI"
    }

    fn hook_types(&self) -> &'static [&'static str] {
        HOOK_TYPES
    }

    fn session_env_var(&self) -> &'static str {
        "GEMINI_SESSION_ID"
    }

    fn hook_target(&self) -> HookTarget {
        HookTarget::Settings {
            dir: ".gemini",
            file: "settings.json",
            layout: SettingsLayout::MatcherNested,
        }
    }

    fn response_mode(&self, _hook_type: &str) -> ResponseMode {
        ResponseMode::DecisionJson
    }

    fn parse_event(&self, hook_type: &str, raw: &[u8], ctx: &ParseContext) -> Result<Event> {
        let input: HookInput = parse::decode(raw, "gemini hook")?;
        let session = parse::resolve_session(self.session_env_var(), Some(&input.session_id));
        let origin = Origin::new(AGENT_NAME, session).with_cwd(input.cwd.as_deref());
        let hook = if hook_type.is_empty() {
            input.hook_event_name.as_str()
        } else {
            hook_type
        };

        let mut event = match hook {
            "BeforeTool" | "AfterTool" => {
                let mut event = origin.event(action_for_tool(&input.tool_name));
                event.tool_name.clone_from(&input.tool_name);
                let response = input.tool_response.as_ref().filter(|_| hook == "AfterTool");
                parse::build_tool_payload(&mut event, &input.tool_input, response, KEYS, ctx)?;
                if hook == "AfterTool" {
                    parse::apply_result(&mut event, response);
                }
                event
            }
            "SessionStart" => {
                let mut event = origin.event(ActionType::SessionStart);
                event.set_payload(&SessionStartPayload {
                    source: input.source.clone(),
                    ..SessionStartPayload::default()
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
