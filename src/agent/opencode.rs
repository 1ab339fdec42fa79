//! `OpenCode` adapter.
//!
//! `OpenCode` loads a JS plugin that forwards its events to `gryph _hook`.
//! Tool names arrive in lower case; session events carry their details in
//! `properties`.

use serde::Deserialize;
use serde_json::Value;

use super::parse::{self, Origin, ToolKeys};
use super::{Adapter, HookTarget, ParseContext, ResponseMode};
use crate::models::event::{ActionType, Event};
use crate::models::payload::{NotificationPayload, SessionEndPayload, SessionStartPayload};
use crate::Result;

/// Machine name.
pub const AGENT_NAME: &str = "opencode";

const HOOK_TYPES: &[&str] = &[
    "tool.execute.before",
    "tool.execute.after",
    "session.created",
    "session.idle",
    "session.error",
];

const KEYS: ToolKeys = ToolKeys {
    path: &["filePath", "file_path", "path"],
    content: "content",
    old: "oldString",
    new: "newString",
};

#[derive(Debug, Default, Deserialize)]
struct HookInput {
    #[serde(default)]
    session_id: String,
    #[serde(default)]
    tool: String,
    #[serde(default)]
    args: Value,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    cwd: Option<String>,
    #[serde(default)]
    properties: Value,
}

/// Action recorded for an `OpenCode` tool (already lower-cased).
#[must_use]
pub fn action_for_tool(tool: &str) -> ActionType {
    match tool {
        "read" | "grep" | "glob" | "list" => ActionType::FileRead,
        "write" | "edit" | "patch" => ActionType::FileWrite,
        "bash" => ActionType::CommandExec,
        _ => ActionType::ToolUse,
    }
}

/// Session string used when the plugin supplies none: `<cwd>:<parent pid>`.
fn fallback_session(cwd: Option<&str>) -> String {
    let cwd = cwd.filter(|c| !c.is_empty()).map_or_else(
        || {
            std::env::current_dir()
                .map(|p| p.display().to_string())
                .unwrap_or_default()
        },
        str::to_owned,
    );
    format!("{cwd}:{}", parent_pid())
}

#[cfg(unix)]
fn parent_pid() -> u32 {
    std::os::unix::process::parent_id()
}

#[cfg(not(unix))]
fn parent_pid() -> u32 {
    std::process::id()
}

/// Adapter for `OpenCode`.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenCodeAdapter;

impl Adapter for OpenCodeAdapter {
    fn name(&self) -> &'static str {
        AGENT_NAME
    }

    fn display_name(&self) -> &'static str {
        "OpenCode"
    }

    fn hook_types(&self) -> &'static [&'static str] {
        HOOK_TYPES
    }

    fn session_env_var(&self) -> &'static str {
        "OPENCODE_SESSION_ID"
    }

    fn hook_target(&self) -> HookTarget {
        HookTarget::Plugin {
            dir: ".config/opencode",
            plugin_file: "plugins/gryph.js",
        }
    }

    fn response_mode(&self, _hook_type: &str) -> ResponseMode {
        ResponseMode::ExitCode
    }

    fn parse_event(&self, hook_type: &str, raw: &[u8], ctx: &ParseContext) -> Result<Event> {
        let input: HookInput = parse::decode(raw, "opencode hook")?;
        let supplied = Some(input.session_id.clone())
            .filter(|s| !s.is_empty())
            .or_else(|| {
                parse::str_field(&input.properties, &["sessionId", "sessionID"]).map(str::to_owned)
            })
            .unwrap_or_else(|| fallback_session(input.cwd.as_deref()));
        let session = parse::resolve_session(self.session_env_var(), Some(&supplied));
        let origin = Origin::new(AGENT_NAME, session).with_cwd(input.cwd.as_deref());

        let mut event = match hook_type {
            "tool.execute.before" | "tool.execute.after" => {
                let tool = input.tool.to_lowercase();
                let mut event = origin.event(action_for_tool(&tool));
                event.tool_name = tool;
                let is_after = hook_type == "tool.execute.after";
                let response = input.result.as_ref().filter(|_| is_after);
                parse::build_tool_payload(&mut event, &input.args, response, KEYS, ctx)?;
                if is_after {
                    parse::apply_result(&mut event, response);
                }
                event
            }
            "session.created" => {
                let mut event = origin.event(ActionType::SessionStart);
                event.set_payload(&SessionStartPayload {
                    source: Some(AGENT_NAME.to_owned()),
                    ..SessionStartPayload::default()
                })?;
                event
            }
            "session.idle" => {
                let mut event = origin.event(ActionType::SessionEnd);
                event.set_payload(&SessionEndPayload {
                    reason: Some("idle".into()),
                })?;
                event
            }
            "session.error" => {
                let mut event = origin.event(ActionType::Notification);
                let message = parse::str_field(&input.properties, &["message", "error"])
                    .map(|m| parse::truncate(m, parse::OUTPUT_PREVIEW_MAX));
                event.set_payload(&NotificationPayload {
                    message,
                    notification_type: Some("error".into()),
                })?;
                event
            }
            other => return Ok(origin.unknown(other, raw, ctx)),
        };
        parse::keep_raw(&mut event, raw, ctx);
        Ok(event)
    }
}
