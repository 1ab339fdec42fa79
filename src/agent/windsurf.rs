//! Windsurf (Cascade) adapter.
//!
//! The hook type alone decides the action; `tool_info` carries the
//! action-specific fields. The trajectory id is the agent session string
//! and is always hashed into the session id, even when it is a UUID.
//! Raw payloads are never kept for this agent.

use serde::Deserialize;
use serde_json::{json, Map, Value};

use super::parse::{self, Origin};
use super::{Adapter, HookTarget, ParseContext, ResponseMode, SettingsLayout};
use crate::models::event::{ActionType, Event, ResultStatus};
use crate::models::payload::{CommandExecPayload, FileReadPayload, NotificationPayload};
use crate::{AppError, Result};

/// Machine name.
pub const AGENT_NAME: &str = "windsurf";

const HOOK_TYPES: &[&str] = &[
    "pre_read_code",
    "post_read_code",
    "pre_write_code",
    "post_write_code",
    "pre_run_command",
    "post_run_command",
    "pre_mcp_tool_use",
    "post_mcp_tool_use",
    "pre_user_prompt",
    "post_cascade_response",
    "post_setup_worktree",
];

#[derive(Debug, Default, Deserialize)]
struct HookInput {
    #[serde(default)]
    agent_action_name: String,
    #[serde(default)]
    trajectory_id: String,
    #[serde(default)]
    tool_info: Value,
}

#[derive(Debug, Default, Deserialize)]
struct Edit {
    #[serde(default)]
    old_string: String,
    #[serde(default)]
    new_string: String,
}

#[derive(Debug, Default, Deserialize)]
struct CodeInfo {
    #[serde(default)]
    file_path: String,
    #[serde(default)]
    edits: Vec<Edit>,
}

#[derive(Debug, Default, Deserialize)]
struct CommandInfo {
    #[serde(default)]
    command_line: String,
    #[serde(default)]
    cwd: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct McpInfo {
    #[serde(default)]
    mcp_server_name: String,
    #[serde(default)]
    mcp_tool_name: String,
    #[serde(default)]
    mcp_tool_arguments: Option<Map<String, Value>>,
    #[serde(default)]
    mcp_result: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct PromptInfo {
    #[serde(default)]
    user_prompt: Option<String>,
    #[serde(default)]
    response: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct WorktreeInfo {
    #[serde(default)]
    worktree_path: String,
    #[serde(default)]
    root_workspace_path: String,
}

/// Action recorded for a Windsurf hook type.
#[must_use]
pub fn action_for_hook(hook_type: &str) -> ActionType {
    match hook_type {
        "pre_read_code" | "post_read_code" => ActionType::FileRead,
        "pre_write_code" | "post_write_code" => ActionType::FileWrite,
        "pre_run_command" | "post_run_command" => ActionType::CommandExec,
        "pre_mcp_tool_use" | "post_mcp_tool_use" | "pre_user_prompt" | "post_setup_worktree" => {
            ActionType::ToolUse
        }
        "post_cascade_response" => ActionType::Notification,
        _ => ActionType::Unknown,
    }
}

fn tool_info<T: serde::de::DeserializeOwned + Default>(input: &HookInput, what: &str) -> Result<T> {
    if input.tool_info.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(input.tool_info.clone()).map_err(|err| {
        AppError::Parse(format!("failed to parse {what} tool_info: {err}"))
    })
}

/// Adapter for Windsurf.
#[derive(Debug, Clone, Copy, Default)]
pub struct WindsurfAdapter;

impl WindsurfAdapter {
    fn code(origin: &Origin, hook: &str, input: &HookInput, ctx: &ParseContext) -> Result<Event> {
        let info: CodeInfo = tool_info(input, hook)?;
        let action = action_for_hook(hook);
        let mut event = origin.event(action);
        event.tool_name.clone_from(&input.agent_action_name);
        event.is_sensitive = ctx.privacy.is_sensitive_path(&info.file_path);
        if action == ActionType::FileRead {
            event.set_payload(&FileReadPayload {
                path: info.file_path,
                ..FileReadPayload::default()
            })?;
        } else {
            let edits: Vec<(String, String)> = info
                .edits
                .into_iter()
                .map(|e| (e.old_string, e.new_string))
                .collect();
            let (payload, diff) = parse::file_write_edits(&info.file_path, &edits, ctx);
            event.set_payload(&payload)?;
            event.diff_content = diff;
        }
        Ok(event)
    }

    fn command(origin: &Origin, hook: &str, input: &HookInput, ctx: &ParseContext) -> Result<Event> {
        let info: CommandInfo = tool_info(input, hook)?;
        let mut event = origin.event(ActionType::CommandExec);
        event.tool_name.clone_from(&input.agent_action_name);
        if let Some(cwd) = info.cwd.filter(|c| !c.is_empty()) {
            event.working_directory = Some(cwd);
        }
        event.is_sensitive = ctx.privacy.is_sensitive_command(&info.command_line);
        event.set_payload(&CommandExecPayload {
            command: ctx.privacy.redact(&info.command_line),
            ..CommandExecPayload::default()
        })?;
        Ok(event)
    }

    fn mcp(origin: &Origin, hook: &str, input: &HookInput, ctx: &ParseContext) -> Result<Event> {
        let info: McpInfo = tool_info(input, hook)?;
        let mut event = origin.event(ActionType::ToolUse);
        event.tool_name.clone_from(&info.mcp_tool_name);
        let arguments = info.mcp_tool_arguments.map(Value::Object);
        let result = info
            .mcp_result
            .filter(|r| hook.starts_with("post_") && !r.is_empty())
            .map(|r| json!({ "result": r }));
        let qualified = format!("{}/{}", info.mcp_server_name, info.mcp_tool_name);
        event.set_payload(&parse::tool_use(&qualified, arguments.as_ref(), result.as_ref(), ctx))?;
        Ok(event)
    }
}

impl Adapter for WindsurfAdapter {
    fn name(&self) -> &'static str {
        AGENT_NAME
    }

    fn display_name(&self) -> &'static str {
        "Windsurf"
    }

    fn hook_types(&self) -> &'static [&'static str] {
        HOOK_TYPES
    }

    fn session_env_var(&self) -> &'static str {
        "WINDSURF_SESSION_ID"
    }

    fn hook_target(&self) -> HookTarget {
        HookTarget::Settings {
            dir: ".codeium/windsurf",
            file: "hooks.json",
            layout: SettingsLayout::Flat,
        }
    }

    fn response_mode(&self, _hook_type: &str) -> ResponseMode {
        ResponseMode::ExitCode
    }

    fn parse_event(&self, hook_type: &str, raw: &[u8], ctx: &ParseContext) -> Result<Event> {
        let input: HookInput = parse::decode(raw, "windsurf hook")?;
        let session =
            parse::resolve_hashed_session(self.session_env_var(), Some(&input.trajectory_id));
        let origin = Origin::new(AGENT_NAME, session);

        let mut event = match hook_type {
            "pre_read_code" | "post_read_code" | "pre_write_code" | "post_write_code" => {
                Self::code(&origin, hook_type, &input, ctx)?
            }
            "pre_run_command" | "post_run_command" => {
                Self::command(&origin, hook_type, &input, ctx)?
            }
            "pre_mcp_tool_use" | "post_mcp_tool_use" => Self::mcp(&origin, hook_type, &input, ctx)?,
            "pre_user_prompt" => {
                let info: PromptInfo = tool_info(&input, hook_type)?;
                let mut event = origin.event(ActionType::ToolUse);
                event.tool_name = hook_type.to_owned();
                let prompt = info.user_prompt.map(|p| json!({ "user_prompt": p }));
                event.set_payload(&parse::tool_use(hook_type, prompt.as_ref(), None, ctx))?;
                event
            }
            "post_cascade_response" => {
                let info: PromptInfo = tool_info(&input, hook_type)?;
                let mut event = origin.event(ActionType::Notification);
                event.tool_name = hook_type.to_owned();
                event.set_payload(&NotificationPayload {
                    message: info
                        .response
                        .map(|r| parse::truncate(&r, parse::OUTPUT_PREVIEW_MAX)),
                    notification_type: Some("cascade_response".into()),
                })?;
                event
            }
            "post_setup_worktree" => {
                let info: WorktreeInfo = tool_info(&input, hook_type)?;
                let mut event = origin.event(ActionType::ToolUse);
                event.tool_name = hook_type.to_owned();
                if !info.worktree_path.is_empty() {
                    event.working_directory = Some(info.worktree_path.clone());
                }
                let details = json!({
                    "worktree_path": info.worktree_path,
                    "root_workspace_path": info.root_workspace_path,
                });
                event.set_payload(&parse::tool_use(hook_type, Some(&details), None, ctx))?;
                event
            }
            other => {
                let mut event = origin.event(action_for_hook(other));
                event.tool_name = other.to_owned();
                return Ok(event);
            }
        };
        if hook_type.starts_with("post_") {
            event.result_status = ResultStatus::Success;
        }
        Ok(event)
    }
}
