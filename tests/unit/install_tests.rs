//! Hook installation into agent settings files under a temporary home.

use std::fs;
use std::path::Path;

use gryph::agent::claude_code::ClaudeCodeAdapter;
use gryph::agent::cursor::CursorAdapter;
use gryph::agent::install::{hook_command, InstallOptions};
use gryph::agent::windsurf::WindsurfAdapter;
use gryph::agent::Adapter;
use gryph::errors::AppError;
use serde_json::{json, Value};
use tempfile::TempDir;

fn home_with(dir: &str) -> (TempDir, InstallOptions) {
    let home = tempfile::tempdir().expect("tempdir");
    fs::create_dir_all(home.path().join(dir)).expect("agent dir");
    let opts = InstallOptions::new(home.path().to_path_buf(), home.path().join("backups"));
    (home, opts)
}

fn read_json(path: &Path) -> Value {
    serde_json::from_str(&fs::read_to_string(path).expect("read")).expect("json")
}

#[test]
fn hook_command_format() {
    assert_eq!(
        hook_command("claude-code", "PreToolUse"),
        "gryph _hook claude-code PreToolUse"
    );
}

#[test]
fn install_requires_detected_agent_unless_forced() {
    let home = tempfile::tempdir().expect("tempdir");
    let mut opts = InstallOptions::new(home.path().to_path_buf(), home.path().join("b"));
    let err = ClaudeCodeAdapter.install(&opts).expect_err("not detected");
    assert!(matches!(err, AppError::NotFound(_)));

    opts.force = true;
    let report = ClaudeCodeAdapter.install(&opts).expect("forced install");
    assert_eq!(report.hooks_installed.len(), ClaudeCodeAdapter.hook_types().len());
    assert!(home.path().join(".claude/settings.json").exists());
}

#[test]
fn claude_install_preserves_foreign_settings_and_backs_up() {
    let (home, opts) = home_with(".claude");
    let settings = home.path().join(".claude/settings.json");
    fs::write(
        &settings,
        json!({
            "theme": "dark",
            "hooks": {"PreToolUse": [{"matcher": "Bash", "hooks": [{"type": "command", "command": "other-tool"}]}]}
        })
        .to_string(),
    )
    .expect("seed settings");

    let report = ClaudeCodeAdapter.install(&opts).expect("install");
    let backup = report.backup_path.expect("backup written");
    assert!(Path::new(&backup).exists());

    let root = read_json(&settings);
    assert_eq!(root["theme"], "dark");
    let pre = root["hooks"]["PreToolUse"].as_array().expect("array");
    assert_eq!(pre.len(), 2);
    assert_eq!(pre[0]["hooks"][0]["command"], "other-tool");
    assert_eq!(pre[1]["matcher"], "*");
    assert_eq!(
        pre[1]["hooks"][0]["command"],
        "gryph _hook claude-code PreToolUse"
    );
    assert!(root["hooks"]["SessionStart"][0].get("matcher").is_none());

    let status = ClaudeCodeAdapter.status(home.path()).expect("status");
    assert!(status.detected);
    assert!(status.is_complete());
}

#[test]
fn second_install_reports_already_installed() {
    let (_home, opts) = home_with(".gemini");
    let first = gryph::agent::gemini::GeminiAdapter.install(&opts).expect("install");
    assert!(!first.already_installed);
    let second = gryph::agent::gemini::GeminiAdapter.install(&opts).expect("reinstall");
    assert!(second.already_installed);
    assert!(second.hooks_installed.is_empty());
}

#[test]
fn forced_reinstall_does_not_duplicate() {
    let (home, mut opts) = home_with(".codeium/windsurf");
    WindsurfAdapter.install(&opts).expect("install");
    opts.force = true;
    WindsurfAdapter.install(&opts).expect("force");

    let root = read_json(&home.path().join(".codeium/windsurf/hooks.json"));
    assert!(root.get("version").is_none());
    assert_eq!(root["hooks"]["pre_run_command"].as_array().map(Vec::len), Some(1));
}

#[test]
fn dry_run_writes_nothing() {
    let (home, mut opts) = home_with(".cursor");
    opts.dry_run = true;
    let report = CursorAdapter.install(&opts).expect("dry run");
    assert!(report.dry_run);
    assert_eq!(report.hooks_installed.len(), CursorAdapter.hook_types().len());
    assert!(!home.path().join(".cursor/hooks.json").exists());
}

#[test]
fn cursor_install_and_uninstall_round() {
    let (home, opts) = home_with(".cursor");
    let path = home.path().join(".cursor/hooks.json");
    CursorAdapter.install(&opts).expect("install");

    let root = read_json(&path);
    assert_eq!(root["version"], 1);
    assert_eq!(
        root["hooks"]["beforeShellExecution"][0]["command"],
        "gryph _hook cursor beforeShellExecution"
    );

    let report = CursorAdapter.uninstall(&opts).expect("uninstall");
    assert_eq!(report.hooks_removed.len(), CursorAdapter.hook_types().len());
    let root = read_json(&path);
    assert_eq!(root["version"], 1);
    assert_eq!(root["hooks"], json!({}));

    let status = CursorAdapter.status(home.path()).expect("status");
    assert!(status.installed.is_empty());
    assert!(!status.is_complete());
}

#[test]
fn uninstall_restores_backup() {
    let (home, opts) = home_with(".claude");
    let settings = home.path().join(".claude/settings.json");
    fs::write(&settings, "{\"model\": \"opus\"}").expect("seed");
    ClaudeCodeAdapter.install(&opts).expect("install");

    let mut restore = opts.clone();
    restore.restore_backup = true;
    let report = ClaudeCodeAdapter.uninstall(&restore).expect("uninstall");
    assert!(report.backup_restored);
    assert_eq!(read_json(&settings), json!({"model": "opus"}));
}

#[test]
fn uninstall_without_settings_warns() {
    let (_home, opts) = home_with(".claude");
    let report = ClaudeCodeAdapter.uninstall(&opts).expect("uninstall");
    assert!(report.hooks_removed.is_empty());
    assert_eq!(report.warnings.len(), 1);
}

#[test]
fn malformed_settings_is_a_config_error() {
    let (home, opts) = home_with(".claude");
    fs::write(home.path().join(".claude/settings.json"), "[1, 2]").expect("seed");
    let err = ClaudeCodeAdapter.install(&opts).expect_err("not an object");
    assert!(matches!(err, AppError::Config(_)));
}
