//! Hook registration in agent settings files.
//!
//! Install merges `gryph _hook <agent> <type>` commands into the agent's
//! JSON settings, leaving unrelated keys and other tools' hooks untouched.
//! Uninstall removes only commands that start with `gryph`. Files are
//! written atomically through a temporary file in the same directory.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::{json, Map, Value};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use super::{HookTarget, SettingsLayout};
use crate::{AppError, Result};

/// Prefix identifying gryph's own hook commands.
pub const HOOK_BINARY: &str = "gryph";

/// Options shared by install, uninstall and status.
#[derive(Debug, Clone)]
pub struct InstallOptions {
    /// Home directory agent paths are resolved against.
    pub home: PathBuf,
    /// Directory receiving settings backups.
    pub backup_dir: PathBuf,
    /// Report the plan without touching files.
    pub dry_run: bool,
    /// Install even when the agent is not detected or hooks already exist.
    pub force: bool,
    /// Back up the settings file before rewriting it.
    pub backup: bool,
    /// On uninstall, restore the newest backup instead of editing.
    pub restore_backup: bool,
}

impl InstallOptions {
    /// Options with backups enabled and nothing forced.
    #[must_use]
    pub fn new(home: PathBuf, backup_dir: PathBuf) -> Self {
        Self {
            home,
            backup_dir,
            dry_run: false,
            force: false,
            backup: true,
            restore_backup: false,
        }
    }
}

/// What an install did (or would do, for a dry run).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InstallReport {
    /// Agent machine name.
    pub agent: String,
    /// Settings file edited.
    pub settings_path: Option<String>,
    /// Hook types registered.
    pub hooks_installed: Vec<String>,
    /// Backup of the previous settings file.
    pub backup_path: Option<String>,
    /// Hooks were already present and nothing was written.
    pub already_installed: bool,
    /// No file was written.
    pub dry_run: bool,
    /// Non-fatal notes for the operator.
    pub warnings: Vec<String>,
}

/// What an uninstall did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UninstallReport {
    /// Agent machine name.
    pub agent: String,
    /// Hook types whose gryph commands were removed.
    pub hooks_removed: Vec<String>,
    /// A backup replaced the settings file.
    pub backup_restored: bool,
    /// No file was written.
    pub dry_run: bool,
    /// Non-fatal notes for the operator.
    pub warnings: Vec<String>,
}

/// Registration state of an agent's hooks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HookStatus {
    /// Agent machine name.
    pub agent: String,
    /// Agent configuration directory exists.
    pub detected: bool,
    /// File holding the registration.
    pub settings_path: Option<String>,
    /// Hook types with a gryph command.
    pub installed: Vec<String>,
    /// Hook types without one.
    pub missing: Vec<String>,
}

impl HookStatus {
    /// Every hook type is registered.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.installed.is_empty() && self.missing.is_empty()
    }
}

/// Command line registered for `hook_type`.
#[must_use]
pub fn hook_command(agent: &str, hook_type: &str) -> String {
    format!("{HOOK_BINARY} _hook {agent} {hook_type}")
}

fn is_gryph_command(command: &str) -> bool {
    command.starts_with(HOOK_BINARY)
}

/// Register hooks for `agent`.
///
/// # Errors
///
/// Returns `AppError::NotFound` if the agent is not detected and `force`
/// is unset, `AppError::Config` if the settings file is not a JSON object,
/// or `AppError::Io` on file-system failure.
pub fn install_hooks(
    agent: &str,
    hook_types: &[&str],
    target: HookTarget,
    opts: &InstallOptions,
) -> Result<InstallReport> {
    let mut report = InstallReport {
        agent: agent.to_owned(),
        dry_run: opts.dry_run,
        ..InstallReport::default()
    };
    let config_dir = target.config_dir(&opts.home);
    if !config_dir.is_dir() && !opts.force {
        return Err(AppError::NotFound(format!(
            "{agent} not detected at {}",
            config_dir.display()
        )));
    }

    let (file, layout) = match target {
        HookTarget::Settings { file, layout, .. } => (file, layout),
        HookTarget::Plugin { plugin_file, .. } => {
            report.settings_path = Some(config_dir.join(plugin_file).display().to_string());
            report.warnings.push(format!(
                "{agent} uses a plugin; install it manually at {}",
                config_dir.join(plugin_file).display()
            ));
            return Ok(report);
        }
    };

    let path = config_dir.join(file);
    report.settings_path = Some(path.display().to_string());
    let mut root = read_settings(&path)?;

    let present = registered_hooks(&root, layout);
    if !opts.force && hook_types.iter().all(|h| present.iter().any(|p| p == h)) {
        info!(agent, "hooks already installed");
        report.already_installed = true;
        report.warnings.push("gryph hooks already installed (use --force to overwrite)".into());
        return Ok(report);
    }

    report.hooks_installed = hook_types.iter().map(|h| (*h).to_owned()).collect();
    if opts.dry_run {
        return Ok(report);
    }

    if opts.backup && path.exists() {
        report.backup_path = Some(backup_file(&path, agent, &opts.backup_dir)?.display().to_string());
    }

    remove_gryph_hooks(&mut root, layout);
    add_gryph_hooks(&mut root, agent, hook_types, layout);
    write_settings(&path, &root)?;
    info!(agent, path = %path.display(), hooks = hook_types.len(), "hooks installed");
    Ok(report)
}

/// Remove gryph's hooks for `agent`.
///
/// # Errors
///
/// Returns `AppError::Config` if the settings file is not a JSON object,
/// or `AppError::Io` on file-system failure.
pub fn uninstall_hooks(agent: &str, target: HookTarget, opts: &InstallOptions) -> Result<UninstallReport> {
    let mut report = UninstallReport {
        agent: agent.to_owned(),
        dry_run: opts.dry_run,
        ..UninstallReport::default()
    };
    let config_dir = target.config_dir(&opts.home);

    let (file, layout) = match target {
        HookTarget::Settings { file, layout, .. } => (file, layout),
        HookTarget::Plugin { plugin_file, .. } => {
            let plugin = config_dir.join(plugin_file);
            if !plugin.exists() {
                report.warnings.push("gryph plugin not installed".into());
            } else if !opts.dry_run {
                fs::remove_file(&plugin)
                    .map_err(|err| AppError::Io(format!("failed to remove plugin: {err}")))?;
                report.hooks_removed.push(plugin_file.to_owned());
            }
            return Ok(report);
        }
    };

    let path = config_dir.join(file);
    if !path.exists() {
        report.warnings.push(format!("{} does not exist", path.display()));
        return Ok(report);
    }

    if opts.restore_backup {
        if let Some(backup) = latest_backup(&path, agent, &opts.backup_dir)? {
            if !opts.dry_run {
                fs::copy(&backup, &path)
                    .map_err(|err| AppError::Io(format!("failed to restore backup: {err}")))?;
            }
            report.backup_restored = true;
            return Ok(report);
        }
        report.warnings.push("no backup found; removing hooks in place".into());
    }

    let mut root = read_settings(&path)?;
    report.hooks_removed = remove_gryph_hooks(&mut root, layout);
    if !opts.dry_run && !report.hooks_removed.is_empty() {
        write_settings(&path, &root)?;
        info!(agent, removed = report.hooks_removed.len(), "hooks uninstalled");
    }
    Ok(report)
}

/// Inspect which hooks are registered for `agent` under `home`.
///
/// # Errors
///
/// Returns `AppError::Config` if the settings file is not a JSON object.
pub fn hook_status(agent: &str, hook_types: &[&str], target: HookTarget, home: &Path) -> Result<HookStatus> {
    let config_dir = target.config_dir(home);
    let mut status = HookStatus {
        agent: agent.to_owned(),
        detected: config_dir.is_dir(),
        ..HookStatus::default()
    };
    let present = match target {
        HookTarget::Settings { file, layout, .. } => {
            let path = config_dir.join(file);
            status.settings_path = Some(path.display().to_string());
            registered_hooks(&read_settings(&path)?, layout)
        }
        HookTarget::Plugin { plugin_file, .. } => {
            let path = config_dir.join(plugin_file);
            status.settings_path = Some(path.display().to_string());
            if path.exists() {
                hook_types.iter().map(|h| (*h).to_owned()).collect()
            } else {
                Vec::new()
            }
        }
    };
    for hook in hook_types {
        if present.iter().any(|p| p == hook) {
            status.installed.push((*hook).to_owned());
        } else {
            status.missing.push((*hook).to_owned());
        }
    }
    Ok(status)
}

fn read_settings(path: &Path) -> Result<Map<String, Value>> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
        Err(err) => {
            return Err(AppError::Io(format!(
                "failed to read {}: {err}",
                path.display()
            )))
        }
    };
    if raw.trim().is_empty() {
        return Ok(Map::new());
    }
    match serde_json::from_str::<Value>(&raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(AppError::Config(format!(
            "{} is not a JSON object",
            path.display()
        ))),
        Err(err) => Err(AppError::Config(format!(
            "failed to parse {}: {err}",
            path.display()
        ))),
    }
}

fn write_settings(path: &Path, root: &Map<String, Value>) -> Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| AppError::Io("settings path has no parent directory".into()))?;
    fs::create_dir_all(parent)
        .map_err(|err| AppError::Io(format!("failed to create {}: {err}", parent.display())))?;

    let mut data = serde_json::to_string_pretty(root)?;
    data.push('\n');

    let mut tmp = NamedTempFile::new_in(parent)
        .map_err(|err| AppError::Io(format!("failed to create temporary file: {err}")))?;
    tmp.write_all(data.as_bytes())
        .map_err(|err| AppError::Io(format!("failed to write temporary file: {err}")))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(tmp.path(), fs::Permissions::from_mode(0o600))
            .map_err(|err| AppError::Io(format!("failed to set permissions: {err}")))?;
    }
    tmp.persist(path)
        .map_err(|err| AppError::Io(format!("failed to persist {}: {err}", path.display())))?;
    debug!(path = %path.display(), "settings written");
    Ok(())
}

fn backup_name(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| "settings".to_owned(), |n| n.to_string_lossy().into_owned())
}

fn backup_file(path: &Path, agent: &str, backup_dir: &Path) -> Result<PathBuf> {
    let dir = backup_dir.join(agent);
    fs::create_dir_all(&dir)
        .map_err(|err| AppError::Io(format!("failed to create backup directory: {err}")))?;
    let stamp = chrono::Utc::now().format("%Y%m%d%H%M%S");
    let backup = dir.join(format!("{}.backup.{stamp}", backup_name(path)));
    fs::copy(path, &backup).map_err(|err| AppError::Io(format!("failed to back up settings: {err}")))?;
    Ok(backup)
}

fn latest_backup(path: &Path, agent: &str, backup_dir: &Path) -> Result<Option<PathBuf>> {
    let dir = backup_dir.join(agent);
    let prefix = format!("{}.backup.", backup_name(path));
    let entries = match fs::read_dir(&dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(AppError::Io(format!("failed to list backups: {err}"))),
    };
    // Timestamps sort lexically.
    Ok(entries
        .filter_map(std::result::Result::ok)
        .map(|e| e.path())
        .filter(|p| {
            p.file_name()
                .is_some_and(|n| n.to_string_lossy().starts_with(&prefix))
        })
        .max())
}

fn entry_commands(entry: &Value, layout: SettingsLayout) -> Vec<&str> {
    match layout {
        SettingsLayout::MatcherNested => entry
            .get("hooks")
            .and_then(Value::as_array)
            .map(|hooks| {
                hooks
                    .iter()
                    .filter_map(|h| h.get("command").and_then(Value::as_str))
                    .collect()
            })
            .unwrap_or_default(),
        SettingsLayout::Versioned | SettingsLayout::Flat => entry
            .get("command")
            .and_then(Value::as_str)
            .into_iter()
            .collect(),
    }
}

/// Hook types holding at least one gryph command.
fn registered_hooks(root: &Map<String, Value>, layout: SettingsLayout) -> Vec<String> {
    let Some(hooks) = root.get("hooks").and_then(Value::as_object) else {
        return Vec::new();
    };
    hooks
        .iter()
        .filter(|(_, entries)| {
            entries.as_array().is_some_and(|list| {
                list.iter()
                    .any(|e| entry_commands(e, layout).into_iter().any(is_gryph_command))
            })
        })
        .map(|(name, _)| name.clone())
        .collect()
}

/// Strip gryph commands; drop entries and hook types left empty.
fn remove_gryph_hooks(root: &mut Map<String, Value>, layout: SettingsLayout) -> Vec<String> {
    let mut removed = Vec::new();
    let Some(hooks) = root.get_mut("hooks").and_then(Value::as_object_mut) else {
        return removed;
    };
    for (name, entries) in hooks.iter_mut() {
        let Some(list) = entries.as_array_mut() else {
            continue;
        };
        let before = serde_json::to_string(list).unwrap_or_default();
        match layout {
            SettingsLayout::MatcherNested => {
                for entry in list.iter_mut() {
                    if let Some(inner) = entry.get_mut("hooks").and_then(Value::as_array_mut) {
                        inner.retain(|h| {
                            !h.get("command")
                                .and_then(Value::as_str)
                                .is_some_and(is_gryph_command)
                        });
                    }
                }
                list.retain(|entry| {
                    entry
                        .get("hooks")
                        .and_then(Value::as_array)
                        .is_none_or(|inner| !inner.is_empty())
                });
            }
            SettingsLayout::Versioned | SettingsLayout::Flat => {
                list.retain(|entry| {
                    !entry
                        .get("command")
                        .and_then(Value::as_str)
                        .is_some_and(is_gryph_command)
                });
            }
        }
        if serde_json::to_string(list).unwrap_or_default() != before {
            removed.push(name.clone());
        }
    }
    hooks.retain(|_, entries| entries.as_array().is_none_or(|l| !l.is_empty()));
    if hooks.is_empty() && layout != SettingsLayout::Versioned {
        root.remove("hooks");
    }
    removed
}

fn add_gryph_hooks(root: &mut Map<String, Value>, agent: &str, hook_types: &[&str], layout: SettingsLayout) {
    if layout == SettingsLayout::Versioned {
        root.entry("version").or_insert(json!(1));
    }
    let hooks = root
        .entry("hooks")
        .or_insert_with(|| Value::Object(Map::new()));
    if !hooks.is_object() {
        *hooks = Value::Object(Map::new());
    }
    let Some(hooks) = hooks.as_object_mut() else {
        return;
    };
    for hook_type in hook_types {
        let command = hook_command(agent, hook_type);
        let entry = match layout {
            SettingsLayout::MatcherNested => {
                let mut matcher = Map::new();
                if hook_type.contains("Tool") {
                    matcher.insert("matcher".into(), json!("*"));
                }
                matcher.insert(
                    "hooks".into(),
                    json!([{ "type": "command", "command": command }]),
                );
                Value::Object(matcher)
            }
            SettingsLayout::Versioned | SettingsLayout::Flat => json!({ "command": command }),
        };
        let slot = hooks
            .entry((*hook_type).to_owned())
            .or_insert_with(|| Value::Array(Vec::new()));
        if let Some(list) = slot.as_array_mut() {
            list.push(entry);
        } else {
            *slot = Value::Array(vec![entry]);
        }
    }
}
