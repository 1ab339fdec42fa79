#![forbid(unsafe_code)]

//! `gryph`: audit trail for AI coding agents.
//!
//! The hidden `_hook` subcommand is what agents invoke; everything else is
//! the operator surface over the local store.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use chrono::{DateTime, Duration, Local, NaiveDate, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::{debug, info};
use tracing_subscriber::{fmt, EnvFilter};

use gryph::agent::{Adapter, InstallOptions, Registry};
use gryph::audit::{self, SelfAuditWriter};
use gryph::config::{self, GlobalConfig};
use gryph::models::event::{ActionType, Event, ResultStatus};
use gryph::models::filter::{EventFilter, SelfAuditFilter, SessionFilter};
use gryph::models::self_audit::{SelfAudit, SelfAuditAction};
use gryph::models::session::Session;
use gryph::persistence::retention::{self, RetentionPolicy};
use gryph::persistence::Store;
use gryph::{export, hook, AppError, Result};

const SUMMARY_WIDTH: usize = 72;

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
    Jsonl,
}

#[derive(Debug, Parser)]
#[command(
    name = "gryph",
    about = "Audit trail for AI coding agents",
    version,
    long_about = None
)]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Diagnostic log format on stderr (text or json).
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Entry point invoked by agent hooks.
    #[command(name = "_hook", hide = true)]
    Hook {
        /// Agent machine name.
        agent: String,
        /// Hook type as named by the agent.
        hook_type: String,
    },

    /// Register gryph's hooks with detected agents.
    Install {
        /// Only this agent.
        #[arg(long)]
        agent: Option<String>,
        /// Show what would change without writing.
        #[arg(long)]
        dry_run: bool,
        /// Install even if undetected or already installed.
        #[arg(long)]
        force: bool,
        /// Skip the settings-file backup.
        #[arg(long)]
        no_backup: bool,
    },

    /// Remove gryph's hooks.
    Uninstall {
        /// Only this agent.
        #[arg(long)]
        agent: Option<String>,
        /// Show what would change without writing.
        #[arg(long)]
        dry_run: bool,
        /// Restore the newest settings backup instead of editing in place.
        #[arg(long)]
        restore_backup: bool,
    },

    /// Show which agents are detected and hooked.
    Status {
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },

    /// Recent events, newest first.
    Logs(EventArgs),

    /// Search events.
    Query(QueryArgs),

    /// List sessions, newest first.
    Sessions {
        /// Only this agent.
        #[arg(long)]
        agent: Option<String>,
        /// Only sessions without a recorded end.
        #[arg(long)]
        active: bool,
        /// Maximum sessions shown.
        #[arg(long, default_value_t = 20)]
        limit: i64,
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },

    /// One session and its events.
    Session {
        /// Session id or unique prefix.
        id: String,
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },

    /// One event in full, including its diff.
    Event {
        /// Event id or unique prefix.
        id: String,
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },

    /// Export events as JSON Lines, oldest first.
    Export {
        /// Events at or after (RFC 3339, YYYY-MM-DD, or an age such as 7d).
        #[arg(long, value_parser = parse_time)]
        since: Option<DateTime<Utc>>,
        /// Events before.
        #[arg(long, value_parser = parse_time)]
        until: Option<DateTime<Utc>>,
        /// Only these agents.
        #[arg(long = "agent")]
        agents: Vec<String>,
        /// Write to a file instead of stdout.
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Inspect or apply the retention policy.
    Retention {
        #[command(subcommand)]
        command: RetentionCommand,
    },

    /// gryph's own lifecycle log.
    SelfLog {
        /// Records at or after.
        #[arg(long, value_parser = parse_time)]
        since: Option<DateTime<Utc>>,
        /// Only this action (install, uninstall, config_change, export, ...).
        #[arg(long, value_parser = parse_self_audit_action)]
        action: Option<SelfAuditAction>,
        /// Maximum records shown.
        #[arg(long, default_value_t = 50)]
        limit: i64,
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },

    /// Show or change configuration.
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /// Store location and statistics.
    Info {
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
}

#[derive(Debug, Clone, Copy, Subcommand)]
enum RetentionCommand {
    /// Current policy and how many events it would delete.
    Status,
    /// Delete events older than the retention period.
    Cleanup {
        /// Count without deleting.
        #[arg(long)]
        dry_run: bool,
    },
}

#[derive(Debug, Subcommand)]
enum ConfigCommand {
    /// Print the effective configuration as YAML.
    Show,
    /// Print one dotted key, e.g. `logging.level`.
    Get { key: String },
    /// Set one dotted key and save the configuration file.
    Set { key: String, value: String },
}

#[derive(Debug, Args)]
struct EventArgs {
    /// Only events since local midnight.
    #[arg(long, conflicts_with = "since")]
    today: bool,
    /// Events at or after (RFC 3339, YYYY-MM-DD, or an age such as 2h).
    #[arg(long, value_parser = parse_time)]
    since: Option<DateTime<Utc>>,
    /// Events before.
    #[arg(long, value_parser = parse_time)]
    until: Option<DateTime<Utc>>,
    /// Only these agents.
    #[arg(long = "agent")]
    agents: Vec<String>,
    /// Only this session (id or unique prefix).
    #[arg(long)]
    session: Option<String>,
    /// Only these action types.
    #[arg(long = "action", value_parser = parse_action)]
    actions: Vec<ActionType>,
    /// Only these result statuses.
    #[arg(long = "status", value_parser = parse_status)]
    statuses: Vec<ResultStatus>,
    /// Maximum events shown; 0 for all.
    #[arg(long, default_value_t = 100)]
    limit: i64,
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,
}

#[derive(Debug, Args)]
struct QueryArgs {
    #[command(flatten)]
    events: EventArgs,
    /// Glob over file paths.
    #[arg(long = "file")]
    file_glob: Option<String>,
    /// Glob over command lines.
    #[arg(long = "command")]
    command_glob: Option<String>,
    /// Events skipped before the first shown.
    #[arg(long, default_value_t = 0)]
    offset: i64,
    /// Print only the number of matching events.
    #[arg(long)]
    count: bool,
}

fn main() -> ExitCode {
    let args = Cli::parse();
    let default_level = if matches!(args.command, Command::Hook { .. }) {
        "warn"
    } else {
        "info"
    };
    if let Err(err) = init_tracing(args.log_format, default_level) {
        eprintln!("gryph: {err}");
    }

    if let Command::Hook { agent, hook_type } = &args.command {
        let code = run_hook(args.config.as_deref(), agent, hook_type);
        return ExitCode::from(u8::try_from(code).unwrap_or(1));
    }

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("gryph: failed to build tokio runtime: {err}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(args)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("gryph: {err}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(log_format: LogFormat, default_level: &str) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let builder = fmt().with_env_filter(env_filter).with_writer(io::stderr);
    match log_format {
        LogFormat::Text => builder
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to initialize tracing: {err}"))),
        LogFormat::Json => builder
            .json()
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to initialize tracing: {err}"))),
    }
}

/// Hook path: always answers the agent, never with a non-protocol code.
fn run_hook(config_path: Option<&Path>, agent: &str, hook_type: &str) -> i32 {
    let outcome = GlobalConfig::load(config_path)
        .and_then(|config| {
            hook::run_standalone(
                Arc::new(config),
                agent,
                hook_type,
                tokio::io::stdin(),
                hook::HOOK_TIMEOUT,
            )
        })
        .unwrap_or_else(|err| hook::HookOutcome::from_error(&err));
    if let Some(body) = &outcome.stdout {
        println!("{body}");
    }
    if !outcome.stderr.is_empty() {
        eprintln!("{}", outcome.stderr);
    }
    outcome.exit_code
}

async fn run(args: Cli) -> Result<()> {
    let config = GlobalConfig::load(args.config.as_deref())?;
    debug!(db = %config.db_path().display(), "configuration loaded");

    match args.command {
        Command::Hook { .. } => Ok(()),
        Command::Install { agent, dry_run, force, no_backup } => {
            let mut opts = install_options()?;
            opts.dry_run = dry_run;
            opts.force = force;
            opts.backup = !no_backup;
            install(&config, agent.as_deref(), &opts).await
        }
        Command::Uninstall { agent, dry_run, restore_backup } => {
            let mut opts = install_options()?;
            opts.dry_run = dry_run;
            opts.restore_backup = restore_backup;
            uninstall(&config, agent.as_deref(), &opts).await
        }
        Command::Status { format } => status(&config, format).await,
        Command::Logs(event_args) => {
            let store = open_store(&config).await?;
            let filter = event_args.to_filter(&store).await?;
            let events = store.events.query(&filter).await?;
            render_events(&events, event_args.format)
        }
        Command::Query(query_args) => query(&config, &query_args).await,
        Command::Sessions { agent, active, limit, format } => {
            let store = open_store(&config).await?;
            let filter = SessionFilter {
                agent,
                active_only: active,
                limit,
                ..SessionFilter::default()
            };
            let sessions = store.sessions.query(&filter).await?;
            render_sessions(&sessions, format)
        }
        Command::Session { id, format } => show_session(&config, &id, format).await,
        Command::Event { id, format } => {
            let store = open_store(&config).await?;
            let event = store.events.get_by_prefix(&id).await?;
            render_event_detail(&event, format)
        }
        Command::Export { since, until, agents, output } => {
            let filter = EventFilter {
                since,
                until,
                agents,
                limit: 0,
                ..EventFilter::default()
            };
            export_events(&config, &filter, output.as_deref()).await
        }
        Command::Retention { command } => retention_command(&config, command).await,
        Command::SelfLog { since, action, limit, format } => {
            let store = open_store(&config).await?;
            let records = store
                .self_audits
                .query(&SelfAuditFilter { since, action, limit })
                .await?;
            render_self_audits(&records, format)
        }
        Command::Config { command } => config_command(&config, args.config.as_deref(), command).await,
        Command::Info { format } => show_info(&config, args.config.as_deref(), format).await,
    }
}

impl EventArgs {
    async fn to_filter(&self, store: &Store) -> Result<EventFilter> {
        let mut filter = if self.today {
            EventFilter::today()
        } else {
            EventFilter::new()
        };
        if let Some(since) = self.since {
            filter = filter.with_since(since);
        }
        if let Some(until) = self.until {
            filter = filter.with_until(until);
        }
        if let Some(prefix) = &self.session {
            let session = store.sessions.get_by_prefix(prefix).await?;
            filter = filter.with_session(session.id);
        }
        Ok(filter
            .with_agents(self.agents.clone())
            .with_actions(self.actions.clone())
            .with_statuses(self.statuses.clone())
            .with_limit(self.limit))
    }
}

// ── Commands ────────────────────────────────────────────

fn install_options() -> Result<InstallOptions> {
    let home = dirs::home_dir()
        .ok_or_else(|| AppError::Config("cannot determine home directory".into()))?;
    Ok(InstallOptions::new(home, config::backups_dir()))
}

/// Adapters named by `--agent`, or every registered adapter.
fn select_adapters(registry: &Registry, agent: Option<&str>) -> Result<Vec<Arc<dyn Adapter>>> {
    match agent {
        Some(name) => registry
            .get(name)
            .map(|a| vec![a])
            .ok_or_else(|| AppError::UnknownAgent(name.to_owned())),
        None => Ok(registry.all()),
    }
}

async fn install(config: &GlobalConfig, agent: Option<&str>, opts: &InstallOptions) -> Result<()> {
    let registry = Registry::with_defaults();
    let adapters = select_adapters(&registry, agent)?;
    let store = open_store(config).await?;
    let writer = SelfAuditWriter::new(store.self_audits.clone());

    for adapter in adapters {
        if agent.is_none() && !opts.force && !adapter.detect(&opts.home).installed {
            debug!(agent = adapter.name(), "agent not detected, skipping");
            continue;
        }
        match adapter.install(opts) {
            Ok(report) => {
                let verb = if report.dry_run { "would install" } else { "installed" };
                if report.already_installed {
                    println!("{}: already installed", adapter.display_name());
                } else if !report.hooks_installed.is_empty() {
                    println!(
                        "{}: {verb} {} hooks in {}",
                        adapter.display_name(),
                        report.hooks_installed.len(),
                        report.settings_path.as_deref().unwrap_or("-")
                    );
                }
                if let Some(backup) = &report.backup_path {
                    println!("  backup: {backup}");
                }
                for warning in &report.warnings {
                    println!("  note: {warning}");
                }
                if !report.dry_run {
                    writer.write_or_warn(&audit::install_record(&report)).await;
                }
            }
            Err(err) => {
                eprintln!("{}: {err}", adapter.display_name());
                writer
                    .write_or_warn(&audit::failure_record(
                        SelfAuditAction::Install,
                        Some(adapter.name()),
                        err.to_string(),
                    ))
                    .await;
            }
        }
    }
    store.close().await;
    Ok(())
}

async fn uninstall(config: &GlobalConfig, agent: Option<&str>, opts: &InstallOptions) -> Result<()> {
    let registry = Registry::with_defaults();
    let adapters = select_adapters(&registry, agent)?;
    let store = open_store(config).await?;
    let writer = SelfAuditWriter::new(store.self_audits.clone());

    for adapter in adapters {
        match adapter.uninstall(opts) {
            Ok(report) => {
                if report.backup_restored {
                    println!("{}: settings restored from backup", adapter.display_name());
                } else if !report.hooks_removed.is_empty() {
                    println!(
                        "{}: removed {}",
                        adapter.display_name(),
                        report.hooks_removed.join(", ")
                    );
                }
                if agent.is_some() {
                    for warning in &report.warnings {
                        println!("  note: {warning}");
                    }
                }
                if !report.dry_run {
                    writer.write_or_warn(&audit::uninstall_record(&report)).await;
                }
            }
            Err(err) => {
                eprintln!("{}: {err}", adapter.display_name());
                writer
                    .write_or_warn(&audit::failure_record(
                        SelfAuditAction::Uninstall,
                        Some(adapter.name()),
                        err.to_string(),
                    ))
                    .await;
            }
        }
    }
    store.close().await;
    Ok(())
}

async fn status(config: &GlobalConfig, format: OutputFormat) -> Result<()> {
    let opts = install_options()?;
    let registry = Registry::with_defaults();
    let mut statuses = Vec::new();
    for adapter in registry.all() {
        statuses.push(adapter.status(&opts.home)?);
    }

    if format != OutputFormat::Table {
        return print_json(&statuses, format);
    }
    println!("{:<12} {:<9} {:<10} PATH", "AGENT", "DETECTED", "HOOKS");
    for s in &statuses {
        let hooks = format!("{}/{}", s.installed.len(), s.installed.len() + s.missing.len());
        println!(
            "{:<12} {:<9} {:<10} {}",
            s.agent,
            if s.detected { "yes" } else { "no" },
            hooks,
            s.settings_path.as_deref().unwrap_or("-")
        );
    }
    let store = open_store(config).await?;
    let info = store.database_info().await?;
    println!();
    println!(
        "database: {} ({} events, {} sessions)",
        info.path.as_deref().unwrap_or("(memory)"),
        info.event_count,
        info.session_count
    );
    Ok(())
}

async fn query(config: &GlobalConfig, args: &QueryArgs) -> Result<()> {
    let store = open_store(config).await?;
    let mut filter = args.events.to_filter(&store).await?.with_offset(args.offset);
    if let Some(pattern) = &args.file_glob {
        filter = filter.with_file_pattern(pattern);
    }
    if let Some(pattern) = &args.command_glob {
        filter = filter.with_command_pattern(pattern);
    }

    if args.count {
        let total = if filter.has_payload_predicates() {
            let unbounded = filter.clone().with_limit(0).with_offset(0);
            i64::try_from(store.events.query(&unbounded).await?.len()).unwrap_or(i64::MAX)
        } else {
            store.events.count(&filter).await?
        };
        println!("{total}");
        return Ok(());
    }
    let events = store.events.query(&filter).await?;
    render_events(&events, args.events.format)
}

async fn show_session(config: &GlobalConfig, id: &str, format: OutputFormat) -> Result<()> {
    let store = open_store(config).await?;
    let session = store.sessions.get_by_prefix(id).await?;
    let events = store.events.get_by_session(session.id).await?;

    match format {
        OutputFormat::Table => {
            println!("session:    {}", session.id);
            println!("agent:      {}", session.agent_name);
            if let Some(agent_session) = &session.agent_session_id {
                println!("agent id:   {agent_session}");
            }
            println!("started:    {}", local_time(session.started_at));
            println!("ended:      {}", opt_time(session.ended_at));
            println!("duration:   {}", human_duration(session.duration()));
            if let Some(dir) = &session.working_directory {
                println!("directory:  {dir}");
            }
            println!(
                "actions:    {} ({} reads, {} writes, {} commands, {} errors)",
                session.total_actions,
                session.files_read,
                session.files_written,
                session.commands_executed,
                session.errors
            );
            println!();
            render_events(&events, OutputFormat::Table)
        }
        OutputFormat::Json | OutputFormat::Jsonl => {
            #[derive(Serialize)]
            struct SessionView<'a> {
                session: &'a Session,
                events: &'a [Event],
            }
            print_json(&SessionView { session: &session, events: &events }, format)
        }
    }
}

async fn show_info(config: &GlobalConfig, explicit_path: Option<&Path>, format: OutputFormat) -> Result<()> {
    let store = open_store(config).await?;
    let info = store.database_info().await?;
    store.close().await;
    if format != OutputFormat::Table {
        return print_json(&info, format);
    }
    println!("version:       {}", env!("CARGO_PKG_VERSION"));
    println!("config:        {}", config_path(explicit_path).display());
    println!("database:      {}", info.path.as_deref().unwrap_or("(memory)"));
    println!("size:          {} bytes", info.size_bytes.unwrap_or(0));
    println!("events:        {}", info.event_count);
    println!("sessions:      {}", info.session_count);
    println!("self-audits:   {}", info.self_audit_count);
    println!("oldest event:  {}", opt_time(info.oldest_event));
    println!("newest event:  {}", opt_time(info.newest_event));
    Ok(())
}

async fn export_events(config: &GlobalConfig, filter: &EventFilter, output: Option<&Path>) -> Result<()> {
    let store = open_store(config).await?;
    let written = match output {
        Some(path) => {
            let file = File::create(path)
                .map_err(|err| AppError::Io(format!("cannot create {}: {err}", path.display())))?;
            let mut out = BufWriter::new(file);
            let display = path.display().to_string();
            export::export_jsonl(&store, filter, &mut out, Some(&display)).await?
        }
        None => {
            let mut out = io::stdout().lock();
            export::export_jsonl(&store, filter, &mut out, None).await?
        }
    };
    if let Some(path) = output {
        info!(events = written, path = %path.display(), "events exported");
    }
    store.close().await;
    Ok(())
}

async fn retention_command(config: &GlobalConfig, command: RetentionCommand) -> Result<()> {
    let store = open_store(config).await?;
    let policy = RetentionPolicy::new(config.storage.retention_days);
    let now = Utc::now();

    match command {
        RetentionCommand::Status => {
            println!("retention days: {}", policy.days);
            if let Some(cutoff) = policy.cutoff_time(now) {
                let eligible = store.events.count_before(cutoff).await?;
                println!("cutoff:         {}", local_time(cutoff));
                println!("eligible:       {eligible} events");
            } else {
                println!("retention disabled; events are kept forever");
            }
            let last = store.self_audits.latest(SelfAuditAction::RetentionCleanup).await?;
            println!("last cleanup:   {}", opt_time(last.map(|r| r.timestamp)));
        }
        RetentionCommand::Cleanup { dry_run } => {
            let report = retention::run_cleanup(&store, policy, now, dry_run).await?;
            if !policy.is_enabled() {
                println!("retention disabled; nothing deleted");
            } else if report.dry_run {
                println!("would delete {} events", report.events_deleted);
            } else {
                println!("deleted {} events", report.events_deleted);
                println!("oldest remaining: {}", opt_time(report.oldest_remaining));
            }
        }
    }
    store.close().await;
    Ok(())
}

async fn config_command(
    config: &GlobalConfig,
    explicit_path: Option<&Path>,
    command: ConfigCommand,
) -> Result<()> {
    match command {
        ConfigCommand::Show => {
            print!("{}", config.to_yaml_string()?);
            Ok(())
        }
        ConfigCommand::Get { key } => {
            println!("{}", config.get_key(&key)?);
            Ok(())
        }
        ConfigCommand::Set { key, value } => {
            let path = config_path(explicit_path);
            // Env overrides must not leak into the saved file.
            let on_disk = if path.exists() {
                GlobalConfig::load_from_path(&path)?
            } else {
                GlobalConfig::default()
            };
            let old_value = on_disk.get_key(&key).ok();
            let updated = on_disk.with_key(&key, &value)?;
            updated.save_to_path(&path)?;
            let new_value = updated.get_key(&key)?;
            info!(%key, path = %path.display(), "configuration updated");

            let store = open_store(&updated).await?;
            SelfAuditWriter::new(store.self_audits.clone())
                .write_or_warn(&audit::config_change_record(&key, old_value, &new_value))
                .await;
            store.close().await;
            println!("{key} = {new_value}");
            Ok(())
        }
    }
}

// ── Helpers ─────────────────────────────────────────────

async fn open_store(config: &GlobalConfig) -> Result<Store> {
    Store::open(&config.db_path()).await
}

fn config_path(explicit: Option<&Path>) -> PathBuf {
    explicit.map_or_else(config::config_file_path, Path::to_path_buf)
}

fn parse_time(raw: &str) -> std::result::Result<DateTime<Utc>, String> {
    parse_time_at(raw, Utc::now())
}

/// RFC 3339, a local `YYYY-MM-DD` date, or an age like `30m`, `2h`, `7d`, `1w`.
fn parse_time_at(raw: &str, now: DateTime<Utc>) -> std::result::Result<DateTime<Utc>, String> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date
            .and_hms_opt(0, 0, 0)
            .and_then(|naive| naive.and_local_timezone(Local).earliest())
            .map(|local| local.with_timezone(&Utc))
            .ok_or_else(|| format!("invalid date: {raw}"));
    }
    let split = raw.len().saturating_sub(1);
    let (amount, unit) = raw.split_at(split);
    let amount: i64 = amount
        .parse()
        .map_err(|_| format!("expected RFC 3339, YYYY-MM-DD or an age like 2h, got {raw:?}"))?;
    let age = match unit {
        "s" => Duration::seconds(amount),
        "m" => Duration::minutes(amount),
        "h" => Duration::hours(amount),
        "d" => Duration::days(amount),
        "w" => Duration::weeks(amount),
        other => return Err(format!("unknown age unit {other:?} in {raw:?}")),
    };
    Ok(now - age)
}

fn parse_action(raw: &str) -> std::result::Result<ActionType, String> {
    raw.parse().map_err(|err: AppError| err.to_string())
}

fn parse_status(raw: &str) -> std::result::Result<ResultStatus, String> {
    raw.parse().map_err(|err: AppError| err.to_string())
}

fn parse_self_audit_action(raw: &str) -> std::result::Result<SelfAuditAction, String> {
    raw.parse().map_err(|err: AppError| err.to_string())
}

// ── Rendering ───────────────────────────────────────────

fn print_json<T: Serialize + ?Sized>(value: &T, format: OutputFormat) -> Result<()> {
    let text = if format == OutputFormat::Jsonl {
        serde_json::to_string(value)?
    } else {
        serde_json::to_string_pretty(value)?
    };
    println!("{text}");
    Ok(())
}

fn print_lines<T: Serialize>(items: &[T]) -> Result<()> {
    let mut out = io::stdout().lock();
    for item in items {
        let line = serde_json::to_string(item)?;
        writeln!(out, "{line}")?;
    }
    Ok(())
}

fn render_events(events: &[Event], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(events, format),
        OutputFormat::Jsonl => print_lines(events),
        OutputFormat::Table => {
            if events.is_empty() {
                println!("no events");
                return Ok(());
            }
            println!(
                "{:<19}  {:<11} {:<12} {:<8} SUMMARY",
                "TIME", "AGENT", "ACTION", "STATUS"
            );
            for event in events {
                println!(
                    "{:<19}  {:<11} {:<12} {:<8} {}",
                    local_time(event.timestamp),
                    event.agent_name,
                    event.action_type.as_str(),
                    event.result_status.as_str(),
                    truncate(&event_summary(event), SUMMARY_WIDTH)
                );
            }
            Ok(())
        }
    }
}

fn render_event_detail(event: &Event, format: OutputFormat) -> Result<()> {
    if format != OutputFormat::Table {
        return print_json(&event.to_export_value()?, format);
    }
    println!("event:      {}", event.id);
    println!("session:    {} (#{})", event.session_id, event.sequence);
    println!("time:       {}", local_time(event.timestamp));
    println!("agent:      {}", event.agent_name);
    println!("action:     {} ({})", event.action_type, event.tool_name);
    println!("status:     {}", event.result_status);
    if let Some(message) = &event.error_message {
        println!("error:      {message}");
    }
    if let Some(dir) = &event.working_directory {
        println!("directory:  {dir}");
    }
    if event.is_sensitive {
        println!("sensitive:  yes");
    }
    if let Some(payload) = &event.payload {
        println!();
        println!("{}", serde_json::to_string_pretty(payload)?);
    }
    if let Some(diff) = &event.diff_content {
        println!();
        print!("{diff}");
    }
    Ok(())
}

fn render_sessions(sessions: &[Session], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(sessions, format),
        OutputFormat::Jsonl => print_lines(sessions),
        OutputFormat::Table => {
            if sessions.is_empty() {
                println!("no sessions");
                return Ok(());
            }
            println!(
                "{:<8}  {:<11} {:<19}  {:>8} {:>7}  PROJECT",
                "ID", "AGENT", "STARTED", "DURATION", "ACTIONS"
            );
            for session in sessions {
                let id = session.id.to_string();
                println!(
                    "{:<8}  {:<11} {:<19}  {:>8} {:>7}  {}{}",
                    &id[..8],
                    session.agent_name,
                    local_time(session.started_at),
                    human_duration(session.duration()),
                    session.total_actions,
                    session.project_name.as_deref().unwrap_or("-"),
                    if session.is_active() { " (active)" } else { "" }
                );
            }
            Ok(())
        }
    }
}

fn render_self_audits(records: &[SelfAudit], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(records, format),
        OutputFormat::Jsonl => print_lines(records),
        OutputFormat::Table => {
            if records.is_empty() {
                println!("no self-audit records");
                return Ok(());
            }
            println!("{:<19}  {:<18} {:<8} {:<11} DETAIL", "TIME", "ACTION", "RESULT", "AGENT");
            for record in records {
                let detail = match (&record.error_message, &record.details) {
                    (Some(message), _) => message.clone(),
                    (None, Some(details)) => details.to_string(),
                    (None, None) => String::new(),
                };
                println!(
                    "{:<19}  {:<18} {:<8} {:<11} {}",
                    local_time(record.timestamp),
                    record.action.as_str(),
                    record.result.as_str(),
                    record.agent_name.as_deref().unwrap_or("-"),
                    truncate(&detail, SUMMARY_WIDTH)
                );
            }
            Ok(())
        }
    }
}

fn event_summary(event: &Event) -> String {
    if let Some(path) = event.file_path() {
        return path;
    }
    if let Some(command) = event.command() {
        return command;
    }
    match &event.error_message {
        Some(message) => format!("{}: {message}", event.tool_name),
        None => event.tool_name.clone(),
    }
}

fn truncate(text: &str, width: usize) -> String {
    let flat = text.replace('\n', " ");
    if flat.chars().count() <= width {
        return flat;
    }
    let mut cut: String = flat.chars().take(width.saturating_sub(3)).collect();
    cut.push_str("...");
    cut
}

fn local_time(ts: DateTime<Utc>) -> String {
    ts.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string()
}

fn opt_time(ts: Option<DateTime<Utc>>) -> String {
    ts.map_or_else(|| "-".to_owned(), local_time)
}

fn human_duration(d: Duration) -> String {
    let secs = d.num_seconds().max(0);
    match secs {
        s if s < 60 => format!("{s}s"),
        s if s < 3600 => format!("{}m{:02}s", s / 60, s % 60),
        s => format!("{}h{:02}m", s / 3600, (s % 3600) / 60),
    }
}
