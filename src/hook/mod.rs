//! Hook dispatcher: `gryph _hook <agent> <hook-type>`.
//!
//! Exit codes follow the agent hook protocol: `0` allow, `1` internal
//! error (the agent proceeds), `2` block. Nothing but a deliberate block
//! ever yields `2`, and a timeout yields `0`.

pub mod check;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, error, info_span, warn, Instrument};

use crate::agent::filter::apply_logging_level;
use crate::agent::{Adapter, HookResponse, ParseContext, Registry, ResponseMode};
use crate::models::event::{ActionType, ResultStatus};
use crate::persistence::retention::{self, RetentionPolicy};
use crate::persistence::Store;
use crate::privacy::PrivacyChecker;
use crate::{AppError, GlobalConfig, Result};

use check::{AllowAll, SecurityCheck};

/// Largest hook payload read from standard input.
pub const MAX_INPUT_BYTES: u64 = 64 * 1024;

/// Upper bound on one hook invocation.
pub const HOOK_TIMEOUT: Duration = Duration::from_secs(30);

/// What the hook process reports back to the agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookOutcome {
    /// Process exit code.
    pub exit_code: i32,
    /// Response body for agents that read JSON from stdout.
    pub stdout: Option<String>,
    /// Human-readable reason, empty on allow.
    pub stderr: String,
}

impl HookOutcome {
    /// Outcome for `response` rendered in the agent's `mode`.
    #[must_use]
    pub fn from_response(response: &HookResponse, mode: ResponseMode) -> Self {
        Self {
            exit_code: response.exit_code(),
            stdout: response.to_json(mode),
            stderr: response.stderr().to_owned(),
        }
    }

    /// Outcome for a failure raised before an adapter was resolved.
    #[must_use]
    pub fn from_error(err: &AppError) -> Self {
        Self {
            exit_code: err.exit_code(),
            stdout: None,
            stderr: format!("gryph: {err}"),
        }
    }

    fn failed(err: &AppError, mode: ResponseMode) -> Self {
        let mut outcome = Self::from_error(err);
        outcome.stdout = HookResponse::Error(err.to_string()).to_json(mode);
        outcome
    }
}

/// Turns one hook payload into a stored event and a response.
pub struct Dispatcher {
    registry: Arc<Registry>,
    config: Arc<GlobalConfig>,
    privacy: Arc<PrivacyChecker>,
    store: Store,
    checks: Vec<Box<dyn SecurityCheck>>,
}

impl Dispatcher {
    /// Dispatcher with the allow-all security check.
    #[must_use]
    pub fn new(
        registry: Arc<Registry>,
        config: Arc<GlobalConfig>,
        privacy: Arc<PrivacyChecker>,
        store: Store,
    ) -> Self {
        Self {
            registry,
            config,
            privacy,
            store,
            checks: vec![Box::new(AllowAll)],
        }
    }

    /// Add a security check consulted on every event.
    #[must_use]
    pub fn with_check(mut self, check: Box<dyn SecurityCheck>) -> Self {
        self.checks.push(check);
        self
    }

    /// Process one payload already read from standard input.
    pub async fn handle(&self, agent_name: &str, hook_type: &str, raw: &[u8]) -> HookOutcome {
        let span = info_span!("hook", agent = %agent_name, hook_type = %hook_type);
        self.dispatch(agent_name, hook_type, raw)
            .instrument(span)
            .await
    }

    async fn dispatch(&self, agent_name: &str, hook_type: &str, raw: &[u8]) -> HookOutcome {
        // ── 1. Resolve the adapter ───────────────────────────
        let Some(adapter) = self.registry.get(agent_name) else {
            let err = AppError::UnknownAgent(agent_name.to_owned());
            warn!(%err, "hook for unregistered agent");
            return HookOutcome::from_error(&err);
        };
        let mode = adapter.response_mode(hook_type);

        if !self.config.agent_enabled(agent_name) {
            debug!("agent disabled, event not recorded");
            return HookOutcome::from_response(&HookResponse::Allow, mode);
        }

        match self.record(adapter.as_ref(), hook_type, raw).await {
            Ok(response) => HookOutcome::from_response(&response, mode),
            Err(err) => {
                error!(%err, "hook event not recorded");
                HookOutcome::failed(&err, mode)
            }
        }
    }

    async fn record(
        &self,
        adapter: &dyn Adapter,
        hook_type: &str,
        raw: &[u8],
    ) -> Result<HookResponse> {
        let agent_name = adapter.name();
        let level = self.config.effective_level(agent_name);
        let ctx = ParseContext::new(Arc::clone(&self.privacy), level, self.config.content_hash());

        // ── 2. Parse and filter ──────────────────────────────
        let mut event = adapter.parse_event(hook_type, raw, &ctx)?;
        apply_logging_level(&mut event, level);

        // ── 3. Security checks ───────────────────────────────
        let response = check::evaluate(&self.checks, &event);
        if matches!(response, HookResponse::Block(_)) {
            event.result_status = ResultStatus::Blocked;
        }

        // ── 4. Persist ───────────────────────────────────────
        match self.store.events.save(&mut event).await {
            Ok(()) => debug!(
                event_id = %event.id,
                session_id = %event.session_id,
                sequence = event.sequence,
                action = %event.action_type,
                "event recorded"
            ),
            Err(err) if matches!(response, HookResponse::Block(_)) => {
                error!(%err, "blocked event not recorded");
                return Ok(response);
            }
            Err(err) => return Err(err),
        }

        if event.action_type == ActionType::SessionStart {
            self.maybe_cleanup().await;
        }
        Ok(response)
    }

    async fn maybe_cleanup(&self) {
        let policy = RetentionPolicy::new(self.config.storage.retention_days);
        match retention::cleanup_if_due(&self.store, policy, Utc::now()).await {
            Ok(Some(report)) => debug!(deleted = report.events_deleted, "retention cleanup ran"),
            Ok(None) => {}
            Err(err) => warn!(%err, "retention cleanup failed"),
        }
    }
}

/// Read at most `limit` bytes of hook input.
///
/// # Errors
///
/// Returns `AppError::Io` if the read fails.
pub async fn read_input<R: AsyncRead + Unpin>(input: R, limit: u64) -> Result<Vec<u8>> {
    let mut raw = Vec::new();
    input.take(limit).read_to_end(&mut raw).await?;
    Ok(raw)
}

/// Run a complete hook invocation under [`HOOK_TIMEOUT`].
///
/// Opens the store, reads `input` and dispatches. Any failure maps to exit
/// code `1`; running out of time maps to `0`.
pub async fn run<R: AsyncRead + Unpin>(
    config: Arc<GlobalConfig>,
    agent_name: &str,
    hook_type: &str,
    input: R,
) -> HookOutcome {
    run_with_timeout(config, agent_name, hook_type, input, HOOK_TIMEOUT).await
}

/// [`run_with_timeout`] on a dedicated runtime, for the `_hook` binary path.
///
/// Blocking reads still parked on the runtime's blocking pool (standard
/// input held open by the agent) are abandoned at shutdown, so this returns
/// once `budget` has elapsed.
///
/// # Errors
///
/// Returns `AppError::Io` if the runtime cannot be built.
pub fn run_standalone<R: AsyncRead + Unpin>(
    config: Arc<GlobalConfig>,
    agent_name: &str,
    hook_type: &str,
    input: R,
    budget: Duration,
) -> Result<HookOutcome> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let outcome = runtime.block_on(run_with_timeout(config, agent_name, hook_type, input, budget));
    runtime.shutdown_background();
    Ok(outcome)
}

/// [`run`] with an explicit time budget.
pub async fn run_with_timeout<R: AsyncRead + Unpin>(
    config: Arc<GlobalConfig>,
    agent_name: &str,
    hook_type: &str,
    input: R,
    budget: Duration,
) -> HookOutcome {
    let invocation = async {
        let privacy = Arc::new(config.privacy_checker()?);
        let raw = read_input(input, MAX_INPUT_BYTES).await?;
        let store = Store::open(&config.db_path()).await?;
        let dispatcher =
            Dispatcher::new(Arc::new(Registry::with_defaults()), config, privacy, store.clone());
        let outcome = dispatcher.handle(agent_name, hook_type, &raw).await;
        store.close().await;
        Ok::<_, AppError>(outcome)
    };

    match tokio::time::timeout(budget, invocation).await {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(err)) => {
            error!(%err, agent = %agent_name, "hook failed");
            HookOutcome::from_error(&err)
        }
        Err(_) => {
            let err = AppError::Timeout(format!("hook exceeded {}s", budget.as_secs()));
            warn!(%err, agent = %agent_name, "hook timed out, allowing");
            HookOutcome::from_error(&err)
        }
    }
}
