//! Security checks consulted before a hook answers the agent.
//!
//! The shipped check allows everything. A check that returns
//! [`HookResponse::Block`] makes the hook exit with code 2 and the agent
//! refuses the tool call.

use crate::agent::HookResponse;
use crate::models::event::Event;

/// Decides whether the action described by an event may proceed.
pub trait SecurityCheck: Send + Sync {
    /// Decision for `event`. Never [`HookResponse::Error`].
    fn check(&self, event: &Event) -> HookResponse;
}

/// Allows every action.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl SecurityCheck for AllowAll {
    fn check(&self, _event: &Event) -> HookResponse {
        HookResponse::Allow
    }
}

/// Blocks when any check blocks; the first blocking reason wins.
#[must_use]
pub fn evaluate(checks: &[Box<dyn SecurityCheck>], event: &Event) -> HookResponse {
    checks
        .iter()
        .map(|c| c.check(event))
        .find(|r| matches!(r, HookResponse::Block(_)))
        .unwrap_or(HookResponse::Allow)
}
