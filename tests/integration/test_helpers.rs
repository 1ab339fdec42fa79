//! Shared fixtures for integration tests.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use gryph::agent::Registry;
use gryph::config::{AgentConfig, LoggingLevel};
use gryph::hook::Dispatcher;
use gryph::models::event::{ActionType, Event};
use gryph::models::payload::FileWritePayload;
use gryph::persistence::Store;
use gryph::GlobalConfig;
use uuid::Uuid;

/// Default configuration at `level`.
pub fn config_at(level: LoggingLevel) -> GlobalConfig {
    let mut config = GlobalConfig::default();
    config.logging.level = level;
    config
}

/// Configuration with `agent` switched off.
pub fn config_without(agent: &str) -> GlobalConfig {
    let mut config = GlobalConfig::default();
    config.agents.insert(
        agent.to_owned(),
        AgentConfig {
            enabled: false,
            ..AgentConfig::default()
        },
    );
    config
}

/// In-memory store plus a dispatcher over every default adapter.
pub async fn dispatcher_with(config: GlobalConfig) -> (Dispatcher, Store) {
    let store = Store::open_memory().await.expect("memory store");
    let privacy = Arc::new(config.privacy_checker().expect("privacy"));
    let dispatcher = Dispatcher::new(
        Arc::new(Registry::with_defaults()),
        Arc::new(config),
        privacy,
        store.clone(),
    );
    (dispatcher, store)
}

/// A file-write event stamped at `timestamp`.
pub fn write_event_at(session: Uuid, path: &str, timestamp: DateTime<Utc>) -> Event {
    let mut event = Event::new(session, "claude-code", ActionType::FileWrite);
    event.timestamp = timestamp;
    event
        .set_payload(&FileWritePayload {
            path: path.to_owned(),
            ..FileWritePayload::default()
        })
        .expect("payload");
    event
}
