//! Name-keyed adapter registry.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use super::claude_code::ClaudeCodeAdapter;
use super::cursor::CursorAdapter;
use super::gemini::GeminiAdapter;
use super::openclaw::OpenClawAdapter;
use super::opencode::OpenCodeAdapter;
use super::pi_agent::PiAgentAdapter;
use super::windsurf::WindsurfAdapter;
use super::Adapter;

/// Registered adapters. Written once at startup, read on every hook.
#[derive(Default)]
pub struct Registry {
    adapters: RwLock<HashMap<&'static str, Arc<dyn Adapter>>>,
}

impl Registry {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every supported agent.
    #[must_use]
    pub fn with_defaults() -> Self {
        let registry = Self::new();
        registry.register(Arc::new(ClaudeCodeAdapter));
        registry.register(Arc::new(CursorAdapter));
        registry.register(Arc::new(GeminiAdapter));
        registry.register(Arc::new(OpenCodeAdapter));
        registry.register(Arc::new(OpenClawAdapter));
        registry.register(Arc::new(WindsurfAdapter));
        registry.register(Arc::new(PiAgentAdapter));
        registry
    }

    /// Add `adapter`, replacing any adapter with the same name.
    pub fn register(&self, adapter: Arc<dyn Adapter>) {
        let mut adapters = self
            .adapters
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        adapters.insert(adapter.name(), adapter);
    }

    /// Adapter registered under `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn Adapter>> {
        self.adapters
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// Registered names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self
            .adapters
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .copied()
            .collect();
        names.sort_unstable();
        names
    }

    /// Registered adapters, sorted by name.
    #[must_use]
    pub fn all(&self) -> Vec<Arc<dyn Adapter>> {
        let mut adapters: Vec<_> = self
            .adapters
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        adapters.sort_by_key(|a| a.name());
        adapters
    }
}

/// Human-readable name for an agent machine name.
#[must_use]
pub fn display_name(name: &str) -> String {
    Registry::with_defaults()
        .get(name)
        .map_or_else(|| name.to_owned(), |a| a.display_name().to_owned())
}
