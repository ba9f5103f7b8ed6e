//! Per-server tool inventory and display state.
//!
//! Tool lists are fetched lazily, once per server, on the first expansion of
//! that server's panel entry. A completed fetch is terminal either way: there
//! is no invalidation or retry path, so a server that failed to answer stays
//! marked failed for the life of the page.

use std::collections::HashMap;

use crate::api::ToolDescriptor;

/// Fetch state for one server's tool list. Failure is kept distinct from an
/// empty list so the panel can tell "no tools" from "could not ask".
#[derive(Debug, Clone, PartialEq)]
pub enum ToolFetch {
    NotFetched,
    Fetched(Vec<ToolDescriptor>),
    FetchFailed,
}

#[derive(Debug)]
pub struct ServerToolState {
    pub expanded: bool,
    /// Local display flag only; never transmitted to the backend.
    pub enabled: bool,
    pub fetch: ToolFetch,
}

impl Default for ServerToolState {
    fn default() -> Self {
        Self {
            expanded: false,
            enabled: true,
            fetch: ToolFetch::NotFetched,
        }
    }
}

#[derive(Debug, Default)]
pub struct ToolInventory {
    servers: HashMap<String, ServerToolState>,
}

impl ToolInventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ensure every name in a fresh registry snapshot has an entry, with
    /// `enabled` defaulting to true on first sighting. Existing state is kept.
    pub fn observe_registry(&mut self, names: &[String]) {
        for name in names {
            self.servers.entry(name.clone()).or_default();
        }
    }

    /// Flip the expanded flag. Returns true when this transition requires a
    /// tool fetch, i.e. the entry is now expanded and has never been fetched.
    pub fn toggle(&mut self, name: &str) -> bool {
        let state = self.servers.entry(name.to_string()).or_default();
        state.expanded = !state.expanded;
        state.expanded && state.fetch == ToolFetch::NotFetched
    }

    /// Record a fetch outcome. Even an empty list is stored, so later toggles
    /// never re-fetch.
    pub fn store_fetch_result(&mut self, name: &str, result: Result<Vec<ToolDescriptor>, ()>) {
        let state = self.servers.entry(name.to_string()).or_default();
        state.fetch = match result {
            Ok(tools) => ToolFetch::Fetched(tools),
            Err(()) => ToolFetch::FetchFailed,
        };
    }

    pub fn toggle_enabled(&mut self, name: &str) {
        let state = self.servers.entry(name.to_string()).or_default();
        state.enabled = !state.enabled;
    }

    pub fn state(&self, name: &str) -> Option<&ServerToolState> {
        self.servers.get(name)
    }
}
