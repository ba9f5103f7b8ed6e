//! Top-level client state and the events that mutate it.
//!
//! `App` owns every piece of shared state (the event timeline, the history
//! store, the registry snapshot, the tool inventory, the chat session, and
//! the UI selection) and is mutated only on the controller loop's thread.
//! Network calls run in spawned tasks and report back as [`AppEvent`]s; each
//! event is applied atomically, but sequences of events from concurrent
//! operations interleave in completion order.

use tracing::debug;

use crate::api::{ChatRequest, ChatResponse, ServerSpec, ToolDescriptor};
use crate::core::history::HistoryStore;
use crate::core::import;
use crate::core::log::{EventLog, LogKind};
use crate::core::session::ChatSession;
use crate::core::tools::ToolInventory;

/// Completion message from one background network task.
#[derive(Debug)]
pub enum AppEvent {
    RegistryFetched(Result<Vec<String>, String>),
    ServerAdded {
        name: String,
        result: Result<(), String>,
    },
    ServerDeleted {
        name: String,
        result: Result<(), String>,
    },
    ToolsFetched {
        server: String,
        result: Result<Vec<ToolDescriptor>, String>,
    },
    ChatCompleted(Result<ChatResponse, String>),
}

pub struct App {
    pub log: EventLog,
    pub history: HistoryStore,
    /// Last-known live registry; always superseded by the next fetch.
    pub registry: Vec<String>,
    pub selected: Option<String>,
    pub inventory: ToolInventory,
    pub session: ChatSession,
    pub input: String,
    pub scroll_offset: u16,
    pub auto_scroll: bool,
}

impl App {
    pub fn new(history: HistoryStore) -> Self {
        Self {
            log: EventLog::new(),
            history,
            registry: Vec::new(),
            selected: None,
            inventory: ToolInventory::new(),
            session: ChatSession::new(),
            input: String::new(),
            scroll_offset: 0,
            auto_scroll: true,
        }
    }

    /// Adopt a fresh registry snapshot: seed inventory entries for new names
    /// and keep the selection pointing at a real server (first entry when
    /// nothing valid is selected).
    pub fn observe_registry(&mut self, names: Vec<String>) {
        self.inventory.observe_registry(&names);
        self.registry = names;
        let selection_valid = self
            .selected
            .as_ref()
            .is_some_and(|name| self.registry.contains(name));
        if !selection_valid {
            self.selected = self.registry.first().cloned();
        }
    }

    /// Pre-flight for an add: duplicates against the current snapshot are a
    /// warning and drop the operation; otherwise the intent is recorded in
    /// history and the caller issues the registration call.
    pub fn begin_add(&mut self, spec: &ServerSpec) -> bool {
        if self.registry.contains(&spec.name) {
            self.log.push(
                LogKind::Warn,
                format!("Server '{}' already exists, skipping", spec.name),
            );
            return false;
        }
        self.history.record(spec);
        true
    }

    /// Flip a server's panel expansion; true means the caller must issue the
    /// one-time tool fetch for that server.
    pub fn begin_toggle_tools(&mut self, name: &str) -> bool {
        let fetch_needed = self.inventory.toggle(name);
        if fetch_needed {
            self.log
                .push(LogKind::Loading, format!("Fetching tools for '{name}'..."));
        }
        fetch_needed
    }

    pub fn begin_send(&mut self, message: &str) -> ChatRequest {
        self.session.begin_send(&mut self.log, message)
    }

    /// Translate an import document into registration payloads, recording
    /// history per accepted entry. Document-level failures log an error and
    /// register nothing; per-entry failures are logged and skipped.
    pub fn import_document(&mut self, contents: &str) -> Vec<ServerSpec> {
        let outcome = match import::parse_import(contents) {
            Ok(outcome) => outcome,
            Err(e) => {
                self.log
                    .push(LogKind::Error, format!("Import failed: {e}"));
                return Vec::new();
            }
        };
        for (name, reason) in &outcome.skipped {
            self.log.push(
                LogKind::Error,
                format!("Skipping import entry '{name}': {reason}"),
            );
        }
        outcome
            .specs
            .into_iter()
            .filter(|spec| self.begin_add(spec))
            .collect()
    }

    pub fn apply_event(&mut self, event: AppEvent) {
        debug!(?event, "applying app event");
        match event {
            AppEvent::RegistryFetched(Ok(names)) => self.observe_registry(names),
            AppEvent::RegistryFetched(Err(e)) => {
                self.log
                    .push(LogKind::Error, format!("Failed to fetch server registry: {e}"));
            }
            AppEvent::ServerAdded { name, result } => match result {
                Ok(()) => self
                    .log
                    .push(LogKind::Info, format!("Added server '{name}'")),
                Err(e) => self
                    .log
                    .push(LogKind::Error, format!("Failed to add server '{name}': {e}")),
            },
            AppEvent::ServerDeleted { name, result } => match result {
                Ok(()) => self
                    .log
                    .push(LogKind::Info, format!("Deleted server '{name}'")),
                Err(e) => self.log.push(
                    LogKind::Error,
                    format!("Failed to delete server '{name}': {e}"),
                ),
            },
            AppEvent::ToolsFetched { server, result } => match result {
                Ok(tools) => self.inventory.store_fetch_result(&server, Ok(tools)),
                Err(e) => {
                    // The failure is terminal for this server; record it in
                    // both the inventory and the timeline.
                    self.inventory.store_fetch_result(&server, Err(()));
                    self.log.push(
                        LogKind::Error,
                        format!("Failed to fetch tools for '{server}': {e}"),
                    );
                }
            },
            AppEvent::ChatCompleted(outcome) => {
                self.session.complete_send(&mut self.log, outcome);
            }
        }
    }
}
