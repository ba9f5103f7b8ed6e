//! Append-only event timeline shared by every view.
//!
//! All user-visible activity, from operator input and in-flight requests to
//! assistant replies and failures, lands here as one ordered sequence. The transcript
//! renders every entry; the progress pane is a pure filter for [`LogKind::Loading`]
//! entries. Nothing is ever mutated or removed after append, including loading
//! placeholders, which stay in the timeline once their request completes.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogKind {
    User,
    Assistant,
    Loading,
    Info,
    Warn,
    Error,
}

impl LogKind {
    pub fn as_str(self) -> &'static str {
        match self {
            LogKind::User => "user",
            LogKind::Assistant => "assistant",
            LogKind::Loading => "loading",
            LogKind::Info => "info",
            LogKind::Warn => "warn",
            LogKind::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub kind: LogKind,
    pub message: String,
}

impl LogEntry {
    pub fn new(kind: LogKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Default)]
pub struct EventLog {
    entries: Vec<LogEntry>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, entry: LogEntry) {
        self.entries.push(entry);
    }

    pub fn push(&mut self, kind: LogKind, message: impl Into<String>) {
        self.append(LogEntry::new(kind, message));
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// In-flight request placeholders, in emission order.
    pub fn loading_entries(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries
            .iter()
            .filter(|entry| entry.kind == LogKind::Loading)
    }
}
