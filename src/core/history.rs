//! Durable history of every registration ever requested locally.
//!
//! The store is a write-only log of intent, deliberately decoupled from the
//! backend's live registry: entries are never deduplicated, edited, or removed,
//! even when the matching server is later deleted. The whole log is serialized
//! as one JSON array and rewritten in full on every mutation; a missing or
//! unreadable document loads as an empty history rather than an error, since
//! the backend registry remains usable without it.

use chrono::{DateTime, Utc};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::api::ServerSpec;

const HISTORY_FILE: &str = "server_history.json";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryEntry {
    pub name: String,
    pub command: String,
    pub args: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

/// One row per distinct server name, derived on demand from the full log.
#[derive(Debug, Clone, PartialEq)]
pub struct RolledHistory {
    pub count: usize,
    pub last_timestamp: DateTime<Utc>,
    pub command: String,
    pub args: Vec<String>,
}

#[derive(Debug, Default)]
pub struct HistoryStore {
    entries: Vec<HistoryEntry>,
    path: Option<PathBuf>,
}

impl HistoryStore {
    /// Load from the per-user data directory, creating an empty store when no
    /// document exists yet.
    pub fn load() -> Self {
        match Self::default_path() {
            Some(path) => Self::load_from_path(&path),
            None => {
                warn!("could not determine a data directory; history will not persist");
                Self::default()
            }
        }
    }

    pub fn load_from_path(path: &Path) -> Self {
        let entries = match fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str::<Vec<HistoryEntry>>(&contents) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!(path = %path.display(), "ignoring unparseable history document: {e}");
                    Vec::new()
                }
            },
            Err(_) => Vec::new(),
        };
        Self {
            entries,
            path: Some(path.to_path_buf()),
        }
    }

    /// Store that never touches disk. Used by tests and as the fallback when
    /// no data directory is available.
    pub fn in_memory() -> Self {
        Self::default()
    }

    fn default_path() -> Option<PathBuf> {
        let proj_dirs = ProjectDirs::from("org", "tooldeck", "tooldeck")?;
        Some(proj_dirs.data_dir().join(HISTORY_FILE))
    }

    /// Append one entry stamped with the current instant, then rewrite the
    /// stored document. Persistence is best-effort: a write failure is logged
    /// and the in-memory log keeps the entry.
    pub fn record(&mut self, spec: &ServerSpec) {
        self.record_at(spec, Utc::now());
    }

    pub fn record_at(&mut self, spec: &ServerSpec, timestamp: DateTime<Utc>) {
        self.entries.push(HistoryEntry {
            name: spec.name.clone(),
            command: spec.command.clone(),
            args: spec.args.clone(),
            timestamp,
        });
        self.persist();
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    /// Pure fold over the log: per name, the total entry count plus the
    /// command/args/timestamp of the maximum-timestamp entry (later entries
    /// win ties). Recomputed on every call, never cached.
    pub fn rollup(&self) -> BTreeMap<String, RolledHistory> {
        let mut rolled: BTreeMap<String, RolledHistory> = BTreeMap::new();
        for entry in &self.entries {
            match rolled.get_mut(&entry.name) {
                Some(row) => {
                    row.count += 1;
                    if entry.timestamp >= row.last_timestamp {
                        row.last_timestamp = entry.timestamp;
                        row.command = entry.command.clone();
                        row.args = entry.args.clone();
                    }
                }
                None => {
                    rolled.insert(
                        entry.name.clone(),
                        RolledHistory {
                            count: 1,
                            last_timestamp: entry.timestamp,
                            command: entry.command.clone(),
                            args: entry.args.clone(),
                        },
                    );
                }
            }
        }
        rolled
    }

    fn persist(&self) {
        let Some(path) = &self.path else {
            return;
        };
        if let Err(e) = self.save_to_path(path) {
            warn!(path = %path.display(), "failed to persist server history: {e}");
        }
    }

    pub fn save_to_path(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(&self.entries)?;
        fs::write(path, contents)?;
        Ok(())
    }
}
