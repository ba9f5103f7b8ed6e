//! Boot-time replay of the local history against the backend registry.
//!
//! The backend does not persist registrations across its own restarts, so the
//! client replays every historical name the live registry is missing. Replays
//! are best-effort per entry: one rejected registration never stops the rest.

use std::collections::HashSet;

use crate::api::client::Backend;
use crate::api::ServerSpec;
use crate::core::history::HistoryStore;
use crate::core::log::{EventLog, LogKind};

/// Make the live registry a superset of the names recorded in history, then
/// return a fresh registry snapshot. Returns `None` when the registry could
/// not be fetched; the caller keeps whatever snapshot it last had.
pub async fn reconcile(
    backend: &dyn Backend,
    history: &HistoryStore,
    log: &mut EventLog,
) -> Option<Vec<String>> {
    let live = match backend.list_servers().await {
        Ok(names) => names,
        Err(e) => {
            log.push(LogKind::Error, format!("Failed to fetch server registry: {e}"));
            return None;
        }
    };

    // Names already live plus names attempted this pass; guarantees at most
    // one replay per name per boot even when history holds duplicates.
    let mut attempted: HashSet<String> = live.into_iter().collect();

    // When a name appears more than once, the rollup's maximum-timestamp
    // entry reflects the most recent intent; that is the spec replayed.
    let rolled = history.rollup();

    for entry in history.entries() {
        if attempted.contains(&entry.name) {
            continue;
        }
        attempted.insert(entry.name.clone());

        let latest = &rolled[&entry.name];
        // env is intentionally absent from history and therefore not replayed.
        let spec = ServerSpec {
            name: entry.name.clone(),
            command: latest.command.clone(),
            args: latest.args.clone(),
            env: None,
        };
        match backend.add_server(&spec).await {
            Ok(()) => {
                log.push(
                    LogKind::Info,
                    format!("Restored server '{}' from saved history", entry.name),
                );
            }
            Err(e) => {
                log.push(
                    LogKind::Error,
                    format!("Failed to restore server '{}': {e}", entry.name),
                );
            }
        }
    }

    match backend.list_servers().await {
        Ok(names) => Some(names),
        Err(e) => {
            log.push(LogKind::Error, format!("Failed to refresh server registry: {e}"));
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::client::testing::MockBackend;
    use chrono::{TimeZone, Utc};
    use std::sync::atomic::Ordering;

    fn history_with(entries: &[(&str, &str, &[&str])]) -> HistoryStore {
        let mut store = HistoryStore::in_memory();
        for (i, (name, command, args)) in entries.iter().enumerate() {
            let spec = ServerSpec {
                name: name.to_string(),
                command: command.to_string(),
                args: args.iter().map(|a| a.to_string()).collect(),
                env: None,
            };
            store.record_at(&spec, Utc.timestamp_opt(100 + i as i64, 0).unwrap());
        }
        store
    }

    #[tokio::test]
    async fn replays_missing_entry_and_reflects_it_in_second_fetch() {
        let backend = MockBackend::with_registry(&[]);
        let history = history_with(&[("fs", "node", &["server.js"])]);
        let mut log = EventLog::new();

        let registry = reconcile(&backend, &history, &mut log).await;

        assert_eq!(registry, Some(vec!["fs".to_string()]));
        assert_eq!(backend.add_call_count(), 1);
        let added = backend.added.lock().unwrap();
        assert_eq!(added[0].name, "fs");
        assert_eq!(added[0].command, "node");
        assert_eq!(added[0].args, vec!["server.js"]);
        assert_eq!(added[0].env, None);
        assert!(log
            .entries()
            .iter()
            .any(|e| e.kind == LogKind::Info && e.message.contains("'fs'")));
    }

    #[tokio::test]
    async fn second_run_is_a_no_op() {
        let backend = MockBackend::with_registry(&[]);
        let history = history_with(&[("fs", "node", &["server.js"]), ("web", "npx", &["serve"])]);
        let mut log = EventLog::new();

        let first = reconcile(&backend, &history, &mut log).await.unwrap();
        assert_eq!(backend.add_call_count(), 2);

        let second = reconcile(&backend, &history, &mut log).await.unwrap();
        assert_eq!(second, first);
        assert_eq!(backend.add_call_count(), 2, "no replays on the second pass");
    }

    #[tokio::test]
    async fn one_failing_replay_does_not_stop_the_rest() {
        let backend = MockBackend::with_registry(&[]);
        backend.fail_adds_for("bad");
        let history = history_with(&[
            ("alpha", "node", &["a.js"]),
            ("bad", "node", &["b.js"]),
            ("gamma", "node", &["c.js"]),
        ]);
        let mut log = EventLog::new();

        let registry = reconcile(&backend, &history, &mut log).await.unwrap();

        assert_eq!(backend.add_call_count(), 3);
        assert_eq!(registry, vec!["alpha".to_string(), "gamma".to_string()]);
        assert!(log
            .entries()
            .iter()
            .any(|e| e.kind == LogKind::Error && e.message.contains("'bad'")));
    }

    #[tokio::test]
    async fn registry_fetch_failure_aborts_without_replays() {
        let backend = MockBackend::with_registry(&[]);
        backend.fail_list_servers.store(true, Ordering::SeqCst);
        let history = history_with(&[("fs", "node", &["server.js"])]);
        let mut log = EventLog::new();

        let registry = reconcile(&backend, &history, &mut log).await;

        assert_eq!(registry, None);
        assert_eq!(backend.add_call_count(), 0);
        assert_eq!(log.entries().last().unwrap().kind, LogKind::Error);
    }

    #[tokio::test]
    async fn duplicate_history_names_replay_once_with_the_latest_spec() {
        let backend = MockBackend::with_registry(&[]);
        let history = history_with(&[
            ("fs", "node", &["old.js"]),
            ("fs", "deno", &["new.js"]),
        ]);
        let mut log = EventLog::new();

        reconcile(&backend, &history, &mut log).await;

        assert_eq!(backend.add_call_count(), 1);
        let added = backend.added.lock().unwrap();
        assert_eq!(added[0].command, "deno");
        assert_eq!(added[0].args, vec!["new.js"]);
    }

    #[tokio::test]
    async fn names_already_live_are_not_replayed() {
        let backend = MockBackend::with_registry(&["fs"]);
        let history = history_with(&[("fs", "node", &["server.js"])]);
        let mut log = EventLog::new();

        let registry = reconcile(&backend, &history, &mut log).await.unwrap();

        assert_eq!(registry, vec!["fs".to_string()]);
        assert_eq!(backend.add_call_count(), 0);
    }
}
