//! Command-line interface and boot sequence.
//!
//! Boot order matters: history is loaded first, then the reconciler replays
//! it against the backend registry exactly once, then the interactive loop
//! starts with the resulting snapshot.

use std::error::Error;
use std::fs;
use std::sync::Arc;

use clap::Parser;

use crate::api::client::{Backend, HttpBackend};
use crate::core::app::{App, AppEvent};
use crate::core::config::{Config, DEFAULT_BASE_URL};
use crate::core::history::HistoryStore;
use crate::core::reconcile::reconcile;
use crate::logging;
use crate::ui::chat_loop;

#[derive(Parser)]
#[command(name = "tooldeck")]
#[command(about = "A terminal console for MCP tool-provider servers and a tool-aware assistant")]
#[command(long_about = "Tooldeck connects to a tool-provider manager backend, restores the \
servers you registered in previous sessions, and runs a continuous assistant \
conversation that can use their tools.\n\n\
Controls:\n\
  Type              Enter a message or /command in the input field\n\
  Enter             Submit\n\
  Up/Down           Scroll the transcript\n\
  Ctrl+C            Quit\n\n\
Commands: /add, /delete, /tools, /enable, /select, /import, /help")]
pub struct Args {
    /// Backend base URL (overrides the config file)
    #[arg(short, long, value_name = "URL")]
    pub base_url: Option<String>,

    /// Import an mcpServers JSON document before starting
    #[arg(short, long, value_name = "FILE")]
    pub import: Option<String>,

    /// Write tracing diagnostics to this file
    #[arg(short, long, value_name = "FILE")]
    pub log_file: Option<String>,
}

pub async fn run(args: Args) -> Result<(), Box<dyn Error>> {
    logging::init(args.log_file.as_deref())?;

    let config = Config::load().unwrap_or_else(|e| {
        tracing::warn!("could not load config, using defaults: {e}");
        Config::default()
    });
    let base_url = args
        .base_url
        .as_deref()
        .unwrap_or_else(|| config.base_url())
        .to_string();
    tracing::debug!(%base_url, "connecting to backend");
    if base_url.is_empty() {
        return Err(format!("base URL must be non-empty (default: {DEFAULT_BASE_URL})").into());
    }

    let backend: Arc<dyn Backend> = Arc::new(HttpBackend::new(&base_url));
    let mut app = App::new(HistoryStore::load());

    if let Some(registry) = reconcile(backend.as_ref(), &app.history, &mut app.log).await {
        app.observe_registry(registry);
    }

    if let Some(path) = &args.import {
        import_at_boot(&mut app, backend.as_ref(), path).await;
    }

    chat_loop::run(app, backend).await
}

/// Startup variant of `/import`: registrations happen inline, before the
/// controller loop exists to run them in the background.
async fn import_at_boot(app: &mut App, backend: &dyn Backend, path: &str) {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) => {
            app.log.push(
                crate::core::log::LogKind::Error,
                format!("Could not read '{path}': {e}"),
            );
            return;
        }
    };
    let specs = app.import_document(&contents);
    if specs.is_empty() {
        return;
    }
    for spec in specs {
        let result = backend.add_server(&spec).await;
        app.apply_event(AppEvent::ServerAdded {
            name: spec.name,
            result,
        });
    }
    app.apply_event(AppEvent::RegistryFetched(backend.list_servers().await));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::client::testing::MockBackend;
    use std::io::Write;

    #[tokio::test]
    async fn boot_import_registers_and_refreshes() {
        let backend = MockBackend::with_registry(&[]);
        let mut app = App::new(HistoryStore::in_memory());

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"mcpServers":{{"a":{{"command":"x","args":["y"]}}}}}}"#
        )
        .unwrap();

        import_at_boot(&mut app, &backend, file.path().to_str().unwrap()).await;

        let added = backend.added.lock().unwrap();
        assert_eq!(added.len(), 1);
        assert_eq!(added[0].name, "a");
        assert_eq!(added[0].args, vec!["y"]);
        assert_eq!(added[0].env, Some(Default::default()));
        drop(added);
        assert_eq!(app.registry, vec!["a".to_string()]);
        assert_eq!(app.history.entries().len(), 1);
    }

    #[tokio::test]
    async fn boot_import_of_missing_file_logs_and_continues() {
        let backend = MockBackend::with_registry(&[]);
        let mut app = App::new(HistoryStore::in_memory());

        import_at_boot(&mut app, &backend, "/nonexistent/import.json").await;

        assert_eq!(backend.add_call_count(), 0);
        assert_eq!(
            app.log.entries().last().unwrap().kind,
            crate::core::log::LogKind::Error
        );
    }
}
