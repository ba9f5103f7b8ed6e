//! The interactive controller loop.
//!
//! All state mutation happens here, on one logical task. Every network call
//! is spawned as a fire-and-forget tokio task that reports back with exactly
//! one or two [`AppEvent`]s over an unbounded channel; the loop drains the
//! channel between redraws and applies events in arrival order. There is no
//! cancellation: a task whose server was deleted mid-flight still delivers
//! its result.

use std::{error::Error, fs, io, sync::Arc, time::Duration};

use ratatui::{
    backend::CrosstermBackend,
    crossterm::{
        event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
        execute,
        terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    },
    Terminal,
};
use tokio::sync::mpsc;

use crate::api::client::Backend;
use crate::api::{ChatRequest, ServerSpec};
use crate::commands::{process_input, InputAction, HELP_TEXT};
use crate::core::app::{App, AppEvent};
use crate::core::log::LogKind;
use crate::ui::{build_transcript_lines, ui};

type EventSender = mpsc::UnboundedSender<AppEvent>;

fn spawn_chat(backend: Arc<dyn Backend>, tx: EventSender, request: ChatRequest) {
    tokio::spawn(async move {
        let result = backend.chat(&request).await;
        let _ = tx.send(AppEvent::ChatCompleted(result));
    });
}

/// Register each spec in order, then refresh the registry snapshot once.
fn spawn_add_servers(backend: Arc<dyn Backend>, tx: EventSender, specs: Vec<ServerSpec>) {
    tokio::spawn(async move {
        for spec in specs {
            let result = backend.add_server(&spec).await;
            let _ = tx.send(AppEvent::ServerAdded {
                name: spec.name.clone(),
                result,
            });
        }
        let _ = tx.send(AppEvent::RegistryFetched(backend.list_servers().await));
    });
}

fn spawn_delete_server(backend: Arc<dyn Backend>, tx: EventSender, name: String) {
    tokio::spawn(async move {
        let result = backend.delete_server(&name).await;
        let _ = tx.send(AppEvent::ServerDeleted { name, result });
        let _ = tx.send(AppEvent::RegistryFetched(backend.list_servers().await));
    });
}

fn spawn_tool_fetch(backend: Arc<dyn Backend>, tx: EventSender, server: String) {
    tokio::spawn(async move {
        let result = backend.list_tools(Some(&server)).await;
        let _ = tx.send(AppEvent::ToolsFetched { server, result });
    });
}

/// Resolve an optional command target against the current selection.
fn resolve_target(app: &mut App, name: Option<String>) -> Option<String> {
    let resolved = name.or_else(|| app.selected.clone());
    if resolved.is_none() {
        app.log
            .push(LogKind::Warn, "No server selected and none named");
    }
    resolved
}

fn dispatch(app: &mut App, backend: &Arc<dyn Backend>, tx: &EventSender, action: InputAction) {
    match action {
        InputAction::Message(text) => {
            if text.trim().is_empty() {
                return;
            }
            let request = app.begin_send(text.trim());
            spawn_chat(backend.clone(), tx.clone(), request);
        }
        InputAction::AddServer(spec) => {
            if app.begin_add(&spec) {
                spawn_add_servers(backend.clone(), tx.clone(), vec![spec]);
            }
        }
        InputAction::DeleteServer(name) => {
            if let Some(name) = resolve_target(app, name) {
                spawn_delete_server(backend.clone(), tx.clone(), name);
            }
        }
        InputAction::ToggleTools(name) => {
            if let Some(name) = resolve_target(app, name) {
                if app.begin_toggle_tools(&name) {
                    spawn_tool_fetch(backend.clone(), tx.clone(), name);
                }
            }
        }
        InputAction::ToggleEnabled(name) => {
            if let Some(name) = resolve_target(app, name) {
                app.inventory.toggle_enabled(&name);
            }
        }
        InputAction::Select(name) => {
            if app.registry.contains(&name) {
                app.selected = Some(name);
            } else {
                app.log
                    .push(LogKind::Warn, format!("No such server: '{name}'"));
            }
        }
        InputAction::ImportFile(path) => match fs::read_to_string(&path) {
            Ok(contents) => {
                let specs = app.import_document(&contents);
                if !specs.is_empty() {
                    spawn_add_servers(backend.clone(), tx.clone(), specs);
                }
            }
            Err(e) => {
                app.log
                    .push(LogKind::Error, format!("Could not read '{path}': {e}"));
            }
        },
        InputAction::Help => app.log.push(LogKind::Info, HELP_TEXT),
        InputAction::Invalid(message) => app.log.push(LogKind::Error, message),
    }
}

fn max_scroll_offset(app: &App, terminal_height: u16) -> u16 {
    // Input box (3), progress line (1), transcript title (1).
    let available_height = terminal_height.saturating_sub(5);
    let total_lines = build_transcript_lines(app).len() as u16;
    total_lines.saturating_sub(available_height)
}

pub async fn run(mut app: App, backend: Arc<dyn Backend>) -> Result<(), Box<dyn Error>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;

    let (tx, mut rx) = mpsc::unbounded_channel::<AppEvent>();

    let result = loop {
        terminal.draw(|f| ui(f, &app))?;

        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                match key.code {
                    KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                        break Ok(());
                    }
                    KeyCode::Enter => {
                        if app.input.trim().is_empty() {
                            continue;
                        }
                        let input_text = std::mem::take(&mut app.input);
                        let action = process_input(&input_text);
                        dispatch(&mut app, &backend, &tx, action);
                    }
                    KeyCode::Char(c) => {
                        app.input.push(c);
                    }
                    KeyCode::Backspace => {
                        app.input.pop();
                    }
                    KeyCode::Up => {
                        let height = terminal.size().unwrap_or_default().height;
                        if app.auto_scroll {
                            app.scroll_offset = max_scroll_offset(&app, height);
                            app.auto_scroll = false;
                        }
                        app.scroll_offset = app.scroll_offset.saturating_sub(1);
                    }
                    KeyCode::Down => {
                        let height = terminal.size().unwrap_or_default().height;
                        let max = max_scroll_offset(&app, height);
                        app.scroll_offset = app.scroll_offset.saturating_add(1).min(max);
                        if app.scroll_offset >= max {
                            app.auto_scroll = true;
                        }
                    }
                    _ => {}
                }
            }
        }

        while let Ok(event) = rx.try_recv() {
            app.apply_event(event);
        }
    };

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::client::testing::MockBackend;
    use crate::api::ChatResponse;
    use crate::core::history::HistoryStore;

    fn app() -> App {
        App::new(HistoryStore::in_memory())
    }

    async fn drain(app: &mut App, rx: &mut mpsc::UnboundedReceiver<AppEvent>) {
        // Yield until every spawned task has reported.
        tokio::task::yield_now().await;
        while let Ok(event) = rx.try_recv() {
            app.apply_event(event);
        }
    }

    #[tokio::test]
    async fn add_command_registers_and_refreshes_snapshot() {
        let backend: Arc<MockBackend> = Arc::new(MockBackend::with_registry(&[]));
        let dyn_backend: Arc<dyn Backend> = backend.clone();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut app = app();

        dispatch(
            &mut app,
            &dyn_backend,
            &tx,
            process_input("/add fs node server.js"),
        );
        // Wait for the add task to register and refresh.
        for _ in 0..10 {
            drain(&mut app, &mut rx).await;
        }

        assert_eq!(backend.add_call_count(), 1);
        assert_eq!(app.registry, vec!["fs".to_string()]);
        assert_eq!(app.selected.as_deref(), Some("fs"));
        assert_eq!(app.history.entries().len(), 1);
    }

    #[tokio::test]
    async fn duplicate_add_issues_no_backend_call() {
        let backend: Arc<MockBackend> = Arc::new(MockBackend::with_registry(&["fs"]));
        let dyn_backend: Arc<dyn Backend> = backend.clone();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut app = app();
        app.observe_registry(vec!["fs".to_string()]);

        dispatch(
            &mut app,
            &dyn_backend,
            &tx,
            process_input("/add fs node server.js"),
        );
        for _ in 0..10 {
            drain(&mut app, &mut rx).await;
        }

        assert_eq!(backend.add_call_count(), 0);
        assert_eq!(app.log.entries().last().unwrap().kind, LogKind::Warn);
    }

    #[tokio::test]
    async fn chat_round_trip_binds_session_via_the_channel() {
        let backend: Arc<MockBackend> = Arc::new(MockBackend::with_registry(&[]));
        backend.script_chat(Ok(ChatResponse {
            session_id: "s1".to_string(),
            response: "hello".to_string(),
        }));
        let dyn_backend: Arc<dyn Backend> = backend.clone();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut app = app();

        dispatch(&mut app, &dyn_backend, &tx, process_input("hi"));
        for _ in 0..10 {
            drain(&mut app, &mut rx).await;
        }

        assert_eq!(app.session.id(), Some("s1"));
        let kinds: Vec<LogKind> = app.log.entries().iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![LogKind::User, LogKind::Loading, LogKind::Assistant]);
        assert_eq!(
            backend.chat_requests.lock().unwrap()[0].session_id,
            None
        );
    }

    #[tokio::test]
    async fn tool_toggle_fetches_once_for_the_selected_server() {
        let backend: Arc<MockBackend> = Arc::new(MockBackend::with_registry(&["fs"]));
        let dyn_backend: Arc<dyn Backend> = backend.clone();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut app = app();
        app.observe_registry(vec!["fs".to_string()]);

        dispatch(&mut app, &dyn_backend, &tx, process_input("/tools"));
        for _ in 0..10 {
            drain(&mut app, &mut rx).await;
        }
        dispatch(&mut app, &dyn_backend, &tx, process_input("/tools"));
        dispatch(&mut app, &dyn_backend, &tx, process_input("/tools"));
        for _ in 0..10 {
            drain(&mut app, &mut rx).await;
        }

        assert_eq!(backend.tool_requests.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn delete_refreshes_snapshot_but_not_history() {
        let backend: Arc<MockBackend> = Arc::new(MockBackend::with_registry(&[]));
        let dyn_backend: Arc<dyn Backend> = backend.clone();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut app = app();

        dispatch(
            &mut app,
            &dyn_backend,
            &tx,
            process_input("/add fs node server.js"),
        );
        for _ in 0..10 {
            drain(&mut app, &mut rx).await;
        }
        dispatch(&mut app, &dyn_backend, &tx, process_input("/delete fs"));
        for _ in 0..10 {
            drain(&mut app, &mut rx).await;
        }

        assert!(app.registry.is_empty());
        assert_eq!(app.selected, None);
        assert_eq!(app.history.entries().len(), 1);
    }
}
