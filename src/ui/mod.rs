//! Terminal rendering.
//!
//! Three surfaces, all derived from shared state: the transcript shows every
//! timeline entry, the server panel shows the registry snapshot plus the tool
//! inventory cache, and the progress line is a pure filter over the timeline's
//! loading entries.

use ratatui::{
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use crate::core::app::App;
use crate::core::log::LogKind;
use crate::core::tools::ToolFetch;

pub mod chat_loop;

fn entry_style(kind: LogKind) -> Style {
    match kind {
        LogKind::User => Style::default().fg(Color::Cyan),
        LogKind::Assistant => Style::default().fg(Color::White),
        LogKind::Loading => Style::default().fg(Color::DarkGray),
        LogKind::Info => Style::default().fg(Color::Green),
        LogKind::Warn => Style::default().fg(Color::Yellow),
        LogKind::Error => Style::default().fg(Color::Red),
    }
}

fn entry_prefix(kind: LogKind) -> Option<String> {
    match kind {
        LogKind::User => Some("You: ".to_string()),
        LogKind::Warn | LogKind::Error => Some(format!("{}: ", kind.as_str())),
        _ => None,
    }
}

pub fn build_transcript_lines(app: &App) -> Vec<Line<'_>> {
    let mut lines = Vec::new();
    for entry in app.log.entries() {
        let style = entry_style(entry.kind);
        let prefix = entry_prefix(entry.kind);
        let mut first = true;
        for content_line in entry.message.lines() {
            let mut spans = Vec::new();
            if first {
                if let Some(prefix) = prefix.clone() {
                    spans.push(Span::styled(prefix, style.add_modifier(Modifier::BOLD)));
                }
                first = false;
            }
            spans.push(Span::styled(content_line, style));
            lines.push(Line::from(spans));
        }
        lines.push(Line::from(""));
    }
    lines
}

fn build_server_lines(app: &App) -> Vec<Line<'_>> {
    let mut lines = Vec::new();
    for name in &app.registry {
        let selected = app.selected.as_deref() == Some(name.as_str());
        let marker = if selected { "> " } else { "  " };
        let state = app.inventory.state(name);
        let enabled = state.map(|s| s.enabled).unwrap_or(true);
        let name_style = if enabled {
            Style::default().fg(Color::White)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        let mut spans = vec![
            Span::styled(marker, Style::default().fg(Color::Cyan)),
            Span::styled(name.as_str(), name_style.add_modifier(Modifier::BOLD)),
        ];
        if !enabled {
            spans.push(Span::styled(" (disabled)", Style::default().fg(Color::DarkGray)));
        }
        lines.push(Line::from(spans));

        let Some(state) = state else { continue };
        if !state.expanded {
            continue;
        }
        match &state.fetch {
            ToolFetch::NotFetched => {
                lines.push(Line::from(Span::styled(
                    "    loading tools...",
                    Style::default().fg(Color::DarkGray),
                )));
            }
            ToolFetch::Fetched(tools) if tools.is_empty() => {
                lines.push(Line::from(Span::styled(
                    "    (no tools)",
                    Style::default().fg(Color::DarkGray),
                )));
            }
            ToolFetch::Fetched(tools) => {
                for tool in tools {
                    lines.push(Line::from(vec![
                        Span::styled("    ", Style::default()),
                        Span::styled(tool.name.as_str(), Style::default().fg(Color::Green)),
                        Span::styled(
                            if tool.description.is_empty() {
                                String::new()
                            } else {
                                format!(" - {}", tool.description)
                            },
                            Style::default().fg(Color::Gray),
                        ),
                    ]));
                }
            }
            ToolFetch::FetchFailed => {
                lines.push(Line::from(Span::styled(
                    "    (fetch failed)",
                    Style::default().fg(Color::Red),
                )));
            }
        }
    }
    if lines.is_empty() {
        lines.push(Line::from(Span::styled(
            "no servers registered",
            Style::default().fg(Color::DarkGray),
        )));
    }
    lines
}

/// Rolled-up registration history, one row per distinct name. Recomputed
/// from the store on every render, never cached, so it always agrees with
/// the current history contents.
pub fn build_history_lines(app: &App) -> Vec<Line<'_>> {
    let rolled = app.history.rollup();
    let mut lines = Vec::new();
    if rolled.is_empty() {
        return lines;
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "History",
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
    )));
    for (name, row) in rolled {
        lines.push(Line::from(vec![
            Span::styled(format!("  {name}"), Style::default().fg(Color::White)),
            Span::styled(
                format!(" ({} add{})", row.count, if row.count == 1 { "" } else { "s" }),
                Style::default().fg(Color::DarkGray),
            ),
        ]));
        lines.push(Line::from(Span::styled(
            format!(
                "    {} {}  last {}",
                row.command,
                row.args.join(" "),
                row.last_timestamp.format("%Y-%m-%d %H:%M")
            ),
            Style::default().fg(Color::DarkGray),
        )));
    }
    lines
}

fn build_progress_line(app: &App) -> Line<'_> {
    let loading: Vec<&str> = app
        .log
        .loading_entries()
        .map(|e| e.message.as_str())
        .collect();
    if loading.is_empty() {
        Line::from(Span::styled("idle", Style::default().fg(Color::DarkGray)))
    } else {
        // The timeline never resolves loading entries; show the most recent
        // alongside the running total.
        Line::from(vec![
            Span::styled(
                format!("{} request(s) issued", loading.len()),
                Style::default().fg(Color::Yellow),
            ),
            Span::styled(
                format!(" - last: {}", loading[loading.len() - 1]),
                Style::default().fg(Color::DarkGray),
            ),
        ])
    }
}

pub fn ui(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(0),
            Constraint::Length(1),
            Constraint::Length(3),
        ])
        .split(f.area());

    let panes = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(68), Constraint::Percentage(32)])
        .split(chunks[0]);

    let transcript_lines = build_transcript_lines(app);
    let available_height = panes[0].height.saturating_sub(1);
    let total_lines = transcript_lines.len() as u16;
    let max_offset = total_lines.saturating_sub(available_height);
    let scroll_offset = if app.auto_scroll {
        max_offset
    } else {
        app.scroll_offset.min(max_offset)
    };

    let transcript = Paragraph::new(transcript_lines)
        .block(Block::default().title("Chat - tooldeck"))
        .wrap(Wrap { trim: true })
        .scroll((scroll_offset, 0));
    f.render_widget(transcript, panes[0]);

    let mut server_lines = build_server_lines(app);
    server_lines.extend(build_history_lines(app));
    let servers = Paragraph::new(server_lines)
        .block(Block::default().borders(Borders::LEFT).title("Servers"))
        .wrap(Wrap { trim: true });
    f.render_widget(servers, panes[1]);

    f.render_widget(Paragraph::new(build_progress_line(app)), chunks[1]);

    let input = Paragraph::new(app.input.as_str())
        .style(Style::default().fg(Color::Yellow))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Message or /command (Enter to submit, Ctrl+C to quit)"),
        );
    f.render_widget(input, chunks[2]);

    f.set_cursor_position((
        chunks[2].x + input_cursor_offset(&app.input, chunks[2].width) + 1,
        chunks[2].y + 1,
    ));
}

/// Column offset of the input cursor: characters, not bytes, clamped to the
/// box interior so long input cannot push the cursor past the border.
fn input_cursor_offset(input: &str, box_width: u16) -> u16 {
    let interior = usize::from(box_width.saturating_sub(2));
    input.chars().count().min(interior) as u16
}
