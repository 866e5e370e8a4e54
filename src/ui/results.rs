use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};
use ratatui::Frame;

use crate::app::App;
use crate::session::FetchState;

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(area);

    render_list(frame, app, chunks[0]);
    render_footer(frame, app, chunks[1]);
}

fn render_list(frame: &mut Frame, app: &App, area: Rect) {
    let records = app.session.current_records();

    if records.is_empty() {
        let message = match app.session.state() {
            FetchState::Fetching { .. } => "Searching...",
            FetchState::Failed(_) => "Search failed",
            FetchState::Idle => "No repositories found",
        };
        let empty = Paragraph::new(message)
            .block(Block::default().borders(Borders::ALL).title("Repositories"))
            .style(Style::default().fg(Color::Gray));
        frame.render_widget(empty, area);
        return;
    }

    let w = area.width.saturating_sub(2) as usize;
    let fixed = 16; // checkbox(4) + space(1) + stars(7) + spaces(4)
    let branch_width = 20;
    let name_width = w.saturating_sub(fixed + branch_width).max(10);

    let items: Vec<ListItem> = records
        .iter()
        .enumerate()
        .map(|(i, record)| {
            let style = if i == app.cursor {
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            let checkbox = if record.selected { "[x]" } else { "[ ]" };

            let line = Line::from(vec![
                Span::styled(
                    format!("{} ", checkbox),
                    Style::default().fg(if record.selected {
                        Color::Green
                    } else {
                        Color::DarkGray
                    }),
                ),
                Span::styled(
                    format!("{:<name_width$}", truncate(&record.full_name(), name_width)),
                    style,
                ),
                Span::raw("  "),
                Span::styled(
                    format!("★ {:>5}", record.stars),
                    Style::default().fg(Color::DarkGray),
                ),
                Span::raw("  "),
                Span::styled(
                    truncate(&record.chosen_branch, branch_width),
                    Style::default().fg(Color::Cyan),
                ),
            ]);

            ListItem::new(line)
        })
        .collect();

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("Repositories ({})", records.len())),
        )
        .highlight_style(Style::default().bg(Color::DarkGray));

    let mut state = ListState::default();
    state.select(Some(app.cursor));

    frame.render_stateful_widget(list, area, &mut state);
}

fn render_footer(frame: &mut Frame, app: &App, area: Rect) {
    let pagination = app.session.pagination();
    let arrow = |enabled: bool, text: &'static str| {
        let color = if enabled { Color::White } else { Color::DarkGray };
        Span::styled(text, Style::default().fg(color))
    };

    let line = Line::from(vec![
        arrow(pagination.can_prev(), "◀ "),
        Span::raw(pagination.label()),
        arrow(pagination.can_next(), " ▶"),
        Span::raw("   "),
        Span::styled(
            format!("{} selected", app.session.cache().selected_count()),
            Style::default().fg(Color::Green),
        ),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let kept: String = text.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    } else {
        text.to_string()
    }
}
