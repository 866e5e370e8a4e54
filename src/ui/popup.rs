use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Gauge, List, ListItem, ListState, Paragraph};
use ratatui::Frame;

use crate::types::{CloneOutcome, CloneReport};

fn title_span(title: &str) -> Span<'static> {
    Span::styled(
        format!(" {} ", title),
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD),
    )
}

/// Render a centered selectable list popup
pub fn render_select(frame: &mut Frame, title: &str, items: &[String], selected: usize) {
    let height = (items.len() + 2).min(14) as u16; // +2 for borders
    let width = (title.len() + 6).clamp(40, 70) as u16;
    let area = centered_rect(width, height, frame.area());
    frame.render_widget(Clear, area);

    let list_items: Vec<ListItem> = items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let style = if i == selected {
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            let prefix = if i == selected { "> " } else { "  " };
            ListItem::new(Line::from(Span::styled(
                format!("{}{}", prefix, item),
                style,
            )))
        })
        .collect();

    let list = List::new(list_items)
        .block(Block::default().borders(Borders::ALL).title(title_span(title)));

    let mut state = ListState::default();
    state.select(Some(selected));
    frame.render_stateful_widget(list, area, &mut state);
}

/// Single-line text prompt with a trailing cursor.
pub fn render_input(frame: &mut Frame, title: &str, value: &str) {
    let area = centered_rect(70, 3, frame.area());
    frame.render_widget(Clear, area);

    let line = Line::from(vec![
        Span::raw(value),
        Span::styled("_", Style::default().fg(Color::Yellow)),
    ]);
    let input = Paragraph::new(line)
        .block(Block::default().borders(Borders::ALL).title(title_span(title)));

    frame.render_widget(input, area);
}

pub fn render_progress(frame: &mut Frame, finished: usize, total: usize, recent: &[CloneOutcome]) {
    let area = centered_rect(70, 12, frame.area());
    frame.render_widget(Clear, area);

    let block = Block::default()
        .borders(Borders::ALL)
        .title(title_span("Cloning"));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(0)])
        .split(inner);

    let ratio = if total == 0 {
        0.0
    } else {
        finished as f64 / total as f64
    };
    let gauge = Gauge::default()
        .gauge_style(Style::default().fg(Color::Green))
        .ratio(ratio.clamp(0.0, 1.0))
        .label(format!("{}/{}", finished, total));
    frame.render_widget(gauge, chunks[0]);

    // Newest outcomes at the bottom.
    let visible = chunks[1].height as usize;
    let lines: Vec<Line> = recent
        .iter()
        .skip(recent.len().saturating_sub(visible))
        .map(outcome_line)
        .collect();
    frame.render_widget(Paragraph::new(lines), chunks[1]);
}

fn outcome_line(outcome: &CloneOutcome) -> Line<'static> {
    let color = match outcome {
        CloneOutcome::Succeeded(_) => Color::Green,
        CloneOutcome::Skipped(_) => Color::Gray,
        CloneOutcome::Failed(..) => Color::Red,
    };
    Line::from(Span::styled(outcome.to_string(), Style::default().fg(color)))
}

/// Summary counts above a scrollable list of every failed repository.
pub fn render_report(frame: &mut Frame, report: &CloneReport, selected: usize) {
    // Borders, summary line, spacer, then one row per failure.
    let height = (report.failed.len() + 4).max(5) as u16;
    let area = centered_rect(70, height, frame.area());
    frame.render_widget(Clear, area);

    let title = if report.failed.is_empty() {
        "Clone complete"
    } else {
        "Clone finished with failures"
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .title(title_span(title));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(2), Constraint::Min(0)])
        .split(inner);

    let summary = Line::from(vec![
        Span::styled(
            format!("{} cloned", report.succeeded),
            Style::default().fg(Color::Green),
        ),
        Span::raw("  "),
        Span::styled(
            format!("{} skipped", report.skipped),
            Style::default().fg(Color::Gray),
        ),
        Span::raw("  "),
        Span::styled(
            format!("{} failed", report.failed.len()),
            Style::default().fg(Color::Red),
        ),
    ]);
    frame.render_widget(Paragraph::new(summary).alignment(Alignment::Center), chunks[0]);

    if report.failed.is_empty() {
        return;
    }

    let items: Vec<ListItem> = report
        .failed
        .iter()
        .map(|(repo, reason)| {
            ListItem::new(Line::from(vec![
                Span::styled(format!("{}: ", repo), Style::default().fg(Color::Red)),
                Span::raw(reason.clone()),
            ]))
        })
        .collect();
    let list = List::new(items).highlight_style(Style::default().bg(Color::DarkGray));

    let mut state = ListState::default();
    state.select(Some(selected.min(report.failed.len() - 1)));
    frame.render_stateful_widget(list, chunks[1], &mut state);
}

/// Create a centered rect of a fixed size, clipped to the outer rect
fn centered_rect(width: u16, height: u16, outer: Rect) -> Rect {
    let popup_width = width.min(outer.width);
    let popup_height = height.min(outer.height);

    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length((outer.height.saturating_sub(popup_height)) / 2),
            Constraint::Length(popup_height),
            Constraint::Min(0),
        ])
        .split(outer);

    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length((outer.width.saturating_sub(popup_width)) / 2),
            Constraint::Length(popup_width),
            Constraint::Min(0),
        ])
        .split(vertical[1]);

    horizontal[1]
}
