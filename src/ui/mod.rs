mod popup;
mod results;
mod search_form;

use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use crate::app::{App, Popup, Screen};
use crate::session::FetchState;

const SPINNER: [&str; 4] = ["|", "/", "-", "\\"];

pub fn render(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(frame.area());

    render_header(frame, app, chunks[0]);

    match app.screen {
        Screen::Search => search_form::render(frame, app, chunks[1]),
        Screen::Results => results::render(frame, app, chunks[1]),
    }

    render_status_bar(frame, app, chunks[2]);
    render_popup(frame, app);
}

fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let title = match (app.screen, app.session.query()) {
        (Screen::Results, Some(query)) => format!("grab - {}", query.describe()),
        (Screen::Results, None) => "grab - Results".to_string(),
        (Screen::Search, _) => format!("grab - Search {}", app.forge_name()),
    };

    let header = Paragraph::new(Line::from(vec![Span::styled(
        title,
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    )]))
    .style(Style::default().bg(Color::DarkGray));

    frame.render_widget(header, area);
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let status = if let Some(error) = &app.error {
        Line::from(vec![Span::styled(
            format!("Error: {}", error),
            Style::default().fg(Color::Red),
        )])
    } else if app.loading() {
        let frame_char = SPINNER[app.spinner % SPINNER.len()];
        Line::from(vec![Span::styled(
            format!("{} Loading page {}...", frame_char, loading_page(app)),
            Style::default().fg(Color::Yellow),
        )])
    } else if let Some(notice) = &app.notice {
        Line::from(vec![Span::styled(
            notice.as_str(),
            Style::default().fg(Color::Green),
        )])
    } else {
        let help = match (&app.popup, app.screen) {
            (Some(Popup::BranchSelect { .. }), _) => "j/k: nav | Enter: choose | Esc: cancel",
            (Some(Popup::Destination { .. }), _) => "type a path | Enter: clone | Esc: cancel",
            (Some(Popup::Cloning { .. }), _) => "cloning...",
            (Some(Popup::Report { .. }), _) => "j/k: scroll | Enter/Esc: close",
            (None, Screen::Search) => {
                "Tab/↑↓: field | ←→/Space: change | Enter: search | Esc: quit"
            }
            (None, Screen::Results) => {
                "j/k: nav | Space: select | a/A: all page/loaded | b: branch | n/p: page | c: clone | o: open | y: yank | /: search | q: back"
            }
        };
        Line::from(vec![Span::styled(help, Style::default().fg(Color::Gray))])
    };

    let status_bar = Paragraph::new(status).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(status_bar, area);
}

fn loading_page(app: &App) -> u32 {
    match app.session.state() {
        FetchState::Fetching { page, .. } => *page,
        _ => app.session.current_page(),
    }
}

fn render_popup(frame: &mut Frame, app: &App) {
    match &app.popup {
        Some(Popup::BranchSelect { selected, .. }) => {
            if let Some(record) = app.current_record() {
                let title = format!("Branch for {}", record.full_name());
                popup::render_select(frame, &title, &record.branches, *selected);
            }
        }
        Some(Popup::Destination { input }) => {
            let count = app.session.cache().selected_count();
            let title = format!("Clone {} repositories into", count);
            popup::render_input(frame, &title, input);
        }
        Some(Popup::Cloning {
            finished,
            total,
            recent,
        }) => popup::render_progress(frame, *finished, *total, recent),
        Some(Popup::Report { report, selected }) => {
            popup::render_report(frame, report, *selected)
        }
        None => {}
    }
}
