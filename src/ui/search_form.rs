use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

use crate::app::App;
use crate::form::{FormField, FormMode};
use crate::types::DEFAULT_LANGUAGE;

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let form = &app.form;

    let mut lines = vec![Line::from("")];
    for field in form.fields() {
        let focused = *field == form.field;
        let (label, value) = match field {
            FormField::Mode => ("Mode", form.mode.label().to_string()),
            FormField::Term => {
                let label = match form.mode {
                    FormMode::Language => "Language",
                    FormMode::Owner => "Owner",
                };
                (label, form.term().to_string())
            }
            FormField::Sort => ("Sort", form.sort.to_string()),
            FormField::Order => ("Order", form.order.to_string()),
            FormField::PerPage => ("Per page", form.per_page.clone()),
            FormField::Token => ("Token", mask(&form.token)),
        };

        let label_style = if focused {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Gray)
        };
        let value = if !focused {
            value
        } else if field.is_text() {
            format!("{}_", value)
        } else {
            format!("< {} >", value)
        };

        lines.push(Line::from(vec![
            Span::styled(if focused { "> " } else { "  " }, label_style),
            Span::styled(format!("{:<10}", label), label_style),
            Span::raw(value),
        ]));
    }

    lines.push(Line::from(""));
    if form.mode == FormMode::Language && form.language.trim().is_empty() {
        lines.push(Line::from(Span::styled(
            format!("  An empty language searches {}", DEFAULT_LANGUAGE),
            Style::default().fg(Color::DarkGray),
        )));
    }

    let paragraph =
        Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Search"));
    frame.render_widget(paragraph, area);
}

fn mask(token: &str) -> String {
    "*".repeat(token.chars().count())
}
