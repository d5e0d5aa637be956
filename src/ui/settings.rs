//! Settings view rendering.
//!
//! Lists the connection configuration fields with the selected one
//! highlighted; the field under edit shows the live input buffer.

use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::app::{App, InputMode, SETTINGS_FIELDS};

/// Render the Settings view.
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .title(" Connection settings ")
        .title_style(app.theme.header)
        .borders(Borders::ALL)
        .border_type(app.theme.border_type)
        .border_style(Style::default().fg(app.theme.border));

    let mut lines = Vec::with_capacity(SETTINGS_FIELDS.len() + 2);
    for (i, label) in SETTINGS_FIELDS.iter().enumerate() {
        let selected = i == app.settings_selected;
        let editing = selected && app.input_mode == InputMode::EditField;

        let value = if editing {
            format!("{}▏", app.input_buffer)
        } else if *label == "Password" && !app.config.password.is_empty() {
            "*".repeat(app.config.password.len())
        } else {
            app.field_value(i)
        };

        let marker = if selected { "▶ " } else { "  " };
        let label_style = if selected { app.theme.selected } else { Style::default() };

        lines.push(Line::from(vec![
            Span::raw(marker),
            Span::styled(format!("{:<24}", label), label_style),
            Span::styled(value, Style::default().fg(app.theme.highlight)),
        ]));
    }

    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "  Enter:edit  s:save  l:load  R:reset  g:random client id",
        app.theme.tab_inactive,
    )));

    frame.render_widget(Paragraph::new(lines).block(block), area);
}
