//! Log view rendering.
//!
//! Shows the bounded activity log with per-kind styling. By default the
//! view follows the tail; scrolling pauses the follow.

use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::app::App;

/// Render the Log view.
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let follow = if app.auto_scroll { "following" } else { "paused" };
    let block = Block::default()
        .title(format!(" Log ({} entries, {}) ", app.logbook.len(), follow))
        .title_style(app.theme.header)
        .borders(Borders::ALL)
        .border_type(app.theme.border_type)
        .border_style(Style::default().fg(app.theme.border));

    let inner_height = area.height.saturating_sub(2) as usize;
    let total = app.logbook.len();

    // Tail-follow unless the user scrolled away.
    let start = if app.auto_scroll {
        total.saturating_sub(inner_height)
    } else {
        app.log_scroll.min(total.saturating_sub(1))
    };

    let lines: Vec<Line> = app
        .logbook
        .iter()
        .skip(start)
        .take(inner_height)
        .map(|entry| {
            Line::from(vec![
                Span::styled(format!("{} ", entry.timestamp), app.theme.tab_inactive),
                Span::styled(
                    format!("[{:5}] ", entry.kind.tag()),
                    app.theme.log_style(entry.kind),
                ),
                Span::raw(entry.text.clone()),
            ])
        })
        .collect();

    frame.render_widget(Paragraph::new(lines).block(block), area);
}
