//! Common UI components shared across views.
//!
//! This module contains the header bar, tab bar, status bar, and help overlay.

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Tabs},
    Frame,
};

use crate::app::{App, InputMode, View};

/// Render the header bar with link and device state.
pub fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let link_style = app.theme.link_style(app.link_status);
    let device = app.tracker.status();
    let (device_label, device_style) = if device.online {
        ("online", Style::default().fg(app.theme.online))
    } else {
        ("offline", Style::default().fg(app.theme.offline))
    };

    let line = Line::from(vec![
        Span::styled(" ● ", link_style),
        Span::styled("MQTTWATCH ", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw("│ link: "),
        Span::styled(app.link_status.label(), link_style),
        Span::raw(" │ device: "),
        Span::styled(device_label, device_style),
        Span::raw(" │ "),
        Span::raw(format!("{} heartbeats", device.heartbeat_count)),
        Span::raw(" │ "),
        Span::raw(app.config.broker_url.clone()),
    ]);

    frame.render_widget(Paragraph::new(line), area);
}

/// Render the tab bar showing available views.
///
/// Highlights the currently active view.
pub fn render_tabs(frame: &mut Frame, app: &App, area: Rect) {
    let titles: Vec<Line> = vec![
        Line::from(" 1:Dashboard "),
        Line::from(" 2:Log "),
        Line::from(" 3:Settings "),
    ];

    let selected = match app.current_view {
        View::Dashboard => 0,
        View::Log => 1,
        View::Settings => 2,
    };

    let tabs = Tabs::new(titles)
        .select(selected)
        .style(app.theme.tab_inactive)
        .highlight_style(app.theme.tab_active)
        .divider("|");

    frame.render_widget(tabs, area);
}

/// Render the bottom status bar: input prompt, status message, or key hints.
pub fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let line = match app.input_mode {
        InputMode::Publish => Line::from(vec![
            Span::styled("publish> ", Style::default().fg(app.theme.highlight)),
            Span::raw(app.input_buffer.clone()),
            Span::styled("▏", Style::default().add_modifier(Modifier::SLOW_BLINK)),
            Span::styled("  (Enter send, Esc cancel)", app.theme.tab_inactive),
        ]),
        InputMode::EditField => Line::from(vec![
            Span::styled("edit> ", Style::default().fg(app.theme.highlight)),
            Span::raw(app.input_buffer.clone()),
            Span::styled("▏", Style::default().add_modifier(Modifier::SLOW_BLINK)),
            Span::styled("  (Enter apply, Esc cancel)", app.theme.tab_inactive),
        ]),
        InputMode::Normal => {
            if let Some(message) = app.get_status_message() {
                Line::from(Span::styled(
                    format!(" {} ", message),
                    Style::default().fg(app.theme.highlight).add_modifier(Modifier::BOLD),
                ))
            } else {
                let hints = match app.current_view {
                    View::Dashboard => {
                        " c:connect d:disconnect p:publish F1-F4:presets h/H:heartbeat e:export x:clear ?:help q:quit"
                    }
                    View::Log => " j/k:scroll a:follow C:clear ?:help q:quit",
                    View::Settings => {
                        " ↑/↓:select Enter:edit s:save l:load R:reset g:random-id ?:help q:quit"
                    }
                };
                Line::from(Span::styled(hints, app.theme.tab_inactive))
            }
        }
    };

    frame.render_widget(Paragraph::new(line), area);
}

/// Render the help overlay listing every key binding.
pub fn render_help(frame: &mut Frame, app: &App, area: Rect) {
    let popup = centered_rect(60, 75, area);
    frame.render_widget(Clear, popup);

    let lines = vec![
        Line::from(Span::styled("Keys", app.theme.header)),
        Line::from(""),
        Line::from("  Tab / Shift-Tab   cycle views"),
        Line::from("  1 2 3             jump to view"),
        Line::from("  c / d             connect / disconnect"),
        Line::from("  p                 type a control message"),
        Line::from("  F1-F4 (dashboard) preset commands"),
        Line::from("  h / H             start / stop heartbeat"),
        Line::from("  e                 export window as CSV"),
        Line::from("  x                 clear chart data"),
        Line::from("  j / k             scroll log"),
        Line::from("  a                 toggle log follow"),
        Line::from("  C                 clear log"),
        Line::from("  Enter (settings)  edit selected field"),
        Line::from("  s / l / R         save / load / reset config"),
        Line::from("  g                 random client id"),
        Line::from("  ?                 toggle this help"),
        Line::from("  q                 quit"),
        Line::from(""),
        Line::from(Span::styled("press any key to close", app.theme.tab_inactive)),
    ];

    let paragraph = Paragraph::new(lines).block(
        Block::default()
            .title(" Help ")
            .borders(Borders::ALL)
            .border_type(app.theme.border_type)
            .border_style(Style::default().fg(app.theme.border)),
    );
    frame.render_widget(paragraph, popup);
}

/// Compute a centered rectangle taking `percent_x`/`percent_y` of `area`.
pub fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let width = area.width * percent_x / 100;
    let height = area.height * percent_y / 100;
    Rect::new(
        area.x + (area.width.saturating_sub(width)) / 2,
        area.y + (area.height.saturating_sub(height)) / 2,
        width,
        height,
    )
}
