//! Dashboard view rendering.
//!
//! Telemetry cards on top, the rolling time-series chart in the middle,
//! and the device status panel at the bottom.

use ratatui::{
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType, Paragraph},
    Frame,
};
use time::macros::format_description;
use time::OffsetDateTime;

use crate::app::{App, CARD_SERIES, PRESETS};
use crate::data::{now_ms, WindowView};

/// Render the Dashboard view.
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::vertical([
        Constraint::Length(4), // Cards
        Constraint::Min(8),    // Chart
        Constraint::Length(4), // Device status + presets
    ])
    .split(area);

    render_cards(frame, app, chunks[0]);
    render_chart(frame, app, chunks[1]);
    render_device_panel(frame, app, chunks[2]);
}

/// One bordered card per canonical telemetry series.
fn render_cards(frame: &mut Frame, app: &App, area: Rect) {
    let columns = Layout::horizontal(vec![
        Constraint::Ratio(1, CARD_SERIES.len() as u32);
        CARD_SERIES.len()
    ])
    .split(area);

    for (i, series) in CARD_SERIES.iter().enumerate() {
        let value = app
            .cards
            .get(*series)
            .map(|v| format_value(*v))
            .unwrap_or_else(|| "--".to_string());

        let card = Paragraph::new(Line::from(Span::styled(
            value,
            Style::default().add_modifier(Modifier::BOLD),
        )))
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .title(format!(" {} ", series))
                .title_style(app.theme.header)
                .borders(Borders::ALL)
                .border_type(app.theme.border_type)
                .border_style(Style::default().fg(app.theme.border)),
        );
        frame.render_widget(card, columns[i]);
    }
}

/// The rolling multi-series chart over the current window view.
fn render_chart(frame: &mut Frame, app: &App, area: Rect) {
    let view = app.window.render();

    let block = Block::default()
        .title(" Telemetry ")
        .title_style(app.theme.header)
        .borders(Borders::ALL)
        .border_type(app.theme.border_type)
        .border_style(Style::default().fg(app.theme.border));

    if view.series.is_empty() {
        let empty = Paragraph::new("no data")
            .alignment(Alignment::Center)
            .style(app.theme.tab_inactive)
            .block(block);
        frame.render_widget(empty, area);
        return;
    }

    let segments = chart_segments(app, &view);
    let datasets: Vec<Dataset> = segments
        .iter()
        .map(|segment| {
            let mut dataset = Dataset::default()
                .marker(symbols::Marker::Braille)
                .graph_type(GraphType::Line)
                .style(Style::default().fg(segment.color))
                .data(&segment.points);
            // Name only the first segment of a series so the legend
            // lists each series once.
            if let Some(name) = &segment.legend {
                dataset = dataset.name(name.clone());
            }
            dataset
        })
        .collect();

    let x_start = *view.slot_starts.first().unwrap_or(&0) as f64 / 1000.0;
    let x_end = *view.slot_starts.last().unwrap_or(&0) as f64 / 1000.0;
    let x_labels = edge_labels(&view);

    let (y_min, y_max) = view.bounds.unwrap_or((0.0, 1.0));
    let y_labels = vec![
        Line::from(format_value(y_min)),
        Line::from(format_value((y_min + y_max) / 2.0)),
        Line::from(format_value(y_max)),
    ];

    let chart = Chart::new(datasets)
        .block(block)
        .x_axis(
            Axis::default()
                .bounds([x_start, x_end])
                .labels(x_labels)
                .style(Style::default().fg(app.theme.border)),
        )
        .y_axis(
            Axis::default()
                .bounds([y_min, y_max])
                .labels(y_labels)
                .style(Style::default().fg(app.theme.border)),
        );

    frame.render_widget(chart, area);
}

/// A drawable run of consecutive present values for one series.
struct ChartSegment {
    /// Series name, set on the first segment only.
    legend: Option<String>,
    color: Color,
    points: Vec<(f64, f64)>,
}

/// Split each series into contiguous runs so a gap renders as a gap
/// instead of a line bridging it.
fn chart_segments(app: &App, view: &WindowView) -> Vec<ChartSegment> {
    let mut segments = Vec::new();
    for (series_index, series) in view.series.iter().enumerate() {
        let color = app.theme.series_color(series_index);
        let mut named = false;
        let mut run: Vec<(f64, f64)> = Vec::new();

        for (i, value) in series.values.iter().enumerate() {
            match value {
                Some(v) => run.push((view.slot_starts[i] as f64 / 1000.0, *v)),
                None => {
                    if !run.is_empty() {
                        segments.push(ChartSegment {
                            legend: (!named).then(|| series.name.clone()),
                            color,
                            points: std::mem::take(&mut run),
                        });
                        named = true;
                    }
                }
            }
        }
        if !run.is_empty() {
            segments.push(ChartSegment {
                legend: (!named).then(|| series.name.clone()),
                color,
                points: run,
            });
        }
    }
    segments
}

/// First, middle and last slot labels for the x axis.
fn edge_labels(view: &WindowView) -> Vec<Line<'static>> {
    let mut labels = Vec::new();
    if let Some(first) = view.slot_labels.first() {
        labels.push(Line::from(first.clone()));
    }
    if view.slot_labels.len() > 2 {
        labels.push(Line::from(view.slot_labels[view.slot_labels.len() / 2].clone()));
    }
    if let Some(last) = view.slot_labels.last() {
        if view.slot_labels.len() > 1 {
            labels.push(Line::from(last.clone()));
        }
    }
    labels
}

/// Device status plus the preset command strip.
fn render_device_panel(frame: &mut Frame, app: &App, area: Rect) {
    let device = app.tracker.status();
    let now = now_ms();

    let (dot_style, state) = if device.online {
        (Style::default().fg(app.theme.online), "online")
    } else {
        (Style::default().fg(app.theme.offline), "offline")
    };

    let last_heartbeat = device
        .last_heartbeat_ms
        .map(format_time_of_day)
        .unwrap_or_else(|| "--".to_string());
    let online_for = app
        .tracker
        .online_duration_ms(now)
        .map(format_duration_ms)
        .unwrap_or_else(|| "--".to_string());

    let status_line = Line::from(vec![
        Span::styled(" ● ", dot_style),
        Span::styled(state, dot_style.add_modifier(Modifier::BOLD)),
        Span::raw(format!(
            "   last heartbeat: {}   heartbeats: {}   online for: {}",
            last_heartbeat, device.heartbeat_count, online_for
        )),
    ]);

    let mut preset_spans = vec![Span::raw(" presets: ")];
    for (i, (label, _)) in PRESETS.iter().enumerate() {
        preset_spans.push(Span::styled(
            format!("F{}:{} ", i + 1, label),
            app.theme.tab_inactive,
        ));
    }

    let panel = Paragraph::new(vec![status_line, Line::from(preset_spans)]).block(
        Block::default()
            .title(" Device ")
            .title_style(app.theme.header)
            .borders(Borders::ALL)
            .border_type(app.theme.border_type)
            .border_style(Style::default().fg(app.theme.border)),
    );
    frame.render_widget(panel, area);
}

/// Format a telemetry value without trailing noise.
fn format_value(value: f64) -> String {
    if value == value.trunc() && value.abs() < 1e9 {
        format!("{}", value as i64)
    } else {
        format!("{:.2}", value)
    }
}

/// Format an epoch-millisecond instant as local `HH:MM:SS`.
fn format_time_of_day(ms: i64) -> String {
    let format = format_description!("[hour]:[minute]:[second]");
    OffsetDateTime::from_unix_timestamp(ms.div_euclid(1000))
        .ok()
        .map(|t| {
            t.to_offset(time::UtcOffset::current_local_offset().unwrap_or(time::UtcOffset::UTC))
        })
        .and_then(|t| t.format(&format).ok())
        .unwrap_or_else(|| "--".to_string())
}

/// Format a duration in milliseconds as `1h 2m 3s` / `2m 3s` / `3s`.
fn format_duration_ms(ms: i64) -> String {
    let total_secs = ms / 1000;
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(21.0), "21");
        assert_eq!(format_value(21.456), "21.46");
        assert_eq!(format_value(-3.0), "-3");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration_ms(5_000), "5s");
        assert_eq!(format_duration_ms(125_000), "2m 5s");
        assert_eq!(format_duration_ms(3_725_000), "1h 2m 5s");
    }
}
