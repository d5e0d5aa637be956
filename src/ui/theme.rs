//! Theme configuration for the TUI.
//!
//! Supports light and dark themes with automatic terminal detection.

use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::block::BorderType;

use crate::logbook::LogKind;
use crate::mqtt::LinkStatus;

/// Line colors assigned to chart series in insertion order.
const SERIES_COLORS: &[Color] = &[
    Color::Cyan,
    Color::Red,
    Color::Blue,
    Color::Yellow,
    Color::Magenta,
    Color::Green,
    Color::Gray,
    Color::LightBlue,
];

/// Color and style theme for the TUI.
///
/// Use [`Theme::auto_detect()`] for automatic theme selection based on
/// terminal background, or [`Theme::dark()`]/[`Theme::light()`] explicitly.
#[derive(Debug, Clone)]
pub struct Theme {
    /// Accent color for highlights and active elements.
    pub highlight: Color,
    /// Color for the online device state and success log lines.
    pub online: Color,
    /// Color for the offline device state and error log lines.
    pub offline: Color,
    /// Color for warnings.
    pub warning: Color,
    /// Color for borders and separators.
    pub border: Color,
    /// Style for header rows and card titles.
    pub header: Style,
    /// Style for selected rows.
    pub selected: Style,
    /// Style for the active tab.
    pub tab_active: Style,
    /// Style for inactive tabs.
    pub tab_inactive: Style,
    /// Border style (rounded, plain, etc.).
    pub border_type: BorderType,
}

impl Theme {
    /// Create a dark theme suitable for dark terminal backgrounds.
    pub fn dark() -> Self {
        Self {
            highlight: Color::Cyan,
            online: Color::Green,
            offline: Color::Red,
            warning: Color::Yellow,
            border: Color::Gray,
            header: Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            selected: Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD),
            tab_active: Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            tab_inactive: Style::default().fg(Color::Gray),
            border_type: BorderType::Rounded,
        }
    }

    /// Create a light theme suitable for light terminal backgrounds.
    pub fn light() -> Self {
        Self {
            highlight: Color::Blue,
            online: Color::Green,
            offline: Color::Red,
            warning: Color::Yellow,
            border: Color::DarkGray,
            header: Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD),
            selected: Style::default().bg(Color::LightBlue).add_modifier(Modifier::BOLD),
            tab_active: Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD),
            tab_inactive: Style::default().fg(Color::DarkGray),
            border_type: BorderType::Rounded,
        }
    }

    /// Auto-detect based on terminal background
    pub fn auto_detect() -> Self {
        // Use terminal-light crate to detect background luminance
        match terminal_light::luma() {
            Ok(luma) if luma > 0.5 => Self::light(),
            _ => Self::dark(),
        }
    }

    /// Get style for a connection status
    pub fn link_style(&self, status: LinkStatus) -> Style {
        match status {
            LinkStatus::Connected => Style::default().fg(self.online),
            LinkStatus::Connecting | LinkStatus::Reconnecting => {
                Style::default().fg(self.warning)
            }
            LinkStatus::Disconnected => Style::default().fg(self.offline),
        }
    }

    /// Get style for a log entry kind
    pub fn log_style(&self, kind: LogKind) -> Style {
        match kind {
            LogKind::Info => Style::default(),
            LogKind::Success => Style::default().fg(self.online),
            LogKind::Warning => Style::default().fg(self.warning),
            LogKind::Error => Style::default().fg(self.offline).add_modifier(Modifier::BOLD),
            LogKind::Sent => Style::default().fg(self.highlight),
            LogKind::Received => Style::default().fg(Color::Magenta),
        }
    }

    /// Line color for the chart series at `index`.
    pub fn series_color(&self, index: usize) -> Color {
        SERIES_COLORS[index % SERIES_COLORS.len()]
    }
}
