//! Application state and user-action logic.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Result;
use time::macros::format_description;
use time::OffsetDateTime;

use crate::config::ConnectionConfig;
use crate::data::{now_ms, DeviceTracker, LivenessChange, TelemetryWindow};
use crate::logbook::{LogKind, Logbook};
use crate::message::{MessageKind, Payload};
use crate::mqtt::{LinkStatus, MqttHandle, MqttSupervisor, PublishBody};
use crate::source::{EventSource, LinkEvent, NoticeLevel};
use crate::ui::Theme;

/// The current view/tab in the TUI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    /// Telemetry cards, chart, and device status.
    Dashboard,
    /// The activity log.
    Log,
    /// Connection settings.
    Settings,
}

impl View {
    /// Cycle to the next view.
    pub fn next(self) -> Self {
        match self {
            View::Dashboard => View::Log,
            View::Log => View::Settings,
            View::Settings => View::Dashboard,
        }
    }

    /// Cycle to the previous view.
    pub fn prev(self) -> Self {
        match self {
            View::Dashboard => View::Settings,
            View::Log => View::Dashboard,
            View::Settings => View::Log,
        }
    }

    /// Returns the display label for this view.
    pub fn label(&self) -> &'static str {
        match self {
            View::Dashboard => "Dashboard",
            View::Log => "Log",
            View::Settings => "Settings",
        }
    }
}

/// Which text input, if any, is currently capturing keystrokes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    /// Typing a free-form control message.
    Publish,
    /// Editing the selected settings field.
    EditField,
}

/// Preset control commands offered on the dashboard.
pub const PRESETS: &[(&str, &str)] = &[
    ("LED on", r#"{"command":"led","value":"on"}"#),
    ("LED off", r#"{"command":"led","value":"off"}"#),
    ("Restart", r#"{"command":"restart"}"#),
    ("Status", r#"{"command":"status"}"#),
];

/// The canonical telemetry cards shown on the dashboard.
pub const CARD_SERIES: &[&str] = &["temperature", "humidity", "speed", "pressure"];

/// Labels for the editable settings fields, in display order.
pub const SETTINGS_FIELDS: &[&str] = &[
    "Broker URL",
    "Client ID",
    "Username",
    "Password",
    "Subscribe topic",
    "Publish topic",
    "Heartbeat interval (s)",
    "Heartbeat topic",
];

/// Main application state.
pub struct App {
    pub running: bool,
    pub current_view: View,
    pub show_help: bool,
    pub theme: Theme,

    // Link
    source: Option<Box<dyn EventSource>>,
    handle: Option<MqttHandle>,
    pub link_status: LinkStatus,
    pub heartbeat_running: bool,
    runtime: Option<tokio::runtime::Handle>,

    // Configuration
    pub config: ConnectionConfig,
    config_path: PathBuf,

    // Core telemetry state
    pub window: TelemetryWindow,
    pub tracker: DeviceTracker,
    pub logbook: Logbook,
    /// Latest value seen per canonical series, for the cards.
    pub cards: BTreeMap<String, f64>,

    // Text input
    pub input_mode: InputMode,
    pub input_buffer: String,
    pub settings_selected: usize,

    // Log view
    pub auto_scroll: bool,
    pub log_scroll: usize,

    // Status message (temporary feedback)
    pub status_message: Option<(String, std::time::Instant)>,
}

impl App {
    /// Create a new App.
    ///
    /// `runtime` is the handle the MQTT supervisor is spawned onto; pass
    /// `None` when the app is driven purely through
    /// [`attach_source`](Self::attach_source) (tests, embedding).
    pub fn new(
        config: ConnectionConfig,
        config_path: PathBuf,
        window: TelemetryWindow,
        runtime: Option<tokio::runtime::Handle>,
    ) -> Self {
        Self {
            running: true,
            current_view: View::Dashboard,
            show_help: false,
            theme: Theme::auto_detect(),
            source: None,
            handle: None,
            link_status: LinkStatus::Disconnected,
            heartbeat_running: false,
            runtime,
            config,
            config_path,
            window,
            tracker: DeviceTracker::default(),
            logbook: Logbook::new(),
            cards: BTreeMap::new(),
            input_mode: InputMode::Normal,
            input_buffer: String::new(),
            settings_selected: 0,
            auto_scroll: true,
            log_scroll: 0,
            status_message: None,
        }
    }

    /// Attach an externally driven event source (no supervisor spawned).
    pub fn attach_source(&mut self, source: Box<dyn EventSource>) {
        self.source = Some(source);
    }

    /// Returns a description of the current link source, if any.
    pub fn source_description(&self) -> Option<&str> {
        self.source.as_deref().map(|s| s.description())
    }

    /// Set a temporary status message that will be shown for a few seconds.
    pub fn set_status_message(&mut self, message: String) {
        self.status_message = Some((message, std::time::Instant::now()));
    }

    /// Get the current status message if it hasn't expired (3 seconds).
    pub fn get_status_message(&self) -> Option<&str> {
        if let Some((msg, time)) = &self.status_message {
            if time.elapsed() < std::time::Duration::from_secs(3) {
                return Some(msg);
            }
        }
        None
    }

    // ---- periodic work -------------------------------------------------

    /// Drain pending link events and advance the liveness deadline.
    /// Called once per UI frame.
    pub fn on_tick(&mut self) {
        let now = now_ms();
        self.drain_events(now);
        if self.tracker.tick(now) == Some(LivenessChange::WentOffline) {
            self.logbook.add(LogKind::Warning, "device offline (heartbeat timeout)");
        }
    }

    fn drain_events(&mut self, now: i64) {
        let Some(source) = self.source.as_mut() else {
            return;
        };
        // Cap per frame so a flood can't starve the UI.
        let mut events = Vec::new();
        while let Some(event) = source.poll() {
            events.push(event);
            if events.len() >= 256 {
                break;
            }
        }
        for event in events {
            self.apply_event(event, now);
        }
    }

    /// Apply one link event to the application state.
    pub fn apply_event(&mut self, event: LinkEvent, now: i64) {
        match event {
            LinkEvent::Connected => {
                self.link_status = LinkStatus::Connected;
            }
            LinkEvent::Reconnecting => {
                // Transient: device liveness and chart data stay intact.
                self.link_status = LinkStatus::Reconnecting;
            }
            LinkEvent::Disconnected { requested } => {
                self.link_status = LinkStatus::Disconnected;
                self.heartbeat_running = false;
                if self.tracker.force_offline() == Some(LivenessChange::WentOffline) {
                    self.logbook.add(LogKind::Warning, "device offline (link down)");
                }
                if requested {
                    self.handle = None;
                    self.source = None;
                    self.logbook.add(LogKind::Info, "disconnected");
                }
            }
            LinkEvent::Message { topic, payload } => {
                self.apply_message(&topic, &payload, now);
            }
            LinkEvent::Notice { level, text } => {
                let kind = match level {
                    NoticeLevel::Info => LogKind::Info,
                    NoticeLevel::Success => LogKind::Success,
                    NoticeLevel::Warning => LogKind::Warning,
                    NoticeLevel::Error => LogKind::Error,
                    NoticeLevel::Sent => LogKind::Sent,
                };
                self.logbook.add(kind, text);
            }
        }
    }

    fn apply_message(&mut self, topic: &str, bytes: &[u8], now: i64) {
        let payload = Payload::decode(bytes);
        self.logbook.add(LogKind::Received, format!("[{}] {}", topic, payload.display()));

        let kind = payload.classify();
        if self.tracker.observe(kind, now) == Some(LivenessChange::CameOnline) {
            self.logbook.add(LogKind::Success, "device online");
        }

        // A plain-text announcement carries no telemetry.
        if matches!(payload, Payload::Text(_)) && kind == MessageKind::OnlineAnnouncement {
            return;
        }

        let timestamp = payload.embedded_timestamp_ms().unwrap_or(now);
        for (series, value) in payload.metrics() {
            self.cards.insert(series.clone(), value);
            self.window.ingest_at(&series, timestamp, value, now);
        }
    }

    // ---- connection actions --------------------------------------------

    /// Open the link with the current configuration.
    pub fn connect(&mut self) {
        if self.link_status != LinkStatus::Disconnected {
            self.logbook.add(LogKind::Info, "already connected");
            return;
        }
        if self.config.broker_url.trim().is_empty() {
            self.logbook.add(LogKind::Error, "broker URL is empty");
            return;
        }
        let Some(runtime) = self.runtime.clone() else {
            self.logbook.add(LogKind::Error, "no async runtime available");
            return;
        };

        let _guard = runtime.enter();
        match MqttSupervisor::spawn(self.config.clone()) {
            Ok((handle, source)) => {
                self.handle = Some(handle);
                self.source = Some(Box::new(source));
                self.link_status = LinkStatus::Connecting;
            }
            Err(e) => {
                // No transport could be constructed; surfaced, no retry.
                self.logbook.add(LogKind::Error, e.to_string());
            }
        }
    }

    /// Close the link on user request.
    pub fn disconnect(&mut self) {
        match &self.handle {
            Some(handle) => {
                handle.disconnect();
            }
            None => self.logbook.add(LogKind::Info, "not connected"),
        }
    }

    /// Publish a message; structured bodies are detected from the text.
    /// Returns whether the message was handed to the link.
    pub fn publish(&mut self, topic: &str, text: &str) -> bool {
        if topic.trim().is_empty() {
            self.set_status_message("publish topic is not set".to_string());
            return false;
        }
        if self.link_status != LinkStatus::Connected {
            self.logbook.add(
                LogKind::Error,
                format!("not connected, message to {} dropped", topic),
            );
            return false;
        }
        let body = match serde_json::from_str::<serde_json::Value>(text) {
            Ok(value) if value.is_object() => PublishBody::Json(value),
            _ => PublishBody::Text(text.to_string()),
        };
        match &self.handle {
            Some(handle) => handle.publish(topic.trim(), body),
            None => false,
        }
    }

    /// Publish one of the preset control commands.
    pub fn send_preset(&mut self, index: usize) {
        let Some((label, body)) = PRESETS.get(index) else {
            return;
        };
        let topic = self.config.publish_topic.clone();
        if self.publish(&topic, body) {
            self.set_status_message(format!("sent preset: {}", label));
        }
    }

    /// Start the recurring heartbeat publish.
    pub fn start_heartbeat(&mut self) {
        if self.heartbeat_running {
            return;
        }
        if self.config.heartbeat_topic.trim().is_empty() {
            self.set_status_message("heartbeat topic is not set".to_string());
            return;
        }
        if let Some(handle) = &self.handle {
            if handle.start_heartbeat(self.config.heartbeat_interval, &self.config.heartbeat_topic)
            {
                self.heartbeat_running = true;
            }
        } else {
            self.logbook.add(LogKind::Error, "not connected, heartbeat not started");
        }
    }

    /// Stop the recurring heartbeat publish.
    pub fn stop_heartbeat(&mut self) {
        if let Some(handle) = &self.handle {
            handle.stop_heartbeat();
        }
        self.heartbeat_running = false;
    }

    // ---- configuration actions -----------------------------------------

    pub fn save_config(&mut self) {
        match self.config.save(&self.config_path) {
            Ok(()) => self.logbook.add(LogKind::Info, "configuration saved"),
            Err(e) => {
                self.logbook.add(LogKind::Error, format!("saving configuration failed: {}", e))
            }
        }
    }

    pub fn load_config(&mut self) {
        self.config = ConnectionConfig::load(&self.config_path);
        self.logbook.add(LogKind::Info, "configuration loaded");
    }

    pub fn reset_config(&mut self) {
        self.config = ConnectionConfig::reset(&self.config_path);
        self.logbook.add(LogKind::Info, "configuration reset to defaults");
    }

    pub fn randomize_client_id(&mut self) {
        self.config.client_id = ConnectionConfig::random_client_id();
    }

    // ---- chart / log actions -------------------------------------------

    /// Drop all chart data and card values.
    pub fn clear_chart(&mut self) {
        self.window.reset();
        self.cards.clear();
        self.logbook.add(LogKind::Info, "chart data cleared");
    }

    pub fn clear_log(&mut self) {
        self.logbook.clear();
        self.log_scroll = 0;
    }

    /// Scroll the log view up, pausing auto-scroll.
    pub fn scroll_log_up(&mut self, n: usize) {
        self.auto_scroll = false;
        self.log_scroll = self.log_scroll.saturating_sub(n);
    }

    /// Scroll the log view down.
    pub fn scroll_log_down(&mut self, n: usize) {
        self.log_scroll = (self.log_scroll + n).min(self.logbook.len().saturating_sub(1));
    }

    /// Toggle tail-following of the log.
    pub fn toggle_auto_scroll(&mut self) {
        self.auto_scroll = !self.auto_scroll;
    }

    /// Export the current window to a CSV file at `path`.
    pub fn export_csv(&self, path: &Path) -> Result<()> {
        let view = self.window.render();
        if view.series.is_empty() {
            anyhow::bail!("no data to export");
        }
        std::fs::write(path, view.to_csv())?;
        Ok(())
    }

    /// The default export file name, `mqtt_data_<date>.csv`.
    pub fn default_export_path(&self) -> PathBuf {
        let format = format_description!("[year]-[month]-[day]");
        let date = OffsetDateTime::now_utc().format(&format).unwrap_or_default();
        PathBuf::from(format!("mqtt_data_{}.csv", date))
    }

    // ---- view navigation -----------------------------------------------

    pub fn next_view(&mut self) {
        self.current_view = self.current_view.next();
    }

    pub fn prev_view(&mut self) {
        self.current_view = self.current_view.prev();
    }

    pub fn set_view(&mut self, view: View) {
        self.current_view = view;
    }

    pub fn toggle_help(&mut self) {
        self.show_help = !self.show_help;
    }

    pub fn quit(&mut self) {
        self.running = false;
    }

    // ---- text input ----------------------------------------------------

    /// Begin typing a free-form control message.
    pub fn start_publish_input(&mut self) {
        self.input_mode = InputMode::Publish;
        self.input_buffer.clear();
    }

    /// Send the typed control message and leave input mode.
    pub fn commit_publish_input(&mut self) {
        let text = self.input_buffer.trim().to_string();
        self.input_mode = InputMode::Normal;
        self.input_buffer.clear();
        if text.is_empty() {
            return;
        }
        let topic = self.config.publish_topic.clone();
        self.publish(&topic, &text);
    }

    /// Begin editing the selected settings field.
    pub fn start_field_edit(&mut self) {
        self.input_mode = InputMode::EditField;
        self.input_buffer = self.field_value(self.settings_selected);
    }

    /// Commit the edited field value and leave input mode.
    pub fn commit_field_edit(&mut self) {
        let value = std::mem::take(&mut self.input_buffer);
        self.input_mode = InputMode::Normal;
        let value = value.trim();
        match self.settings_selected {
            0 => self.config.broker_url = value.to_string(),
            1 => self.config.client_id = value.to_string(),
            2 => self.config.username = value.to_string(),
            3 => self.config.password = value.to_string(),
            4 => self.config.subscribe_topic = value.to_string(),
            5 => self.config.publish_topic = value.to_string(),
            6 => self.config.heartbeat_interval = value.parse().unwrap_or(30),
            7 => self.config.heartbeat_topic = value.to_string(),
            _ => {}
        }
    }

    /// Abandon the current text input.
    pub fn cancel_input(&mut self) {
        self.input_mode = InputMode::Normal;
        self.input_buffer.clear();
    }

    pub fn input_push(&mut self, c: char) {
        self.input_buffer.push(c);
    }

    pub fn input_pop(&mut self) {
        self.input_buffer.pop();
    }

    /// Current value of a settings field for display and editing.
    pub fn field_value(&self, index: usize) -> String {
        match index {
            0 => self.config.broker_url.clone(),
            1 => self.config.client_id.clone(),
            2 => self.config.username.clone(),
            3 => self.config.password.clone(),
            4 => self.config.subscribe_topic.clone(),
            5 => self.config.publish_topic.clone(),
            6 => self.config.heartbeat_interval.to_string(),
            7 => self.config.heartbeat_topic.clone(),
            _ => String::new(),
        }
    }

    pub fn select_next_field(&mut self) {
        self.settings_selected = (self.settings_selected + 1).min(SETTINGS_FIELDS.len() - 1);
    }

    pub fn select_prev_field(&mut self) {
        self.settings_selected = self.settings_selected.saturating_sub(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::DEFAULT_SLOT_MS;
    use crate::source::ChannelSource;
    use time::UtcOffset;

    fn test_app() -> App {
        App::new(
            ConnectionConfig::default(),
            PathBuf::from("/tmp/mqttwatch-test.json"),
            TelemetryWindow::with_offset(60_000, DEFAULT_SLOT_MS, UtcOffset::UTC),
            None,
        )
    }

    #[test]
    fn test_message_event_feeds_tracker_and_window() {
        let mut app = test_app();
        let event = LinkEvent::Message {
            topic: "device/data".to_string(),
            payload: b"temp=21.5 hum=40".to_vec(),
        };
        app.apply_event(event, 10_000);

        assert!(app.tracker.status().online);
        assert_eq!(app.cards.get("temperature"), Some(&21.5));
        assert_eq!(app.cards.get("humidity"), Some(&40.0));

        let view = app.window.render_at(10_000);
        let names: Vec<_> = view.series.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["temperature", "humidity"]);
    }

    #[test]
    fn test_text_announcement_skips_extraction() {
        let mut app = test_app();
        let event = LinkEvent::Message {
            topic: "device/data".to_string(),
            payload: b"hello from esp32 fw=2".to_vec(),
        };
        app.apply_event(event, 10_000);

        assert!(app.tracker.status().online);
        assert!(app.cards.is_empty());
        assert!(app.window.is_empty());
    }

    #[test]
    fn test_structured_heartbeat_still_extracts() {
        let mut app = test_app();
        let event = LinkEvent::Message {
            topic: "device/data".to_string(),
            payload: br#"{"type":"heartbeat","temp":19.0}"#.to_vec(),
        };
        app.apply_event(event, 10_000);

        assert_eq!(app.tracker.status().heartbeat_count, 1);
        assert_eq!(app.cards.get("temperature"), Some(&19.0));
    }

    #[test]
    fn test_embedded_timestamp_wins() {
        let mut app = test_app();
        let event = LinkEvent::Message {
            topic: "device/data".to_string(),
            payload: br#"{"timestamp":4000,"speed":7.0}"#.to_vec(),
        };
        app.apply_event(event, 10_000);

        let view = app.window.render_at(10_000);
        let speed = view.series.iter().find(|s| s.name == "speed").unwrap();
        // ts=4000 lands in the slot closing at 5000 (start 0).
        let index = view.slot_starts.iter().position(|&s| s == 0).unwrap();
        assert_eq!(speed.values[index], Some(7.0));
    }

    #[test]
    fn test_disconnect_event_resets_device_state() {
        let mut app = test_app();
        app.apply_event(
            LinkEvent::Message { topic: "t".to_string(), payload: b"heartbeat".to_vec() },
            1_000,
        );
        app.link_status = LinkStatus::Connected;
        app.heartbeat_running = true;

        app.apply_event(LinkEvent::Disconnected { requested: false }, 2_000);
        assert_eq!(app.link_status, LinkStatus::Disconnected);
        assert!(!app.heartbeat_running);
        assert!(!app.tracker.status().online);
        // Chart data survives a link loss.
        assert!(!app.window.is_empty());
    }

    #[test]
    fn test_reconnecting_leaves_state_untouched() {
        let mut app = test_app();
        app.apply_event(
            LinkEvent::Message { topic: "t".to_string(), payload: b"temp=1".to_vec() },
            1_000,
        );
        app.apply_event(LinkEvent::Reconnecting, 2_000);

        assert_eq!(app.link_status, LinkStatus::Reconnecting);
        assert!(app.tracker.status().online);
        assert!(!app.window.is_empty());
    }

    #[test]
    fn test_publish_while_disconnected_is_rejected_locally() {
        let mut app = test_app();
        assert!(!app.publish("device/control", "hello"));
        let last = app.logbook.iter().last().unwrap();
        assert_eq!(last.kind, LogKind::Error);
        assert!(last.text.contains("not connected"));
    }

    #[test]
    fn test_channel_source_drives_app() {
        let mut app = test_app();
        let (tx, source) = ChannelSource::create("test");
        app.attach_source(Box::new(source));

        tx.send(LinkEvent::Connected).unwrap();
        tx.send(LinkEvent::Message {
            topic: "device/data".to_string(),
            payload: b"pressure=1013".to_vec(),
        })
        .unwrap();

        app.on_tick();
        assert_eq!(app.link_status, LinkStatus::Connected);
        assert_eq!(app.cards.get("pressure"), Some(&1013.0));
    }

    #[test]
    fn test_liveness_timeout_via_tracker_tick() {
        let mut app = test_app();
        app.apply_event(
            LinkEvent::Message { topic: "t".to_string(), payload: b"heartbeat".to_vec() },
            1_000,
        );
        assert!(app.tracker.status().online);

        assert_eq!(app.tracker.tick(31_000), Some(LivenessChange::WentOffline));
        assert!(!app.tracker.status().online);
    }

    #[test]
    fn test_export_csv_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("export.csv");

        let mut app = test_app();
        let now = now_ms();
        app.window.ingest_at("a", now, 1.0, now);
        app.export_csv(&path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("Timestamp,a\n"));
    }

    #[test]
    fn test_export_csv_without_data_fails() {
        let app = test_app();
        assert!(app.export_csv(Path::new("/tmp/never-written.csv")).is_err());
    }

    #[test]
    fn test_field_edit_round_trip() {
        let mut app = test_app();
        app.settings_selected = 6;
        app.start_field_edit();
        assert_eq!(app.input_buffer, "30");

        app.input_buffer = "15".to_string();
        app.commit_field_edit();
        assert_eq!(app.config.heartbeat_interval, 15);

        // Garbage falls back to the default interval.
        app.settings_selected = 6;
        app.start_field_edit();
        app.input_buffer = "abc".to_string();
        app.commit_field_edit();
        assert_eq!(app.config.heartbeat_interval, 30);
    }

    #[test]
    fn test_view_cycling() {
        let mut app = test_app();
        assert_eq!(app.current_view, View::Dashboard);
        app.next_view();
        assert_eq!(app.current_view, View::Log);
        app.next_view();
        app.next_view();
        assert_eq!(app.current_view, View::Dashboard);
        app.prev_view();
        assert_eq!(app.current_view, View::Settings);
    }

    #[test]
    fn test_default_export_path_shape() {
        let app = test_app();
        let path = app.default_export_path();
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("mqtt_data_"));
        assert!(name.ends_with(".csv"));
    }
}
