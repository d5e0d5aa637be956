// Library crate: public API items may not be used by the binary
#![allow(unused)]

//! # mqttwatch
//!
//! A terminal dashboard and library for monitoring MQTT device telemetry.
//!
//! This crate connects to an MQTT broker, classifies inbound messages
//! (heartbeats, online announcements, data), tracks device liveness with
//! a timeout, re-buckets numeric samples into fixed-width time slots over
//! a rolling window, and renders the result as cards, a chart and an
//! activity log in an interactive terminal UI.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         Application                          │
//! │  ┌─────────┐    ┌──────────┐    ┌─────────┐    ┌──────────┐  │
//! │  │  app    │───▶│   data   │───▶│   ui    │───▶│ Terminal │  │
//! │  │ (state) │    │(liveness,│    │(render) │    │          │  │
//! │  └────┬────┘    │  window) │    └─────────┘    └──────────┘  │
//! │       │         └──────────┘                                 │
//! │       ▼                                                      │
//! │  ┌─────────┐                                                 │
//! │  │ source  │◀── MqttSource (supervisor task) | ChannelSource │
//! │  │ (input) │                                                 │
//! │  └─────────┘                                                 │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! - **[`app`]**: Application state, view navigation, and user-action logic
//! - **[`source`]**: Link event abstraction ([`EventSource`] trait) with a
//!   channel implementation for tests and embedding
//! - **[`mqtt`]**: The connection supervisor: a rumqttc event-loop task
//!   plus a pure link state machine for debounce and failover
//! - **[`data`]**: The windowed aggregator ([`TelemetryWindow`]) and the
//!   device liveness tracker ([`DeviceTracker`])
//! - **[`message`]**: Payload decoding, classification, metric extraction
//! - **[`ui`]**: Terminal rendering using ratatui
//!
//! ## Usage
//!
//! ### As a CLI tool
//!
//! ```bash
//! # Connect on startup with the saved (or default) configuration
//! mqttwatch --connect
//!
//! # Point at a local broker with a narrower window
//! mqttwatch --broker tcp://localhost:1883 --window 30 --slot 2 --connect
//! ```
//!
//! ### As a library with a channel source
//!
//! ```
//! use mqttwatch::source::{ChannelSource, LinkEvent};
//! use mqttwatch::{App, ConnectionConfig, TelemetryWindow};
//!
//! let (tx, source) = ChannelSource::create("demo");
//! let mut app = App::new(
//!     ConnectionConfig::default(),
//!     "mqttwatch.json".into(),
//!     TelemetryWindow::default(),
//!     None,
//! );
//! app.attach_source(Box::new(source));
//!
//! tx.send(LinkEvent::Message {
//!     topic: "device/data".to_string(),
//!     payload: b"temp=21.5".to_vec(),
//! })
//! .unwrap();
//! app.on_tick();
//! assert!(app.tracker.status().online);
//! ```
//!
//! ### Driving the supervisor directly
//!
//! ```no_run
//! use mqttwatch::mqtt::{MqttSupervisor, PublishBody};
//! use mqttwatch::ConnectionConfig;
//!
//! # tokio_test::block_on(async {
//! let (handle, source) = MqttSupervisor::spawn(ConnectionConfig::default()).unwrap();
//! handle.publish("device/control", PublishBody::Text("ping".to_string()));
//! handle.disconnect();
//! # });
//! ```

pub mod app;
pub mod config;
pub mod data;
pub mod events;
pub mod logbook;
pub mod message;
pub mod mqtt;
pub mod source;
pub mod ui;

// Re-export main types for convenience
pub use app::{App, View};
pub use config::ConnectionConfig;
pub use data::{DeviceStatus, DeviceTracker, TelemetryWindow, WindowView};
pub use logbook::{LogEntry, LogKind, Logbook};
pub use message::{MessageKind, Payload};
pub use mqtt::{LinkStatus, MqttHandle, MqttSupervisor};
pub use source::{ChannelSource, EventSource, LinkEvent};
