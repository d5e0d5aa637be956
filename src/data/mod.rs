//! Core telemetry data handling.
//!
//! This module holds the two state machines at the heart of the
//! dashboard:
//!
//! - [`series`]: re-buckets irregular numeric samples into fixed-width
//!   time slots over a sliding window ([`TelemetryWindow`] →
//!   [`WindowView`])
//! - [`liveness`]: tracks online/offline device state from message
//!   arrival with a timeout ([`DeviceTracker`])
//!
//! ## Data Flow
//!
//! ```text
//! inbound Payload
//!        │
//!        ├──▶ classify() ──▶ DeviceTracker::observe()
//!        │
//!        └──▶ metrics() ──▶ TelemetryWindow::ingest()
//!                                  │
//!                                  ▼
//!                          render() ──▶ WindowView (chart, CSV export)
//! ```

pub mod liveness;
pub mod series;

pub use liveness::{DeviceStatus, DeviceTracker, LivenessChange, DEFAULT_HEARTBEAT_TIMEOUT_MS};
pub use series::{
    now_ms, Sample, SeriesView, TelemetryWindow, WindowView, DEFAULT_SLOT_MS, DEFAULT_WINDOW_MS,
};
