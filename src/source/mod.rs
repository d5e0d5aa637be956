//! Link event source abstraction.
//!
//! This module provides a trait-based abstraction for receiving link
//! events (connection changes, inbound messages, notices) from various
//! producers: the MQTT supervisor in normal operation, or an in-memory
//! channel for tests and library embedding.

mod channel;
mod event;

pub use channel::ChannelSource;
pub use event::{LinkEvent, NoticeLevel};

use std::fmt::Debug;

/// Trait for receiving link events from a producer.
///
/// Implementations deliver events in arrival order. `poll` must be
/// non-blocking; the TUI drains it once per frame.
///
/// # Example
///
/// ```
/// use mqttwatch::source::{ChannelSource, EventSource, LinkEvent};
///
/// let (tx, mut source) = ChannelSource::create("test");
/// tx.send(LinkEvent::Connected).unwrap();
/// assert_eq!(source.poll(), Some(LinkEvent::Connected));
/// ```
pub trait EventSource: Send + Debug {
    /// Poll for the next pending event, if any.
    fn poll(&mut self) -> Option<LinkEvent>;

    /// Returns a human-readable description of the source.
    ///
    /// Used for display in the TUI status bar.
    fn description(&self) -> &str;
}
