//! Shared event types for link sources.
//!
//! These are the events a connection supervisor (or any other producer)
//! hands to the application. They form the common format between the
//! transport side and the TUI consumer.

/// Severity of a [`LinkEvent::Notice`], mirrored into the activity log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
    /// An outbound publish that went onto the wire.
    Sent,
}

/// One event emitted by a link producer.
#[derive(Debug, Clone, PartialEq)]
pub enum LinkEvent {
    /// The transport established (or re-established) a session.
    Connected,
    /// The transport dropped and is being retried; application state is
    /// left untouched.
    Reconnecting,
    /// The link is down for real: either the user asked for it
    /// (`requested`) or a drop outlived the debounce window.
    Disconnected {
        requested: bool,
    },
    /// An inbound message, raw bytes as received.
    Message {
        topic: String,
        payload: Vec<u8>,
    },
    /// Free-form progress or error text for the activity log.
    Notice {
        level: NoticeLevel,
        text: String,
    },
}

impl LinkEvent {
    /// Convenience constructor for notices.
    pub fn notice(level: NoticeLevel, text: impl Into<String>) -> Self {
        LinkEvent::Notice { level, text: text.into() }
    }
}
