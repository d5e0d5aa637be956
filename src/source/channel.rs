//! Channel-based event source.
//!
//! Receives link events via an unbounded channel. This is how tests and
//! library embedders drive the application without a live broker.

use tokio::sync::mpsc;

use super::{EventSource, LinkEvent};

/// An event source fed from the sending half of a channel.
#[derive(Debug)]
pub struct ChannelSource {
    receiver: mpsc::UnboundedReceiver<LinkEvent>,
    description: String,
}

impl ChannelSource {
    /// Wrap an existing receiver.
    pub fn new(receiver: mpsc::UnboundedReceiver<LinkEvent>, description: &str) -> Self {
        Self {
            receiver,
            description: format!("channel: {}", description),
        }
    }

    /// Create a sender/source pair.
    pub fn create(description: &str) -> (mpsc::UnboundedSender<LinkEvent>, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, Self::new(rx, description))
    }
}

impl EventSource for ChannelSource {
    fn poll(&mut self) -> Option<LinkEvent> {
        self.receiver.try_recv().ok()
    }

    fn description(&self) -> &str {
        &self.description
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::NoticeLevel;

    #[test]
    fn test_poll_in_order() {
        let (tx, mut source) = ChannelSource::create("test");
        tx.send(LinkEvent::Connected).unwrap();
        tx.send(LinkEvent::notice(NoticeLevel::Info, "hello")).unwrap();

        assert_eq!(source.poll(), Some(LinkEvent::Connected));
        assert_eq!(
            source.poll(),
            Some(LinkEvent::Notice { level: NoticeLevel::Info, text: "hello".to_string() })
        );
        assert_eq!(source.poll(), None);
    }

    #[test]
    fn test_poll_after_sender_dropped() {
        let (tx, mut source) = ChannelSource::create("test");
        tx.send(LinkEvent::Disconnected { requested: true }).unwrap();
        drop(tx);

        // Buffered events still drain; afterwards poll just yields None.
        assert_eq!(source.poll(), Some(LinkEvent::Disconnected { requested: true }));
        assert_eq!(source.poll(), None);
    }

    #[test]
    fn test_description() {
        let (_tx, source) = ChannelSource::create("mqtt://broker");
        assert_eq!(source.description(), "channel: mqtt://broker");
    }
}
