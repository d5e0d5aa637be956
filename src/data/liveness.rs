//! Device liveness tracking.
//!
//! A device is considered online from the moment any qualifying message
//! arrives and offline once no qualifying message has arrived for the
//! timeout duration. The timeout is a single-slot deadline re-armed on
//! every qualifying message (cancel-and-reschedule, never stacked), so a
//! stale deadline can never fire after newer traffic has superseded it.

use crate::message::MessageKind;

/// Milliseconds without a qualifying message before the device is
/// demoted to offline.
pub const DEFAULT_HEARTBEAT_TIMEOUT_MS: i64 = 30_000;

/// Observable device state. Created once, reset on demotion, never
/// destroyed.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DeviceStatus {
    pub online: bool,
    /// Arrival time of the most recent heartbeat, epoch milliseconds.
    pub last_heartbeat_ms: Option<i64>,
    /// Heartbeats received since the device last came online.
    pub heartbeat_count: u64,
    /// When the device last transitioned to online, epoch milliseconds.
    pub online_since_ms: Option<i64>,
}

/// A state transition worth surfacing to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LivenessChange {
    CameOnline,
    WentOffline,
}

/// The online/offline state machine.
#[derive(Debug, Clone)]
pub struct DeviceTracker {
    status: DeviceStatus,
    timeout_ms: i64,
    deadline_ms: Option<i64>,
}

impl Default for DeviceTracker {
    fn default() -> Self {
        Self::new(DEFAULT_HEARTBEAT_TIMEOUT_MS)
    }
}

impl DeviceTracker {
    pub fn new(timeout_ms: i64) -> Self {
        Self {
            status: DeviceStatus::default(),
            timeout_ms: timeout_ms.max(1),
            deadline_ms: None,
        }
    }

    pub fn status(&self) -> &DeviceStatus {
        &self.status
    }

    /// Feed one classified inbound message into the state machine.
    ///
    /// Any kind brings an offline device online; heartbeats additionally
    /// bump the counter and the last-heartbeat time. Every qualifying
    /// message re-arms the timeout.
    pub fn observe(&mut self, kind: MessageKind, now_ms: i64) -> Option<LivenessChange> {
        let change = if !self.status.online {
            self.status.online = true;
            self.status.online_since_ms = Some(now_ms);
            self.status.heartbeat_count = 0;
            Some(LivenessChange::CameOnline)
        } else {
            None
        };

        if kind == MessageKind::Heartbeat {
            self.status.heartbeat_count += 1;
            self.status.last_heartbeat_ms = Some(now_ms);
        }

        self.deadline_ms = Some(now_ms + self.timeout_ms);
        change
    }

    /// Advance time; demotes to offline once the deadline has passed.
    ///
    /// The demotion happens at exactly `timeout_ms` after the last
    /// qualifying message, never earlier.
    pub fn tick(&mut self, now_ms: i64) -> Option<LivenessChange> {
        match self.deadline_ms {
            Some(deadline) if self.status.online && now_ms >= deadline => {
                self.go_offline();
                Some(LivenessChange::WentOffline)
            }
            _ => None,
        }
    }

    /// Force the device offline, e.g. on transport disconnect. Cancels
    /// the pending deadline regardless of its state.
    pub fn force_offline(&mut self) -> Option<LivenessChange> {
        if self.status.online {
            self.go_offline();
            Some(LivenessChange::WentOffline)
        } else {
            self.deadline_ms = None;
            None
        }
    }

    /// How long the device has been online, if it is.
    pub fn online_duration_ms(&self, now_ms: i64) -> Option<i64> {
        self.status.online_since_ms.map(|since| (now_ms - since).max(0))
    }

    fn go_offline(&mut self) {
        self.status.online = false;
        self.status.online_since_ms = None;
        self.status.last_heartbeat_ms = None;
        self.deadline_ms = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initially_offline() {
        let tracker = DeviceTracker::default();
        assert!(!tracker.status().online);
        assert_eq!(tracker.status().heartbeat_count, 0);
    }

    #[test]
    fn test_any_message_brings_online() {
        for kind in [MessageKind::Data, MessageKind::Heartbeat, MessageKind::OnlineAnnouncement] {
            let mut tracker = DeviceTracker::default();
            assert_eq!(tracker.observe(kind, 1_000), Some(LivenessChange::CameOnline));
            assert!(tracker.status().online);
            assert_eq!(tracker.status().online_since_ms, Some(1_000));
        }
    }

    #[test]
    fn test_heartbeat_counts_and_timestamps() {
        let mut tracker = DeviceTracker::default();
        tracker.observe(MessageKind::Heartbeat, 1_000);
        tracker.observe(MessageKind::Heartbeat, 2_000);
        tracker.observe(MessageKind::Heartbeat, 3_000);

        // The heartbeat that caused the online transition also counts.
        assert_eq!(tracker.status().heartbeat_count, 3);
        assert_eq!(tracker.status().last_heartbeat_ms, Some(3_000));
    }

    #[test]
    fn test_data_does_not_touch_heartbeat_count() {
        let mut tracker = DeviceTracker::default();
        tracker.observe(MessageKind::Heartbeat, 1_000);
        tracker.observe(MessageKind::Data, 2_000);
        assert_eq!(tracker.status().heartbeat_count, 1);
        assert_eq!(tracker.status().last_heartbeat_ms, Some(1_000));
    }

    #[test]
    fn test_timeout_fires_exactly_not_earlier() {
        let mut tracker = DeviceTracker::new(30_000);
        tracker.observe(MessageKind::Heartbeat, 10_000);

        assert_eq!(tracker.tick(39_999), None);
        assert!(tracker.status().online);
        assert_eq!(tracker.tick(40_000), Some(LivenessChange::WentOffline));
        assert!(!tracker.status().online);
        assert_eq!(tracker.status().online_since_ms, None);
        assert_eq!(tracker.status().last_heartbeat_ms, None);
    }

    #[test]
    fn test_qualifying_message_rearms_timeout() {
        let mut tracker = DeviceTracker::new(30_000);
        tracker.observe(MessageKind::Heartbeat, 0);
        // Generic data at 25s pushes the deadline to 55s.
        tracker.observe(MessageKind::Data, 25_000);

        assert_eq!(tracker.tick(30_000), None);
        assert_eq!(tracker.tick(54_999), None);
        assert_eq!(tracker.tick(55_000), Some(LivenessChange::WentOffline));
    }

    #[test]
    fn test_no_spurious_fire_after_demotion() {
        let mut tracker = DeviceTracker::new(30_000);
        tracker.observe(MessageKind::Heartbeat, 0);
        tracker.tick(30_000);
        // Deadline was cleared along with the demotion.
        assert_eq!(tracker.tick(100_000), None);
    }

    #[test]
    fn test_force_offline_cancels_deadline() {
        let mut tracker = DeviceTracker::new(30_000);
        tracker.observe(MessageKind::Heartbeat, 0);
        assert_eq!(tracker.force_offline(), Some(LivenessChange::WentOffline));
        assert_eq!(tracker.tick(30_000), None);
        assert_eq!(tracker.force_offline(), None);
    }

    #[test]
    fn test_counter_resets_on_reconnect() {
        let mut tracker = DeviceTracker::new(30_000);
        tracker.observe(MessageKind::Heartbeat, 0);
        tracker.observe(MessageKind::Heartbeat, 1_000);
        tracker.tick(31_000);

        tracker.observe(MessageKind::Heartbeat, 40_000);
        assert_eq!(tracker.status().heartbeat_count, 1);
        assert_eq!(tracker.status().online_since_ms, Some(40_000));
    }

    #[test]
    fn test_online_duration() {
        let mut tracker = DeviceTracker::new(30_000);
        assert_eq!(tracker.online_duration_ms(5_000), None);
        tracker.observe(MessageKind::Data, 1_000);
        assert_eq!(tracker.online_duration_ms(5_000), Some(4_000));
    }
}
