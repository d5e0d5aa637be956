//! Connection link state machine.
//!
//! Pure state: the supervisor task feeds transport outcomes in and acts
//! on the returned decisions. Keeping this logic synchronous makes the
//! debounce and failover behaviour testable without a broker.
//!
//! The machine distinguishes a user-requested disconnect from transient
//! transport drops. A drop while connected starts a debounce window; the
//! user only sees "disconnected" if the link is not re-established before
//! the window elapses. The debounce deadline is a single-slot field,
//! armed with cancel-before-reschedule semantics.

/// Debounce window before a transport drop is surfaced as disconnected.
pub const DEFAULT_DEBOUNCE_MS: i64 = 5_000;

/// Runtime state of the logical broker connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStatus {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
}

impl LinkStatus {
    /// Short label for the status bar.
    pub fn label(&self) -> &'static str {
        match self {
            LinkStatus::Disconnected => "disconnected",
            LinkStatus::Connecting => "connecting",
            LinkStatus::Connected => "connected",
            LinkStatus::Reconnecting => "reconnecting",
        }
    }
}

/// What the supervisor should do about a transport drop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropAction {
    /// Finalize the link and stop; `requested` tells whether the user
    /// asked for it.
    Finalize { requested: bool },
    /// Tear down the client and retry against the fallback broker.
    Failover,
    /// Keep retrying; a debounce window was just armed.
    Debounce,
    /// Keep retrying quietly; a debounce window is already running (or
    /// the link never got up in the first place).
    KeepTrying,
}

/// The supervisor-side connection state machine.
#[derive(Debug, Clone)]
pub struct LinkState {
    status: LinkStatus,
    debounce_ms: i64,
    /// At most one pending debounce deadline, epoch milliseconds.
    debounce_deadline_ms: Option<i64>,
    user_requested: bool,
    failover_used: bool,
}

impl Default for LinkState {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE_MS)
    }
}

impl LinkState {
    pub fn new(debounce_ms: i64) -> Self {
        Self {
            status: LinkStatus::Connecting,
            debounce_ms: debounce_ms.max(0),
            debounce_deadline_ms: None,
            user_requested: false,
            failover_used: false,
        }
    }

    pub fn status(&self) -> LinkStatus {
        self.status
    }

    /// The broker acknowledged the session. Cancels any running debounce.
    pub fn on_connack(&mut self) {
        self.status = LinkStatus::Connected;
        self.debounce_deadline_ms = None;
    }

    /// The transport dropped (connection error from the event loop).
    ///
    /// `auth_failure` marks a broker-refused authorization;
    /// `failover_available` tells whether a fallback broker may still be
    /// tried (we only fail over away from the known default broker).
    pub fn on_drop(&mut self, now_ms: i64, auth_failure: bool, failover_available: bool) -> DropAction {
        if self.user_requested {
            self.status = LinkStatus::Disconnected;
            self.debounce_deadline_ms = None;
            return DropAction::Finalize { requested: true };
        }

        if auth_failure {
            self.debounce_deadline_ms = None;
            if failover_available && !self.failover_used {
                self.failover_used = true;
                self.status = LinkStatus::Connecting;
                return DropAction::Failover;
            }
            self.status = LinkStatus::Disconnected;
            return DropAction::Finalize { requested: false };
        }

        match self.status {
            LinkStatus::Connected => {
                self.status = LinkStatus::Reconnecting;
                self.debounce_deadline_ms = Some(now_ms + self.debounce_ms);
                DropAction::Debounce
            }
            LinkStatus::Connecting => {
                // Initial connect failing: surface it only if it keeps
                // failing past the debounce window.
                self.status = LinkStatus::Reconnecting;
                self.debounce_deadline_ms = Some(now_ms + self.debounce_ms);
                DropAction::Debounce
            }
            // Already reconnecting: the existing debounce keeps running.
            LinkStatus::Reconnecting | LinkStatus::Disconnected => DropAction::KeepTrying,
        }
    }

    /// The user asked to disconnect. Finalizes immediately and cancels
    /// the debounce.
    pub fn on_disconnect_requested(&mut self) {
        self.user_requested = true;
        self.debounce_deadline_ms = None;
        self.status = LinkStatus::Disconnected;
    }

    /// Advance time. Returns `true` when the debounce window elapsed
    /// without the link coming back, i.e. the disconnect must now be
    /// surfaced.
    pub fn tick(&mut self, now_ms: i64) -> bool {
        match self.debounce_deadline_ms {
            Some(deadline) if now_ms >= deadline => {
                self.debounce_deadline_ms = None;
                self.status = LinkStatus::Disconnected;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_connecting() {
        let state = LinkState::default();
        assert_eq!(state.status(), LinkStatus::Connecting);
    }

    #[test]
    fn test_connack_connects() {
        let mut state = LinkState::default();
        state.on_connack();
        assert_eq!(state.status(), LinkStatus::Connected);
    }

    #[test]
    fn test_drop_then_reconnect_within_debounce_is_silent() {
        let mut state = LinkState::new(5_000);
        state.on_connack();

        assert_eq!(state.on_drop(1_000, false, false), DropAction::Debounce);
        assert_eq!(state.status(), LinkStatus::Reconnecting);

        // Link comes back before the deadline.
        assert!(!state.tick(3_000));
        state.on_connack();

        // The debounce was cancelled; it must never fire late.
        assert!(!state.tick(6_000));
        assert!(!state.tick(100_000));
        assert_eq!(state.status(), LinkStatus::Connected);
    }

    #[test]
    fn test_debounce_elapsing_surfaces_disconnect() {
        let mut state = LinkState::new(5_000);
        state.on_connack();
        state.on_drop(1_000, false, false);

        assert!(!state.tick(5_999));
        assert!(state.tick(6_000));
        assert_eq!(state.status(), LinkStatus::Disconnected);
        // Only surfaced once.
        assert!(!state.tick(7_000));
    }

    #[test]
    fn test_repeated_drops_do_not_rearm_debounce() {
        let mut state = LinkState::new(5_000);
        state.on_connack();
        state.on_drop(1_000, false, false);

        // More drops while reconnecting leave the original deadline.
        assert_eq!(state.on_drop(4_000, false, false), DropAction::KeepTrying);
        assert_eq!(state.on_drop(5_500, false, false), DropAction::KeepTrying);
        assert!(state.tick(6_000));
    }

    #[test]
    fn test_user_disconnect_finalizes_immediately() {
        let mut state = LinkState::new(5_000);
        state.on_connack();
        state.on_drop(1_000, false, false);

        state.on_disconnect_requested();
        assert_eq!(state.status(), LinkStatus::Disconnected);
        // Debounce cancelled by the explicit disconnect.
        assert!(!state.tick(10_000));

        // The transport close that follows reports the user request.
        assert_eq!(state.on_drop(1_100, false, false), DropAction::Finalize { requested: true });
    }

    #[test]
    fn test_auth_failure_fails_over_exactly_once() {
        let mut state = LinkState::new(5_000);
        assert_eq!(state.on_drop(1_000, true, true), DropAction::Failover);
        assert_eq!(state.status(), LinkStatus::Connecting);

        // The second refusal stops for good.
        assert_eq!(
            state.on_drop(2_000, true, true),
            DropAction::Finalize { requested: false }
        );
        assert_eq!(state.status(), LinkStatus::Disconnected);
    }

    #[test]
    fn test_auth_failure_without_fallback_stops() {
        let mut state = LinkState::new(5_000);
        assert_eq!(
            state.on_drop(1_000, true, false),
            DropAction::Finalize { requested: false }
        );
    }

    #[test]
    fn test_initial_connect_failure_debounces() {
        let mut state = LinkState::new(5_000);
        assert_eq!(state.on_drop(1_000, false, false), DropAction::Debounce);
        assert_eq!(state.on_drop(2_000, false, false), DropAction::KeepTrying);
        assert!(state.tick(6_000));
    }
}
