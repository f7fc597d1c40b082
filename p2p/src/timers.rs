//! The four independent deadlines that drive periodic protocol actions.
use clocksync_common::{LocalDuration, LocalTime};

/// Interval between `SYNC_START` broadcasts.
pub const BROADCAST_INTERVAL: LocalDuration = LocalDuration::from_secs(5);
/// How long the current source may go quiet before we desynchronize.
pub const RECV_TIMEOUT: LocalDuration = LocalDuration::from_secs(20);
/// How long an active exchange may run before it is aborted.
pub const EXCHANGE_TIMEOUT: LocalDuration = LocalDuration::from_secs(5);
/// How long the first broadcast is deferred after becoming root.
pub const BROADCAST_HOLD: LocalDuration = LocalDuration::from_secs(3);

/// The four deadlines in play at any time.
///
/// Each is a plain [`LocalTime`] compared against "now" by the owner of a
/// `Timers` value (the engine's periodic tick); this type only tracks the
/// deadlines, it does not itself observe the clock.
#[derive(Clone, Copy, Debug)]
pub struct Timers {
    /// Next time a `SYNC_START` broadcast is due.
    pub broadcast_due: LocalTime,
    /// Last time a `SYNC_START` was seen from the current source (or "now"
    /// on reset); liveness is `now - recv_timeout >= RECV_TIMEOUT`.
    pub recv_timeout: LocalTime,
    /// When the active exchange (if any) started; abort if it has run
    /// longer than [`EXCHANGE_TIMEOUT`].
    pub exchange_due: LocalTime,
    /// Until when the next broadcast is held back, armed by `LEADER(0)`.
    pub broadcast_hold: LocalTime,
}

impl Timers {
    /// Construct a fresh timer set anchored at `now`.
    pub fn new(now: LocalTime) -> Self {
        Self {
            broadcast_due: now + BROADCAST_INTERVAL,
            recv_timeout: now,
            exchange_due: now,
            broadcast_hold: now,
        }
    }

    /// Whether a broadcast is due, honoring any active hold.
    pub fn broadcast_is_due(&self, now: LocalTime) -> bool {
        now >= self.broadcast_due && now >= self.broadcast_hold
    }

    /// Arm the next broadcast for `now + BROADCAST_INTERVAL`.
    pub fn rearm_broadcast(&mut self, now: LocalTime) {
        self.broadcast_due = now + BROADCAST_INTERVAL;
    }

    /// Defer the next broadcast by [`BROADCAST_HOLD`], per `LEADER(0)`.
    pub fn hold_broadcast(&mut self, now: LocalTime) {
        self.broadcast_hold = now + BROADCAST_HOLD;
    }

    /// Reset the source-liveness deadline to `now`.
    pub fn reset_recv_timeout(&mut self, now: LocalTime) {
        self.recv_timeout = now;
    }

    /// Whether the source has gone quiet for at least [`RECV_TIMEOUT`].
    pub fn recv_has_timed_out(&self, now: LocalTime) -> bool {
        now.duration_since(self.recv_timeout) >= RECV_TIMEOUT
    }

    /// Arm the exchange deadline for `now + EXCHANGE_TIMEOUT`.
    pub fn arm_exchange(&mut self, now: LocalTime) {
        self.exchange_due = now + EXCHANGE_TIMEOUT;
    }

    /// Whether the active exchange has run longer than [`EXCHANGE_TIMEOUT`].
    pub fn exchange_has_timed_out(&self, now: LocalTime) -> bool {
        now >= self.exchange_due
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn broadcast_due_after_interval() {
        let t0 = LocalTime::from_millis(0);
        let timers = Timers::new(t0);
        assert!(!timers.broadcast_is_due(t0));
        assert!(timers.broadcast_is_due(t0 + BROADCAST_INTERVAL));
    }

    #[test]
    fn hold_defers_broadcast() {
        let t0 = LocalTime::from_millis(0);
        let mut timers = Timers::new(t0);
        timers.hold_broadcast(t0);
        timers.broadcast_due = t0; // pretend a broadcast is otherwise due
        assert!(!timers.broadcast_is_due(t0 + LocalDuration::from_secs(1)));
        assert!(timers.broadcast_is_due(t0 + BROADCAST_HOLD));
    }

    #[test]
    fn recv_timeout_boundary() {
        let t0 = LocalTime::from_millis(0);
        let mut timers = Timers::new(t0);
        timers.reset_recv_timeout(t0);
        assert!(!timers.recv_has_timed_out(t0 + LocalDuration::from_secs(19)));
        assert!(timers.recv_has_timed_out(t0 + RECV_TIMEOUT));
    }

    #[test]
    fn exchange_timeout_boundary() {
        let t0 = LocalTime::from_millis(0);
        let mut timers = Timers::new(t0);
        timers.arm_exchange(t0);
        assert!(!timers.exchange_has_timed_out(t0 + LocalDuration::from_millis(4999)));
        assert!(timers.exchange_has_timed_out(t0 + EXCHANGE_TIMEOUT));
    }
}
