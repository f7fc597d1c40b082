//! The in-flight state of a two-phase time exchange.
use clocksync_common::Endpoint;

/// The T1–T4 timestamps and counterpart identity of an in-progress exchange.
///
/// At most one exchange may be active at a time; a `SYNC_START` arriving
/// while one is already active is dropped (see the engine's handler).
#[derive(Clone, Copy, Debug, Default)]
pub struct ExchangeState {
    active: Option<Active>,
}

#[derive(Clone, Copy, Debug)]
struct Active {
    partner: Endpoint,
    partner_level: u8,
    t1_ms: i64,
    t2_ms: i64,
    t3_ms: i64,
}

impl ExchangeState {
    /// No exchange in progress.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether an exchange is currently active.
    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// The active exchange's partner, if any.
    pub fn partner(&self) -> Option<Endpoint> {
        self.active.map(|a| a.partner)
    }

    /// The active exchange's partner-reported level, if any.
    pub fn partner_level(&self) -> Option<u8> {
        self.active.map(|a| a.partner_level)
    }

    /// T1, the partner-stamped send time of `SYNC_START`, if active.
    pub fn t1_ms(&self) -> Option<i64> {
        self.active.map(|a| a.t1_ms)
    }

    /// T2, our receive time of `SYNC_START`, if active.
    pub fn t2_ms(&self) -> Option<i64> {
        self.active.map(|a| a.t2_ms)
    }

    /// T3, our send time of `DELAY_REQUEST`, if active.
    pub fn t3_ms(&self) -> Option<i64> {
        self.active.map(|a| a.t3_ms)
    }

    /// Begin a new exchange. Overwrites any previous (inactive) state.
    pub fn begin(&mut self, partner: Endpoint, partner_level: u8, t1_ms: i64, t2_ms: i64, t3_ms: i64) {
        self.active = Some(Active {
            partner,
            partner_level,
            t1_ms,
            t2_ms,
            t3_ms,
        });
    }

    /// Clear the exchange, whether it completed, aborted, or timed out.
    pub fn clear(&mut self) {
        self.active = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inactive_by_default() {
        let ex = ExchangeState::new();
        assert!(!ex.is_active());
        assert_eq!(ex.partner(), None);
    }

    #[test]
    fn begin_then_clear() {
        let mut ex = ExchangeState::new();
        let partner = Endpoint::new(1, 1);
        ex.begin(partner, 2, 100, 110, 120);
        assert!(ex.is_active());
        assert_eq!(ex.partner(), Some(partner));
        assert_eq!(ex.partner_level(), Some(2));
        assert_eq!(ex.t1_ms(), Some(100));
        assert_eq!(ex.t2_ms(), Some(110));
        assert_eq!(ex.t3_ms(), Some(120));
        ex.clear();
        assert!(!ex.is_active());
    }
}
