use proptest::prelude::*;

use clocksync_common::{Clock, Endpoint, LocalTime};
use clocksync_p2p::{Config, Engine};

#[derive(Clone)]
struct FixedClock(u64);

impl Clock for FixedClock {
    fn local_time(&self) -> LocalTime {
        LocalTime::from_millis(self.0)
    }
}

proptest! {
    #[test]
    fn dispatch_never_panics_on_arbitrary_datagrams(
        from_addr in any::<u32>(),
        from_port in any::<u16>(),
        bytes in proptest::collection::vec(any::<u8>(), 0..32),
    ) {
        let mut engine = Engine::new(FixedClock(0), Config::default());
        let from = Endpoint::new(from_addr, from_port);
        engine.dispatch(from, &bytes);
        let _ = engine.drain().count();
    }

    #[test]
    fn a_dropped_sync_start_never_mutates_sync_state(
        from_addr in any::<u32>(),
        from_port in any::<u16>(),
        level in any::<u8>(),
        t1_ms in any::<i64>(),
    ) {
        // No peer is ever registered, so every SYNC_START here fails the
        // acceptance predicate's peer-membership clause and must be a no-op
        // on `sync()` regardless of the other fields.
        let mut engine = Engine::new(FixedClock(0), Config::default());
        let before = *engine.sync();
        let from = Endpoint::new(from_addr, from_port);
        let raw = clocksync_common::Message::SyncStart { level, t1_ms }.encode();
        engine.dispatch(from, &raw);
        prop_assert_eq!(before, *engine.sync());
        prop_assert!(!engine.exchange().is_active());
    }
}
