//! The main loop: timers, then a timed receive, then dispatch.
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clocksync_common::wire::diagnostic_hex;
use clocksync_common::Clock;
use clocksync_p2p::output::{Event, Io};
use clocksync_p2p::Engine;

use crate::transport::{DatagramIo, SendOutcome};

/// Drives an [`Engine`] from a [`DatagramIo`] until told to stop.
///
/// Ordering within one iteration is: evaluate timers (possibly broadcasting
/// or resetting state), drain and send whatever that produced, block for one
/// datagram with a 1-second timeout, dispatch it if one arrived, drain and
/// send whatever *that* produced. A broadcast and a received datagram can
/// therefore never interleave.
pub struct Reactor<T: DatagramIo, C: Clock> {
    transport: T,
    engine: Engine<C>,
    stop: Arc<AtomicBool>,
}

impl<T: DatagramIo, C: Clock> Reactor<T, C> {
    /// Construct a reactor over `transport` and `engine`, stopping when
    /// `stop` is set.
    pub fn new(transport: T, engine: Engine<C>, stop: Arc<AtomicBool>) -> Self {
        Self {
            transport,
            engine,
            stop,
        }
    }

    /// Send the configured bootstrap `HELLO`, if any, then run the loop
    /// until the stop flag is set.
    pub fn run(&mut self) {
        self.engine.bootstrap();
        self.drain();

        while !self.stop.load(Ordering::Relaxed) {
            self.engine.tick();
            self.drain();

            match self.transport.recv_from() {
                Ok(Some((from, datagram))) => {
                    self.engine.dispatch(from, &datagram);
                    self.drain();
                }
                Ok(None) => {}
                Err(e) => {
                    log::debug!("transient receive error: {e}");
                }
            }
        }
    }

    fn drain(&mut self) {
        let effects: Vec<Io> = self.engine.drain().collect();
        for effect in effects {
            match effect {
                Io::Send { to, message } => {
                    let buf = message.encode();
                    match self.transport.send_to(&buf, to) {
                        SendOutcome::Sent => {}
                        SendOutcome::Transient(e) => {
                            log::debug!("transient send error to {to}: {e}");
                        }
                    }
                }
                Io::Event(event) => log_event(&event),
            }
        }
    }
}

fn log_event(event: &Event) {
    match event {
        Event::PeerDiscovered(endpoint) => log::info!("discovered peer {endpoint}"),
        Event::LevelChanged { from, to } => log::info!("level changed {from} -> {to}"),
        Event::Dropped { reason, kind, bytes } => {
            log::warn!("ERROR MSG {}", diagnostic_hex(bytes));
            log::debug!("dropped {:?} ({reason})", kind);
        }
    }
}
