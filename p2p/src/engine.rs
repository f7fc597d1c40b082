//! The protocol engine: one entry point per message kind, plus the periodic
//! tick that drives broadcasts, liveness, and exchange timeouts.
use clocksync_common::wire::Kind;
use clocksync_common::{Clock, Endpoint, Message};

use crate::exchange::ExchangeState;
use crate::output::{DropReason, Event, Outbox};
use crate::peers::PeerTable;
use crate::sync::{self, SyncState};
use crate::timers::Timers;

/// Startup configuration the engine needs from the CLI.
#[derive(Clone, Copy, Debug, Default)]
pub struct Config {
    /// The bootstrap peer given via `-a`/`-r`, if any. `HELLO_REPLY` is only
    /// accepted from this endpoint.
    pub bootstrap: Option<Endpoint>,
}

/// The owned state of one node: peer table, synchronization state, any
/// in-flight exchange, the four timers, and a clock.
///
/// `Engine` is deliberately I/O-free: handlers mutate `self` and push
/// [`crate::output::Io`] effects onto an internal [`Outbox`], which the
/// caller drains with [`Engine::drain`] after every [`Engine::dispatch`] or
/// [`Engine::tick`] call.
pub struct Engine<C: Clock> {
    clock: C,
    config: Config,
    peers: PeerTable,
    sync: SyncState,
    exchange: ExchangeState,
    timers: Timers,
    outbox: Outbox,
}

impl<C: Clock> Engine<C> {
    /// Construct a fresh engine, initializing timers at the clock's current
    /// reading.
    pub fn new(clock: C, config: Config) -> Self {
        let now = clock.local_time();
        Self {
            clock,
            config,
            peers: PeerTable::new(),
            sync: SyncState::new(),
            exchange: ExchangeState::new(),
            timers: Timers::new(now),
            outbox: Outbox::new(),
        }
    }

    /// The current peer table.
    pub fn peers(&self) -> &PeerTable {
        &self.peers
    }

    /// The current synchronization state.
    pub fn sync(&self) -> &SyncState {
        &self.sync
    }

    /// The current exchange state.
    pub fn exchange(&self) -> &ExchangeState {
        &self.exchange
    }

    /// Drain effects queued since the last call.
    pub fn drain(&mut self) -> impl Iterator<Item = crate::output::Io> + '_ {
        self.outbox.drain()
    }

    /// Send the single bootstrap `HELLO`, if `-a`/`-r` were configured. No
    /// retries.
    pub fn bootstrap(&mut self) {
        if let Some(peer) = self.config.bootstrap {
            self.outbox.send(peer, Message::Hello);
        }
    }

    /// Decode and dispatch one datagram from `from`.
    pub fn dispatch(&mut self, from: Endpoint, raw: &[u8]) {
        match Message::decode(raw) {
            Err(_) => {
                let kind = raw.first().copied().and_then(Kind::from_tag);
                self.outbox.drop_message(DropReason::Malformed, kind, raw);
            }
            Ok(message) => self.dispatch_message(from, message, raw),
        }
    }

    fn dispatch_message(&mut self, from: Endpoint, message: Message, raw: &[u8]) {
        match message {
            Message::Hello => self.on_hello(from, raw),
            Message::HelloReply(peers) => self.on_hello_reply(from, peers, raw),
            Message::Connect => self.on_connect(from, raw),
            Message::AckConnect => self.on_ack_connect(from, raw),
            Message::SyncStart { level, t1_ms } => self.on_sync_start(from, level, t1_ms, raw),
            Message::DelayRequest => self.on_delay_request(from, raw),
            Message::DelayResponse { level, t4_ms } => {
                self.on_delay_response(from, level, t4_ms, raw)
            }
            Message::Leader { value } => self.on_leader(value, raw),
            Message::GetTime => self.on_get_time(from),
            Message::Time { .. } => {
                // A node never receives TIME unsolicited on this wire; treat
                // as malformed rather than silently accepting it.
                self.outbox
                    .drop_message(DropReason::Malformed, Some(Kind::Time), raw);
            }
        }
    }

    fn on_hello(&mut self, from: Endpoint, raw: &[u8]) {
        if self.peers.contains(&from) {
            self.outbox
                .drop_message(DropReason::AlreadyPeer, Some(Kind::Hello), raw);
            return;
        }
        if self.peers.is_full() {
            self.outbox
                .drop_message(DropReason::TableFull, Some(Kind::Hello), raw);
            return;
        }
        let snapshot: Vec<Endpoint> = self.peers.iter().copied().collect();
        if clocksync_common::wire::hello_reply_len(snapshot.len()) > u16::MAX as usize {
            self.outbox
                .drop_message(DropReason::TableFull, Some(Kind::Hello), raw);
            return;
        }
        self.outbox.send(from, Message::HelloReply(snapshot));
        self.peers.append(from);
        self.outbox.event(Event::PeerDiscovered(from));
    }

    fn on_hello_reply(&mut self, from: Endpoint, peers: Vec<Endpoint>, raw: &[u8]) {
        if self.config.bootstrap != Some(from) {
            self.outbox
                .drop_message(DropReason::NotBootstrapPeer, Some(Kind::HelloReply), raw);
            return;
        }
        if self.peers.len() + peers.len() > crate::peers::MAX_PEERS {
            self.outbox
                .drop_message(DropReason::TooManyPeers, Some(Kind::HelloReply), raw);
            return;
        }
        if !self.peers.contains(&from) {
            self.peers.append(from);
            self.outbox.event(Event::PeerDiscovered(from));
        }
        for candidate in peers {
            self.outbox.send(candidate, Message::Connect);
        }
    }

    fn on_connect(&mut self, from: Endpoint, raw: &[u8]) {
        if self.peers.contains(&from) {
            self.outbox
                .drop_message(DropReason::AlreadyPeer, Some(Kind::Connect), raw);
            return;
        }
        if self.peers.is_full() {
            self.outbox
                .drop_message(DropReason::TableFull, Some(Kind::Connect), raw);
            return;
        }
        self.peers.append(from);
        self.outbox.event(Event::PeerDiscovered(from));
        self.outbox.send(from, Message::AckConnect);
    }

    fn on_ack_connect(&mut self, from: Endpoint, raw: &[u8]) {
        if self.peers.contains(&from) {
            self.outbox
                .drop_message(DropReason::AlreadyPeer, Some(Kind::AckConnect), raw);
            return;
        }
        if self.peers.is_full() {
            self.outbox
                .drop_message(DropReason::TableFull, Some(Kind::AckConnect), raw);
            return;
        }
        self.peers.append(from);
        self.outbox.event(Event::PeerDiscovered(from));
    }

    fn on_sync_start(&mut self, from: Endpoint, level: u8, t1_ms: i64, raw: &[u8]) {
        let t2 = self.clock.local_time().as_millis_i64();

        if self.exchange.is_active() {
            self.outbox.drop_message(
                DropReason::ExchangeAlreadyActive,
                Some(Kind::SyncStart),
                raw,
            );
            return;
        }

        if Some(from) == self.sync.source_endpoint() && level == self.sync.source_level() {
            let now = self.clock.local_time();
            self.timers.reset_recv_timeout(now);
        }

        let is_peer = self.peers.contains(&from);
        let level_ok = level < sync::LEVEL_BOUNDARY;
        let from_source = Some(from) == self.sync.source_endpoint();
        let is_refinement = from_source && level < self.sync.level();
        let is_better_alternate = !from_source && level as u16 + 2 <= self.sync.level() as u16;
        let accepted = is_peer && level_ok && (is_refinement || is_better_alternate);

        if !accepted {
            self.outbox.drop_message(
                DropReason::PredicateNotSatisfied,
                Some(Kind::SyncStart),
                raw,
            );
            return;
        }

        let now = self.clock.local_time();
        let t3 = self.clock.local_time().as_millis_i64();
        self.exchange.begin(from, level, t1_ms, t2, t3);
        self.outbox.send(from, Message::DelayRequest);
        self.timers.arm_exchange(now);
        log::trace!("exchange started with {from} (partner_level={level})");
    }

    fn on_delay_request(&mut self, from: Endpoint, raw: &[u8]) {
        let t4 = self.clock.local_time().as_millis_i64();
        if !self.peers.contains(&from) {
            self.outbox
                .drop_message(DropReason::UnknownSender, Some(Kind::DelayRequest), raw);
            return;
        }
        if !sync::can_propagate(self.sync.level()) {
            self.outbox
                .drop_message(DropReason::CannotPropagate, Some(Kind::DelayRequest), raw);
            return;
        }
        let t4_ms = t4 - self.sync.offset_ms();
        self.outbox.send(
            from,
            Message::DelayResponse {
                level: self.sync.level(),
                t4_ms,
            },
        );
    }

    fn on_delay_response(&mut self, from: Endpoint, level: u8, t4_ms: i64, raw: &[u8]) {
        if !self.exchange.is_active() || self.exchange.partner() != Some(from) {
            self.outbox.drop_message(
                DropReason::NoMatchingExchange,
                Some(Kind::DelayResponse),
                raw,
            );
            return;
        }

        if Some(level) != self.exchange.partner_level() {
            self.exchange.clear();
            return;
        }

        let t1 = self.exchange.t1_ms().expect("active exchange has t1");
        if t4_ms - t1 > 5000 {
            log::debug!("exchange with {from} exceeded the round-trip bound, falling out of sync");
            self.exchange.clear();
            self.sync.set_level(sync::LEVEL_UNSYNCHRONIZED);
            return;
        }

        let t2 = self.exchange.t2_ms().expect("active exchange has t2");
        let t3 = self.exchange.t3_ms().expect("active exchange has t3");
        let offset_ms = ((t2 - t1) + (t3 - t4_ms)) / 2;
        let source_level = self
            .exchange
            .partner_level()
            .expect("active exchange has partner_level");

        let previous_level = self.sync.level();
        self.sync.commit(from, source_level, offset_ms);
        self.exchange.clear();
        let now = self.clock.local_time();
        self.timers.reset_recv_timeout(now);
        if previous_level != self.sync.level() {
            self.outbox.event(Event::LevelChanged {
                from: previous_level,
                to: self.sync.level(),
            });
        }
    }

    fn on_leader(&mut self, value: u8, raw: &[u8]) {
        match value {
            0 => {
                let previous_level = self.sync.level();
                self.sync.become_root();
                let now = self.clock.local_time();
                self.timers.hold_broadcast(now);
                if previous_level != self.sync.level() {
                    self.outbox.event(Event::LevelChanged {
                        from: previous_level,
                        to: self.sync.level(),
                    });
                }
            }
            255 if self.sync.is_root() => {
                let previous_level = self.sync.level();
                self.sync.step_down();
                self.outbox.event(Event::LevelChanged {
                    from: previous_level,
                    to: self.sync.level(),
                });
            }
            _ => {
                self.outbox
                    .drop_message(DropReason::InvalidLeaderValue, Some(Kind::Leader), raw);
            }
        }
    }

    fn on_get_time(&mut self, from: Endpoint) {
        let now = self.clock.local_time().as_millis_i64();
        self.outbox.send(
            from,
            Message::Time {
                level: self.sync.level(),
                t_ms: self.sync.to_wire_time(now),
            },
        );
    }

    /// Run the periodic actions for one loop iteration: broadcast, recv
    /// timeout, and exchange timeout, in that order.
    pub fn tick(&mut self) {
        let now = self.clock.local_time();

        if sync::can_propagate(self.sync.level()) && self.timers.broadcast_is_due(now) {
            let peers: Vec<Endpoint> = self.peers.iter().copied().collect();
            for peer in peers {
                let t1 = self.sync.to_wire_time(self.clock.local_time().as_millis_i64());
                self.outbox.send(
                    peer,
                    Message::SyncStart {
                        level: self.sync.level(),
                        t1_ms: t1,
                    },
                );
            }
            self.timers.rearm_broadcast(now);
        }

        if self.sync.level() > sync::LEVEL_ROOT
            && sync::can_propagate(self.sync.level())
            && self.timers.recv_has_timed_out(now)
        {
            let previous_level = self.sync.level();
            self.sync.desynchronize();
            self.timers.reset_recv_timeout(now);
            self.outbox.event(Event::LevelChanged {
                from: previous_level,
                to: self.sync.level(),
            });
        }

        if self.exchange.is_active() && self.timers.exchange_has_timed_out(now) {
            self.exchange.clear();
            let previous_level = self.sync.level();
            self.sync.desynchronize();
            if previous_level != self.sync.level() {
                self.outbox.event(Event::LevelChanged {
                    from: previous_level,
                    to: self.sync.level(),
                });
            }
        }
    }
}
