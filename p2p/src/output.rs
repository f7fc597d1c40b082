//! Effects emitted by the engine: outgoing datagrams and diagnostic events.
//!
//! Handlers never touch a socket directly. Instead they push [`Io`] values
//! onto an [`Outbox`], which the reactor (`clocksync-net`) drains after each
//! dispatch and turns into `sendto` calls and log lines. This keeps the
//! protocol engine testable without a real socket and keeps the "what
//! happened" narrative (an ordered effect log) separate from "how it was
//! carried out".
use std::collections::VecDeque;

use thiserror::Error;

use clocksync_common::wire::Kind;
use clocksync_common::Endpoint;

use crate::Message;

/// Why a message was dropped without mutating state.
#[derive(Error, Clone, Copy, Debug, PartialEq, Eq)]
pub enum DropReason {
    /// The datagram failed [`clocksync_common::wire::validate_length`] or
    /// carried an unknown kind byte, or failed `HELLO_REPLY`'s peer-list walk.
    #[error("malformed datagram")]
    Malformed,
    /// The sender is already a member of the peer table.
    #[error("sender already a peer")]
    AlreadyPeer,
    /// The peer table is at its 65,535-entry cap.
    #[error("peer table full")]
    TableFull,
    /// `HELLO_REPLY` arrived from someone other than the configured
    /// bootstrap peer.
    #[error("sender is not the bootstrap peer")]
    NotBootstrapPeer,
    /// `HELLO_REPLY`'s declared peer count would overflow the table.
    #[error("hello_reply peer count overflows table")]
    TooManyPeers,
    /// An exchange is already active; a new `SYNC_START` was dropped.
    #[error("exchange already active")]
    ExchangeAlreadyActive,
    /// `SYNC_START`'s acceptance predicate was not satisfied.
    #[error("acceptance predicate not satisfied")]
    PredicateNotSatisfied,
    /// The sender is not a tracked peer.
    #[error("sender is not a peer")]
    UnknownSender,
    /// Our level is at or past the propagation boundary (254).
    #[error("at or past propagation boundary")]
    CannotPropagate,
    /// A `DELAY_RESPONSE` arrived with no exchange active, or from someone
    /// other than the active partner.
    #[error("no matching active exchange")]
    NoMatchingExchange,
    /// `LEADER` carried a value other than 0 or 255 (or 255 while not root).
    #[error("invalid leader value")]
    InvalidLeaderValue,
}

/// A notable, loggable occurrence that is not itself an outgoing datagram.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// A new peer was appended to the table.
    PeerDiscovered(Endpoint),
    /// This node's synchronization level changed.
    LevelChanged {
        /// Previous level.
        from: u8,
        /// New level.
        to: u8,
    },
    /// A message was dropped without mutating state.
    ///
    /// `kind` is `None` only when the datagram was too short to carry even
    /// a kind byte. `bytes` holds the (up to 10) raw bytes for the
    /// mandated `ERROR MSG <hex>` diagnostic line.
    Dropped {
        /// Why the message was dropped.
        reason: DropReason,
        /// The message's kind, if it could be determined.
        kind: Option<Kind>,
        /// Up to the first 10 raw bytes of the datagram.
        bytes: Vec<u8>,
    },
}

/// One effect emitted by a handler.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Io {
    /// Send `message` to `to`.
    Send {
        /// Destination endpoint.
        to: Endpoint,
        /// The message to send.
        message: Message,
    },
    /// A diagnostic event worth logging.
    Event(Event),
}

/// An ordered queue of effects produced by a single dispatch or tick.
#[derive(Clone, Debug, Default)]
pub struct Outbox {
    effects: VecDeque<Io>,
}

impl Outbox {
    /// A fresh, empty outbox.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a datagram to send.
    pub fn send(&mut self, to: Endpoint, message: Message) {
        self.effects.push_back(Io::Send { to, message });
    }

    /// Queue a diagnostic event.
    pub fn event(&mut self, event: Event) {
        self.effects.push_back(Io::Event(event));
    }

    /// Queue a drop diagnostic, truncating `raw` to the mandated 10 bytes.
    pub fn drop_message(&mut self, reason: DropReason, kind: Option<Kind>, raw: &[u8]) {
        let bytes = raw[..raw.len().min(10)].to_vec();
        self.event(Event::Dropped { reason, kind, bytes });
    }

    /// Drain all queued effects in order.
    pub fn drain(&mut self) -> impl Iterator<Item = Io> + '_ {
        self.effects.drain(..)
    }

    /// Whether any effects are queued.
    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }
}
