//! Peer-set membership, time-exchange, and synchronization-level protocol
//! engine for the clocksync daemon.
#![warn(missing_docs)]

pub mod engine;
pub mod exchange;
pub mod output;
pub mod peers;
pub mod sync;
pub mod timers;

pub use clocksync_common::wire::Message;
pub use engine::{Config, Engine};
pub use exchange::ExchangeState;
pub use output::{DropReason, Event, Io, Outbox};
pub use peers::PeerTable;
pub use sync::SyncState;
pub use timers::Timers;
