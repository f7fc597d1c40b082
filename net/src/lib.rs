//! A blocking, single-threaded reactor that drives a [`clocksync_p2p::Engine`]
//! from a real datagram socket.
#![warn(missing_docs)]

pub mod transport;
pub mod reactor;

pub use reactor::Reactor;
pub use transport::{DatagramIo, SendOutcome, UdpTransport};
