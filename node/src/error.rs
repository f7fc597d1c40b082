//! Startup errors: logged once to stderr, then a non-zero exit.
use std::io;

use thiserror::Error;

/// An error that prevents the daemon from starting.
#[derive(Error, Debug)]
pub enum Error {
    /// An invalid or contradictory combination of CLI flags.
    #[error("bad flags: {0}")]
    BadFlags(&'static str),
    /// A hostname failed to resolve to any IPv4 address.
    #[error("could not resolve {host} to an IPv4 address")]
    Resolution {
        /// The hostname or address literal that failed to resolve.
        host: String,
    },
    /// Socket creation or binding failed.
    #[error("socket error: {0}")]
    Socket(#[from] io::Error),
    /// Installing the shutdown signal handler failed.
    #[error("could not install signal handler: {0}")]
    SignalInstall(io::Error),
}
