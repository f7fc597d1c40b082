//! Graceful shutdown: register SIGINT/SIGTERM to set a stop flag the main
//! loop polls between iterations.
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use crate::error::Error;

/// Install handlers for `SIGINT` and `SIGTERM` that set the returned flag.
///
/// This is the self-pipe-free route recommended by the design notes: the
/// flag is only ever read from the main loop, between iterations, so there
/// is no async-signal-safety requirement beyond what `signal_hook::flag`
/// already guarantees.
pub fn install_stop_flag() -> Result<Arc<AtomicBool>, Error> {
    let stop = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register(signal_hook::consts::SIGINT, Arc::clone(&stop))
        .map_err(Error::SignalInstall)?;
    signal_hook::flag::register(signal_hook::consts::SIGTERM, Arc::clone(&stop))
        .map_err(Error::SignalInstall)?;
    Ok(stop)
}
