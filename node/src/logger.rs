//! Logger initialization.
//!
//! Dropped-message diagnostics are logged at `warn` with exactly the
//! `ERROR MSG <hex>` text mandated by the wire codec (see
//! `clocksync_net::reactor::log_event`); everything else gets the usual
//! leveled, timestamped format. To keep that one line verbatim, `warn`
//! records are printed as their bare message and nothing else is.
use std::io::Write;

use env_logger::Builder;

/// Initialize the global logger from `RUST_LOG`, defaulting to `info`.
pub fn init() {
    Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| {
            if record.level() == log::Level::Warn && record.target().starts_with("clocksync") {
                writeln!(buf, "{}", record.args())
            } else {
                writeln!(
                    buf,
                    "[{}] {} {}: {}",
                    buf.timestamp(),
                    record.level(),
                    record.target(),
                    record.args()
                )
            }
        })
        .init();
}
