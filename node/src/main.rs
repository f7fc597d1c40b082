//! clocksync: a peer-to-peer clock synchronization daemon.
mod cli;
mod error;
mod logger;
mod resolve;
mod signal;

use std::net::Ipv4Addr;
use std::process::ExitCode;

use clocksync_common::{Endpoint, SystemClock};
use clocksync_net::{Reactor, UdpTransport};
use clocksync_p2p::{Config, Engine};

use error::Error;

fn main() -> ExitCode {
    logger::init();
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), Error> {
    let args: cli::Args = argh::from_env();
    let bootstrap_pair = args.bootstrap_pair()?;

    let bind_addr = match &args.bind {
        Some(host) => resolve::resolve_ipv4(host)?,
        None => Ipv4Addr::UNSPECIFIED,
    };

    let bootstrap = match bootstrap_pair {
        Some((host, port)) => {
            let addr = resolve::resolve_ipv4(host)?;
            Some(Endpoint::from_ipv4(addr, port))
        }
        None => None,
    };

    let transport = UdpTransport::bind(bind_addr, args.port)?;
    log::info!(
        "bound to {}",
        transport
            .local_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| format!("{bind_addr}:{}", args.port))
    );

    let stop = signal::install_stop_flag()?;

    let engine = Engine::new(SystemClock::new(), Config { bootstrap });
    let mut reactor = Reactor::new(transport, engine, stop);
    reactor.run();

    log::info!("shutting down");
    Ok(())
}
