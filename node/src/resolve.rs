//! Hostname resolution: numeric or DNS, first IPv4 result wins.
use std::net::{Ipv4Addr, ToSocketAddrs};

use crate::error::Error;

/// Resolve `host` (a hostname or numeric address) to its first IPv4 result.
///
/// `ToSocketAddrs` requires a port to build a lookup key; it is not part of
/// the returned address.
pub fn resolve_ipv4(host: &str) -> Result<Ipv4Addr, Error> {
    (host, 0u16)
        .to_socket_addrs()
        .map_err(|_| Error::Resolution {
            host: host.to_string(),
        })?
        .find_map(|addr| match addr {
            std::net::SocketAddr::V4(v4) => Some(*v4.ip()),
            std::net::SocketAddr::V6(_) => None,
        })
        .ok_or_else(|| Error::Resolution {
            host: host.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_numeric_loopback() {
        assert_eq!(resolve_ipv4("127.0.0.1").unwrap(), Ipv4Addr::LOCALHOST);
    }

    #[test]
    fn rejects_unresolvable_host() {
        assert!(resolve_ipv4("this.host.does.not.exist.invalid").is_err());
    }
}
