//! The datagram I/O abstraction and its UDP implementation.
use std::io;
use std::net::UdpSocket;
use std::time::Duration;

use clocksync_common::Endpoint;

/// Send timeout configured on the socket at startup, per the resource model.
pub const SEND_TIMEOUT: Duration = Duration::from_secs(5);
/// Receive timeout configured on the socket at startup; this is also the
/// cadence at which the reactor's main loop checks the stop flag and timers.
pub const RECV_TIMEOUT: Duration = Duration::from_secs(1);
/// The maximum size of a single datagram, and of the shared send/receive
/// buffers.
pub const MAX_DATAGRAM: usize = 65_535;

/// The outcome of a send attempt.
///
/// Transient failures (the socket reporting `WouldBlock`/`TimedOut`, or any
/// other OS error) are not retried and do not abort the loop; they are
/// logged and the reactor continues. This type exists so that policy is
/// visible in the return value rather than requiring the caller to inspect
/// an `io::Error`'s kind.
#[derive(Debug)]
pub enum SendOutcome {
    /// The datagram was handed to the OS successfully.
    Sent,
    /// The send did not complete (e.g. `WouldBlock`); the caller should log
    /// and move on.
    Transient(io::Error),
}

/// A bound datagram endpoint the reactor can send to and receive from.
pub trait DatagramIo {
    /// Send `buf` to `to`, never blocking the caller past the configured
    /// send timeout.
    fn send_to(&self, buf: &[u8], to: Endpoint) -> SendOutcome;

    /// Block for up to the configured receive timeout for one datagram.
    /// Returns `Ok(None)` on a timeout with nothing received.
    fn recv_from(&self) -> io::Result<Option<(Endpoint, Vec<u8>)>>;
}

/// A [`DatagramIo`] backed by a real [`UdpSocket`].
pub struct UdpTransport {
    socket: UdpSocket,
}

impl UdpTransport {
    /// Bind a UDP socket at `bind_addr:port` and configure the send/receive
    /// timeouts mandated by the resource model.
    pub fn bind(bind_addr: std::net::Ipv4Addr, port: u16) -> io::Result<Self> {
        let socket = UdpSocket::bind((bind_addr, port))?;
        socket.set_write_timeout(Some(SEND_TIMEOUT))?;
        socket.set_read_timeout(Some(RECV_TIMEOUT))?;
        Ok(Self { socket })
    }

    /// The address actually bound, useful when `port == 0` (OS-assigned).
    pub fn local_addr(&self) -> io::Result<std::net::SocketAddr> {
        self.socket.local_addr()
    }
}

impl DatagramIo for UdpTransport {
    fn send_to(&self, buf: &[u8], to: Endpoint) -> SendOutcome {
        match self.socket.send_to(buf, (to.ipv4(), to.port)) {
            Ok(_) => SendOutcome::Sent,
            Err(e) => SendOutcome::Transient(e),
        }
    }

    fn recv_from(&self) -> io::Result<Option<(Endpoint, Vec<u8>)>> {
        let mut buf = [0u8; MAX_DATAGRAM];
        match self.socket.recv_from(&mut buf) {
            Ok((n, std::net::SocketAddr::V4(addr))) => {
                Ok(Some((Endpoint::from_ipv4(*addr.ip(), addr.port()), buf[..n].to_vec())))
            }
            Ok((_, std::net::SocketAddr::V6(_))) => {
                // IPv6 is out of scope for this wire format; treat as an
                // empty read rather than surfacing an address we can't name.
                Ok(None)
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock || e.kind() == io::ErrorKind::TimedOut => {
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_to_loopback_any_port() {
        let transport = UdpTransport::bind(std::net::Ipv4Addr::LOCALHOST, 0)
            .expect("binding to an ephemeral port never fails in test sandboxes with loopback");
        assert!(transport.local_addr().unwrap().port() > 0);
    }

    #[test]
    fn send_and_receive_roundtrip() {
        let a = UdpTransport::bind(std::net::Ipv4Addr::LOCALHOST, 0).unwrap();
        let b = UdpTransport::bind(std::net::Ipv4Addr::LOCALHOST, 0).unwrap();
        let b_addr = b.local_addr().unwrap();
        let b_endpoint = Endpoint::from_ipv4(std::net::Ipv4Addr::LOCALHOST, b_addr.port());

        let outcome = a.send_to(b"hello", b_endpoint);
        assert!(matches!(outcome, SendOutcome::Sent));

        let (_from, data) = b.recv_from().unwrap().expect("a datagram should arrive");
        assert_eq!(data, b"hello");
    }

    #[test]
    fn recv_times_out_without_blocking_forever() {
        let a = UdpTransport::bind(std::net::Ipv4Addr::LOCALHOST, 0).unwrap();
        let result = a.recv_from().unwrap();
        assert!(result.is_none());
    }
}
