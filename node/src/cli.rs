//! Command-line flags.
use argh::FromArgs;

/// A peer-to-peer clock synchronization daemon.
#[derive(FromArgs, Debug)]
pub struct Args {
    /// address to bind to (hostname or numeric); default: any
    #[argh(option, short = 'b')]
    pub bind: Option<String>,

    /// UDP port to bind to (0-65535); default: 0 (OS-assigned)
    #[argh(option, short = 'p', default = "0")]
    pub port: u16,

    /// bootstrap peer address (hostname or numeric); requires -r
    #[argh(option, short = 'a')]
    pub peer_addr: Option<String>,

    /// bootstrap peer port (1-65535); requires -a
    #[argh(option, short = 'r')]
    pub peer_port: Option<u16>,
}

impl Args {
    /// Parse `-a`/`-r` into a single optional pair, enforcing that both or
    /// neither are present.
    pub fn bootstrap_pair(&self) -> Result<Option<(&str, u16)>, crate::error::Error> {
        match (&self.peer_addr, self.peer_port) {
            (Some(addr), Some(port)) if port > 0 => Ok(Some((addr.as_str(), port))),
            (Some(_), Some(_)) => Err(crate::error::Error::BadFlags(
                "-r must be in the range 1-65535",
            )),
            (None, None) => Ok(None),
            _ => Err(crate::error::Error::BadFlags(
                "-a and -r must both be present or both absent",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(bind: Option<&str>, port: u16, peer_addr: Option<&str>, peer_port: Option<u16>) -> Args {
        Args {
            bind: bind.map(String::from),
            port,
            peer_addr: peer_addr.map(String::from),
            peer_port,
        }
    }

    #[test]
    fn both_absent_is_ok() {
        let a = args(None, 0, None, None);
        assert!(a.bootstrap_pair().unwrap().is_none());
    }

    #[test]
    fn both_present_is_ok() {
        let a = args(None, 0, Some("127.0.0.1"), Some(4000));
        assert_eq!(a.bootstrap_pair().unwrap(), Some(("127.0.0.1", 4000)));
    }

    #[test]
    fn only_addr_is_rejected() {
        let a = args(None, 0, Some("127.0.0.1"), None);
        assert!(a.bootstrap_pair().is_err());
    }

    #[test]
    fn only_port_is_rejected() {
        let a = args(None, 0, None, Some(4000));
        assert!(a.bootstrap_pair().is_err());
    }

    #[test]
    fn zero_peer_port_is_rejected() {
        let a = args(None, 0, Some("127.0.0.1"), Some(0));
        assert!(a.bootstrap_pair().is_err());
    }
}
