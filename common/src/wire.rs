//! The wire codec: ten fixed-format message kinds, all big-endian.
//!
//! Framing is a single kind byte followed by a kind-specific payload.
//! [`validate_length`] enforces the exact (or minimum, for `HELLO_REPLY`)
//! length for each kind before a payload is ever parsed; [`Message::decode`]
//! additionally walks `HELLO_REPLY`'s peer list to confirm every declared
//! entry actually fits in the datagram.
use std::io::{self, Cursor, Read, Write};

use thiserror::Error;

use crate::endpoint::Endpoint;

/// A message kind, identified by its single-byte wire tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Kind {
    /// `HELLO` (1): introduce ourselves to a peer.
    Hello,
    /// `HELLO_REPLY` (2): the bootstrap peer's current peer list.
    HelloReply,
    /// `CONNECT` (3): request mutual acknowledgement.
    Connect,
    /// `ACK_CONNECT` (4): acknowledge a `CONNECT`.
    AckConnect,
    /// `SYNC_START` (11): begin a time exchange.
    SyncStart,
    /// `DELAY_REQUEST` (12): request the partner's receive timestamp.
    DelayRequest,
    /// `DELAY_RESPONSE` (13): the partner's receive timestamp.
    DelayResponse,
    /// `LEADER` (21): an external declaration of root status.
    Leader,
    /// `GET_TIME` (31): a client query for synchronized time.
    GetTime,
    /// `TIME` (32): the reply to `GET_TIME`.
    Time,
}

impl Kind {
    /// The wire byte for this kind.
    pub const fn tag(self) -> u8 {
        match self {
            Kind::Hello => 1,
            Kind::HelloReply => 2,
            Kind::Connect => 3,
            Kind::AckConnect => 4,
            Kind::SyncStart => 11,
            Kind::DelayRequest => 12,
            Kind::DelayResponse => 13,
            Kind::Leader => 21,
            Kind::GetTime => 31,
            Kind::Time => 32,
        }
    }

    /// Decode a kind from its wire byte.
    pub fn from_tag(tag: u8) -> Option<Self> {
        Some(match tag {
            1 => Kind::Hello,
            2 => Kind::HelloReply,
            3 => Kind::Connect,
            4 => Kind::AckConnect,
            11 => Kind::SyncStart,
            12 => Kind::DelayRequest,
            13 => Kind::DelayResponse,
            21 => Kind::Leader,
            31 => Kind::GetTime,
            32 => Kind::Time,
            _ => return None,
        })
    }
}

/// Address length accepted in a decoded `HELLO_REPLY` entry.
///
/// The wire format carries a length byte ahead of each address so that a
/// future revision could support a different address family; this
/// implementation only understands 4-byte (IPv4) addresses.
pub const ADDR_LEN: u8 = 4;

/// Why a datagram was rejected before or during decoding.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireError {
    /// The datagram was empty.
    #[error("empty datagram")]
    Empty,
    /// The leading byte did not match any known [`Kind`].
    #[error("unknown message kind byte {0}")]
    UnknownKind(u8),
    /// The datagram length did not match the table for its kind.
    #[error("invalid length {len} for kind {kind:?}")]
    InvalidLength {
        /// The offending kind.
        kind: Kind,
        /// The datagram's actual length.
        len: usize,
    },
    /// A `HELLO_REPLY` entry declared an address length other than 4.
    #[error("unsupported address length {0}")]
    UnsupportedAddrLen(u8),
    /// A `HELLO_REPLY` declared more peers than fit in its payload.
    #[error("truncated payload")]
    Truncated,
}

/// A decoded protocol message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Message {
    /// `HELLO`.
    Hello,
    /// `HELLO_REPLY`, carrying the sender's current peer list in insertion
    /// order.
    HelloReply(Vec<Endpoint>),
    /// `CONNECT`.
    Connect,
    /// `ACK_CONNECT`.
    AckConnect,
    /// `SYNC_START`, carrying the sender's level and partner-stamped T1.
    SyncStart {
        /// The sender's synchronization level.
        level: u8,
        /// T1: the sender's send timestamp, milliseconds.
        t1_ms: i64,
    },
    /// `DELAY_REQUEST`.
    DelayRequest,
    /// `DELAY_RESPONSE`, carrying the sender's level and T4.
    DelayResponse {
        /// The sender's synchronization level.
        level: u8,
        /// T4: the sender's receive timestamp of `DELAY_REQUEST`, milliseconds.
        t4_ms: i64,
    },
    /// `LEADER`, an external declaration affecting root status.
    Leader {
        /// `0` to become root, `255` to step down; any other value is invalid.
        value: u8,
    },
    /// `GET_TIME`.
    GetTime,
    /// `TIME`, the reply to `GET_TIME`.
    Time {
        /// The replier's synchronization level.
        level: u8,
        /// The replier's synchronized time, milliseconds.
        t_ms: i64,
    },
}

impl Message {
    /// This message's [`Kind`].
    pub fn kind(&self) -> Kind {
        match self {
            Message::Hello => Kind::Hello,
            Message::HelloReply(_) => Kind::HelloReply,
            Message::Connect => Kind::Connect,
            Message::AckConnect => Kind::AckConnect,
            Message::SyncStart { .. } => Kind::SyncStart,
            Message::DelayRequest => Kind::DelayRequest,
            Message::DelayResponse { .. } => Kind::DelayResponse,
            Message::Leader { .. } => Kind::Leader,
            Message::GetTime => Kind::GetTime,
            Message::Time { .. } => Kind::Time,
        }
    }

    /// Encode this message into a fresh buffer.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.encode_into(&mut buf)
            .expect("writing to a Vec<u8> never fails");
        buf
    }

    /// Encode this message, appending to `w`.
    pub fn encode_into<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(&[self.kind().tag()])?;
        match self {
            Message::Hello
            | Message::Connect
            | Message::AckConnect
            | Message::DelayRequest
            | Message::GetTime => {}
            Message::HelloReply(peers) => {
                w.write_all(&(peers.len() as u16).to_be_bytes())?;
                for peer in peers {
                    w.write_all(&[ADDR_LEN])?;
                    w.write_all(&peer.addr.to_be_bytes())?;
                    w.write_all(&peer.port.to_be_bytes())?;
                }
            }
            Message::SyncStart { level, t1_ms } => {
                w.write_all(&[*level])?;
                w.write_all(&t1_ms.to_be_bytes())?;
            }
            Message::DelayResponse { level, t4_ms } => {
                w.write_all(&[*level])?;
                w.write_all(&t4_ms.to_be_bytes())?;
            }
            Message::Leader { value } => {
                w.write_all(&[*value])?;
            }
            Message::Time { level, t_ms } => {
                w.write_all(&[*level])?;
                w.write_all(&t_ms.to_be_bytes())?;
            }
        }
        Ok(())
    }

    /// Decode a message from a complete datagram.
    ///
    /// Validates the overall length against [`validate_length`] before
    /// parsing, and for `HELLO_REPLY` additionally confirms every declared
    /// entry fits within the datagram.
    pub fn decode(buf: &[u8]) -> Result<Self, WireError> {
        let tag = *buf.first().ok_or(WireError::Empty)?;
        let kind = Kind::from_tag(tag).ok_or(WireError::UnknownKind(tag))?;
        if !validate_length(kind, buf.len()) {
            return Err(WireError::InvalidLength {
                kind,
                len: buf.len(),
            });
        }

        let mut r = Cursor::new(&buf[1..]);
        match kind {
            Kind::Hello => Ok(Message::Hello),
            Kind::Connect => Ok(Message::Connect),
            Kind::AckConnect => Ok(Message::AckConnect),
            Kind::DelayRequest => Ok(Message::DelayRequest),
            Kind::GetTime => Ok(Message::GetTime),
            Kind::HelloReply => decode_hello_reply(&mut r),
            Kind::SyncStart => {
                let level = read_u8(&mut r)?;
                let t1_ms = read_i64(&mut r)?;
                Ok(Message::SyncStart { level, t1_ms })
            }
            Kind::DelayResponse => {
                let level = read_u8(&mut r)?;
                let t4_ms = read_i64(&mut r)?;
                Ok(Message::DelayResponse { level, t4_ms })
            }
            Kind::Leader => {
                let value = read_u8(&mut r)?;
                Ok(Message::Leader { value })
            }
            Kind::Time => {
                let level = read_u8(&mut r)?;
                let t_ms = read_i64(&mut r)?;
                Ok(Message::Time { level, t_ms })
            }
        }
    }
}

fn decode_hello_reply(r: &mut Cursor<&[u8]>) -> Result<Message, WireError> {
    let n = read_u16(r)?;
    let mut peers = Vec::with_capacity(n as usize);
    for _ in 0..n {
        let len = read_u8(r)?;
        if len != ADDR_LEN {
            return Err(WireError::UnsupportedAddrLen(len));
        }
        let mut octets = [0u8; 4];
        r.read_exact(&mut octets).map_err(|_| WireError::Truncated)?;
        let addr = u32::from_be_bytes(octets);
        let port = read_u16(r)?;
        peers.push(Endpoint::new(addr, port));
    }
    Ok(Message::HelloReply(peers))
}

fn read_u8(r: &mut Cursor<&[u8]>) -> Result<u8, WireError> {
    let mut b = [0u8; 1];
    r.read_exact(&mut b).map_err(|_| WireError::Truncated)?;
    Ok(b[0])
}

fn read_u16(r: &mut Cursor<&[u8]>) -> Result<u16, WireError> {
    let mut b = [0u8; 2];
    r.read_exact(&mut b).map_err(|_| WireError::Truncated)?;
    Ok(u16::from_be_bytes(b))
}

fn read_i64(r: &mut Cursor<&[u8]>) -> Result<i64, WireError> {
    let mut b = [0u8; 8];
    r.read_exact(&mut b).map_err(|_| WireError::Truncated)?;
    Ok(i64::from_be_bytes(b))
}

/// Whether a datagram of length `n` is admissible for `kind`.
///
/// `HELLO_REPLY` has no fixed length (it carries a variable-size peer
/// list), so only a lower bound of 3 bytes (kind + `u16` count) is checked
/// here; full validation happens in [`Message::decode`].
pub fn validate_length(kind: Kind, n: usize) -> bool {
    match kind {
        Kind::Hello
        | Kind::Connect
        | Kind::AckConnect
        | Kind::DelayRequest
        | Kind::GetTime => n == 1,
        Kind::HelloReply => n >= 3,
        Kind::SyncStart | Kind::DelayResponse | Kind::Time => n == 10,
        Kind::Leader => n == 2,
    }
}

/// The wire-encoded byte length of a `HELLO_REPLY` carrying `peer_count`
/// peers, used to decide whether a reply would exceed the 65,535-byte
/// datagram limit before it is ever built.
pub fn hello_reply_len(peer_count: usize) -> usize {
    1 + 2 + peer_count * (1 + 4 + 2)
}

/// Format the first `up to 10` bytes of a dropped datagram as lowercase hex,
/// for the `ERROR MSG <hex>` diagnostic line mandated by the wire format.
pub fn diagnostic_hex(buf: &[u8]) -> String {
    let n = buf.len().min(10);
    let mut s = String::with_capacity(n * 2);
    for b in &buf[..n] {
        s.push_str(&format!("{:02x}", b));
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(msg: Message) {
        let encoded = msg.encode();
        let decoded = Message::decode(&encoded).expect("decodes");
        assert_eq!(msg, decoded);
    }

    #[test]
    fn roundtrips_every_fixed_kind() {
        roundtrip(Message::Hello);
        roundtrip(Message::Connect);
        roundtrip(Message::AckConnect);
        roundtrip(Message::DelayRequest);
        roundtrip(Message::GetTime);
        roundtrip(Message::SyncStart {
            level: 3,
            t1_ms: 123_456,
        });
        roundtrip(Message::DelayResponse {
            level: 7,
            t4_ms: -99,
        });
        roundtrip(Message::Leader { value: 0 });
        roundtrip(Message::Time {
            level: 12,
            t_ms: 99,
        });
    }

    #[test]
    fn hello_reply_preserves_insertion_order() {
        let peers = vec![
            Endpoint::new(1, 1000),
            Endpoint::new(2, 2000),
            Endpoint::new(3, 3000),
        ];
        roundtrip(Message::HelloReply(peers));
    }

    #[test]
    fn hello_reply_empty_list() {
        roundtrip(Message::HelloReply(vec![]));
    }

    #[test]
    fn rejects_wrong_length() {
        assert_eq!(
            Message::decode(&[Kind::Hello.tag(), 0]),
            Err(WireError::InvalidLength {
                kind: Kind::Hello,
                len: 2
            })
        );
        assert_eq!(
            Message::decode(&[Kind::SyncStart.tag(); 5]),
            Err(WireError::InvalidLength {
                kind: Kind::SyncStart,
                len: 5
            })
        );
    }

    #[test]
    fn rejects_empty_datagram() {
        assert_eq!(Message::decode(&[]), Err(WireError::Empty));
    }

    #[test]
    fn rejects_unknown_kind() {
        assert_eq!(Message::decode(&[200]), Err(WireError::UnknownKind(200)));
    }

    #[test]
    fn rejects_unsupported_addr_len() {
        // kind=HELLO_REPLY, n=1, L=6 (not 4)
        let mut buf = vec![Kind::HelloReply.tag(), 0, 1, 6];
        buf.extend_from_slice(&[0u8; 6]);
        buf.extend_from_slice(&[0u8; 2]);
        assert_eq!(
            Message::decode(&buf),
            Err(WireError::UnsupportedAddrLen(6))
        );
    }

    #[test]
    fn rejects_hello_reply_whose_declared_peers_do_not_fit() {
        // n=5 but no peer data follows.
        let buf = vec![Kind::HelloReply.tag(), 0, 5];
        assert_eq!(Message::decode(&buf), Err(WireError::Truncated));
    }

    #[test]
    fn never_panics_on_truncated_prefixes_of_any_kind() {
        let samples = [
            Message::Hello.encode(),
            Message::HelloReply(vec![Endpoint::new(1, 2), Endpoint::new(3, 4)]).encode(),
            Message::SyncStart {
                level: 1,
                t1_ms: 42,
            }
            .encode(),
            Message::DelayResponse {
                level: 1,
                t4_ms: 42,
            }
            .encode(),
            Message::Leader { value: 0 }.encode(),
            Message::Time { level: 1, t_ms: 1 }.encode(),
        ];
        for sample in samples {
            for len in 0..=sample.len() {
                let _ = Message::decode(&sample[..len]);
            }
        }
    }

    #[test]
    fn diagnostic_hex_caps_at_ten_bytes() {
        let buf: Vec<u8> = (0u8..20).collect();
        assert_eq!(diagnostic_hex(&buf), "00010203040506070809");
    }

    #[test]
    fn hello_reply_len_matches_encoded_size() {
        let peers = vec![Endpoint::new(1, 1), Endpoint::new(2, 2)];
        let msg = Message::HelloReply(peers.clone());
        assert_eq!(msg.encode().len(), hello_reply_len(peers.len()));
    }
}
