//! The peer table: an insertion-ordered, duplicate-free, append-only set of
//! endpoints.
use clocksync_common::Endpoint;

/// The hard cap on the number of peers a single node will track.
pub const MAX_PEERS: usize = 65_535;

/// An ordered, duplicate-free collection of peer endpoints.
///
/// Peers are only ever appended, never removed, for the lifetime of the
/// process; dynamic eviction is out of scope. Callers are expected to check
/// [`PeerTable::contains`] and [`PeerTable::is_full`] before calling
/// [`PeerTable::append`] — `append` itself does not re-check either
/// condition, so handlers stay in control of the drop-vs-accept decision.
#[derive(Clone, Debug, Default)]
pub struct PeerTable {
    peers: Vec<Endpoint>,
}

impl PeerTable {
    /// An empty peer table.
    pub fn new() -> Self {
        Self { peers: Vec::new() }
    }

    /// Whether `endpoint` is already a member.
    pub fn contains(&self, endpoint: &Endpoint) -> bool {
        self.peers.contains(endpoint)
    }

    /// The number of peers currently tracked.
    pub fn len(&self) -> usize {
        self.peers.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    /// Whether the table has reached [`MAX_PEERS`].
    pub fn is_full(&self) -> bool {
        self.peers.len() >= MAX_PEERS
    }

    /// Append `endpoint` unconditionally.
    ///
    /// Callers must have already confirmed `!contains(endpoint) &&
    /// !is_full()`; this is enforced by handler logic, not by this method,
    /// so that a handler's accept/reject decision can be logged alongside
    /// the table mutation it gates.
    pub fn append(&mut self, endpoint: Endpoint) {
        self.peers.push(endpoint);
    }

    /// Iterate over peers in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Endpoint> {
        self.peers.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_preserves_insertion_order() {
        let mut table = PeerTable::new();
        table.append(Endpoint::new(1, 1));
        table.append(Endpoint::new(2, 2));
        table.append(Endpoint::new(3, 3));
        let got: Vec<_> = table.iter().copied().collect();
        assert_eq!(
            got,
            vec![
                Endpoint::new(1, 1),
                Endpoint::new(2, 2),
                Endpoint::new(3, 3)
            ]
        );
    }

    #[test]
    fn contains_reflects_membership() {
        let mut table = PeerTable::new();
        let ep = Endpoint::new(7, 7);
        assert!(!table.contains(&ep));
        table.append(ep);
        assert!(table.contains(&ep));
    }

    #[test]
    fn length_never_decreases_as_peers_are_appended() {
        let mut table = PeerTable::new();
        let mut last_len = table.len();
        for i in 0..100u32 {
            table.append(Endpoint::new(i, 1));
            assert!(table.len() >= last_len);
            last_len = table.len();
        }
    }

    #[test]
    fn is_full_at_cap() {
        let mut table = PeerTable::new();
        for i in 0..MAX_PEERS {
            table.append(Endpoint::new(i as u32, 1));
        }
        assert!(table.is_full());
        assert_eq!(table.len(), MAX_PEERS);
    }
}
