//! The node's synchronization level and time offset.
use clocksync_common::Endpoint;

/// `0` = root (the leader).
pub const LEVEL_ROOT: u8 = 0;
/// The last level a node may occupy and still propagate synchronization
/// further; a node at `LEVEL_BOUNDARY` or above must not broadcast or
/// answer `DELAY_REQUEST`.
pub const LEVEL_BOUNDARY: u8 = 254;
/// `255` = unsynchronized.
pub const LEVEL_UNSYNCHRONIZED: u8 = 255;

/// Whether a node at `level` may still propagate synchronization to others
/// (broadcast `SYNC_START`, answer `DELAY_REQUEST`, accept a new source).
pub fn can_propagate(level: u8) -> bool {
    level < LEVEL_BOUNDARY
}

/// The node's current synchronization state.
///
/// Invariants (see the data model): if `level == LEVEL_ROOT`, `source_*`
/// fields are unused; if `level == LEVEL_UNSYNCHRONIZED`, `offset_ms == 0`
/// and `source_endpoint` is `None`; otherwise `level == source_level + 1`
/// and `source_level <= LEVEL_BOUNDARY - 1`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SyncState {
    level: u8,
    source_endpoint: Option<Endpoint>,
    source_level: u8,
    offset_ms: i64,
}

impl Default for SyncState {
    fn default() -> Self {
        Self {
            level: LEVEL_UNSYNCHRONIZED,
            source_endpoint: None,
            source_level: LEVEL_ROOT,
            offset_ms: 0,
        }
    }
}

impl SyncState {
    /// A fresh, unsynchronized state.
    pub fn new() -> Self {
        Self::default()
    }

    /// This node's current synchronization level.
    pub fn level(&self) -> u8 {
        self.level
    }

    /// The endpoint this node's level was derived from, if any.
    pub fn source_endpoint(&self) -> Option<Endpoint> {
        self.source_endpoint
    }

    /// The source's level at the time it was last used to derive our level.
    pub fn source_level(&self) -> u8 {
        self.source_level
    }

    /// Milliseconds to subtract from the local clock to yield synchronized
    /// time (`synchronized = local - offset_ms`).
    pub fn offset_ms(&self) -> i64 {
        self.offset_ms
    }

    /// Whether this node is the root (the leader).
    pub fn is_root(&self) -> bool {
        self.level == LEVEL_ROOT
    }

    /// Whether this node is unsynchronized.
    pub fn is_unsynchronized(&self) -> bool {
        self.level == LEVEL_UNSYNCHRONIZED
    }

    /// Derive the synchronized time to stamp on an outgoing message, given
    /// the local monotonic time in milliseconds.
    pub fn to_wire_time(&self, local_now_ms: i64) -> i64 {
        local_now_ms - self.offset_ms
    }

    /// Become root: `LEADER(0)`.
    pub fn become_root(&mut self) {
        self.level = LEVEL_ROOT;
        self.source_endpoint = None;
        self.source_level = LEVEL_ROOT;
        self.offset_ms = 0;
    }

    /// Step down from root: `LEADER(255)` received while already root.
    pub fn step_down(&mut self) {
        self.level = LEVEL_UNSYNCHRONIZED;
    }

    /// Fall out of sync: recv timeout, exchange timeout, or an excessive
    /// round-trip bound violation. Does not touch `source_endpoint` when
    /// called from the bound-violation path (see the engine's
    /// `DELAY_RESPONSE` handler), which calls [`SyncState::set_level`]
    /// directly instead to preserve that documented asymmetry.
    pub fn desynchronize(&mut self) {
        self.level = LEVEL_UNSYNCHRONIZED;
        self.source_endpoint = None;
        self.source_level = LEVEL_ROOT;
        self.offset_ms = 0;
    }

    /// Set only the level, leaving `source_endpoint`/`source_level`/`offset_ms`
    /// untouched. Used for the `DELAY_RESPONSE` round-trip-bound-violation
    /// path, where the original protocol resets level but not source.
    pub fn set_level(&mut self, level: u8) {
        self.level = level;
    }

    /// Commit a successful exchange: adopt `source` at `source_level`,
    /// derive our own level as `source_level + 1`, and record the offset.
    pub fn commit(&mut self, source: Endpoint, source_level: u8, offset_ms: i64) {
        self.source_endpoint = Some(source);
        self.source_level = source_level;
        self.level = source_level + 1;
        self.offset_ms = offset_ms;
    }
}
