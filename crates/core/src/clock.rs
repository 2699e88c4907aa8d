//! Logical clocks for `TreeDoc`

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Identity of the replica that produced a chunk
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct PeerId(pub u64);

impl PeerId {
    /// Fresh random peer, one per document instance
    pub fn random() -> Self {
        Self(rand::random())
    }
}

/// Total order over writes: Lamport time, then peer as tie-breaker
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct Stamp {
    pub time: u64,
    pub peer: PeerId,
}

/// Version vector: highest sequence number seen per peer
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Clock {
    seen: BTreeMap<PeerId, u64>,
}

impl Clock {
    /// The origin clock, covering nothing
    pub fn origin() -> Self {
        Self::default()
    }

    /// Highest sequence seen from `peer` (0 if none)
    pub fn get(&self, peer: PeerId) -> u64 {
        self.seen.get(&peer).copied().unwrap_or(0)
    }

    /// Whether the chunk `(peer, seq)` is already covered
    pub fn covers(&self, peer: PeerId, seq: u64) -> bool {
        seq <= self.get(peer)
    }

    /// Record `(peer, seq)`
    pub fn observe(&mut self, peer: PeerId, seq: u64) {
        let entry = self.seen.entry(peer).or_insert(0);
        if seq > *entry {
            *entry = seq;
        }
    }
}
