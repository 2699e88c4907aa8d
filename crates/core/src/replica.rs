//! Capability interface for replicated documents
//!
//! The sync engine never looks inside a document. It only needs to apply
//! chunks, extract the chunks newer than a clock, read the current clock,
//! and move the `content` subtree in and out. Anything implementing this
//! trait can be mirrored, snapshotted and merged.

use crate::content::Content;
use crate::error::Result;
use std::fmt::Debug;

pub trait Replica: Default + Send + 'static {
    /// Opaque unit of change
    type Chunk: Clone + Debug + Send + Sync;

    /// Logical version marker, only meaningful to `delta`
    type Clock: Clone + Debug + Send + Sync;

    /// Snapshot of the current clock
    fn clock(&self) -> Self::Clock;

    /// Apply chunks in order. Chunks already covered by the clock are no-ops.
    fn apply(&mut self, chunks: &[Self::Chunk]);

    /// Every chunk this document holds that `since` does not cover
    fn delta(&self, since: &Self::Clock) -> Vec<Self::Chunk>;

    /// Current value of the `content` subtree, `None` while it was never written
    fn content(&self) -> Option<Content>;

    /// Overwrite the `content` subtree. Produces no chunks when nothing changed.
    fn set_content(&mut self, content: Content);

    /// Deterministic binary form of a chunk
    fn pack(chunk: &Self::Chunk) -> Result<Vec<u8>>;

    /// Inverse of `pack`
    fn unpack(bytes: &[u8]) -> Result<Self::Chunk>;
}
