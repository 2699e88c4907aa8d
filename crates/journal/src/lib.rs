//! Chunk journal and synchronization engine
//!
//! This crate provides:
//! - Append-only chunk log files (length-prefixed records)
//! - Document registry, hydrated lazily from chunk logs
//! - Content bridge with per-extension codecs
//! - Watch pipeline turning file changes into appended deltas
//! - Snapshot store / restore / merge / list

pub mod bridge;
pub mod chunk_log;
pub mod codec;
pub mod pipeline;
pub mod registry;
pub mod snapshot;

// Re-exports
pub use bridge::Bridge;
pub use chunk_log::ChunkLog;
pub use codec::{Codec, JsonCodec, TextCodec};
pub use pipeline::WatchPipeline;
pub use registry::{DocHandle, Registry, Tracked};
pub use snapshot::{SnapshotManager, SnapshotReport};
