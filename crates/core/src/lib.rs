//! Core types for benzen
//!
//! This crate provides:
//! - The `Replica` capability the sync engine drives (apply / delta / clock)
//! - `TreeDoc`, a last-writer-wins register tree implementing it
//! - Content model shared by codecs and documents
//! - On-disk layout of the `.bz/` control directory
//! - The error taxonomy used across crates

pub mod clock;
pub mod content;
pub mod doc;
pub mod error;
pub mod replica;
pub mod store;

pub use clock::{Clock, PeerId, Stamp};
pub use content::Content;
pub use doc::{Chunk, Leaf, TreeDoc};
pub use error::{Error, Result};
pub use replica::Replica;
pub use store::Store;
