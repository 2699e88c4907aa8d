//! Workflow integration tests
//!
//! End-to-end scenarios over a real `.bz/` store, in process and through
//! the `bz` binary.

pub mod binary;
pub mod snapshots;
