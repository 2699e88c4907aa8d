//! Common utilities for integration tests

pub mod cli;
pub mod tree;

// Re-export commonly used items
pub use tree::TestTree;
