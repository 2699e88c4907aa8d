//! Shared utilities for CLI commands

use anyhow::{Context, Result};
use bz_core::store::CONTROL_DIR;
use std::path::{Path, PathBuf};

/// Resolve the tree root to operate on
///
/// An explicit root wins. Otherwise walk up from the current directory to
/// the nearest ancestor holding `.bz/`, falling back to the current
/// directory itself so a fresh tree can be watched without `bz init`.
pub fn resolve_root(explicit: Option<&Path>) -> Result<PathBuf> {
    let start = match explicit {
        Some(root) => return canonical(root),
        None => std::env::current_dir().context("Failed to get current directory")?,
    };

    Ok(find_root_from(&start).unwrap_or(start))
}

/// Nearest ancestor of `start` (inclusive) that contains the control directory
pub fn find_root_from(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(CONTROL_DIR).is_dir())
        .map(Path::to_path_buf)
}

fn canonical(root: &Path) -> Result<PathBuf> {
    root.canonicalize()
        .with_context(|| format!("Root directory {} does not exist", root.display()))
}
