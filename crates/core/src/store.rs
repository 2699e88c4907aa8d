//! On-disk layout of the control directory

use crate::error::{Error, Result};
use std::path::{Component, Path, PathBuf};

/// Name of the control directory under the watched root
pub const CONTROL_DIR: &str = ".bz";

/// Layout of the benzen control directory
///
/// Manages the `.bz/` directory structure:
/// ```text
/// .bz/
///   config.toml
///   locks/
///     daemon.lock
///   logs/
///     bz.log
///   current/
///     <path>            chunk log of the live file
///   snapshot/
///     <name>/
///       <path>          chunk log as of snapshot <name>
/// ```
#[derive(Debug, Clone)]
pub struct Store {
    /// Watched root
    root: PathBuf,
    /// Path to .bz directory
    bz_dir: PathBuf,
}

impl Store {
    /// Layout rooted at `root`; nothing is created on disk
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let bz_dir = root.join(CONTROL_DIR);
        Self { root, bz_dir }
    }

    /// Create the control directory skeleton
    pub fn init(root: impl Into<PathBuf>) -> Result<Self> {
        let store = Self::new(root);
        for dir in [store.current_dir(), store.snapshot_root(), store.logs_dir()] {
            std::fs::create_dir_all(&dir).map_err(|e| Error::io(&dir, e))?;
        }
        Ok(store)
    }

    /// Get the watched root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the .bz directory path
    pub fn bz_dir(&self) -> &Path {
        &self.bz_dir
    }

    pub fn current_dir(&self) -> PathBuf {
        self.bz_dir.join("current")
    }

    pub fn snapshot_root(&self) -> PathBuf {
        self.bz_dir.join("snapshot")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.bz_dir.join("logs")
    }

    pub fn config_path(&self) -> PathBuf {
        self.bz_dir.join("config.toml")
    }

    /// Live file for a tracked path
    pub fn live_path(&self, path: &Path) -> PathBuf {
        self.root.join(path)
    }

    /// Chunk log of the live file
    pub fn current_log(&self, path: &Path) -> PathBuf {
        self.current_dir().join(path)
    }

    /// Directory holding snapshot `name`
    pub fn snapshot_dir(&self, name: &str) -> PathBuf {
        self.snapshot_root().join(name)
    }

    /// Chunk log of `path` inside snapshot `name`
    pub fn snapshot_log(&self, name: &str, path: &Path) -> PathBuf {
        self.snapshot_dir(name).join(path)
    }
}

/// Normalize a path for tracking
///
/// - Strips the watched root from absolute paths under it
/// - Rejects `..` and paths outside the root
/// - Removes `./` components
pub fn normalize_path(root: &Path, path: &Path) -> Result<PathBuf> {
    let relative = if path.is_absolute() {
        path.strip_prefix(root).map_err(|_| {
            Error::InvalidArgument(format!("{} is outside {}", path.display(), root.display()))
        })?
    } else {
        path
    };

    let mut normalized = PathBuf::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => normalized.push(part),
            Component::CurDir => {}
            _ => {
                return Err(Error::InvalidArgument(format!(
                    "unsupported path component in {}",
                    path.display()
                )))
            }
        }
    }

    if normalized.as_os_str().is_empty() {
        return Err(Error::InvalidArgument(format!("empty path: {}", path.display())));
    }
    Ok(normalized)
}

/// Validate a snapshot name: a single, non-hidden path component
pub fn validate_snapshot_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::InvalidArgument("Undefined snapshot name".to_string()));
    }
    if name.starts_with('.') || name.contains('/') || name.contains('\\') {
        return Err(Error::InvalidArgument(format!(
            "snapshot name must be a single visible path component: {name}"
        )));
    }
    Ok(())
}
