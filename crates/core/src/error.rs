use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result alias for sync engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the chunk log, registry, bridge and snapshot manager
#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    InvalidArgument(String),

    #[error("snapshot not found: {0}")]
    SnapshotNotFound(String),

    #[error("corrupt chunk log {}: {reason}", path.display())]
    CorruptLog { path: PathBuf, reason: String },

    #[error("codec error for {}: {reason}", path.display())]
    Codec { path: PathBuf, reason: String },

    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("chunk encoding error: {0}")]
    Encoding(#[from] bincode::Error),

    #[error("{op} failed for {failed} of {total} paths\n{details}")]
    Incomplete {
        op: &'static str,
        failed: usize,
        total: usize,
        details: String,
    },
}

impl Error {
    /// Wrap an I/O error with the path it occurred on
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub fn corrupt(path: impl AsRef<Path>, reason: impl Into<String>) -> Self {
        Error::CorruptLog {
            path: path.as_ref().to_path_buf(),
            reason: reason.into(),
        }
    }

    pub fn codec(path: impl AsRef<Path>, reason: impl Into<String>) -> Self {
        Error::Codec {
            path: path.as_ref().to_path_buf(),
            reason: reason.into(),
        }
    }

    /// Short machine-readable code, used in log fields
    pub fn code(&self) -> &'static str {
        match self {
            Error::InvalidArgument(_) => "invalid_argument",
            Error::SnapshotNotFound(_) => "snapshot_not_found",
            Error::CorruptLog { .. } => "corrupt_log",
            Error::Codec { .. } => "codec",
            Error::Io { .. } => "io",
            Error::Encoding(_) => "encoding",
            Error::Incomplete { .. } => "incomplete",
        }
    }

    /// True when the underlying cause is a missing file
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound)
    }
}
