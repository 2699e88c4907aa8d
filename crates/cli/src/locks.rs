//! Watcher exclusivity lock
//!
//! Two watchers on one root would append interleaved histories for the
//! same paths, so `bz watch` holds an exclusive `flock` on
//! `.bz/locks/daemon.lock` for its whole lifetime.
//!
//! The kernel drops the `flock` when its holder exits, so a failed lock
//! always means a live watcher. A file left behind by a crashed process is
//! simply locked again.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Held daemon lock; released on drop
pub struct DaemonLock {
    path: PathBuf,
    #[allow(dead_code)]
    file: File,
}

/// Lock file content
#[derive(Debug, Serialize, Deserialize)]
struct LockContent {
    pid: u32,
    started_at: u64,
}

impl DaemonLock {
    /// Acquire the exclusive lock under `bz_dir`
    pub fn acquire(bz_dir: &Path) -> Result<Self> {
        let path = bz_dir.join("locks").join("daemon.lock");
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create locks directory")?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(&path)
            .with_context(|| format!("Failed to open lock file {}", path.display()))?;

        if !try_flock_exclusive(&file)? {
            // Holder may not have written its pid yet
            match read_lock_content(&mut file) {
                Ok(content) => anyhow::bail!(
                    "Another bz watcher is running on this tree (pid {})",
                    content.pid
                ),
                Err(_) => anyhow::bail!("Another bz watcher is running on this tree"),
            }
        }

        write_lock_content(&mut file)?;
        Ok(Self { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for DaemonLock {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

fn write_lock_content(file: &mut File) -> Result<()> {
    let content = LockContent {
        pid: std::process::id(),
        started_at: current_timestamp_ms(),
    };
    let serialized = serde_json::to_string(&content).context("Failed to serialize lock content")?;

    file.set_len(0)?;
    file.seek(SeekFrom::Start(0))?;
    file.write_all(serialized.as_bytes())?;
    file.sync_all()?;
    Ok(())
}

fn read_lock_content(file: &mut File) -> Result<LockContent> {
    file.seek(SeekFrom::Start(0))?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)?;
    serde_json::from_str(&contents).context("Failed to deserialize lock content")
}

/// Try to acquire exclusive file lock (non-blocking)
#[cfg(unix)]
fn try_flock_exclusive(file: &File) -> Result<bool> {
    use nix::fcntl::{flock, FlockArg};
    use std::os::unix::io::AsRawFd;

    match flock(file.as_raw_fd(), FlockArg::LockExclusiveNonblock) {
        Ok(_) => Ok(true),
        Err(nix::errno::Errno::EWOULDBLOCK) => Ok(false),
        Err(e) => Err(e.into()),
    }
}

#[cfg(not(unix))]
fn try_flock_exclusive(_file: &File) -> Result<bool> {
    Ok(true)
}

fn current_timestamp_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
