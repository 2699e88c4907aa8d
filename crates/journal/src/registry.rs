//! Path -> document registry
//!
//! One entry per tracked path, created the first time the path is touched
//! and never evicted. Each entry sits behind its own mutex: every mutation
//! of a path's document (watch event, restore, merge) holds that lock for
//! its whole duration, which totally orders work on the same path while
//! leaving different paths independent.

use crate::chunk_log::ChunkLog;
use bz_core::{Replica, Result, Store};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Shared, lockable registry entry
pub type DocHandle<D> = Arc<Mutex<Tracked<D>>>;

/// A live document plus the clock its chunk log is known to cover
pub struct Tracked<D: Replica> {
    doc: D,
    durable: D::Clock,
}

impl<D: Replica> Tracked<D> {
    /// Wrap a document whose whole history is already on disk
    pub fn new(doc: D) -> Self {
        let durable = doc.clock();
        Self { doc, durable }
    }

    pub fn doc(&self) -> &D {
        &self.doc
    }

    pub fn doc_mut(&mut self) -> &mut D {
        &mut self.doc
    }

    /// Chunks applied in memory but not yet appended to the log
    pub fn pending(&self) -> Vec<D::Chunk> {
        self.doc.delta(&self.durable)
    }

    /// Record that everything applied so far is on disk
    pub fn mark_durable(&mut self) {
        self.durable = self.doc.clock();
    }

    /// Swap in a document rebuilt from a replaced log
    pub fn reset(&mut self, doc: D) {
        self.durable = doc.clock();
        self.doc = doc;
    }

    /// Append pending chunks to `log` and advance the durable clock
    ///
    /// Returns the number of chunks written. On failure the chunks stay
    /// pending and go out with the next flush.
    pub fn flush_to(&mut self, log: &ChunkLog) -> Result<usize> {
        let pending = self.pending();
        if pending.is_empty() {
            return Ok(0);
        }
        log.append::<D>(&pending)?;
        self.mark_durable();
        Ok(pending.len())
    }
}

/// Registry of live documents keyed by tracked path
pub struct Registry<D: Replica> {
    store: Store,
    docs: DashMap<PathBuf, DocHandle<D>>,
}

impl<D: Replica> Registry<D> {
    /// Create an empty registry over `store`
    pub fn new(store: Store) -> Self {
        Self {
            store,
            docs: DashMap::new(),
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Chunk log backing the live document for `path`
    pub fn current_log(&self, path: &Path) -> ChunkLog {
        ChunkLog::at(self.store.current_log(path))
    }

    /// Return the entry for `path`, replaying its chunk log on first access
    ///
    /// Insert-if-absent is atomic per path: concurrent callers for the same
    /// path always get the same handle. The replay runs without holding the
    /// map shard; when two callers race, the first insert wins and the other
    /// replayed document is dropped.
    pub fn get_or_load(&self, path: &Path) -> Result<DocHandle<D>> {
        if let Some(handle) = self.get(path) {
            return Ok(handle);
        }

        let log = self.current_log(path);
        let doc: D = log.replay()?;
        debug!(path = %path.display(), "Hydrated document from {}", log.path().display());

        let handle = self
            .docs
            .entry(path.to_path_buf())
            .or_insert_with(|| Arc::new(Mutex::new(Tracked::new(doc))));
        Ok(Arc::clone(handle.value()))
    }

    /// Existing entry for `path`, without loading
    pub fn get(&self, path: &Path) -> Option<DocHandle<D>> {
        self.docs.get(path).map(|entry| Arc::clone(entry.value()))
    }

    /// Every tracked path, sorted
    pub fn all_paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = self.docs.iter().map(|entry| entry.key().clone()).collect();
        paths.sort();
        paths
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }
}
