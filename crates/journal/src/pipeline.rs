//! Watch pipeline: live file change -> document update -> appended delta

use crate::bridge::Bridge;
use crate::registry::Registry;
use bz_core::{Error, Replica, Result};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, trace};

/// Applies debounced file changes to their documents
pub struct WatchPipeline<D: Replica> {
    registry: Arc<Registry<D>>,
    bridge: Arc<Bridge>,
}

impl<D: Replica> WatchPipeline<D> {
    pub fn new(registry: Arc<Registry<D>>, bridge: Arc<Bridge>) -> Self {
        Self { registry, bridge }
    }

    /// Process one change notification for `path`
    ///
    /// 1. Resolve the chunk log and make sure its directory exists
    /// 2. Get or hydrate the document
    /// 3. Capture the durable clock (held by the entry)
    /// 4. Read the live file into the document's content
    /// 5. Take the delta since that clock
    /// 6. Append it to the chunk log
    ///
    /// The path's entry stays locked across all steps. Returns the number of
    /// chunks appended; a file that vanished before it could be read leaves
    /// the document untouched and appends nothing.
    pub fn on_change(&self, path: &Path) -> Result<usize> {
        let log = self.registry.current_log(path);
        if let Some(parent) = log.path().parent() {
            std::fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }

        let handle = self.registry.get_or_load(path)?;
        let mut tracked = handle.lock();

        match self.bridge.read(path, tracked.doc_mut()) {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {
                debug!(path = %path.display(), "File gone before read, skipping");
                return Ok(0);
            }
            Err(e) => return Err(e),
        }

        let appended = tracked.flush_to(&log)?;
        if appended == 0 {
            trace!(path = %path.display(), "Content unchanged");
        } else {
            debug!(path = %path.display(), chunks = appended, "Appended delta");
        }
        Ok(appended)
    }
}
