//! Bridge between live files and document `content` subtrees

use crate::codec::{Codec, JsonCodec, TextCodec};
use bz_core::{Error, Replica, Result, Store};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::trace;

/// Per-extension codec dispatch over the watched root
pub struct Bridge {
    store: Store,
    codecs: HashMap<String, Arc<dyn Codec>>,
    fallback: Arc<dyn Codec>,
}

impl Bridge {
    /// Bridge with the built-in codecs: JSON for `.json`, text for the rest
    pub fn new(store: Store) -> Self {
        let mut bridge = Self {
            store,
            codecs: HashMap::new(),
            fallback: Arc::new(TextCodec),
        };
        bridge.register("json", Arc::new(JsonCodec));
        bridge
    }

    /// Use `codec` for files ending in `.<ext>` (case-insensitive)
    pub fn register(&mut self, ext: &str, codec: Arc<dyn Codec>) {
        self.codecs.insert(ext.to_ascii_lowercase(), codec);
    }

    pub fn codec_for(&self, path: &Path) -> &dyn Codec {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| self.codecs.get(&ext.to_ascii_lowercase()))
            .unwrap_or(&self.fallback)
            .as_ref()
    }

    /// Overwrite `doc`'s content from the live file at `path`
    pub fn read<D: Replica>(&self, path: &Path, doc: &mut D) -> Result<()> {
        let live = self.store.live_path(path);
        let bytes = std::fs::read(&live).map_err(|e| Error::io(&live, e))?;

        let codec = self.codec_for(path);
        trace!(path = %path.display(), codec = codec.name(), len = bytes.len(), "Reading live file");

        let content = codec.decode(bytes).map_err(|reason| Error::codec(path, reason))?;
        trace!(path = %path.display(), kind = content.kind(), "Decoded");
        doc.set_content(content);
        Ok(())
    }

    /// Materialize `doc`'s content onto the live file at `path`
    ///
    /// Returns `false` when the document has no content to write.
    pub fn write<D: Replica>(&self, path: &Path, doc: &D) -> Result<bool> {
        let Some(content) = doc.content() else {
            return Ok(false);
        };

        let codec = self.codec_for(path);
        let bytes = codec.encode(&content).map_err(|reason| Error::codec(path, reason))?;

        let live = self.store.live_path(path);
        if let Some(parent) = live.parent() {
            std::fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }
        std::fs::write(&live, &bytes).map_err(|e| Error::io(&live, e))?;

        trace!(path = %path.display(), codec = codec.name(), len = bytes.len(), "Wrote live file");
        Ok(true)
    }
}
