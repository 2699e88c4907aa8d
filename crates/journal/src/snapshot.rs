//! Named snapshots of the chunk-log tree
//!
//! Every operation walks all tracked paths one at a time and keeps going
//! when a single path fails. Nothing is transactional: a failed path is
//! logged, collected into the `SnapshotReport`, and the remaining paths are
//! still processed. Callers turn a report with failures into an error with
//! `SnapshotReport::check`.

use crate::bridge::Bridge;
use crate::chunk_log::ChunkLog;
use crate::registry::Registry;
use bz_core::store::validate_snapshot_name;
use bz_core::{Error, Replica, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What happened to one path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    /// Log copied or live file rewritten
    Updated,
    /// Nothing to do for this path
    Unchanged,
    /// Path has no log on the side being read
    Skipped,
}

/// Per-path results of one snapshot operation
#[derive(Debug)]
pub struct SnapshotReport {
    pub op: &'static str,
    pub name: String,
    pub updated: Vec<PathBuf>,
    pub unchanged: Vec<PathBuf>,
    pub skipped: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, Error)>,
}

impl SnapshotReport {
    fn new(op: &'static str, name: &str) -> Self {
        Self {
            op,
            name: name.to_string(),
            updated: Vec::new(),
            unchanged: Vec::new(),
            skipped: Vec::new(),
            failed: Vec::new(),
        }
    }

    fn record(&mut self, path: PathBuf, result: Result<Outcome>) {
        match result {
            Ok(Outcome::Updated) => self.updated.push(path),
            Ok(Outcome::Unchanged) => self.unchanged.push(path),
            Ok(Outcome::Skipped) => {
                debug!(op = self.op, path = %path.display(), "No log to read, skipped");
                self.skipped.push(path);
            }
            Err(e) => {
                warn!(op = self.op, snapshot = %self.name, path = %path.display(), code = e.code(), "{}", e);
                self.failed.push((path, e));
            }
        }
    }

    pub fn total(&self) -> usize {
        self.updated.len() + self.unchanged.len() + self.skipped.len() + self.failed.len()
    }

    /// Fail with `Error::Incomplete` when any path failed
    pub fn check(self) -> Result<Self> {
        if self.failed.is_empty() {
            return Ok(self);
        }

        let details = self
            .failed
            .iter()
            .map(|(path, e)| format!("{}: {}", path.display(), e))
            .collect::<Vec<_>>()
            .join("\n");
        Err(Error::Incomplete {
            op: self.op,
            failed: self.failed.len(),
            total: self.total(),
            details,
        })
    }
}

/// Store / restore / merge / list over every tracked path
pub struct SnapshotManager<D: Replica> {
    registry: Arc<Registry<D>>,
    bridge: Arc<Bridge>,
}

impl<D: Replica> SnapshotManager<D> {
    pub fn new(registry: Arc<Registry<D>>, bridge: Arc<Bridge>) -> Self {
        Self { registry, bridge }
    }

    /// Copy every current chunk log into `snapshot/<name>/`
    ///
    /// The snapshot directory exists afterwards even when nothing is tracked
    /// yet. Reusing a name overwrites that snapshot's logs with the current
    /// ones.
    pub fn store(&self, name: &str) -> Result<SnapshotReport> {
        validate_snapshot_name(name)?;
        let dir = self.registry.store().snapshot_dir(name);
        std::fs::create_dir_all(&dir).map_err(|e| Error::io(&dir, e))?;

        if self.registry.is_empty() {
            debug!(snapshot = %name, "No tracked paths, storing an empty snapshot");
        }

        let mut report = SnapshotReport::new("store", name);
        for path in self.registry.all_paths() {
            let result = self.store_path(name, &path);
            report.record(path, result);
        }

        self.log_report(&report);
        Ok(report)
    }

    fn store_path(&self, name: &str, path: &Path) -> Result<Outcome> {
        let Some(handle) = self.registry.get(path) else {
            return Ok(Outcome::Skipped);
        };
        // Hold the entry so no append lands halfway through the copy
        let _tracked = handle.lock();

        let log = self.registry.current_log(path);
        if !log.exists() {
            return Ok(Outcome::Skipped);
        }
        log.copy_to(&self.registry.store().snapshot_log(name, path))?;
        Ok(Outcome::Updated)
    }

    /// Replace every current log with the snapshot's copy and rewrite the live files
    ///
    /// Local history newer than the snapshot is discarded. Paths the
    /// snapshot does not contain are left as they are.
    pub fn restore(&self, name: &str) -> Result<SnapshotReport> {
        self.require_snapshot(name)?;

        let mut report = SnapshotReport::new("restore", name);
        for path in self.registry.all_paths() {
            let result = self.restore_path(name, &path);
            report.record(path, result);
        }

        self.log_report(&report);
        Ok(report)
    }

    fn restore_path(&self, name: &str, path: &Path) -> Result<Outcome> {
        let source = ChunkLog::at(self.registry.store().snapshot_log(name, path));
        if !source.exists() {
            return Ok(Outcome::Skipped);
        }

        let handle = self.registry.get_or_load(path)?;
        let mut tracked = handle.lock();

        // Replay first so a corrupt snapshot never replaces a good log
        let doc: D = source.replay()?;
        source.copy_to(self.registry.current_log(path).path())?;
        tracked.reset(doc);

        self.bridge.write(path, tracked.doc())?;
        Ok(Outcome::Updated)
    }

    /// Pull the snapshot's history that the live documents have not seen
    ///
    /// Only the delta beyond each document's clock is applied and appended,
    /// so repeating a merge, or merging an unrelated snapshot, never
    /// duplicates operations.
    pub fn merge(&self, name: &str) -> Result<SnapshotReport> {
        self.require_snapshot(name)?;

        let mut report = SnapshotReport::new("merge", name);
        for path in self.registry.all_paths() {
            let result = self.merge_path(name, &path);
            report.record(path, result);
        }

        self.log_report(&report);
        Ok(report)
    }

    fn merge_path(&self, name: &str, path: &Path) -> Result<Outcome> {
        let handle = self.registry.get_or_load(path)?;
        let mut tracked = handle.lock();

        let from = tracked.doc().clock();
        let theirs: D = ChunkLog::at(self.registry.store().snapshot_log(name, path)).replay()?;
        let delta = theirs.delta(&from);
        if delta.is_empty() {
            return Ok(Outcome::Unchanged);
        }

        tracked.doc_mut().apply(&delta);
        let appended = tracked.flush_to(&self.registry.current_log(path))?;
        debug!(path = %path.display(), chunks = appended, "Merged delta");

        self.bridge.write(path, tracked.doc())?;
        Ok(Outcome::Updated)
    }

    /// Snapshot names under the snapshot root, in directory order
    pub fn list(&self) -> Result<Vec<String>> {
        let root = self.registry.store().snapshot_root();
        let entries = match std::fs::read_dir(&root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Error::io(&root, e)),
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| Error::io(&root, e))?;
            let is_dir = entry.file_type().map_err(|e| Error::io(entry.path(), e))?.is_dir();
            if is_dir {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        Ok(names)
    }

    fn require_snapshot(&self, name: &str) -> Result<()> {
        validate_snapshot_name(name)?;
        if !self.registry.store().snapshot_dir(name).is_dir() {
            return Err(Error::SnapshotNotFound(name.to_string()));
        }
        Ok(())
    }

    fn log_report(&self, report: &SnapshotReport) {
        info!(
            op = report.op,
            snapshot = %report.name,
            updated = report.updated.len(),
            unchanged = report.unchanged.len(),
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            "Snapshot operation finished"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::WatchPipeline;
    use bz_core::{Content, Store, TreeDoc};
    use tempfile::TempDir;

    struct Fixture {
        temp_dir: TempDir,
        registry: Arc<Registry<TreeDoc>>,
        pipeline: WatchPipeline<TreeDoc>,
        snapshots: SnapshotManager<TreeDoc>,
    }

    impl Fixture {
        fn new() -> Self {
            let temp_dir = TempDir::new().unwrap();
            let store = Store::new(temp_dir.path());
            let registry = Arc::new(Registry::new(store.clone()));
            let bridge = Arc::new(Bridge::new(store));
            Self {
                pipeline: WatchPipeline::new(Arc::clone(&registry), Arc::clone(&bridge)),
                snapshots: SnapshotManager::new(Arc::clone(&registry), bridge),
                registry,
                temp_dir,
            }
        }

        fn edit(&self, path: &str, text: &str) {
            std::fs::write(self.temp_dir.path().join(path), text).unwrap();
            self.pipeline.on_change(Path::new(path)).unwrap();
        }

        fn read(&self, path: &str) -> String {
            std::fs::read_to_string(self.temp_dir.path().join(path)).unwrap()
        }

        fn records(&self, path: &str) -> usize {
            self.registry.current_log(Path::new(path)).record_count().unwrap()
        }
    }

    #[test]
    fn test_empty_name_is_invalid() {
        let fx = Fixture::new();
        assert!(matches!(fx.snapshots.store(""), Err(Error::InvalidArgument(_))));
        assert!(matches!(fx.snapshots.restore(""), Err(Error::InvalidArgument(_))));
        assert!(matches!(fx.snapshots.merge(""), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_unknown_snapshot_is_not_found() {
        let fx = Fixture::new();
        fx.edit("a.txt", "a");
        assert!(matches!(fx.snapshots.restore("nope"), Err(Error::SnapshotNotFound(_))));
        assert!(matches!(fx.snapshots.merge("nope"), Err(Error::SnapshotNotFound(_))));
    }

    #[test]
    fn test_store_copies_current_logs() {
        let fx = Fixture::new();
        fx.edit("a.txt", "a");
        std::fs::create_dir_all(fx.temp_dir.path().join("sub")).unwrap();
        fx.edit("sub/b.txt", "b");

        let report = fx.snapshots.store("s1").unwrap().check().unwrap();
        assert_eq!(report.updated.len(), 2);

        let snap = fx.temp_dir.path().join(".bz/snapshot/s1");
        assert_eq!(
            std::fs::read(snap.join("sub/b.txt")).unwrap(),
            std::fs::read(fx.temp_dir.path().join(".bz/current/sub/b.txt")).unwrap()
        );
        assert_eq!(fx.snapshots.list().unwrap(), vec!["s1".to_string()]);
    }

    #[test]
    fn test_store_then_restore_is_identity() {
        let fx = Fixture::new();
        fx.edit("notes.txt", "hello");
        let stored_clock = fx.registry.get(Path::new("notes.txt")).unwrap().lock().doc().clock();

        fx.snapshots.store("demo").unwrap();
        fx.edit("notes.txt", "hello world");
        assert_eq!(fx.records("notes.txt"), 2);

        fx.snapshots.restore("demo").unwrap().check().unwrap();

        assert_eq!(fx.read("notes.txt"), "hello");
        assert_eq!(fx.records("notes.txt"), 1);
        let handle = fx.registry.get(Path::new("notes.txt")).unwrap();
        assert_eq!(handle.lock().doc().clock(), stored_clock);
        assert!(handle.lock().pending().is_empty());
    }

    #[test]
    fn test_restore_skips_paths_missing_from_snapshot() {
        let fx = Fixture::new();
        fx.edit("old.txt", "old");
        fx.snapshots.store("early").unwrap();
        fx.edit("new.txt", "new");

        let report = fx.snapshots.restore("early").unwrap();
        assert_eq!(report.updated, vec![PathBuf::from("old.txt")]);
        assert_eq!(report.skipped, vec![PathBuf::from("new.txt")]);
        assert_eq!(fx.read("new.txt"), "new");
    }

    #[test]
    fn test_merge_keeps_newer_local_edit() {
        let fx = Fixture::new();
        fx.edit("notes.txt", "hello");
        fx.snapshots.store("demo").unwrap();
        fx.edit("notes.txt", "hello world");

        let report = fx.snapshots.merge("demo").unwrap().check().unwrap();
        assert_eq!(report.unchanged, vec![PathBuf::from("notes.txt")]);
        assert_eq!(fx.read("notes.txt"), "hello world");
        assert_eq!(fx.records("notes.txt"), 2);
    }

    #[test]
    fn test_merge_brings_back_snapshot_history() {
        let fx = Fixture::new();
        fx.edit("notes.txt", "v1");
        fx.snapshots.store("base").unwrap();
        fx.edit("notes.txt", "v2");
        fx.snapshots.store("later").unwrap();

        fx.snapshots.restore("base").unwrap();
        assert_eq!(fx.read("notes.txt"), "v1");

        fx.snapshots.merge("later").unwrap().check().unwrap();
        assert_eq!(fx.read("notes.txt"), "v2");
        assert_eq!(fx.records("notes.txt"), 2);

        // Second merge: nothing new, log does not grow
        let again = fx.snapshots.merge("later").unwrap();
        assert_eq!(again.unchanged.len(), 1);
        assert_eq!(fx.records("notes.txt"), 2);
    }

    #[test]
    fn test_merge_combines_diverged_histories() {
        let fx = Fixture::new();
        fx.edit("conf.json", r#"{"a": 1, "b": 1}"#);
        fx.snapshots.store("base").unwrap();

        fx.edit("conf.json", r#"{"a": 2, "b": 1}"#);
        fx.snapshots.store("left").unwrap();

        fx.snapshots.restore("base").unwrap();
        fx.edit("conf.json", r#"{"a": 1, "b": 3}"#);

        fx.snapshots.merge("left").unwrap().check().unwrap();
        let merged: serde_json::Value = serde_json::from_str(&fx.read("conf.json")).unwrap();
        assert_eq!(merged, serde_json::json!({"a": 2, "b": 3}));
    }

    #[test]
    fn test_per_path_failure_does_not_abort() {
        let fx = Fixture::new();
        fx.edit("good.txt", "good");
        fx.edit("bad.txt", "bad");
        fx.snapshots.store("s").unwrap();

        // Corrupt one snapshot log
        std::fs::write(fx.temp_dir.path().join(".bz/snapshot/s/bad.txt"), [9, 0, 0, 0]).unwrap();
        fx.edit("good.txt", "changed");

        let report = fx.snapshots.restore("s").unwrap();
        assert_eq!(report.updated, vec![PathBuf::from("good.txt")]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(fx.read("good.txt"), "good");

        let err = report.check().unwrap_err();
        assert!(matches!(err, Error::Incomplete { failed: 1, total: 2, .. }));
    }

    #[test]
    fn test_list_without_snapshots_is_empty() {
        let fx = Fixture::new();
        assert!(fx.snapshots.list().unwrap().is_empty());
    }

    #[test]
    fn test_restored_document_accepts_new_edits() {
        let fx = Fixture::new();
        fx.edit("n.txt", "one");
        fx.snapshots.store("s").unwrap();
        fx.edit("n.txt", "two");
        fx.snapshots.restore("s").unwrap();

        fx.edit("n.txt", "three");
        let replayed: TreeDoc = fx.registry.current_log(Path::new("n.txt")).replay().unwrap();
        assert_eq!(replayed.content(), Some(Content::from("three")));
    }
}
