//! In-process fixture: a temporary tree with the full service stack

use bz_core::{Replica, Store, TreeDoc};
use cli_lib::{Output, Services};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use watcher::{EventKind, WatchEvent};

pub struct TestTree {
    pub dir: TempDir,
    pub services: Services<TreeDoc>,
}

impl TestTree {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let store = Store::init(dir.path()).expect("Failed to init store");
        Self {
            services: Services::new(store),
            dir,
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Write a file and deliver the event the watcher would produce
    pub async fn edit(&self, path: &str, content: &str) {
        let full = self.root().join(path);
        if let Some(parent) = full.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent");
        }
        std::fs::write(&full, content).expect("Failed to write file");

        self.services
            .handle_event(WatchEvent {
                path: PathBuf::from(path),
                kind: EventKind::Modify,
            })
            .await;
    }

    pub fn read(&self, path: &str) -> String {
        std::fs::read_to_string(self.root().join(path)).expect("Failed to read file")
    }

    /// Run one console block (a trailing blank line is implied)
    pub async fn console(&self, block: &str) -> Output {
        self.services
            .run_block(block.to_string())
            .await
            .expect("Console task failed")
    }

    pub fn records(&self, path: &str) -> usize {
        self.services
            .registry
            .current_log(Path::new(path))
            .record_count()
            .expect("Failed to read log")
    }

    pub fn clock(&self, path: &str) -> <TreeDoc as Replica>::Clock {
        self.services
            .registry
            .get(Path::new(path))
            .expect("Path not tracked")
            .lock()
            .doc()
            .clock()
    }
}
