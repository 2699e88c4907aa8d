//! Per-path debouncing logic
//!
//! Editors write a file in bursts (truncate, write, chmod, rename). Events
//! for one path are held until the path has been quiet for the whole
//! window, then released as a single event whose kind summarizes the burst.

use crate::{EventKind, WatchEvent};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy)]
struct Pending {
    kind: EventKind,
    last_seen: Instant,
}

/// Quiescence-window debouncer, driven by explicit timestamps
#[derive(Debug)]
pub struct Debouncer {
    window: Duration,
    pending: HashMap<PathBuf, Pending>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: HashMap::new(),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Record an event; restarts the path's quiet period
    pub fn push(&mut self, path: PathBuf, kind: EventKind, now: Instant) {
        self.pending
            .entry(path)
            .and_modify(|pending| {
                pending.kind = coalesce(pending.kind, kind);
                pending.last_seen = now;
            })
            .or_insert(Pending {
                kind,
                last_seen: now,
            });
    }

    /// Remove and return every path that has been quiet for the full window
    ///
    /// Output is sorted by path.
    pub fn drain_ready(&mut self, now: Instant) -> Vec<WatchEvent> {
        let window = self.window;
        let mut ready: Vec<PathBuf> = self
            .pending
            .iter()
            .filter(|(_, pending)| now.saturating_duration_since(pending.last_seen) >= window)
            .map(|(path, _)| path.clone())
            .collect();
        ready.sort();

        ready
            .into_iter()
            .filter_map(|path| {
                let pending = self.pending.remove(&path)?;
                Some(WatchEvent {
                    path,
                    kind: pending.kind,
                })
            })
            .collect()
    }

    /// Release everything regardless of the window (shutdown)
    pub fn drain_all(&mut self) -> Vec<WatchEvent> {
        let mut events: Vec<WatchEvent> = self
            .pending
            .drain()
            .map(|(path, pending)| WatchEvent {
                path,
                kind: pending.kind,
            })
            .collect();
        events.sort_by(|a, b| a.path.cmp(&b.path));
        events
    }

    /// Earliest instant at which some pending path becomes ready
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending
            .values()
            .map(|pending| pending.last_seen + self.window)
            .min()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

/// Combine a held event kind with a newer one for the same path
pub fn coalesce(held: EventKind, next: EventKind) -> EventKind {
    use EventKind::*;

    match (held, next) {
        (_, Delete) => Delete,
        (Create, Create | Modify) => Create,
        // Deleted then written again: atomic save
        (Delete, Create | Modify) => Modify,
        (Modify, Create | Modify) => Modify,
    }
}
