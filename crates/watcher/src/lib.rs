//! File system watching for benzen
//!
//! This crate turns raw platform notifications into debounced per-file
//! events:
//! - `notify` recommended watcher, recursive over the root
//! - Raw events cross a crossbeam channel to a dedicated debouncer thread
//! - Per-path quiescence window with kind coalescing
//! - Ignore rules (built-ins, `.bzignore`, config patterns)
//! - Initial scan, and a rescan when the platform reports dropped events
//!
//! Debounced events are delivered on a tokio unbounded channel.

pub mod debounce;
pub mod rules;
pub mod scan;

use anyhow::{bail, Context, Result};
use bz_core::store::normalize_path;
use crossbeam_channel::{Receiver, Sender};
use debounce::Debouncer;
use rules::{IgnoreConfig, IgnoreRules, IGNORE_FILE};
use notify::event::{ModifyKind, RenameMode};
use notify::{RecommendedWatcher, RecursiveMode, Watcher as _};
use std::path::{Path, PathBuf};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, trace, warn};

/// How long the debouncer thread sleeps when nothing is pending
const IDLE_TICK: Duration = Duration::from_secs(1);

/// Upper bound on how long `stop` waits for in-flight raw events
const SETTLE_MAX: Duration = Duration::from_millis(250);

/// File system event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    /// Path that changed, relative to the watched root
    pub path: PathBuf,
    /// Type of change
    pub kind: EventKind,
}

/// Type of file system event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// File created (or renamed into place)
    Create,
    /// File modified
    Modify,
    /// File deleted (or renamed away)
    Delete,
}

/// Watcher settings
#[derive(Debug, Clone)]
pub struct WatchConfig {
    /// Quiescence window per path
    pub debounce: Duration,
    /// Report every existing file as created on start
    pub initial_scan: bool,
    pub ignore: IgnoreConfig,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(100),
            initial_scan: true,
            ignore: IgnoreConfig::default(),
        }
    }
}

/// File system watcher
pub struct Watcher {
    root: PathBuf,
    config: WatchConfig,
    inner: Option<RecommendedWatcher>,
    stop_tx: Option<Sender<()>>,
    worker: Option<JoinHandle<()>>,
}

impl Watcher {
    /// Create a new watcher for the given root
    pub fn new(root: &Path, config: WatchConfig) -> Result<Self> {
        // Platform backends report canonical paths
        let root = root
            .canonicalize()
            .with_context(|| format!("Failed to resolve watch root {}", root.display()))?;

        Ok(Self {
            root,
            config,
            inner: None,
            stop_tx: None,
            worker: None,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Start watching; debounced events are sent to `events`
    ///
    /// With `initial_scan` set, every existing file is reported as a
    /// `Create` before any live event. Those events are already queued on
    /// `events` when this returns.
    pub fn start(&mut self, events: UnboundedSender<WatchEvent>) -> Result<()> {
        if self.inner.is_some() {
            bail!("Watcher already started");
        }

        let rules = IgnoreRules::load(&self.root, self.config.ignore.clone())?;
        debug!(sources = rules.active_sources(), "Loaded ignore rules");

        let (raw_tx, raw_rx) = crossbeam_channel::unbounded::<notify::Result<notify::Event>>();
        let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(1);

        let mut inner = RecommendedWatcher::new(
            move |result| {
                // Receiver gone means we are shutting down
                let _ = raw_tx.send(result);
            },
            notify::Config::default(),
        )
        .context("Failed to create platform watcher")?;
        inner
            .watch(&self.root, RecursiveMode::Recursive)
            .with_context(|| format!("Failed to watch {}", self.root.display()))?;

        let worker = DebounceWorker {
            root: self.root.clone(),
            rules,
            debouncer: Debouncer::new(self.config.debounce),
            events,
        };
        if self.config.initial_scan && !worker.emit_scan(EventKind::Create) {
            bail!("Event receiver closed during initial scan");
        }

        let handle = std::thread::Builder::new()
            .name("bz-debounce".to_string())
            .spawn(move || worker.run(raw_rx, stop_rx))
            .context("Failed to spawn debouncer thread")?;

        info!(
            root = %self.root.display(),
            debounce_ms = self.config.debounce.as_millis() as u64,
            "Watching"
        );

        self.inner = Some(inner);
        self.stop_tx = Some(stop_tx);
        self.worker = Some(handle);
        Ok(())
    }

    /// Stop watching and flush events still held by the debouncer
    ///
    /// Raw events the platform delivers within the settle window are
    /// still debounced and sent. When this returns the worker has dropped
    /// its sender, so the receiver ends once it is drained.
    pub fn stop(&mut self) -> Result<()> {
        self.stop_tx = None;
        let Some(handle) = self.worker.take() else {
            self.inner = None;
            return Ok(());
        };

        let joined = handle.join();
        // Platform watcher stays alive until the worker has settled
        self.inner = None;

        if joined.is_err() {
            bail!("Debouncer thread panicked");
        }
        debug!(root = %self.root.display(), "Watcher stopped");
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }
}

impl Drop for Watcher {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            warn!("Failed to stop watcher: {}", e);
        }
    }
}

/// State owned by the debouncer thread
struct DebounceWorker {
    root: PathBuf,
    rules: IgnoreRules,
    debouncer: Debouncer,
    events: UnboundedSender<WatchEvent>,
}

impl DebounceWorker {
    fn run(mut self, raw_rx: Receiver<notify::Result<notify::Event>>, stop_rx: Receiver<()>) {
        loop {
            let timeout = self
                .debouncer
                .next_deadline()
                .map(|deadline| deadline.saturating_duration_since(Instant::now()))
                .unwrap_or(IDLE_TICK);

            crossbeam_channel::select! {
                recv(raw_rx) -> msg => match msg {
                    Ok(raw) => self.on_raw(raw),
                    Err(_) => break,
                },
                recv(stop_rx) -> _ => {
                    self.settle(&raw_rx);
                    break;
                }
                default(timeout) => {}
            }

            for event in self.debouncer.drain_ready(Instant::now()) {
                if !self.emit(event) {
                    return;
                }
            }
        }

        for event in self.debouncer.drain_all() {
            if !self.emit(event) {
                return;
            }
        }
    }

    fn on_raw(&mut self, raw: notify::Result<notify::Event>) {
        match raw {
            Ok(event) => self.handle(event),
            Err(e) => warn!("Watch error: {}", e),
        }
    }

    /// Take in raw events still arriving after a stop request
    fn settle(&mut self, raw_rx: &Receiver<notify::Result<notify::Event>>) {
        let deadline = Instant::now() + self.debouncer.window().min(SETTLE_MAX);
        while let Ok(raw) = raw_rx.recv_deadline(deadline) {
            self.on_raw(raw);
        }
        trace!(pending = self.debouncer.len(), "Settled before stop");
    }

    fn handle(&mut self, event: notify::Event) {
        if event.need_rescan() {
            warn!("Platform watcher dropped events, rescanning");
            self.rescan();
            return;
        }

        let now = Instant::now();
        for (path, kind) in translate(&event) {
            let Ok(relative) = normalize_path(&self.root, &path) else {
                continue;
            };

            if relative == Path::new(IGNORE_FILE) {
                match self.rules.reload() {
                    Ok(()) => info!("Reloaded {}", IGNORE_FILE),
                    Err(e) => warn!("Failed to reload {}: {:#}", IGNORE_FILE, e),
                }
                continue;
            }

            // Directory events carry no content
            let is_dir = kind != EventKind::Delete && self.root.join(&relative).is_dir();
            if is_dir || self.rules.should_ignore(&relative, false) {
                trace!(path = %relative.display(), ?kind, "Ignored event");
                continue;
            }

            self.debouncer.push(relative, kind, now);
        }
    }

    fn rescan(&mut self) {
        match scan::scan_files(&self.root, &self.rules) {
            Ok(files) => {
                let now = Instant::now();
                for path in files {
                    self.debouncer.push(path, EventKind::Modify, now);
                }
            }
            Err(e) => warn!("Rescan failed: {:#}", e),
        }
    }

    /// Send every scanned file straight through; false once the receiver is gone
    fn emit_scan(&self, kind: EventKind) -> bool {
        let files = match scan::scan_files(&self.root, &self.rules) {
            Ok(files) => files,
            Err(e) => {
                warn!("Initial scan failed: {:#}", e);
                return true;
            }
        };

        info!(files = files.len(), "Initial scan");
        files
            .into_iter()
            .all(|path| self.emit(WatchEvent { path, kind }))
    }

    fn emit(&self, event: WatchEvent) -> bool {
        debug!(path = %event.path.display(), kind = ?event.kind, "Event");
        self.events.send(event).is_ok()
    }
}

/// Map a raw notification to per-path event kinds
fn translate(event: &notify::Event) -> Vec<(PathBuf, EventKind)> {
    use notify::EventKind as Raw;

    let all = |kind: EventKind| -> Vec<(PathBuf, EventKind)> {
        event.paths.iter().map(|p| (p.clone(), kind)).collect()
    };

    match event.kind {
        Raw::Create(_) => all(EventKind::Create),
        Raw::Remove(_) => all(EventKind::Delete),
        Raw::Modify(ModifyKind::Name(RenameMode::From)) => all(EventKind::Delete),
        Raw::Modify(ModifyKind::Name(RenameMode::To)) => all(EventKind::Create),
        Raw::Modify(ModifyKind::Name(RenameMode::Both)) => match event.paths.as_slice() {
            [from, to] => vec![
                (from.clone(), EventKind::Delete),
                (to.clone(), EventKind::Create),
            ],
            _ => all(EventKind::Modify),
        },
        Raw::Modify(_) | Raw::Any => all(EventKind::Modify),
        Raw::Access(_) | Raw::Other => Vec::new(),
    }
}
