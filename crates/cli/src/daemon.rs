//! The `bz watch` service
//!
//! One loop owns both event sources: debounced watcher events and stdin
//! lines for the console. Document work runs on the blocking pool, one
//! item at a time, so a console command never interleaves with a pipeline
//! run inside this loop. Per-path locks in the registry order work across
//! threads regardless.
//!
//! Queued watcher events always go before console input, and on shutdown
//! the watcher is flushed and every remaining event is applied before the
//! process exits.

use crate::console::{Console, Dispatcher, Output};
use crate::locks::DaemonLock;
use anyhow::{Context, Result};
use bz_core::{Replica, Store, TreeDoc};
use journal::{Bridge, Registry, SnapshotManager, WatchPipeline};
use std::io::{BufRead, Write};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use watcher::{EventKind, WatchConfig, WatchEvent, Watcher};

/// Registry plus the components sharing it
pub struct Services<D: Replica> {
    pub store: Store,
    pub registry: Arc<Registry<D>>,
    pub pipeline: Arc<WatchPipeline<D>>,
    pub dispatcher: Arc<Dispatcher<D>>,
}

impl<D: Replica> Services<D> {
    pub fn new(store: Store) -> Self {
        let registry = Arc::new(Registry::new(store.clone()));
        let bridge = Arc::new(Bridge::new(store.clone()));
        let pipeline = Arc::new(WatchPipeline::new(Arc::clone(&registry), Arc::clone(&bridge)));
        let snapshots = Arc::new(SnapshotManager::new(Arc::clone(&registry), bridge));

        Self {
            store,
            registry,
            pipeline,
            dispatcher: Arc::new(Dispatcher::new(snapshots)),
        }
    }

    /// Run the pipeline for one watcher event
    pub async fn handle_event(&self, event: WatchEvent) {
        if event.kind == EventKind::Delete {
            // Deletions are not part of the history
            debug!(path = %event.path.display(), "Delete event, document left as is");
            return;
        }

        let pipeline = Arc::clone(&self.pipeline);
        let path = event.path.clone();
        match tokio::task::spawn_blocking(move || pipeline.on_change(&path)).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => warn!(path = %event.path.display(), code = e.code(), "{}", e),
            Err(e) => error!(path = %event.path.display(), "Pipeline task failed: {}", e),
        }
    }

    /// Run one console block
    pub async fn run_block(&self, block: String) -> Result<Output> {
        let dispatcher = Arc::clone(&self.dispatcher);
        tokio::task::spawn_blocking(move || dispatcher.execute(&block))
            .await
            .context("Console task failed")
    }
}

/// Watch `store`'s root and serve the console until stdin closes or Ctrl-C
pub async fn run(store: Store, config: WatchConfig) -> Result<()> {
    let _lock = DaemonLock::acquire(store.bz_dir())?;
    let services: Services<TreeDoc> = Services::new(store);

    let (event_tx, mut events) = mpsc::unbounded_channel();
    let mut watcher = Watcher::new(services.store.root(), config)?;
    // Initial scan events are queued from here on
    watcher.start(event_tx)?;

    let mut lines = spawn_stdin_reader()?;
    let mut console = Console::new();

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    let pending_block = loop {
        tokio::select! {
            biased;

            Some(event) = events.recv() => services.handle_event(event).await,
            _ = &mut shutdown => {
                info!("Interrupted");
                break None;
            }
            line = lines.recv() => match line {
                Some(line) => {
                    if let Some(block) = console.feed(&line) {
                        emit(services.run_block(block).await?)?;
                    }
                }
                None => {
                    info!("Console input closed");
                    break console.finish();
                }
            },
        }
    };

    let flushed = drain_watcher(&services, watcher, events).await?;
    info!(events = flushed, tracked = services.registry.len(), "Watcher shut down");

    if let Some(block) = pending_block {
        emit(services.run_block(block).await?)?;
    }
    Ok(())
}

/// Stop the watcher and apply every event it still delivers
async fn drain_watcher<D: Replica>(
    services: &Services<D>,
    mut watcher: Watcher,
    mut events: mpsc::UnboundedReceiver<WatchEvent>,
) -> Result<usize> {
    tokio::task::spawn_blocking(move || watcher.stop())
        .await
        .context("Watcher stop task failed")??;

    let mut flushed = 0;
    while let Some(event) = events.recv().await {
        services.handle_event(event).await;
        flushed += 1;
    }
    Ok(flushed)
}

/// Forward stdin lines from a detached thread
///
/// Blocking stdin reads cannot be cancelled, so the reader is a plain
/// thread that the runtime never waits on at shutdown.
fn spawn_stdin_reader() -> Result<mpsc::UnboundedReceiver<String>> {
    let (tx, rx) = mpsc::unbounded_channel();

    std::thread::Builder::new()
        .name("bz-stdin".to_string())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                match line {
                    Ok(line) => {
                        if tx.send(line).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!("Failed to read console input: {}", e);
                        break;
                    }
                }
            }
        })
        .context("Failed to spawn console reader")?;

    Ok(rx)
}

fn emit(output: Output) -> Result<()> {
    match output {
        Output::Silent => {}
        Output::Stdout(text) => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(text.as_bytes())?;
            stdout.flush()?;
        }
        Output::Stderr(text) => {
            let mut stderr = std::io::stderr().lock();
            stderr.write_all(text.as_bytes())?;
            stderr.flush()?;
        }
    }
    Ok(())
}
