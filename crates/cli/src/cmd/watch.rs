//! Run the watcher and console

use anyhow::{Context, Result};
use bz_core::Store;
use cli_lib::{daemon, logging, Config, Overrides};
use std::path::Path;

pub async fn run(root: &Path, overrides: &Overrides, log_stderr: bool) -> Result<()> {
    let store = Store::init(root).context("Failed to create control directory")?;

    let mut config = Config::load(&store.config_path())?;
    config.apply(overrides);

    let _guard = logging::init(&store.logs_dir(), &config.log.level, log_stderr)?;
    tracing::info!(root = %root.display(), "Starting bz {}", env!("CARGO_PKG_VERSION"));

    daemon::run(store, config.watch_config()).await
}
