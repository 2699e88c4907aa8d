//! Initialize benzen in a tree

use anyhow::{Context, Result};
use bz_core::Store;
use cli_lib::Config;
use owo_colors::OwoColorize;
use std::path::Path;

pub fn run(root: &Path, force: bool) -> Result<()> {
    let store = Store::init(root).context("Failed to create control directory")?;
    let config_path = store.config_path();

    if config_path.exists() && !force {
        println!(
            "{} benzen already initialized at {}",
            "Note:".yellow(),
            store.bz_dir().display()
        );
        println!("  Use {} to rewrite the default config", "--force".cyan());
        return Ok(());
    }

    Config::default().save(&config_path)?;

    println!(
        "{} {}",
        "Initialized benzen in".green(),
        root.display().bold()
    );
    println!();
    println!("Created {}/ directory structure:", store.bz_dir().display());
    println!("  - .bz/current/     (chunk logs of live files)");
    println!("  - .bz/snapshot/    (named snapshots)");
    println!("  - .bz/logs/        (watcher log)");
    println!("  - .bz/config.toml  (configuration)");
    println!();
    println!("Next steps:");
    println!("  - Run '{}' to start mirroring", "bz watch".cyan());
    println!("  - Type '{}' then a blank line to take a snapshot", "store <name>".cyan());
    Ok(())
}
