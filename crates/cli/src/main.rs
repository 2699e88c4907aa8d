//! benzen CLI - bz command

use anyhow::Result;
use clap::{Parser, Subcommand};
use cli_lib::{util, Overrides};
use std::path::PathBuf;

mod cmd;

/// benzen - mirror a directory tree into replicated documents with named snapshots
#[derive(Parser)]
#[command(name = "bz")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Tree to mirror (default: nearest ancestor with .bz/, else the current directory)
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Quiescence window in milliseconds before a changed file is read
    #[arg(long, global = true)]
    debounce_ms: Option<u64>,

    /// Do not report files that already exist at startup
    #[arg(long, global = true)]
    no_initial_scan: bool,

    /// Log filter, e.g. "debug" or "journal=trace"
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Log to stderr instead of .bz/logs/bz.log
    #[arg(long, global = true)]
    log_stderr: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch the tree and read console commands from stdin (default)
    Watch,
    /// Create .bz/ with a default config
    Init {
        /// Rewrite the config even if one exists
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let root = util::resolve_root(cli.root.as_deref())?;

    let overrides = Overrides {
        debounce_ms: cli.debounce_ms,
        no_initial_scan: cli.no_initial_scan,
        log_level: cli.log_level,
    };

    match cli.command.unwrap_or(Commands::Watch) {
        Commands::Watch => cmd::watch::run(&root, &overrides, cli.log_stderr).await,
        Commands::Init { force } => cmd::init::run(&root, force),
    }
}
