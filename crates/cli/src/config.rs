//! `.bz/config.toml`
//!
//! Every field is optional; a missing file is the default configuration.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use watcher::rules::IgnoreConfig;
use watcher::WatchConfig;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub watch: WatchSection,
    pub log: LogSection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchSection {
    /// Quiescence window before a changed file is read
    pub debounce_ms: u64,
    /// Track files that already exist when the watcher starts
    pub initial_scan: bool,
    pub use_bzignore: bool,
    /// Extra gitignore-syntax patterns
    pub ignore: Vec<String>,
}

impl Default for WatchSection {
    fn default() -> Self {
        Self {
            debounce_ms: 100,
            initial_scan: true,
            use_bzignore: true,
            ignore: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSection {
    /// `tracing` filter directive, overridden by `RUST_LOG`
    pub level: String,
}

impl Default for LogSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Values given on the command line
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub debounce_ms: Option<u64>,
    pub no_initial_scan: bool,
    pub log_level: Option<String>,
}

impl Config {
    /// Load from `path`, falling back to defaults when the file is absent
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("Invalid config {}", path.display()))
    }

    /// Write this configuration to `path`
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))
    }

    /// Apply command-line overrides on top of the file
    pub fn apply(&mut self, overrides: &Overrides) {
        if let Some(ms) = overrides.debounce_ms {
            self.watch.debounce_ms = ms;
        }
        if overrides.no_initial_scan {
            self.watch.initial_scan = false;
        }
        if let Some(level) = &overrides.log_level {
            self.log.level = level.clone();
        }
    }

    pub fn watch_config(&self) -> WatchConfig {
        WatchConfig {
            debounce: Duration::from_millis(self.watch.debounce_ms),
            initial_scan: self.watch.initial_scan,
            ignore: IgnoreConfig {
                use_bzignore: self.watch.use_bzignore,
                patterns: self.watch.ignore.clone(),
            },
        }
    }
}
