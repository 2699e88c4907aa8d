//! Ignore pattern management
//!
//! Supports multiple sources of ignore patterns:
//! 1. Built-in patterns (control dir, `.git`, hidden components, `___` temp names)
//! 2. `.bzignore` at the watched root (optional, enabled by default)
//! 3. Config-based patterns (gitignore syntax)

use anyhow::{Context, Result};
use bz_core::store::CONTROL_DIR;
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};

/// Name of the per-root ignore file
pub const IGNORE_FILE: &str = ".bzignore";

/// Ignore rule manager
///
/// Built-in patterns are always enforced; `.bzignore` and config patterns
/// can only add to them.
pub struct IgnoreRules {
    /// Watched root directory
    root: PathBuf,

    /// `.bzignore` patterns (optional)
    bzignore: Option<Gitignore>,

    /// Patterns from configuration
    extra: Option<Gitignore>,

    config: IgnoreConfig,
}

impl IgnoreRules {
    /// Load ignore rules for the watched root
    pub fn load(root: &Path, config: IgnoreConfig) -> Result<Self> {
        let mut rules = Self {
            root: root.to_path_buf(),
            bzignore: None,
            extra: None,
            config,
        };

        rules.reload()?;
        Ok(rules)
    }

    /// Rebuild matchers from `.bzignore` and the config patterns
    pub fn reload(&mut self) -> Result<()> {
        self.bzignore = None;
        if self.config.use_bzignore {
            let path = self.root.join(IGNORE_FILE);
            if path.is_file() {
                let mut builder = GitignoreBuilder::new(&self.root);
                if let Some(e) = builder.add(&path) {
                    return Err(e).with_context(|| format!("Failed to parse {}", path.display()));
                }
                self.bzignore = Some(builder.build()?);
            }
        }

        self.extra = None;
        if !self.config.patterns.is_empty() {
            let mut builder = GitignoreBuilder::new(&self.root);
            for pattern in &self.config.patterns {
                builder
                    .add_line(None, pattern)
                    .with_context(|| format!("Invalid ignore pattern: {}", pattern))?;
            }
            self.extra = Some(builder.build()?);
        }

        Ok(())
    }

    /// Check if a path relative to the root should be ignored
    pub fn should_ignore(&self, path: &Path, is_dir: bool) -> bool {
        if is_builtin_ignored(path) {
            return true;
        }

        [&self.bzignore, &self.extra]
            .into_iter()
            .flatten()
            .any(|matcher| matcher.matched_path_or_any_parents(path, is_dir).is_ignore())
    }

    /// Get number of active ignore sources
    pub fn active_sources(&self) -> usize {
        1 + usize::from(self.bzignore.is_some()) + usize::from(self.extra.is_some())
    }
}

/// Check if a relative path matches the built-in patterns
///
/// Any hidden component (`.bz`, `.git`, editor dot files) and any name
/// ending in `___` (editor temp writes) is ignored.
pub fn is_builtin_ignored(path: &Path) -> bool {
    path.components().any(|component| match component {
        Component::Normal(part) => {
            let part = part.to_string_lossy();
            part == CONTROL_DIR || part.starts_with('.') || part.ends_with("___")
        }
        _ => false,
    })
}

/// Ignore configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IgnoreConfig {
    /// Use `.bzignore` patterns (default: true)
    #[serde(default = "default_true")]
    pub use_bzignore: bool,

    /// Additional gitignore-syntax patterns
    #[serde(default)]
    pub patterns: Vec<String>,
}

impl Default for IgnoreConfig {
    fn default() -> Self {
        Self {
            use_bzignore: true,
            patterns: vec![],
        }
    }
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_builtin_patterns_always_enforced() {
        let temp_dir = TempDir::new().unwrap();
        let rules = IgnoreRules::load(temp_dir.path(), IgnoreConfig::default()).unwrap();

        assert!(rules.should_ignore(Path::new(".bz/current/a.txt"), false));
        assert!(rules.should_ignore(Path::new(".git/objects/ab/cd"), false));
        assert!(rules.should_ignore(Path::new("src/.hidden/file"), false));
        assert!(rules.should_ignore(Path::new("notes.txt___"), false));
        assert!(rules.should_ignore(Path::new(".#notes.txt"), false));

        assert!(!rules.should_ignore(Path::new("src/main.rs"), false));
        assert!(!rules.should_ignore(Path::new("README.md"), false));
        assert!(!rules.should_ignore(Path::new("a___b.txt"), false));
    }

    #[test]
    fn test_bzignore_parsing() -> Result<()> {
        let temp_dir = TempDir::new()?;
        fs::write(temp_dir.path().join(IGNORE_FILE), "*.log\ntarget/\n")?;

        let rules = IgnoreRules::load(temp_dir.path(), IgnoreConfig::default())?;

        assert!(rules.should_ignore(Path::new("debug.log"), false));
        assert!(rules.should_ignore(Path::new("nested/debug.log"), false));
        assert!(rules.should_ignore(Path::new("target"), true));
        assert!(rules.should_ignore(Path::new("target/debug/app"), false));
        assert!(!rules.should_ignore(Path::new("src/main.rs"), false));
        assert_eq!(rules.active_sources(), 2);

        Ok(())
    }

    #[test]
    fn test_bzignore_disabled() -> Result<()> {
        let temp_dir = TempDir::new()?;
        fs::write(temp_dir.path().join(IGNORE_FILE), "*.log\n")?;

        let config = IgnoreConfig {
            use_bzignore: false,
            patterns: vec![],
        };
        let rules = IgnoreRules::load(temp_dir.path(), config)?;

        assert!(!rules.should_ignore(Path::new("test.log"), false));
        assert!(rules.should_ignore(Path::new(".bz/config.toml"), false));
        assert_eq!(rules.active_sources(), 1);

        Ok(())
    }

    #[test]
    fn test_config_patterns() {
        let temp_dir = TempDir::new().unwrap();
        let config = IgnoreConfig {
            use_bzignore: false,
            patterns: vec!["*.swp".to_string(), "build/".to_string()],
        };
        let rules = IgnoreRules::load(temp_dir.path(), config).unwrap();

        assert!(rules.should_ignore(Path::new("file.swp"), false));
        assert!(rules.should_ignore(Path::new("build"), true));
        assert!(rules.should_ignore(Path::new("build/output.txt"), false));
        assert!(!rules.should_ignore(Path::new("src/build.rs"), false));
    }

    #[test]
    fn test_reload_picks_up_new_file() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let mut rules = IgnoreRules::load(temp_dir.path(), IgnoreConfig::default())?;
        assert!(!rules.should_ignore(Path::new("test.log"), false));

        fs::write(temp_dir.path().join(IGNORE_FILE), "*.log\n")?;
        rules.reload()?;

        assert!(rules.should_ignore(Path::new("test.log"), false));
        Ok(())
    }
}
