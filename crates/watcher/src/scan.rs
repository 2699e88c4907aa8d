//! Full-tree scan
//!
//! Reports every existing, non-ignored file under the root. Used once at
//! startup so files written while nothing was watching become tracked, and
//! again when the platform watcher signals it dropped events.

use crate::rules::IgnoreRules;
use anyhow::Result;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Collect relative paths of all files under `root`, sorted
pub fn scan_files(root: &Path, rules: &IgnoreRules) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    let walker = WalkDir::new(root)
        .follow_links(false)
        .min_depth(1)
        .into_iter()
        .filter_entry(|entry| {
            if entry.depth() == 0 {
                return true;
            }
            let Ok(relative) = entry.path().strip_prefix(root) else {
                return false;
            };
            !rules.should_ignore(relative, entry.file_type().is_dir())
        });

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                // Unreadable subtree, keep scanning the rest
                warn!("Scan skipped entry: {}", e);
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        let relative = entry.path().strip_prefix(root)?;
        files.push(relative.to_path_buf());
    }

    files.sort();
    debug!(root = %root.display(), files = files.len(), "Scan complete");
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::IgnoreConfig;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_scan_finds_visible_files() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        fs::create_dir_all(root.join("src/deep")).unwrap();
        fs::create_dir_all(root.join(".bz/current")).unwrap();
        fs::create_dir_all(root.join(".git")).unwrap();
        fs::write(root.join("a.txt"), "a").unwrap();
        fs::write(root.join("src/deep/b.json"), "{}").unwrap();
        fs::write(root.join(".bz/current/a.txt"), "log").unwrap();
        fs::write(root.join(".git/HEAD"), "ref").unwrap();
        fs::write(root.join("tmp.txt___"), "partial").unwrap();

        let rules = IgnoreRules::load(root, IgnoreConfig::default()).unwrap();
        let files = scan_files(root, &rules).unwrap();

        assert_eq!(
            files,
            vec![PathBuf::from("a.txt"), PathBuf::from("src/deep/b.json")]
        );
    }

    #[test]
    fn test_scan_honors_bzignore() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        fs::create_dir_all(root.join("build")).unwrap();
        fs::write(root.join(".bzignore"), "build/\n*.log\n").unwrap();
        fs::write(root.join("build/out.txt"), "x").unwrap();
        fs::write(root.join("run.log"), "x").unwrap();
        fs::write(root.join("keep.txt"), "x").unwrap();

        let rules = IgnoreRules::load(root, IgnoreConfig::default()).unwrap();
        assert_eq!(scan_files(root, &rules).unwrap(), vec![PathBuf::from("keep.txt")]);
    }
}
