//! End-to-end runs of the `bz` binary with console input on stdin

use crate::bz;
use anyhow::Result;
use std::path::Path;
use std::time::{Duration, Instant};
use tempfile::TempDir;

#[test]
fn test_init_writes_config() -> Result<()> {
    let dir = TempDir::new()?;

    bz!(dir.path(), "init").run_ok()?;

    let config = dir.path().join(".bz/config.toml");
    assert!(config.is_file());
    assert!(dir.path().join(".bz/current").is_dir());
    assert!(dir.path().join(".bz/snapshot").is_dir());

    let text = std::fs::read_to_string(&config)?;
    assert!(text.contains("debounce_ms"));
    Ok(())
}

#[test]
fn test_eof_ends_the_session() -> Result<()> {
    let dir = TempDir::new()?;

    let session = bz!(dir.path(), "--no-initial-scan")
        .input("list\n\n")
        .run_ok()?;

    assert!(session.stdout.is_empty());
    assert!(session.stderr.is_empty());
    assert!(dir.path().join(".bz/logs/bz.log").is_file());
    Ok(())
}

#[test]
fn test_errors_go_to_stderr() -> Result<()> {
    let dir = TempDir::new()?;

    let session = bz!(dir.path(), "--no-initial-scan")
        .input("store\n\n")
        .input("frob\n\n")
        .run_ok()?;

    assert!(session.stdout.is_empty());
    assert!(session
        .stderr
        .contains("error\n\t\\Undefined snapshot name\n"));
    assert!(session.stderr.contains("\t\\Unsupported command\n"));
    Ok(())
}

#[test]
fn test_partial_block_runs_at_eof() -> Result<()> {
    let dir = TempDir::new()?;

    let session = bz!(dir.path(), "--no-initial-scan")
        .input("store s1\n\nlist\n")
        .run_ok()?;

    assert_eq!(session.listed(), vec!["s1"]);
    assert!(dir.path().join(".bz/snapshot/s1").is_dir());
    Ok(())
}

#[test]
fn test_snapshots_survive_restart() -> Result<()> {
    let dir = TempDir::new()?;

    bz!(dir.path(), "--no-initial-scan")
        .input("store first\n\n")
        .run_ok()?;
    let session = bz!(dir.path(), "--no-initial-scan")
        .input("store second\n\nlist\n\n")
        .run_ok()?;

    assert_eq!(session.listed(), vec!["first", "second"]);
    Ok(())
}

#[test]
fn test_log_to_stderr_keeps_stdout_clean() -> Result<()> {
    let dir = TempDir::new()?;

    let session = bz!(
        dir.path(),
        "--no-initial-scan",
        "--log-stderr",
        "--log-level",
        "debug",
    )
    .input("store demo\n\nlist\n\n")
    .run_ok()?;

    assert_eq!(session.listed(), vec!["demo"]);
    Ok(())
}

#[test]
fn test_existing_files_are_recorded_without_input() -> Result<()> {
    for _ in 0..5 {
        let dir = TempDir::new()?;
        std::fs::write(dir.path().join("a.txt"), "hello")?;

        bz!(dir.path()).run_ok()?;

        assert!(dir.path().join(".bz/current/a.txt").is_file());
    }
    Ok(())
}

#[test]
fn test_store_sees_files_present_at_startup() -> Result<()> {
    for _ in 0..5 {
        let dir = TempDir::new()?;
        std::fs::write(dir.path().join("a.txt"), "hello")?;
        std::fs::create_dir_all(dir.path().join("src"))?;
        std::fs::write(dir.path().join("src/b.txt"), "world")?;

        bz!(dir.path()).input("store s\n\n").run_ok()?;

        assert!(dir.path().join(".bz/snapshot/s/a.txt").is_file());
        assert!(dir.path().join(".bz/snapshot/s/src/b.txt").is_file());
    }
    Ok(())
}

#[test]
fn test_edit_just_before_eof_is_recorded() -> Result<()> {
    let dir = TempDir::new()?;
    let file = dir.path().join("late.txt");

    // A long window: only the shutdown flush can deliver the change
    let log = dir.path().join(".bz/logs/bz.log");
    bz!(dir.path(), "--no-initial-scan", "--debounce-ms", "5000").run_ok_with(|| {
        wait_for_log(&log, "Watching");
        std::fs::write(&file, "late").unwrap();
        std::thread::sleep(Duration::from_millis(20));
    })?;

    assert!(dir.path().join(".bz/current/late.txt").is_file());
    Ok(())
}

fn wait_for_log(log: &Path, needle: &str) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while Instant::now() < deadline {
        if std::fs::read_to_string(log).is_ok_and(|text| text.contains(needle)) {
            return;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
    panic!("'{}' never appeared in {}", needle, log.display());
}
