//! Running the `bz` binary against a temporary tree
//!
//! Every run is pinned to its tree with `--root`; console input is written
//! to stdin and stdin is closed, which ends the session.

use anyhow::{ensure, Context, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// One invocation of `bz`
pub struct BzRun {
    root: PathBuf,
    args: Vec<String>,
    console: String,
}

impl BzRun {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            args: Vec::new(),
            console: String::new(),
        }
    }

    pub fn args(&mut self, args: &[&str]) -> &mut Self {
        self.args.extend(args.iter().map(|arg| arg.to_string()));
        self
    }

    /// Text typed into the console
    pub fn input(&mut self, text: &str) -> &mut Self {
        self.console.push_str(text);
        self
    }

    pub fn run(&self) -> Result<Session> {
        self.run_with(|| {})
    }

    /// Run, calling `during` after the console input is written and before
    /// stdin is closed
    pub fn run_with(&self, during: impl FnOnce()) -> Result<Session> {
        let mut child = Command::new(env!("CARGO_BIN_EXE_bz"))
            .arg("--root")
            .arg(&self.root)
            .args(&self.args)
            .current_dir(&self.root)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .context("Failed to spawn bz")?;

        let mut stdin = child.stdin.take().context("stdin not piped")?;
        stdin.write_all(self.console.as_bytes())?;
        stdin.flush()?;
        during();
        drop(stdin);

        let output = child.wait_with_output().context("Failed to wait for bz")?;
        Ok(Session {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            status: output.status.code(),
        })
    }

    /// Run and require a zero exit status
    pub fn run_ok(&self) -> Result<Session> {
        self.run_ok_with(|| {})
    }

    pub fn run_ok_with(&self, during: impl FnOnce()) -> Result<Session> {
        let session = self.run_with(during)?;
        ensure!(
            session.status == Some(0),
            "bz {:?} exited with {:?}\nstdout:\n{}\nstderr:\n{}",
            self.args,
            session.status,
            session.stdout,
            session.stderr
        );
        Ok(session)
    }
}

/// What a finished run printed
#[derive(Debug, Clone)]
pub struct Session {
    pub stdout: String,
    pub stderr: String,
    pub status: Option<i32>,
}

impl Session {
    /// Values of the data nodes printed on stdout, e.g. by `list`
    pub fn listed(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .stdout
            .lines()
            .filter_map(|line| line.strip_prefix('\\'))
            .map(str::to_string)
            .collect();
        names.sort();
        names
    }
}

/// `bz!(root, "--no-initial-scan")` builds a run pinned to `root`
#[macro_export]
macro_rules! bz {
    ($root:expr $(, $arg:expr)* $(,)?) => {{
        let mut run = $crate::common::cli::BzRun::new($root);
        run.args(&[$($arg),*]);
        run
    }};
}
