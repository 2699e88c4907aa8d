//! Command console
//!
//! Lines are buffered until a blank line, then the block is parsed as tree
//! notation and its first top-level node runs as a command:
//!
//! ```text
//! store <name>
//! restore <name>
//! merge <name>
//! list
//! ```
//!
//! Failures never stop the console. They are rendered as an `error` node
//! for stderr and the console waits for the next block.

use crate::notation::{self, Node, Span};
use bz_core::Replica;
use journal::SnapshotManager;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Source name reported in parse locations
pub const INPUT_URI: &str = "input";

#[derive(Debug, Error)]
pub enum ConsoleError {
    #[error("{message}\n{span}")]
    Parse { message: String, span: Span },

    #[error(transparent)]
    Core(#[from] bz_core::Error),
}

impl ConsoleError {
    fn parse(message: &str, span: &Span) -> Self {
        ConsoleError::Parse {
            message: message.to_string(),
            span: span.clone(),
        }
    }

    /// The `error` notation written to stderr
    pub fn render(&self) -> String {
        Node::structure("error", vec![Node::data(&self.to_string())]).to_string()
    }
}

impl From<notation::SyntaxError> for ConsoleError {
    fn from(e: notation::SyntaxError) -> Self {
        ConsoleError::Parse {
            message: e.message,
            span: e.span,
        }
    }
}

/// One parsed console command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Store(String),
    Restore(String),
    Merge(String),
    List,
}

impl Command {
    /// Interpret the first top-level node of a parsed block
    pub fn from_tree(tree: &Node) -> Result<Self, ConsoleError> {
        let Some(node) = tree.kids.first() else {
            return Err(ConsoleError::parse("Empty command", &tree.span));
        };
        if tree.kids.len() > 1 {
            debug!("Ignoring {} trailing top-level nodes", tree.kids.len() - 1);
        }

        match node.name() {
            Some("store") => Ok(Command::Store(snapshot_name(node)?)),
            Some("restore") => Ok(Command::Restore(snapshot_name(node)?)),
            Some("merge") => Ok(Command::Merge(snapshot_name(node)?)),
            Some("list") => match node.kids.first() {
                Some(extra) => Err(ConsoleError::parse("Unexpected argument", &extra.span)),
                None => Ok(Command::List),
            },
            _ => Err(ConsoleError::parse("Unsupported command", &node.span)),
        }
    }
}

/// The single bare-token child naming a snapshot
fn snapshot_name(node: &Node) -> Result<String, ConsoleError> {
    let Some(arg) = node.kids.first() else {
        return Err(bz_core::Error::InvalidArgument("Undefined snapshot name".to_string()).into());
    };
    if let Some(extra) = node.kids.get(1).or_else(|| arg.kids.first()) {
        return Err(ConsoleError::parse("Unexpected argument", &extra.span));
    }
    match arg.name() {
        Some(name) => Ok(name.to_string()),
        None => Err(ConsoleError::parse("Snapshot name must be a bare token", &arg.span)),
    }
}

/// Console reader state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleState {
    AwaitingFirstLine,
    Accumulating,
}

/// Line-buffering state machine; yields complete blocks
#[derive(Debug)]
pub struct Console {
    state: ConsoleState,
    buffer: String,
}

impl Default for Console {
    fn default() -> Self {
        Self::new()
    }
}

impl Console {
    pub fn new() -> Self {
        Self {
            state: ConsoleState::AwaitingFirstLine,
            buffer: String::new(),
        }
    }

    pub fn state(&self) -> ConsoleState {
        self.state
    }

    /// Feed one input line (without its newline)
    ///
    /// Returns the finished block when `line` is the blank terminator.
    pub fn feed(&mut self, line: &str) -> Option<String> {
        let line = line.strip_suffix('\r').unwrap_or(line);

        if !line.is_empty() {
            self.buffer.push_str(line);
            self.buffer.push('\n');
            self.state = ConsoleState::Accumulating;
            return None;
        }

        match self.state {
            ConsoleState::AwaitingFirstLine => None,
            ConsoleState::Accumulating => self.take(),
        }
    }

    /// End of input: a partially filled block still runs
    pub fn finish(&mut self) -> Option<String> {
        self.take()
    }

    fn take(&mut self) -> Option<String> {
        self.state = ConsoleState::AwaitingFirstLine;
        if self.buffer.is_empty() {
            return None;
        }
        Some(std::mem::take(&mut self.buffer))
    }
}

/// What a block produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Output {
    /// Nothing to print
    Silent,
    Stdout(String),
    Stderr(String),
}

/// Runs parsed blocks against the snapshot manager
pub struct Dispatcher<D: Replica> {
    snapshots: Arc<SnapshotManager<D>>,
}

impl<D: Replica> Dispatcher<D> {
    pub fn new(snapshots: Arc<SnapshotManager<D>>) -> Self {
        Self { snapshots }
    }

    /// Parse and run one block; errors become `error` notation
    pub fn execute(&self, block: &str) -> Output {
        match self.run(block) {
            Ok(Some(text)) if !text.is_empty() => Output::Stdout(text),
            Ok(_) => Output::Silent,
            Err(e) => {
                debug!("Command failed: {}", e);
                Output::Stderr(e.render())
            }
        }
    }

    pub fn run(&self, block: &str) -> Result<Option<String>, ConsoleError> {
        let tree = notation::parse(block, INPUT_URI)?;
        let command = Command::from_tree(&tree)?;
        debug!(?command, "Dispatching");

        match command {
            Command::Store(name) => {
                self.snapshots.store(&name)?.check()?;
                Ok(None)
            }
            Command::Restore(name) => {
                self.snapshots.restore(&name)?.check()?;
                Ok(None)
            }
            Command::Merge(name) => {
                self.snapshots.merge(&name)?.check()?;
                Ok(None)
            }
            Command::List => {
                let names = self.snapshots.list()?;
                let list = Node::list(names.iter().map(|name| Node::data(name)).collect());
                Ok(Some(list.to_string()))
            }
        }
    }
}
