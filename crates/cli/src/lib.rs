//! Library side of the `bz` binary: console, service loop and config

pub mod config;
pub mod console;
pub mod daemon;
pub mod locks;
pub mod logging;
pub mod notation;
pub mod util;

pub use config::{Config, Overrides};
pub use console::{Command, Console, ConsoleError, ConsoleState, Dispatcher, Output};
pub use daemon::Services;
