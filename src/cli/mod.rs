//! CLI layer: argument parsing and command dispatch

pub mod args;
pub mod commands;
pub mod confirm;
pub mod error;
pub mod output;

pub use args::{Cli, Commands};
pub use commands::execute_command;
pub use confirm::TerminalConfirm;
pub use error::{CliError, CliResult};
