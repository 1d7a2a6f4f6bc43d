//! Festa CLI library.
//!
//! This library provides the core functionality for the `festa` command-line
//! interface: configuration, the per-invocation session, terminal prompts,
//! command execution and output formatting.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod output;
pub mod prompt;
pub mod session;

pub use cli::{Cli, Command};
pub use config::Config;
pub use error::{CliError, Result};
pub use output::Formatter;
pub use prompt::TerminalInteraction;
pub use session::Session;
