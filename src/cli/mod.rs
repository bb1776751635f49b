//! cli
//!
//! Command-line interface layer for lnsync.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and global flags
//! - Install logging
//! - Delegate to command handlers
//!
//! # Architecture
//!
//! The CLI layer is thin. It parses arguments via clap and dispatches to
//! handlers that call into [`crate::core`] and [`crate::engine`]. Errors
//! are `anyhow` from here up.

pub mod args;
pub mod commands;

pub use args::{Cli, Shell};

use crate::logging::{self, LogFormat};
use crate::ui::output::Verbosity;
use anyhow::Result;

/// Run the CLI application.
///
/// This is the main entry point called from `main.rs`.
pub fn run() -> Result<()> {
    let cli = Cli::parse_args();

    let verbosity = Verbosity::from_flags(cli.quiet, cli.debug);
    let format = cli.log_format.unwrap_or_else(LogFormat::from_env);
    logging::init(format, verbosity.level())?;

    commands::dispatch(cli.command, verbosity)
}
