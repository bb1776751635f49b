//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Architecture
//!
//! Each command handler:
//! 1. Validates command-specific arguments
//! 2. Calls into [`crate::core`] and [`crate::engine`]
//! 3. Formats and displays output
//!
//! # Async Commands
//!
//! `sync` talks to the GitHub API and is async. Its handler builds a tokio
//! runtime and blocks on the async implementation.

mod check;
mod completion;
mod sync;

pub use check::check;
pub use completion::completion;
pub use sync::sync;

use crate::cli::args::Command;
use crate::ui::output::Verbosity;
use anyhow::Result;

/// Dispatch a command to its handler.
pub fn dispatch(command: Command, verbosity: Verbosity) -> Result<()> {
    match command {
        Command::Sync(args) => sync::sync(args, verbosity),
        Command::Check { path, repo, json } => check::check(&path, repo, json, verbosity),
        Command::Completion { shell } => completion::completion(shell),
    }
}
