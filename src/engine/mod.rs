//! engine
//!
//! Reconciles resolved links against remote state.
//!
//! # Architecture
//!
//! - [`reconcile`]: per-link operations (`populate`, `need_update`, `update`)
//! - [`sync`]: per-group orchestration (head branch, links, pull request)
//!
//! # Group lifecycle
//!
//! ```text
//! NoBranch -> HeadReady -> Reconciling -> CleanedUp | PrReady
//! ```
//!
//! A failing group stops where it failed; other groups still run.
//!
//! # Invariants
//!
//! - "Not found" on the target side is a signal to create, never an error
//! - Any other failure on a remote call fails the group, it is never guessed
//! - A head branch created by this run and left unused is deleted

pub mod reconcile;
pub mod sync;

pub use sync::{GroupOutcome, GroupReport, SyncReport, SyncSettings, Synchronizer};

use thiserror::Error;

use crate::forge::ForgeError;
use crate::ui::template::TemplateError;

/// Errors from reconciling one link.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LinkError {
    /// The source file could not be fetched.
    #[error("source {file} could not be fetched: {source}")]
    MissingSource { file: String, source: ForgeError },

    /// A side still has no repository after defaults were applied.
    #[error("link {0} has no repository; set one or add defaults")]
    Unresolved(String),

    /// Content was needed before the file was fetched.
    #[error("{0} has not been fetched")]
    Unpopulated(String),

    /// A remote call failed.
    #[error(transparent)]
    Transport(#[from] ForgeError),

    /// The commit message could not be rendered.
    #[error("failed to render commit message: {0}")]
    Template(#[from] TemplateError),
}

/// Errors from synchronizing groups.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SyncError {
    /// Resolving, creating or deleting a branch failed.
    #[error("branch operation in {repo} failed: {source}")]
    Branch { repo: String, source: ForgeError },

    /// One link of the group failed.
    #[error("link {link}: {source}")]
    Link { link: String, source: LinkError },

    /// Rendering the pull request title or body failed.
    #[error("failed to render pull request for {repo}: {source}")]
    Render { repo: String, source: TemplateError },

    /// Finding or opening the pull request failed.
    #[error("pull request in {repo} failed: {source}")]
    Pull { repo: String, source: ForgeError },

    /// The run was cancelled.
    #[error("cancelled after {processed} of {total} groups")]
    Cancelled { processed: usize, total: usize },

    /// At least one group failed.
    #[error("{failed} of {total} groups failed")]
    GroupsFailed { failed: usize, total: usize },
}
