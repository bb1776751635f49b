//! ui
//!
//! Text produced for people.
//!
//! # Modules
//!
//! - [`template`] - Commit message and pull request rendering
//! - [`pull_body`] - Markdown pieces of pull request bodies
//! - [`output`] - Terminal output and run summaries

pub mod output;
pub mod pull_body;
pub mod template;
