//! forge
//!
//! Abstraction over the remote forge holding the synchronized repositories.
//!
//! # Architecture
//!
//! The engine talks to the forge only through the traits in this module,
//! so reconciliation and orchestration run unchanged against GitHub or the
//! in-memory mock.
//!
//! # Modules
//!
//! - `traits`: [`FileFetcher`], [`FileUpdater`], [`Forge`] and their
//!   request/response types
//! - [`github`]: GitHub implementation using the REST API
//! - [`mock`]: Mock implementation for deterministic testing

pub mod github;
pub mod mock;
mod traits;

pub use traits::*;
