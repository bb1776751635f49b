//! lnsync - keep files in sync across GitHub repositories through pull requests
//!
//! A YAML document declares links: the content of a source file is mirrored
//! into one or more target files, possibly in other repositories. Each run
//! writes changed targets to a head branch per destination repository and
//! opens (or reuses) one pull request there.
//!
//! # Architecture
//!
//! - [`cli`] - Command-line interface layer (parses args, dispatches)
//! - [`core`] - Domain types, reference parsing, link resolution, configuration
//! - [`engine`] - Link reconciliation and per-repository orchestration
//! - [`forge`] - Abstraction for the remote forge (GitHub, in-memory mock)
//! - [`ui`] - Commit and pull request text, terminal output
//! - [`logging`] - `tracing` subscriber setup
//!
//! # Correctness Invariants
//!
//! 1. A target is written only when its content differs on both the base
//!    and the head branch
//! 2. At most one pull request per destination repository and head branch
//! 3. A head branch created by a run that writes nothing is deleted
//! 4. One failing destination repository never stops the others

pub mod cli;
pub mod core;
pub mod engine;
pub mod forge;
pub mod logging;
pub mod ui;
