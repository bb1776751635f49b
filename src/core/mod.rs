//! core
//!
//! Core domain types and link resolution.
//!
//! # Modules
//!
//! - [`types`] - Strong types: RepoRef, FileRef, Branch, BranchName
//! - [`reference`] - Permissive file reference parsing
//! - [`link`] - Links, defaults, combination and grouping
//! - [`config`] - Configuration document schema and loading
//!
//! # Design Principles
//!
//! - Nothing in `core` touches the network
//! - Schemas are strict; reference values are permissive
//! - Resolution is deterministic for a given document and origin

pub mod config;
pub mod link;
pub mod reference;
pub mod types;
