//! core::config
//!
//! Configuration loading: raw document to resolved [`Links`].
//!
//! # Loading
//!
//! 1. Decode the YAML document strictly ([`schema::RawDocument`])
//! 2. Resolve the `defaults` section into a fallback [`Link`]. A plain
//!    `owner/name` string there names a repository rather than a path
//! 3. For each entry, in order: parse `from` and `to`, [`combine`], apply
//!    [`Defaults`], drop self edges, append
//!
//! Any parse failure aborts the whole load. Errors name the offending
//! entry's index and carry its raw YAML.
//!
//! # Origin repository
//!
//! When the document was fetched from a repository, that repository fills
//! any `repo` still unset after explicit defaults and cross-inheritance.
//!
//! # Example
//!
//! ```
//! use lnsync::core::config::Config;
//! use lnsync::core::types::RepoRef;
//!
//! let yaml = "links:\n  - from: LICENSE\n    to: octocat/api:LICENSE\n";
//! let config = Config::parse_with_origin(yaml, Some(RepoRef::new("octocat", "templates"))).unwrap();
//!
//! assert_eq!(config.links.len(), 1);
//! assert_eq!(
//!     config.links[0].to_string(),
//!     "octocat/templates:LICENSE -> octocat/api:LICENSE"
//! );
//! ```

pub mod schema;

pub use schema::{RawDocument, RawLinkEntry};

use std::fs;
use std::path::{Path, PathBuf};

use serde_yaml::Value;
use thiserror::Error;

use crate::core::link::{combine, Defaults, Link, Links};
use crate::core::reference::{parse_value, ReferenceError};
use crate::core::types::{FileRef, RepoRef};

/// Default location of the configuration document in a repository.
pub const DEFAULT_CONFIG_PATH: &str = ".github/lnsync.yaml";

/// Which side of a link a value belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    From,
    To,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::From => write!(f, "from"),
            Side::To => write!(f, "to"),
        }
    }
}

/// Errors from configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config document: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid defaults: {0}")]
    InvalidDefaults(String),

    #[error("invalid `{side}` in link #{index} ({raw}): {source}")]
    InvalidEntry {
        index: usize,
        side: Side,
        raw: String,
        source: ReferenceError,
    },
}

/// A loaded configuration.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Defaults used while resolving `links`.
    pub defaults: Defaults,
    /// Resolved edges, in document order.
    pub links: Links,
    /// Where the document was read from, when remote.
    pub source: Option<FileRef>,
}

impl Config {
    /// Parse a document with no origin repository.
    ///
    /// # Errors
    ///
    /// See [`ConfigError`].
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        Self::parse_with_origin(content, None)
    }

    /// Parse a document, filling unset repositories from `origin`.
    pub fn parse_with_origin(content: &str, origin: Option<RepoRef>) -> Result<Self, ConfigError> {
        let doc = RawDocument::from_yaml(content)?;

        let defaults = Defaults::new(parse_defaults(&doc.defaults)?, origin);

        let mut links = Links::new();
        for (index, entry) in doc.links.iter().enumerate() {
            let resolved = parse_entry(entry, &defaults).map_err(|(side, source)| {
                tracing::debug!(index, %side, error = %source, "failed to parse link");
                ConfigError::InvalidEntry {
                    index,
                    side,
                    raw: raw_text(entry),
                    source,
                }
            })?;
            links.extend(resolved);
        }

        tracing::debug!(links = links.len(), "configuration parsed");

        Ok(Self {
            defaults,
            links,
            source: None,
        })
    }

    /// Parse a document fetched from a repository.
    ///
    /// `source` must be populated; its repository becomes the origin.
    pub fn from_source(source: FileRef) -> Result<Self, ConfigError> {
        let content = source.content.as_deref().unwrap_or_default();
        let mut config = Self::parse_with_origin(content, Some(source.repo.clone()))?;
        config.source = Some(source);
        Ok(config)
    }

    /// Read and parse a local document.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        Self::load_with_origin(path, None)
    }

    /// Read and parse a local document, with an origin repository.
    pub fn load_with_origin(path: &Path, origin: Option<RepoRef>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse_with_origin(&content, origin)
    }
}

fn parse_entry(entry: &RawLinkEntry, defaults: &Defaults) -> Result<Links, (Side, ReferenceError)> {
    let froms = parse_value(&entry.from).map_err(|e| (Side::From, e))?;
    let tos = parse_value(&entry.to).map_err(|e| (Side::To, e))?;

    let mut links: Links = combine(froms, tos).into_iter().collect();
    links.apply_defaults(defaults);
    links.drop_self_edges();
    Ok(links)
}

fn parse_defaults(value: &Value) -> Result<Option<Link>, ConfigError> {
    if value.is_null() {
        return Ok(None);
    }

    if RawLinkEntry::matches(value) {
        let entry: RawLinkEntry = serde_yaml::from_value(value.clone())?;
        let from = single_default(&entry.from, Side::From)?;
        let to = single_default(&entry.to, Side::To)?;
        return Ok(Some(Link::new(from, to)));
    }

    let both = single_default(value, Side::From)?;
    Ok(Some(Link::new(both.clone(), both)))
}

fn single_default(value: &Value, side: Side) -> Result<FileRef, ConfigError> {
    // A bare `owner/name` names a repository here, not a path.
    if let Some(repo) = value.as_str().and_then(|s| s.parse::<RepoRef>().ok()) {
        return Ok(FileRef::new(repo, ""));
    }

    let mut refs = parse_value(value)
        .map_err(|e| ConfigError::InvalidDefaults(format!("`{side}`: {e}")))?;

    if refs.len() > 1 {
        return Err(ConfigError::InvalidDefaults(format!(
            "`{side}` must be a single reference, got {}",
            refs.len()
        )));
    }
    Ok(refs.pop().unwrap_or_default())
}

fn raw_text(entry: &RawLinkEntry) -> String {
    serde_yaml::to_string(entry)
        .map(|s| s.trim().replace('\n', "; "))
        .unwrap_or_else(|_| format!("{entry:?}"))
}
