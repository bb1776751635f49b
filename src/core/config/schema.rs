//! core::config::schema
//!
//! Raw configuration document.
//!
//! The document is decoded strictly: unknown keys at the top level or in a
//! link entry are rejected. `from`/`to` values are kept as raw YAML here and
//! classified later by [`crate::core::reference`].
//!
//! # Example
//!
//! ```yaml
//! defaults:
//!   repo: octocat/templates
//!
//! links:
//!   - from: LICENSE
//!     to:
//!       - octocat/api:LICENSE
//!       - octocat/web:LICENSE
//!   - from: https://github.com/octocat/templates/blob/main/.editorconfig
//!     to: { repo: octocat/api }
//! ```

use serde::{Deserialize, Serialize};
use serde_yaml::Value;

/// Top-level document.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RawDocument {
    /// Either a link entry (`{from, to}`) or a single reference.
    #[serde(skip_serializing_if = "Value::is_null")]
    pub defaults: Value,

    /// Link entries, in document order.
    pub links: Vec<RawLinkEntry>,
}

/// One entry of `links`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RawLinkEntry {
    pub from: Value,
    pub to: Value,
}

impl RawLinkEntry {
    /// Mapping keys that mark a `defaults` value as a link entry rather than
    /// a single reference.
    pub const KEYS: [&'static str; 2] = ["from", "to"];

    /// Whether `value` has the shape of a link entry.
    pub fn matches(value: &Value) -> bool {
        value
            .as_mapping()
            .is_some_and(|map| Self::KEYS.iter().any(|key| map.contains_key(*key)))
    }
}

impl RawDocument {
    /// Decode a document. Blank input is an empty document.
    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content)
    }
}
