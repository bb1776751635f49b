//! core::reference
//!
//! Parsing of the permissive file reference syntax used by `from`/`to`.
//!
//! # Shapes
//!
//! A raw value is first classified into a [`RawRef`]:
//!
//! - absent / `null` - no reference at all
//! - a string - one of the grammars below
//! - a mapping - `{owner, repo, path, ref}`, where `repo` may be `owner/repo`
//! - a list of strings and mappings
//!
//! # String grammars
//!
//! Checked in order; the first match wins and `PATH` captures everything
//! that remains (it may contain `/`):
//!
//! 1. `https://HOST/OWNER/REPO/blob/REF/PATH`
//! 2. `OWNER/REPO/blob/REF/PATH`
//! 3. `OWNER/REPO:PATH@REF` (the `@REF` suffix is optional)
//! 4. `PATH@REF`
//! 5. `PATH`
//!
//! Fields not captured stay empty and are filled by the defaults cascade
//! in [`crate::core::link`].
//!
//! # Example
//!
//! ```
//! use lnsync::core::reference::parse_str;
//!
//! let file = parse_str("octocat/docs:guides/setup.md@main").unwrap();
//! assert_eq!(file.repo.to_string(), "octocat/docs");
//! assert_eq!(file.path, "guides/setup.md");
//! assert_eq!(file.git_ref, "main");
//! ```

use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde_yaml::{Mapping, Value};
use thiserror::Error;

use super::types::{FileRef, RepoRef};

/// Errors from reference parsing.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ReferenceError {
    /// A string matched none of the reference grammars.
    #[error("invalid reference format: '{0}'")]
    InvalidFormat(String),

    /// The raw value is not a string, a mapping, a list, or absent.
    #[error("invalid reference type: {0}")]
    InvalidType(String),
}

/// A raw `from`/`to` value, classified by shape.
#[derive(Debug, Clone, PartialEq)]
pub enum RawRef {
    /// Omitted or `null`.
    Absent,
    /// A string in one of the reference grammars.
    Scalar(String),
    /// A `{owner, repo, path, ref}` mapping.
    Mapping(RefFields),
    /// Several references.
    List(Vec<RawRef>),
}

/// Fields of a mapping-shaped reference.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefFields {
    pub owner: Option<String>,
    pub repo: Option<String>,
    pub path: Option<String>,
    pub git_ref: Option<String>,
}

const MAPPING_KEYS: [&str; 4] = ["owner", "repo", "path", "ref"];

impl RawRef {
    /// Classify a YAML value.
    ///
    /// Nested lists are rejected; `null` items inside a list are kept and
    /// produce no reference.
    pub fn from_value(value: &Value) -> Result<Self, ReferenceError> {
        Self::classify(value, true)
    }

    fn classify(value: &Value, allow_list: bool) -> Result<Self, ReferenceError> {
        match value {
            Value::Null => Ok(RawRef::Absent),
            Value::String(s) => Ok(RawRef::Scalar(s.clone())),
            Value::Mapping(map) => Ok(RawRef::Mapping(RefFields::from_mapping(map)?)),
            Value::Sequence(items) if allow_list => items
                .iter()
                .map(|item| Self::classify(item, false))
                .collect::<Result<Vec<_>, _>>()
                .map(RawRef::List),
            other => Err(ReferenceError::InvalidType(describe(other))),
        }
    }

    /// Resolve into zero or more file references.
    pub fn resolve(&self) -> Result<Vec<FileRef>, ReferenceError> {
        match self {
            RawRef::Absent => Ok(Vec::new()),
            RawRef::Scalar(s) => parse_str(s).map(|f| vec![f]),
            RawRef::Mapping(fields) => fields.to_file_ref().map(|f| vec![f]),
            RawRef::List(items) => {
                let mut files = Vec::with_capacity(items.len());
                for item in items {
                    files.extend(item.resolve()?);
                }
                Ok(files)
            }
        }
    }
}

impl RefFields {
    fn from_mapping(map: &Mapping) -> Result<Self, ReferenceError> {
        let mut fields = RefFields::default();

        for (key, value) in map {
            let key = key
                .as_str()
                .ok_or_else(|| ReferenceError::InvalidType(format!("mapping key {}", describe(key))))?;

            let value = match value {
                Value::Null => continue,
                Value::String(s) => s.clone(),
                other => {
                    return Err(ReferenceError::InvalidType(format!(
                        "value of '{key}' is {}",
                        describe(other)
                    )))
                }
            };

            match key {
                "owner" => fields.owner = Some(value),
                "repo" => fields.repo = Some(value),
                "path" => fields.path = Some(value),
                "ref" => fields.git_ref = Some(value),
                unknown => {
                    tracing::warn!(
                        key = unknown,
                        expected = ?MAPPING_KEYS,
                        "ignoring unknown reference key"
                    );
                }
            }
        }

        Ok(fields)
    }

    fn to_file_ref(&self) -> Result<FileRef, ReferenceError> {
        let mut repo = RepoRef::new(
            self.owner.clone().unwrap_or_default(),
            self.repo.clone().unwrap_or_default(),
        );

        // `repo: owner/name` carries its own owner, which wins over `owner`.
        if let Some((owner, name)) = repo.name.split_once('/') {
            if name.contains('/') || owner.is_empty() || name.is_empty() {
                return Err(ReferenceError::InvalidFormat(repo.name.clone()));
            }
            repo = RepoRef::new(owner, name);
        }

        Ok(FileRef {
            repo,
            path: self.path.clone().unwrap_or_default(),
            git_ref: self.git_ref.clone().unwrap_or_default(),
            ..Default::default()
        })
    }
}

const SEGMENT: &str = r"[\w.-]+";

// The patterns below are built from literals only, so compiling them cannot
// fail at runtime; `patterns_compile` forces each one.

static HTTPS_BLOB: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"^https://[^/]+/(?P<owner>{SEGMENT})/(?P<repo>{SEGMENT})/blob/(?P<ref>{SEGMENT})/(?P<path>.+)$"
    ))
    .expect("static regex")
});

static SHORT_BLOB: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"^(?P<owner>{SEGMENT})/(?P<repo>{SEGMENT})/blob/(?P<ref>{SEGMENT})/(?P<path>.+)$"
    ))
    .expect("static regex")
});

static REPO_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"^(?P<owner>{SEGMENT})/(?P<repo>{SEGMENT}):(?P<path>.+?)(?:@(?P<ref>{SEGMENT}))?$"
    ))
    .expect("static regex")
});

static PATH_REF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"^(?P<path>[^@]+)@(?P<ref>{SEGMENT})$")).expect("static regex")
});

static PATH: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(?P<path>.+)$").expect("static regex"));

/// Parse a reference string.
///
/// # Errors
///
/// Returns [`ReferenceError::InvalidFormat`] when no grammar matches (for
/// instance the empty string).
pub fn parse_str(s: &str) -> Result<FileRef, ReferenceError> {
    let grammars: [&Regex; 5] = [&HTTPS_BLOB, &SHORT_BLOB, &REPO_PATH, &PATH_REF, &PATH];

    grammars
        .iter()
        .find_map(|re| re.captures(s))
        .map(|caps| from_captures(&caps))
        .ok_or_else(|| ReferenceError::InvalidFormat(s.to_string()))
}

fn from_captures(caps: &Captures<'_>) -> FileRef {
    let group = |name: &str| caps.name(name).map(|m| m.as_str()).unwrap_or_default();

    FileRef {
        repo: RepoRef::new(group("owner"), group("repo")),
        path: group("path").to_string(),
        git_ref: group("ref").to_string(),
        ..Default::default()
    }
}

/// Parse a raw `from`/`to` value into zero or more file references.
///
/// # Errors
///
/// [`ReferenceError::InvalidType`] for numbers, booleans, tagged values and
/// nested lists; [`ReferenceError::InvalidFormat`] for unparseable strings.
pub fn parse_value(value: &Value) -> Result<Vec<FileRef>, ReferenceError> {
    RawRef::from_value(value)?.resolve()
}

fn describe(value: &Value) -> String {
    match value {
        Value::Null => "null".into(),
        Value::Bool(b) => format!("boolean {b}"),
        Value::Number(n) => format!("number {n}"),
        Value::String(s) => format!("string '{s}'"),
        Value::Sequence(_) => "nested list".into(),
        Value::Mapping(_) => "mapping".into(),
        Value::Tagged(t) => format!("tagged value {}", t.tag),
    }
}
