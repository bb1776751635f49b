//! core::types
//!
//! Strong types for core domain concepts.
//!
//! # Types
//!
//! - [`RepoRef`] - A repository coordinate (`owner/name`)
//! - [`FileRef`] - A file inside a repository, optionally pinned to a ref
//! - [`Branch`] - A remote branch observed (or created) during a run
//! - [`BranchName`] - Validated Git branch name, used for the head branch
//!
//! # Identity vs. observed state
//!
//! A [`FileRef`] carries both identity (repository, path, blob SHA, commit)
//! and observed state (content). Equality only looks at identity: two
//! references to the same blob are equal whether or not either side has
//! been fetched yet.
//!
//! # Examples
//!
//! ```
//! use lnsync::core::types::{FileRef, RepoRef};
//!
//! let repo = RepoRef::new("octocat", "hello-world");
//! assert_eq!(repo.to_string(), "octocat/hello-world");
//!
//! let file = FileRef::new(repo, "README.md").with_ref("main");
//! assert_eq!(file.to_string(), "octocat/hello-world:README.md@main");
//! assert!(!file.is_populated());
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from type validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid branch name: {0}")]
    InvalidBranchName(String),

    #[error("invalid repository '{0}', expected 'owner/name'")]
    InvalidRepo(String),
}

/// A repository coordinate.
///
/// Equality is case-sensitive field equality. A `RepoRef` with both fields
/// unset is "empty" and is filled in later by the defaults cascade.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RepoRef {
    /// User or organization login.
    pub owner: String,
    /// Repository name.
    pub name: String,
}

impl RepoRef {
    /// Create a repository coordinate.
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }

    /// Both owner and name are unset.
    pub fn is_empty(&self) -> bool {
        self.owner.is_empty() && self.name.is_empty()
    }

    /// Both owner and name are set; the repository can be addressed remotely.
    pub fn is_complete(&self) -> bool {
        !self.owner.is_empty() && !self.name.is_empty()
    }
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

impl FromStr for RepoRef {
    type Err = TypeError;

    /// Parse `owner/name`. Both halves must be non-empty and the name may not
    /// contain another `/`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('/') {
            Some((owner, name)) if !owner.is_empty() && !name.is_empty() && !name.contains('/') => {
                Ok(Self::new(owner, name))
            }
            _ => Err(TypeError::InvalidRepo(s.to_string())),
        }
    }
}

/// A file inside a repository.
///
/// `content` and `blob_sha` are populated lazily by a fetch. A reference
/// whose `content` is `None` is "unpopulated" (not fetched yet, or fetched
/// and found missing).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileRef {
    /// Repository holding the file.
    pub repo: RepoRef,
    /// Path of the file inside the repository.
    pub path: String,
    /// Git ref the file is read from. Empty means the default branch.
    #[serde(rename = "ref", default, skip_serializing_if = "String::is_empty")]
    pub git_ref: String,
    /// Commit the file was last written by, when known.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub commit: String,
    /// Decoded file content, once fetched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Blob SHA of the fetched content.
    #[serde(rename = "sha", default, skip_serializing_if = "String::is_empty")]
    pub blob_sha: String,
}

impl FileRef {
    /// Create a reference to `path` in `repo`.
    pub fn new(repo: RepoRef, path: impl Into<String>) -> Self {
        Self {
            repo,
            path: path.into(),
            ..Default::default()
        }
    }

    /// A reference carrying only a path; everything else is left for defaults.
    pub fn path_only(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    /// Pin the reference to a git ref.
    pub fn with_ref(mut self, git_ref: impl Into<String>) -> Self {
        self.git_ref = git_ref.into();
        self
    }

    /// Attach content, as if fetched.
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    /// The same repository and path, read at another ref, with no observed state.
    pub fn at_ref(&self, git_ref: impl Into<String>) -> Self {
        Self {
            repo: self.repo.clone(),
            path: self.path.clone(),
            git_ref: git_ref.into(),
            ..Default::default()
        }
    }

    /// Content has been fetched.
    pub fn is_populated(&self) -> bool {
        self.content.is_some()
    }
}

impl PartialEq for FileRef {
    fn eq(&self, other: &Self) -> bool {
        self.repo == other.repo
            && self.path == other.path
            && self.blob_sha == other.blob_sha
            && self.commit == other.commit
    }
}

impl Eq for FileRef {}

impl fmt::Display for FileRef {
    /// Canonical string form: `owner/name:path@ref`, dropping the parts that
    /// are unset.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.repo.is_empty() {
            write!(f, "{}:", self.repo)?;
        }
        write!(f, "{}", self.path)?;
        if !self.git_ref.is_empty() {
            write!(f, "@{}", self.git_ref)?;
        }
        Ok(())
    }
}

/// A remote branch.
///
/// `is_new` marks a branch this run created; it decides whether the branch
/// is deleted when nothing ends up being written to it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    /// Branch name (without `refs/heads/`).
    pub name: String,
    /// Commit the branch points to.
    pub commit_sha: String,
    /// Created during this run.
    #[serde(default)]
    pub is_new: bool,
}

impl Branch {
    /// An existing branch.
    pub fn existing(name: impl Into<String>, commit_sha: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            commit_sha: commit_sha.into(),
            is_new: false,
        }
    }

    /// A branch created by this run.
    pub fn created(name: impl Into<String>, commit_sha: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            commit_sha: commit_sha.into(),
            is_new: true,
        }
    }
}

impl fmt::Display for Branch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.commit_sha.is_empty() {
            write!(f, " ({})", short_sha(&self.commit_sha))?;
        }
        if self.is_new {
            write!(f, " [new]")?;
        }
        Ok(())
    }
}

fn short_sha(sha: &str) -> &str {
    sha.get(..7).unwrap_or(sha)
}

/// A validated Git branch name.
///
/// Branch names must conform to Git's refname rules (see `git check-ref-format`):
/// - Cannot be empty
/// - Cannot start with `.` or `-`
/// - Cannot end with `.lock` or `/`
/// - Cannot contain `..`, `@{`, `//`, or ASCII control characters
/// - Cannot contain spaces, `~`, `^`, `:`, `\`, `?`, `*`, `[`
/// - Cannot be exactly `@`
///
/// # Example
///
/// ```
/// use lnsync::core::types::BranchName;
///
/// let name = BranchName::new("auto-lnsync").unwrap();
/// assert_eq!(name.as_str(), "auto-lnsync");
///
/// assert!(BranchName::new("").is_err());
/// assert!(BranchName::new("has space").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BranchName(String);

impl BranchName {
    /// Create a new validated branch name.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidBranchName` if the name violates Git's refname rules.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        Self::validate(&name)?;
        Ok(Self(name))
    }

    /// Wrap a built-in name. Only for constants covered by a validity test.
    pub(crate) fn from_static(name: &'static str) -> Self {
        Self(name.to_string())
    }

    fn validate(name: &str) -> Result<(), TypeError> {
        let reject = |reason: &str| Err(TypeError::InvalidBranchName(reason.to_string()));

        if name.is_empty() {
            return reject("branch name cannot be empty");
        }
        if name == "@" {
            return reject("branch name cannot be '@' (reserved)");
        }
        if name.starts_with('-') {
            return reject("branch name cannot start with '-'");
        }
        if name.ends_with('/') {
            return reject("branch name cannot end with '/'");
        }
        for sequence in ["..", "@{", "//"] {
            if name.contains(sequence) {
                return Err(TypeError::InvalidBranchName(format!(
                    "branch name cannot contain '{sequence}'"
                )));
            }
        }

        const INVALID_CHARS: [char; 8] = [' ', '~', '^', ':', '\\', '?', '*', '['];
        if let Some(c) = name.chars().find(|c| INVALID_CHARS.contains(c)) {
            return Err(TypeError::InvalidBranchName(format!(
                "branch name cannot contain '{c}'"
            )));
        }
        if name.chars().any(|c| c.is_ascii_control()) {
            return reject("branch name cannot contain control characters");
        }

        // Leading '.' and trailing ".lock" apply to every path component.
        for component in name.split('/') {
            if component.starts_with('.') {
                return reject("path component cannot start with '.'");
            }
            if component.ends_with(".lock") {
                return reject("path component cannot end with '.lock'");
            }
        }

        Ok(())
    }

    /// Get the branch name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for BranchName {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<BranchName> for String {
    fn from(name: BranchName) -> Self {
        name.0
    }
}

impl FromStr for BranchName {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for BranchName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BranchName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
