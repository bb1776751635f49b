//! forge::traits
//!
//! Collaborator contracts for reading and writing a remote forge.
//!
//! # Design
//!
//! The traits are async because every operation is network I/O. They are
//! split by capability so callers can ask for exactly what they use:
//!
//! - [`FileFetcher`] - read a file at a ref
//! - [`FileUpdater`] - write a file onto a branch
//! - [`Forge`] - both of the above plus branches and pull requests
//!
//! "Not found" is always [`ForgeError::NotFound`]; callers branch on the
//! variant, never on the message.
//!
//! # Example
//!
//! ```ignore
//! use lnsync::forge::{Forge, ForgeError};
//! use lnsync::core::types::RepoRef;
//!
//! async fn head_for(forge: &dyn Forge, repo: &RepoRef) -> Result<(), ForgeError> {
//!     let base = forge.default_branch(repo).await?;
//!     let head = forge
//!         .get_or_create_branch(repo, "auto-lnsync", &base.commit_sha)
//!         .await?;
//!     println!("{} from {}", head, base);
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;
use thiserror::Error;

use crate::core::types::{Branch, FileRef, RepoRef};

/// Errors from forge operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ForgeError {
    /// Authentication is required but not available.
    #[error("authentication required")]
    AuthRequired,

    /// Authentication failed (invalid token, expired, insufficient permissions).
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// The requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// The resource being created already exists.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// Rate limit exceeded.
    #[error("rate limited")]
    RateLimited,

    /// API returned an error.
    #[error("API error: {status} - {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Error message from the API
        message: String,
    },

    /// Network or connection error.
    #[error("network error: {0}")]
    NetworkError(String),
}

impl ForgeError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ForgeError::NotFound(_))
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(self, ForgeError::AlreadyExists(_))
    }
}

/// A file as stored on the forge.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteFile {
    /// Path inside the repository.
    pub path: String,
    /// Blob SHA.
    pub sha: String,
    /// Decoded content.
    pub content: String,
    /// Commit that wrote this content, when reported (writes only).
    pub commit: Option<String>,
}

impl RemoteFile {
    /// Record the fetched state on `file`.
    pub fn populate(self, file: &mut FileRef) {
        file.content = Some(self.content);
        file.blob_sha = self.sha;
        if let Some(commit) = self.commit {
            file.commit = commit;
        }
    }
}

/// Request to write a file onto a branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateFileRequest {
    pub repo: RepoRef,
    pub path: String,
    pub content: String,
    /// Branch to commit onto.
    pub branch: String,
    /// Commit message.
    pub message: String,
    /// Blob SHA being replaced; `None` creates the file.
    pub sha: Option<String>,
}

/// Request to open a pull request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatePullRequest {
    /// Branch to merge into.
    pub base: String,
    /// Branch carrying the changes.
    pub head: String,
    pub title: String,
    pub body: String,
}

/// An open pull request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequest {
    /// PR number
    pub number: u64,
    /// PR URL (web URL for viewing)
    pub url: String,
    /// Head branch name
    pub head: String,
    /// Base branch name
    pub base: String,
    /// PR title
    pub title: String,
}

/// Read access to files.
#[async_trait]
pub trait FileFetcher: Send + Sync {
    /// Fetch `file.path` from `file.repo` at `file.git_ref` (default branch
    /// when empty).
    ///
    /// # Errors
    ///
    /// - `NotFound` if the repository, ref or file does not exist
    /// - any other variant for transport failures
    async fn get_file(&self, file: &FileRef) -> Result<RemoteFile, ForgeError>;
}

/// Write access to files.
#[async_trait]
pub trait FileUpdater: Send + Sync {
    /// Commit `request.content` at `request.path` on `request.branch`.
    ///
    /// Returns the stored file with its new blob SHA and the commit SHA.
    async fn update_file(&self, request: UpdateFileRequest) -> Result<RemoteFile, ForgeError>;
}

/// A remote forge: files, branches and pull requests across repositories.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` to allow use across async tasks.
///
/// # Error Handling
///
/// All methods return `Result<T, ForgeError>`. Callers should handle:
/// - `AuthRequired` / `AuthFailed`: Check the token
/// - `NotFound`: Resource doesn't exist
/// - `AlreadyExists`: Lost a creation race
/// - `RateLimited`: Back off and retry
/// - `ApiError` / `NetworkError`: Report to the user
#[async_trait]
pub trait Forge: FileFetcher + FileUpdater {
    /// Get the forge name (e.g., "github").
    fn name(&self) -> &'static str;

    /// Read a branch.
    ///
    /// # Errors
    ///
    /// `NotFound` if the branch does not exist.
    async fn get_branch(&self, repo: &RepoRef, name: &str) -> Result<Branch, ForgeError>;

    /// Create `name` pointing at `from_sha`. The result has `is_new` set.
    ///
    /// # Errors
    ///
    /// `AlreadyExists` if the branch exists.
    async fn create_branch(
        &self,
        repo: &RepoRef,
        name: &str,
        from_sha: &str,
    ) -> Result<Branch, ForgeError>;

    /// Delete a branch.
    async fn delete_branch(&self, repo: &RepoRef, name: &str) -> Result<(), ForgeError>;

    /// Read the repository's default branch.
    async fn default_branch(&self, repo: &RepoRef) -> Result<Branch, ForgeError>;

    /// Find the open pull request from `head` into `base`, if any.
    async fn find_pull(
        &self,
        repo: &RepoRef,
        base: &str,
        head: &str,
    ) -> Result<Option<PullRequest>, ForgeError>;

    /// Open a pull request.
    ///
    /// # Errors
    ///
    /// `AlreadyExists` if an open pull request already covers the branch pair.
    async fn create_pull(
        &self,
        repo: &RepoRef,
        request: CreatePullRequest,
    ) -> Result<PullRequest, ForgeError>;

    /// Read `name`, creating it from `from_sha` when missing.
    ///
    /// A creation that loses a race to another writer re-reads the branch,
    /// which then counts as existing.
    async fn get_or_create_branch(
        &self,
        repo: &RepoRef,
        name: &str,
        from_sha: &str,
    ) -> Result<Branch, ForgeError> {
        match self.get_branch(repo, name).await {
            Ok(branch) => return Ok(branch),
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e),
        }

        match self.create_branch(repo, name, from_sha).await {
            Ok(branch) => Ok(branch),
            Err(e) if e.is_already_exists() => self.get_branch(repo, name).await,
            Err(e) => Err(e),
        }
    }

    /// Reuse the open pull request for `(base, head)` or open one.
    ///
    /// Returns the pull request and whether it already existed.
    async fn get_or_create_pull(
        &self,
        repo: &RepoRef,
        request: CreatePullRequest,
    ) -> Result<(PullRequest, bool), ForgeError> {
        if let Some(pull) = self.find_pull(repo, &request.base, &request.head).await? {
            return Ok((pull, true));
        }

        let (base, head) = (request.base.clone(), request.head.clone());
        match self.create_pull(repo, request).await {
            Ok(pull) => Ok((pull, false)),
            Err(e) if e.is_already_exists() => match self.find_pull(repo, &base, &head).await? {
                Some(pull) => Ok((pull, true)),
                None => Err(e),
            },
            Err(e) => Err(e),
        }
    }
}
