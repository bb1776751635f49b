//! forge::mock
//!
//! Mock forge implementation for deterministic testing.
//!
//! # Design
//!
//! The mock keeps repositories in memory: each has a default branch, a set
//! of branches (commit SHA plus a flat path -> file map) and open pull
//! requests. SHAs are 40-hex strings drawn from a counter, so runs are
//! reproducible. Every call is recorded as a [`MockOperation`], and any
//! operation can be made to fail with [`FailOn`], globally or for one
//! repository, always or once.
//!
//! # Example
//!
//! ```
//! use lnsync::core::types::{FileRef, RepoRef};
//! use lnsync::forge::mock::MockForge;
//! use lnsync::forge::FileFetcher;
//!
//! # tokio_test::block_on(async {
//! let repo = RepoRef::new("octocat", "docs");
//! let forge = MockForge::new().with_file(&repo, "README.md", "hello");
//!
//! let file = forge
//!     .get_file(&FileRef::new(repo, "README.md"))
//!     .await
//!     .unwrap();
//! assert_eq!(file.content, "hello");
//! # });
//! ```

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use super::traits::{
    CreatePullRequest, FileFetcher, FileUpdater, Forge, ForgeError, PullRequest, RemoteFile,
    UpdateFileRequest,
};
use crate::core::types::{Branch, FileRef, RepoRef};

/// Default branch given to repositories created implicitly.
pub const DEFAULT_BRANCH: &str = "main";

/// Mock forge for testing.
///
/// Thread-safe via internal `Arc<Mutex<...>>` wrapping; clones share state.
#[derive(Debug, Clone, Default)]
pub struct MockForge {
    /// Internal state shared across clones.
    inner: Arc<Mutex<MockForgeInner>>,
}

/// Internal mutable state.
#[derive(Debug, Default)]
struct MockForgeInner {
    repos: BTreeMap<RepoRef, MockRepo>,
    /// Source of fake SHAs.
    counter: u64,
    next_pr_number: u64,
    failures: Vec<Failure>,
    /// Recorded operations for verification.
    operations: Vec<MockOperation>,
}

#[derive(Debug, Clone)]
struct MockRepo {
    default_branch: String,
    branches: BTreeMap<String, MockBranch>,
    pulls: Vec<PullRequest>,
}

#[derive(Debug, Clone, Default)]
struct MockBranch {
    commit: String,
    files: BTreeMap<String, MockFile>,
}

#[derive(Debug, Clone)]
struct MockFile {
    content: String,
    sha: String,
}

#[derive(Debug, Clone)]
struct Failure {
    repo: Option<RepoRef>,
    on: FailOn,
    once: bool,
}

/// Configuration for which operation should fail.
#[derive(Debug, Clone)]
pub enum FailOn {
    /// Fail every get_file with the given error.
    GetFile(ForgeError),
    /// Fail get_file only when reading at `git_ref`.
    GetFileAt { git_ref: String, error: ForgeError },
    /// Fail update_file with the given error.
    UpdateFile(ForgeError),
    /// Fail get_branch with the given error.
    GetBranch(ForgeError),
    /// Fail create_branch with the given error.
    CreateBranch(ForgeError),
    /// Fail delete_branch with the given error.
    DeleteBranch(ForgeError),
    /// Fail default_branch with the given error.
    DefaultBranch(ForgeError),
    /// Fail find_pull with the given error.
    FindPull(ForgeError),
    /// Fail create_pull with the given error.
    CreatePull(ForgeError),
}

impl FailOn {
    fn error_for(&self, op: &MockOperation) -> Option<ForgeError> {
        use MockOperation as Op;

        match (self, op) {
            (FailOn::GetFile(e), Op::GetFile { .. })
            | (FailOn::UpdateFile(e), Op::UpdateFile { .. })
            | (FailOn::GetBranch(e), Op::GetBranch { .. })
            | (FailOn::CreateBranch(e), Op::CreateBranch { .. })
            | (FailOn::DeleteBranch(e), Op::DeleteBranch { .. })
            | (FailOn::DefaultBranch(e), Op::DefaultBranch { .. })
            | (FailOn::FindPull(e), Op::FindPull { .. })
            | (FailOn::CreatePull(e), Op::CreatePull { .. }) => Some(e.clone()),
            (FailOn::GetFileAt { git_ref, error }, Op::GetFile { file }) if &file.git_ref == git_ref => {
                Some(error.clone())
            }
            _ => None,
        }
    }
}

/// Recorded operation for test verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockOperation {
    GetFile {
        file: FileRef,
    },
    UpdateFile {
        request: UpdateFileRequest,
    },
    GetBranch {
        repo: RepoRef,
        name: String,
    },
    CreateBranch {
        repo: RepoRef,
        name: String,
        from_sha: String,
    },
    DeleteBranch {
        repo: RepoRef,
        name: String,
    },
    DefaultBranch {
        repo: RepoRef,
    },
    FindPull {
        repo: RepoRef,
        base: String,
        head: String,
    },
    CreatePull {
        repo: RepoRef,
        request: CreatePullRequest,
    },
}

impl MockOperation {
    /// Repository the operation targeted.
    pub fn repo(&self) -> &RepoRef {
        match self {
            MockOperation::GetFile { file } => &file.repo,
            MockOperation::UpdateFile { request } => &request.repo,
            MockOperation::GetBranch { repo, .. }
            | MockOperation::CreateBranch { repo, .. }
            | MockOperation::DeleteBranch { repo, .. }
            | MockOperation::DefaultBranch { repo }
            | MockOperation::FindPull { repo, .. }
            | MockOperation::CreatePull { repo, .. } => repo,
        }
    }
}

impl MockForgeInner {
    fn next_sha(&mut self) -> String {
        self.counter += 1;
        format!("{:040x}", self.counter)
    }

    fn repo(&self, repo: &RepoRef) -> Result<&MockRepo, ForgeError> {
        self.repos
            .get(repo)
            .ok_or_else(|| ForgeError::NotFound(format!("repository {repo}")))
    }

    fn repo_mut(&mut self, repo: &RepoRef) -> Result<&mut MockRepo, ForgeError> {
        self.repos
            .get_mut(repo)
            .ok_or_else(|| ForgeError::NotFound(format!("repository {repo}")))
    }

    /// Get or create a repository with `main` at a fresh commit.
    fn ensure_repo(&mut self, repo: &RepoRef) -> &mut MockRepo {
        let commit = self.next_sha();
        self.repos
            .entry(repo.clone())
            .or_insert_with(|| MockRepo::new(DEFAULT_BRANCH, commit))
    }

    /// Record `op` and return the configured failure for it, if any.
    fn enter(&mut self, op: MockOperation) -> Result<(), ForgeError> {
        let hit = self.failures.iter().position(|f| {
            f.repo.as_ref().map_or(true, |r| r == op.repo()) && f.on.error_for(&op).is_some()
        });
        let error = hit.and_then(|i| {
            let error = self.failures[i].on.error_for(&op);
            if self.failures[i].once {
                self.failures.remove(i);
            }
            error
        });

        self.operations.push(op);
        error.map_or(Ok(()), Err)
    }
}

impl MockRepo {
    fn new(default_branch: &str, commit: String) -> Self {
        let mut branches = BTreeMap::new();
        branches.insert(
            default_branch.to_string(),
            MockBranch {
                commit,
                files: BTreeMap::new(),
            },
        );
        Self {
            default_branch: default_branch.to_string(),
            branches,
            pulls: Vec::new(),
        }
    }

    fn branch(&self, name: &str) -> Result<&MockBranch, ForgeError> {
        self.branches
            .get(name)
            .ok_or_else(|| ForgeError::NotFound(format!("branch {name}")))
    }

    fn resolve_ref<'a>(&'a self, git_ref: &'a str) -> &'a str {
        if git_ref.is_empty() {
            &self.default_branch
        } else {
            git_ref
        }
    }
}

impl MockForge {
    /// Create a new empty mock forge.
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockForgeInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Add an empty repository whose default branch is `default_branch`.
    pub fn with_repo(self, repo: &RepoRef, default_branch: &str) -> Self {
        {
            let mut inner = self.state();
            let commit = inner.next_sha();
            inner
                .repos
                .insert(repo.clone(), MockRepo::new(default_branch, commit));
        }
        self
    }

    /// Put a file on the repository's default branch (creating the repository
    /// on `main` if needed).
    pub fn with_file(self, repo: &RepoRef, path: &str, content: &str) -> Self {
        let branch = {
            let mut inner = self.state();
            inner.ensure_repo(repo).default_branch.clone()
        };
        self.with_file_on(repo, &branch, path, content)
    }

    /// Put a file on a branch, creating the branch from the default branch
    /// if needed. Each call is a new commit.
    pub fn with_file_on(self, repo: &RepoRef, branch: &str, path: &str, content: &str) -> Self {
        {
            let mut inner = self.state();
            let sha = inner.next_sha();
            let commit = inner.next_sha();
            let mock = inner.ensure_repo(repo);
            let base = mock.branches.get(&mock.default_branch).cloned().unwrap_or_default();
            let target = mock.branches.entry(branch.to_string()).or_insert(base);
            target.commit = commit;
            target.files.insert(
                path.to_string(),
                MockFile {
                    content: content.to_string(),
                    sha,
                },
            );
        }
        self
    }

    /// Add a branch copied from the default branch.
    pub fn with_branch(self, repo: &RepoRef, name: &str) -> Self {
        {
            let mut inner = self.state();
            let mock = inner.ensure_repo(repo);
            let base = mock.branches.get(&mock.default_branch).cloned().unwrap_or_default();
            mock.branches.entry(name.to_string()).or_insert(base);
        }
        self
    }

    /// Add an open pull request.
    pub fn with_pull(self, repo: &RepoRef, base: &str, head: &str) -> Self {
        {
            let mut inner = self.state();
            inner.next_pr_number += 1;
            let number = inner.next_pr_number;
            inner.ensure_repo(repo).pulls.push(PullRequest {
                number,
                url: format!("https://github.com/{repo}/pull/{number}"),
                head: head.to_string(),
                base: base.to_string(),
                title: "existing".to_string(),
            });
        }
        self
    }

    /// Configure the mock to fail on an operation, for every repository.
    pub fn fail_on(self, on: FailOn) -> Self {
        self.push_failure(None, on, false)
    }

    /// Configure the mock to fail on an operation targeting `repo`.
    pub fn fail_on_repo(self, repo: &RepoRef, on: FailOn) -> Self {
        self.push_failure(Some(repo.clone()), on, false)
    }

    /// Configure the mock to fail the next matching operation only.
    pub fn fail_once(self, on: FailOn) -> Self {
        self.push_failure(None, on, true)
    }

    fn push_failure(self, repo: Option<RepoRef>, on: FailOn, once: bool) -> Self {
        self.state().failures.push(Failure { repo, on, once });
        self
    }

    /// Clear the failure configuration.
    pub fn clear_fail_on(&self) {
        self.state().failures.clear();
    }

    /// Get all recorded operations.
    pub fn operations(&self) -> Vec<MockOperation> {
        self.state().operations.clone()
    }

    /// Clear recorded operations.
    pub fn clear_operations(&self) {
        self.state().operations.clear();
    }

    /// Content of a file on a branch (for test verification).
    pub fn file_content(&self, repo: &RepoRef, branch: &str, path: &str) -> Option<String> {
        let inner = self.state();
        let branch = inner.repos.get(repo)?.branches.get(branch)?;
        branch.files.get(path).map(|f| f.content.clone())
    }

    /// Whether a branch exists (for test verification).
    pub fn has_branch(&self, repo: &RepoRef, name: &str) -> bool {
        let inner = self.state();
        inner
            .repos
            .get(repo)
            .is_some_and(|r| r.branches.contains_key(name))
    }

    /// Open pull requests of a repository (for test verification).
    pub fn pulls(&self, repo: &RepoRef) -> Vec<PullRequest> {
        let inner = self.state();
        inner
            .repos
            .get(repo)
            .map(|r| r.pulls.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl FileFetcher for MockForge {
    async fn get_file(&self, file: &FileRef) -> Result<RemoteFile, ForgeError> {
        let mut inner = self.state();
        inner.enter(MockOperation::GetFile { file: file.clone() })?;

        let repo = inner.repo(&file.repo)?;
        let branch = repo
            .branches
            .get(repo.resolve_ref(&file.git_ref))
            .ok_or_else(|| ForgeError::NotFound(format!("No commit found for the ref {}", file.git_ref)))?;
        let stored = branch
            .files
            .get(&file.path)
            .ok_or_else(|| ForgeError::NotFound(format!("file {}", file.path)))?;

        Ok(RemoteFile {
            path: file.path.clone(),
            sha: stored.sha.clone(),
            content: stored.content.clone(),
            commit: None,
        })
    }
}

#[async_trait]
impl FileUpdater for MockForge {
    async fn update_file(&self, request: UpdateFileRequest) -> Result<RemoteFile, ForgeError> {
        let mut inner = self.state();
        inner.enter(MockOperation::UpdateFile {
            request: request.clone(),
        })?;

        let sha = inner.next_sha();
        let commit = inner.next_sha();
        let branch = inner
            .repo_mut(&request.repo)?
            .branches
            .get_mut(&request.branch)
            .ok_or_else(|| ForgeError::NotFound(format!("branch {}", request.branch)))?;

        match (branch.files.get(&request.path), request.sha.as_deref()) {
            (Some(existing), Some(given)) if existing.sha != given => {
                return Err(ForgeError::ApiError {
                    status: 409,
                    message: format!("{} does not match {}", request.path, given),
                });
            }
            (Some(_), None) => {
                return Err(ForgeError::ApiError {
                    status: 422,
                    message: "\"sha\" wasn't supplied.".to_string(),
                });
            }
            (None, Some(given)) => {
                return Err(ForgeError::ApiError {
                    status: 409,
                    message: format!("{} does not exist at {}", request.path, given),
                });
            }
            _ => {}
        }

        branch.commit = commit.clone();
        branch.files.insert(
            request.path.clone(),
            MockFile {
                content: request.content.clone(),
                sha: sha.clone(),
            },
        );

        Ok(RemoteFile {
            path: request.path,
            sha,
            content: request.content,
            commit: Some(commit),
        })
    }
}

#[async_trait]
impl Forge for MockForge {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn get_branch(&self, repo: &RepoRef, name: &str) -> Result<Branch, ForgeError> {
        let mut inner = self.state();
        inner.enter(MockOperation::GetBranch {
            repo: repo.clone(),
            name: name.to_string(),
        })?;

        let branch = inner.repo(repo)?.branch(name)?;
        Ok(Branch::existing(name, branch.commit.clone()))
    }

    async fn create_branch(
        &self,
        repo: &RepoRef,
        name: &str,
        from_sha: &str,
    ) -> Result<Branch, ForgeError> {
        let mut inner = self.state();
        inner.enter(MockOperation::CreateBranch {
            repo: repo.clone(),
            name: name.to_string(),
            from_sha: from_sha.to_string(),
        })?;

        let mock = inner.repo_mut(repo)?;
        if mock.branches.contains_key(name) {
            return Err(ForgeError::AlreadyExists("Reference already exists".into()));
        }

        let source = mock
            .branches
            .values()
            .find(|b| b.commit == from_sha)
            .cloned()
            .ok_or_else(|| ForgeError::ApiError {
                status: 422,
                message: "Object does not exist".into(),
            })?;
        mock.branches.insert(name.to_string(), source);

        Ok(Branch::created(name, from_sha))
    }

    async fn delete_branch(&self, repo: &RepoRef, name: &str) -> Result<(), ForgeError> {
        let mut inner = self.state();
        inner.enter(MockOperation::DeleteBranch {
            repo: repo.clone(),
            name: name.to_string(),
        })?;

        let mock = inner.repo_mut(repo)?;
        match mock.branches.remove(name) {
            Some(_) => {
                mock.pulls.retain(|p| p.head != name);
                Ok(())
            }
            None => Err(ForgeError::ApiError {
                status: 422,
                message: "Reference does not exist".into(),
            }),
        }
    }

    async fn default_branch(&self, repo: &RepoRef) -> Result<Branch, ForgeError> {
        let mut inner = self.state();
        inner.enter(MockOperation::DefaultBranch { repo: repo.clone() })?;

        let mock = inner.repo(repo)?;
        let branch = mock.branch(&mock.default_branch)?;
        Ok(Branch::existing(mock.default_branch.clone(), branch.commit.clone()))
    }

    async fn find_pull(
        &self,
        repo: &RepoRef,
        base: &str,
        head: &str,
    ) -> Result<Option<PullRequest>, ForgeError> {
        let mut inner = self.state();
        inner.enter(MockOperation::FindPull {
            repo: repo.clone(),
            base: base.to_string(),
            head: head.to_string(),
        })?;

        Ok(inner
            .repo(repo)?
            .pulls
            .iter()
            .find(|p| p.base == base && p.head == head)
            .cloned())
    }

    async fn create_pull(
        &self,
        repo: &RepoRef,
        request: CreatePullRequest,
    ) -> Result<PullRequest, ForgeError> {
        let mut inner = self.state();
        inner.enter(MockOperation::CreatePull {
            repo: repo.clone(),
            request: request.clone(),
        })?;

        inner.next_pr_number += 1;
        let number = inner.next_pr_number;
        let mock = inner.repo_mut(repo)?;

        if mock
            .pulls
            .iter()
            .any(|p| p.base == request.base && p.head == request.head)
        {
            return Err(ForgeError::AlreadyExists(format!(
                "A pull request already exists for {}:{}.",
                repo.owner, request.head
            )));
        }
        if !mock.branches.contains_key(&request.head) {
            return Err(ForgeError::ApiError {
                status: 422,
                message: format!("head branch {} does not exist", request.head),
            });
        }

        let pull = PullRequest {
            number,
            url: format!("https://github.com/{repo}/pull/{number}"),
            head: request.head,
            base: request.base,
            title: request.title,
        };
        mock.pulls.push(pull.clone());
        Ok(pull)
    }
}
