//! forge::github
//!
//! GitHub forge implementation over the REST API.
//!
//! # Endpoints
//!
//! | Operation | Endpoint |
//! | --- | --- |
//! | `get_file` | `GET /repos/{o}/{r}/contents/{path}?ref=` |
//! | `get_file` (over 1 MB) | `GET /repos/{o}/{r}/git/blobs/{sha}` |
//! | `update_file` | `PUT /repos/{o}/{r}/contents/{path}` |
//! | `get_branch` | `GET /repos/{o}/{r}/branches/{name}` |
//! | `create_branch` | `POST /repos/{o}/{r}/git/refs` |
//! | `delete_branch` | `DELETE /repos/{o}/{r}/git/refs/heads/{name}` |
//! | `default_branch` | `GET /repos/{o}/{r}`, then `get_branch` |
//! | `find_pull` | `GET /repos/{o}/{r}/pulls?state=open&head=&base=` |
//! | `create_pull` | `POST /repos/{o}/{r}/pulls` |
//!
//! # Rate Limiting
//!
//! Returns `ForgeError::RateLimited` when limits are hit. There is no
//! automatic retry.
//!
//! # Example
//!
//! ```ignore
//! use lnsync::forge::github::GitHubForge;
//! use lnsync::forge::FileFetcher;
//! use lnsync::core::types::{FileRef, RepoRef};
//!
//! let forge = GitHubForge::new(token);
//! let file = FileRef::new(RepoRef::new("octocat", "hello-world"), "README");
//! let remote = forge.get_file(&file).await?;
//! println!("{} ({})", remote.path, remote.sha);
//! ```

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::traits::{
    CreatePullRequest, FileFetcher, FileUpdater, Forge, ForgeError, PullRequest, RemoteFile,
    UpdateFileRequest,
};
use crate::core::types::{Branch, FileRef, RepoRef};

/// Default GitHub API base URL.
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

/// User-Agent header value for API requests.
const USER_AGENT_VALUE: &str = concat!("lnsync/", env!("CARGO_PKG_VERSION"));

/// GitHub forge implementation.
///
/// One instance serves every repository the token can reach.
pub struct GitHubForge {
    /// HTTP client for making requests
    client: Client,
    /// Bearer token
    token: String,
    /// API base URL (configurable for GitHub Enterprise)
    api_base: String,
}

// Custom Debug to avoid exposing the token
impl std::fmt::Debug for GitHubForge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubForge")
            .field("has_token", &!self.token.is_empty())
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl GitHubForge {
    /// Create a forge against api.github.com.
    pub fn new(token: impl Into<String>) -> Self {
        Self::with_api_base(token, DEFAULT_API_BASE)
    }

    /// Create a forge with a custom API base URL.
    ///
    /// Use this for GitHub Enterprise (`https://github.example.com/api/v3`)
    /// or a local test server.
    pub fn with_api_base(token: impl Into<String>, api_base: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            token: token.into(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
        }
    }

    /// Get the API base URL.
    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// Build common headers for API requests.
    fn headers(&self) -> Result<HeaderMap, ForgeError> {
        if self.token.is_empty() {
            return Err(ForgeError::AuthRequired);
        }

        let mut headers = HeaderMap::new();
        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.token))
            .map_err(|_| ForgeError::AuthFailed("token is not a valid header value".into()))?;
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static("2022-11-28"),
        );
        Ok(headers)
    }

    /// Build URL for a repository endpoint.
    ///
    /// Each segment is percent-encoded; a segment containing `/` (a file
    /// path) is split first.
    fn repo_url(&self, repo: &RepoRef, segments: &[&str]) -> Result<Url, ForgeError> {
        if !repo.is_complete() {
            return Err(ForgeError::NotFound(format!("incomplete repository '{repo}'")));
        }

        let mut url = Url::parse(&self.api_base).map_err(|e| ForgeError::ApiError {
            status: 0,
            message: format!("invalid API base '{}': {}", self.api_base, e),
        })?;

        url.path_segments_mut()
            .map_err(|_| ForgeError::ApiError {
                status: 0,
                message: format!("API base '{}' cannot be a base URL", self.api_base),
            })?
            .pop_if_empty()
            .extend(["repos", repo.owner.as_str(), repo.name.as_str()])
            .extend(
                segments
                    .iter()
                    .flat_map(|s| s.split('/'))
                    .filter(|s| !s.is_empty()),
            );

        Ok(url)
    }

    async fn execute(&self, request: RequestBuilder) -> Result<Response, ForgeError> {
        request
            .headers(self.headers()?)
            .send()
            .await
            .map_err(|e| ForgeError::NetworkError(e.to_string()))
    }

    /// Send a request and decode a JSON response.
    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ForgeError> {
        let response = self.execute(request).await?;
        self.handle_response(response).await
    }

    /// Handle API response, mapping errors appropriately.
    async fn handle_response<T: DeserializeOwned>(&self, response: Response) -> Result<T, ForgeError> {
        let status = response.status();

        if status.is_success() {
            response.json().await.map_err(|e| ForgeError::ApiError {
                status: status.as_u16(),
                message: format!("Failed to parse response: {}", e),
            })
        } else {
            Err(error_from_response(response).await)
        }
    }

    /// Same as [`send`](Self::send), with 422 meaning the resource exists.
    async fn send_create<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ForgeError> {
        self.send(request).await.map_err(|e| match e {
            ForgeError::ApiError { status: 422, message } => ForgeError::AlreadyExists(message),
            other => other,
        })
    }
}

/// Map a non-success response to a `ForgeError`.
async fn error_from_response(response: Response) -> ForgeError {
    let status = response.status();

    // Extract permission headers before consuming response body.
    let required_permissions = response
        .headers()
        .get("X-Accepted-GitHub-Permissions")
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string());

    let message = match response.json::<GitHubErrorResponse>().await {
        Ok(err) => err.into_message(),
        Err(_) => "Unknown error".to_string(),
    };

    error_from_status(status, message, required_permissions)
}

fn error_from_status(
    status: StatusCode,
    message: String,
    required_permissions: Option<String>,
) -> ForgeError {
    match status {
        StatusCode::UNAUTHORIZED => ForgeError::AuthFailed("Invalid or expired token".into()),
        StatusCode::FORBIDDEN if message.to_lowercase().contains("rate limit") => {
            ForgeError::RateLimited
        }
        StatusCode::FORBIDDEN => {
            let mut err_msg = format!("Permission denied: {}", message);
            if let Some(perms) = required_permissions {
                err_msg.push_str(&format!(" [required: {}]", perms));
            }
            ForgeError::AuthFailed(err_msg)
        }
        StatusCode::NOT_FOUND => ForgeError::NotFound(message),
        StatusCode::TOO_MANY_REQUESTS => ForgeError::RateLimited,
        _ if status.is_server_error() => ForgeError::ApiError {
            status: status.as_u16(),
            message: format!("GitHub server error: {}", message),
        },
        _ => ForgeError::ApiError {
            status: status.as_u16(),
            message,
        },
    }
}

/// Decode a contents API payload (base64 with embedded newlines).
fn decode_content(encoded: &str) -> Result<String, ForgeError> {
    let compact: String = encoded.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    let bytes = STANDARD.decode(compact).map_err(|e| ForgeError::ApiError {
        status: 200,
        message: format!("Failed to decode content: {}", e),
    })?;
    String::from_utf8(bytes).map_err(|_| ForgeError::ApiError {
        status: 200,
        message: "file content is not valid UTF-8".into(),
    })
}

#[async_trait]
impl FileFetcher for GitHubForge {
    async fn get_file(&self, file: &FileRef) -> Result<RemoteFile, ForgeError> {
        let url = self.repo_url(&file.repo, &["contents", &file.path])?;

        let mut request = self.client.get(url);
        if !file.git_ref.is_empty() {
            request = request.query(&[("ref", file.git_ref.as_str())]);
        }

        let content: GitHubContent = self.send(request).await?;
        if content.kind != "file" {
            return Err(ForgeError::ApiError {
                status: 200,
                message: format!("'{}' is a {}, not a file", content.path, content.kind),
            });
        }

        // Files over 1 MB come back without inline content.
        let encoded = match content.encoding.as_str() {
            "base64" => content.content,
            "none" => self.get_blob(&file.repo, &content.sha).await?,
            other => {
                return Err(ForgeError::ApiError {
                    status: 200,
                    message: format!("'{}' has unsupported encoding '{}'", content.path, other),
                })
            }
        };

        Ok(RemoteFile {
            content: decode_content(&encoded)?,
            path: content.path,
            sha: content.sha,
            commit: None,
        })
    }
}

impl GitHubForge {
    /// Read a blob's base64 payload by SHA.
    async fn get_blob(&self, repo: &RepoRef, sha: &str) -> Result<String, ForgeError> {
        let url = self.repo_url(repo, &["git", "blobs", sha])?;
        let blob: GitHubBlob = self.send(self.client.get(url)).await?;
        if blob.encoding != "base64" {
            return Err(ForgeError::ApiError {
                status: 200,
                message: format!("blob {} has unsupported encoding '{}'", sha, blob.encoding),
            });
        }
        Ok(blob.content)
    }
}

#[async_trait]
impl FileUpdater for GitHubForge {
    async fn update_file(&self, request: UpdateFileRequest) -> Result<RemoteFile, ForgeError> {
        let url = self.repo_url(&request.repo, &["contents", &request.path])?;

        let body = UpdateContentBody {
            message: &request.message,
            content: STANDARD.encode(request.content.as_bytes()),
            branch: &request.branch,
            sha: request.sha.as_deref(),
        };

        let written: GitHubContentWrite = self.send(self.client.put(url).json(&body)).await?;

        Ok(RemoteFile {
            path: written.content.path,
            sha: written.content.sha,
            content: request.content,
            commit: Some(written.commit.sha),
        })
    }
}

#[async_trait]
impl Forge for GitHubForge {
    fn name(&self) -> &'static str {
        "github"
    }

    async fn get_branch(&self, repo: &RepoRef, name: &str) -> Result<Branch, ForgeError> {
        let url = self.repo_url(repo, &["branches", name])?;
        let branch: GitHubBranch = self.send(self.client.get(url)).await?;
        Ok(Branch::existing(branch.name, branch.commit.sha))
    }

    async fn create_branch(
        &self,
        repo: &RepoRef,
        name: &str,
        from_sha: &str,
    ) -> Result<Branch, ForgeError> {
        let url = self.repo_url(repo, &["git", "refs"])?;
        let body = CreateRefBody {
            ref_name: format!("refs/heads/{}", name),
            sha: from_sha,
        };

        let created: GitHubGitRef = self.send_create(self.client.post(url).json(&body)).await?;
        Ok(Branch::created(name, created.object.sha))
    }

    async fn delete_branch(&self, repo: &RepoRef, name: &str) -> Result<(), ForgeError> {
        let url = self.repo_url(repo, &["git", "refs", "heads", name])?;
        let response = self.execute(self.client.delete(url)).await?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(error_from_response(response).await)
        }
    }

    async fn default_branch(&self, repo: &RepoRef) -> Result<Branch, ForgeError> {
        let url = self.repo_url(repo, &[])?;
        let info: GitHubRepository = self.send(self.client.get(url)).await?;
        self.get_branch(repo, &info.default_branch).await
    }

    async fn find_pull(
        &self,
        repo: &RepoRef,
        base: &str,
        head: &str,
    ) -> Result<Option<PullRequest>, ForgeError> {
        let url = self.repo_url(repo, &["pulls"])?;
        let head_param = format!("{}:{}", repo.owner, head);

        // GitHub allows one open PR per (head, base), so one page of one is enough.
        let request = self.client.get(url).query(&[
            ("state", "open"),
            ("head", head_param.as_str()),
            ("base", base),
            ("per_page", "1"),
        ]);

        let pulls: Vec<GitHubPullRequest> = self.send(request).await?;
        Ok(pulls.into_iter().next().map(Into::into))
    }

    async fn create_pull(
        &self,
        repo: &RepoRef,
        request: CreatePullRequest,
    ) -> Result<PullRequest, ForgeError> {
        let url = self.repo_url(repo, &["pulls"])?;
        let body = CreatePullBody {
            title: &request.title,
            head: &request.head,
            base: &request.base,
            body: &request.body,
        };

        let pull: GitHubPullRequest = self.send_create(self.client.post(url).json(&body)).await?;
        Ok(pull.into())
    }
}

// --------------------------------------------------------------------------
// API Request/Response Types
// --------------------------------------------------------------------------

/// Request body for creating or updating file contents.
#[derive(Serialize)]
struct UpdateContentBody<'a> {
    message: &'a str,
    content: String,
    branch: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
}

/// Request body for creating a git reference.
#[derive(Serialize)]
struct CreateRefBody<'a> {
    #[serde(rename = "ref")]
    ref_name: String,
    sha: &'a str,
}

/// Request body for creating a PR.
#[derive(Serialize)]
struct CreatePullBody<'a> {
    title: &'a str,
    head: &'a str,
    base: &'a str,
    body: &'a str,
}

/// GitHub error response format.
#[derive(Deserialize)]
struct GitHubErrorResponse {
    message: String,
    #[serde(default)]
    errors: Vec<GitHubErrorDetail>,
}

/// One entry of a validation error's `errors` list.
#[derive(Deserialize)]
struct GitHubErrorDetail {
    #[serde(default)]
    message: Option<String>,
}

impl GitHubErrorResponse {
    fn into_message(self) -> String {
        let details: Vec<String> = self.errors.into_iter().filter_map(|e| e.message).collect();
        if details.is_empty() {
            self.message
        } else {
            format!("{} ({})", self.message, details.join("; "))
        }
    }
}

/// GitHub contents response format (files only).
#[derive(Deserialize)]
struct GitHubContent {
    #[serde(rename = "type")]
    kind: String,
    path: String,
    sha: String,
    #[serde(default)]
    content: String,
    #[serde(default = "default_encoding")]
    encoding: String,
}

fn default_encoding() -> String {
    "base64".to_string()
}

/// GitHub git blob response.
#[derive(Deserialize)]
struct GitHubBlob {
    content: String,
    encoding: String,
}

/// GitHub contents write response.
#[derive(Deserialize)]
struct GitHubContentWrite {
    content: GitHubContentRef,
    commit: GitHubCommitRef,
}

/// File identity inside a contents write response.
#[derive(Deserialize)]
struct GitHubContentRef {
    path: String,
    sha: String,
}

/// A commit reference.
#[derive(Deserialize)]
struct GitHubCommitRef {
    sha: String,
}

/// GitHub branch response format.
#[derive(Deserialize)]
struct GitHubBranch {
    name: String,
    commit: GitHubCommitRef,
}

/// GitHub git ref response format.
#[derive(Deserialize)]
struct GitHubGitRef {
    object: GitHubCommitRef,
}

/// GitHub repository response (subset).
#[derive(Deserialize)]
struct GitHubRepository {
    default_branch: String,
}

/// GitHub PR response format.
#[derive(Deserialize)]
struct GitHubPullRequest {
    number: u64,
    html_url: String,
    head: GitHubRef,
    base: GitHubRef,
    title: String,
}

/// GitHub ref (head/base) format.
#[derive(Deserialize)]
struct GitHubRef {
    #[serde(rename = "ref")]
    ref_name: String,
}

impl From<GitHubPullRequest> for PullRequest {
    fn from(pr: GitHubPullRequest) -> Self {
        PullRequest {
            number: pr.number,
            url: pr.html_url,
            head: pr.head.ref_name,
            base: pr.base.ref_name,
            title: pr.title,
        }
    }
}
