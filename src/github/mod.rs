//! GitHub REST API access.
//!
//! [`HostingApi`] is the seam between the repository modifier/validator and
//! the network. [`client::GitHubClient`] implements it over `reqwest`; tests
//! use an in-memory implementation.

pub mod client;
pub mod url;
pub mod validator;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::GitHubError;

pub use client::GitHubClient;
pub use url::{RepoId, parse_repo_url, repo_name_from_url};

/// A file in a remote repository, optionally pinned to a branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRef {
    pub path: String,
    pub branch: Option<String>,
}

impl FileRef {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            branch: None,
        }
    }

    pub fn on_branch(mut self, branch: Option<String>) -> Self {
        self.branch = branch;
        self
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Permissions {
    pub admin: bool,
    pub push: bool,
    pub pull: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct RepoInfo {
    pub name: String,
    pub full_name: String,
    pub html_url: String,
    pub private: bool,
    pub default_branch: String,
    pub description: Option<String>,
    pub permissions: Option<Permissions>,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Dir,
    Other,
}

#[derive(Debug, Clone, Serialize)]
pub struct ContentEntry {
    pub name: String,
    pub path: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(skip)]
    pub sha: String,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileContent {
    pub name: String,
    pub path: String,
    pub content: String,
    pub size: u64,
    pub sha: String,
    pub url: Option<String>,
}

/// What the contents endpoint returned for a path.
#[derive(Debug, Clone)]
pub enum Contents {
    File(FileContent),
    Dir(Vec<ContentEntry>),
}

#[derive(Debug, Clone, Serialize)]
pub struct CommitResult {
    pub commit: String,
    pub path: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CodeSearchHit {
    pub name: String,
    pub path: String,
    pub url: String,
    pub score: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommitSummary {
    pub sha: String,
    pub message: String,
    pub author: String,
    pub date: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct BranchRef {
    pub branch_name: String,
    pub sha: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserInfo {
    pub login: String,
}

#[async_trait]
pub trait HostingApi: Send + Sync {
    async fn current_user(&self) -> Result<UserInfo, GitHubError>;

    async fn get_repo(&self, repo: &RepoId) -> Result<RepoInfo, GitHubError>;

    /// Repositories visible to the token, most recently updated first.
    async fn list_user_repos(&self, limit: usize) -> Result<Vec<RepoInfo>, GitHubError>;

    /// File or directory at `file.path`; an empty path is the repository root.
    async fn get_contents(&self, repo: &RepoId, file: &FileRef) -> Result<Contents, GitHubError>;

    /// Create (`sha == None`) or update a file with a single commit.
    async fn put_file(
        &self,
        repo: &RepoId,
        file: &FileRef,
        content: &str,
        message: &str,
        sha: Option<&str>,
    ) -> Result<CommitResult, GitHubError>;

    async fn delete_file(
        &self,
        repo: &RepoId,
        file: &FileRef,
        message: &str,
        sha: &str,
    ) -> Result<CommitResult, GitHubError>;

    async fn search_code(&self, repo: &RepoId, query: &str)
    -> Result<Vec<CodeSearchHit>, GitHubError>;

    async fn list_commits(
        &self,
        repo: &RepoId,
        path: &str,
        limit: usize,
    ) -> Result<Vec<CommitSummary>, GitHubError>;

    /// Head commit SHA of `branch`.
    async fn branch_head(&self, repo: &RepoId, branch: &str) -> Result<String, GitHubError>;

    async fn create_branch(
        &self,
        repo: &RepoId,
        branch_name: &str,
        sha: &str,
    ) -> Result<BranchRef, GitHubError>;
}
