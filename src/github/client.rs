use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::{Method, Url};
use serde::Deserialize;
use serde_json::json;

use super::{
    BranchRef, CodeSearchHit, CommitResult, CommitSummary, ContentEntry, Contents, EntryKind,
    FileContent, FileRef, HostingApi, Permissions, RepoId, RepoInfo, UserInfo,
};
use crate::error::GitHubError;

const API_BASE: &str = "https://api.github.com/";

/// GitHub REST client authenticated with a personal access token.
pub struct GitHubClient {
    http: reqwest::Client,
    base: Url,
    token: String,
}

// -- Wire types --------------------------------------------------------------

#[derive(Deserialize)]
struct RawRepo {
    name: String,
    full_name: String,
    html_url: String,
    #[serde(default)]
    private: bool,
    #[serde(default)]
    default_branch: Option<String>,
    description: Option<String>,
    permissions: Option<RawPermissions>,
}

#[derive(Deserialize)]
struct RawPermissions {
    #[serde(default)]
    admin: bool,
    #[serde(default)]
    push: bool,
    #[serde(default)]
    pull: bool,
}

#[derive(Deserialize)]
struct RawContent {
    name: String,
    path: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    size: u64,
    sha: String,
    html_url: Option<String>,
    content: Option<String>,
    encoding: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawContents {
    Dir(Vec<RawContent>),
    File(RawContent),
}

#[derive(Deserialize)]
struct RawCommitResponse {
    commit: RawSha,
    content: Option<RawContentPath>,
}

#[derive(Deserialize)]
struct RawSha {
    sha: String,
}

#[derive(Deserialize)]
struct RawContentPath {
    path: String,
}

#[derive(Deserialize)]
struct RawSearch {
    items: Vec<RawSearchItem>,
}

#[derive(Deserialize)]
struct RawSearchItem {
    name: String,
    path: String,
    html_url: String,
    #[serde(default)]
    score: f64,
}

#[derive(Deserialize)]
struct RawCommit {
    sha: String,
    commit: RawCommitDetail,
}

#[derive(Deserialize)]
struct RawCommitDetail {
    message: String,
    author: Option<RawAuthor>,
}

#[derive(Deserialize)]
struct RawAuthor {
    name: String,
    date: String,
}

#[derive(Deserialize)]
struct RawBranch {
    commit: RawSha,
}

#[derive(Deserialize)]
struct RawRef {
    url: String,
}

impl From<RawRepo> for RepoInfo {
    fn from(r: RawRepo) -> Self {
        RepoInfo {
            name: r.name,
            full_name: r.full_name,
            html_url: r.html_url,
            private: r.private,
            default_branch: r.default_branch.unwrap_or_else(|| "main".to_string()),
            description: r.description,
            permissions: r.permissions.map(|p| Permissions {
                admin: p.admin,
                push: p.push,
                pull: p.pull,
            }),
        }
    }
}

impl From<RawContent> for ContentEntry {
    fn from(c: RawContent) -> Self {
        let kind = match c.kind.as_str() {
            "file" => EntryKind::File,
            "dir" => EntryKind::Dir,
            _ => EntryKind::Other,
        };
        ContentEntry {
            name: c.name,
            path: c.path,
            kind,
            size: (kind == EntryKind::File).then_some(c.size),
            sha: c.sha,
            url: c.html_url,
        }
    }
}

fn decode_file(c: RawContent) -> Result<FileContent, GitHubError> {
    let raw = c.content.unwrap_or_default();
    let content = if c.encoding.as_deref() == Some("base64") {
        // GitHub wraps base64 at 60 columns.
        let compact: String = raw.chars().filter(|ch| !ch.is_whitespace()).collect();
        let bytes = BASE64
            .decode(compact)
            .map_err(|e| GitHubError::Decode(format!("{}: invalid base64: {e}", c.path)))?;
        String::from_utf8(bytes)
            .map_err(|_| GitHubError::Decode(format!("{} is not a UTF-8 text file", c.path)))?
    } else {
        raw
    };
    Ok(FileContent {
        name: c.name,
        path: c.path,
        content,
        size: c.size,
        sha: c.sha,
        url: c.html_url,
    })
}

// -- Client --------------------------------------------------------------------

impl GitHubClient {
    pub fn new(token: &str) -> Result<Self, GitHubError> {
        if token.trim().is_empty() {
            return Err(GitHubError::MissingToken);
        }
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("ask-llama/", env!("CARGO_PKG_VERSION")))
            .build()?;
        let base = Url::parse(API_BASE).map_err(|e| GitHubError::InvalidUrl(e.to_string()))?;
        Ok(Self {
            http,
            base,
            token: token.trim().to_string(),
        })
    }

    /// Build an API URL from path segments; each segment is percent-encoded.
    fn url<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> Result<Url, GitHubError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| GitHubError::InvalidUrl(self.base.to_string()))?
            .pop_if_empty()
            .extend(segments.into_iter().filter(|s| !s.is_empty()));
        Ok(url)
    }

    fn contents_url(&self, repo: &RepoId, path: &str) -> Result<Url, GitHubError> {
        let base = ["repos", repo.owner.as_str(), repo.name.as_str(), "contents"];
        self.url(base.into_iter().chain(path.split('/')))
    }

    async fn send<T: serde::de::DeserializeOwned>(
        &self,
        method: Method,
        url: Url,
        body: Option<serde_json::Value>,
    ) -> Result<T, GitHubError> {
        tracing::debug!(%method, %url, "GitHub request");
        let mut req = self
            .http
            .request(method, url)
            .bearer_auth(&self.token)
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28");
        if let Some(body) = body {
            req = req.json(&body);
        }

        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            let message = serde_json::from_str::<serde_json::Value>(&text)
                .ok()
                .and_then(|v| v["message"].as_str().map(str::to_string))
                .unwrap_or(text);
            return Err(GitHubError::Api {
                status: status.as_u16(),
                message,
            });
        }
        resp.json::<T>()
            .await
            .map_err(|e| GitHubError::Decode(e.to_string()))
    }
}

#[async_trait]
impl HostingApi for GitHubClient {
    async fn current_user(&self) -> Result<UserInfo, GitHubError> {
        #[derive(Deserialize)]
        struct RawUser {
            login: String,
        }
        let user: RawUser = self.send(Method::GET, self.url(["user"])?, None).await?;
        Ok(UserInfo { login: user.login })
    }

    async fn get_repo(&self, repo: &RepoId) -> Result<RepoInfo, GitHubError> {
        let url = self.url(["repos", repo.owner.as_str(), repo.name.as_str()])?;
        let raw: RawRepo = self.send(Method::GET, url, None).await?;
        Ok(raw.into())
    }

    async fn list_user_repos(&self, limit: usize) -> Result<Vec<RepoInfo>, GitHubError> {
        let mut url = self.url(["user", "repos"])?;
        url.query_pairs_mut()
            .append_pair("per_page", &limit.clamp(1, 100).to_string())
            .append_pair("sort", "updated");
        let raw: Vec<RawRepo> = self.send(Method::GET, url, None).await?;
        Ok(raw.into_iter().take(limit).map(RepoInfo::from).collect())
    }

    async fn get_contents(&self, repo: &RepoId, file: &FileRef) -> Result<Contents, GitHubError> {
        let mut url = self.contents_url(repo, &file.path)?;
        if let Some(branch) = &file.branch {
            url.query_pairs_mut().append_pair("ref", branch);
        }
        match self.send::<RawContents>(Method::GET, url, None).await? {
            RawContents::Dir(items) => Ok(Contents::Dir(
                items.into_iter().map(ContentEntry::from).collect(),
            )),
            RawContents::File(item) if item.kind == "dir" => Ok(Contents::Dir(Vec::new())),
            RawContents::File(item) => Ok(Contents::File(decode_file(item)?)),
        }
    }

    async fn put_file(
        &self,
        repo: &RepoId,
        file: &FileRef,
        content: &str,
        message: &str,
        sha: Option<&str>,
    ) -> Result<CommitResult, GitHubError> {
        let mut body = json!({
            "message": message,
            "content": BASE64.encode(content.as_bytes()),
        });
        if let Some(sha) = sha {
            body["sha"] = json!(sha);
        }
        if let Some(branch) = &file.branch {
            body["branch"] = json!(branch);
        }
        let url = self.contents_url(repo, &file.path)?;
        let resp: RawCommitResponse = self.send(Method::PUT, url, Some(body)).await?;
        Ok(CommitResult {
            commit: resp.commit.sha,
            path: resp
                .content
                .map(|c| c.path)
                .unwrap_or_else(|| file.path.clone()),
        })
    }

    async fn delete_file(
        &self,
        repo: &RepoId,
        file: &FileRef,
        message: &str,
        sha: &str,
    ) -> Result<CommitResult, GitHubError> {
        let mut body = json!({ "message": message, "sha": sha });
        if let Some(branch) = &file.branch {
            body["branch"] = json!(branch);
        }
        let url = self.contents_url(repo, &file.path)?;
        let resp: RawCommitResponse = self.send(Method::DELETE, url, Some(body)).await?;
        Ok(CommitResult {
            commit: resp.commit.sha,
            path: file.path.clone(),
        })
    }

    async fn search_code(
        &self,
        repo: &RepoId,
        query: &str,
    ) -> Result<Vec<CodeSearchHit>, GitHubError> {
        let mut url = self.url(["search", "code"])?;
        url.query_pairs_mut()
            .append_pair("q", &format!("{query} repo:{}", repo.full_name()));
        let raw: RawSearch = self.send(Method::GET, url, None).await?;
        Ok(raw
            .items
            .into_iter()
            .map(|i| CodeSearchHit {
                name: i.name,
                path: i.path,
                url: i.html_url,
                score: i.score,
            })
            .collect())
    }

    async fn list_commits(
        &self,
        repo: &RepoId,
        path: &str,
        limit: usize,
    ) -> Result<Vec<CommitSummary>, GitHubError> {
        let mut url = self.url(["repos", repo.owner.as_str(), repo.name.as_str(), "commits"])?;
        url.query_pairs_mut()
            .append_pair("path", path)
            .append_pair("per_page", &limit.clamp(1, 100).to_string());
        let raw: Vec<RawCommit> = self.send(Method::GET, url, None).await?;
        Ok(raw
            .into_iter()
            .map(|c| {
                let (author, date) = c
                    .commit
                    .author
                    .map(|a| (a.name, a.date))
                    .unwrap_or_default();
                CommitSummary {
                    sha: c.sha,
                    message: c.commit.message,
                    author,
                    date,
                }
            })
            .collect())
    }

    async fn branch_head(&self, repo: &RepoId, branch: &str) -> Result<String, GitHubError> {
        let url = self.url(["repos", repo.owner.as_str(), repo.name.as_str(), "branches", branch])?;
        let raw: RawBranch = self.send(Method::GET, url, None).await?;
        Ok(raw.commit.sha)
    }

    async fn create_branch(
        &self,
        repo: &RepoId,
        branch_name: &str,
        sha: &str,
    ) -> Result<BranchRef, GitHubError> {
        let url = self.url(["repos", repo.owner.as_str(), repo.name.as_str(), "git", "refs"])?;
        let body = json!({ "ref": format!("refs/heads/{branch_name}"), "sha": sha });
        let raw: RawRef = self.send(Method::POST, url, Some(body)).await?;
        Ok(BranchRef {
            branch_name: branch_name.to_string(),
            sha: sha.to_string(),
            url: raw.url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> GitHubClient {
        GitHubClient::new("ghp_test").unwrap()
    }

    #[test]
    fn empty_token_is_rejected() {
        assert!(matches!(
            GitHubClient::new("  "),
            Err(GitHubError::MissingToken)
        ));
    }

    #[test]
    fn contents_url_encodes_each_segment() {
        let repo = RepoId {
            owner: "octo".into(),
            name: "hello".into(),
        };
        let url = client().contents_url(&repo, "docs/my file.md").unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.github.com/repos/octo/hello/contents/docs/my%20file.md"
        );
        let root = client().contents_url(&repo, "").unwrap();
        assert_eq!(root.as_str(), "https://api.github.com/repos/octo/hello/contents");
    }

    #[test]
    fn decodes_wrapped_base64_file() {
        let raw: RawContent = serde_json::from_value(json!({
            "name": "README.md",
            "path": "README.md",
            "type": "file",
            "size": 11,
            "sha": "abc",
            "html_url": "https://github.com/octo/hello/blob/main/README.md",
            "content": "aGVsbG8g\nd29ybGQ=\n",
            "encoding": "base64"
        }))
        .unwrap();
        let file = decode_file(raw).unwrap();
        assert_eq!(file.content, "hello world");
        assert_eq!(file.sha, "abc");
    }

    #[test]
    fn directory_listing_deserializes() {
        let raw: RawContents = serde_json::from_value(json!([
            {"name": "src", "path": "src", "type": "dir", "size": 0, "sha": "1", "html_url": null},
            {"name": "a.py", "path": "a.py", "type": "file", "size": 5, "sha": "2", "html_url": null}
        ]))
        .unwrap();
        let RawContents::Dir(items) = raw else {
            panic!("expected directory");
        };
        let entries: Vec<ContentEntry> = items.into_iter().map(ContentEntry::from).collect();
        assert_eq!(entries[0].kind, EntryKind::Dir);
        assert_eq!(entries[0].size, None);
        assert_eq!(entries[1].size, Some(5));
    }

    #[test]
    fn repo_without_default_branch_falls_back_to_main() {
        let raw: RawRepo = serde_json::from_value(json!({
            "name": "hello",
            "full_name": "octo/hello",
            "html_url": "https://github.com/octo/hello",
            "description": null,
            "permissions": {"admin": false, "push": true, "pull": true}
        }))
        .unwrap();
        let info = RepoInfo::from(raw);
        assert_eq!(info.default_branch, "main");
        assert!(info.permissions.unwrap().push);
    }
}
