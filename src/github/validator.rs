//! Token and repository access checks run before the modifier is initialised.

use serde::Serialize;

use super::{Contents, FileRef, HostingApi, Permissions, RepoInfo, parse_repo_url};
use crate::error::GitHubError;

#[derive(Debug, Clone, Serialize)]
pub struct RepoAccess {
    pub accessible: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Permissions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repo: Option<RepoAccess>,
}

impl ValidationReport {
    fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            user: None,
            error: Some(error.into()),
            repo: None,
        }
    }

    /// True when the token works and, if a repository was checked, it is reachable.
    pub fn ready(&self) -> bool {
        self.success && self.repo.as_ref().is_none_or(|r| r.accessible)
    }

    /// Multi-line summary for the chat transcript or terminal.
    pub fn render(&self) -> String {
        let mut out = String::new();
        if let Some(err) = &self.error {
            out.push_str(&format!("❌ {err}\n"));
            return out;
        }
        if let Some(user) = &self.user {
            out.push_str(&format!("✅ Token valid (user: {user})\n"));
        }
        if let Some(repo) = &self.repo {
            if repo.accessible {
                out.push_str(&format!(
                    "✅ Repository accessible: {}{}\n",
                    repo.full_name.as_deref().unwrap_or("?"),
                    if repo.private == Some(true) { " (private)" } else { "" },
                ));
                if let Some(p) = &repo.permissions {
                    out.push_str(&format!(
                        "   Permissions: admin={} push={} pull={}\n",
                        p.admin, p.push, p.pull
                    ));
                }
            } else {
                out.push_str(&format!(
                    "❌ {}\n",
                    repo.error.as_deref().unwrap_or("Repository not accessible")
                ));
            }
            for s in &repo.suggestions {
                out.push_str(&format!("   • {s}\n"));
            }
        }
        out
    }
}

/// Check the token (and optionally a repository). `api` is `None` when
/// `GITHUB_API_TOKEN` is not set.
pub async fn validate_setup(
    api: Option<&dyn HostingApi>,
    repo_url: Option<&str>,
) -> ValidationReport {
    let Some(api) = api else {
        return ValidationReport::failure("GITHUB_API_TOKEN not found in environment variables");
    };

    let user = match api.current_user().await {
        Ok(u) => u,
        Err(e) if e.status() == Some(401) => {
            return ValidationReport::failure(
                "Invalid GitHub token. Please check your GITHUB_API_TOKEN",
            );
        }
        Err(e) => return ValidationReport::failure(format!("GitHub API error: {e}")),
    };

    let repo = match repo_url {
        Some(url) => Some(validate_repository_access(api, url).await),
        None => None,
    };

    tracing::info!(user = %user.login, repo = ?repo_url, "Validated GitHub setup");
    ValidationReport {
        success: true,
        user: Some(user.login),
        error: None,
        repo,
    }
}

pub async fn validate_repository_access(api: &dyn HostingApi, repo_url: &str) -> RepoAccess {
    let denied = |error: String, suggestions: &[&str]| RepoAccess {
        accessible: false,
        full_name: None,
        url: None,
        private: None,
        permissions: None,
        error: Some(error),
        suggestions: suggestions.iter().map(|s| s.to_string()).collect(),
    };

    let repo_id = match parse_repo_url(repo_url) {
        Ok(id) => id,
        Err(e) => {
            return denied(
                e.to_string(),
                &["Use https://github.com/owner/repo or owner/repo"],
            );
        }
    };

    match api.get_repo(&repo_id).await {
        Ok(info) => RepoAccess {
            accessible: true,
            full_name: Some(info.full_name),
            url: Some(info.html_url),
            private: Some(info.private),
            permissions: info.permissions,
            error: None,
            suggestions: Vec::new(),
        },
        Err(e) if e.is_not_found() => denied(
            format!("Repository not found: {repo_url}"),
            &[
                "Check if the repository URL is correct",
                "Verify the repository exists",
                "Ensure your token has access to this repository",
            ],
        ),
        Err(e) if e.status() == Some(401) => denied(
            "Authentication failed for repository access".to_string(),
            &[
                "Check your GITHUB_API_TOKEN is valid",
                "Ensure the token has 'repo' scope for private repositories",
            ],
        ),
        Err(e) => denied(format!("Repository access error: {e}"), &[]),
    }
}

/// Repositories the token can access; empty on any error.
pub async fn list_accessible_repositories(api: &dyn HostingApi, limit: usize) -> Vec<RepoInfo> {
    match api.list_user_repos(limit).await {
        Ok(repos) => repos,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to list repositories");
            Vec::new()
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct OperationProbe {
    pub read_contents: bool,
    pub write_access: bool,
    pub create_branch: bool,
}

/// Probe which modifier operations the token can perform on a repository.
pub async fn probe_operations(
    api: &dyn HostingApi,
    repo: &RepoInfo,
) -> Result<OperationProbe, GitHubError> {
    let id = parse_repo_url(&repo.full_name)?;
    let mut probe = OperationProbe {
        read_contents: matches!(
            api.get_contents(&id, &FileRef::new("")).await,
            Ok(Contents::Dir(_))
        ),
        ..Default::default()
    };
    if repo.permissions.as_ref().is_some_and(|p| p.push) {
        probe.write_access = true;
        probe.create_branch = api.branch_head(&id, &repo.default_branch).await.is_ok();
    }
    Ok(probe)
}

pub fn recommendations(probe: &OperationProbe) -> Vec<&'static str> {
    let mut out = Vec::new();
    if !probe.read_contents {
        out.push("Token may not have read access to repository contents");
    }
    if !probe.write_access {
        out.push("Token does not have write access - can only read repository");
        out.push("For full functionality, ensure token has 'repo' scope");
    }
    if probe.write_access && !probe.create_branch {
        out.push("Branch creation may be restricted by repository settings");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::InMemoryRepo;

    #[tokio::test]
    async fn missing_token_fails_without_calls() {
        let report = validate_setup(None, Some("octo/hello")).await;
        assert!(!report.success);
        assert!(report.render().contains("GITHUB_API_TOKEN not found"));
    }

    #[tokio::test]
    async fn valid_token_and_repo() {
        let api = InMemoryRepo::new("octo", "hello");
        let report = validate_setup(Some(&api), Some("https://github.com/octo/hello")).await;
        assert!(report.ready());
        let rendered = report.render();
        assert!(rendered.contains("user: tester"));
        assert!(rendered.contains("octo/hello"));
        assert!(rendered.contains("push=true"));
    }

    #[tokio::test]
    async fn unknown_repo_has_suggestions() {
        let api = InMemoryRepo::new("octo", "hello");
        let report = validate_setup(Some(&api), Some("octo/missing")).await;
        assert!(report.success);
        assert!(!report.ready());
        let repo = report.repo.unwrap();
        assert!(repo.error.unwrap().contains("Repository not found"));
        assert_eq!(repo.suggestions.len(), 3);
    }

    #[tokio::test]
    async fn rejected_token_is_reported() {
        let api = InMemoryRepo::new("octo", "hello").with_invalid_token();
        let report = validate_setup(Some(&api), None).await;
        assert!(!report.success);
        assert!(report.error.unwrap().contains("Invalid GitHub token"));
    }

    #[tokio::test]
    async fn probe_with_write_access() {
        let api = InMemoryRepo::new("octo", "hello");
        let info = api.repo_info();
        let probe = probe_operations(&api, &info).await.unwrap();
        assert!(probe.read_contents && probe.write_access && probe.create_branch);
        assert!(recommendations(&probe).is_empty());
    }

    #[test]
    fn read_only_recommendations() {
        let probe = OperationProbe {
            read_contents: true,
            ..Default::default()
        };
        let recs = recommendations(&probe);
        assert_eq!(recs.len(), 2);
        assert!(recs[0].contains("write access"));
    }
}
