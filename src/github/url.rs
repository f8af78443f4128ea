use crate::error::GitHubError;

/// `owner/name` of a GitHub repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoId {
    pub owner: String,
    pub name: String,
}

impl RepoId {
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

impl std::fmt::Display for RepoId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Parse `https://github.com/owner/repo(.git)`, `git@github.com:owner/repo.git`
/// or a bare `owner/repo`.
pub fn parse_repo_url(input: &str) -> Result<RepoId, GitHubError> {
    let trimmed = input.trim().trim_end_matches('/');
    let invalid = || GitHubError::InvalidUrl(input.trim().to_string());

    let path = if let Some(idx) = trimmed.find("github.com") {
        let rest = &trimmed[idx + "github.com".len()..];
        rest.strip_prefix('/')
            .or_else(|| rest.strip_prefix(':'))
            .ok_or_else(invalid)?
    } else if trimmed.contains("://") || trimmed.starts_with("git@") {
        return Err(invalid());
    } else {
        trimmed
    };

    let mut parts = path.split('/').filter(|p| !p.is_empty());
    let owner = parts.next().ok_or_else(invalid)?;
    let name = parts.next().ok_or_else(invalid)?;
    let name = name.strip_suffix(".git").unwrap_or(name);

    // A bare "owner/repo" must not carry extra segments.
    if !trimmed.contains("github.com") && parts.next().is_some() {
        return Err(invalid());
    }
    if owner.is_empty() || name.is_empty() || !is_valid_segment(owner) || !is_valid_segment(name)
    {
        return Err(invalid());
    }

    Ok(RepoId {
        owner: owner.to_string(),
        name: name.to_string(),
    })
}

fn is_valid_segment(s: &str) -> bool {
    s.chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

/// Last path segment of a clone URL without `.git`, used as a store name.
pub fn repo_name_from_url(url: &str) -> Option<String> {
    let last = url.trim().trim_end_matches('/').rsplit('/').next()?;
    let name = last.strip_suffix(".git").unwrap_or(last);
    let name = name.rsplit(':').next().unwrap_or(name);
    if name.is_empty() || !is_valid_segment(name) || name == "." || name == ".." {
        None
    } else {
        Some(name.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(owner: &str, name: &str) -> RepoId {
        RepoId {
            owner: owner.into(),
            name: name.into(),
        }
    }

    #[test]
    fn parses_https_url() {
        assert_eq!(
            parse_repo_url("https://github.com/octo/hello").unwrap(),
            id("octo", "hello")
        );
    }

    #[test]
    fn strips_git_suffix_and_trailing_slash() {
        assert_eq!(
            parse_repo_url("https://github.com/octo/hello.git").unwrap(),
            id("octo", "hello")
        );
        assert_eq!(
            parse_repo_url("https://github.com/octo/hello/").unwrap(),
            id("octo", "hello")
        );
    }

    #[test]
    fn parses_tree_urls_by_first_two_segments() {
        assert_eq!(
            parse_repo_url("https://github.com/octo/hello/tree/main/src").unwrap(),
            id("octo", "hello")
        );
    }

    #[test]
    fn parses_ssh_and_bare_forms() {
        assert_eq!(
            parse_repo_url("git@github.com:octo/hello.git").unwrap(),
            id("octo", "hello")
        );
        assert_eq!(parse_repo_url("octo/hello").unwrap(), id("octo", "hello"));
    }

    #[test]
    fn rejects_other_hosts_and_garbage() {
        assert!(parse_repo_url("https://gitlab.com/octo/hello").is_err());
        assert!(parse_repo_url("hello").is_err());
        assert!(parse_repo_url("https://github.com/octo").is_err());
        assert!(parse_repo_url("a/b/c").is_err());
        assert!(parse_repo_url("octo/hel lo").is_err());
    }

    #[test]
    fn repo_name_for_store_directory() {
        assert_eq!(
            repo_name_from_url("https://github.com/octo/hello.git").as_deref(),
            Some("hello")
        );
        assert_eq!(
            repo_name_from_url("git@github.com:octo/hello.git").as_deref(),
            Some("hello")
        );
        assert_eq!(repo_name_from_url("https://github.com/octo/..").as_deref(), None);
    }
}
