//! Repository operations behind the modifier's tools.
//!
//! Every operation maps onto one or two hosting API calls. There is no local
//! clone: reads and writes go straight through [`HostingApi`].

use std::sync::Arc;

use crate::error::{GitHubError, ModifierError};
use crate::github::{
    BranchRef, CodeSearchHit, CommitResult, CommitSummary, ContentEntry, Contents, EntryKind,
    FileContent, FileRef, HostingApi, RepoId, RepoInfo, parse_repo_url,
};

pub const DEFAULT_EDIT_MESSAGE: &str = "Update file via GitHub Code Modifier Agent";
pub const DEFAULT_CREATE_MESSAGE: &str = "Create file via GitHub Code Modifier Agent";
pub const DEFAULT_DELETE_MESSAGE: &str = "Delete file via GitHub Code Modifier Agent";

const MAX_SUGGESTIONS: usize = 5;
const HISTORY_LIMIT: usize = 20;
/// Upper bound on files visited by recursive listing.
const MAX_WALK_FILES: usize = 5000;

/// Names the model tends to pass as paths that are never repository files.
const BOGUS_PATHS: [&str; 4] = ["docs.github", "github.com", "github", "docs"];

/// Strip whitespace and stray quotes from a model-supplied path.
pub fn clean_path(raw: &str) -> String {
    raw.trim()
        .replace(['\'', '"'], "")
        .trim()
        .trim_start_matches("./")
        .trim_matches('/')
        .to_string()
}

/// [`clean_path`] plus rejection of empty and obviously-invalid file paths.
pub fn normalize_file_path(raw: &str) -> Result<String, ModifierError> {
    let path = clean_path(raw);
    if path.is_empty() {
        return Err(ModifierError::EmptyPath);
    }
    if BOGUS_PATHS.contains(&path.to_lowercase().as_str()) {
        return Err(ModifierError::InvalidPath(path));
    }
    Ok(path)
}

fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

fn api_error(e: GitHubError) -> ModifierError {
    if e.status() == Some(401) {
        ModifierError::AuthenticationFailed
    } else {
        ModifierError::Api(e)
    }
}

pub struct RepoModifier {
    api: Arc<dyn HostingApi>,
    repo: RepoId,
    info: RepoInfo,
}

impl RepoModifier {
    /// Resolve `repo_url` and check the repository is reachable.
    pub async fn connect(api: Arc<dyn HostingApi>, repo_url: &str) -> Result<Self, ModifierError> {
        let repo = parse_repo_url(repo_url)?;
        let info = match api.get_repo(&repo).await {
            Ok(info) => info,
            Err(e) if e.is_not_found() => {
                return Err(ModifierError::RepositoryNotFound(repo.full_name()));
            }
            Err(e) => return Err(api_error(e)),
        };
        tracing::info!(repo = %repo, default_branch = %info.default_branch, "Modifier connected");
        Ok(Self { api, repo, info })
    }

    pub fn repo(&self) -> &RepoId {
        &self.repo
    }

    pub fn info(&self) -> &RepoInfo {
        &self.info
    }

    fn file_ref(&self, path: &str, branch: Option<&str>) -> FileRef {
        FileRef::new(path).on_branch(branch.map(str::to_string))
    }

    pub async fn list_files(
        &self,
        path: &str,
        branch: Option<&str>,
    ) -> Result<Vec<ContentEntry>, ModifierError> {
        let path = clean_path(path);
        match self.api.get_contents(&self.repo, &self.file_ref(&path, branch)).await {
            Ok(Contents::Dir(entries)) => Ok(entries),
            Ok(Contents::File(file)) => Ok(vec![ContentEntry {
                name: file.name,
                path: file.path,
                kind: EntryKind::File,
                size: Some(file.size),
                sha: file.sha,
                url: file.url,
            }]),
            Err(e) if e.is_not_found() => Err(ModifierError::DirectoryNotFound(path)),
            Err(e) => Err(api_error(e)),
        }
    }

    /// Read a file, resolving the path case-insensitively when the exact
    /// path does not exist.
    pub async fn read_file(
        &self,
        path: &str,
        branch: Option<&str>,
    ) -> Result<FileContent, ModifierError> {
        let path = normalize_file_path(path)?;
        match self.fetch_file(&path, branch).await? {
            Some(file) => Ok(file),
            None => {
                let resolved = self.resolve_path(&path).await?;
                tracing::info!(
                    requested = %path,
                    resolved = %resolved,
                    "Resolved path case-insensitively"
                );
                self.fetch_file(&resolved, branch)
                    .await?
                    .ok_or(ModifierError::NotFound(path))
            }
        }
    }

    /// `Ok(None)` when nothing exists at `path`.
    async fn fetch_file(
        &self,
        path: &str,
        branch: Option<&str>,
    ) -> Result<Option<FileContent>, ModifierError> {
        match self.api.get_contents(&self.repo, &self.file_ref(path, branch)).await {
            Ok(Contents::File(file)) => Ok(Some(file)),
            Ok(Contents::Dir(_)) => Err(ModifierError::IsDirectory(path.to_string())),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(api_error(e)),
        }
    }

    /// Find the real path for `path` ignoring case: a full-path or basename
    /// match wins; partial basename matches become suggestions.
    async fn resolve_path(&self, path: &str) -> Result<String, ModifierError> {
        let files = self.all_files().await?;
        let wanted = path.to_lowercase();
        let wanted_base = basename(&wanted).to_string();

        if let Some(hit) = files.iter().find(|f| {
            f.path.to_lowercase() == wanted || basename(&f.path).to_lowercase() == wanted_base
        }) {
            return Ok(hit.path.clone());
        }

        let partial: Vec<&str> = files
            .iter()
            .filter(|f| basename(&f.path).to_lowercase().contains(&wanted_base))
            .map(|f| f.path.as_str())
            .take(MAX_SUGGESTIONS)
            .collect();
        if partial.is_empty() {
            Err(ModifierError::NotFound(path.to_string()))
        } else {
            Err(ModifierError::DidYouMean {
                path: path.to_string(),
                suggestions: partial.join(", "),
            })
        }
    }

    /// Every file in the repository, sorted by path.
    async fn all_files(&self) -> Result<Vec<ContentEntry>, ModifierError> {
        let mut files = Vec::new();
        let mut pending = vec![String::new()];
        while let Some(dir) = pending.pop() {
            let listing = self
                .api
                .get_contents(&self.repo, &FileRef::new(dir.as_str()))
                .await;
            let entries = match listing {
                Ok(Contents::Dir(entries)) => entries,
                Ok(Contents::File(_)) => continue,
                Err(e) if e.is_not_found() => continue,
                Err(e) => return Err(api_error(e)),
            };
            for entry in entries {
                match entry.kind {
                    EntryKind::File => files.push(entry),
                    EntryKind::Dir => pending.push(entry.path),
                    EntryKind::Other => {}
                }
            }
            if files.len() >= MAX_WALK_FILES {
                tracing::warn!(limit = MAX_WALK_FILES, "Stopped walking repository at file limit");
                break;
            }
        }
        files.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(files)
    }

    /// Replace the contents of an existing file.
    pub async fn edit_file(
        &self,
        path: &str,
        content: &str,
        message: Option<&str>,
        branch: Option<&str>,
    ) -> Result<CommitResult, ModifierError> {
        let path = normalize_file_path(path)?;
        let current = self
            .fetch_file(&path, branch)
            .await?
            .ok_or_else(|| ModifierError::NotFound(path.clone()))?;
        let message = message.unwrap_or(DEFAULT_EDIT_MESSAGE);

        let result = self
            .api
            .put_file(
                &self.repo,
                &self.file_ref(&path, branch),
                content,
                message,
                Some(&current.sha),
            )
            .await
            .map_err(api_error)?;
        tracing::info!(path = %path, commit = %result.commit, "Edited file");
        Ok(result)
    }

    /// Create a new file; refuses to overwrite.
    pub async fn create_file(
        &self,
        path: &str,
        content: &str,
        message: Option<&str>,
        branch: Option<&str>,
    ) -> Result<CommitResult, ModifierError> {
        let path = normalize_file_path(path)?;
        match self.api.get_contents(&self.repo, &self.file_ref(&path, branch)).await {
            Ok(Contents::File(_)) => return Err(ModifierError::AlreadyExists(path)),
            Ok(Contents::Dir(_)) => return Err(ModifierError::IsDirectory(path)),
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(api_error(e)),
        }
        let message = message.unwrap_or(DEFAULT_CREATE_MESSAGE);

        match self
            .api
            .put_file(&self.repo, &self.file_ref(&path, branch), content, message, None)
            .await
        {
            Ok(result) => {
                tracing::info!(path = %path, commit = %result.commit, "Created file");
                Ok(result)
            }
            // A concurrent create surfaces as "sha wasn't supplied".
            Err(e) if e.status() == Some(422) && e.to_string().contains("sha") => {
                Err(ModifierError::AlreadyExists(path))
            }
            Err(e) => Err(api_error(e)),
        }
    }

    pub async fn delete_file(
        &self,
        path: &str,
        message: Option<&str>,
        branch: Option<&str>,
    ) -> Result<CommitResult, ModifierError> {
        let path = normalize_file_path(path)?;
        let current = self
            .fetch_file(&path, branch)
            .await?
            .ok_or_else(|| ModifierError::NotFound(path.clone()))?;
        let message = message.unwrap_or(DEFAULT_DELETE_MESSAGE);

        let result = self
            .api
            .delete_file(&self.repo, &self.file_ref(&path, branch), message, &current.sha)
            .await
            .map_err(api_error)?;
        tracing::info!(path = %path, commit = %result.commit, "Deleted file");
        Ok(result)
    }

    /// Code search by content or file name.
    pub async fn search_files(&self, query: &str) -> Result<Vec<CodeSearchHit>, ModifierError> {
        self.api
            .search_code(&self.repo, query.trim())
            .await
            .map_err(api_error)
    }

    /// Files whose basename contains `name` (or is contained in it), ignoring case.
    pub async fn find_file(&self, name: &str) -> Result<Vec<ContentEntry>, ModifierError> {
        let wanted = clean_path(name).to_lowercase();
        if wanted.is_empty() {
            return Err(ModifierError::EmptyPath);
        }
        let wanted_base = basename(&wanted).to_string();
        Ok(self
            .all_files()
            .await?
            .into_iter()
            .filter(|f| {
                let base = basename(&f.path).to_lowercase();
                base.contains(&wanted_base) || wanted_base.contains(&base)
            })
            .collect())
    }

    pub async fn file_history(&self, path: &str) -> Result<Vec<CommitSummary>, ModifierError> {
        let path = normalize_file_path(path)?;
        self.api
            .list_commits(&self.repo, &path, HISTORY_LIMIT)
            .await
            .map_err(api_error)
    }

    /// Create `branch_name` from the head of `base` (default branch if `None`).
    pub async fn create_branch(
        &self,
        branch_name: &str,
        base: Option<&str>,
    ) -> Result<BranchRef, ModifierError> {
        let branch_name = clean_path(branch_name);
        if branch_name.is_empty() {
            return Err(ModifierError::EmptyPath);
        }
        let base = base
            .map(clean_path)
            .filter(|b| !b.is_empty())
            .unwrap_or_else(|| self.info.default_branch.clone());

        let sha = self
            .api
            .branch_head(&self.repo, &base)
            .await
            .map_err(api_error)?;
        let created = self
            .api
            .create_branch(&self.repo, &branch_name, &sha)
            .await
            .map_err(api_error)?;
        tracing::info!(branch = %branch_name, base = %base, "Created branch");
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::InMemoryRepo;

    async fn modifier(repo: InMemoryRepo) -> RepoModifier {
        RepoModifier::connect(Arc::new(repo), "https://github.com/octo/hello")
            .await
            .unwrap()
    }

    fn sample() -> InMemoryRepo {
        InMemoryRepo::new("octo", "hello")
            .with_file("README.md", "# Hello")
            .with_file("src/Main.py", "print('hi')")
            .with_file("src/utils/helpers.py", "def help(): pass")
    }

    #[test]
    fn path_normalisation() {
        assert_eq!(clean_path("  'src/app.py' "), "src/app.py");
        assert_eq!(clean_path("\"./README.md\""), "README.md");
        assert!(matches!(normalize_file_path("  "), Err(ModifierError::EmptyPath)));
        assert!(matches!(
            normalize_file_path("GitHub.com"),
            Err(ModifierError::InvalidPath(_))
        ));
    }

    #[tokio::test]
    async fn connect_reports_missing_repo_and_bad_token() {
        let err = RepoModifier::connect(Arc::new(sample()), "octo/other")
            .await
            .err()
            .unwrap();
        assert!(matches!(err, ModifierError::RepositoryNotFound(ref r) if r == "octo/other"));

        let err = RepoModifier::connect(
            Arc::new(sample().with_invalid_token()),
            "octo/hello",
        )
        .await
        .err()
        .unwrap();
        assert!(matches!(err, ModifierError::AuthenticationFailed));

        let err = RepoModifier::connect(Arc::new(sample()), "not a url")
            .await
            .err()
            .unwrap();
        assert!(err.to_string().contains("Invalid GitHub URL"));
    }

    #[tokio::test]
    async fn read_resolves_case_and_suggests() {
        let m = modifier(sample()).await;
        assert_eq!(m.read_file("src/main.py", None).await.unwrap().path, "src/Main.py");
        assert_eq!(m.read_file("readme.md", None).await.unwrap().content, "# Hello");

        let err = m.read_file("helper", None).await.unwrap_err();
        assert!(matches!(err, ModifierError::DidYouMean { ref suggestions, .. }
            if suggestions == "src/utils/helpers.py"));

        let err = m.read_file("nothing.txt", None).await.unwrap_err();
        assert!(matches!(err, ModifierError::NotFound(_)));

        let err = m.read_file("src", None).await.unwrap_err();
        assert!(matches!(err, ModifierError::IsDirectory(_)));
    }

    #[tokio::test]
    async fn create_then_read_returns_content() {
        let repo = Arc::new(sample());
        let m = RepoModifier::connect(repo.clone(), "octo/hello").await.unwrap();
        m.create_file("calc.py", "def add(a, b): return a + b", None, None)
            .await
            .unwrap();
        let read = m.read_file("calc.py", None).await.unwrap();
        assert_eq!(read.content, "def add(a, b): return a + b");
        assert_eq!(repo.file("calc.py").as_deref(), Some("def add(a, b): return a + b"));
    }

    #[tokio::test]
    async fn create_refuses_to_overwrite() {
        let m = modifier(sample()).await;
        let err = m.create_file("README.md", "x", None, None).await.unwrap_err();
        assert!(err.to_string().contains("Use 'edit' instead of 'create'"));
    }

    #[tokio::test]
    async fn edit_and_delete_require_existing_file() {
        let repo = Arc::new(sample());
        let m = RepoModifier::connect(repo.clone(), "octo/hello").await.unwrap();

        m.edit_file("README.md", "# Updated", Some("Docs"), None)
            .await
            .unwrap();
        assert_eq!(repo.file("README.md").as_deref(), Some("# Updated"));
        // A second edit picks up the new blob sha.
        m.edit_file("README.md", "# Again", None, None).await.unwrap();

        assert!(matches!(
            m.edit_file("missing.md", "x", None, None).await,
            Err(ModifierError::NotFound(_))
        ));

        m.delete_file("README.md", None, None).await.unwrap();
        assert!(repo.file("README.md").is_none());
        assert!(matches!(
            m.delete_file("README.md", None, None).await,
            Err(ModifierError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn listing_find_search_history() {
        let m = modifier(sample()).await;

        let root = m.list_files("", None).await.unwrap();
        let names: Vec<&str> = root.iter().map(|e| e.name.as_str()).collect();
        assert!(names.contains(&"README.md") && names.contains(&"src"));
        assert!(matches!(
            m.list_files("nope", None).await,
            Err(ModifierError::DirectoryNotFound(_))
        ));

        let found = m.find_file("HELPERS").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].path, "src/utils/helpers.py");

        let hits = m.search_files("print").await.unwrap();
        assert_eq!(hits[0].path, "src/Main.py");

        assert_eq!(m.file_history("README.md").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn branch_defaults_to_repo_default_branch() {
        let m = modifier(sample()).await;
        let branch = m.create_branch("feature/x", None).await.unwrap();
        assert_eq!(branch.sha, "c0");
        assert!(m.create_branch("feature/x", Some("main")).await.is_err());
        assert!(m.create_branch("other", Some("develop")).await.is_err());
    }
}
