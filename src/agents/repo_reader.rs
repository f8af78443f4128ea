//! Repository Q&A: clone, index and retrieve over a remote repository.
//!
//! A repository is shallow-cloned into a scratch directory, its matching
//! files are chunked and embedded into `<data_dir>/git_store/<owner>_<name>/`,
//! and the clone is deleted. An existing index for the same URL and
//! embedding model is loaded instead of cloning again.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::config::RetrievalConfig;
use crate::error::{IndexError, RepoError};
use crate::exec::run_command;
use crate::github::repo_name_from_url;
use crate::index::{self, ScoredChunk, VectorIndex};
use crate::llm::Embedder;

/// A repository whose index is loaded.
#[derive(Debug)]
pub struct LoadedRepo {
    pub name: String,
    pub url: String,
    index: VectorIndex,
}

impl LoadedRepo {
    pub fn chunk_count(&self) -> usize {
        self.index.len()
    }

    pub fn file_count(&self) -> usize {
        self.index.source_count()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoSummary {
    pub name: String,
    pub files: usize,
    pub chunks: usize,
    /// True when an existing index was loaded instead of cloning.
    pub reused: bool,
}

impl RepoSummary {
    pub fn message(&self) -> String {
        if self.reused {
            format!(
                "✅ Loaded existing index for '{}' ({} files, {} chunks).",
                self.name, self.files, self.chunks
            )
        } else {
            format!(
                "✅ Repository '{}' processed: {} files, {} chunks. Ask me about the codebase!",
                self.name, self.files, self.chunks
            )
        }
    }
}

pub struct RepoReader {
    store_root: PathBuf,
    current: Option<LoadedRepo>,
}

impl RepoReader {
    pub fn new(store_root: impl Into<PathBuf>) -> Self {
        Self {
            store_root: store_root.into(),
            current: None,
        }
    }

    pub fn current(&self) -> Option<&LoadedRepo> {
        self.current.as_ref()
    }

    /// Index directory for `url`.
    pub fn store_dir(&self, url: &str) -> Result<PathBuf, RepoError> {
        let url = url.trim();
        let name = validate_clone_url(url)?;
        Ok(self.store_root.join(store_key(url, &name)))
    }

    /// Load or build the index for `url` and make it the current repository.
    pub async fn process(
        &mut self,
        url: &str,
        embedder: &dyn Embedder,
        retrieval: &RetrievalConfig,
    ) -> Result<RepoSummary, RepoError> {
        let url = url.trim();
        let name = validate_clone_url(url)?;
        let store_dir = self.store_dir(url)?;

        if let Some(existing) = VectorIndex::load(&store_dir)? {
            if existing.fingerprint.as_deref() == Some(url)
                && existing.built_with(embedder.model_name())
            {
                tracing::info!(repo = %name, "Reusing existing repository index");
                return Ok(self.set_current(name, url, existing, true));
            }
            tracing::info!(
                repo = %name,
                indexed_url = ?existing.fingerprint,
                indexed_model = %existing.model,
                "Stored index does not match, rebuilding"
            );
        }

        let clone_dir =
            std::env::temp_dir().join(format!("ask-llama-{}-{}", name, uuid::Uuid::new_v4()));
        let built = match clone_repository(url, &clone_dir, retrieval.clone_timeout_secs).await {
            Ok(()) => index_directory(&clone_dir, url, embedder, retrieval).await,
            Err(e) => Err(e),
        };

        if clone_dir.exists()
            && let Err(e) = tokio::fs::remove_dir_all(&clone_dir).await
        {
            tracing::warn!(path = %clone_dir.display(), error = %e, "Failed to delete clone");
        }

        let built = built?;
        built.save(&store_dir)?;
        Ok(self.set_current(name, url, built, false))
    }

    fn set_current(
        &mut self,
        name: String,
        url: &str,
        index: VectorIndex,
        reused: bool,
    ) -> RepoSummary {
        let summary = RepoSummary {
            name: name.clone(),
            files: index.source_count(),
            chunks: index.len(),
            reused,
        };
        self.current = Some(LoadedRepo {
            name,
            url: url.to_string(),
            index,
        });
        summary
    }

    /// Top chunks for `question`, each headed by its file path.
    pub async fn retrieve(
        &self,
        question: &str,
        embedder: &dyn Embedder,
        retrieval: &RetrievalConfig,
    ) -> Result<Option<String>, IndexError> {
        let Some(repo) = &self.current else {
            return Ok(None);
        };
        let hits = index::retrieve(
            &repo.index,
            embedder,
            question,
            retrieval.top_k,
            retrieval.min_similarity,
        )
        .await?;
        Ok(format_code_context(&hits))
    }
}

fn format_code_context(hits: &[ScoredChunk]) -> Option<String> {
    let blocks: Vec<String> = hits
        .iter()
        .filter(|h| !h.text.trim().is_empty())
        .map(|h| format!("File: {}\n{}", h.source, h.text))
        .collect();
    if blocks.is_empty() {
        None
    } else {
        Some(blocks.join("\n\n---\n\n"))
    }
}

/// Accept http(s), ssh and `git@` clone URLs; return the store name.
fn validate_clone_url(url: &str) -> Result<String, RepoError> {
    let invalid = || RepoError::InvalidUrl(url.to_string());
    let scheme_ok = ["https://", "http://", "ssh://", "git@"]
        .iter()
        .any(|prefix| url.starts_with(prefix));
    if !scheme_ok || url.chars().any(char::is_whitespace) {
        return Err(invalid());
    }
    repo_name_from_url(url).ok_or_else(invalid)
}

/// `<owner>_<name>` when the URL has an owner segment, so same-named
/// repositories of different owners get separate indexes.
fn store_key(url: &str, name: &str) -> String {
    let owner = url
        .trim_end_matches('/')
        .rsplit(['/', ':'])
        .nth(1)
        .filter(|o| {
            !o.is_empty()
                && *o != "."
                && *o != ".."
                && o
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        });
    match owner {
        Some(owner) => format!("{owner}_{name}"),
        None => name.to_string(),
    }
}

async fn clone_repository(url: &str, dest: &Path, timeout_secs: u64) -> Result<(), RepoError> {
    let args = vec![
        "clone".to_string(),
        "--depth".to_string(),
        "1".to_string(),
        "--".to_string(),
        url.to_string(),
        dest.display().to_string(),
    ];
    tracing::info!(url, dest = %dest.display(), "Cloning repository");
    let result = run_command("git", &args, None, timeout_secs)
        .await
        .map_err(|e| RepoError::CloneFailed(e.to_string()))?;

    if result.timed_out {
        return Err(RepoError::CloneFailed(format!(
            "git clone timed out after {timeout_secs}s"
        )));
    }
    if !result.success() {
        let stderr = result.stderr.trim();
        return Err(RepoError::CloneFailed(if stderr.is_empty() {
            format!("git exited with {:?}", result.exit_code)
        } else {
            stderr.to_string()
        }));
    }
    Ok(())
}

/// Chunk and embed every matching file under `root`.
pub async fn index_directory(
    root: &Path,
    fingerprint: &str,
    embedder: &dyn Embedder,
    retrieval: &RetrievalConfig,
) -> Result<VectorIndex, RepoError> {
    let files = collect_files(root, &retrieval.repo_extensions);
    if files.is_empty() {
        return Err(RepoError::NoMatchingFiles {
            extensions: retrieval.repo_extensions.clone(),
        });
    }
    tracing::info!(files = files.len(), "Collected repository files");

    let chunks = index::chunk_documents(&files, retrieval.chunk_size, retrieval.chunk_overlap)?;
    let mut built = index::build_index(embedder, chunks).await?;
    built.fingerprint = Some(fingerprint.to_string());
    Ok(built)
}

/// `(relative path, text)` of every file under `root` whose name ends with
/// one of `extensions`. `.git` is skipped, as are unreadable or non-UTF-8
/// files. Notebooks contribute only their cell sources.
pub fn collect_files(root: &Path, extensions: &[String]) -> Vec<(String, String)> {
    let extensions: Vec<String> = extensions.iter().map(|e| e.to_lowercase()).collect();
    let mut files: Vec<(String, String)> = WalkDir::new(root)
        .into_iter()
        .filter_entry(|e| e.file_name() != ".git")
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            let name = e.file_name().to_string_lossy().to_lowercase();
            extensions.iter().any(|ext| name.ends_with(ext.as_str()))
        })
        .filter_map(|e| {
            let text = std::fs::read_to_string(e.path()).ok()?;
            let rel = e
                .path()
                .strip_prefix(root)
                .unwrap_or(e.path())
                .to_string_lossy()
                .replace('\\', "/");
            let text = if rel.ends_with(".ipynb") {
                notebook_sources(&text).unwrap_or(text)
            } else {
                text
            };
            Some((rel, text))
        })
        .collect();
    files.sort_by(|a, b| a.0.cmp(&b.0));
    files
}

/// Concatenate the `source` of every notebook cell.
fn notebook_sources(json: &str) -> Option<String> {
    let notebook: serde_json::Value = serde_json::from_str(json).ok()?;
    let cells = notebook.get("cells")?.as_array()?;
    let sources: Vec<String> = cells
        .iter()
        .filter_map(|cell| match cell.get("source")? {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Array(lines) => Some(
                lines
                    .iter()
                    .filter_map(|l| l.as_str())
                    .collect::<String>(),
            ),
            _ => None,
        })
        .collect();
    Some(sources.join("\n\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::KeywordEmbedder;

    fn retrieval() -> RetrievalConfig {
        RetrievalConfig {
            chunk_size: 500,
            chunk_overlap: 50,
            top_k: 1,
            follow_up_top_k: 2,
            min_similarity: 0.0,
            repo_extensions: vec![".py".into(), ".ipynb".into(), ".md".into()],
            clone_timeout_secs: 5,
        }
    }

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    #[test]
    fn collects_only_matching_extensions() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "README.md", "# Demo");
        write(dir.path(), "src/app.py", "def main(): pass");
        write(dir.path(), "src/lib.rs", "fn main() {}");
        write(dir.path(), ".git/config", "[core]");
        write(dir.path(), ".git/hooks/x.py", "ignored");

        let files = collect_files(dir.path(), &retrieval().repo_extensions);
        let names: Vec<&str> = files.iter().map(|(p, _)| p.as_str()).collect();
        assert_eq!(names, vec!["README.md", "src/app.py"]);
    }

    #[test]
    fn notebooks_contribute_cell_sources() {
        let nb = r##"{"cells": [
            {"cell_type": "code", "source": ["import pandas\n", "df = 1"]},
            {"cell_type": "markdown", "source": "# Title"}
        ], "metadata": {}}"##;
        assert_eq!(
            notebook_sources(nb).as_deref(),
            Some("import pandas\ndf = 1\n\n# Title")
        );
        assert!(notebook_sources("not json").is_none());
    }

    #[test]
    fn clone_url_validation() {
        assert_eq!(
            validate_clone_url("https://github.com/octo/hello.git").unwrap(),
            "hello"
        );
        assert_eq!(validate_clone_url("git@github.com:octo/hello.git").unwrap(), "hello");
        assert!(validate_clone_url("--upload-pack=evil").is_err());
        assert!(validate_clone_url("octo/hello").is_err());
        assert!(validate_clone_url("https://github.com/octo/hello world").is_err());
    }

    #[tokio::test]
    async fn existing_index_is_loaded_without_cloning() {
        let dir = tempfile::tempdir().unwrap();
        let repo_dir = tempfile::tempdir().unwrap();
        write(repo_dir.path(), "train.py", "def train(model): fit the model");
        write(repo_dir.path(), "README.md", "Install with pip");

        let url = "https://github.com/octo/hello";
        let embedder = KeywordEmbedder::new(&["train", "install"]);
        let built = index_directory(repo_dir.path(), url, &embedder, &retrieval())
            .await
            .unwrap();
        built.save(&dir.path().join("octo_hello")).unwrap();

        let mut reader = RepoReader::new(dir.path());
        let summary = reader.process(url, &embedder, &retrieval()).await.unwrap();
        assert!(summary.reused);
        assert_eq!(summary.files, 2);

        let context = reader
            .retrieve("how do I train?", &embedder, &retrieval())
            .await
            .unwrap()
            .unwrap();
        assert!(context.starts_with("File: train.py"));
    }

    #[test]
    fn store_key_includes_the_owner() {
        let reader = RepoReader::new("/data/git_store");
        assert_eq!(
            reader.store_dir("https://github.com/octo/hello.git").unwrap(),
            PathBuf::from("/data/git_store/octo_hello")
        );
        assert_eq!(
            reader.store_dir("git@github.com:other/hello.git").unwrap(),
            PathBuf::from("/data/git_store/other_hello")
        );
        assert!(reader.store_dir("octo/hello").is_err());
    }

    #[tokio::test]
    async fn stale_index_is_not_reused() {
        // A stored index for another URL or another embedding model is not
        // reused, so processing tries to clone the unreachable URL and fails.
        let dir = tempfile::tempdir().unwrap();
        let repo_dir = tempfile::tempdir().unwrap();
        write(repo_dir.path(), "train.py", "def train(model): fit the model");
        let url = "https://invalid.localhost/octo/hello";
        let embedder = KeywordEmbedder::new(&["train"]);

        let mut other_url = index_directory(
            repo_dir.path(),
            "https://x/octo/hello",
            &embedder,
            &retrieval(),
        )
        .await
        .unwrap();
        other_url.save(&dir.path().join("octo_hello")).unwrap();
        let mut reader = RepoReader::new(dir.path());
        let mut fast = retrieval();
        fast.clone_timeout_secs = 2;
        assert!(reader.process(url, &embedder, &fast).await.is_err());

        other_url.fingerprint = Some(url.to_string());
        other_url.model = "old-model".to_string();
        other_url.save(&dir.path().join("octo_hello")).unwrap();
        assert!(reader.process(url, &embedder, &fast).await.is_err());
        assert!(reader.current().is_none());
    }

    #[tokio::test]
    async fn empty_repository_has_no_matching_files() {
        let repo_dir = tempfile::tempdir().unwrap();
        write(repo_dir.path(), "main.go", "package main");
        let embedder = KeywordEmbedder::new(&["x"]);
        let err = index_directory(repo_dir.path(), "u", &embedder, &retrieval())
            .await
            .unwrap_err();
        assert!(matches!(err, RepoError::NoMatchingFiles { .. }));
    }
}
