//! Document agent: PDF upload, indexing and retrieval.
//!
//! Uploaded PDFs are text-extracted, chunked and embedded into a
//! [`VectorIndex`] persisted under `<data_dir>/doc_store/`. An upload whose
//! combined content hash matches the current index is not re-embedded.

use std::path::{Path, PathBuf};

use crate::config::RetrievalConfig;
use crate::error::{DocumentError, IndexError};
use crate::index::{self, VectorIndex, sha256_hex};
use crate::llm::Embedder;

use super::prompts;

/// Result of an upload, for the status message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadSummary {
    pub files: usize,
    pub chunks: usize,
    /// True when the same documents were already indexed.
    pub reused: bool,
}

impl UploadSummary {
    pub fn message(&self) -> String {
        if self.reused {
            format!(
                "✅ These {} document(s) are already indexed ({} chunks). Ask away!",
                self.files, self.chunks
            )
        } else {
            format!(
                "✅ Processed {} document(s) into {} chunks. You can now ask questions about them.",
                self.files, self.chunks
            )
        }
    }
}

pub struct DocumentStore {
    dir: PathBuf,
    index: Option<VectorIndex>,
    last_context: Option<String>,
}

impl DocumentStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            index: None,
            last_context: None,
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.index.is_some()
    }

    pub fn index(&self) -> Option<&VectorIndex> {
        self.index.as_ref()
    }

    pub fn clear_context(&mut self) {
        self.last_context = None;
    }

    /// Load the persisted index if nothing is loaded yet. Returns whether an
    /// index is available afterwards.
    pub fn load_persisted(&mut self) -> Result<bool, IndexError> {
        if self.index.is_none()
            && let Some(loaded) = VectorIndex::load(&self.dir)?
        {
            tracing::info!(entries = loaded.len(), "Loaded persisted document index");
            self.index = Some(loaded);
        }
        Ok(self.index.is_some())
    }

    /// Validate, extract and index `files`, replacing the current index.
    pub async fn upload(
        &mut self,
        files: &[PathBuf],
        embedder: &dyn Embedder,
        retrieval: &RetrievalConfig,
    ) -> Result<UploadSummary, DocumentError> {
        if files.is_empty() {
            return Err(DocumentError::NoDocuments);
        }

        // Reject the whole batch before reading anything.
        for path in files {
            if !is_pdf_name(path) {
                return Err(DocumentError::UnsupportedFile {
                    name: display_name(path),
                });
            }
        }

        let mut loaded = Vec::with_capacity(files.len());
        for path in files {
            let bytes = tokio::fs::read(path).await?;
            if !bytes.starts_with(b"%PDF") {
                return Err(DocumentError::InvalidPdf {
                    name: display_name(path),
                    message: "missing %PDF header".to_string(),
                });
            }
            loaded.push((display_name(path), bytes));
        }

        let fingerprint = batch_fingerprint(loaded.iter().map(|(_, b)| b.as_slice()));
        if let Some(summary) =
            self.reuse_if_indexed(&fingerprint, embedder.model_name(), files.len())?
        {
            return Ok(summary);
        }

        let mut texts = Vec::with_capacity(loaded.len());
        for (name, bytes) in loaded {
            let text = extract_pdf_text(&name, bytes).await?;
            tracing::debug!(file = %name, chars = text.len(), "Extracted PDF text");
            texts.push((name, text));
        }

        self.index_texts(&texts, fingerprint, embedder, retrieval).await
    }

    /// Chunk, embed and persist already-extracted documents.
    pub async fn index_texts(
        &mut self,
        documents: &[(String, String)],
        fingerprint: String,
        embedder: &dyn Embedder,
        retrieval: &RetrievalConfig,
    ) -> Result<UploadSummary, DocumentError> {
        if documents.iter().all(|(_, text)| text.trim().is_empty()) {
            return Err(DocumentError::NoText);
        }

        let chunks =
            index::chunk_documents(documents, retrieval.chunk_size, retrieval.chunk_overlap)?;
        let mut built = index::build_index(embedder, chunks).await?;
        built.fingerprint = Some(fingerprint);
        built.save(&self.dir)?;

        let summary = UploadSummary {
            files: documents.len(),
            chunks: built.len(),
            reused: false,
        };
        tracing::info!(files = summary.files, chunks = summary.chunks, "Indexed documents");
        self.index = Some(built);
        self.last_context = None;
        Ok(summary)
    }

    /// The existing index is reused only for the same documents embedded
    /// with the same model.
    fn reuse_if_indexed(
        &mut self,
        fingerprint: &str,
        model: &str,
        files: usize,
    ) -> Result<Option<UploadSummary>, DocumentError> {
        self.load_persisted()?;
        match &self.index {
            Some(current) if current.fingerprint.as_deref() == Some(fingerprint) => {
                if !current.built_with(model) {
                    tracing::info!(
                        indexed = %current.model,
                        current = model,
                        "Embedding model changed, re-indexing documents"
                    );
                    return Ok(None);
                }
                tracing::info!("Documents unchanged, reusing existing index");
                Ok(Some(UploadSummary {
                    files,
                    chunks: current.len(),
                    reused: true,
                }))
            }
            _ => Ok(None),
        }
    }

    /// Retrieve context for `question`. A follow-up folds the previous
    /// context into the query and retrieves more chunks. Returns `None` when
    /// nothing relevant was found.
    pub async fn retrieve(
        &mut self,
        question: &str,
        follow_up: bool,
        embedder: &dyn Embedder,
        retrieval: &RetrievalConfig,
    ) -> Result<Option<String>, IndexError> {
        let Some(idx) = &self.index else {
            return Ok(None);
        };

        let (query, k) = match (&self.last_context, follow_up) {
            (Some(previous), true) => (
                prompts::follow_up_query(previous, question),
                retrieval.follow_up_top_k,
            ),
            _ => (question.to_string(), retrieval.top_k),
        };

        let hits = index::retrieve(idx, embedder, &query, k, retrieval.min_similarity).await?;
        let context = index::join_context(&hits);
        if context.is_some() {
            self.last_context = context.clone();
        }
        Ok(context)
    }
}

fn is_pdf_name(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Identity of an upload batch: hash of the sorted per-file hashes, so the
/// same files in any order match.
pub fn batch_fingerprint<'a>(contents: impl Iterator<Item = &'a [u8]>) -> String {
    let mut hashes: Vec<String> = contents.map(sha256_hex).collect();
    hashes.sort();
    sha256_hex(hashes.join("").as_bytes())
}

async fn extract_pdf_text(name: &str, bytes: Vec<u8>) -> Result<String, DocumentError> {
    let result = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
        .await
        .map_err(|e| DocumentError::InvalidPdf {
            name: name.to_string(),
            message: e.to_string(),
        })?;
    result.map_err(|e| DocumentError::InvalidPdf {
        name: name.to_string(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::KeywordEmbedder;

    fn retrieval() -> RetrievalConfig {
        RetrievalConfig {
            chunk_size: 200,
            chunk_overlap: 20,
            top_k: 1,
            follow_up_top_k: 2,
            min_similarity: 0.0,
            repo_extensions: vec![],
            clone_timeout_secs: 5,
        }
    }

    fn docs() -> Vec<(String, String)> {
        vec![
            ("llamas.pdf".to_string(), "Llamas live in the Andes.".to_string()),
            ("rust.pdf".to_string(), "Rust has ownership and borrowing.".to_string()),
        ]
    }

    #[tokio::test]
    async fn non_pdf_upload_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let notes = dir.path().join("notes.txt");
        std::fs::write(&notes, "hello").unwrap();

        let mut store = DocumentStore::new(dir.path().join("doc_store"));
        let embedder = KeywordEmbedder::new(&["x"]);
        let err = store
            .upload(&[notes], &embedder, &retrieval())
            .await
            .unwrap_err();
        assert!(matches!(err, DocumentError::UnsupportedFile { ref name } if name == "notes.txt"));
        assert_eq!(embedder.calls(), 0);
    }

    #[tokio::test]
    async fn fake_pdf_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let fake = dir.path().join("fake.pdf");
        std::fs::write(&fake, "not really a pdf").unwrap();

        let mut store = DocumentStore::new(dir.path().join("doc_store"));
        let err = store
            .upload(&[fake], &KeywordEmbedder::new(&["x"]), &retrieval())
            .await
            .unwrap_err();
        assert!(matches!(err, DocumentError::InvalidPdf { .. }));
    }

    #[tokio::test]
    async fn empty_upload_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = DocumentStore::new(dir.path());
        let err = store
            .upload(&[], &KeywordEmbedder::new(&["x"]), &retrieval())
            .await
            .unwrap_err();
        assert!(matches!(err, DocumentError::NoDocuments));
    }

    #[tokio::test]
    async fn indexed_documents_persist_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let store_dir = dir.path().join("doc_store");
        let embedder = KeywordEmbedder::new(&["llama", "rust"]);

        let mut store = DocumentStore::new(&store_dir);
        let summary = store
            .index_texts(&docs(), "fp-1".into(), &embedder, &retrieval())
            .await
            .unwrap();
        assert_eq!(summary.files, 2);
        assert!(!summary.reused);

        let mut reopened = DocumentStore::new(&store_dir);
        assert!(reopened.load_persisted().unwrap());
        assert_eq!(reopened.index().unwrap().fingerprint.as_deref(), Some("fp-1"));

        let reused = reopened.reuse_if_indexed("fp-1", "keyword", 2).unwrap();
        assert!(reused.is_some_and(|s| s.reused));
        assert!(reopened.reuse_if_indexed("fp-2", "keyword", 2).unwrap().is_none());
        assert!(
            reopened
                .reuse_if_indexed("fp-1", "text-embedding-3-large", 2)
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn follow_up_widens_retrieval() {
        let dir = tempfile::tempdir().unwrap();
        let embedder = KeywordEmbedder::new(&["llama", "rust"]);
        let mut store = DocumentStore::new(dir.path());
        store
            .index_texts(&docs(), "fp".into(), &embedder, &retrieval())
            .await
            .unwrap();

        let first = store
            .retrieve("where do llamas live?", false, &embedder, &retrieval())
            .await
            .unwrap()
            .unwrap();
        assert!(first.contains("Andes"));
        assert!(!first.contains("ownership"));

        let follow = store
            .retrieve("and what about rust?", true, &embedder, &retrieval())
            .await
            .unwrap()
            .unwrap();
        assert!(follow.contains("Andes") && follow.contains("ownership"));
    }

    #[test]
    fn fingerprint_ignores_order() {
        let a: &[u8] = b"one";
        let b: &[u8] = b"two";
        assert_eq!(
            batch_fingerprint([a, b].into_iter()),
            batch_fingerprint([b, a].into_iter())
        );
        assert_ne!(batch_fingerprint([a].into_iter()), batch_fingerprint([b].into_iter()));
    }
}
