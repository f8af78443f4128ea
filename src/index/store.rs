//! On-disk similarity index over externally computed embeddings.
//!
//! The whole index is one JSON file. Search is a linear cosine-similarity
//! scan, which is plenty for the document and repository sizes involved.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::chunking::chunk_id;
use crate::error::IndexError;

const INDEX_FILE: &str = "index.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexEntry {
    pub id: String,
    pub source: String,
    pub text: String,
    pub vector: Vec<f32>,
}

/// A search hit with its cosine similarity.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub source: String,
    pub text: String,
    pub score: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorIndex {
    /// Embedding model that produced the vectors.
    pub model: String,
    /// Caller-defined identity of the indexed content (e.g. a document hash).
    #[serde(default)]
    pub fingerprint: Option<String>,
    entries: Vec<IndexEntry>,
    #[serde(skip)]
    ids: HashSet<String>,
}

impl VectorIndex {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            fingerprint: None,
            entries: Vec::new(),
            ids: HashSet::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether the vectors came from `model`. Vectors from another model
    /// are not comparable, whatever their length.
    pub fn built_with(&self, model: &str) -> bool {
        self.model == model
    }

    pub fn dimension(&self) -> Option<usize> {
        self.entries.first().map(|e| e.vector.len())
    }

    /// Number of distinct sources (files) in the index.
    pub fn source_count(&self) -> usize {
        self.entries
            .iter()
            .map(|e| e.source.as_str())
            .collect::<HashSet<_>>()
            .len()
    }

    /// Add a chunk. Returns false if an identical chunk is already present.
    pub fn insert(
        &mut self,
        source: &str,
        ordinal: usize,
        text: &str,
        vector: Vec<f32>,
    ) -> Result<bool, IndexError> {
        if let Some(expected) = self.dimension() {
            if expected != vector.len() {
                return Err(IndexError::DimensionMismatch {
                    expected,
                    actual: vector.len(),
                });
            }
        }

        let id = chunk_id(source, ordinal, text);
        if !self.ids.insert(id.clone()) {
            return Ok(false);
        }
        self.entries.push(IndexEntry {
            id,
            source: source.to_string(),
            text: text.to_string(),
            vector,
        });
        Ok(true)
    }

    /// The `k` most similar chunks with score at least `min_similarity`,
    /// best first.
    pub fn search(&self, query: &[f32], k: usize, min_similarity: f32) -> Vec<ScoredChunk> {
        let mut scored: Vec<(f32, &IndexEntry)> = self
            .entries
            .iter()
            .filter(|e| e.vector.len() == query.len())
            .map(|e| (cosine_similarity(query, &e.vector), e))
            .filter(|(score, _)| *score >= min_similarity)
            .collect();

        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        scored.truncate(k);

        scored
            .into_iter()
            .map(|(score, e)| ScoredChunk {
                source: e.source.clone(),
                text: e.text.clone(),
                score,
            })
            .collect()
    }

    pub fn index_path(dir: &Path) -> PathBuf {
        dir.join(INDEX_FILE)
    }

    /// Write the index to `dir/index.json`, replacing any previous file.
    pub fn save(&self, dir: &Path) -> Result<(), IndexError> {
        std::fs::create_dir_all(dir)?;
        let path = Self::index_path(dir);
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_vec(self)?)?;
        std::fs::rename(&tmp, &path)?;
        tracing::info!(path = %path.display(), entries = self.len(), "Saved vector index");
        Ok(())
    }

    /// Load `dir/index.json`, or `Ok(None)` if it does not exist.
    pub fn load(dir: &Path) -> Result<Option<Self>, IndexError> {
        let path = Self::index_path(dir);
        let bytes = match std::fs::read(&path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let mut index: VectorIndex = serde_json::from_slice(&bytes)?;
        index.ids = index.entries.iter().map(|e| e.id.clone()).collect();
        tracing::info!(path = %path.display(), entries = index.len(), "Loaded vector index");
        Ok(Some(index))
    }
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample() -> VectorIndex {
        let mut index = VectorIndex::new("test-model");
        index.insert("a.md", 0, "about cats", vec![1.0, 0.0, 0.0]).unwrap();
        index.insert("a.md", 1, "about dogs", vec![0.0, 1.0, 0.0]).unwrap();
        index.insert("b.md", 0, "cats and dogs", vec![0.7, 0.7, 0.0]).unwrap();
        index
    }

    #[test]
    fn search_ranks_by_similarity() {
        let hits = sample().search(&[1.0, 0.1, 0.0], 2, 0.0);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].text, "about cats");
        assert_eq!(hits[1].text, "cats and dogs");
        assert!(hits[0].score >= hits[1].score);
    }

    #[test]
    fn min_similarity_filters_hits() {
        let hits = sample().search(&[0.0, 0.0, 1.0], 3, 0.5);
        assert!(hits.is_empty());
    }

    #[test]
    fn duplicate_chunks_are_not_inserted_twice() {
        let mut index = sample();
        let added = index.insert("a.md", 0, "about cats", vec![1.0, 0.0, 0.0]).unwrap();
        assert!(!added);
        assert_eq!(index.len(), 3);
        assert_eq!(index.source_count(), 2);
    }

    #[test]
    fn dimension_mismatch_is_rejected() {
        let mut index = sample();
        let err = index.insert("c.md", 0, "x", vec![1.0]).unwrap_err();
        assert!(matches!(
            err,
            IndexError::DimensionMismatch {
                expected: 3,
                actual: 1
            }
        ));
    }

    #[test]
    fn save_then_load_keeps_entries_and_dedup_state() {
        let tmp = TempDir::new().unwrap();
        let mut index = sample();
        index.fingerprint = Some("abc".into());
        index.save(tmp.path()).unwrap();

        let mut loaded = VectorIndex::load(tmp.path()).unwrap().unwrap();
        assert_eq!(loaded.len(), 3);
        assert_eq!(loaded.model, "test-model");
        assert_eq!(loaded.fingerprint.as_deref(), Some("abc"));
        assert!(!loaded.insert("a.md", 1, "about dogs", vec![0.0, 1.0, 0.0]).unwrap());
    }

    #[test]
    fn load_missing_index_is_none() {
        let tmp = TempDir::new().unwrap();
        assert!(VectorIndex::load(tmp.path()).unwrap().is_none());
    }

    #[test]
    fn corrupt_index_is_an_error() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("index.json"), b"{not json").unwrap();
        assert!(matches!(
            VectorIndex::load(tmp.path()),
            Err(IndexError::Corrupt(_))
        ));
    }

    #[test]
    fn built_with_compares_the_model() {
        let index = sample();
        assert!(index.built_with("test-model"));
        assert!(!index.built_with("text-embedding-3-large"));
    }

    #[test]
    fn cosine_of_zero_vector_is_zero() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }
}
