pub mod chunking;
pub mod store;

pub use chunking::{sha256_hex, split_text};
pub use store::{ScoredChunk, VectorIndex};

use crate::error::IndexError;
use crate::llm::Embedder;

/// A chunk of text waiting to be embedded.
#[derive(Debug, Clone)]
pub struct PendingChunk {
    pub source: String,
    pub ordinal: usize,
    pub text: String,
}

/// Split each `(source, text)` document into chunks tagged with their source.
pub fn chunk_documents(
    documents: &[(String, String)],
    chunk_size: usize,
    overlap: usize,
) -> Result<Vec<PendingChunk>, IndexError> {
    let mut chunks = Vec::new();
    for (source, text) in documents {
        for (ordinal, chunk) in split_text(text, chunk_size, overlap)?.into_iter().enumerate() {
            chunks.push(PendingChunk {
                source: source.clone(),
                ordinal,
                text: chunk,
            });
        }
    }
    Ok(chunks)
}

/// Embed `chunks` and collect them into a fresh index.
pub async fn build_index(
    embedder: &dyn Embedder,
    chunks: Vec<PendingChunk>,
) -> Result<VectorIndex, IndexError> {
    if chunks.is_empty() {
        return Err(IndexError::Empty);
    }

    let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
    let vectors = embedder.embed(&texts).await?;
    if vectors.len() != chunks.len() {
        return Err(IndexError::Embedding(format!(
            "expected {} embeddings, got {}",
            chunks.len(),
            vectors.len()
        )));
    }

    let mut index = VectorIndex::new(embedder.model_name());
    for (chunk, vector) in chunks.into_iter().zip(vectors) {
        index.insert(&chunk.source, chunk.ordinal, &chunk.text, vector)?;
    }
    tracing::info!(entries = index.len(), sources = index.source_count(), "Built vector index");
    Ok(index)
}

/// Embed `query` and return the best `k` chunks from `index`. Fails if the
/// index was built with a different embedding model.
pub async fn retrieve(
    index: &VectorIndex,
    embedder: &dyn Embedder,
    query: &str,
    k: usize,
    min_similarity: f32,
) -> Result<Vec<ScoredChunk>, IndexError> {
    if !index.built_with(embedder.model_name()) {
        return Err(IndexError::ModelMismatch {
            indexed: index.model.clone(),
            current: embedder.model_name().to_string(),
        });
    }
    let mut vectors = embedder.embed(&[query.to_string()]).await?;
    let query_vec = vectors
        .pop()
        .ok_or_else(|| IndexError::Embedding("no embedding returned for query".to_string()))?;
    Ok(index.search(&query_vec, k, min_similarity))
}

/// Join retrieved chunk texts into one context block, or `None` if every
/// hit is blank.
pub fn join_context(chunks: &[ScoredChunk]) -> Option<String> {
    let texts: Vec<&str> = chunks
        .iter()
        .map(|c| c.text.as_str())
        .filter(|t| !t.trim().is_empty())
        .collect();
    if texts.is_empty() {
        None
    } else {
        Some(texts.join("\n\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::KeywordEmbedder;

    #[tokio::test]
    async fn build_then_retrieve_finds_relevant_chunk() {
        let docs = vec![
            ("a.txt".to_string(), "rust ownership borrowing".to_string()),
            ("b.txt".to_string(), "python decorators".to_string()),
        ];
        let chunks = chunk_documents(&docs, 1000, 200).unwrap();
        let embedder = KeywordEmbedder::new(&["rust", "python"]);
        let index = build_index(&embedder, chunks).await.unwrap();
        assert_eq!(index.len(), 2);

        let hits = retrieve(&index, &embedder, "tell me about rust", 1, 0.0)
            .await
            .unwrap();
        assert_eq!(hits[0].source, "a.txt");
    }

    #[tokio::test]
    async fn retrieval_with_another_model_is_refused() {
        let docs = vec![("a.txt".to_string(), "rust ownership".to_string())];
        let embedder = KeywordEmbedder::new(&["rust"]);
        let mut index = build_index(&embedder, chunk_documents(&docs, 1000, 200).unwrap())
            .await
            .unwrap();
        index.model = "old-model".to_string();

        let err = retrieve(&index, &embedder, "rust", 1, 0.0).await.unwrap_err();
        assert!(matches!(
            err,
            IndexError::ModelMismatch { ref indexed, ref current }
                if indexed == "old-model" && current == "keyword"
        ));
        assert_eq!(embedder.calls(), 1);
    }

    #[tokio::test]
    async fn empty_input_is_rejected() {
        let embedder = KeywordEmbedder::new(&["x"]);
        assert!(matches!(
            build_index(&embedder, vec![]).await,
            Err(IndexError::Empty)
        ));
    }

    #[test]
    fn join_context_skips_blank_chunks() {
        let chunks = vec![
            ScoredChunk {
                source: "a".into(),
                text: "one".into(),
                score: 1.0,
            },
            ScoredChunk {
                source: "b".into(),
                text: "  ".into(),
                score: 0.5,
            },
        ];
        assert_eq!(join_context(&chunks).as_deref(), Some("one"));
        assert!(join_context(&chunks[1..]).is_none());
    }
}
