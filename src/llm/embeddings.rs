//! Embedding provider seam plus the OpenAI-compatible `/embeddings` client.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::ModelAccess;
use crate::error::IndexError;

/// Inputs per request. GitHub Models rejects very large batches.
const BATCH_SIZE: usize = 64;

#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed each text, returning vectors in input order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, IndexError>;

    /// Name stored alongside an index so a model change is detectable.
    fn model_name(&self) -> &str;
}

pub struct OpenAiEmbedder {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

impl OpenAiEmbedder {
    pub fn new(access: &ModelAccess) -> Result<Self, IndexError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| IndexError::Embedding(format!("failed to build client: {e}")))?;
        Ok(Self {
            http,
            endpoint: format!("{}/embeddings", access.endpoint.trim_end_matches('/')),
            api_key: access.api_key.clone(),
            model: access.embedding_model.clone(),
        })
    }

    async fn embed_batch(&self, batch: &[String]) -> Result<Vec<Vec<f32>>, IndexError> {
        let resp = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&EmbeddingRequest {
                model: &self.model,
                input: batch,
            })
            .send()
            .await
            .map_err(|e| IndexError::Embedding(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(IndexError::Embedding(format!("HTTP {status}: {body}")));
        }

        let mut parsed: EmbeddingResponse = resp
            .json()
            .await
            .map_err(|e| IndexError::Embedding(format!("invalid response: {e}")))?;

        if parsed.data.len() != batch.len() {
            return Err(IndexError::Embedding(format!(
                "expected {} embeddings, got {}",
                batch.len(),
                parsed.data.len()
            )));
        }
        parsed.data.sort_by_key(|d| d.index);
        Ok(parsed.data.into_iter().map(|d| d.embedding).collect())
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, IndexError> {
        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(BATCH_SIZE) {
            vectors.extend(self.embed_batch(batch).await?);
        }
        tracing::debug!(count = vectors.len(), model = %self.model, "Embedded texts");
        Ok(vectors)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
