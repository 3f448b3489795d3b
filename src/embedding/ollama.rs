//! Ollama embeddings for locally hosted models.
//!
//! The `/api/embeddings` endpoint takes one prompt per call, so batches are
//! issued sequentially.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{http_client, post_json, EmbeddingProvider};
use crate::config::EmbeddingConfig;
use crate::error::Result;

pub struct OllamaProvider {
    client: reqwest::Client,
    base_url: String,
    model: String,
    dimension: usize,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

impl OllamaProvider {
    pub fn new(config: &EmbeddingConfig) -> Self {
        let model = config.ollama_model.clone();
        let lower = model.to_lowercase();
        let dimension = [
            ("nomic-embed-text", 768),
            ("mxbai-embed-large", 1024),
            ("snowflake-arctic-embed", 1024),
            ("all-minilm", 384),
        ]
        .iter()
        .find(|(name, _)| lower.contains(name))
        .map(|(_, dim)| *dim)
        .unwrap_or(768);

        info!(base_url = %config.ollama_base_url, model = %model, dimension, "ollama provider initialized");
        Self {
            client: http_client(),
            base_url: config.ollama_base_url.trim_end_matches('/').to_string(),
            model,
            dimension,
        }
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaProvider {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let url = format!("{}/api/embeddings", self.base_url);
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            let request = EmbeddingRequest {
                model: &self.model,
                prompt: text,
            };
            let response: EmbeddingResponse =
                post_json(&self.client, &url, None, &request, "ollama").await?;
            vectors.push(response.embedding);
        }
        Ok(vectors)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &str {
        "ollama"
    }
}
