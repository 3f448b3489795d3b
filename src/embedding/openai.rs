//! OpenAI embeddings via the `/v1/embeddings` endpoint.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{http_client, post_json, EmbeddingProvider};
use crate::config::EmbeddingConfig;
use crate::error::Result;

const API_URL: &str = "https://api.openai.com/v1/embeddings";

pub struct OpenAiProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
    dimension: usize,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
    encoding_format: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

impl OpenAiProvider {
    pub fn new(config: &EmbeddingConfig) -> Self {
        let model = config.openai_model.clone();
        let dimension = if model.contains("text-embedding-3-large") {
            3072
        } else if model.contains("text-embedding-3-small")
            || model.contains("text-embedding-ada-002")
        {
            1536
        } else {
            warn!(model = %model, "unknown OpenAI model, assuming 1536 dimensions");
            1536
        };
        info!(model = %model, dimension, "openai provider initialized");
        Self {
            client: http_client(),
            api_key: config.openai_api_key.clone(),
            model,
            dimension,
        }
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiProvider {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let request = EmbeddingRequest {
            model: &self.model,
            input: texts,
            encoding_format: "float",
        };
        let response: EmbeddingResponse = post_json(
            &self.client,
            API_URL,
            Some(&self.api_key),
            &request,
            "openai",
        )
        .await?;
        // OpenAI returns results in input order.
        Ok(response.data.into_iter().map(|d| d.embedding).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &str {
        "openai"
    }
}
