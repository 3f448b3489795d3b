//! Cohere embeddings via the `/v1/embed` endpoint.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{http_client, post_json, EmbeddingProvider};
use crate::config::EmbeddingConfig;
use crate::error::Result;

const API_URL: &str = "https://api.cohere.ai/v1/embed";

pub struct CohereProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
    input_type: String,
    dimension: usize,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    texts: &'a [String],
    model: &'a str,
    input_type: &'a str,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

impl CohereProvider {
    pub fn new(config: &EmbeddingConfig) -> Self {
        let model = config.cohere_model.clone();
        let dimension = if model.contains("v3.0") {
            1024
        } else if model.contains("v2.0") {
            4096
        } else {
            warn!(model = %model, "unknown Cohere model, assuming 1024 dimensions");
            1024
        };
        info!(model = %model, dimension, input_type = %config.cohere_input_type, "cohere provider initialized");
        Self {
            client: http_client(),
            api_key: config.cohere_api_key.clone(),
            model,
            input_type: config.cohere_input_type.clone(),
            dimension,
        }
    }
}

#[async_trait]
impl EmbeddingProvider for CohereProvider {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let request = EmbedRequest {
            texts,
            model: &self.model,
            input_type: &self.input_type,
        };
        let response: EmbedResponse = post_json(
            &self.client,
            API_URL,
            Some(&self.api_key),
            &request,
            "cohere",
        )
        .await?;
        Ok(response.embeddings)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &str {
        "cohere"
    }

    /// Cohere caps embed batches at 96 texts.
    fn max_batch(&self) -> usize {
        96
    }
}
