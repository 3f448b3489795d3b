//! LiteLLM proxy embeddings — an OpenAI-compatible `/embeddings` endpoint
//! fronting 100+ upstream models, so the dimension comes from configuration
//! rather than the model name.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{http_client, post_json, EmbeddingProvider};
use crate::config::EmbeddingConfig;
use crate::error::Result;

pub struct LiteLlmProvider {
    client: reqwest::Client,
    url: String,
    model: String,
    dimension: usize,
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
    embedding: Vec<f32>,
}

impl LiteLlmProvider {
    pub fn new(config: &EmbeddingConfig) -> Self {
        let url = format!(
            "{}/embeddings",
            config.litellm_base_url.trim_end_matches('/')
        );
        info!(url = %url, model = %config.litellm_model, dimension = config.dimension, "litellm provider initialized");
        Self {
            client: http_client(),
            url,
            model: config.litellm_model.clone(),
            dimension: config.dimension,
        }
    }
}

#[async_trait]
impl EmbeddingProvider for LiteLlmProvider {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let request = EmbeddingRequest {
            model: &self.model,
            input: texts,
        };
        let response: EmbeddingResponse =
            post_json(&self.client, &self.url, None, &request, "litellm").await?;
        Ok(response.data.into_iter().map(|d| d.embedding).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &str {
        "litellm"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dimension_comes_from_config() {
        let mut config = EmbeddingConfig::default();
        config.dimension = 3072;
        assert_eq!(LiteLlmProvider::new(&config).dimension(), 3072);
    }

    #[test]
    fn endpoint_built_from_base_url() {
        let mut config = EmbeddingConfig::default();
        config.litellm_base_url = "http://proxy:4000/".into();
        assert_eq!(
            LiteLlmProvider::new(&config).url,
            "http://proxy:4000/embeddings"
        );
    }
}
