//! HuggingFace embeddings — hosted Inference API or a local
//! text-embeddings-inference server selected via base URL.

use async_trait::async_trait;
use serde::Serialize;
use tracing::{info, warn};

use super::{http_client, post_json, EmbeddingProvider};
use crate::config::EmbeddingConfig;
use crate::error::{MemoryError, Result};

const HOSTED_API: &str = "https://api-inference.huggingface.co/models";

pub struct HuggingFaceProvider {
    client: reqwest::Client,
    url: String,
    api_key: Option<String>,
    model: String,
    dimension: usize,
}

#[derive(Serialize)]
struct FeatureRequest<'a> {
    inputs: &'a [String],
}

impl HuggingFaceProvider {
    pub fn new(config: &EmbeddingConfig) -> Self {
        let model = config.huggingface_model.clone();
        let dimension = [
            ("all-MiniLM-L6-v2", 384),
            ("all-MiniLM-L12-v2", 384),
            ("all-mpnet-base-v2", 768),
            ("bge-large", 1024),
            ("bge-base", 768),
        ]
        .iter()
        .find(|(name, _)| model.contains(name))
        .map(|(_, dim)| *dim)
        .unwrap_or_else(|| {
            warn!(model = %model, "unknown HuggingFace model, using configured dimension");
            config.dimension
        });

        let (url, api_key) = if config.huggingface_base_url.is_empty() {
            (
                format!("{HOSTED_API}/{model}"),
                Some(config.huggingface_api_key.clone()),
            )
        } else {
            // Local TEI-style server; no token needed.
            (
                format!(
                    "{}/embed",
                    config.huggingface_base_url.trim_end_matches('/')
                ),
                None,
            )
        };

        info!(url = %url, model = %model, dimension, "huggingface provider initialized");
        Self {
            client: http_client(),
            url,
            api_key,
            model,
            dimension,
        }
    }
}

#[async_trait]
impl EmbeddingProvider for HuggingFaceProvider {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let request = FeatureRequest { inputs: texts };
        // Both the hosted feature-extraction pipeline and TEI return a
        // vector per input; single-input responses may come back flat.
        let response: serde_json::Value = post_json(
            &self.client,
            &self.url,
            self.api_key.as_deref(),
            &request,
            "huggingface",
        )
        .await?;

        parse_vectors(response, texts.len()).ok_or_else(|| {
            MemoryError::ProviderInvalid(format!(
                "huggingface returned an unexpected shape for model {}",
                self.model
            ))
        })
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &str {
        "huggingface"
    }
}

/// Accepts `[[f32…]…]` or, for a single input, a flat `[f32…]`.
fn parse_vectors(value: serde_json::Value, inputs: usize) -> Option<Vec<Vec<f32>>> {
    let outer = value.as_array()?;
    if outer.is_empty() {
        return Some(Vec::new());
    }
    if outer[0].is_array() {
        outer
            .iter()
            .map(|row| {
                row.as_array()?
                    .iter()
                    .map(|v| v.as_f64().map(|f| f as f32))
                    .collect::<Option<Vec<f32>>>()
            })
            .collect()
    } else if inputs == 1 {
        let flat: Option<Vec<f32>> = outer
            .iter()
            .map(|v| v.as_f64().map(|f| f as f32))
            .collect();
        flat.map(|v| vec![v])
    } else {
        None
    }
}
