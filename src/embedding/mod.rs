//! Text-to-vector embedding adapters.
//!
//! Five providers sit behind one async trait; [`Embedder`] wraps whichever
//! one is configured and adds the cross-cutting behavior: splitting large
//! inputs into provider-sized batches, retrying transient failures with
//! exponential backoff and jitter, and rejecting any response whose vector
//! length disagrees with the reported dimension.

pub mod cohere;
pub mod huggingface;
pub mod litellm;
pub mod ollama;
pub mod openai;

use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::EmbeddingConfig;
use crate::error::{MemoryError, Result};

/// One embedding backend. `embed_batch` is a single provider round trip and
/// receives at most [`EmbeddingProvider::max_batch`] texts.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Length of every vector this provider produces.
    fn dimension(&self) -> usize;

    /// Provider identifier for logs and diagnostics.
    fn name(&self) -> &str;

    /// Largest batch a single round trip may carry.
    fn max_batch(&self) -> usize {
        100
    }
}

/// Configured embedding pipeline: batching, retry, and dimension checks
/// over the selected provider.
pub struct Embedder {
    provider: Box<dyn EmbeddingProvider>,
    max_retries: u32,
}

impl Embedder {
    pub fn new(provider: Box<dyn EmbeddingProvider>, max_retries: u32) -> Self {
        Self {
            provider,
            max_retries,
        }
    }

    pub fn dimension(&self) -> usize {
        self.provider.dimension()
    }

    pub fn name(&self) -> &str {
        self.provider.name()
    }

    /// Embed any number of texts, preserving input order.
    pub async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let batch_size = self.provider.max_batch().max(1);
        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(batch_size) {
            let embeddings = self.embed_with_retry(batch).await?;
            if embeddings.len() != batch.len() {
                return Err(MemoryError::ProviderInvalid(format!(
                    "{} returned {} vectors for {} inputs",
                    self.provider.name(),
                    embeddings.len(),
                    batch.len()
                )));
            }
            for embedding in &embeddings {
                if embedding.len() != self.provider.dimension() {
                    return Err(MemoryError::ProviderInvalid(format!(
                        "{} returned a {}-dimension vector, expected {}",
                        self.provider.name(),
                        embedding.len(),
                        self.provider.dimension()
                    )));
                }
            }
            vectors.extend(embeddings);
            debug!(
                provider = self.provider.name(),
                batch = batch.len(),
                "embeddings generated"
            );
        }
        Ok(vectors)
    }

    /// Embed a single text.
    pub async fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        let texts = [text.to_string()];
        self.embed(&texts).await?.pop().ok_or_else(|| {
            MemoryError::ProviderInvalid(format!(
                "{} returned an empty response",
                self.provider.name()
            ))
        })
    }

    async fn embed_with_retry(&self, batch: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut attempt = 0u32;
        loop {
            match self.provider.embed_batch(batch).await {
                Ok(vectors) => return Ok(vectors),
                Err(e) if e.is_transient() && attempt < self.max_retries => {
                    attempt += 1;
                    let backoff = backoff_with_jitter(attempt);
                    warn!(
                        provider = self.provider.name(),
                        attempt,
                        delay_ms = backoff.as_millis() as u64,
                        error = %e,
                        "embedding call failed, retrying"
                    );
                    tokio::time::sleep(backoff).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Exponential backoff with up to 250ms of jitter.
fn backoff_with_jitter(attempt: u32) -> Duration {
    let base = Duration::from_millis(500) * 2u32.saturating_pow(attempt.saturating_sub(1));
    base + Duration::from_millis(rand::thread_rng().gen_range(0..250))
}

/// Build the configured provider and wrap it in an [`Embedder`].
pub fn create_embedder(config: &EmbeddingConfig) -> anyhow::Result<Embedder> {
    let provider: Box<dyn EmbeddingProvider> = match config.provider.as_str() {
        "openai" => Box::new(openai::OpenAiProvider::new(config)),
        "cohere" => Box::new(cohere::CohereProvider::new(config)),
        "ollama" => Box::new(ollama::OllamaProvider::new(config)),
        "huggingface" => Box::new(huggingface::HuggingFaceProvider::new(config)),
        "litellm" => Box::new(litellm::LiteLlmProvider::new(config)),
        other => anyhow::bail!(
            "unknown embedding provider: {other}. Supported: openai, cohere, ollama, huggingface, litellm"
        ),
    };
    Ok(Embedder::new(provider, config.max_retries))
}

/// Shared HTTP client with a timeout suitable for embedding calls.
pub(crate) fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(60))
        .build()
        .expect("reqwest client")
}

/// POST a JSON body and decode a JSON response, mapping transport and
/// status failures onto the provider error kinds.
pub(crate) async fn post_json<T: DeserializeOwned>(
    client: &reqwest::Client,
    url: &str,
    bearer_token: Option<&str>,
    body: &impl Serialize,
    provider: &str,
) -> Result<T> {
    let mut request = client.post(url).json(body);
    if let Some(token) = bearer_token {
        request = request.bearer_auth(token);
    }

    let response = request.send().await.map_err(|e| {
        MemoryError::ProviderUnavailable(format!("{provider} request failed: {e}"))
    })?;

    let status = response.status();
    if status.is_server_error() || status.as_u16() == 429 {
        return Err(MemoryError::ProviderUnavailable(format!(
            "{provider} returned {status}"
        )));
    }
    if !status.is_success() {
        let detail = response.text().await.unwrap_or_default();
        return Err(MemoryError::ProviderInvalid(format!(
            "{provider} returned {status}: {detail}"
        )));
    }

    response.json::<T>().await.map_err(|e| {
        MemoryError::ProviderInvalid(format!("{provider} response decode failed: {e}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Provider that fails transiently a fixed number of times, then
    /// returns constant vectors.
    struct FlakyProvider {
        failures: AtomicU32,
        dimension: usize,
    }

    #[async_trait]
    impl EmbeddingProvider for FlakyProvider {
        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            if self.failures.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                if n > 0 {
                    Some(n - 1)
                } else {
                    None
                }
            })
            .is_ok()
            {
                return Err(MemoryError::ProviderUnavailable("flaky".into()));
            }
            Ok(texts.iter().map(|_| vec![0.5; self.dimension]).collect())
        }

        fn dimension(&self) -> usize {
            self.dimension
        }

        fn name(&self) -> &str {
            "flaky"
        }

        fn max_batch(&self) -> usize {
            2
        }
    }

    #[tokio::test]
    async fn retries_transient_failures() {
        let embedder = Embedder::new(
            Box::new(FlakyProvider {
                failures: AtomicU32::new(2),
                dimension: 4,
            }),
            3,
        );
        let texts = vec!["a".to_string()];
        let vectors = embedder.embed(&texts).await.unwrap();
        assert_eq!(vectors.len(), 1);
        assert_eq!(vectors[0].len(), 4);
    }

    #[tokio::test]
    async fn gives_up_after_max_retries() {
        let embedder = Embedder::new(
            Box::new(FlakyProvider {
                failures: AtomicU32::new(10),
                dimension: 4,
            }),
            2,
        );
        let texts = vec!["a".to_string()];
        let err = embedder.embed(&texts).await.unwrap_err();
        assert!(matches!(err, MemoryError::ProviderUnavailable(_)));
    }

    #[tokio::test]
    async fn splits_into_provider_batches() {
        let embedder = Embedder::new(
            Box::new(FlakyProvider {
                failures: AtomicU32::new(0),
                dimension: 4,
            }),
            0,
        );
        let texts: Vec<String> = (0..5).map(|i| format!("text {i}")).collect();
        let vectors = embedder.embed(&texts).await.unwrap();
        assert_eq!(vectors.len(), 5);
    }

    /// Provider that lies about its dimension.
    struct WrongDimProvider;

    #[async_trait]
    impl EmbeddingProvider for WrongDimProvider {
        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![0.1; 3]).collect())
        }

        fn dimension(&self) -> usize {
            8
        }

        fn name(&self) -> &str {
            "wrong-dim"
        }
    }

    #[tokio::test]
    async fn dimension_mismatch_is_provider_invalid() {
        let embedder = Embedder::new(Box::new(WrongDimProvider), 0);
        let texts = vec!["a".to_string()];
        let err = embedder.embed(&texts).await.unwrap_err();
        assert!(matches!(err, MemoryError::ProviderInvalid(_)));
    }

    #[tokio::test]
    async fn empty_input_is_empty_output() {
        let embedder = Embedder::new(
            Box::new(FlakyProvider {
                failures: AtomicU32::new(5),
                dimension: 4,
            }),
            0,
        );
        assert!(embedder.embed(&[]).await.unwrap().is_empty());
    }

    #[test]
    fn unknown_provider_rejected() {
        let mut config = EmbeddingConfig::default();
        config.provider = "nope".into();
        assert!(create_embedder(&config).is_err());
    }

    #[test]
    fn backoff_grows_with_attempts() {
        let first = backoff_with_jitter(1);
        let third = backoff_with_jitter(3);
        assert!(first >= Duration::from_millis(500));
        assert!(third >= Duration::from_millis(2000));
    }
}
