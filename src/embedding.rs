//! Concrete [`Embedder`] implementations.
//!
//! - **[`DisabledEmbedder`]**: every call fails with [`EmbeddingError::Disabled`].
//! - **[`OpenAIEmbedder`]**: `POST {url}/embeddings` on any OpenAI-compatible API.
//! - **[`OllamaEmbedder`]**: `POST {url}/api/embed` on an Ollama instance.
//! - **`LocalEmbedder`**: fastembed in-process (feature `local-embeddings`).
//!
//! Use [`create_embedder`] to build the one named by the configuration.
//!
//! # Retry Strategy
//!
//! HTTP embedders retry up to `embedding.max_retries` extra times:
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors and timeouts → retry
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)
//!
//! With the default `max_retries = 0` the first failure is returned as is.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;

use ragify_core::embedding::{check_batch, Embedder};
use ragify_core::error::EmbeddingError;

use crate::config::EmbeddingConfig;

const DEFAULT_OPENAI_URL: &str = "https://api.openai.com/v1";
const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// Build the embedder selected by `embedding.provider`.
///
/// | Config Value | Embedder |
/// |-------------|----------|
/// | `"disabled"` | [`DisabledEmbedder`] |
/// | `"openai"` | [`OpenAIEmbedder`] |
/// | `"ollama"` | [`OllamaEmbedder`] |
/// | `"local"` | `LocalEmbedder` (requires `--features local-embeddings`) |
pub fn create_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn Embedder>> {
    match config.provider.as_str() {
        "disabled" => Ok(Arc::new(DisabledEmbedder)),
        "openai" => Ok(Arc::new(OpenAIEmbedder::new(config)?)),
        "ollama" => Ok(Arc::new(OllamaEmbedder::new(config)?)),
        #[cfg(feature = "local-embeddings")]
        "local" => Ok(Arc::new(local::LocalEmbedder::new(config)?)),
        #[cfg(not(feature = "local-embeddings"))]
        "local" => bail!("Local embedding provider requires --features local-embeddings"),
        other => bail!("Unknown embedding provider: {}", other),
    }
}

// ============ Disabled ============

pub struct DisabledEmbedder;

#[async_trait]
impl Embedder for DisabledEmbedder {
    fn model_name(&self) -> &str {
        "disabled"
    }

    fn dims(&self) -> usize {
        0
    }

    async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Err(EmbeddingError::Disabled)
    }
}

// ============ HTTP plumbing ============

fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .context("Failed to build HTTP client")
}

/// POST `body` to `url` and return the parsed JSON body, retrying transient
/// failures `max_retries` times with exponential backoff.
async fn post_json_with_retry(
    client: &reqwest::Client,
    url: &str,
    bearer: Option<&str>,
    body: &serde_json::Value,
    max_retries: u32,
    timeout: Duration,
) -> Result<serde_json::Value, EmbeddingError> {
    let mut last_err = None;

    for attempt in 0..=max_retries {
        if attempt > 0 {
            let delay = Duration::from_secs(1 << (attempt - 1).min(5));
            tracing::debug!(attempt, ?delay, "retrying embedding request");
            tokio::time::sleep(delay).await;
        }

        let mut request = client.post(url).json(body);
        if let Some(key) = bearer {
            request = request.bearer_auth(key);
        }

        match request.send().await {
            Ok(response) => {
                let status = response.status();

                if status.is_success() {
                    return response
                        .json()
                        .await
                        .map_err(|e| EmbeddingError::InvalidResponse(e.to_string()));
                }

                let message = response.text().await.unwrap_or_default();
                let err = EmbeddingError::Api {
                    status: status.as_u16(),
                    message,
                };
                if status.as_u16() == 429 || status.is_server_error() {
                    last_err = Some(err);
                    continue;
                }
                return Err(err);
            }
            Err(e) if e.is_timeout() => last_err = Some(EmbeddingError::Timeout(timeout)),
            Err(e) => last_err = Some(EmbeddingError::Unreachable(format!("{}: {}", url, e))),
        }
    }

    Err(last_err.unwrap_or_else(|| EmbeddingError::Unreachable(url.to_string())))
}

fn json_vector(value: &serde_json::Value) -> Result<Vec<f32>, EmbeddingError> {
    let items = value
        .as_array()
        .ok_or_else(|| EmbeddingError::InvalidResponse("embedding is not an array".into()))?;
    items
        .iter()
        .map(|v| {
            v.as_f64()
                .map(|f| f as f32)
                .ok_or_else(|| EmbeddingError::InvalidResponse("non-numeric embedding value".into()))
        })
        .collect()
}

// ============ OpenAI ============

/// Embedder for the OpenAI embeddings API or a compatible server.
///
/// The API key is read from the environment variable named by
/// `embedding.api_key_env` when the embedder is created.
pub struct OpenAIEmbedder {
    model: String,
    dims: usize,
    endpoint: String,
    api_key: String,
    max_retries: u32,
    timeout: Duration,
    client: reqwest::Client,
}

impl OpenAIEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow::anyhow!("embedding.model required for OpenAI provider"))?;
        let dims = config
            .dims
            .ok_or_else(|| anyhow::anyhow!("embedding.dims required for OpenAI provider"))?;
        let api_key = std::env::var(&config.api_key_env).map_err(|_| EmbeddingError::MissingApiKey {
            env_var: config.api_key_env.clone(),
        })?;
        let base = config.url.as_deref().unwrap_or(DEFAULT_OPENAI_URL);
        let timeout = Duration::from_secs(config.timeout_secs);

        Ok(Self {
            model,
            dims,
            endpoint: format!("{}/embeddings", base.trim_end_matches('/')),
            api_key,
            max_retries: config.max_retries,
            timeout,
            client: http_client(timeout)?,
        })
    }
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let body = serde_json::json!({
            "model": self.model,
            "input": texts,
        });
        let json = post_json_with_retry(
            &self.client,
            &self.endpoint,
            Some(&self.api_key),
            &body,
            self.max_retries,
            self.timeout,
        )
        .await?;
        let vectors = parse_openai_response(&json)?;
        check_batch(&vectors, texts.len(), self.dims)?;
        Ok(vectors)
    }
}

/// Extract `data[].embedding`, ordered by each item's `index` field.
fn parse_openai_response(json: &serde_json::Value) -> Result<Vec<Vec<f32>>, EmbeddingError> {
    let data = json
        .get("data")
        .and_then(|d| d.as_array())
        .ok_or_else(|| EmbeddingError::InvalidResponse("missing data array".into()))?;

    let mut indexed = Vec::with_capacity(data.len());
    for (position, item) in data.iter().enumerate() {
        let index = item
            .get("index")
            .and_then(|i| i.as_u64())
            .map(|i| i as usize)
            .unwrap_or(position);
        let embedding = item
            .get("embedding")
            .ok_or_else(|| EmbeddingError::InvalidResponse("missing embedding".into()))?;
        indexed.push((index, json_vector(embedding)?));
    }
    indexed.sort_by_key(|(index, _)| *index);

    Ok(indexed.into_iter().map(|(_, v)| v).collect())
}

// ============ Ollama ============

/// Embedder backed by a running Ollama instance
/// (e.g. after `ollama pull nomic-embed-text`).
pub struct OllamaEmbedder {
    model: String,
    dims: usize,
    endpoint: String,
    max_retries: u32,
    timeout: Duration,
    client: reqwest::Client,
}

impl OllamaEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow::anyhow!("embedding.model required for Ollama provider"))?;
        let dims = config
            .dims
            .ok_or_else(|| anyhow::anyhow!("embedding.dims required for Ollama provider"))?;
        let base = config.url.as_deref().unwrap_or(DEFAULT_OLLAMA_URL);
        let timeout = Duration::from_secs(config.timeout_secs);

        Ok(Self {
            model,
            dims,
            endpoint: format!("{}/api/embed", base.trim_end_matches('/')),
            max_retries: config.max_retries,
            timeout,
            client: http_client(timeout)?,
        })
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let body = serde_json::json!({
            "model": self.model,
            "input": texts,
        });
        let json = post_json_with_retry(
            &self.client,
            &self.endpoint,
            None,
            &body,
            self.max_retries,
            self.timeout,
        )
        .await?;
        let vectors = parse_ollama_response(&json)?;
        check_batch(&vectors, texts.len(), self.dims)?;
        Ok(vectors)
    }
}

fn parse_ollama_response(json: &serde_json::Value) -> Result<Vec<Vec<f32>>, EmbeddingError> {
    json.get("embeddings")
        .and_then(|e| e.as_array())
        .ok_or_else(|| EmbeddingError::InvalidResponse("missing embeddings array".into()))?
        .iter()
        .map(json_vector)
        .collect()
}

// ============ Local (fastembed) ============

#[cfg(feature = "local-embeddings")]
mod local {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use anyhow::{bail, Result};
    use async_trait::async_trait;

    use ragify_core::embedding::{check_batch, Embedder};
    use ragify_core::error::EmbeddingError;

    use crate::config::EmbeddingConfig;

    const DEFAULT_LOCAL_MODEL: &str = "all-minilm-l6-v2";

    /// In-process embedder. The ONNX model is downloaded on first use and
    /// kept loaded for the lifetime of the embedder.
    pub struct LocalEmbedder {
        model_name: String,
        model: fastembed::EmbeddingModel,
        dims: usize,
        batch_size: usize,
        timeout: Duration,
        loaded: Arc<Mutex<Option<fastembed::TextEmbedding>>>,
    }

    impl LocalEmbedder {
        pub fn new(config: &EmbeddingConfig) -> Result<Self> {
            let model_name = config
                .model
                .clone()
                .unwrap_or_else(|| DEFAULT_LOCAL_MODEL.to_string());
            let (model, default_dims) = resolve_model(&model_name)?;
            Ok(Self {
                model_name,
                model,
                dims: config.dims.unwrap_or(default_dims),
                batch_size: config.batch_size,
                timeout: Duration::from_secs(config.timeout_secs),
                loaded: Arc::new(Mutex::new(None)),
            })
        }
    }

    fn resolve_model(name: &str) -> Result<(fastembed::EmbeddingModel, usize)> {
        use fastembed::EmbeddingModel as M;
        Ok(match name {
            "all-minilm-l6-v2" => (M::AllMiniLML6V2, 384),
            "bge-small-en-v1.5" => (M::BGESmallENV15, 384),
            "bge-base-en-v1.5" => (M::BGEBaseENV15, 768),
            "nomic-embed-text-v1.5" => (M::NomicEmbedTextV15, 768),
            "multilingual-e5-small" => (M::MultilingualE5Small, 384),
            other => bail!("Unknown local embedding model: {}", other),
        })
    }

    #[async_trait]
    impl Embedder for LocalEmbedder {
        fn model_name(&self) -> &str {
            &self.model_name
        }

        fn dims(&self) -> usize {
            self.dims
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            if texts.is_empty() {
                return Ok(Vec::new());
            }
            let texts = texts.to_vec();
            let expected = texts.len();
            let loaded = self.loaded.clone();
            let model = self.model.clone();
            let batch_size = self.batch_size;

            let job = tokio::task::spawn_blocking(move || {
                let mut guard = loaded
                    .lock()
                    .map_err(|_| EmbeddingError::Model("model lock poisoned".into()))?;
                if guard.is_none() {
                    let fresh = fastembed::TextEmbedding::try_new(
                        fastembed::InitOptions::new(model).with_show_download_progress(false),
                    )
                    .map_err(|e| EmbeddingError::Model(e.to_string()))?;
                    *guard = Some(fresh);
                }
                match guard.as_mut() {
                    Some(embedding) => embedding
                        .embed(texts, Some(batch_size))
                        .map_err(|e| EmbeddingError::Model(e.to_string())),
                    None => Err(EmbeddingError::Model("model not loaded".into())),
                }
            });

            let vectors = tokio::time::timeout(self.timeout, job)
                .await
                .map_err(|_| EmbeddingError::Timeout(self.timeout))?
                .map_err(|e| EmbeddingError::Model(e.to_string()))??;
            check_batch(&vectors, expected, self.dims)?;
            Ok(vectors)
        }
    }
}
