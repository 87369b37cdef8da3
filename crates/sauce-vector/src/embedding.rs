//! Embedding providers
//!
//! Turns recipe text into the vectors the document store indexes. Two
//! providers are supported behind one trait; both go through the same
//! request path and surface failures as `SauceError::Embedding`, which the
//! pipelines treat as a degraded per-request condition. No retry happens
//! here.

use async_trait::async_trait;
use reqwest::Client;
use sauce_core::{LlmConfig, LlmProvider, Result, SauceError};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::time::Duration;

/// Trait for embedding generation
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Generate embedding for a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for multiple texts (batch)
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Get embedding dimension
    fn dimension(&self) -> usize;
}

/// HTTP client with the configured per-request deadline
fn http_client(timeout_secs: u64) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| SauceError::Config(format!("HTTP client construction failed: {e}")))
}

/// Single request path shared by both providers: POST a JSON body, demand a
/// 2xx, decode the JSON reply.
async fn post_embedding<B, R>(
    client: &Client,
    url: &str,
    bearer: Option<&str>,
    body: &B,
) -> Result<R>
where
    B: Serialize,
    R: DeserializeOwned,
{
    let mut request = client.post(url).json(body);
    if let Some(key) = bearer {
        request = request.bearer_auth(key);
    }

    let response = request
        .send()
        .await
        .map_err(|e| SauceError::Embedding(format!("embedding request failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        let detail = response.text().await.unwrap_or_default();
        return Err(SauceError::Embedding(format!(
            "embedding provider returned {status}: {detail}"
        )));
    }

    response
        .json()
        .await
        .map_err(|e| SauceError::Embedding(format!("malformed embedding response: {e}")))
}

/// Output width of the known OpenAI embedding models
fn openai_dimension(model: &str) -> usize {
    match model {
        "text-embedding-3-large" => 3072,
        // 3-small, ada-002, and anything unrecognized
        _ => 1536,
    }
}

/// Output width of the common Ollama embedding models
fn ollama_dimension(model: &str) -> usize {
    match model {
        "mxbai-embed-large" => 1024,
        "all-minilm" => 384,
        _ => 768,
    }
}

// ============================================================================
// OpenAI
// ============================================================================

/// OpenAI `/v1/embeddings` client. Batches natively; rows come back indexed
/// and are re-sorted before use.
pub struct OpenAiEmbedding {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

#[derive(Serialize)]
struct EmbeddingsBody<'a> {
    input: &'a [String],
    model: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingsReply {
    data: Vec<EmbeddingRow>,
}

#[derive(Deserialize)]
struct EmbeddingRow {
    index: usize,
    embedding: Vec<f32>,
}

impl OpenAiEmbedding {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: "https://api.openai.com/v1".to_string(),
            model: model.into(),
        }
    }

    /// Create from config, applying the configured request timeout
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let api_key = config
            .openai_api_key
            .as_ref()
            .ok_or_else(|| SauceError::Config("OpenAI API key required".to_string()))?;

        let base_url = config
            .openai_base_url
            .clone()
            .unwrap_or_else(|| "https://api.openai.com/v1".to_string());

        Ok(Self {
            client: http_client(config.timeout_secs)?,
            api_key: api_key.clone(),
            base_url,
            model: config.embedding_model.clone(),
        })
    }
}

#[async_trait]
impl EmbeddingClient for OpenAiEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let results = self.embed_batch(&[text.to_string()]).await?;
        results
            .into_iter()
            .next()
            .ok_or_else(|| SauceError::Embedding("no embedding returned".to_string()))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let body = EmbeddingsBody {
            input: texts,
            model: &self.model,
        };
        let url = format!("{}/embeddings", self.base_url);
        let reply: EmbeddingsReply =
            post_embedding(&self.client, &url, Some(&self.api_key), &body).await?;

        let mut rows = reply.data;
        rows.sort_by_key(|row| row.index);
        Ok(rows.into_iter().map(|row| row.embedding).collect())
    }

    fn dimension(&self) -> usize {
        openai_dimension(&self.model)
    }
}

// ============================================================================
// Ollama
// ============================================================================

/// Ollama `/api/embeddings` client. The API takes one prompt per call, so
/// batching is a sequential loop.
pub struct OllamaEmbedding {
    client: Client,
    base_url: String,
    model: String,
}

#[derive(Serialize)]
struct OllamaBody<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct OllamaReply {
    embedding: Vec<f32>,
}

impl OllamaEmbedding {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            model: model.into(),
        }
    }

    /// Create from config, applying the configured request timeout
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        Ok(Self {
            client: http_client(config.timeout_secs)?,
            base_url: config.ollama_url.clone(),
            model: config.embedding_model.clone(),
        })
    }
}

#[async_trait]
impl EmbeddingClient for OllamaEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let body = OllamaBody {
            model: &self.model,
            prompt: text,
        };
        let url = format!("{}/api/embeddings", self.base_url);
        let reply: OllamaReply = post_embedding(&self.client, &url, None, &body).await?;
        Ok(reply.embedding)
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await?);
        }
        Ok(results)
    }

    fn dimension(&self) -> usize {
        ollama_dimension(&self.model)
    }
}

// ============================================================================
// Factory
// ============================================================================

/// Create an embedding client from config
pub fn create_embedding_client(config: &LlmConfig) -> Result<Box<dyn EmbeddingClient>> {
    match config.provider {
        LlmProvider::OpenAI | LlmProvider::Azure => {
            Ok(Box::new(OpenAiEmbedding::from_config(config)?))
        }
        LlmProvider::Ollama => Ok(Box::new(OllamaEmbedding::from_config(config)?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimension_follows_model_name() {
        assert_eq!(
            OpenAiEmbedding::new("k", "text-embedding-3-small").dimension(),
            1536
        );
        assert_eq!(
            OpenAiEmbedding::new("k", "text-embedding-3-large").dimension(),
            3072
        );
        assert_eq!(
            OllamaEmbedding::new("http://localhost:11434", "nomic-embed-text").dimension(),
            768
        );
        assert_eq!(
            OllamaEmbedding::new("http://localhost:11434", "all-minilm").dimension(),
            384
        );
    }

    #[test]
    fn test_missing_api_key_is_config_error() {
        let config = LlmConfig::default();
        assert!(matches!(
            OpenAiEmbedding::from_config(&config),
            Err(SauceError::Config(_))
        ));
    }

    #[test]
    fn test_client_honors_configured_timeout() {
        assert!(http_client(30).is_ok());

        let config = LlmConfig {
            provider: LlmProvider::Ollama,
            ..Default::default()
        };
        assert!(OllamaEmbedding::from_config(&config).is_ok());
    }

    #[test]
    fn test_embedding_base_url_can_be_overridden() {
        let config = LlmConfig {
            openai_api_key: Some("k".to_string()),
            openai_base_url: Some("https://azure.example/v1".to_string()),
            ..Default::default()
        };
        let client = OpenAiEmbedding::from_config(&config).unwrap();
        assert_eq!(client.base_url, "https://azure.example/v1");
    }
}
