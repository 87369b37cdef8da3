//! LLM Client implementations
//!
//! Provides the OpenAI and Ollama generation clients. Provider failures are
//! classified into a structured [`GenerationErrorKind`] from the HTTP status
//! and transport signaling, so callers never have to inspect error text.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use sauce_core::{GenerationErrorKind, LlmClient, LlmConfig, LlmProvider, Result, SauceError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// HTTP client with the configured per-request deadline
fn http_client(timeout_secs: u64) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| SauceError::Config(format!("HTTP client construction failed: {e}")))
}

/// Map an HTTP status to the structured error kind.
fn classify_status(status: StatusCode) -> GenerationErrorKind {
    if status == StatusCode::TOO_MANY_REQUESTS {
        GenerationErrorKind::RateLimited
    } else if status.is_server_error() {
        GenerationErrorKind::Transient
    } else {
        GenerationErrorKind::Unknown
    }
}

fn generation_error(kind: GenerationErrorKind, message: impl Into<String>) -> SauceError {
    SauceError::Generation {
        kind,
        message: message.into(),
    }
}

// ============================================================================
// OpenAI Client
// ============================================================================

/// OpenAI chat-completions client
pub struct OpenAiClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct OpenAiRequest {
    model: String,
    messages: Vec<Message>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

impl OpenAiClient {
    /// Create a new OpenAI client
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        max_tokens: u32,
        temperature: f32,
    ) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: "https://api.openai.com/v1".to_string(),
            model: model.into(),
            max_tokens,
            temperature,
        }
    }

    /// Create from config, applying the configured request timeout. A custom
    /// base URL (Azure or compatible APIs) comes from the same config.
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
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        })
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn generate(&self, system: &str, prompt: &str) -> Result<String> {
        let request = OpenAiRequest {
            model: self.model.clone(),
            messages: vec![
                Message {
                    role: "system".to_string(),
                    content: system.to_string(),
                },
                Message {
                    role: "user".to_string(),
                    content: prompt.to_string(),
                },
            ],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                generation_error(GenerationErrorKind::Transient, format!("Request failed: {e}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(generation_error(
                classify_status(status),
                format!("OpenAI error ({status}): {error_text}"),
            ));
        }

        let result: OpenAiResponse = response.json().await.map_err(|e| {
            generation_error(
                GenerationErrorKind::Unknown,
                format!("Failed to parse response: {e}"),
            )
        })?;

        result
            .choices
            .first()
            .map(|c| c.message.content.clone())
            .ok_or_else(|| {
                generation_error(GenerationErrorKind::Unknown, "No response generated")
            })
    }
}

// ============================================================================
// Ollama Client
// ============================================================================

/// Ollama API client
pub struct OllamaClient {
    client: Client,
    base_url: String,
    model: String,
}

#[derive(Debug, Serialize)]
struct OllamaRequest {
    model: String,
    prompt: String,
    system: String,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    response: String,
}

impl OllamaClient {
    /// Create a new Ollama client
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
            model: config.model.clone(),
        })
    }
}

#[async_trait]
impl LlmClient for OllamaClient {
    async fn generate(&self, system: &str, prompt: &str) -> Result<String> {
        let request = OllamaRequest {
            model: self.model.clone(),
            prompt: prompt.to_string(),
            system: system.to_string(),
            stream: false,
        };

        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                generation_error(
                    GenerationErrorKind::Transient,
                    format!("Ollama request failed: {e}"),
                )
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(generation_error(
                classify_status(status),
                format!("Ollama error ({status}): {error_text}"),
            ));
        }

        let result: OllamaResponse = response.json().await.map_err(|e| {
            generation_error(
                GenerationErrorKind::Unknown,
                format!("Failed to parse Ollama response: {e}"),
            )
        })?;

        Ok(result.response)
    }
}

// ============================================================================
// Factory function
// ============================================================================

/// Create an LLM client from config
pub fn create_llm_client(config: &LlmConfig) -> Result<Box<dyn LlmClient>> {
    match config.provider {
        LlmProvider::OpenAI | LlmProvider::Azure => {
            Ok(Box::new(OpenAiClient::from_config(config)?))
        }
        LlmProvider::Ollama => Ok(Box::new(OllamaClient::from_config(config)?)),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert_eq!(
            classify_status(StatusCode::TOO_MANY_REQUESTS),
            GenerationErrorKind::RateLimited
        );
        assert_eq!(
            classify_status(StatusCode::BAD_GATEWAY),
            GenerationErrorKind::Transient
        );
        assert_eq!(
            classify_status(StatusCode::INTERNAL_SERVER_ERROR),
            GenerationErrorKind::Transient
        );
        assert_eq!(
            classify_status(StatusCode::UNAUTHORIZED),
            GenerationErrorKind::Unknown
        );
    }

    #[test]
    fn test_openai_client_creation() {
        let client = OpenAiClient::new("test-key", "gpt-4o-mini", 512, 0.7);
        assert_eq!(client.model, "gpt-4o-mini");
    }

    #[test]
    fn test_ollama_client_creation() {
        let client = OllamaClient::new("http://localhost:11434", "llama3");
        assert_eq!(client.model, "llama3");
    }

    #[test]
    fn test_from_config_applies_base_url_and_timeout() {
        let config = LlmConfig {
            openai_api_key: Some("k".to_string()),
            openai_base_url: Some("https://azure.example/v1".to_string()),
            timeout_secs: 15,
            ..Default::default()
        };
        let client = OpenAiClient::from_config(&config).unwrap();
        assert_eq!(client.base_url, "https://azure.example/v1");

        assert!(http_client(15).is_ok());
    }

    #[test]
    fn test_missing_api_key_is_config_error() {
        let config = LlmConfig::default();
        assert!(matches!(
            OpenAiClient::from_config(&config),
            Err(SauceError::Config(_))
        ));
    }
}
