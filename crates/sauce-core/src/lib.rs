//! Sauce Core - Domain models, traits, and shared types
//!
//! This crate defines the core abstractions used throughout the service:
//! - Documents, queries, and answer types
//! - Common error types
//! - The LLM client trait
//! - Configuration management

pub mod config;
pub mod corpus;

pub use config::{
    AppConfig, AuthConfig, ConfigError, DatabaseConfig, LlmConfig, LlmProvider, PipelineConfig,
};
pub use corpus::sample_recipes;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Core error types for RAG operations
#[derive(Error, Debug)]
pub enum SauceError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Generation error ({kind}): {message}")]
    Generation {
        kind: GenerationErrorKind,
        message: String,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, SauceError>;

/// Coarse classification of generation-provider failures.
///
/// Derived from the provider's structured status signaling (HTTP status,
/// transport errors), never from matching error message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationErrorKind {
    /// Quota or rate-limit condition (HTTP 429)
    RateLimited,
    /// Server-side or transport failure that may succeed on a later request
    Transient,
    /// Anything else
    Unknown,
}

impl std::fmt::Display for GenerationErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RateLimited => write!(f, "rate_limited"),
            Self::Transient => write!(f, "transient"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

// ============================================================================
// Document Models
// ============================================================================

/// A recipe document as supplied by the ingestion corpus.
///
/// The `id` is caller-assigned and unique within a collection. Documents are
/// never mutated or deleted; re-ingesting an existing id is a skip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Stable caller-assigned identifier
    pub id: String,

    /// Raw text body
    pub content: String,
}

impl Document {
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
        }
    }
}

/// What the document store holds per document.
///
/// Owned exclusively by the store; the pipelines never cache embeddings.
#[derive(Debug, Clone)]
pub struct StoredRecord {
    pub id: String,
    pub embedding: Vec<f32>,
    pub content: String,
    pub metadata: HashMap<String, String>,
}

impl StoredRecord {
    /// Build a record with the standard `{source: id}` metadata.
    pub fn new(id: impl Into<String>, embedding: Vec<f32>, content: impl Into<String>) -> Self {
        let id = id.into();
        let mut metadata = HashMap::new();
        metadata.insert("source".to_string(), id.clone());
        Self {
            id,
            embedding,
            content: content.into(),
            metadata,
        }
    }
}

/// A single nearest-neighbor match returned by the document store.
#[derive(Debug, Clone)]
pub struct RetrievedDocument {
    /// Document id from the stored `source` metadata, when present
    pub document_id: Option<String>,

    /// Stored text content
    pub content: String,

    /// Distance from the query vector (lower is closer)
    pub distance: f32,
}

// ============================================================================
// Query and Answer Types
// ============================================================================

/// A RAG query request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagQuery {
    /// The natural-language question
    pub text: String,

    /// Requested number of neighbors, bounded [MIN_TOP_K, MAX_TOP_K]
    pub top_k: usize,
}

impl RagQuery {
    pub const MIN_TOP_K: usize = 1;
    pub const MAX_TOP_K: usize = 10;
    pub const DEFAULT_TOP_K: usize = 3;

    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            top_k: Self::DEFAULT_TOP_K,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Boundary validation: out-of-range values are rejected, never clamped.
    pub fn validate(&self) -> Result<()> {
        if self.text.trim().is_empty() {
            return Err(SauceError::Validation(
                "Query text cannot be empty".to_string(),
            ));
        }
        if self.top_k < Self::MIN_TOP_K || self.top_k > Self::MAX_TOP_K {
            return Err(SauceError::Validation(format!(
                "top_k must be between {} and {}, got {}",
                Self::MIN_TOP_K,
                Self::MAX_TOP_K,
                self.top_k
            )));
        }
        Ok(())
    }
}

/// A retrieved recipe ranked for the final answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedRecipe {
    /// 1-based rank in ascending-distance order
    pub rank: usize,

    /// Document id, or a synthesized `recipe_{index}` fallback
    pub recipe_id: String,

    /// Stored text content
    pub content: String,

    /// Derived as round(1 - distance, 4)
    pub similarity_score: f32,
}

/// Why an answer was degraded instead of generated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DegradedReason {
    /// The embedding provider failed; retrieval never ran
    EmbeddingUnavailable,
    /// Retrieval returned zero matches; generation never ran
    NoMatches,
}

/// Result of a RAG query, constructed fresh per request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagAnswer {
    pub query: String,

    /// Generated text, or a degraded-mode explanatory string
    pub answer: String,

    pub retrieved: Vec<RankedRecipe>,

    pub count: usize,

    /// Set when the pipeline short-circuited before generation
    pub degraded: Option<DegradedReason>,
}

impl RagAnswer {
    /// Build a degraded answer with an empty retrieval list.
    pub fn degraded(
        query: impl Into<String>,
        reason: DegradedReason,
        message: impl Into<String>,
    ) -> Self {
        Self {
            query: query.into(),
            answer: message.into(),
            retrieved: Vec::new(),
            count: 0,
            degraded: Some(reason),
        }
    }
}

/// Convert a store distance to the reported similarity score.
pub fn similarity_from_distance(distance: f32) -> f32 {
    ((1.0 - distance) * 10_000.0).round() / 10_000.0
}

// ============================================================================
// Traits
// ============================================================================

/// Trait for generative text clients
#[async_trait::async_trait]
pub trait LlmClient: Send + Sync {
    /// Generate a completion for a system instruction and a user prompt
    async fn generate(&self, system: &str, prompt: &str) -> Result<String>;
}

// ============================================================================
// Tests
// ============================================================================
