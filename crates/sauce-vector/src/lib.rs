//! Sauce Vector - Embedding clients and document store abstraction
//!
//! Provides the embedding provider clients (OpenAI, Ollama) and the
//! document store adapter (Qdrant) used by the ingestion and query
//! pipelines.

use async_trait::async_trait;
use sauce_core::{Result, RetrievedDocument, StoredRecord};
use std::collections::HashSet;

pub mod embedding;
pub mod qdrant_store;

pub use embedding::{create_embedding_client, EmbeddingClient, OllamaEmbedding, OpenAiEmbedding};
pub use qdrant_store::QdrantStore;

/// Trait for document store operations over a named collection
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Return the subset of `ids` already present in the collection.
    ///
    /// A single round trip regardless of how many ids are checked; this is
    /// what keeps ingestion idempotence cheap.
    async fn existing_ids(&self, ids: &[String]) -> Result<HashSet<String>>;

    /// Insert a record.
    ///
    /// Upserting an id that is already present overwrites the record. The
    /// ingestion pipeline filters duplicates before calling, so that path is
    /// never exercised by it.
    async fn upsert(&self, record: &StoredRecord) -> Result<()>;

    /// Up to `k` nearest records, ordered by ascending distance.
    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<RetrievedDocument>>;

    /// Total records in the collection. Used only for health reporting.
    async fn count(&self) -> Result<u64>;
}
