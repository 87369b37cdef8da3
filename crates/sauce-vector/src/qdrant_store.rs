//! Qdrant implementation of the document store
//!
//! Provides connection management and the insert-if-absent / nearest-neighbor
//! operations over a named collection of recipe embeddings.

use async_trait::async_trait;
use qdrant_client::qdrant::{
    CountPointsBuilder, CreateCollectionBuilder, Distance, GetPointsBuilder, PointId, PointStruct,
    SearchPointsBuilder, UpsertPointsBuilder, VectorParamsBuilder,
};
use qdrant_client::Qdrant;
use sauce_core::{DatabaseConfig, Result, RetrievedDocument, SauceError, StoredRecord};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// Qdrant document store.
///
/// Point ids are UUIDv5 hashes of the caller-assigned document id, so the
/// same document always maps to the same point and duplicate upserts
/// overwrite rather than accumulate.
pub struct QdrantStore {
    client: Qdrant,
    collection: String,
    dimension: usize,
}

impl QdrantStore {
    /// Create a new Qdrant connection
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        let client = Qdrant::from_url(&config.qdrant_url)
            .build()
            .map_err(|e| SauceError::Store(format!("Qdrant connection failed: {e}")))?;

        Ok(Self {
            client,
            collection: config.qdrant_collection.clone(),
            dimension: config.vector_dimension,
        })
    }

    /// Initialize collection (run once on setup)
    pub async fn init_collection(&self) -> Result<()> {
        let collections = self
            .client
            .list_collections()
            .await
            .map_err(|e| SauceError::Store(format!("Failed to list collections: {e}")))?;

        let exists = collections
            .collections
            .iter()
            .any(|c| c.name == self.collection);

        if !exists {
            self.client
                .create_collection(
                    CreateCollectionBuilder::new(&self.collection).vectors_config(
                        VectorParamsBuilder::new(self.dimension as u64, Distance::Cosine),
                    ),
                )
                .await
                .map_err(|e| SauceError::Store(format!("Failed to create collection: {e}")))?;
        }

        Ok(())
    }

    /// Deterministic point id for a document id
    fn point_id(document_id: &str) -> Uuid {
        Uuid::new_v5(&Uuid::NAMESPACE_OID, document_id.as_bytes())
    }
}

#[async_trait]
impl super::DocumentStore for QdrantStore {
    async fn existing_ids(&self, ids: &[String]) -> Result<HashSet<String>> {
        if ids.is_empty() {
            return Ok(HashSet::new());
        }

        // Map point uuids back to the document ids they were derived from
        let uuid_to_doc: HashMap<String, String> = ids
            .iter()
            .map(|id| (Self::point_id(id).to_string(), id.clone()))
            .collect();

        let point_ids: Vec<PointId> = uuid_to_doc.keys().cloned().map(PointId::from).collect();

        let response = self
            .client
            .get_points(
                GetPointsBuilder::new(&self.collection, point_ids)
                    .with_payload(false)
                    .with_vectors(false),
            )
            .await
            .map_err(|e| SauceError::Store(format!("Failed to fetch existing ids: {e}")))?;

        let present = response
            .result
            .into_iter()
            .filter_map(|point| {
                let id = point.id?;
                match id.point_id_options {
                    Some(qdrant_client::qdrant::point_id::PointIdOptions::Uuid(u)) => {
                        uuid_to_doc.get(&u).cloned()
                    }
                    _ => None,
                }
            })
            .collect();

        Ok(present)
    }

    async fn upsert(&self, record: &StoredRecord) -> Result<()> {
        let mut payload = serde_json::Map::new();
        payload.insert(
            "content".to_string(),
            serde_json::Value::String(record.content.clone()),
        );
        for (key, value) in &record.metadata {
            payload.insert(key.clone(), serde_json::Value::String(value.clone()));
        }

        let payload_map: HashMap<String, qdrant_client::qdrant::Value> = payload
            .into_iter()
            .map(|(k, v)| (k, v.into()))
            .collect();

        let point = PointStruct::new(
            Self::point_id(&record.id).to_string(),
            record.embedding.clone(),
            payload_map,
        );

        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.collection, vec![point]))
            .await
            .map_err(|e| SauceError::Store(format!("Failed to upsert record: {e}")))?;

        Ok(())
    }

    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<RetrievedDocument>> {
        let results = self
            .client
            .search_points(
                SearchPointsBuilder::new(&self.collection, vector.to_vec(), k as u64)
                    .with_payload(true),
            )
            .await
            .map_err(|e| SauceError::Store(format!("Vector search failed: {e}")))?;

        // Qdrant returns cosine similarity scores in descending order;
        // distance = 1 - score keeps the ascending-distance contract.
        let retrieved = results
            .result
            .into_iter()
            .map(|point| {
                let content = point
                    .payload
                    .get("content")
                    .and_then(|v| v.as_str())
                    .map(|s| s.to_string())
                    .unwrap_or_default();

                let document_id = point
                    .payload
                    .get("source")
                    .and_then(|v| v.as_str())
                    .map(|s| s.to_string());

                RetrievedDocument {
                    document_id,
                    content,
                    distance: 1.0 - point.score,
                }
            })
            .collect();

        Ok(retrieved)
    }

    async fn count(&self) -> Result<u64> {
        let response = self
            .client
            .count(CountPointsBuilder::new(&self.collection).exact(true))
            .await
            .map_err(|e| SauceError::Store(format!("Failed to count records: {e}")))?;

        Ok(response.result.map(|r| r.count).unwrap_or(0))
    }
}
