//! Sauce RAG - Retrieval-Augmented Generation pipelines
//!
//! This crate implements the orchestration core:
//! - The ingestion pipeline: deduplicating load of a fixed recipe corpus
//!   into the document store, embedding each document on the way in.
//! - The query pipeline: embed the question, retrieve nearest recipes,
//!   generate an answer conditioned on their content.
//!
//! Every provider failure inside the query pipeline degrades the per-request
//! result instead of propagating; nothing here retries.

use sauce_core::{
    similarity_from_distance, DegradedReason, Document, GenerationErrorKind, LlmClient,
    RagAnswer, RagQuery, RankedRecipe, Result, RetrievedDocument, SauceError, StoredRecord,
};
use sauce_vector::{DocumentStore, EmbeddingClient};
use std::sync::Arc;

pub mod llm;

pub use llm::{create_llm_client, OllamaClient, OpenAiClient};

// ============================================================================
// Prompt
// ============================================================================

/// System instruction establishing "answer from provided context only".
pub const SYSTEM_INSTRUCTION: &str =
    "You are a helpful assistant that answers questions based on the provided context.";

/// Degraded-mode answer when the query embedding cannot be produced.
pub const EMBEDDING_UNAVAILABLE_MESSAGE: &str =
    "Could not generate an embedding for the query. This might be due to API quota issues \
     or connection problems.";

/// Degraded-mode answer when retrieval finds nothing.
pub const NO_MATCHES_MESSAGE: &str =
    "No relevant recipes found. This might be due to API quota issues or connection problems.";

/// Substitute answer when the generation provider reports a quota condition.
pub const QUOTA_EXCEEDED_MESSAGE: &str =
    "OpenAI API quota exceeded. Please check your billing and usage limits.";

/// Substitute answer for any other generation failure.
pub const GENERATION_FAILED_MESSAGE: &str =
    "Sorry, I couldn't generate an answer due to an API error.";

/// Build the user turn: retrieved contents joined in ranked order with a
/// blank-line separator, followed by the question.
fn build_prompt(question: &str, retrieved: &[RetrievedDocument]) -> String {
    let context = retrieved
        .iter()
        .map(|doc| doc.content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "Based on the following context documents, please answer the question.\n\n\
         Context:\n{context}\n\nQuestion: {question}\n\nAnswer:"
    )
}

// ============================================================================
// Pipeline
// ============================================================================

/// The RAG pipeline: one instance constructed at startup, dependency-injected
/// into every request handler, read-only thereafter.
pub struct RagPipeline {
    embedder: Arc<dyn EmbeddingClient>,
    store: Arc<dyn DocumentStore>,
    llm: Arc<dyn LlmClient>,
}

impl RagPipeline {
    /// Create a new pipeline over the given collaborators
    pub fn new(
        embedder: Arc<dyn EmbeddingClient>,
        store: Arc<dyn DocumentStore>,
        llm: Arc<dyn LlmClient>,
    ) -> Self {
        Self {
            embedder,
            store,
            llm,
        }
    }

    /// Load a corpus into the document store, skipping ids already present.
    ///
    /// Returns the count of newly added documents. Running twice over the
    /// same corpus adds nothing the second time. A document whose embedding
    /// fails is dropped from this pass and the batch continues; a store
    /// failure aborts the pass.
    pub async fn ingest(&self, corpus: &[Document]) -> Result<usize> {
        let ids: Vec<String> = corpus.iter().map(|doc| doc.id.clone()).collect();

        // One round trip for the whole corpus
        let present = self.store.existing_ids(&ids).await?;

        let mut added = 0;
        for doc in corpus {
            if present.contains(&doc.id) {
                tracing::info!(id = %doc.id, "document already exists, skipping");
                continue;
            }

            let embedding = match self.embedder.embed(&doc.content).await {
                Ok(vector) => vector,
                Err(e) => {
                    tracing::warn!(id = %doc.id, error = %e, "embedding failed, dropping document from this pass");
                    continue;
                }
            };

            let record = StoredRecord::new(&doc.id, embedding, &doc.content);
            self.store.upsert(&record).await?;
            tracing::info!(id = %doc.id, "added document");
            added += 1;
        }

        if added > 0 {
            tracing::info!(added, "ingestion added new documents");
        } else {
            tracing::info!("all documents already present");
        }

        Ok(added)
    }

    /// Answer a question over the ingested corpus.
    ///
    /// Linear state machine: embed, retrieve, generate, assemble. Every
    /// failure along the way maps to a degraded result; this method never
    /// returns an error.
    pub async fn answer(&self, query: &RagQuery) -> RagAnswer {
        // 1. Embed the question
        let vector = match self.embedder.embed(&query.text).await {
            Ok(vector) => vector,
            Err(e) => {
                tracing::warn!(error = %e, "query embedding unavailable");
                return RagAnswer::degraded(
                    &query.text,
                    DegradedReason::EmbeddingUnavailable,
                    EMBEDDING_UNAVAILABLE_MESSAGE,
                );
            }
        };

        // 2. Retrieve nearest documents
        let retrieved = match self.store.query(&vector, query.top_k).await {
            Ok(documents) => documents,
            Err(e) => {
                tracing::warn!(error = %e, "retrieval failed");
                Vec::new()
            }
        };

        // An empty result set is a valid outcome; no generation call is made.
        if retrieved.is_empty() {
            return RagAnswer::degraded(&query.text, DegradedReason::NoMatches, NO_MATCHES_MESSAGE);
        }

        // 3. Generate
        let prompt = build_prompt(&query.text, &retrieved);
        let answer = match self.llm.generate(SYSTEM_INSTRUCTION, &prompt).await {
            Ok(text) => text.trim().to_string(),
            Err(SauceError::Generation {
                kind: GenerationErrorKind::RateLimited,
                message,
            }) => {
                tracing::warn!(error = %message, "generation rate limited");
                QUOTA_EXCEEDED_MESSAGE.to_string()
            }
            Err(e) => {
                tracing::warn!(error = %e, "generation failed");
                GENERATION_FAILED_MESSAGE.to_string()
            }
        };

        // 4. Assemble
        let ranked = rank_documents(&retrieved);
        let count = ranked.len();

        RagAnswer {
            query: query.text.clone(),
            answer,
            retrieved: ranked,
            count,
            degraded: None,
        }
    }

    /// Total documents in the store. Used by health reporting only.
    pub async fn document_count(&self) -> Result<u64> {
        self.store.count().await
    }
}

/// Rank retrieved documents 1..N in retrieval order (ascending distance),
/// deriving the reported similarity and falling back to a synthesized id
/// when the stored metadata lacks a source field.
fn rank_documents(retrieved: &[RetrievedDocument]) -> Vec<RankedRecipe> {
    retrieved
        .iter()
        .enumerate()
        .map(|(index, doc)| RankedRecipe {
            rank: index + 1,
            recipe_id: doc
                .document_id
                .clone()
                .unwrap_or_else(|| format!("recipe_{index}")),
            content: doc.content.clone(),
            similarity_score: similarity_from_distance(doc.distance),
        })
        .collect()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use proptest::prelude::*;
    use sauce_core::Result;
    use std::collections::{HashMap, HashSet};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    // ------------------------------------------------------------------
    // Fakes
    // ------------------------------------------------------------------

    /// Embedder returning canned vectors, with a hash-derived fallback so
    /// any text embeds deterministically.
    struct FakeEmbedder {
        vectors: HashMap<String, Vec<f32>>,
        fail: bool,
        calls: AtomicUsize,
    }

    impl FakeEmbedder {
        fn new() -> Self {
            Self {
                vectors: HashMap::new(),
                fail: false,
                calls: AtomicUsize::new(0),
            }
        }

        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::new()
            }
        }

        fn with_vector(mut self, text: &str, vector: Vec<f32>) -> Self {
            self.vectors.insert(text.to_string(), vector);
            self
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    fn hash_vector(text: &str) -> Vec<f32> {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);
        let h = hasher.finish();
        vec![
            (h & 0xffff) as f32 + 1.0,
            ((h >> 16) & 0xffff) as f32 + 1.0,
            ((h >> 32) & 0xffff) as f32 + 1.0,
        ]
    }

    #[async_trait]
    impl EmbeddingClient for FakeEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(SauceError::Embedding("provider down".to_string()));
            }
            Ok(self
                .vectors
                .get(text)
                .cloned()
                .unwrap_or_else(|| hash_vector(text)))
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            let mut out = Vec::with_capacity(texts.len());
            for text in texts {
                out.push(self.embed(text).await?);
            }
            Ok(out)
        }

        fn dimension(&self) -> usize {
            3
        }
    }

    /// In-memory document store using cosine distance.
    struct MemoryStore {
        records: Mutex<HashMap<String, StoredRecord>>,
        query_calls: AtomicUsize,
    }

    impl MemoryStore {
        fn new() -> Self {
            Self {
                records: Mutex::new(HashMap::new()),
                query_calls: AtomicUsize::new(0),
            }
        }

        fn query_count(&self) -> usize {
            self.query_calls.load(Ordering::SeqCst)
        }
    }

    fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
        let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
        let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm_a == 0.0 || norm_b == 0.0 {
            return 1.0;
        }
        1.0 - dot / (norm_a * norm_b)
    }

    #[async_trait]
    impl DocumentStore for MemoryStore {
        async fn existing_ids(&self, ids: &[String]) -> Result<HashSet<String>> {
            let records = self.records.lock().unwrap();
            Ok(ids
                .iter()
                .filter(|id| records.contains_key(*id))
                .cloned()
                .collect())
        }

        async fn upsert(&self, record: &StoredRecord) -> Result<()> {
            self.records
                .lock()
                .unwrap()
                .insert(record.id.clone(), record.clone());
            Ok(())
        }

        async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<RetrievedDocument>> {
            self.query_calls.fetch_add(1, Ordering::SeqCst);
            let records = self.records.lock().unwrap();
            let mut scored: Vec<RetrievedDocument> = records
                .values()
                .map(|record| RetrievedDocument {
                    document_id: record.metadata.get("source").cloned(),
                    content: record.content.clone(),
                    distance: cosine_distance(&record.embedding, vector),
                })
                .collect();
            scored.sort_by(|a, b| a.distance.partial_cmp(&b.distance).unwrap());
            scored.truncate(k);
            Ok(scored)
        }

        async fn count(&self) -> Result<u64> {
            Ok(self.records.lock().unwrap().len() as u64)
        }
    }

    /// Store returning a preset result list regardless of the query vector.
    struct StubStore {
        results: Vec<RetrievedDocument>,
    }

    #[async_trait]
    impl DocumentStore for StubStore {
        async fn existing_ids(&self, _ids: &[String]) -> Result<HashSet<String>> {
            Ok(HashSet::new())
        }

        async fn upsert(&self, _record: &StoredRecord) -> Result<()> {
            Ok(())
        }

        async fn query(&self, _vector: &[f32], k: usize) -> Result<Vec<RetrievedDocument>> {
            Ok(self.results.iter().take(k).cloned().collect())
        }

        async fn count(&self) -> Result<u64> {
            Ok(self.results.len() as u64)
        }
    }

    enum LlmBehavior {
        Answer(String),
        Fail(GenerationErrorKind),
    }

    struct CountingLlm {
        behavior: LlmBehavior,
        calls: AtomicUsize,
    }

    impl CountingLlm {
        fn answering(text: &str) -> Self {
            Self {
                behavior: LlmBehavior::Answer(text.to_string()),
                calls: AtomicUsize::new(0),
            }
        }

        fn failing(kind: GenerationErrorKind) -> Self {
            Self {
                behavior: LlmBehavior::Fail(kind),
                calls: AtomicUsize::new(0),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl LlmClient for CountingLlm {
        async fn generate(&self, _system: &str, _prompt: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.behavior {
                LlmBehavior::Answer(text) => Ok(text.clone()),
                LlmBehavior::Fail(kind) => Err(SauceError::Generation {
                    kind: *kind,
                    message: "generation failed".to_string(),
                }),
            }
        }
    }

    fn pipeline(
        embedder: Arc<FakeEmbedder>,
        store: Arc<dyn DocumentStore>,
        llm: Arc<CountingLlm>,
    ) -> RagPipeline {
        RagPipeline::new(embedder, store, llm)
    }

    fn three_doc_corpus() -> Vec<Document> {
        vec![
            Document::new("doc1", "garlic sauce with yogurt"),
            Document::new("doc2", "dill sauce for fish"),
            Document::new("doc3", "tomato sauce for pasta"),
        ]
    }

    // ------------------------------------------------------------------
    // Ingestion
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn test_ingest_is_idempotent() {
        let embedder = Arc::new(FakeEmbedder::new());
        let store = Arc::new(MemoryStore::new());
        let llm = Arc::new(CountingLlm::answering("ok"));
        let pipeline = pipeline(embedder, store.clone(), llm);

        let corpus = three_doc_corpus();

        let added = pipeline.ingest(&corpus).await.unwrap();
        assert_eq!(added, 3);
        assert_eq!(store.count().await.unwrap(), 3);

        let added_again = pipeline.ingest(&corpus).await.unwrap();
        assert_eq!(added_again, 0);
        assert_eq!(store.count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_ingest_drops_documents_whose_embedding_fails() {
        let embedder = Arc::new(FakeEmbedder::failing());
        let store = Arc::new(MemoryStore::new());
        let llm = Arc::new(CountingLlm::answering("ok"));
        let pipeline = pipeline(embedder, store.clone(), llm);

        // All embeddings fail: nothing added, nothing aborted
        let added = pipeline.ingest(&three_doc_corpus()).await.unwrap();
        assert_eq!(added, 0);
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_ingest_stores_source_metadata() {
        let embedder = Arc::new(FakeEmbedder::new());
        let store = Arc::new(MemoryStore::new());
        let llm = Arc::new(CountingLlm::answering("ok"));
        let pipeline = pipeline(embedder, store.clone(), llm);

        pipeline.ingest(&three_doc_corpus()).await.unwrap();

        let records = store.records.lock().unwrap();
        let record = records.get("doc1").unwrap();
        assert_eq!(record.metadata.get("source"), Some(&"doc1".to_string()));
    }

    // ------------------------------------------------------------------
    // Query pipeline
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn test_degraded_on_embedding_failure_skips_retrieval_and_generation() {
        let embedder = Arc::new(FakeEmbedder::failing());
        let store = Arc::new(MemoryStore::new());
        let llm = Arc::new(CountingLlm::answering("ok"));
        let pipeline = pipeline(embedder, store.clone(), llm.clone());

        let answer = pipeline.answer(&RagQuery::new("anything")).await;

        assert_eq!(answer.degraded, Some(DegradedReason::EmbeddingUnavailable));
        assert_eq!(answer.answer, EMBEDDING_UNAVAILABLE_MESSAGE);
        assert!(answer.retrieved.is_empty());
        assert_eq!(store.query_count(), 0);
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn test_degraded_on_empty_retrieval_skips_generation() {
        let embedder = Arc::new(FakeEmbedder::new());
        let store = Arc::new(MemoryStore::new()); // empty store
        let llm = Arc::new(CountingLlm::answering("ok"));
        let pipeline = pipeline(embedder, store, llm.clone());

        let answer = pipeline.answer(&RagQuery::new("anything")).await;

        assert_eq!(answer.degraded, Some(DegradedReason::NoMatches));
        assert_eq!(answer.answer, NO_MATCHES_MESSAGE);
        assert_eq!(answer.count, 0);
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn test_ranking_and_similarity_derivation() {
        let results = vec![
            RetrievedDocument {
                document_id: Some("doc2".to_string()),
                content: "dill sauce".to_string(),
                distance: 0.1234,
            },
            RetrievedDocument {
                document_id: Some("doc1".to_string()),
                content: "garlic sauce".to_string(),
                distance: 0.25,
            },
            RetrievedDocument {
                document_id: None,
                content: "unlabeled".to_string(),
                distance: 0.8,
            },
        ];
        let embedder = Arc::new(FakeEmbedder::new());
        let store = Arc::new(StubStore { results });
        let llm = Arc::new(CountingLlm::answering("an answer"));
        let pipeline = pipeline(embedder, store, llm);

        let answer = pipeline.answer(&RagQuery::new("which sauce?")).await;

        assert_eq!(answer.count, 3);
        assert_eq!(answer.degraded, None);

        // Ranks follow retrieval order, distances non-decreasing means
        // similarity scores non-increasing
        assert_eq!(answer.retrieved[0].rank, 1);
        assert_eq!(answer.retrieved[1].rank, 2);
        assert_eq!(answer.retrieved[2].rank, 3);
        assert!(answer.retrieved[0].similarity_score >= answer.retrieved[1].similarity_score);
        assert!(answer.retrieved[1].similarity_score >= answer.retrieved[2].similarity_score);

        // similarity == round(1 - distance, 4)
        assert_eq!(answer.retrieved[0].similarity_score, 0.8766);
        assert_eq!(answer.retrieved[1].similarity_score, 0.75);
        assert_eq!(answer.retrieved[2].similarity_score, 0.2);

        // Missing source metadata falls back to the synthesized id
        assert_eq!(answer.retrieved[0].recipe_id, "doc2");
        assert_eq!(answer.retrieved[2].recipe_id, "recipe_2");
    }

    #[tokio::test]
    async fn test_rate_limited_generation_uses_quota_message() {
        let results = vec![RetrievedDocument {
            document_id: Some("doc1".to_string()),
            content: "garlic sauce".to_string(),
            distance: 0.1,
        }];
        let embedder = Arc::new(FakeEmbedder::new());
        let store = Arc::new(StubStore { results });
        let llm = Arc::new(CountingLlm::failing(GenerationErrorKind::RateLimited));
        let pipeline = pipeline(embedder, store, llm.clone());

        let answer = pipeline.answer(&RagQuery::new("q")).await;

        assert_eq!(llm.call_count(), 1);
        assert_eq!(answer.answer, QUOTA_EXCEEDED_MESSAGE);
        // Retrieval succeeded, so results are still reported
        assert_eq!(answer.count, 1);
        assert_eq!(answer.degraded, None);
    }

    #[tokio::test]
    async fn test_generic_generation_failure_uses_apology_message() {
        let results = vec![RetrievedDocument {
            document_id: Some("doc1".to_string()),
            content: "garlic sauce".to_string(),
            distance: 0.1,
        }];
        let embedder = Arc::new(FakeEmbedder::new());
        let store = Arc::new(StubStore { results });
        let llm = Arc::new(CountingLlm::failing(GenerationErrorKind::Unknown));
        let pipeline = pipeline(embedder, store, llm);

        let answer = pipeline.answer(&RagQuery::new("q")).await;
        assert_eq!(answer.answer, GENERATION_FAILED_MESSAGE);
    }

    #[tokio::test]
    async fn test_end_to_end_retrieves_closest_document() {
        // Orthogonal document vectors; the query vector points at doc2
        let embedder = Arc::new(
            FakeEmbedder::new()
                .with_vector("garlic sauce with yogurt", vec![1.0, 0.0, 0.0])
                .with_vector("dill sauce for fish", vec![0.0, 1.0, 0.0])
                .with_vector("tomato sauce for pasta", vec![0.0, 0.0, 1.0])
                .with_vector("what goes with fish?", vec![0.1, 0.9, 0.1]),
        );
        let store = Arc::new(MemoryStore::new());
        let llm = Arc::new(CountingLlm::answering("Dill sauce goes with fish."));
        let pipeline = pipeline(embedder, store, llm);

        pipeline.ingest(&three_doc_corpus()).await.unwrap();

        let answer = pipeline
            .answer(&RagQuery::new("what goes with fish?").with_top_k(3))
            .await;

        assert_eq!(answer.retrieved[0].recipe_id, "doc2");
        assert_eq!(answer.retrieved[0].rank, 1);
        assert_eq!(answer.answer, "Dill sauce goes with fish.");
        assert_eq!(answer.count, 3);

        // Distances non-decreasing across ranks
        for pair in answer.retrieved.windows(2) {
            assert!(pair[0].similarity_score >= pair[1].similarity_score);
        }
    }

    #[test]
    fn test_prompt_joins_context_with_blank_lines() {
        let retrieved = vec![
            RetrievedDocument {
                document_id: Some("doc1".to_string()),
                content: "first".to_string(),
                distance: 0.1,
            },
            RetrievedDocument {
                document_id: Some("doc2".to_string()),
                content: "second".to_string(),
                distance: 0.2,
            },
        ];

        let prompt = build_prompt("the question", &retrieved);

        assert!(prompt.contains("first\n\nsecond"));
        assert!(prompt.contains("Question: the question"));
        assert!(prompt.ends_with("Answer:"));
    }

    // ------------------------------------------------------------------
    // Property: ingestion idempotence over arbitrary corpora
    // ------------------------------------------------------------------

    proptest! {
        #[test]
        fn prop_ingest_twice_adds_nothing_the_second_time(
            docs in proptest::collection::hash_map("[a-z]{1,8}", "[a-z ]{1,40}", 0..8)
        ) {
            let corpus: Vec<Document> = docs
                .into_iter()
                .map(|(id, content)| Document::new(id, content))
                .collect();

            tokio_test::block_on(async {
                let embedder = Arc::new(FakeEmbedder::new());
                let store = Arc::new(MemoryStore::new());
                let llm = Arc::new(CountingLlm::answering("ok"));
                let pipeline = RagPipeline::new(embedder, store.clone(), llm);

                let first = pipeline.ingest(&corpus).await.unwrap();
                prop_assert_eq!(first, corpus.len());
                prop_assert_eq!(store.count().await.unwrap(), corpus.len() as u64);

                let second = pipeline.ingest(&corpus).await.unwrap();
                prop_assert_eq!(second, 0);
                prop_assert_eq!(store.count().await.unwrap(), corpus.len() as u64);
                Ok(())
            })?;
        }
    }
}
