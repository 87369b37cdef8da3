//! Sauce RAG API Server
//!
//! REST API server answering questions over a sauce recipe corpus.

use anyhow::Context;
use sauce_api::{create_router, state::AppState};
use sauce_core::config::LoggingConfig;
use sauce_core::{corpus, AppConfig};
use sauce_rag::{create_llm_client, RagPipeline};
use sauce_vector::{create_embedding_client, DocumentStore, QdrantStore};
use std::sync::Arc;

/// Initialize tracing from the logging section; `RUST_LOG` still wins when
/// set.
fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("sauce_api={0},tower_http={0}", logging.level).into()
    });

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_file(logging.include_location)
        .with_line_number(logging.include_location);

    if logging.json_format {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Construct the pipeline and load the bundled corpus.
///
/// Any failure here (missing API key, unreachable store) is reported to the
/// caller; the server still starts and serves health checks.
async fn initialize_pipeline(config: &AppConfig) -> anyhow::Result<Arc<RagPipeline>> {
    let embedder: Arc<dyn sauce_vector::EmbeddingClient> =
        Arc::from(create_embedding_client(&config.llm)?);
    let llm: Arc<dyn sauce_core::LlmClient> = Arc::from(create_llm_client(&config.llm)?);

    let store = QdrantStore::new(&config.database).await?;
    store.init_collection().await?;
    let store: Arc<dyn DocumentStore> = Arc::new(store);

    let pipeline = Arc::new(RagPipeline::new(embedder, store, llm));

    let added = pipeline.ingest(&corpus::sample_recipes()).await?;
    tracing::info!(added, "corpus ingestion complete");

    Ok(pipeline)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A malformed environment aborts startup with the offending variable
    // named, rather than silently running on defaults
    let config = AppConfig::from_env().context("invalid environment configuration")?;

    init_tracing(&config.logging);

    let addr = format!("{}:{}", config.server.host, config.server.port);

    // Build the pipeline; a failure degrades the process to health-only mode
    // instead of aborting startup
    let pipeline = match initialize_pipeline(&config).await {
        Ok(pipeline) => Some(pipeline),
        Err(e) => {
            tracing::warn!("RAG pipeline unavailable, starting in degraded mode: {e}");
            None
        }
    };

    // Create application state
    let state = Arc::new(AppState::new(config, pipeline));

    // Create router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Sauce RAG API server starting on http://{}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui/", addr);
    tracing::info!("OpenAPI spec at http://{}/api-docs/openapi.json", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
