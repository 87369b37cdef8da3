//! Sauce CLI - Command-line interface
//!
//! Usage:
//!   sauce ingest
//!   sauce ask <question> [--top-k N]
//!   sauce demo

use anyhow::Context;
use clap::{Parser, Subcommand};
use sauce_core::{corpus, AppConfig, RagQuery};
use sauce_rag::{create_llm_client, RagPipeline};
use sauce_vector::{create_embedding_client, DocumentStore, QdrantStore};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "sauce")]
#[command(about = "Sauce recipe RAG CLI")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the bundled recipe corpus into the vector store
    Ingest,
    /// Ask a question about sauce recipes
    Ask {
        /// Question to ask
        question: String,
        /// How many recipes to retrieve (1 to 10); defaults to the
        /// configured pipeline value
        #[arg(long)]
        top_k: Option<usize>,
    },
    /// Run a set of example questions against the corpus
    Demo,
}

async fn build_pipeline(config: &AppConfig) -> anyhow::Result<RagPipeline> {
    let embedder: Arc<dyn sauce_vector::EmbeddingClient> = Arc::from(
        create_embedding_client(&config.llm).context("embedding client configuration")?,
    );
    let llm: Arc<dyn sauce_core::LlmClient> =
        Arc::from(create_llm_client(&config.llm).context("LLM client configuration")?);

    let store = QdrantStore::new(&config.database).await?;
    store.init_collection().await?;
    let store: Arc<dyn DocumentStore> = Arc::new(store);

    Ok(RagPipeline::new(embedder, store, llm))
}

async fn ask(pipeline: &RagPipeline, question: &str, top_k: usize) -> anyhow::Result<()> {
    let query = RagQuery::new(question).with_top_k(top_k);
    query.validate()?;

    let answer = pipeline.answer(&query).await;

    println!("Q: {}", answer.query);
    println!("A: {}", answer.answer);
    if !answer.retrieved.is_empty() {
        println!("\nRetrieved recipes:");
        for recipe in &answer.retrieved {
            println!(
                "  {}. {} (similarity {:.4})",
                recipe.rank, recipe.recipe_id, recipe.similarity_score
            );
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::from_env().context("invalid environment configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("sauce_cli={}", config.logging.level).into()),
        )
        .init();

    let pipeline = build_pipeline(&config).await?;

    match cli.command {
        Commands::Ingest => {
            let added = pipeline.ingest(&corpus::sample_recipes()).await?;
            let total = pipeline.document_count().await?;
            println!("Added {added} recipes ({total} total in collection)");
        }
        Commands::Ask { question, top_k } => {
            let top_k = top_k.unwrap_or(config.pipeline.default_top_k);
            ask(&pipeline, &question, top_k).await?;
        }
        Commands::Demo => {
            pipeline.ingest(&corpus::sample_recipes()).await?;
            let questions = [
                "Jak zrobić sos czosnkowy?",
                "Jaki sos pasuje do ryby?",
                "Potrzebuję przepisu na sos do makaronu",
                "Jakie sosy są idealne do grilla?",
            ];
            for (i, question) in questions.iter().enumerate() {
                if i > 0 {
                    println!("{}", "-".repeat(60));
                }
                ask(&pipeline, question, config.pipeline.default_top_k).await?;
            }
        }
    }

    Ok(())
}
