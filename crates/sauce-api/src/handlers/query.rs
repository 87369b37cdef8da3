//! Query handler
//!
//! Validation runs before the pipeline-presence check, so a malformed
//! request gets a 400 even when the process started in degraded mode.

use crate::error::AppError;
use crate::state::AppState;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sauce_core::{RagAnswer, RagQuery, RankedRecipe};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};

/// Query string parameters
#[derive(Debug, Deserialize, IntoParams)]
pub struct QueryParams {
    /// The question to answer
    pub q: String,
    /// How many recipes to retrieve (1 to 10); the configured pipeline
    /// default applies when omitted
    pub max_results: Option<usize>,
}

/// One retrieved recipe in a query response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RetrievedRecipe {
    /// 1-based rank in ascending-distance order
    pub rank: usize,
    /// Document id, or a synthesized fallback
    pub recipe_id: String,
    /// Stored text content
    pub content: String,
    /// Rounded to four decimal places
    pub similarity_score: f32,
}

impl From<RankedRecipe> for RetrievedRecipe {
    fn from(recipe: RankedRecipe) -> Self {
        Self {
            rank: recipe.rank,
            recipe_id: recipe.recipe_id,
            content: recipe.content,
            similarity_score: recipe.similarity_score,
        }
    }
}

/// Successful query response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct QueryResponse {
    /// The question as received
    pub query: String,
    /// The generated answer
    pub answer: String,
    /// Recipes the answer was grounded on
    pub retrieved_recipes: Vec<RetrievedRecipe>,
    /// Number of recipes retrieved
    pub total_recipes_found: usize,
}

impl From<RagAnswer> for QueryResponse {
    fn from(answer: RagAnswer) -> Self {
        Self {
            query: answer.query,
            answer: answer.answer,
            retrieved_recipes: answer.retrieved.into_iter().map(Into::into).collect(),
            total_recipes_found: answer.count,
        }
    }
}

/// Answer a question grounded on the recipe corpus
#[utoipa::path(
    get,
    path = "/query",
    tag = "query",
    params(QueryParams),
    responses(
        (status = 200, description = "Answer with supporting recipes", body = QueryResponse),
        (status = 400, description = "Empty question or max_results out of range", body = crate::error::ApiError),
        (status = 401, description = "Missing or invalid credentials", body = crate::error::ApiError),
        (status = 503, description = "Pipeline unavailable or no relevant recipes", body = crate::error::ApiError)
    )
)]
pub async fn query_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<QueryParams>,
) -> Result<Response, AppError> {
    state.increment_requests();

    let top_k = params
        .max_results
        .unwrap_or(state.config.pipeline.default_top_k);
    let query = RagQuery::new(params.q).with_top_k(top_k);
    query.validate()?;

    let Some(pipeline) = state.pipeline() else {
        return Err(AppError::ServiceUnavailable(
            "RAG system not initialized. Check OpenAI API key configuration.".to_string(),
        ));
    };

    let answer = pipeline.answer(&query).await;

    if answer.degraded.is_some() {
        tracing::info!(query = %answer.query, "returning degraded answer");
        let body = serde_json::json!({
            "error": "No relevant recipes found",
            "message": answer.answer,
            "query": answer.query,
        });
        return Ok((StatusCode::SERVICE_UNAVAILABLE, Json(body)).into_response());
    }

    Ok(Json(QueryResponse::from(answer)).into_response())
}
