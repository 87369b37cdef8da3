//! Health check handler
//!
//! Reports process liveness plus provider/store status. Always returns 200;
//! store-access errors are caught and reported as a status field, never
//! propagated.

use crate::state::AppState;
use axum::{extract::State, response::IntoResponse, Json};
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

/// Health check response
#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub app: String,
    pub message: String,
    /// "configured" or "missing"
    pub openai_key: String,
    /// "initialized", "not_initialized", or "error"
    pub rag_system: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipes_loaded: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rag_error: Option<String>,
    pub uptime_seconds: u64,
    pub requests_served: u64,
}

/// Liveness and dependency status
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service status report", body = HealthResponse)
    )
)]
pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let key_configured = state.config.llm.openai_api_key.is_some();
    let mut warning: Option<String> = None;
    if !key_configured {
        warning = Some("OpenAI API key not configured".to_string());
    }

    let mut recipes_loaded = None;
    let mut rag_error = None;

    let rag_system = match state.pipeline() {
        None => {
            let note = "RAG system not ready";
            warning = Some(match warning.take() {
                Some(existing) => format!("{existing}; {note}"),
                None => note.to_string(),
            });
            "not_initialized".to_string()
        }
        Some(pipeline) => match pipeline.document_count().await {
            Ok(count) => {
                recipes_loaded = Some(count);
                "initialized".to_string()
            }
            Err(e) => {
                rag_error = Some(e.to_string());
                "error".to_string()
            }
        },
    };

    Json(HealthResponse {
        status: "healthy".to_string(),
        app: "running".to_string(),
        message: "Sauce Recipe RAG API is running".to_string(),
        openai_key: if key_configured {
            "configured".to_string()
        } else {
            "missing".to_string()
        },
        rag_system,
        recipes_loaded,
        warning,
        rag_error,
        uptime_seconds: state.uptime_secs(),
        requests_served: state.get_request_count(),
    })
}
