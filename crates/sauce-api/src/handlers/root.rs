//! Root info handler

use axum::{response::IntoResponse, Json};
use serde::Serialize;
use utoipa::ToSchema;

/// Service info response
#[derive(Serialize, ToSchema)]
pub struct RootResponse {
    pub message: String,
    pub endpoints: Endpoints,
    pub example_queries: Vec<String>,
}

#[derive(Serialize, ToSchema)]
pub struct Endpoints {
    pub query: String,
    pub health: String,
    pub docs: String,
}

/// Service info and example queries
#[utoipa::path(
    get,
    path = "/",
    tag = "info",
    responses(
        (status = 200, description = "Service info", body = RootResponse)
    )
)]
pub async fn root() -> impl IntoResponse {
    Json(RootResponse {
        message: "Sauce Recipe RAG API".to_string(),
        endpoints: Endpoints {
            query: "/query?q=your_question".to_string(),
            health: "/health".to_string(),
            docs: "/swagger-ui".to_string(),
        },
        example_queries: vec![
            "Jak zrobić sos czosnkowy?".to_string(),
            "Jaki sos pasuje do ryby?".to_string(),
            "Potrzebuję przepisu na sos do makaronu".to_string(),
            "Jakie sosy są idealne do grilla?".to_string(),
        ],
    })
}
