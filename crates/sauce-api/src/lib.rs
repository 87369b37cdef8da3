//! Sauce RAG API - REST server
//!
//! Provides HTTP endpoints for querying the sauce recipe knowledge base.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

use axum::http::{HeaderValue, Method};
use axum::Router;
use state::AppState;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::root::root,
        handlers::health::health_check,
        handlers::query::query_handler,
    ),
    components(schemas(
        handlers::root::RootResponse,
        handlers::root::Endpoints,
        handlers::health::HealthResponse,
        handlers::query::QueryResponse,
        handlers::query::RetrievedRecipe,
        error::ApiError,
    )),
    tags(
        (name = "info", description = "Service information"),
        (name = "health", description = "Liveness and dependency status"),
        (name = "query", description = "Recipe question answering")
    ),
    info(
        title = "Sauce Recipe RAG API",
        description = "Retrieval-augmented answers over a sauce recipe corpus"
    )
)]
pub struct ApiDoc;

fn cors_layer(origins: &[String]) -> CorsLayer {
    // An empty or wildcard origin list allows any origin
    let allow_origin = if origins.is_empty() || origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(
            origins
                .iter()
                .filter_map(|o| o.parse::<HeaderValue>().ok()),
        )
    };
    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET])
        .allow_headers(Any)
}

/// Build the full application router
pub fn create_router(state: Arc<AppState>) -> Router {
    let app = routes::api_routes(state.clone())
        .with_state(state.clone())
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http());

    if state.config.server.cors_enabled {
        app.layer(cors_layer(&state.config.server.cors_origins))
    } else {
        app
    }
}
