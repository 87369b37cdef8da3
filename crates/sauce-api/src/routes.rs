//! Route definitions
//!
//! `/` and `/health` are always public; `/query` sits behind the access
//! gate, which passes everything through when the gate is disabled.

use crate::auth;
use crate::handlers::{health, query, root};
use crate::state::AppState;
use axum::{middleware, routing::get, Router};
use std::sync::Arc;

/// Build the API router
pub fn api_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    let protected = Router::new()
        .route("/query", get(query::query_handler))
        .layer(middleware::from_fn_with_state(state, auth::access_gate));

    Router::new()
        .route("/", get(root::root))
        .route("/health", get(health::health_check))
        .merge(protected)
}
