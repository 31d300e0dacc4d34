//! API Routes
//!
//! Assembles the cache endpoints and the operational endpoints into one
//! Axum router.

use axum::{
    extract::{DefaultBodyLimit, Request},
    routing::{delete, get, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    delete_handler, get_handler, health_handler, set_handler, stats_handler, AppState,
};
use crate::error::CacheError;

/// Upper bound on a `PUT /set` body. Entries that large overflow any sane
/// budget anyway.
const MAX_BODY_BYTES: usize = 4 * 1024 * 1024;

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `PUT /set` - Store a JSON value under a key
/// - `GET /get/:key` - Retrieve a value by key
/// - `DELETE /del/:key` - Delete a key
/// - `GET /stats` - Get cache statistics
/// - `GET /health` - Health check endpoint
///
/// Unknown paths answer with the JSON error body used everywhere else.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(cache_routes())
        .merge(ops_routes())
        .fallback(unknown_route)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Key/value operations.
fn cache_routes() -> Router<AppState> {
    Router::new()
        .route("/set", put(set_handler))
        .route("/get/:key", get(get_handler))
        .route("/del/:key", delete(delete_handler))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
}

/// Counters and liveness.
fn ops_routes() -> Router<AppState> {
    Router::new()
        .route("/stats", get(stats_handler))
        .route("/health", get(health_handler))
}

async fn unknown_route(request: Request) -> CacheError {
    CacheError::NotFound(request.uri().path().to_string())
}
