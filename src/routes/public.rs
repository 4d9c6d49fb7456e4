use crate::AppState;
use axum::{Router, routing::get};

/// Public Router Module
///
/// Endpoints that need no credential. Photo data is never served from here.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for load balancers and container health checks.
        .route("/health", get(|| async { "ok" }))
}
