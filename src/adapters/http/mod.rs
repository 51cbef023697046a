//! HTTP adapters - REST API implementations.

pub mod progression;

use std::time::Duration;

use axum::{routing::get, Router};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

// Re-export key types for convenience
pub use progression::progression_router;
pub use progression::ProgressionAppState;

/// Assemble the full HTTP application.
///
/// Mounts the progression API at `/api`, adds `GET /health`, and wraps
/// everything in request tracing and a per-request timeout (408 on expiry).
pub fn app(state: ProgressionAppState, request_timeout: Duration) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api", progression_router())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(request_timeout))
}

async fn health() -> &'static str {
    "ok"
}
