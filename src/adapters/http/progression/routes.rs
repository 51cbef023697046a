//! Axum router configuration for progression endpoints.

use axum::{
    routing::{delete, get, post},
    Router,
};

use super::handlers::{
    complete_week, deactivate_week, get_current_week, get_roadmap, list_history, publish_week,
    run_sweep, ProgressionAppState,
};

/// Learner routes, mounted under `/tracks`.
///
/// - `GET /:track_id/current-week` - The week to work on now
/// - `POST /:track_id/weeks/:week_number/complete` - Submit a week
/// - `GET /:track_id/history` - Completion history, newest first
/// - `GET /:track_id/roadmap` - All weeks with status
pub fn track_routes() -> Router<ProgressionAppState> {
    Router::new()
        .route("/:track_id/current-week", get(get_current_week))
        .route("/:track_id/weeks/:week_number/complete", post(complete_week))
        .route("/:track_id/history", get(list_history))
        .route("/:track_id/roadmap", get(get_roadmap))
}

/// Operator routes, mounted under `/admin`.
///
/// - `POST /tracks/:track_id/weeks` - Publish a week
/// - `DELETE /weeks/:week_id` - Deactivate a week
/// - `POST /sweeps` - Run one advancement sweep
pub fn admin_routes() -> Router<ProgressionAppState> {
    Router::new()
        .route("/tracks/:track_id/weeks", post(publish_week))
        .route("/weeks/:week_id", delete(deactivate_week))
        .route("/sweeps", post(run_sweep))
}

/// Create the complete progression router, suitable for mounting at `/api`.
///
/// ```ignore
/// let app = Router::new()
///     .nest("/api", progression_router())
///     .with_state(state);
/// ```
pub fn progression_router() -> Router<ProgressionAppState> {
    Router::new()
        .nest("/tracks", track_routes())
        .nest("/admin", admin_routes())
}
