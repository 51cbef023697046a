//! HTTP adapter for progression endpoints.
//!
//! Exposes the progression engine via REST API:
//! - `GET /api/tracks/:track_id/current-week` - Current week with recent history
//! - `POST /api/tracks/:track_id/weeks/:week_number/complete` - Submit a week
//! - `GET /api/tracks/:track_id/history` - Paged completion history
//! - `GET /api/tracks/:track_id/roadmap` - Roadmap with per-week status
//! - `POST /api/admin/tracks/:track_id/weeks` - Publish a week
//! - `DELETE /api/admin/weeks/:week_id` - Deactivate a week
//! - `POST /api/admin/sweeps` - Run an advancement sweep

pub mod dto;
pub mod handlers;
pub mod routes;

pub use dto::*;
pub use handlers::{AuthenticatedUser, ProgressionApiError, ProgressionAppState};
pub use routes::progression_router;
