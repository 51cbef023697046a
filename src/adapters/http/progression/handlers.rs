//! HTTP handlers for progression endpoints.
//!
//! These handlers connect Axum routes to application layer command/query handlers.

use std::sync::Arc;

use axum::extract::{Json, Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use crate::application::{
    CompleteWeekCommand, CompleteWeekHandler, DeactivateWeekCommand, DeactivateWeekHandler,
    GetCurrentWeekHandler, GetCurrentWeekQuery, GetRoadmapHandler, GetRoadmapQuery,
    ListHistoryHandler, ListHistoryQuery, PublishWeekCommand, PublishWeekHandler,
    RunAdvancementSweepCommand, RunAdvancementSweepHandler,
};
use crate::config::{
    ProgressionConfig, ValidationError as ConfigValidationError, MAX_SWEEP_BATCH_SIZE,
};
use crate::domain::foundation::{Percentage, TrackId, UserId, WeekDefinitionId};
use crate::domain::progression::{
    CompletionSubmission, ProgressionError, UnlockPolicies, WeekNumber,
};
use crate::ports::{Clock, HistoryCursor, ProgressionStore};

use super::dto::{
    CompleteWeekRequest, CompleteWeekResponse, CurrentWeekResponse, ErrorResponse,
    HistoryParams, HistoryResponse, PublishWeekRequest, RoadmapResponse, SweepParams,
    SweepResponse, WeekDefinitionResponse,
};

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared application state containing all dependencies.
///
/// Cloned for each request; dependencies are Arc-wrapped.
#[derive(Clone)]
pub struct ProgressionAppState {
    pub store: Arc<dyn ProgressionStore>,
    pub clock: Arc<dyn Clock>,
    pub policies: UnlockPolicies,
    pub history_context_size: u32,
    pub default_history_limit: u32,
    pub max_history_limit: u32,
    pub sweep_batch_size: u32,
}

impl ProgressionAppState {
    /// Builds the state from the progression settings.
    pub fn from_config(
        store: Arc<dyn ProgressionStore>,
        clock: Arc<dyn Clock>,
        config: &ProgressionConfig,
    ) -> Result<Self, ConfigValidationError> {
        Ok(Self {
            store,
            clock,
            policies: config.unlock_policies()?,
            history_context_size: config.history_context_size,
            default_history_limit: config.default_history_limit,
            max_history_limit: config.max_history_limit,
            sweep_batch_size: config.sweep_batch_size,
        })
    }

    pub fn get_current_week_handler(&self) -> GetCurrentWeekHandler {
        GetCurrentWeekHandler::new(
            self.store.clone(),
            self.clock.clone(),
            self.policies.clone(),
            self.history_context_size,
        )
    }

    pub fn complete_week_handler(&self) -> CompleteWeekHandler {
        CompleteWeekHandler::new(self.store.clone(), self.clock.clone(), self.policies.clone())
    }

    pub fn list_history_handler(&self) -> ListHistoryHandler {
        ListHistoryHandler::new(
            self.store.clone(),
            self.default_history_limit,
            self.max_history_limit,
        )
    }

    pub fn get_roadmap_handler(&self) -> GetRoadmapHandler {
        GetRoadmapHandler::new(self.store.clone(), self.clock.clone(), self.policies.clone())
    }

    pub fn publish_week_handler(&self) -> PublishWeekHandler {
        PublishWeekHandler::new(self.store.clone(), self.clock.clone())
    }

    pub fn deactivate_week_handler(&self) -> DeactivateWeekHandler {
        DeactivateWeekHandler::new(self.store.clone())
    }

    pub fn sweep_handler(&self) -> RunAdvancementSweepHandler {
        RunAdvancementSweepHandler::new(
            self.store.clone(),
            self.clock.clone(),
            self.policies.clone(),
        )
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// User Context
// ════════════════════════════════════════════════════════════════════════════════

/// Authenticated user context extracted from request.
///
/// The gateway in front of this service authenticates the caller and
/// forwards the user id in the `X-User-Id` header.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: UserId,
}

/// Rejection type for AuthenticatedUser extraction.
pub struct AuthenticationRequired;

impl IntoResponse for AuthenticationRequired {
    fn into_response(self) -> axum::response::Response {
        let error = ErrorResponse::new("AUTHENTICATION_REQUIRED", "Authentication is required");
        (StatusCode::UNAUTHORIZED, Json(error)).into_response()
    }
}

impl<S> axum::extract::FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AuthenticationRequired;

    fn from_request_parts<'life0, 'life1, 'async_trait>(
        parts: &'life0 mut axum::http::request::Parts,
        _state: &'life1 S,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self, Self::Rejection>> + Send + 'async_trait>,
    >
    where
        'life0: 'async_trait,
        'life1: 'async_trait,
        Self: 'async_trait,
    {
        Box::pin(async move {
            let user_id = parts
                .headers
                .get("X-User-Id")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| UserId::new(s).ok())
                .ok_or(AuthenticationRequired)?;

            Ok(AuthenticatedUser { user_id })
        })
    }
}

fn parse_track(raw: String) -> Result<TrackId, ProgressionApiError> {
    Ok(TrackId::new(raw).map_err(ProgressionError::from)?)
}

// ════════════════════════════════════════════════════════════════════════════════
// Learner Endpoints
// ════════════════════════════════════════════════════════════════════════════════

/// GET /api/tracks/:track_id/current-week - The week the user should work on
pub async fn get_current_week(
    State(state): State<ProgressionAppState>,
    user: AuthenticatedUser,
    Path(track_id): Path<String>,
) -> Result<impl IntoResponse, ProgressionApiError> {
    let handler = state.get_current_week_handler();
    let query = GetCurrentWeekQuery {
        user_id: user.user_id,
        track_id: parse_track(track_id)?,
    };

    let result = handler.handle(query).await?;
    let response = CurrentWeekResponse::from_result(result, &state.clock.now());

    Ok(Json(response))
}

/// POST /api/tracks/:track_id/weeks/:week_number/complete - Submit a week
pub async fn complete_week(
    State(state): State<ProgressionAppState>,
    user: AuthenticatedUser,
    Path((track_id, week_number)): Path<(String, u32)>,
    Json(request): Json<CompleteWeekRequest>,
) -> Result<impl IntoResponse, ProgressionApiError> {
    let handler = state.complete_week_handler();
    let cmd = CompleteWeekCommand {
        user_id: user.user_id,
        track_id: parse_track(track_id)?,
        week_number: WeekNumber::new(week_number).map_err(ProgressionError::from)?,
        submission: CompletionSubmission {
            answers: request.answers,
            score: Percentage::try_new(request.score).map_err(ProgressionError::from)?,
            time_spent_minutes: request.time_spent_minutes,
        },
    };

    let result = handler.handle(cmd).await?;
    let status = if result.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };

    Ok((status, Json(CompleteWeekResponse::from(result))))
}

/// GET /api/tracks/:track_id/history - Completion history, newest first
pub async fn list_history(
    State(state): State<ProgressionAppState>,
    user: AuthenticatedUser,
    Path(track_id): Path<String>,
    Query(params): Query<HistoryParams>,
) -> Result<impl IntoResponse, ProgressionApiError> {
    let handler = state.list_history_handler();
    let cursor = params
        .cursor
        .as_deref()
        .map(HistoryCursor::parse_token)
        .transpose()
        .map_err(ProgressionError::from)?;
    let query = ListHistoryQuery {
        user_id: user.user_id,
        track_id: parse_track(track_id)?,
        cursor,
        limit: params.limit,
    };

    let result = handler.handle(query).await?;

    Ok(Json(HistoryResponse::from(result)))
}

/// GET /api/tracks/:track_id/roadmap - Every week with its status
pub async fn get_roadmap(
    State(state): State<ProgressionAppState>,
    user: AuthenticatedUser,
    Path(track_id): Path<String>,
) -> Result<impl IntoResponse, ProgressionApiError> {
    let handler = state.get_roadmap_handler();
    let track_id = parse_track(track_id)?;
    let query = GetRoadmapQuery {
        user_id: user.user_id,
        track_id: track_id.clone(),
    };

    let weeks = handler.handle(query).await?;

    Ok(Json(RoadmapResponse {
        track_id: track_id.to_string(),
        weeks,
    }))
}

// ════════════════════════════════════════════════════════════════════════════════
// Admin Endpoints
// ════════════════════════════════════════════════════════════════════════════════

/// POST /api/admin/tracks/:track_id/weeks - Publish a week of content
pub async fn publish_week(
    State(state): State<ProgressionAppState>,
    _user: AuthenticatedUser,
    Path(track_id): Path<String>,
    Json(request): Json<PublishWeekRequest>,
) -> Result<impl IntoResponse, ProgressionApiError> {
    let handler = state.publish_week_handler();
    let cmd = PublishWeekCommand {
        track_id: parse_track(track_id)?,
        week_number: WeekNumber::new(request.week_number).map_err(ProgressionError::from)?,
        year: request.year,
        publish_at: request.publish_at,
        expire_at: request.expire_at,
        items: request.items,
    };

    let week = handler.handle(cmd).await?;

    Ok((StatusCode::CREATED, Json(WeekDefinitionResponse::from(week))))
}

/// DELETE /api/admin/weeks/:week_id - Withdraw a week
pub async fn deactivate_week(
    State(state): State<ProgressionAppState>,
    _user: AuthenticatedUser,
    Path(week_id): Path<String>,
) -> Result<impl IntoResponse, ProgressionApiError> {
    let week_id: WeekDefinitionId = week_id
        .parse()
        .map_err(|_| ProgressionError::validation("week_id", "must be a UUID"))?;

    let withdrawn = state
        .deactivate_week_handler()
        .handle(DeactivateWeekCommand { week_id })
        .await?;

    Ok(Json(WeekDefinitionResponse::from(withdrawn)))
}

/// POST /api/admin/sweeps - Run one advancement sweep now
pub async fn run_sweep(
    State(state): State<ProgressionAppState>,
    _user: AuthenticatedUser,
    Query(params): Query<SweepParams>,
) -> Result<impl IntoResponse, ProgressionApiError> {
    let batch_size = params.batch_size.unwrap_or(state.sweep_batch_size);
    if !(1..=MAX_SWEEP_BATCH_SIZE).contains(&batch_size) {
        return Err(ProgressionError::validation(
            "batch_size",
            format!("must be between 1 and {}", MAX_SWEEP_BATCH_SIZE),
        )
        .into());
    }
    let cmd = RunAdvancementSweepCommand { batch_size };

    let report = state.sweep_handler().handle(cmd).await;

    Ok(Json(SweepResponse::from(report)))
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// API error type that converts domain errors to HTTP responses.
#[derive(Debug)]
pub struct ProgressionApiError(ProgressionError);

impl From<ProgressionError> for ProgressionApiError {
    fn from(err: ProgressionError) -> Self {
        Self(err)
    }
}

impl From<crate::domain::foundation::DomainError> for ProgressionApiError {
    fn from(err: crate::domain::foundation::DomainError) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for ProgressionApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, error_code) = match &self.0 {
            ProgressionError::NoContentAvailable { .. } => {
                (StatusCode::NOT_FOUND, "NO_CONTENT_AVAILABLE")
            }
            ProgressionError::WeekNotFound(_) => (StatusCode::NOT_FOUND, "WEEK_NOT_FOUND"),
            ProgressionError::InvalidState { .. } => {
                (StatusCode::CONFLICT, "INVALID_STATE_TRANSITION")
            }
            ProgressionError::ConcurrencyConflict(_) => {
                (StatusCode::CONFLICT, "CONCURRENCY_CONFLICT")
            }
            ProgressionError::DuplicateWeek { .. } => (StatusCode::CONFLICT, "DUPLICATE_WEEK"),
            ProgressionError::ValidationFailed { .. } => {
                (StatusCode::BAD_REQUEST, "VALIDATION_FAILED")
            }
            ProgressionError::Persistence(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
            }
        };

        let message = self.0.message();
        let body = match &self.0 {
            ProgressionError::NoContentAvailable { next_unlock_at, .. } => {
                ErrorResponse::with_details(
                    error_code,
                    message,
                    json!({ "next_unlock_at": next_unlock_at.map(|t| t.to_rfc3339()) }),
                )
            }
            ProgressionError::InvalidState {
                attempted_week,
                current_week,
                ..
            } => ErrorResponse::with_details(
                error_code,
                message,
                json!({
                    "attempted_week": attempted_week.value(),
                    "current_week": current_week.value(),
                }),
            ),
            ProgressionError::ValidationFailed { field, .. } => {
                ErrorResponse::with_details(error_code, message, json!({ "field": field }))
            }
            ProgressionError::Persistence(detail) => {
                tracing::error!(error = %detail, "progression request failed");
                ErrorResponse::new(error_code, "Internal server error")
            }
            _ => ErrorResponse::new(error_code, message),
        };

        (status, Json(body)).into_response()
    }
}
