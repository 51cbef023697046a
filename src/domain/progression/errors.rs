//! Progression-specific error types.
//!
//! # HTTP Status Mapping
//!
//! | Error | HTTP Status |
//! |-------|-------------|
//! | NoContentAvailable | 404 |
//! | WeekNotFound | 404 |
//! | InvalidState | 409 |
//! | ConcurrencyConflict | 409 |
//! | DuplicateWeek | 409 |
//! | ValidationFailed | 400 |
//! | Persistence | 500 |

use crate::domain::foundation::{
    DomainError, ErrorCode, Timestamp, TrackId, ValidationError, WeekDefinitionId,
};

use super::WeekNumber;

/// Errors surfaced by progression operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressionError {
    /// The track has nothing the user can open yet.
    NoContentAvailable {
        track_id: TrackId,
        next_unlock_at: Option<Timestamp>,
    },

    /// Attempted an illegal week transition.
    InvalidState {
        attempted_week: WeekNumber,
        current_week: WeekNumber,
        reason: String,
    },

    /// A store-level race outside the pointer CAS protocol.
    ///
    /// Reserved for store adapters that report `ErrorCode::ConcurrencyConflict`.
    /// Neither bundled store emits it, and a lost pointer CAS is an
    /// `advanced: false` outcome rather than this error.
    ConcurrencyConflict(String),

    /// A week definition id that does not exist.
    WeekNotFound(WeekDefinitionId),

    /// A definition already exists for (track, week, year).
    DuplicateWeek {
        track_id: TrackId,
        week_number: WeekNumber,
        year: i32,
    },

    /// Input failed validation.
    ValidationFailed { field: String, message: String },

    /// Store unreachable or constraint violated.
    Persistence(String),
}

impl ProgressionError {
    pub fn no_content(track_id: TrackId, next_unlock_at: Option<Timestamp>) -> Self {
        ProgressionError::NoContentAvailable {
            track_id,
            next_unlock_at,
        }
    }

    pub fn invalid_state(
        attempted_week: WeekNumber,
        current_week: WeekNumber,
        reason: impl Into<String>,
    ) -> Self {
        ProgressionError::InvalidState {
            attempted_week,
            current_week,
            reason: reason.into(),
        }
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        ProgressionError::ValidationFailed {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn persistence(message: impl Into<String>) -> Self {
        ProgressionError::Persistence(message.into())
    }

    /// Returns the error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            ProgressionError::NoContentAvailable { .. } => ErrorCode::NoContentAvailable,
            ProgressionError::InvalidState { .. } => ErrorCode::InvalidStateTransition,
            ProgressionError::ConcurrencyConflict(_) => ErrorCode::ConcurrencyConflict,
            ProgressionError::WeekNotFound(_) => ErrorCode::WeekNotFound,
            ProgressionError::DuplicateWeek { .. } => ErrorCode::DuplicateWeek,
            ProgressionError::ValidationFailed { .. } => ErrorCode::ValidationFailed,
            ProgressionError::Persistence(_) => ErrorCode::DatabaseError,
        }
    }

    /// Returns a user-facing error message.
    pub fn message(&self) -> String {
        match self {
            ProgressionError::NoContentAvailable {
                track_id,
                next_unlock_at,
            } => match next_unlock_at {
                Some(at) => format!(
                    "No content available yet for track '{}'; next week unlocks at {}",
                    track_id,
                    at.to_rfc3339()
                ),
                None => format!("No content available yet for track '{}'", track_id),
            },
            ProgressionError::InvalidState {
                attempted_week,
                current_week,
                reason,
            } => format!(
                "Cannot submit week {} while current week is {}: {}",
                attempted_week, current_week, reason
            ),
            ProgressionError::ConcurrencyConflict(msg) => format!("Concurrent update: {}", msg),
            ProgressionError::WeekNotFound(id) => format!("Week definition not found: {}", id),
            ProgressionError::DuplicateWeek {
                track_id,
                week_number,
                year,
            } => format!(
                "Week {} of {} already exists for track '{}'",
                week_number, year, track_id
            ),
            ProgressionError::ValidationFailed { field, message } => {
                format!("Validation failed for '{}': {}", field, message)
            }
            ProgressionError::Persistence(msg) => format!("Persistence error: {}", msg),
        }
    }
}

impl std::fmt::Display for ProgressionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ProgressionError {}

impl From<ValidationError> for ProgressionError {
    fn from(err: ValidationError) -> Self {
        ProgressionError::ValidationFailed {
            field: err.field().to_string(),
            message: err.to_string(),
        }
    }
}

impl From<DomainError> for ProgressionError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::ConcurrencyConflict => ProgressionError::ConcurrencyConflict(err.message),
            ErrorCode::ValidationFailed => ProgressionError::ValidationFailed {
                field: err
                    .details
                    .get("field")
                    .cloned()
                    .unwrap_or_else(|| "unknown".to_string()),
                message: err.message,
            },
            _ => ProgressionError::Persistence(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn week(n: u32) -> WeekNumber {
        WeekNumber::new(n).unwrap()
    }

    #[test]
    fn invalid_state_message_names_both_weeks() {
        let err = ProgressionError::invalid_state(week(4), week(2), "week is not unlocked");
        let message = err.message();
        assert!(message.contains("week 4"));
        assert!(message.contains("current week is 2"));
        assert_eq!(err.code(), ErrorCode::InvalidStateTransition);
    }

    #[test]
    fn no_content_message_includes_unlock_instant() {
        let at = Timestamp::parse_rfc3339("2026-02-01T00:00:00Z").unwrap();
        let err = ProgressionError::no_content(TrackId::new("cpa").unwrap(), Some(at));
        assert!(err.message().contains("2026-02-01"));
        assert_eq!(err.code(), ErrorCode::NoContentAvailable);
    }

    #[test]
    fn database_errors_become_persistence() {
        let err: ProgressionError = DomainError::database("connection reset").into();
        assert!(matches!(err, ProgressionError::Persistence(ref m) if m.contains("connection reset")));
    }

    #[test]
    fn conflict_and_validation_codes_are_preserved() {
        let conflict: ProgressionError =
            DomainError::new(ErrorCode::ConcurrencyConflict, "pointer created twice").into();
        assert!(matches!(conflict, ProgressionError::ConcurrencyConflict(_)));

        let validation: ProgressionError = ValidationError::empty_field("items").into();
        assert!(matches!(
            validation,
            ProgressionError::ValidationFailed { ref field, .. } if field == "items"
        ));
    }
}
