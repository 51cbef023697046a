//! Foundation module - Shared domain primitives.
//!
//! Contains value objects, identifiers and error types
//! that form the vocabulary of the progression domain.

mod errors;
mod ids;
mod percentage;
mod timestamp;

pub use errors::{DomainError, ErrorCode, ValidationError};
pub use ids::{CompletionRecordId, TrackId, UserId, WeekDefinitionId};
pub use percentage::Percentage;
pub use timestamp::Timestamp;
