//! Completion records: a user's submission for one week.
//!
//! Completion is idempotent, not append-only. A second submission for the
//! same (user, week definition) replaces answers, score and time spent on
//! the existing record, keeping its id and first `completed_at`.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{
    CompletionRecordId, Percentage, Timestamp, TrackId, UserId, ValidationError, WeekDefinitionId,
};

use super::{WeekDefinition, WeekNumber};

/// Upper bound on a single week's reported study time (one week, in minutes).
pub const MAX_TIME_SPENT_MINUTES: u32 = 7 * 24 * 60;

/// One submitted response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmittedAnswer {
    pub item_id: String,
    pub answer: String,
}

/// What a user sends when completing a week.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionSubmission {
    pub answers: Vec<SubmittedAnswer>,
    pub score: Percentage,
    pub time_spent_minutes: u32,
}

impl CompletionSubmission {
    /// Validates the submission against the week it targets.
    pub fn validate_for(&self, week: &WeekDefinition) -> Result<(), ValidationError> {
        if self.time_spent_minutes > MAX_TIME_SPENT_MINUTES {
            return Err(ValidationError::out_of_range(
                "time_spent_minutes",
                0,
                i64::from(MAX_TIME_SPENT_MINUTES),
                i64::from(self.time_spent_minutes),
            ));
        }
        if let Some(unknown) = self
            .answers
            .iter()
            .find(|a| !week.items.iter().any(|i| i.id == a.item_id))
        {
            return Err(ValidationError::invalid_format(
                "answers.item_id",
                format!("'{}' is not an item of week {}", unknown.item_id, week.week_number),
            ));
        }
        Ok(())
    }
}

/// A user's completion of one week definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionRecord {
    pub id: CompletionRecordId,
    pub user_id: UserId,
    pub track_id: TrackId,
    pub week_definition_id: WeekDefinitionId,
    pub week_number: WeekNumber,
    pub answers: Vec<SubmittedAnswer>,
    pub score: Percentage,
    pub time_spent_minutes: u32,
    pub completed_at: Timestamp,
    pub updated_at: Timestamp,
}

impl CompletionRecord {
    /// First completion of a week.
    pub fn first(
        user_id: UserId,
        week: &WeekDefinition,
        submission: CompletionSubmission,
        now: Timestamp,
    ) -> Self {
        Self {
            id: CompletionRecordId::new(),
            user_id,
            track_id: week.track_id.clone(),
            week_definition_id: week.id,
            week_number: week.week_number,
            answers: submission.answers,
            score: submission.score,
            time_spent_minutes: submission.time_spent_minutes,
            completed_at: now,
            updated_at: now,
        }
    }

    /// The same record after a resubmission.
    pub fn resubmitted(&self, submission: CompletionSubmission, now: Timestamp) -> Self {
        Self {
            answers: submission.answers,
            score: submission.score,
            time_spent_minutes: submission.time_spent_minutes,
            updated_at: now,
            ..self.clone()
        }
    }
}
