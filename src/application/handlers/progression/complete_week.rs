//! CompleteWeekHandler - Command handler for submitting a week's answers.
//!
//! # Flow
//!
//! 1. Resolve the pointer (revision R) and the effective week.
//! 2. Reject weeks past the effective week; accept earlier ones as resubmissions.
//! 3. Upsert the completion record for (user, week definition).
//! 4. Try to advance the pointer by one active week, conditioned on revision R.

use std::sync::Arc;

use crate::domain::foundation::{TrackId, UserId};
use crate::domain::progression::{
    compute_current_week, find_week, CompletionRecord, CompletionSubmission, ProgressionError,
    UnlockPolicies, WeekNumber,
};
use crate::ports::{Clock, ProgressionStore, UpsertKind};

use super::advancement::{advance_if_eligible, no_content};

/// Command to record a week's completion.
#[derive(Debug, Clone)]
pub struct CompleteWeekCommand {
    pub user_id: UserId,
    pub track_id: TrackId,
    pub week_number: WeekNumber,
    pub submission: CompletionSubmission,
}

/// Result of a completion.
#[derive(Debug, Clone)]
pub struct CompleteWeekResult {
    pub accepted: bool,
    /// True only if this call moved the pointer.
    pub advanced: bool,
    /// The week the user should work on next.
    pub new_current_week: WeekNumber,
    pub record: CompletionRecord,
    /// False when this was a resubmission.
    pub created: bool,
}

/// Handler for week completion.
pub struct CompleteWeekHandler {
    store: Arc<dyn ProgressionStore>,
    clock: Arc<dyn Clock>,
    policies: UnlockPolicies,
}

impl CompleteWeekHandler {
    pub fn new(
        store: Arc<dyn ProgressionStore>,
        clock: Arc<dyn Clock>,
        policies: UnlockPolicies,
    ) -> Self {
        Self {
            store,
            clock,
            policies,
        }
    }

    pub async fn handle(
        &self,
        cmd: CompleteWeekCommand,
    ) -> Result<CompleteWeekResult, ProgressionError> {
        let now = self.clock.now();
        let policy = self.policies.policy_for(&cmd.track_id);

        // 1. Resolve pointer and effective week
        let pointer = self
            .store
            .get_or_create_pointer(&cmd.user_id, &cmd.track_id, now)
            .await?;
        let weeks = self.store.list_weeks(&cmd.track_id).await?;
        let effective = compute_current_week(policy, &pointer, &weeks, &now)
            .ok_or_else(|| no_content(&cmd.track_id, &weeks, &now))?;

        // 2. Gate the submitted week
        if cmd.week_number > effective {
            return Err(ProgressionError::invalid_state(
                cmd.week_number,
                effective,
                "week is not unlocked yet",
            ));
        }
        let week = find_week(&weeks, cmd.week_number)
            .ok_or_else(|| ProgressionError::no_content(cmd.track_id.clone(), None))?;
        if !week.is_published(&now) {
            return Err(ProgressionError::invalid_state(
                cmd.week_number,
                effective,
                "week has not been published yet",
            ));
        }
        cmd.submission.validate_for(week)?;

        // 3. Record the completion
        let candidate = CompletionRecord::first(cmd.user_id.clone(), week, cmd.submission, now);
        let (record, kind) = self.store.upsert_completion(&candidate).await?;
        let created = kind == UpsertKind::Created;

        tracing::info!(
            user_id = %cmd.user_id,
            track_id = %cmd.track_id,
            week = %cmd.week_number,
            score = record.score.value(),
            created,
            "week completion recorded"
        );

        // 4. Advance
        let outcome = advance_if_eligible(self.store.as_ref(), policy, &pointer, &weeks, now).await?;
        let new_current_week = compute_current_week(policy, &outcome.pointer, &weeks, &now)
            .unwrap_or(outcome.pointer.current_week);

        Ok(CompleteWeekResult {
            accepted: true,
            advanced: outcome.advanced,
            new_current_week,
            record,
            created,
        })
    }
}
