//! GetCurrentWeekHandler - Query handler for the week a user should work on.

use std::sync::Arc;

use crate::domain::foundation::{TrackId, UserId};
use crate::domain::progression::{
    compute_current_week, find_week, CompletionRecord, ProgressionError, UnlockPolicies,
    WeekDefinition, WeekNumber,
};
use crate::ports::{Clock, ProgressionStore};

use super::advancement::no_content;

/// Query for the user's current week in a track.
#[derive(Debug, Clone)]
pub struct GetCurrentWeekQuery {
    pub user_id: UserId,
    pub track_id: TrackId,
}

/// The current week with recent context.
#[derive(Debug, Clone)]
pub struct GetCurrentWeekResult {
    pub week: WeekDefinition,
    /// Most recent completions in this track, newest first.
    pub recent_history: Vec<CompletionRecord>,
    /// Week stored on the pointer; may trail `week` under accelerated unlock.
    pub pointer_week: WeekNumber,
    /// Whether the user has already submitted `week`.
    pub completed: bool,
}

/// Handler for resolving the current week.
///
/// Creates the pointer on first access but never moves an existing one.
pub struct GetCurrentWeekHandler {
    store: Arc<dyn ProgressionStore>,
    clock: Arc<dyn Clock>,
    policies: UnlockPolicies,
    history_context_size: u32,
}

impl GetCurrentWeekHandler {
    pub fn new(
        store: Arc<dyn ProgressionStore>,
        clock: Arc<dyn Clock>,
        policies: UnlockPolicies,
        history_context_size: u32,
    ) -> Self {
        Self {
            store,
            clock,
            policies,
            history_context_size,
        }
    }

    pub async fn handle(
        &self,
        query: GetCurrentWeekQuery,
    ) -> Result<GetCurrentWeekResult, ProgressionError> {
        let now = self.clock.now();
        let policy = self.policies.policy_for(&query.track_id);

        let pointer = self
            .store
            .get_or_create_pointer(&query.user_id, &query.track_id, now)
            .await?;
        let weeks = self.store.list_weeks(&query.track_id).await?;

        let effective = compute_current_week(policy, &pointer, &weeks, &now)
            .ok_or_else(|| no_content(&query.track_id, &weeks, &now))?;

        let week = match find_week(&weeks, effective) {
            Some(w) if w.is_published(&now) => w.clone(),
            Some(w) => {
                return Err(ProgressionError::no_content(
                    query.track_id,
                    Some(w.publish_at),
                ))
            }
            None => return Err(no_content(&query.track_id, &weeks, &now)),
        };

        let recent_history = if self.history_context_size == 0 {
            Vec::new()
        } else {
            self.store
                .list_history(
                    &query.user_id,
                    &query.track_id,
                    None,
                    self.history_context_size,
                )
                .await?
        };
        let completed = self
            .store
            .find_completion(&query.user_id, &week.id)
            .await?
            .is_some();

        tracing::debug!(
            user_id = %query.user_id,
            track_id = %query.track_id,
            week = %week.week_number,
            pointer_week = %pointer.current_week,
            "resolved current week"
        );

        Ok(GetCurrentWeekResult {
            week,
            recent_history,
            pointer_week: pointer.current_week,
            completed,
        })
    }
}
