//! Pointer advancement shared by completion and the sweep.
//!
//! A single step: read-evaluate-CAS against the revision the caller read.
//! Losing the CAS is an outcome, not an error; the caller gets the pointer
//! as it is now stored.

use crate::domain::foundation::{Timestamp, TrackId};
use crate::domain::progression::{
    advancement_origin, advancement_target, can_advance, dedupe_weeks, find_week,
    next_active_week, ProgressionError, UnlockPolicy, UserProgressionPointer, WeekDefinition,
};
use crate::ports::{CasOutcome, ProgressionStore};

/// What happened to the pointer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdvancementOutcome {
    pub advanced: bool,
    pub pointer: UserProgressionPointer,
}

impl AdvancementOutcome {
    fn unchanged(pointer: &UserProgressionPointer) -> Self {
        Self {
            advanced: false,
            pointer: pointer.clone(),
        }
    }
}

/// Moves `pointer` forward one active week if the policy allows it.
///
/// `weeks` are the track's active definitions; deactivated week numbers are
/// stepped over. The CAS is conditioned on
/// `pointer.revision`, so at most one of several concurrent callers that
/// read the same revision advances.
pub(crate) async fn advance_if_eligible(
    store: &dyn ProgressionStore,
    policy: UnlockPolicy,
    pointer: &UserProgressionPointer,
    weeks: &[WeekDefinition],
    now: Timestamp,
) -> Result<AdvancementOutcome, ProgressionError> {
    let origin = advancement_origin(policy, pointer, weeks);
    let completion_exists = match policy {
        UnlockPolicy::Strict => match find_week(weeks, origin) {
            Some(current) => store
                .find_completion(&pointer.user_id, &current.id)
                .await?
                .is_some(),
            None => false,
        },
        UnlockPolicy::Accelerated => false,
    };
    let next_week = next_active_week(weeks, origin);

    if !can_advance(policy, pointer, completion_exists, &now, next_week) {
        return Ok(AdvancementOutcome::unchanged(pointer));
    }

    let next = pointer.advanced_to(advancement_target(weeks, origin), now);
    match store.compare_and_swap_pointer(pointer.revision, &next).await? {
        CasOutcome::Applied(stored) => {
            tracing::info!(
                user_id = %stored.user_id,
                track_id = %stored.track_id,
                from_week = %pointer.current_week,
                week = %stored.current_week,
                policy = %policy,
                "pointer advanced"
            );
            Ok(AdvancementOutcome {
                advanced: true,
                pointer: stored,
            })
        }
        CasOutcome::Conflict(current) => {
            tracing::debug!(
                user_id = %current.user_id,
                track_id = %current.track_id,
                expected_revision = pointer.revision,
                stored_revision = current.revision,
                "pointer advancement lost the race"
            );
            Ok(AdvancementOutcome {
                advanced: false,
                pointer: current,
            })
        }
    }
}

/// The earliest publish instant among active weeks still in the future.
pub(crate) fn next_unlock_at(weeks: &[WeekDefinition], now: &Timestamp) -> Option<Timestamp> {
    dedupe_weeks(weeks)
        .into_iter()
        .map(|w| w.publish_at)
        .filter(|at| at > now)
        .min()
}

/// `NoContentAvailable` for a track, carrying the next unlock when known.
pub(crate) fn no_content(
    track_id: &TrackId,
    weeks: &[WeekDefinition],
    now: &Timestamp,
) -> ProgressionError {
    ProgressionError::no_content(track_id.clone(), next_unlock_at(weeks, now))
}
