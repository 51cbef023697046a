//! Unlock policies and the pure progression rules built on them.
//!
//! Nothing here performs I/O; every function takes "now" explicitly.
//!
//! Week numbers need not be contiguous: a deactivated week leaves a gap, and
//! one advancement step always means "the next active week".
//!
//! | Policy | Current week | Advancement allowed when |
//! |--------|--------------|--------------------------|
//! | `strict` | the pointer's week | the pointer's week has a completion |
//! | `accelerated` | highest published week, at most one active week past the pointer | the next active week has published |

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{Timestamp, TrackId, ValidationError};

use super::{UserProgressionPointer, WeekDefinition, WeekNumber};

/// How a track unlocks its weeks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UnlockPolicy {
    /// Week n+1 stays locked until week n is completed.
    #[default]
    Strict,
    /// Weeks unlock as they publish; completion is tracked but does not gate.
    Accelerated,
}

impl UnlockPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnlockPolicy::Strict => "strict",
            UnlockPolicy::Accelerated => "accelerated",
        }
    }
}

impl fmt::Display for UnlockPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UnlockPolicy {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(UnlockPolicy::Strict),
            "accelerated" => Ok(UnlockPolicy::Accelerated),
            other => Err(ValidationError::invalid_format(
                "unlock_policy",
                format!("unknown policy '{}', expected 'strict' or 'accelerated'", other),
            )),
        }
    }
}

/// Policy lookup per track, with a process-wide default.
///
/// Track keys are compared case-insensitively because environment-sourced
/// configuration lowercases map keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnlockPolicies {
    default: UnlockPolicy,
    overrides: HashMap<String, UnlockPolicy>,
}

impl UnlockPolicies {
    pub fn new(default: UnlockPolicy) -> Self {
        Self {
            default,
            overrides: HashMap::new(),
        }
    }

    /// Adds a per-track override.
    pub fn with_track(mut self, track: &str, policy: UnlockPolicy) -> Self {
        self.overrides.insert(track.to_ascii_lowercase(), policy);
        self
    }

    pub fn policy_for(&self, track_id: &TrackId) -> UnlockPolicy {
        self.overrides
            .get(&track_id.as_str().to_ascii_lowercase())
            .copied()
            .unwrap_or(self.default)
    }
}

/// Active definitions, one per week number, sorted by (year, week_number).
///
/// When data drift leaves several active rows for one week number, the one
/// with the latest `publish_at` wins (ties broken by id).
pub fn dedupe_weeks(weeks: &[WeekDefinition]) -> Vec<&WeekDefinition> {
    let mut by_number: HashMap<WeekNumber, &WeekDefinition> = HashMap::new();
    for week in weeks.iter().filter(|w| w.is_active) {
        by_number
            .entry(week.week_number)
            .and_modify(|kept| {
                if (week.publish_at, week.id) > (kept.publish_at, kept.id) {
                    *kept = week;
                }
            })
            .or_insert(week);
    }
    let mut deduped: Vec<&WeekDefinition> = by_number.into_values().collect();
    deduped.sort_by_key(|w| (w.year, w.week_number));
    deduped
}

/// The definition a track uses for `number`, after de-duplication.
pub fn find_week(weeks: &[WeekDefinition], number: WeekNumber) -> Option<&WeekDefinition> {
    dedupe_weeks(weeks)
        .into_iter()
        .find(|w| w.week_number == number)
}

/// The first active definition numbered after `number`.
pub fn next_active_week(weeks: &[WeekDefinition], number: WeekNumber) -> Option<&WeekDefinition> {
    dedupe_weeks(weeks)
        .into_iter()
        .filter(|w| w.week_number > number)
        .min_by_key(|w| w.week_number)
}

/// The week the pointer stands on once gaps are skipped.
///
/// A pointer left on a week with no active definition stands on the first
/// active week after it. Past the last active week it stays where it is.
pub fn resolve_pointer_week(
    pointer: &UserProgressionPointer,
    weeks: &[WeekDefinition],
) -> WeekNumber {
    let at = pointer.current_week;
    if find_week(weeks, at).is_some() {
        return at;
    }
    next_active_week(weeks, at).map_or(at, |w| w.week_number)
}

/// The week an advancement step is measured from.
///
/// Strict gates on the week the user actually works on, so a pointer parked
/// on a gap is measured from the week it resolves to. Accelerated steps from
/// the stored week, which keeps catch-up to one active week per step.
pub fn advancement_origin(
    policy: UnlockPolicy,
    pointer: &UserProgressionPointer,
    weeks: &[WeekDefinition],
) -> WeekNumber {
    match policy {
        UnlockPolicy::Strict => resolve_pointer_week(pointer, weeks),
        UnlockPolicy::Accelerated => pointer.current_week,
    }
}

/// Where one step from `origin` lands: the next active week, or the
/// following number when nothing is defined past `origin` yet.
pub fn advancement_target(weeks: &[WeekDefinition], origin: WeekNumber) -> WeekNumber {
    next_active_week(weeks, origin).map_or_else(|| origin.next(), |w| w.week_number)
}

/// The week a user may currently work on.
///
/// Returns `None` when the track has nothing published yet; callers report
/// that as "no content" rather than assuming week 1.
pub fn compute_current_week(
    policy: UnlockPolicy,
    pointer: &UserProgressionPointer,
    weeks: &[WeekDefinition],
    now: &Timestamp,
) -> Option<WeekNumber> {
    let active = dedupe_weeks(weeks);
    if !active.iter().any(|w| w.publish_at <= *now) {
        return None;
    }

    match policy {
        UnlockPolicy::Strict => Some(resolve_pointer_week(pointer, weeks)),
        UnlockPolicy::Accelerated => {
            // Never more than one active week past the pointer, even after a long absence.
            let at = pointer.current_week;
            let ceiling = advancement_target(weeks, at);
            let reachable = active
                .iter()
                .filter(|w| w.publish_at <= *now && w.week_number <= ceiling)
                .map(|w| w.week_number)
                .max();
            Some(reachable.map_or(at, |week| week.max(at)))
        }
    }
}

/// Whether the pointer may move one step forward.
///
/// `completion_exists` refers to the week at `advancement_origin`;
/// `next_week` is the first active definition after it, if one exists.
pub fn can_advance(
    policy: UnlockPolicy,
    pointer: &UserProgressionPointer,
    completion_exists: bool,
    now: &Timestamp,
    next_week: Option<&WeekDefinition>,
) -> bool {
    match policy {
        UnlockPolicy::Strict => completion_exists,
        UnlockPolicy::Accelerated => next_week.is_some_and(|next| {
            next.is_active && next.week_number > pointer.current_week && next.is_published(now)
        }),
    }
}
