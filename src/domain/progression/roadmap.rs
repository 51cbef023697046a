//! Roadmap: the derived per-week status list shown to a user.
//!
//! Never persisted; rebuilt from week definitions, completion records and
//! the (projected) pointer on every request.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::domain::foundation::{Timestamp, WeekDefinitionId};

use super::policy::dedupe_weeks;
use super::{CompletionRecord, UserProgressionPointer, WeekDefinition, WeekNumber};

/// Status of one week on the roadmap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoadmapStatus {
    Done,
    Current,
    Available,
    Locked,
}

/// One row of the roadmap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoadmapEntry {
    pub week_definition_id: WeekDefinitionId,
    pub week_number: WeekNumber,
    pub year: i32,
    pub status: RoadmapStatus,
    /// Set when the week unlocks at a known instant (its publish time).
    pub unlocks_at: Option<Timestamp>,
}

/// Builds roadmaps.
pub struct RoadmapBuilder;

impl RoadmapBuilder {
    /// Derives the roadmap.
    ///
    /// # Rules
    ///
    /// 1. Weeks are de-duplicated and ordered by (year, week_number).
    /// 2. A week with a completion record is `done`.
    /// 3. The first week without one is `current`.
    /// 4. Later weeks are `locked` (with `unlocks_at`) until published.
    /// 5. Published later weeks the pointer has reached are `available`;
    ///    the rest stay `locked` until progression reaches them.
    pub fn build(
        weeks: &[WeekDefinition],
        completions: &[CompletionRecord],
        pointer: &UserProgressionPointer,
        now: &Timestamp,
    ) -> Vec<RoadmapEntry> {
        let completed: HashSet<WeekDefinitionId> =
            completions.iter().map(|c| c.week_definition_id).collect();

        let mut current_assigned = false;
        dedupe_weeks(weeks)
            .into_iter()
            .map(|week| {
                let unpublished = week.publish_at > *now;
                let (status, unlocks_at) = if completed.contains(&week.id) {
                    (RoadmapStatus::Done, None)
                } else if !current_assigned {
                    current_assigned = true;
                    (RoadmapStatus::Current, unpublished.then_some(week.publish_at))
                } else if unpublished {
                    (RoadmapStatus::Locked, Some(week.publish_at))
                } else if week.week_number <= pointer.current_week {
                    (RoadmapStatus::Available, None)
                } else {
                    (RoadmapStatus::Locked, None)
                };

                RoadmapEntry {
                    week_definition_id: week.id,
                    week_number: week.week_number,
                    year: week.year,
                    status,
                    unlocks_at,
                }
            })
            .collect()
    }
}
