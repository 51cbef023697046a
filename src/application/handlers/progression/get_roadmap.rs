//! GetRoadmapHandler - Query handler for the per-week status list.

use std::sync::Arc;

use crate::domain::foundation::{TrackId, UserId, WeekDefinitionId};
use crate::domain::progression::{
    compute_current_week, dedupe_weeks, ProgressionError, RoadmapBuilder, RoadmapEntry,
    UnlockPolicies,
};
use crate::ports::{Clock, ProgressionStore};

/// Query for a user's roadmap in a track.
#[derive(Debug, Clone)]
pub struct GetRoadmapQuery {
    pub user_id: UserId,
    pub track_id: TrackId,
}

/// Handler for building roadmaps.
pub struct GetRoadmapHandler {
    store: Arc<dyn ProgressionStore>,
    clock: Arc<dyn Clock>,
    policies: UnlockPolicies,
}

impl GetRoadmapHandler {
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

    pub async fn handle(&self, query: GetRoadmapQuery) -> Result<Vec<RoadmapEntry>, ProgressionError> {
        let now = self.clock.now();
        let policy = self.policies.policy_for(&query.track_id);

        let pointer = self
            .store
            .get_or_create_pointer(&query.user_id, &query.track_id, now)
            .await?;
        let weeks = self.store.list_weeks(&query.track_id).await?;

        let week_ids: Vec<WeekDefinitionId> = dedupe_weeks(&weeks).iter().map(|w| w.id).collect();
        let completions = self
            .store
            .list_completions_for_weeks(&query.user_id, &week_ids)
            .await?;

        // Accelerated catch-up is shown even before the pointer records it.
        let projected = match compute_current_week(policy, &pointer, &weeks, &now) {
            Some(effective) => pointer.projected_to(effective),
            None => pointer,
        };

        Ok(RoadmapBuilder::build(&weeks, &completions, &projected, &now))
    }
}
