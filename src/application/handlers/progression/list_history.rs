//! ListHistoryHandler - Query handler for a user's completion history.

use std::sync::Arc;

use crate::domain::foundation::{TrackId, UserId};
use crate::domain::progression::{CompletionRecord, ProgressionError};
use crate::ports::{HistoryCursor, ProgressionStore};

/// Query for one page of history.
#[derive(Debug, Clone)]
pub struct ListHistoryQuery {
    pub user_id: UserId,
    pub track_id: TrackId,
    pub cursor: Option<HistoryCursor>,
    /// Defaults to the configured page size; clamped to the configured maximum.
    pub limit: Option<u32>,
}

/// One page of completions, newest first.
#[derive(Debug, Clone)]
pub struct ListHistoryResult {
    pub records: Vec<CompletionRecord>,
    /// Present when more records exist past this page.
    pub next_cursor: Option<HistoryCursor>,
}

/// Handler for paging through completion history.
pub struct ListHistoryHandler {
    store: Arc<dyn ProgressionStore>,
    default_limit: u32,
    max_limit: u32,
}

impl ListHistoryHandler {
    pub fn new(store: Arc<dyn ProgressionStore>, default_limit: u32, max_limit: u32) -> Self {
        Self {
            store,
            default_limit,
            max_limit: max_limit.max(1),
        }
    }

    pub async fn handle(
        &self,
        query: ListHistoryQuery,
    ) -> Result<ListHistoryResult, ProgressionError> {
        let limit = query
            .limit
            .unwrap_or(self.default_limit)
            .clamp(1, self.max_limit);

        // One extra row tells us whether another page exists.
        let mut records = self
            .store
            .list_history(
                &query.user_id,
                &query.track_id,
                query.cursor.as_ref(),
                limit + 1,
            )
            .await?;

        let next_cursor = if records.len() > limit as usize {
            records.truncate(limit as usize);
            records.last().map(HistoryCursor::after)
        } else {
            None
        };

        Ok(ListHistoryResult {
            records,
            next_cursor,
        })
    }
}
