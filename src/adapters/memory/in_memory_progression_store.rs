//! In-memory implementation of ProgressionStore.
//!
//! All three tables live behind a single lock, so every port method is
//! atomic with respect to every other. That gives the same conditional-write
//! semantics as the PostgreSQL adapter: a CAS whose expected revision is
//! stale loses, and concurrent upserts for one (user, week) collapse.
//!
//! Intended for tests and local development.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::foundation::{
    DomainError, ErrorCode, Timestamp, TrackId, UserId, WeekDefinitionId,
};
use crate::domain::progression::{CompletionRecord, UserProgressionPointer, WeekDefinition};
use crate::ports::{CasOutcome, HistoryCursor, PointerKey, ProgressionStore, UpsertKind};

#[derive(Debug, Default)]
struct Tables {
    weeks: HashMap<WeekDefinitionId, WeekDefinition>,
    pointers: BTreeMap<PointerKey, UserProgressionPointer>,
    completions: HashMap<(UserId, WeekDefinitionId), CompletionRecord>,
}

/// In-memory progression store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryProgressionStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryProgressionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored completion records (useful for tests).
    pub async fn completion_count(&self) -> usize {
        self.tables.read().await.completions.len()
    }

    /// Number of stored pointers (useful for tests).
    pub async fn pointer_count(&self) -> usize {
        self.tables.read().await.pointers.len()
    }
}

fn key(user_id: &UserId, track_id: &TrackId) -> PointerKey {
    PointerKey {
        track_id: track_id.clone(),
        user_id: user_id.clone(),
    }
}

#[async_trait]
impl ProgressionStore for InMemoryProgressionStore {
    async fn insert_week(&self, week: &WeekDefinition) -> Result<(), DomainError> {
        let mut tables = self.tables.write().await;
        let duplicate = tables.weeks.values().any(|w| {
            w.is_active
                && w.track_id == week.track_id
                && w.week_number == week.week_number
                && w.year == week.year
        });
        if duplicate || tables.weeks.contains_key(&week.id) {
            return Err(DomainError::new(
                ErrorCode::DuplicateWeek,
                format!(
                    "Week {} of {} already exists for track '{}'",
                    week.week_number, week.year, week.track_id
                ),
            ));
        }
        tables.weeks.insert(week.id, week.clone());
        Ok(())
    }

    async fn find_week(
        &self,
        id: &WeekDefinitionId,
    ) -> Result<Option<WeekDefinition>, DomainError> {
        Ok(self.tables.read().await.weeks.get(id).cloned())
    }

    async fn list_weeks(&self, track_id: &TrackId) -> Result<Vec<WeekDefinition>, DomainError> {
        let tables = self.tables.read().await;
        let mut weeks: Vec<WeekDefinition> = tables
            .weeks
            .values()
            .filter(|w| &w.track_id == track_id && w.is_active)
            .cloned()
            .collect();
        weeks.sort_by_key(|w| (w.year, w.week_number, w.publish_at));
        Ok(weeks)
    }

    async fn deactivate_week(&self, id: &WeekDefinitionId) -> Result<(), DomainError> {
        let mut tables = self.tables.write().await;
        match tables.weeks.get_mut(id) {
            Some(week) => {
                week.is_active = false;
                Ok(())
            }
            None => Err(DomainError::new(
                ErrorCode::WeekNotFound,
                format!("Week definition not found: {}", id),
            )),
        }
    }

    async fn get_or_create_pointer(
        &self,
        user_id: &UserId,
        track_id: &TrackId,
        now: Timestamp,
    ) -> Result<UserProgressionPointer, DomainError> {
        let k = key(user_id, track_id);
        if let Some(existing) = self.tables.read().await.pointers.get(&k) {
            return Ok(existing.clone());
        }

        let mut tables = self.tables.write().await;
        let pointer = tables
            .pointers
            .entry(k)
            .or_insert_with(|| {
                UserProgressionPointer::initial(user_id.clone(), track_id.clone(), now)
            })
            .clone();
        Ok(pointer)
    }

    async fn compare_and_swap_pointer(
        &self,
        expected_revision: u64,
        next: &UserProgressionPointer,
    ) -> Result<CasOutcome, DomainError> {
        let mut tables = self.tables.write().await;
        let stored = tables
            .pointers
            .get_mut(&PointerKey::of(next))
            .ok_or_else(|| {
                DomainError::new(
                    ErrorCode::NotFound,
                    format!(
                        "No pointer for user '{}' on track '{}'",
                        next.user_id, next.track_id
                    ),
                )
            })?;

        if stored.revision != expected_revision {
            return Ok(CasOutcome::Conflict(stored.clone()));
        }
        *stored = next.clone();
        Ok(CasOutcome::Applied(stored.clone()))
    }

    async fn list_pointers(
        &self,
        after: Option<&PointerKey>,
        limit: u32,
    ) -> Result<Vec<UserProgressionPointer>, DomainError> {
        let tables = self.tables.read().await;
        let page = tables
            .pointers
            .iter()
            .filter(|(k, _)| after.map_or(true, |a| *k > a))
            .take(limit as usize)
            .map(|(_, p)| p.clone())
            .collect();
        Ok(page)
    }

    async fn upsert_completion(
        &self,
        record: &CompletionRecord,
    ) -> Result<(CompletionRecord, UpsertKind), DomainError> {
        let mut tables = self.tables.write().await;
        let k = (record.user_id.clone(), record.week_definition_id);
        match tables.completions.get_mut(&k) {
            Some(existing) => {
                existing.answers = record.answers.clone();
                existing.score = record.score;
                existing.time_spent_minutes = record.time_spent_minutes;
                existing.updated_at = record.updated_at;
                Ok((existing.clone(), UpsertKind::Updated))
            }
            None => {
                tables.completions.insert(k, record.clone());
                Ok((record.clone(), UpsertKind::Created))
            }
        }
    }

    async fn find_completion(
        &self,
        user_id: &UserId,
        week_definition_id: &WeekDefinitionId,
    ) -> Result<Option<CompletionRecord>, DomainError> {
        let tables = self.tables.read().await;
        Ok(tables
            .completions
            .get(&(user_id.clone(), *week_definition_id))
            .cloned())
    }

    async fn list_completions_for_weeks(
        &self,
        user_id: &UserId,
        week_ids: &[WeekDefinitionId],
    ) -> Result<Vec<CompletionRecord>, DomainError> {
        let tables = self.tables.read().await;
        Ok(week_ids
            .iter()
            .filter_map(|id| tables.completions.get(&(user_id.clone(), *id)).cloned())
            .collect())
    }

    async fn list_history(
        &self,
        user_id: &UserId,
        track_id: &TrackId,
        cursor: Option<&HistoryCursor>,
        limit: u32,
    ) -> Result<Vec<CompletionRecord>, DomainError> {
        let tables = self.tables.read().await;
        let mut records: Vec<CompletionRecord> = tables
            .completions
            .values()
            .filter(|c| &c.user_id == user_id && &c.track_id == track_id)
            .filter(|c| cursor.map_or(true, |cur| cur.admits(c)))
            .cloned()
            .collect();
        records.sort_by(|a, b| (b.completed_at, b.id).cmp(&(a.completed_at, a.id)));
        records.truncate(limit as usize);
        Ok(records)
    }
}
