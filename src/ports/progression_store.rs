//! Progression store port.
//!
//! Durable persistence for the three progression tables:
//!
//! | Table | Uniqueness |
//! |-------|------------|
//! | week definitions | (track_id, week_number, year) |
//! | progression pointers | (user_id, track_id) |
//! | completion records | (user_id, week_definition_id) |
//!
//! # Design
//!
//! - **Pointer writes are conditional**: the only way to change a pointer is
//!   `compare_and_swap_pointer`, which applies only if the stored revision
//!   still matches. Losing callers get the stored row back instead of an error.
//! - **Completions are upserts**: concurrent first submissions for the same
//!   week collapse onto one row.

use async_trait::async_trait;

use crate::domain::foundation::{
    CompletionRecordId, DomainError, Timestamp, TrackId, UserId, ValidationError,
    WeekDefinitionId,
};
use crate::domain::progression::{CompletionRecord, UserProgressionPointer, WeekDefinition};

/// Result of a pointer compare-and-swap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CasOutcome {
    /// The write applied; carries the stored pointer.
    Applied(UserProgressionPointer),
    /// The revision had moved on; carries the pointer as currently stored.
    Conflict(UserProgressionPointer),
}

/// Whether an upsert inserted or updated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertKind {
    Created,
    Updated,
}

/// Position in the completion history, exclusive.
///
/// With an `id`, rows are compared on (completed_at, id) so rows sharing a
/// timestamp are neither skipped nor repeated. Without one, the comparison
/// is strictly-less-than on `completed_at` alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryCursor {
    pub completed_at: Timestamp,
    pub id: Option<CompletionRecordId>,
}

impl HistoryCursor {
    /// The cursor pointing just past `record`.
    pub fn after(record: &CompletionRecord) -> Self {
        Self {
            completed_at: record.completed_at,
            id: Some(record.id),
        }
    }

    /// True if `record` comes after this cursor in newest-first order.
    pub fn admits(&self, record: &CompletionRecord) -> bool {
        match self.id {
            Some(id) => (record.completed_at, record.id) < (self.completed_at, id),
            None => record.completed_at < self.completed_at,
        }
    }

    /// Opaque token form: `<rfc3339>_<uuid>`, or a bare timestamp.
    pub fn to_token(&self) -> String {
        match self.id {
            Some(id) => format!("{}_{}", self.completed_at.to_rfc3339(), id),
            None => self.completed_at.to_rfc3339(),
        }
    }

    /// Parses a token produced by `to_token`, or a bare RFC 3339 timestamp.
    pub fn parse_token(token: &str) -> Result<Self, ValidationError> {
        let invalid = || ValidationError::invalid_format("cursor", "malformed history cursor");
        let (at, id) = match token.split_once('_') {
            Some((at, id)) => (at, Some(id.parse::<CompletionRecordId>().map_err(|_| invalid())?)),
            None => (token, None),
        };
        let completed_at = Timestamp::parse_rfc3339(at).map_err(|_| invalid())?;
        Ok(Self { completed_at, id })
    }
}

/// Keyset position when paging through all pointers (track, then user).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct PointerKey {
    pub track_id: TrackId,
    pub user_id: UserId,
}

impl PointerKey {
    pub fn of(pointer: &UserProgressionPointer) -> Self {
        Self {
            track_id: pointer.track_id.clone(),
            user_id: pointer.user_id.clone(),
        }
    }
}

/// Persistence port for the progression subsystem.
#[async_trait]
pub trait ProgressionStore: Send + Sync {
    // ── Week definitions ─────────────────────────────────────────────────────

    /// Insert a new week definition.
    ///
    /// # Errors
    ///
    /// - `DuplicateWeek` if (track, week_number, year) already exists
    /// - `DatabaseError` on persistence failure
    async fn insert_week(&self, week: &WeekDefinition) -> Result<(), DomainError>;

    /// Find a week definition by id, active or not.
    async fn find_week(&self, id: &WeekDefinitionId) -> Result<Option<WeekDefinition>, DomainError>;

    /// Active week definitions of a track, ordered by (year, week_number).
    async fn list_weeks(&self, track_id: &TrackId) -> Result<Vec<WeekDefinition>, DomainError>;

    /// Soft-deactivate a week definition.
    ///
    /// # Errors
    ///
    /// - `WeekNotFound` if the id does not exist
    async fn deactivate_week(&self, id: &WeekDefinitionId) -> Result<(), DomainError>;

    // ── Pointers ─────────────────────────────────────────────────────────────

    /// Return the user's pointer, creating it on week 1 if absent.
    ///
    /// Safe under concurrent first access: exactly one row is created and
    /// every caller sees it.
    async fn get_or_create_pointer(
        &self,
        user_id: &UserId,
        track_id: &TrackId,
        now: Timestamp,
    ) -> Result<UserProgressionPointer, DomainError>;

    /// Replace the stored pointer with `next` iff its revision equals
    /// `expected_revision`.
    async fn compare_and_swap_pointer(
        &self,
        expected_revision: u64,
        next: &UserProgressionPointer,
    ) -> Result<CasOutcome, DomainError>;

    /// Pointers in (track_id, user_id) order, strictly after `after`.
    async fn list_pointers(
        &self,
        after: Option<&PointerKey>,
        limit: u32,
    ) -> Result<Vec<UserProgressionPointer>, DomainError>;

    // ── Completion records ───────────────────────────────────────────────────

    /// Insert or update the record keyed by (user_id, week_definition_id).
    ///
    /// On update the stored id and `completed_at` are kept. Returns the
    /// record as stored.
    async fn upsert_completion(
        &self,
        record: &CompletionRecord,
    ) -> Result<(CompletionRecord, UpsertKind), DomainError>;

    async fn find_completion(
        &self,
        user_id: &UserId,
        week_definition_id: &WeekDefinitionId,
    ) -> Result<Option<CompletionRecord>, DomainError>;

    /// The user's completions whose week definition is in `week_ids`.
    async fn list_completions_for_weeks(
        &self,
        user_id: &UserId,
        week_ids: &[WeekDefinitionId],
    ) -> Result<Vec<CompletionRecord>, DomainError>;

    /// The user's completions in a track, newest first, after `cursor`.
    async fn list_history(
        &self,
        user_id: &UserId,
        track_id: &TrackId,
        cursor: Option<&HistoryCursor>,
        limit: u32,
    ) -> Result<Vec<CompletionRecord>, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progression_store_is_object_safe() {
        fn _accepts_dyn(_store: &dyn ProgressionStore) {}
    }

    #[test]
    fn cursor_without_id_is_strictly_less_than() {
        let at = Timestamp::parse_rfc3339("2026-01-05T00:00:00Z").unwrap();
        let cursor = HistoryCursor {
            completed_at: at,
            id: None,
        };
        let mut record_same = sample_record(at);
        assert!(!cursor.admits(&record_same));
        record_same.completed_at = at.plus_secs(-1);
        assert!(cursor.admits(&record_same));
    }

    #[test]
    fn compound_cursor_orders_ties_by_id() {
        let at = Timestamp::parse_rfc3339("2026-01-05T00:00:00Z").unwrap();
        let a = sample_record(at);
        let b = sample_record(at);
        let (low, high) = if a.id < b.id { (a, b) } else { (b, a) };

        let cursor = HistoryCursor::after(&high);
        assert!(cursor.admits(&low));
        assert!(!cursor.admits(&high));
    }

    #[test]
    fn cursor_tokens_parse_with_and_without_id() {
        let at = Timestamp::parse_rfc3339("2026-01-05T08:30:00Z").unwrap();
        let record = sample_record(at);
        let cursor = HistoryCursor::after(&record);

        assert_eq!(HistoryCursor::parse_token(&cursor.to_token()).unwrap(), cursor);

        let bare = HistoryCursor::parse_token("2026-01-05T08:30:00Z").unwrap();
        assert_eq!(bare.completed_at, at);
        assert!(bare.id.is_none());

        assert!(HistoryCursor::parse_token("yesterday").is_err());
        assert!(HistoryCursor::parse_token("2026-01-05T08:30:00Z_not-a-uuid").is_err());
    }

    fn sample_record(at: Timestamp) -> CompletionRecord {
        use crate::domain::foundation::Percentage;
        use crate::domain::progression::WeekNumber;

        CompletionRecord {
            id: CompletionRecordId::new(),
            user_id: UserId::new("u").unwrap(),
            track_id: TrackId::new("cpa").unwrap(),
            week_definition_id: WeekDefinitionId::new(),
            week_number: WeekNumber::FIRST,
            answers: vec![],
            score: Percentage::ZERO,
            time_spent_minutes: 0,
            completed_at: at,
            updated_at: at,
        }
    }
}
