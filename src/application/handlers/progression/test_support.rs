//! Shared fixtures for progression handler tests.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::adapters::clock::FixedClock;
use crate::adapters::memory::InMemoryProgressionStore;
use crate::domain::foundation::{
    DomainError, Percentage, Timestamp, TrackId, UserId, WeekDefinitionId,
};
use crate::domain::progression::{
    CompletionRecord, CompletionSubmission, SubmittedAnswer, UnlockPolicies, UnlockPolicy,
    UserProgressionPointer, WeekDefinition, WeekItem, WeekNumber,
};
use crate::ports::{
    CasOutcome, Clock, HistoryCursor, PointerKey, ProgressionStore, UpsertKind,
};

pub const TRACK: &str = "cpa";
pub const USER: &str = "user-1";

pub fn day(n: i64) -> Timestamp {
    Timestamp::parse_rfc3339("2026-01-05T00:00:00Z")
        .unwrap()
        .add_days(n)
}

pub fn user() -> UserId {
    UserId::new(USER).unwrap()
}

pub fn track() -> TrackId {
    TrackId::new(TRACK).unwrap()
}

pub fn item(id: &str) -> WeekItem {
    WeekItem {
        id: id.to_string(),
        prompt: format!("Question {}", id),
        options: vec!["A".to_string(), "B".to_string(), "C".to_string()],
        correct_answer: "B".to_string(),
        explanation: Some("B is right".to_string()),
        subject_tags: vec!["audit".to_string()],
    }
}

pub fn week_published(track: &str, number: u32, publish_at: Timestamp) -> WeekDefinition {
    WeekDefinition::publish(
        WeekDefinitionId::new(),
        TrackId::new(track).unwrap(),
        WeekNumber::new(number).unwrap(),
        2026,
        publish_at,
        None,
        vec![item("q1"), item("q2")],
        publish_at,
    )
    .unwrap()
}

pub fn submission(score: u8) -> CompletionSubmission {
    CompletionSubmission {
        answers: vec![SubmittedAnswer {
            item_id: "q1".to_string(),
            answer: "B".to_string(),
        }],
        score: Percentage::try_new(score).unwrap(),
        time_spent_minutes: 45,
    }
}

pub fn week(n: u32) -> WeekNumber {
    WeekNumber::new(n).unwrap()
}

/// In-memory store, fixed clock at day 0, one track.
pub struct Fixture {
    pub store: Arc<InMemoryProgressionStore>,
    pub clock: Arc<FixedClock>,
    pub policies: UnlockPolicies,
}

impl Fixture {
    pub fn with_policy(policy: UnlockPolicy) -> Self {
        Self {
            store: Arc::new(InMemoryProgressionStore::new()),
            clock: Arc::new(FixedClock::new(day(0))),
            policies: UnlockPolicies::new(UnlockPolicy::Strict).with_track(TRACK, policy),
        }
    }

    pub fn strict() -> Self {
        Self::with_policy(UnlockPolicy::Strict)
    }

    pub fn accelerated() -> Self {
        Self::with_policy(UnlockPolicy::Accelerated)
    }

    pub fn store_port(&self) -> Arc<dyn ProgressionStore> {
        self.store.clone()
    }

    pub fn clock_port(&self) -> Arc<dyn Clock> {
        self.clock.clone()
    }

    /// Publishes weeks 1..=n with the given day offsets.
    pub async fn publish_weeks(&self, offsets: &[i64]) -> Vec<WeekDefinition> {
        let mut published = Vec::new();
        for (i, offset) in offsets.iter().enumerate() {
            let w = week_published(TRACK, i as u32 + 1, day(*offset));
            self.store.insert_week(&w).await.unwrap();
            published.push(w);
        }
        published
    }

    /// Soft-deactivates week `number`.
    pub async fn deactivate(&self, number: u32) {
        let weeks = self.weeks().await;
        let w = weeks
            .iter()
            .find(|w| w.week_number.value() == number)
            .unwrap();
        self.store.deactivate_week(&w.id).await.unwrap();
    }

    pub async fn pointer(&self) -> UserProgressionPointer {
        self.store
            .get_or_create_pointer(&user(), &track(), self.clock.now())
            .await
            .unwrap()
    }

    pub async fn weeks(&self) -> Vec<WeekDefinition> {
        self.store.list_weeks(&track()).await.unwrap()
    }

    /// Stores a completion for week `number` directly, bypassing the handler.
    pub async fn record_completion(&self, number: u32, at: Timestamp) -> CompletionRecord {
        let weeks = self.weeks().await;
        let w = weeks
            .iter()
            .find(|w| w.week_number.value() == number)
            .unwrap();
        let record = CompletionRecord::first(user(), w, submission(70), at);
        self.store.upsert_completion(&record).await.unwrap().0
    }
}

/// Store wrapper with switchable failures.
pub struct FlakyStore {
    pub inner: InMemoryProgressionStore,
    pub fail_list_pointers: AtomicBool,
    pub fail_list_weeks: AtomicBool,
    pub fail_cas_for: Mutex<HashSet<String>>,
}

impl FlakyStore {
    pub fn new(inner: InMemoryProgressionStore) -> Self {
        Self {
            inner,
            fail_list_pointers: AtomicBool::new(false),
            fail_list_weeks: AtomicBool::new(false),
            fail_cas_for: Mutex::new(HashSet::new()),
        }
    }

    pub fn fail_cas_for_user(&self, user_id: &str) {
        self.fail_cas_for.lock().unwrap().insert(user_id.to_string());
    }

    fn outage() -> DomainError {
        DomainError::database("simulated outage")
    }
}

#[async_trait]
impl ProgressionStore for FlakyStore {
    async fn insert_week(&self, week: &WeekDefinition) -> Result<(), DomainError> {
        self.inner.insert_week(week).await
    }

    async fn find_week(
        &self,
        id: &WeekDefinitionId,
    ) -> Result<Option<WeekDefinition>, DomainError> {
        self.inner.find_week(id).await
    }

    async fn list_weeks(&self, track_id: &TrackId) -> Result<Vec<WeekDefinition>, DomainError> {
        if self.fail_list_weeks.load(Ordering::SeqCst) {
            return Err(Self::outage());
        }
        self.inner.list_weeks(track_id).await
    }

    async fn deactivate_week(&self, id: &WeekDefinitionId) -> Result<(), DomainError> {
        self.inner.deactivate_week(id).await
    }

    async fn get_or_create_pointer(
        &self,
        user_id: &UserId,
        track_id: &TrackId,
        now: Timestamp,
    ) -> Result<UserProgressionPointer, DomainError> {
        self.inner.get_or_create_pointer(user_id, track_id, now).await
    }

    async fn compare_and_swap_pointer(
        &self,
        expected_revision: u64,
        next: &UserProgressionPointer,
    ) -> Result<CasOutcome, DomainError> {
        if self
            .fail_cas_for
            .lock()
            .unwrap()
            .contains(next.user_id.as_str())
        {
            return Err(Self::outage());
        }
        self.inner
            .compare_and_swap_pointer(expected_revision, next)
            .await
    }

    async fn list_pointers(
        &self,
        after: Option<&PointerKey>,
        limit: u32,
    ) -> Result<Vec<UserProgressionPointer>, DomainError> {
        if self.fail_list_pointers.load(Ordering::SeqCst) {
            return Err(Self::outage());
        }
        self.inner.list_pointers(after, limit).await
    }

    async fn upsert_completion(
        &self,
        record: &CompletionRecord,
    ) -> Result<(CompletionRecord, UpsertKind), DomainError> {
        self.inner.upsert_completion(record).await
    }

    async fn find_completion(
        &self,
        user_id: &UserId,
        week_definition_id: &WeekDefinitionId,
    ) -> Result<Option<CompletionRecord>, DomainError> {
        self.inner.find_completion(user_id, week_definition_id).await
    }

    async fn list_completions_for_weeks(
        &self,
        user_id: &UserId,
        week_ids: &[WeekDefinitionId],
    ) -> Result<Vec<CompletionRecord>, DomainError> {
        self.inner.list_completions_for_weeks(user_id, week_ids).await
    }

    async fn list_history(
        &self,
        user_id: &UserId,
        track_id: &TrackId,
        cursor: Option<&HistoryCursor>,
        limit: u32,
    ) -> Result<Vec<CompletionRecord>, DomainError> {
        self.inner.list_history(user_id, track_id, cursor, limit).await
    }
}
