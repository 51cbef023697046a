//! PostgreSQL implementation of ProgressionStore.
//!
//! Week items and submitted answers are stored as JSONB. Pointer updates go
//! through `UPDATE ... WHERE revision = $expected`, so the database arbitrates
//! between concurrent advancers.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::foundation::{
    CompletionRecordId, DomainError, ErrorCode, Percentage, Timestamp, TrackId, UserId,
    WeekDefinitionId,
};
use crate::domain::progression::{
    CompletionRecord, SubmittedAnswer, UserProgressionPointer, WeekDefinition, WeekItem,
    WeekNumber,
};
use crate::ports::{CasOutcome, HistoryCursor, PointerKey, ProgressionStore, UpsertKind};

const WEEK_UNIQUE_CONSTRAINT: &str = "week_definitions_track_week_year_key";

/// PostgreSQL implementation of the ProgressionStore port.
pub struct PostgresProgressionStore {
    pool: PgPool,
}

impl PostgresProgressionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Rows
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, sqlx::FromRow)]
struct WeekRow {
    id: Uuid,
    track_id: String,
    week_number: i32,
    year: i32,
    publish_at: DateTime<Utc>,
    expire_at: Option<DateTime<Utc>>,
    items: serde_json::Value,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<WeekRow> for WeekDefinition {
    type Error = DomainError;

    fn try_from(row: WeekRow) -> Result<Self, Self::Error> {
        let items: Vec<WeekItem> = serde_json::from_value(row.items).map_err(|e| {
            DomainError::database(format!("Invalid items JSON for week {}: {}", row.id, e))
        })?;

        Ok(WeekDefinition {
            id: WeekDefinitionId::from_uuid(row.id),
            track_id: parse_track_id(row.track_id)?,
            week_number: parse_week_number(row.week_number)?,
            year: row.year,
            publish_at: Timestamp::from_datetime(row.publish_at),
            expire_at: row.expire_at.map(Timestamp::from_datetime),
            items,
            is_active: row.is_active,
            created_at: Timestamp::from_datetime(row.created_at),
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PointerRow {
    user_id: String,
    track_id: String,
    current_week: i32,
    advanced_at: DateTime<Utc>,
    revision: i64,
    created_at: DateTime<Utc>,
}

impl TryFrom<PointerRow> for UserProgressionPointer {
    type Error = DomainError;

    fn try_from(row: PointerRow) -> Result<Self, Self::Error> {
        Ok(UserProgressionPointer {
            user_id: parse_user_id(row.user_id)?,
            track_id: parse_track_id(row.track_id)?,
            current_week: parse_week_number(row.current_week)?,
            advanced_at: Timestamp::from_datetime(row.advanced_at),
            revision: u64::try_from(row.revision).map_err(|_| {
                DomainError::database(format!("Negative pointer revision: {}", row.revision))
            })?,
            created_at: Timestamp::from_datetime(row.created_at),
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CompletionRow {
    id: Uuid,
    user_id: String,
    track_id: String,
    week_definition_id: Uuid,
    week_number: i32,
    answers: serde_json::Value,
    score: i16,
    time_spent_minutes: i32,
    completed_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<CompletionRow> for CompletionRecord {
    type Error = DomainError;

    fn try_from(row: CompletionRow) -> Result<Self, Self::Error> {
        let answers: Vec<SubmittedAnswer> = serde_json::from_value(row.answers).map_err(|e| {
            DomainError::database(format!("Invalid answers JSON for completion {}: {}", row.id, e))
        })?;
        let score = u8::try_from(row.score)
            .ok()
            .and_then(|s| Percentage::try_new(s).ok())
            .ok_or_else(|| DomainError::database(format!("Invalid score value: {}", row.score)))?;
        let time_spent_minutes = u32::try_from(row.time_spent_minutes).map_err(|_| {
            DomainError::database(format!(
                "Invalid time_spent_minutes value: {}",
                row.time_spent_minutes
            ))
        })?;

        Ok(CompletionRecord {
            id: CompletionRecordId::from_uuid(row.id),
            user_id: parse_user_id(row.user_id)?,
            track_id: parse_track_id(row.track_id)?,
            week_definition_id: WeekDefinitionId::from_uuid(row.week_definition_id),
            week_number: parse_week_number(row.week_number)?,
            answers,
            score,
            time_spent_minutes,
            completed_at: Timestamp::from_datetime(row.completed_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct UpsertedCompletionRow {
    #[sqlx(flatten)]
    record: CompletionRow,
    inserted: bool,
}

fn parse_user_id(s: String) -> Result<UserId, DomainError> {
    UserId::new(s).map_err(|e| DomainError::database(format!("Invalid user_id: {}", e)))
}

fn parse_track_id(s: String) -> Result<TrackId, DomainError> {
    TrackId::new(s).map_err(|e| DomainError::database(format!("Invalid track_id: {}", e)))
}

fn parse_week_number(n: i32) -> Result<WeekNumber, DomainError> {
    u32::try_from(n)
        .ok()
        .and_then(|n| WeekNumber::new(n).ok())
        .ok_or_else(|| DomainError::database(format!("Invalid week_number value: {}", n)))
}

fn week_number_to_db(week: WeekNumber) -> Result<i32, DomainError> {
    i32::try_from(week.value()).map_err(|_| {
        DomainError::new(
            ErrorCode::ValidationFailed,
            format!("Week number {} is too large", week),
        )
        .with_detail("field", "week_number")
    })
}

fn revision_to_db(revision: u64) -> Result<i64, DomainError> {
    i64::try_from(revision)
        .map_err(|_| DomainError::database(format!("Revision {} overflows storage", revision)))
}

fn minutes_to_db(minutes: u32) -> Result<i32, DomainError> {
    i32::try_from(minutes).map_err(|_| {
        DomainError::database(format!("Time spent {} minutes overflows storage", minutes))
    })
}

fn to_json<T: serde::Serialize>(value: &T, what: &str) -> Result<serde_json::Value, DomainError> {
    serde_json::to_value(value)
        .map_err(|e| DomainError::database(format!("Failed to serialize {}: {}", what, e)))
}

const COMPLETION_COLUMNS: &str = "id, user_id, track_id, week_definition_id, week_number, \
     answers, score, time_spent_minutes, completed_at, updated_at";

#[async_trait]
impl ProgressionStore for PostgresProgressionStore {
    // ── Week definitions ─────────────────────────────────────────────────────

    async fn insert_week(&self, week: &WeekDefinition) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO week_definitions (
                id, track_id, week_number, year, publish_at, expire_at,
                items, is_active, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(week.id.as_uuid())
        .bind(week.track_id.as_str())
        .bind(week_number_to_db(week.week_number)?)
        .bind(week.year)
        .bind(week.publish_at.as_datetime())
        .bind(week.expire_at.as_ref().map(|t| *t.as_datetime()))
        .bind(to_json(&week.items, "week items")?)
        .bind(week.is_active)
        .bind(week.created_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.constraint() == Some(WEEK_UNIQUE_CONSTRAINT) {
                    return DomainError::new(
                        ErrorCode::DuplicateWeek,
                        format!(
                            "Week {} of {} already exists for track '{}'",
                            week.week_number, week.year, week.track_id
                        ),
                    );
                }
            }
            DomainError::database(format!("Failed to insert week definition: {}", e))
        })?;

        Ok(())
    }

    async fn find_week(
        &self,
        id: &WeekDefinitionId,
    ) -> Result<Option<WeekDefinition>, DomainError> {
        let row: Option<WeekRow> = sqlx::query_as(
            r#"
            SELECT id, track_id, week_number, year, publish_at, expire_at,
                   items, is_active, created_at
            FROM week_definitions
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to find week definition: {}", e)))?;

        row.map(WeekDefinition::try_from).transpose()
    }

    async fn list_weeks(&self, track_id: &TrackId) -> Result<Vec<WeekDefinition>, DomainError> {
        let rows: Vec<WeekRow> = sqlx::query_as(
            r#"
            SELECT id, track_id, week_number, year, publish_at, expire_at,
                   items, is_active, created_at
            FROM week_definitions
            WHERE track_id = $1 AND is_active
            ORDER BY year, week_number, publish_at
            "#,
        )
        .bind(track_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to list week definitions: {}", e)))?;

        rows.into_iter().map(WeekDefinition::try_from).collect()
    }

    async fn deactivate_week(&self, id: &WeekDefinitionId) -> Result<(), DomainError> {
        let result = sqlx::query("UPDATE week_definitions SET is_active = FALSE WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| {
                DomainError::database(format!("Failed to deactivate week definition: {}", e))
            })?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::WeekNotFound,
                format!("Week definition not found: {}", id),
            ));
        }

        Ok(())
    }

    // ── Pointers ─────────────────────────────────────────────────────────────

    async fn get_or_create_pointer(
        &self,
        user_id: &UserId,
        track_id: &TrackId,
        now: Timestamp,
    ) -> Result<UserProgressionPointer, DomainError> {
        let initial = UserProgressionPointer::initial(user_id.clone(), track_id.clone(), now);

        sqlx::query(
            r#"
            INSERT INTO user_progression_pointers (
                user_id, track_id, current_week, advanced_at, revision, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (user_id, track_id) DO NOTHING
            "#,
        )
        .bind(initial.user_id.as_str())
        .bind(initial.track_id.as_str())
        .bind(week_number_to_db(initial.current_week)?)
        .bind(initial.advanced_at.as_datetime())
        .bind(revision_to_db(initial.revision)?)
        .bind(initial.created_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to create pointer: {}", e)))?;

        let row: PointerRow = sqlx::query_as(
            r#"
            SELECT user_id, track_id, current_week, advanced_at, revision, created_at
            FROM user_progression_pointers
            WHERE user_id = $1 AND track_id = $2
            "#,
        )
        .bind(user_id.as_str())
        .bind(track_id.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to load pointer: {}", e)))?;

        row.try_into()
    }

    async fn compare_and_swap_pointer(
        &self,
        expected_revision: u64,
        next: &UserProgressionPointer,
    ) -> Result<CasOutcome, DomainError> {
        let updated: Option<PointerRow> = sqlx::query_as(
            r#"
            UPDATE user_progression_pointers SET
                current_week = $3,
                advanced_at = $4,
                revision = $5
            WHERE user_id = $1 AND track_id = $2 AND revision = $6
            RETURNING user_id, track_id, current_week, advanced_at, revision, created_at
            "#,
        )
        .bind(next.user_id.as_str())
        .bind(next.track_id.as_str())
        .bind(week_number_to_db(next.current_week)?)
        .bind(next.advanced_at.as_datetime())
        .bind(revision_to_db(next.revision)?)
        .bind(revision_to_db(expected_revision)?)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to update pointer: {}", e)))?;

        if let Some(row) = updated {
            return Ok(CasOutcome::Applied(row.try_into()?));
        }

        let current: Option<PointerRow> = sqlx::query_as(
            r#"
            SELECT user_id, track_id, current_week, advanced_at, revision, created_at
            FROM user_progression_pointers
            WHERE user_id = $1 AND track_id = $2
            "#,
        )
        .bind(next.user_id.as_str())
        .bind(next.track_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to load pointer: {}", e)))?;

        match current {
            Some(row) => Ok(CasOutcome::Conflict(row.try_into()?)),
            None => Err(DomainError::new(
                ErrorCode::NotFound,
                format!(
                    "No pointer for user '{}' on track '{}'",
                    next.user_id, next.track_id
                ),
            )),
        }
    }

    async fn list_pointers(
        &self,
        after: Option<&PointerKey>,
        limit: u32,
    ) -> Result<Vec<UserProgressionPointer>, DomainError> {
        let rows: Vec<PointerRow> = sqlx::query_as(
            r#"
            SELECT user_id, track_id, current_week, advanced_at, revision, created_at
            FROM user_progression_pointers
            WHERE $1::text IS NULL OR (track_id, user_id) > ($1, $2)
            ORDER BY track_id, user_id
            LIMIT $3
            "#,
        )
        .bind(after.map(|k| k.track_id.as_str().to_string()))
        .bind(after.map(|k| k.user_id.as_str().to_string()))
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to list pointers: {}", e)))?;

        rows.into_iter().map(UserProgressionPointer::try_from).collect()
    }

    // ── Completion records ───────────────────────────────────────────────────

    async fn upsert_completion(
        &self,
        record: &CompletionRecord,
    ) -> Result<(CompletionRecord, UpsertKind), DomainError> {
        // xmax is zero only on a row this statement inserted.
        let sql = format!(
            r#"
            INSERT INTO completion_records (
                id, user_id, track_id, week_definition_id, week_number,
                answers, score, time_spent_minutes, completed_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (user_id, week_definition_id) DO UPDATE SET
                answers = EXCLUDED.answers,
                score = EXCLUDED.score,
                time_spent_minutes = EXCLUDED.time_spent_minutes,
                updated_at = EXCLUDED.updated_at
            RETURNING {}, (xmax = 0) AS inserted
            "#,
            COMPLETION_COLUMNS
        );

        let row: UpsertedCompletionRow = sqlx::query_as(&sql)
            .bind(record.id.as_uuid())
            .bind(record.user_id.as_str())
            .bind(record.track_id.as_str())
            .bind(record.week_definition_id.as_uuid())
            .bind(week_number_to_db(record.week_number)?)
            .bind(to_json(&record.answers, "answers")?)
            .bind(i16::from(record.score.value()))
            .bind(minutes_to_db(record.time_spent_minutes)?)
            .bind(record.completed_at.as_datetime())
            .bind(record.updated_at.as_datetime())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                DomainError::database(format!("Failed to upsert completion record: {}", e))
            })?;

        let kind = if row.inserted {
            UpsertKind::Created
        } else {
            UpsertKind::Updated
        };
        Ok((row.record.try_into()?, kind))
    }

    async fn find_completion(
        &self,
        user_id: &UserId,
        week_definition_id: &WeekDefinitionId,
    ) -> Result<Option<CompletionRecord>, DomainError> {
        let sql = format!(
            "SELECT {} FROM completion_records WHERE user_id = $1 AND week_definition_id = $2",
            COMPLETION_COLUMNS
        );
        let row: Option<CompletionRow> = sqlx::query_as(&sql)
            .bind(user_id.as_str())
            .bind(week_definition_id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                DomainError::database(format!("Failed to find completion record: {}", e))
            })?;

        row.map(CompletionRecord::try_from).transpose()
    }

    async fn list_completions_for_weeks(
        &self,
        user_id: &UserId,
        week_ids: &[WeekDefinitionId],
    ) -> Result<Vec<CompletionRecord>, DomainError> {
        if week_ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<Uuid> = week_ids.iter().map(|id| *id.as_uuid()).collect();

        let sql = format!(
            "SELECT {} FROM completion_records \
             WHERE user_id = $1 AND week_definition_id = ANY($2)",
            COMPLETION_COLUMNS
        );
        let rows: Vec<CompletionRow> = sqlx::query_as(&sql)
            .bind(user_id.as_str())
            .bind(&ids)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                DomainError::database(format!("Failed to list completion records: {}", e))
            })?;

        rows.into_iter().map(CompletionRecord::try_from).collect()
    }

    async fn list_history(
        &self,
        user_id: &UserId,
        track_id: &TrackId,
        cursor: Option<&HistoryCursor>,
        limit: u32,
    ) -> Result<Vec<CompletionRecord>, DomainError> {
        let sql = format!(
            r#"
            SELECT {}
            FROM completion_records
            WHERE user_id = $1 AND track_id = $2
              AND (
                $3::timestamptz IS NULL
                OR completed_at < $3
                OR ($4::uuid IS NOT NULL AND completed_at = $3 AND id < $4)
              )
            ORDER BY completed_at DESC, id DESC
            LIMIT $5
            "#,
            COMPLETION_COLUMNS
        );
        let rows: Vec<CompletionRow> = sqlx::query_as(&sql)
            .bind(user_id.as_str())
            .bind(track_id.as_str())
            .bind(cursor.map(|c| *c.completed_at.as_datetime()))
            .bind(cursor.and_then(|c| c.id).map(|id| *id.as_uuid()))
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DomainError::database(format!("Failed to list history: {}", e)))?;

        rows.into_iter().map(CompletionRecord::try_from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn week_row_converts_items_from_json() {
        let row = WeekRow {
            id: Uuid::new_v4(),
            track_id: "cpa".to_string(),
            week_number: 3,
            year: 2026,
            publish_at: Utc::now(),
            expire_at: None,
            items: serde_json::json!([{
                "id": "q1",
                "prompt": "Which?",
                "options": ["A", "B"],
                "correct_answer": "A",
                "explanation": null
            }]),
            is_active: true,
            created_at: Utc::now(),
        };

        let week = WeekDefinition::try_from(row).unwrap();
        assert_eq!(week.week_number.value(), 3);
        assert_eq!(week.items.len(), 1);
        assert!(week.items[0].subject_tags.is_empty());
    }

    #[test]
    fn pointer_row_rejects_week_zero_and_negative_revision() {
        let row = |week, revision| PointerRow {
            user_id: "u".to_string(),
            track_id: "cpa".to_string(),
            current_week: week,
            advanced_at: Utc::now(),
            revision,
            created_at: Utc::now(),
        };
        assert!(UserProgressionPointer::try_from(row(0, 0)).is_err());
        assert!(UserProgressionPointer::try_from(row(1, -1)).is_err());
        assert_eq!(
            UserProgressionPointer::try_from(row(2, 5)).unwrap().revision,
            5
        );
    }

    #[test]
    fn oversized_minutes_are_rejected_not_clamped() {
        assert_eq!(minutes_to_db(90).unwrap(), 90);
        let err = minutes_to_db(u32::MAX).unwrap_err();
        assert_eq!(err.code, ErrorCode::DatabaseError);
    }

    #[test]
    fn completion_row_rejects_out_of_range_score() {
        let row = CompletionRow {
            id: Uuid::new_v4(),
            user_id: "u".to_string(),
            track_id: "cpa".to_string(),
            week_definition_id: Uuid::new_v4(),
            week_number: 1,
            answers: serde_json::json!([]),
            score: 101,
            time_spent_minutes: 10,
            completed_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let err = CompletionRecord::try_from(row).unwrap_err();
        assert_eq!(err.code, ErrorCode::DatabaseError);
    }
}
