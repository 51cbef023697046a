//! HTTP DTOs (Data Transfer Objects) for progression endpoints.
//!
//! These types define the JSON request/response structure for the progression
//! API. They are the boundary between HTTP and the application layer.

use serde::{Deserialize, Serialize};

use crate::application::{
    CompleteWeekResult, GetCurrentWeekResult, ListHistoryResult, SweepReport,
};
use crate::domain::foundation::{CompletionRecordId, Timestamp, WeekDefinitionId};
use crate::domain::progression::{
    CompletionRecord, RoadmapEntry, SubmittedAnswer, WeekDefinition, WeekItem,
};

// ════════════════════════════════════════════════════════════════════════════════
// Request DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Body of `POST /tracks/:track_id/weeks/:week_number/complete`.
#[derive(Debug, Clone, Deserialize)]
pub struct CompleteWeekRequest {
    #[serde(default)]
    pub answers: Vec<SubmittedAnswer>,
    /// Percentage, 0-100.
    pub score: u8,
    pub time_spent_minutes: u32,
}

/// Query string of `GET /tracks/:track_id/history`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HistoryParams {
    /// `next_cursor` from the previous page, or a bare RFC 3339 timestamp.
    pub cursor: Option<String>,
    pub limit: Option<u32>,
}

/// Body of `POST /admin/tracks/:track_id/weeks`.
#[derive(Debug, Clone, Deserialize)]
pub struct PublishWeekRequest {
    pub week_number: u32,
    pub year: i32,
    pub publish_at: Timestamp,
    #[serde(default)]
    pub expire_at: Option<Timestamp>,
    pub items: Vec<WeekItem>,
}

/// Query string of `POST /admin/sweeps`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SweepParams {
    pub batch_size: Option<u32>,
}

// ════════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// A content item as shown to a learner.
///
/// The correct answer and explanation are withheld until the week is completed.
#[derive(Debug, Clone, Serialize)]
pub struct ItemView {
    pub id: String,
    pub prompt: String,
    pub options: Vec<String>,
    pub subject_tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correct_answer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

impl ItemView {
    fn from_item(item: &WeekItem, reveal: bool) -> Self {
        Self {
            id: item.id.clone(),
            prompt: item.prompt.clone(),
            options: item.options.clone(),
            subject_tags: item.subject_tags.clone(),
            correct_answer: reveal.then(|| item.correct_answer.clone()),
            explanation: if reveal { item.explanation.clone() } else { None },
        }
    }
}

/// A completion record.
#[derive(Debug, Clone, Serialize)]
pub struct CompletionView {
    pub id: CompletionRecordId,
    pub week_definition_id: WeekDefinitionId,
    pub week_number: u32,
    pub answers: Vec<SubmittedAnswer>,
    pub score: u8,
    pub time_spent_minutes: u32,
    pub completed_at: String,
    pub updated_at: String,
}

impl From<CompletionRecord> for CompletionView {
    fn from(record: CompletionRecord) -> Self {
        Self {
            id: record.id,
            week_definition_id: record.week_definition_id,
            week_number: record.week_number.value(),
            answers: record.answers,
            score: record.score.value(),
            time_spent_minutes: record.time_spent_minutes,
            completed_at: record.completed_at.to_rfc3339(),
            updated_at: record.updated_at.to_rfc3339(),
        }
    }
}

/// Response for `GET /tracks/:track_id/current-week`.
#[derive(Debug, Clone, Serialize)]
pub struct CurrentWeekResponse {
    pub week_definition_id: WeekDefinitionId,
    pub week_number: u32,
    pub year: i32,
    pub publish_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expire_at: Option<String>,
    /// Past `expire_at`; the week stays open.
    pub expired: bool,
    pub pointer_week: u32,
    pub completed: bool,
    pub items: Vec<ItemView>,
    pub recent_history: Vec<CompletionView>,
}

impl CurrentWeekResponse {
    pub fn from_result(result: GetCurrentWeekResult, now: &Timestamp) -> Self {
        let week = result.week;
        Self {
            week_definition_id: week.id,
            week_number: week.week_number.value(),
            year: week.year,
            publish_at: week.publish_at.to_rfc3339(),
            expire_at: week.expire_at.map(|t| t.to_rfc3339()),
            expired: week.is_expired(now),
            pointer_week: result.pointer_week.value(),
            completed: result.completed,
            items: week
                .items
                .iter()
                .map(|i| ItemView::from_item(i, result.completed))
                .collect(),
            recent_history: result
                .recent_history
                .into_iter()
                .map(CompletionView::from)
                .collect(),
        }
    }
}

/// Response for a week completion.
#[derive(Debug, Clone, Serialize)]
pub struct CompleteWeekResponse {
    pub accepted: bool,
    pub advanced: bool,
    pub created: bool,
    pub new_current_week: u32,
    pub record: CompletionView,
}

impl From<CompleteWeekResult> for CompleteWeekResponse {
    fn from(result: CompleteWeekResult) -> Self {
        Self {
            accepted: result.accepted,
            advanced: result.advanced,
            created: result.created,
            new_current_week: result.new_current_week.value(),
            record: result.record.into(),
        }
    }
}

/// One page of history.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryResponse {
    pub records: Vec<CompletionView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

impl From<ListHistoryResult> for HistoryResponse {
    fn from(result: ListHistoryResult) -> Self {
        Self {
            records: result.records.into_iter().map(CompletionView::from).collect(),
            next_cursor: result.next_cursor.map(|c| c.to_token()),
        }
    }
}

/// Response for `GET /tracks/:track_id/roadmap`.
#[derive(Debug, Clone, Serialize)]
pub struct RoadmapResponse {
    pub track_id: String,
    pub weeks: Vec<RoadmapEntry>,
}

/// A stored week definition (admin view, answers included).
#[derive(Debug, Clone, Serialize)]
pub struct WeekDefinitionResponse {
    pub id: WeekDefinitionId,
    pub track_id: String,
    pub week_number: u32,
    pub year: i32,
    pub publish_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expire_at: Option<String>,
    pub items: Vec<WeekItem>,
    pub is_active: bool,
    pub created_at: String,
}

impl From<WeekDefinition> for WeekDefinitionResponse {
    fn from(week: WeekDefinition) -> Self {
        Self {
            id: week.id,
            track_id: week.track_id.to_string(),
            week_number: week.week_number.value(),
            year: week.year,
            publish_at: week.publish_at.to_rfc3339(),
            expire_at: week.expire_at.map(|t| t.to_rfc3339()),
            items: week.items,
            is_active: week.is_active,
            created_at: week.created_at.to_rfc3339(),
        }
    }
}

/// Counters from one sweep pass.
#[derive(Debug, Clone, Serialize)]
pub struct SweepResponse {
    pub processed: u64,
    pub advanced: u64,
    pub errors: u64,
}

impl From<SweepReport> for SweepResponse {
    fn from(report: SweepReport) -> Self {
        Self {
            processed: report.processed,
            advanced: report.advanced,
            errors: report.errors,
        }
    }
}

/// Standard error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub error_code: String,
    /// Human-readable error message.
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorResponse {
    pub fn new(error_code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_code: error_code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(
        error_code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error_code: error_code.into(),
            message: message.into(),
            details: Some(details),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{Percentage, TrackId, UserId};
    use crate::domain::progression::{CompletionSubmission, WeekNumber};

    fn day0() -> Timestamp {
        Timestamp::parse_rfc3339("2026-01-05T00:00:00Z").unwrap()
    }

    fn item() -> WeekItem {
        WeekItem {
            id: "q1".to_string(),
            prompt: "Which standard governs leases?".to_string(),
            options: vec!["ASC 606".to_string(), "ASC 842".to_string()],
            correct_answer: "ASC 842".to_string(),
            explanation: Some("Leases moved to 842".to_string()),
            subject_tags: vec!["far".to_string()],
        }
    }

    fn week() -> WeekDefinition {
        WeekDefinition::publish(
            WeekDefinitionId::new(),
            TrackId::new("cpa").unwrap(),
            WeekNumber::FIRST,
            2026,
            day0(),
            Some(day0().add_days(14)),
            vec![item()],
            day0(),
        )
        .unwrap()
    }

    fn current(completed: bool) -> GetCurrentWeekResult {
        GetCurrentWeekResult {
            week: week(),
            recent_history: vec![],
            pointer_week: WeekNumber::FIRST,
            completed,
        }
    }

    #[test]
    fn answers_are_hidden_until_completed() {
        let open = CurrentWeekResponse::from_result(current(false), &day0());
        let json = serde_json::to_value(&open).unwrap();
        assert!(json["items"][0].get("correct_answer").is_none());
        assert!(json["items"][0].get("explanation").is_none());

        let done = CurrentWeekResponse::from_result(current(true), &day0());
        assert_eq!(done.items[0].correct_answer.as_deref(), Some("ASC 842"));
    }

    #[test]
    fn expiry_is_informational() {
        let response = CurrentWeekResponse::from_result(current(false), &day0().add_days(20));
        assert!(response.expired);
        assert_eq!(response.items.len(), 1);
    }

    #[test]
    fn completion_view_flattens_record() {
        let record = CompletionRecord::first(
            UserId::new("u").unwrap(),
            &week(),
            CompletionSubmission {
                answers: vec![],
                score: Percentage::try_new(88).unwrap(),
                time_spent_minutes: 20,
            },
            day0(),
        );
        let view = CompletionView::from(record);
        assert_eq!(view.score, 88);
        assert_eq!(view.week_number, 1);
        assert_eq!(view.completed_at, "2026-01-05T00:00:00.000000Z");
    }

    #[test]
    fn publish_request_parses_rfc3339_times() {
        let body = serde_json::json!({
            "week_number": 2,
            "year": 2026,
            "publish_at": "2026-01-12T00:00:00Z",
            "items": [{
                "id": "q1",
                "prompt": "p",
                "options": ["a", "b"],
                "correct_answer": "a",
                "explanation": null
            }]
        });
        let request: PublishWeekRequest = serde_json::from_value(body).unwrap();
        assert_eq!(request.publish_at, day0().add_days(7));
        assert!(request.expire_at.is_none());
    }

    #[test]
    fn error_response_omits_empty_details() {
        let json = serde_json::to_value(ErrorResponse::new("NOT_FOUND", "gone")).unwrap();
        assert!(json.get("details").is_none());
    }
}
