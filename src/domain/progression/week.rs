//! Week definitions: one published unit of weekly content for a track.
//!
//! # Invariants
//!
//! - At most one definition per (track_id, week_number, year)
//! - `publish_at` strictly increases with `week_number` within a track
//! - Immutable once published, except for soft deactivation
//!
//! The first two are cross-row rules checked by the publish handler against
//! the store; this module validates a single definition.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::{Timestamp, TrackId, ValidationError, WeekDefinitionId};

/// Position of a week inside a track, starting at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct WeekNumber(u32);

impl WeekNumber {
    /// The first week of every track.
    pub const FIRST: Self = Self(1);

    /// Creates a WeekNumber, rejecting zero.
    pub fn new(value: u32) -> Result<Self, ValidationError> {
        if value == 0 {
            return Err(ValidationError::out_of_range(
                "week_number",
                1,
                i64::from(u32::MAX),
                0,
            ));
        }
        Ok(Self(value))
    }

    /// Returns the following week.
    pub fn next(&self) -> Self {
        Self(self.0.saturating_add(1))
    }

    /// Returns the raw number.
    pub fn value(&self) -> u32 {
        self.0
    }
}

impl TryFrom<u32> for WeekNumber {
    type Error = ValidationError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<WeekNumber> for u32 {
    fn from(w: WeekNumber) -> Self {
        w.0
    }
}

impl fmt::Display for WeekNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single question inside a week.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekItem {
    pub id: String,
    pub prompt: String,
    pub options: Vec<String>,
    /// The option text that is the correct answer.
    pub correct_answer: String,
    pub explanation: Option<String>,
    #[serde(default)]
    pub subject_tags: Vec<String>,
}

impl WeekItem {
    /// Validates a single item.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.trim().is_empty() {
            return Err(ValidationError::empty_field("items.id"));
        }
        if self.prompt.trim().is_empty() {
            return Err(ValidationError::empty_field("items.prompt"));
        }
        if self.options.len() < 2 {
            return Err(ValidationError::invalid_format(
                "items.options",
                format!("item '{}' needs at least two options", self.id),
            ));
        }
        if !self.options.iter().any(|o| o == &self.correct_answer) {
            return Err(ValidationError::invalid_format(
                "items.correct_answer",
                format!("item '{}' correct answer is not one of its options", self.id),
            ));
        }
        Ok(())
    }
}

/// One published week of content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekDefinition {
    pub id: WeekDefinitionId,
    pub track_id: TrackId,
    pub week_number: WeekNumber,
    pub year: i32,
    pub publish_at: Timestamp,
    pub expire_at: Option<Timestamp>,
    pub items: Vec<WeekItem>,
    pub is_active: bool,
    pub created_at: Timestamp,
}

impl WeekDefinition {
    /// Builds a new, active week definition after validating its fields.
    #[allow(clippy::too_many_arguments)]
    pub fn publish(
        id: WeekDefinitionId,
        track_id: TrackId,
        week_number: WeekNumber,
        year: i32,
        publish_at: Timestamp,
        expire_at: Option<Timestamp>,
        items: Vec<WeekItem>,
        now: Timestamp,
    ) -> Result<Self, ValidationError> {
        if !(2000..=9999).contains(&year) {
            return Err(ValidationError::out_of_range("year", 2000, 9999, i64::from(year)));
        }
        if let Some(expire_at) = expire_at {
            if !expire_at.is_after(&publish_at) {
                return Err(ValidationError::invalid_format(
                    "expire_at",
                    "must be after publish_at",
                ));
            }
        }
        if items.is_empty() {
            return Err(ValidationError::empty_field("items"));
        }
        for item in &items {
            item.validate()?;
        }
        let mut ids: Vec<&str> = items.iter().map(|i| i.id.as_str()).collect();
        ids.sort_unstable();
        if ids.windows(2).any(|w| w[0] == w[1]) {
            return Err(ValidationError::invalid_format(
                "items.id",
                "item ids must be unique within a week",
            ));
        }

        Ok(Self {
            id,
            track_id,
            week_number,
            year,
            publish_at,
            expire_at,
            items,
            is_active: true,
            created_at: now,
        })
    }

    /// True once the week is active and its publish instant has passed.
    pub fn is_published(&self, now: &Timestamp) -> bool {
        self.is_active && self.publish_at <= *now
    }

    /// True once `expire_at` has passed. Expiry is informational only.
    pub fn is_expired(&self, now: &Timestamp) -> bool {
        self.expire_at.is_some_and(|e| e <= *now)
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    fn day0() -> Timestamp {
        Timestamp::parse_rfc3339("2026-01-05T00:00:00Z").unwrap()
    }

    #[test]
    fn week_number_rejects_zero() {
        assert!(WeekNumber::new(0).is_err());
        assert_eq!(WeekNumber::new(3).unwrap().next().value(), 4);
        assert!(serde_json::from_str::<WeekNumber>("0").is_err());
    }

    #[test]
    fn item_requires_correct_answer_among_options() {
        let mut bad = item("q1");
        bad.correct_answer = "Z".to_string();
        assert!(matches!(
            bad.validate(),
            Err(ValidationError::InvalidFormat { ref field, .. }) if field == "items.correct_answer"
        ));
    }

    #[test]
    fn item_requires_two_options() {
        let mut bad = item("q1");
        bad.options = vec!["B".to_string()];
        assert!(bad.validate().is_err());
    }

    #[test]
    fn publish_rejects_empty_items_and_duplicate_ids() {
        let base = |items| {
            WeekDefinition::publish(
                WeekDefinitionId::new(),
                TrackId::new("cpa").unwrap(),
                WeekNumber::FIRST,
                2026,
                day0(),
                None,
                items,
                day0(),
            )
        };
        assert!(base(vec![]).is_err());
        assert!(base(vec![item("q1"), item("q1")]).is_err());
        assert!(base(vec![item("q1"), item("q2")]).is_ok());
    }

    #[test]
    fn publish_rejects_expiry_before_publish() {
        let result = WeekDefinition::publish(
            WeekDefinitionId::new(),
            TrackId::new("cpa").unwrap(),
            WeekNumber::FIRST,
            2026,
            day0(),
            Some(day0().add_days(-1)),
            vec![item("q1")],
            day0(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn is_published_respects_time_and_deactivation() {
        let mut w = week("cpa", 1, day0());
        assert!(!w.is_published(&day0().plus_secs(-1)));
        assert!(w.is_published(&day0()));
        w.is_active = false;
        assert!(!w.is_published(&day0().add_days(1)));
    }
}
