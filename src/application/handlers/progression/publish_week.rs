//! PublishWeekHandler - Command handler for adding a week of content.

use std::sync::Arc;

use crate::domain::foundation::{ErrorCode, Timestamp, TrackId, WeekDefinitionId};
use crate::domain::progression::{ProgressionError, WeekDefinition, WeekItem, WeekNumber};
use crate::ports::{Clock, ProgressionStore};

/// Command to publish a week definition.
#[derive(Debug, Clone)]
pub struct PublishWeekCommand {
    pub track_id: TrackId,
    pub week_number: WeekNumber,
    pub year: i32,
    pub publish_at: Timestamp,
    pub expire_at: Option<Timestamp>,
    pub items: Vec<WeekItem>,
}

/// Handler for publishing weeks.
///
/// Publish times must increase strictly with week number across the track's
/// active definitions.
pub struct PublishWeekHandler {
    store: Arc<dyn ProgressionStore>,
    clock: Arc<dyn Clock>,
}

impl PublishWeekHandler {
    pub fn new(store: Arc<dyn ProgressionStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub async fn handle(&self, cmd: PublishWeekCommand) -> Result<WeekDefinition, ProgressionError> {
        let week = WeekDefinition::publish(
            WeekDefinitionId::new(),
            cmd.track_id,
            cmd.week_number,
            cmd.year,
            cmd.publish_at,
            cmd.expire_at,
            cmd.items,
            self.clock.now(),
        )?;

        let existing = self.store.list_weeks(&week.track_id).await?;
        if existing
            .iter()
            .any(|w| w.week_number == week.week_number && w.year == week.year)
        {
            return Err(duplicate(&week));
        }
        if let Some(conflict) = existing.iter().find(|w| out_of_order(w, &week)) {
            return Err(ProgressionError::validation(
                "publish_at",
                format!(
                    "week {} must publish strictly between its neighbours (week {} publishes at {})",
                    week.week_number,
                    conflict.week_number,
                    conflict.publish_at.to_rfc3339()
                ),
            ));
        }

        self.store.insert_week(&week).await.map_err(|e| match e.code {
            ErrorCode::DuplicateWeek => duplicate(&week),
            _ => e.into(),
        })?;

        tracing::info!(
            track_id = %week.track_id,
            week = %week.week_number,
            year = week.year,
            publish_at = %week.publish_at.to_rfc3339(),
            items = week.items.len(),
            "week published"
        );

        Ok(week)
    }
}

fn duplicate(week: &WeekDefinition) -> ProgressionError {
    ProgressionError::DuplicateWeek {
        track_id: week.track_id.clone(),
        week_number: week.week_number,
        year: week.year,
    }
}

fn out_of_order(existing: &WeekDefinition, new: &WeekDefinition) -> bool {
    if existing.week_number < new.week_number {
        existing.publish_at >= new.publish_at
    } else if existing.week_number > new.week_number {
        existing.publish_at <= new.publish_at
    } else {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;

    fn handler(fx: &Fixture) -> PublishWeekHandler {
        PublishWeekHandler::new(fx.store_port(), fx.clock_port())
    }

    fn publish(n: u32, at: i64) -> PublishWeekCommand {
        PublishWeekCommand {
            track_id: track(),
            week_number: week(n),
            year: 2026,
            publish_at: day(at),
            expire_at: None,
            items: vec![item("q1"), item("q2")],
        }
    }

    #[tokio::test]
    async fn publishes_and_lists_week() {
        let fx = Fixture::strict();
        let published = handler(&fx).handle(publish(1, 0)).await.unwrap();

        assert!(published.is_active);
        assert_eq!(published.created_at, day(0));
        assert_eq!(fx.weeks().await, vec![published]);
    }

    #[tokio::test]
    async fn duplicate_week_is_rejected() {
        let fx = Fixture::strict();
        handler(&fx).handle(publish(1, 0)).await.unwrap();

        let err = handler(&fx).handle(publish(1, 3)).await.unwrap_err();
        assert!(matches!(err, ProgressionError::DuplicateWeek { .. }));
    }

    #[tokio::test]
    async fn deactivated_week_can_be_replaced() {
        let fx = Fixture::strict();
        let first = handler(&fx).handle(publish(1, 0)).await.unwrap();
        fx.store.deactivate_week(&first.id).await.unwrap();

        let replacement = handler(&fx).handle(publish(1, 1)).await.unwrap();

        assert_ne!(replacement.id, first.id);
        assert_eq!(fx.weeks().await, vec![replacement]);
    }

    #[tokio::test]
    async fn publish_times_must_increase_with_week_number() {
        let fx = Fixture::strict();
        handler(&fx).handle(publish(1, 0)).await.unwrap();
        handler(&fx).handle(publish(3, 14)).await.unwrap();

        let too_early = handler(&fx).handle(publish(2, 0)).await.unwrap_err();
        assert!(matches!(
            too_early,
            ProgressionError::ValidationFailed { ref field, .. } if field == "publish_at"
        ));
        let too_late = handler(&fx).handle(publish(2, 14)).await.unwrap_err();
        assert!(matches!(too_late, ProgressionError::ValidationFailed { .. }));

        handler(&fx).handle(publish(2, 7)).await.unwrap();
    }

    #[tokio::test]
    async fn invalid_items_are_rejected_before_storage() {
        let fx = Fixture::strict();
        let mut cmd = publish(1, 0);
        cmd.items[0].correct_answer = "Z".to_string();

        let err = handler(&fx).handle(cmd).await.unwrap_err();
        assert!(matches!(err, ProgressionError::ValidationFailed { .. }));
        assert!(fx.weeks().await.is_empty());
    }
}
