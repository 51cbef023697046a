//! DeactivateWeekHandler - Command handler for withdrawing a week.

use std::sync::Arc;

use crate::domain::foundation::{ErrorCode, WeekDefinitionId};
use crate::domain::progression::{ProgressionError, WeekDefinition};
use crate::ports::ProgressionStore;

/// Command to soft-deactivate a week definition.
#[derive(Debug, Clone)]
pub struct DeactivateWeekCommand {
    pub week_id: WeekDefinitionId,
}

/// Handler for deactivating weeks.
///
/// Deactivated weeks drop out of progression and roadmaps. Completion
/// records that reference them are kept.
pub struct DeactivateWeekHandler {
    store: Arc<dyn ProgressionStore>,
}

impl DeactivateWeekHandler {
    pub fn new(store: Arc<dyn ProgressionStore>) -> Self {
        Self { store }
    }

    /// Returns the withdrawn definition.
    pub async fn handle(
        &self,
        cmd: DeactivateWeekCommand,
    ) -> Result<WeekDefinition, ProgressionError> {
        let mut week = self
            .store
            .find_week(&cmd.week_id)
            .await?
            .ok_or(ProgressionError::WeekNotFound(cmd.week_id))?;

        self.store
            .deactivate_week(&cmd.week_id)
            .await
            .map_err(|e| match e.code {
                ErrorCode::WeekNotFound => ProgressionError::WeekNotFound(cmd.week_id),
                _ => e.into(),
            })?;
        week.is_active = false;

        tracing::info!(
            week_id = %cmd.week_id,
            track_id = %week.track_id,
            week = %week.week_number,
            year = week.year,
            "week deactivated"
        );
        Ok(week)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;

    #[tokio::test]
    async fn deactivates_existing_week() {
        let fx = Fixture::strict();
        let weeks = fx.publish_weeks(&[0, 7]).await;
        let handler = DeactivateWeekHandler::new(fx.store_port());

        let withdrawn = handler
            .handle(DeactivateWeekCommand {
                week_id: weeks[0].id,
            })
            .await
            .unwrap();

        assert_eq!(withdrawn.id, weeks[0].id);
        assert_eq!(withdrawn.week_number, week(1));
        assert!(!withdrawn.is_active);
        let remaining = fx.weeks().await;
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].week_number, week(2));
    }

    #[tokio::test]
    async fn unknown_week_is_not_found() {
        let fx = Fixture::strict();
        let handler = DeactivateWeekHandler::new(fx.store_port());
        let id = WeekDefinitionId::new();

        let err = handler
            .handle(DeactivateWeekCommand { week_id: id })
            .await
            .unwrap_err();
        assert_eq!(err, ProgressionError::WeekNotFound(id));
    }

    #[tokio::test]
    async fn deactivating_twice_reports_the_week_again() {
        let fx = Fixture::strict();
        let weeks = fx.publish_weeks(&[0]).await;
        let handler = DeactivateWeekHandler::new(fx.store_port());
        let cmd = DeactivateWeekCommand {
            week_id: weeks[0].id,
        };

        handler.handle(cmd.clone()).await.unwrap();
        let again = handler.handle(cmd).await.unwrap();

        assert!(!again.is_active);
        assert!(fx.weeks().await.is_empty());
    }
}
