//! RunAdvancementSweepHandler - Advances accelerated pointers in bulk.
//!
//! Catches up users who have not come back since the next week published.
//! Uses the same CAS step as completion, so sweeps on several instances and
//! concurrent completions never move one pointer twice for one revision.

use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::foundation::TrackId;
use crate::domain::progression::{UnlockPolicies, UnlockPolicy, WeekDefinition};
use crate::ports::{Clock, PointerKey, ProgressionStore};

use super::advancement::advance_if_eligible;

/// Command for one sweep pass.
#[derive(Debug, Clone, Copy)]
pub struct RunAdvancementSweepCommand {
    /// Pointers read per page.
    pub batch_size: u32,
}

/// Counters for one pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Accelerated pointers examined.
    pub processed: u64,
    pub advanced: u64,
    pub errors: u64,
}

/// Handler for the advancement sweep.
pub struct RunAdvancementSweepHandler {
    store: Arc<dyn ProgressionStore>,
    clock: Arc<dyn Clock>,
    policies: UnlockPolicies,
}

impl RunAdvancementSweepHandler {
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

    /// Runs one pass. Individual failures are counted, never returned.
    pub async fn handle(&self, cmd: RunAdvancementSweepCommand) -> SweepReport {
        let batch_size = cmd.batch_size.max(1);
        let now = self.clock.now();
        let mut report = SweepReport::default();
        let mut weeks_by_track: HashMap<TrackId, Vec<WeekDefinition>> = HashMap::new();
        let mut after: Option<PointerKey> = None;

        loop {
            let page = match self.store.list_pointers(after.as_ref(), batch_size).await {
                Ok(page) => page,
                Err(e) => {
                    tracing::warn!(error = %e, "sweep failed to list pointers; ending pass");
                    report.errors += 1;
                    break;
                }
            };
            let Some(last) = page.last() else {
                break;
            };
            after = Some(PointerKey::of(last));
            let exhausted = page.len() < batch_size as usize;

            for pointer in &page {
                let policy = self.policies.policy_for(&pointer.track_id);
                if policy != UnlockPolicy::Accelerated {
                    continue;
                }
                report.processed += 1;

                if !weeks_by_track.contains_key(&pointer.track_id) {
                    match self.store.list_weeks(&pointer.track_id).await {
                        Ok(weeks) => {
                            weeks_by_track.insert(pointer.track_id.clone(), weeks);
                        }
                        Err(e) => {
                            tracing::warn!(
                                track_id = %pointer.track_id,
                                error = %e,
                                "sweep failed to load weeks"
                            );
                            report.errors += 1;
                            continue;
                        }
                    }
                }
                let weeks = weeks_by_track
                    .get(&pointer.track_id)
                    .map(Vec::as_slice)
                    .unwrap_or_default();

                match advance_if_eligible(self.store.as_ref(), policy, pointer, weeks, now).await {
                    Ok(outcome) if outcome.advanced => report.advanced += 1,
                    Ok(_) => {}
                    Err(e) => {
                        tracing::warn!(
                            user_id = %pointer.user_id,
                            track_id = %pointer.track_id,
                            error = %e,
                            "sweep failed to advance pointer"
                        );
                        report.errors += 1;
                    }
                }
            }

            if exhausted {
                break;
            }
        }

        tracing::info!(
            processed = report.processed,
            advanced = report.advanced,
            errors = report.errors,
            "advancement sweep finished"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::adapters::memory::InMemoryProgressionStore;
    use crate::domain::foundation::UserId;
    use std::sync::atomic::Ordering;

    fn handler(fx: &Fixture) -> RunAdvancementSweepHandler {
        RunAdvancementSweepHandler::new(fx.store_port(), fx.clock_port(), fx.policies.clone())
    }

    async fn seed_users(store: &InMemoryProgressionStore, ids: &[&str]) {
        for id in ids {
            store
                .get_or_create_pointer(&UserId::new(*id).unwrap(), &track(), day(0))
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn sweep_advances_every_accelerated_pointer_once() {
        let fx = Fixture::accelerated();
        fx.publish_weeks(&[0, 7, 14]).await;
        seed_users(&fx.store, &["a", "b", "c", "d", "e"]).await;
        fx.clock.set(day(20));

        let report = handler(&fx)
            .handle(RunAdvancementSweepCommand { batch_size: 2 })
            .await;

        assert_eq!(
            report,
            SweepReport {
                processed: 5,
                advanced: 5,
                errors: 0
            }
        );
        let pointers = fx.store.list_pointers(None, 10).await.unwrap();
        assert!(pointers.iter().all(|p| p.current_week == week(2)));
    }

    #[tokio::test]
    async fn sweep_leaves_strict_tracks_alone() {
        let fx = Fixture::strict();
        fx.publish_weeks(&[0, 7]).await;
        seed_users(&fx.store, &["a", "b"]).await;
        fx.clock.set(day(10));

        let report = handler(&fx)
            .handle(RunAdvancementSweepCommand { batch_size: 10 })
            .await;

        assert_eq!(report, SweepReport::default());
        let pointers = fx.store.list_pointers(None, 10).await.unwrap();
        assert!(pointers.iter().all(|p| p.current_week == week(1) && p.revision == 0));
    }

    #[tokio::test]
    async fn sweep_before_next_publish_is_a_no_op() {
        let fx = Fixture::accelerated();
        fx.publish_weeks(&[0, 7]).await;
        seed_users(&fx.store, &["a"]).await;
        fx.clock.set(day(6));

        let report = handler(&fx)
            .handle(RunAdvancementSweepCommand { batch_size: 10 })
            .await;
        assert_eq!(report.processed, 1);
        assert_eq!(report.advanced, 0);
    }

    #[tokio::test]
    async fn per_user_failure_is_counted_and_pass_continues() {
        let fx = Fixture::accelerated();
        fx.publish_weeks(&[0, 7]).await;
        seed_users(&fx.store, &["a", "b", "c"]).await;
        fx.clock.set(day(8));

        let flaky = Arc::new(FlakyStore::new((*fx.store).clone()));
        flaky.fail_cas_for_user("b");
        let handler =
            RunAdvancementSweepHandler::new(flaky, fx.clock_port(), fx.policies.clone());

        let report = handler
            .handle(RunAdvancementSweepCommand { batch_size: 1 })
            .await;
        assert_eq!(
            report,
            SweepReport {
                processed: 3,
                advanced: 2,
                errors: 1
            }
        );
    }

    #[tokio::test]
    async fn page_listing_failure_ends_the_pass() {
        let fx = Fixture::accelerated();
        fx.publish_weeks(&[0, 7]).await;
        seed_users(&fx.store, &["a"]).await;

        let flaky = Arc::new(FlakyStore::new((*fx.store).clone()));
        flaky.fail_list_pointers.store(true, Ordering::SeqCst);
        let handler =
            RunAdvancementSweepHandler::new(flaky, fx.clock_port(), fx.policies.clone());

        let report = handler
            .handle(RunAdvancementSweepCommand { batch_size: 10 })
            .await;
        assert_eq!(
            report,
            SweepReport {
                processed: 0,
                advanced: 0,
                errors: 1
            }
        );
    }

    #[tokio::test]
    async fn sweep_steps_over_deactivated_week() {
        let fx = Fixture::accelerated();
        fx.publish_weeks(&[0, 7, 14]).await;
        fx.deactivate(2).await;
        seed_users(&fx.store, &["a"]).await;
        fx.clock.set(day(20));
        let sweep = handler(&fx);

        let first = sweep.handle(RunAdvancementSweepCommand { batch_size: 10 }).await;
        let second = sweep.handle(RunAdvancementSweepCommand { batch_size: 10 }).await;

        assert_eq!(first.advanced, 1);
        assert_eq!(second.advanced, 0);
        let pointers = fx.store.list_pointers(None, 10).await.unwrap();
        assert_eq!(pointers[0].current_week, week(3));
        assert_eq!(pointers[0].revision, 1);
    }

    #[tokio::test]
    async fn repeated_sweeps_move_one_week_per_pass() {
        let fx = Fixture::accelerated();
        fx.publish_weeks(&[0, 7, 14]).await;
        seed_users(&fx.store, &["a"]).await;
        fx.clock.set(day(30));
        let sweep = handler(&fx);

        sweep.handle(RunAdvancementSweepCommand { batch_size: 10 }).await;
        sweep.handle(RunAdvancementSweepCommand { batch_size: 10 }).await;
        let third = sweep.handle(RunAdvancementSweepCommand { batch_size: 10 }).await;

        assert_eq!(third.advanced, 0);
        let pointers = fx.store.list_pointers(None, 10).await.unwrap();
        assert_eq!(pointers[0].current_week, week(3));
    }
}
