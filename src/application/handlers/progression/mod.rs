//! Progression handlers.
//!
//! ## Commands
//! - Completing a week (records the completion, then tries to advance)
//! - Running the accelerated advancement sweep
//! - Publishing and deactivating week definitions (admin)
//!
//! ## Queries
//! - Current week with recent history
//! - Completion history, cursor-paged
//! - Roadmap

mod advancement;
mod complete_week;
mod deactivate_week;
mod get_current_week;
mod get_roadmap;
mod list_history;
mod publish_week;
mod run_advancement_sweep;

#[cfg(test)]
pub(crate) mod test_support;

pub use advancement::AdvancementOutcome;

// Commands
pub use complete_week::{CompleteWeekCommand, CompleteWeekHandler, CompleteWeekResult};
pub use deactivate_week::{DeactivateWeekCommand, DeactivateWeekHandler};
pub use publish_week::{PublishWeekCommand, PublishWeekHandler};
pub use run_advancement_sweep::{
    RunAdvancementSweepCommand, RunAdvancementSweepHandler, SweepReport,
};

// Queries
pub use get_current_week::{GetCurrentWeekHandler, GetCurrentWeekQuery, GetCurrentWeekResult};
pub use get_roadmap::{GetRoadmapHandler, GetRoadmapQuery};
pub use list_history::{ListHistoryHandler, ListHistoryQuery, ListHistoryResult};
