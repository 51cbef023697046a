//! Progression domain module.
//!
//! Decides which week of a track a user may work on.
//!
//! # Module Structure
//!
//! - `week` - WeekDefinition, WeekNumber and content items
//! - `pointer` - UserProgressionPointer, the per-user "current week"
//! - `completion` - CompletionRecord and submissions
//! - `policy` - UnlockPolicy and the pure unlock rules
//! - `roadmap` - RoadmapBuilder and derived entries
//! - `errors` - ProgressionError

mod completion;
mod errors;
mod pointer;
pub mod policy;
mod roadmap;
mod week;

pub use completion::{
    CompletionRecord, CompletionSubmission, SubmittedAnswer, MAX_TIME_SPENT_MINUTES,
};
pub use errors::ProgressionError;
pub use pointer::UserProgressionPointer;
pub use policy::{
    advancement_origin, advancement_target, can_advance, compute_current_week, dedupe_weeks,
    find_week, next_active_week, resolve_pointer_week, UnlockPolicies, UnlockPolicy,
};
pub use roadmap::{RoadmapBuilder, RoadmapEntry, RoadmapStatus};
pub use week::{WeekDefinition, WeekItem, WeekNumber};
