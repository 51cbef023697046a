//! The per-user, per-track progression pointer.
//!
//! The pointer is the only shared mutable state in the progression
//! subsystem. It changes only through `advanced_to`, and stores persist that
//! change with a compare-and-swap on `revision`.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{Timestamp, TrackId, UserId};

use super::WeekNumber;

/// Where a user currently is inside a track.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProgressionPointer {
    pub user_id: UserId,
    pub track_id: TrackId,
    pub current_week: WeekNumber,
    /// When the pointer last advanced (creation time for a fresh pointer).
    pub advanced_at: Timestamp,
    /// Optimistic concurrency token, incremented on every advancement.
    pub revision: u64,
    pub created_at: Timestamp,
}

impl UserProgressionPointer {
    /// A fresh pointer on week 1.
    pub fn initial(user_id: UserId, track_id: TrackId, now: Timestamp) -> Self {
        Self {
            user_id,
            track_id,
            current_week: WeekNumber::FIRST,
            advanced_at: now,
            revision: 0,
            created_at: now,
        }
    }

    /// The pointer one week number further on, with the next revision.
    pub fn advanced(&self, now: Timestamp) -> Self {
        self.advanced_to(self.current_week.next(), now)
    }

    /// The pointer moved to `week`, with the next revision.
    ///
    /// `week` is the next active week, which is further than one number
    /// away when deactivated weeks leave a gap.
    pub fn advanced_to(&self, week: WeekNumber, now: Timestamp) -> Self {
        Self {
            current_week: week,
            advanced_at: now,
            revision: self.revision + 1,
            ..self.clone()
        }
    }

    /// A read-only projection onto another week, used for derived views.
    pub fn projected_to(&self, week: WeekNumber) -> Self {
        Self {
            current_week: week,
            ..self.clone()
        }
    }
}
