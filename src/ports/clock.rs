//! Clock port.
//!
//! Every "now" in the application layer comes from here so tests can
//! step across week boundaries deterministically.

use crate::domain::foundation::Timestamp;

/// Source of the current UTC instant.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}
