//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! - `Clock` - Current time, injectable for tests
//! - `ProgressionStore` - Week definitions, pointers and completion records

mod clock;
mod progression_store;

pub use clock::Clock;
pub use progression_store::{
    CasOutcome, HistoryCursor, PointerKey, ProgressionStore, UpsertKind,
};
