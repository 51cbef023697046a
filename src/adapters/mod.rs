//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `clock` - System and fixed clocks
//! - `http` - Axum REST API
//! - `memory` - In-memory progression store
//! - `postgres` - PostgreSQL progression store
//! - `scheduler` - Background advancement sweep

pub mod clock;
pub mod http;
pub mod memory;
pub mod postgres;
pub mod scheduler;

pub use clock::{FixedClock, SystemClock};
pub use memory::InMemoryProgressionStore;
pub use postgres::PostgresProgressionStore;
pub use scheduler::{SweepRunner, SweepRunnerConfig};
