//! PostgreSQL adapters - Database implementations for store ports.
//!
//! - `PostgresProgressionStore` - Week definitions, pointers and completions

mod progression_store;

pub use progression_store::PostgresProgressionStore;
