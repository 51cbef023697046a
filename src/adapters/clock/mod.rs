//! Clock adapters.
//!
//! - `SystemClock` - Wall-clock UTC, used in production
//! - `FixedClock` - Settable clock for tests and simulations

mod fixed_clock;
mod system_clock;

pub use fixed_clock::FixedClock;
pub use system_clock::SystemClock;
