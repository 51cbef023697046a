//! Background scheduling adapters.

mod sweep_runner;

pub use sweep_runner::{SweepRunner, SweepRunnerConfig};
