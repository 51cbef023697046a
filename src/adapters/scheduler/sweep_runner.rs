//! SweepRunner - Background service that runs the advancement sweep.
//!
//! Runs one pass immediately, then one per interval. Passes never overlap
//! within a process; instances on other hosts may overlap safely because
//! every pointer move goes through the revision CAS.
//!
//! ## Configuration
//!
//! | Setting | Default | Description |
//! |---------|---------|-------------|
//! | `interval` | 1h | Time between passes |
//! | `batch_size` | 500 | Pointers read per page |
//!
//! ## Shutdown
//!
//! Stops when the shutdown channel flips to `true` or its sender is dropped.
//! A pass in progress is finished first.

use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{self, MissedTickBehavior};

use crate::application::{RunAdvancementSweepCommand, RunAdvancementSweepHandler, SweepReport};
use crate::config::ProgressionConfig;

/// Configuration for the SweepRunner service.
#[derive(Debug, Clone)]
pub struct SweepRunnerConfig {
    /// Time between passes.
    pub interval: Duration,

    /// Pointers read per page.
    pub batch_size: u32,
}

impl Default for SweepRunnerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(3600),
            batch_size: 500,
        }
    }
}

impl SweepRunnerConfig {
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_batch_size(mut self, size: u32) -> Self {
        self.batch_size = size;
        self
    }
}

impl From<&ProgressionConfig> for SweepRunnerConfig {
    fn from(config: &ProgressionConfig) -> Self {
        Self::default()
            .with_interval(config.sweep_interval())
            .with_batch_size(config.sweep_batch_size)
    }
}

/// Periodic driver for [`RunAdvancementSweepHandler`].
pub struct SweepRunner {
    handler: RunAdvancementSweepHandler,
    config: SweepRunnerConfig,
}

impl SweepRunner {
    pub fn new(handler: RunAdvancementSweepHandler, config: SweepRunnerConfig) -> Self {
        Self { handler, config }
    }

    /// Run passes until shutdown is signalled.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut interval = time::interval(self.config.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            interval_secs = self.config.interval.as_secs(),
            batch_size = self.config.batch_size,
            "advancement sweep runner started"
        );

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }

                _ = interval.tick() => {
                    self.run_once().await;
                }
            }
        }

        tracing::info!("advancement sweep runner stopped");
    }

    /// Run exactly one pass.
    pub async fn run_once(&self) -> SweepReport {
        self.handler
            .handle(RunAdvancementSweepCommand {
                batch_size: self.config.batch_size,
            })
            .await
    }
}
