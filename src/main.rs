//! Prep Track server binary.
//!
//! Loads configuration from the environment, connects to PostgreSQL, starts
//! the optional advancement sweep and serves the REST API until Ctrl-C.

use std::sync::Arc;

use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

use prep_track::adapters::http::{app, ProgressionAppState};
use prep_track::adapters::{PostgresProgressionStore, SweepRunner, SweepRunnerConfig, SystemClock};
use prep_track::config::AppConfig;
use prep_track::ports::{Clock, ProgressionStore};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

fn init_tracing(config: &AppConfig) -> Result<(), BoxError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.server.log_level))?;

    if config.is_production() {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(false)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
    Ok(())
}

async fn shutdown_signal(shutdown_tx: watch::Sender<bool>) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
    tracing::info!("shutdown signal received");
    let _ = shutdown_tx.send(true);
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let config = AppConfig::load()?;
    config.validate()?;
    init_tracing(&config)?;

    let pool = config.database.connect().await?;
    if config.database.run_migrations {
        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("database migrations applied");
    }

    let store: Arc<dyn ProgressionStore> = Arc::new(PostgresProgressionStore::new(pool));
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let state = ProgressionAppState::from_config(store, clock, &config.progression)?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let sweep = if config.progression.sweep_enabled {
        let runner = SweepRunner::new(
            state.sweep_handler(),
            SweepRunnerConfig::from(&config.progression),
        );
        let rx = shutdown_rx.clone();
        Some(tokio::spawn(async move { runner.run(rx).await }))
    } else {
        None
    };

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(
        %addr,
        environment = ?config.server.environment,
        sweep_enabled = config.progression.sweep_enabled,
        "prep-track listening"
    );

    axum::serve(listener, app(state, config.server.request_timeout()))
        .with_graceful_shutdown(shutdown_signal(shutdown_tx))
        .await?;

    if let Some(handle) = sweep {
        if let Err(e) = handle.await {
            tracing::error!(error = %e, "sweep runner task failed");
        }
    }

    tracing::info!("prep-track stopped");
    Ok(())
}
