//! Application configuration module
//!
//! Type-safe configuration loaded from environment variables using the
//! `config` and `dotenvy` crates. Variables use the `PREP_TRACK` prefix and
//! `__` between nested keys.
//!
//! # Example
//!
//! ```no_run
//! use prep_track::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! ```

mod database;
mod error;
mod progression;
mod server;

pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use progression::{ProgressionConfig, MAX_SWEEP_BATCH_SIZE};
pub use server::{Environment, ServerConfig};

use serde::Deserialize;

/// Root application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration (host, port, environment, logging)
    #[serde(default)]
    pub server: ServerConfig,

    /// Database configuration (PostgreSQL connection)
    pub database: DatabaseConfig,

    /// Unlock policies, history paging and the advancement sweep
    #[serde(default)]
    pub progression: ProgressionConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// 1. Loads `.env` if present (development)
    /// 2. Reads variables with the `PREP_TRACK` prefix
    /// 3. Splits nested keys on `__`
    ///
    /// - `PREP_TRACK__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `PREP_TRACK__PROGRESSION__TRACK_POLICIES__CPA=accelerated`
    ///   -> `progression.track_policies["cpa"] = "accelerated"`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or values
    /// cannot be parsed.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("PREP_TRACK")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` for malformed addresses, pool sizing, unknown
    /// policy names or out-of-range paging and sweep settings.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.database.validate()?;
        self.progression.validate()?;
        Ok(())
    }

    /// Check if running in production environment
    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::TrackId;
    use crate::domain::progression::UnlockPolicy;
    use std::env;
    use std::sync::Mutex;

    // Env vars are process-global.
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    const VARS: &[&str] = &[
        "PREP_TRACK__DATABASE__URL",
        "PREP_TRACK__SERVER__PORT",
        "PREP_TRACK__SERVER__ENVIRONMENT",
        "PREP_TRACK__PROGRESSION__DEFAULT_POLICY",
        "PREP_TRACK__PROGRESSION__TRACK_POLICIES__USMLE",
        "PREP_TRACK__PROGRESSION__SWEEP_ENABLED",
        "PREP_TRACK__PROGRESSION__MAX_HISTORY_LIMIT",
    ];

    fn set_minimal_env() {
        env::set_var("PREP_TRACK__DATABASE__URL", "postgresql://test@localhost/prep");
    }

    fn clear_env() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    #[test]
    fn test_load_from_environment() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.database.url, "postgresql://test@localhost/prep");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.progression.default_policy, "strict");
        assert!(!config.progression.sweep_enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_progression_settings_from_environment() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::set_var("PREP_TRACK__PROGRESSION__TRACK_POLICIES__USMLE", "accelerated");
        env::set_var("PREP_TRACK__PROGRESSION__SWEEP_ENABLED", "true");
        env::set_var("PREP_TRACK__PROGRESSION__MAX_HISTORY_LIMIT", "25");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert!(config.progression.sweep_enabled);
        assert_eq!(config.progression.max_history_limit, 25);
        let policies = config.progression.unlock_policies().unwrap();
        assert_eq!(
            policies.policy_for(&TrackId::new("usmle").unwrap()),
            UnlockPolicy::Accelerated
        );
    }

    #[test]
    fn test_unknown_policy_fails_validation() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::set_var("PREP_TRACK__PROGRESSION__DEFAULT_POLICY", "whenever");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert!(matches!(
            config.validate(),
            Err(ValidationError::InvalidUnlockPolicy { .. })
        ));
    }

    #[test]
    fn test_is_production() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::set_var("PREP_TRACK__SERVER__ENVIRONMENT", "production");
        let result = AppConfig::load();
        clear_env();

        assert!(result.unwrap().is_production());
    }

    #[test]
    fn test_missing_database_url_fails_to_load() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();
        assert!(AppConfig::load().is_err());
    }
}
