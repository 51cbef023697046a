//! Progression configuration
//!
//! Unlock policies are configured per track with a process-wide default:
//!
//! ```text
//! PREP_TRACK__PROGRESSION__DEFAULT_POLICY=strict
//! PREP_TRACK__PROGRESSION__TRACK_POLICIES__USMLE=accelerated
//! ```

use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

use crate::domain::progression::{UnlockPolicies, UnlockPolicy};

use super::error::ValidationError;

/// Progression engine settings.
/// Largest page the advancement sweep may read at once.
pub const MAX_SWEEP_BATCH_SIZE: u32 = 10_000;

#[derive(Debug, Clone, Deserialize)]
pub struct ProgressionConfig {
    /// Policy for tracks without an override
    #[serde(default = "default_policy")]
    pub default_policy: String,

    /// Track id -> policy name
    #[serde(default)]
    pub track_policies: HashMap<String, String>,

    /// Completions returned alongside the current week
    #[serde(default = "default_history_context_size")]
    pub history_context_size: u32,

    #[serde(default = "default_history_limit")]
    pub default_history_limit: u32,

    #[serde(default = "default_max_history_limit")]
    pub max_history_limit: u32,

    /// Run the accelerated advancement sweep in the background
    #[serde(default)]
    pub sweep_enabled: bool,

    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,

    /// Pointers read per sweep page
    #[serde(default = "default_sweep_batch_size")]
    pub sweep_batch_size: u32,
}

impl ProgressionConfig {
    /// Parses the configured policy names.
    pub fn unlock_policies(&self) -> Result<UnlockPolicies, ValidationError> {
        let default = parse_policy("default_policy", &self.default_policy)?;
        self.track_policies
            .iter()
            .try_fold(UnlockPolicies::new(default), |policies, (track, name)| {
                let policy = parse_policy(&format!("track '{}'", track), name)?;
                Ok(policies.with_track(track, policy))
            })
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    /// Validate progression configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.unlock_policies()?;
        if self.default_history_limit == 0
            || self.default_history_limit > self.max_history_limit
            || self.max_history_limit > 500
        {
            return Err(ValidationError::InvalidHistoryLimits);
        }
        if self.history_context_size > 50 {
            return Err(ValidationError::HistoryContextTooLarge);
        }
        if self.sweep_interval_secs == 0
            || self.sweep_batch_size == 0
            || self.sweep_batch_size > MAX_SWEEP_BATCH_SIZE
        {
            return Err(ValidationError::InvalidSweepSettings);
        }
        Ok(())
    }
}

fn parse_policy(scope: &str, name: &str) -> Result<UnlockPolicy, ValidationError> {
    name.parse()
        .map_err(|_| ValidationError::InvalidUnlockPolicy {
            scope: scope.to_string(),
            policy: name.to_string(),
        })
}

impl Default for ProgressionConfig {
    fn default() -> Self {
        Self {
            default_policy: default_policy(),
            track_policies: HashMap::new(),
            history_context_size: default_history_context_size(),
            default_history_limit: default_history_limit(),
            max_history_limit: default_max_history_limit(),
            sweep_enabled: false,
            sweep_interval_secs: default_sweep_interval(),
            sweep_batch_size: default_sweep_batch_size(),
        }
    }
}

fn default_policy() -> String {
    "strict".to_string()
}

fn default_history_context_size() -> u32 {
    5
}

fn default_history_limit() -> u32 {
    10
}

fn default_max_history_limit() -> u32 {
    50
}

fn default_sweep_interval() -> u64 {
    3600
}

fn default_sweep_batch_size() -> u32 {
    500
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::TrackId;

    #[test]
    fn defaults_are_strict_and_valid() {
        let config = ProgressionConfig::default();
        assert!(config.validate().is_ok());
        let policies = config.unlock_policies().unwrap();
        assert_eq!(
            policies.policy_for(&TrackId::new("anything").unwrap()),
            UnlockPolicy::Strict
        );
        assert_eq!(config.sweep_interval(), Duration::from_secs(3600));
    }

    #[test]
    fn track_overrides_apply() {
        let config = ProgressionConfig {
            track_policies: HashMap::from([("usmle".to_string(), "Accelerated".to_string())]),
            ..Default::default()
        };
        let policies = config.unlock_policies().unwrap();
        assert_eq!(
            policies.policy_for(&TrackId::new("USMLE").unwrap()),
            UnlockPolicy::Accelerated
        );
        assert_eq!(
            policies.policy_for(&TrackId::new("cpa").unwrap()),
            UnlockPolicy::Strict
        );
    }

    #[test]
    fn unknown_policy_names_are_rejected() {
        let config = ProgressionConfig {
            default_policy: "lenient".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ValidationError::InvalidUnlockPolicy { ref policy, .. }) if policy == "lenient"
        ));

        let config = ProgressionConfig {
            track_policies: HashMap::from([("cpa".to_string(), "fast".to_string())]),
            ..Default::default()
        };
        assert!(config.unlock_policies().is_err());
    }

    #[test]
    fn history_limits_must_be_ordered() {
        let config = ProgressionConfig {
            default_history_limit: 60,
            max_history_limit: 50,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ValidationError::InvalidHistoryLimits));

        let config = ProgressionConfig {
            default_history_limit: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn sweep_settings_must_be_positive() {
        let config = ProgressionConfig {
            sweep_batch_size: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ValidationError::InvalidSweepSettings));
    }
}
