//! Engine configuration.
//!
//! Loaded from JSON; every field has a default, so `{}` is a valid file.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::{Priority, SlaPolicy};
use crate::error::ConfigError;

/// Upper bound for `tick_interval_secs` (one week).
pub const MAX_TICK_INTERVAL_SECS: u64 = 7 * 24 * 60 * 60;

/// Default SLA policy per priority, applied to jobs created without an
/// explicit policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyDefaults {
    pub urgent: SlaPolicy,
    pub high: SlaPolicy,
    pub normal: SlaPolicy,
    pub low: SlaPolicy,
}

impl PolicyDefaults {
    pub fn for_priority(&self, priority: Priority) -> &SlaPolicy {
        match priority {
            Priority::Urgent => &self.urgent,
            Priority::High => &self.high,
            Priority::Normal => &self.normal,
            Priority::Low => &self.low,
        }
    }
}

impl Default for PolicyDefaults {
    fn default() -> Self {
        Self {
            urgent: SlaPolicy::for_priority(Priority::Urgent),
            high: SlaPolicy::for_priority(Priority::High),
            normal: SlaPolicy::for_priority(Priority::Normal),
            low: SlaPolicy::for_priority(Priority::Low),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Seconds between ticks.
    pub tick_interval_secs: u64,

    /// Share of a stage budget (percent) after which an on-track job shows
    /// amber.
    pub amber_threshold_percent: u8,

    pub policies: PolicyDefaults,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_interval_secs: 60,
            amber_threshold_percent: 75,
            policies: PolicyDefaults::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_TICK_INTERVAL_SECS).contains(&self.tick_interval_secs) {
            return Err(ConfigError::Invalid(format!(
                "tick_interval_secs must be within 1..={MAX_TICK_INTERVAL_SECS} (got {})",
                self.tick_interval_secs
            )));
        }
        if !(1..=100).contains(&self.amber_threshold_percent) {
            return Err(ConfigError::Invalid(format!(
                "amber_threshold_percent must be within 1..=100 (got {})",
                self.amber_threshold_percent
            )));
        }
        for priority in Priority::ALL {
            self.policies
                .for_priority(priority)
                .validate()
                .map_err(|e| ConfigError::Invalid(format!("{priority} policy: {e}")))?;
        }
        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval_secs)
    }
}
