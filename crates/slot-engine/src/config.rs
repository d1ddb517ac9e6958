//! Engine configuration.
//!
//! Every field has a default, so an empty JSON object is a valid config:
//!
//! ```json
//! {
//!   "calendar": { "first_weekday": "Mon", "rolling_horizon_years": 2, "timezone": "Europe/Paris" },
//!   "refresh": { "interval": 5, "policy": "latest", "initial_backoff": 5, "max_backoff": 300 }
//! }
//! ```
//!
//! Durations are expressed in (possibly fractional) seconds.

use std::path::Path;
use std::time::Duration;

use chrono::Weekday;
use serde::{Deserialize, Serialize};

use crate::clock::SystemClock;
use crate::error::ConfigError;
use crate::horizon::DEFAULT_ROLLING_YEARS;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub calendar: CalendarConfig,
    pub refresh: RefreshConfig,
}

impl EngineConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }
}

/// Calendar display and horizon settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalendarConfig {
    /// First column of the month grid. Display only.
    pub first_weekday: Weekday,
    /// Length of the rolling horizon for weekly schedules without an end date.
    pub rolling_horizon_years: u32,
    /// IANA zone used to decide what "today" is. UTC when unset.
    pub timezone: Option<String>,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            first_weekday: Weekday::Mon,
            rolling_horizon_years: DEFAULT_ROLLING_YEARS,
            timezone: None,
        }
    }
}

impl CalendarConfig {
    pub fn clock(&self) -> Result<SystemClock, ConfigError> {
        match &self.timezone {
            Some(name) => SystemClock::from_timezone_name(name),
            None => Ok(SystemClock::utc()),
        }
    }
}

/// What the coordinator does with snapshots after the first one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotPolicy {
    /// Every successful fetch replaces the published snapshot.
    #[default]
    Latest,
    /// Only the first snapshot is published; later ones are dropped.
    FirstOnly,
}

/// Refresh loop timing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    #[serde(with = "secs")]
    pub interval: Duration,
    pub policy: SnapshotPolicy,
    #[serde(with = "secs")]
    pub initial_backoff: Duration,
    #[serde(with = "secs")]
    pub max_backoff: Duration,
    pub backoff_multiplier: f64,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            policy: SnapshotPolicy::Latest,
            initial_backoff: Duration::from_secs(5),
            max_backoff: Duration::from_secs(300),
            backoff_multiplier: 2.0,
        }
    }
}

impl RefreshConfig {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_policy(mut self, policy: SnapshotPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub fn with_backoff(mut self, initial: Duration, max: Duration, multiplier: f64) -> Self {
        self.initial_backoff = initial;
        self.max_backoff = max;
        self.backoff_multiplier = multiplier;
        self
    }

    /// Delay before the next attempt after `consecutive_failures` failures.
    /// Zero failures means the regular interval.
    pub fn next_delay(&self, consecutive_failures: u32) -> Duration {
        if consecutive_failures == 0 {
            return self.interval;
        }
        let exponent = i32::try_from(consecutive_failures - 1).unwrap_or(i32::MAX);
        let delay = self.initial_backoff.as_secs_f64() * self.backoff_multiplier.powi(exponent);
        let max = self.max_backoff.as_secs_f64();
        if delay.is_finite() {
            Duration::from_secs_f64(delay.clamp(0.0, max))
        } else {
            self.max_backoff
        }
    }
}

mod secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}
