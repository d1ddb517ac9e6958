//! Error types for slot-engine operations.

use thiserror::Error;

/// Errors raised while building a [`ScheduleModel`](crate::schedule::ScheduleModel)
/// from a raw payload.
#[derive(Error, Debug)]
pub enum ScheduleError {
    /// A date-keyed entry could not be parsed as `DD/MM/YYYY`.
    #[error("Malformed date in {field}: {value:?} (expected DD/MM/YYYY)")]
    MalformedDate { field: &'static str, value: String },

    /// A weekly template key outside 1 (Monday) ..= 7 (Sunday).
    #[error("Invalid weekday number {0} (expected 1=Monday..7=Sunday)")]
    InvalidWeekday(u32),

    #[error("Invalid session duration: {0} minutes")]
    InvalidDuration(f64),

    #[error("Unknown planning option: {0} (expected 1=weekly or 2=daily)")]
    UnknownPlanningOption(u8),

    /// Both `weeklyPlanning` and `dailyPlanning` were sent without a
    /// `planningOption` to pick between them.
    #[error("Payload carries both weekly and daily planning without a planningOption")]
    AmbiguousPlanningMode,

    #[error("JSON decode error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ScheduleError {
    pub(crate) fn malformed_date(field: &'static str, value: impl Into<String>) -> Self {
        Self::MalformedDate {
            field,
            value: value.into(),
        }
    }
}

/// Errors reported by a [`ScheduleSource`](crate::refresh::ScheduleSource).
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON decode error: {0}")]
    Json(#[from] serde_json::Error),

    /// The source could not produce a payload (network down, upstream error).
    #[error("Schedule source unavailable: {0}")]
    Unavailable(String),
}

/// A single failed refresh attempt.
#[derive(Error, Debug)]
pub enum RefreshError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] SourceError),

    #[error("invalid schedule: {0}")]
    Schedule(#[from] ScheduleError),
}

/// Errors raised while loading [`EngineConfig`](crate::config::EngineConfig).
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),
}

/// Convenience alias used by the schedule construction path.
pub type Result<T> = std::result::Result<T, ScheduleError>;
