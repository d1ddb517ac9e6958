//! Logging setup shared by the library's consumers.
//!
//! ```ignore
//! use slot_engine::tracing::{init_tracing, TracingConfig};
//!
//! init_tracing(TracingConfig::default())?;
//! ```
//!
//! `RUST_LOG` overrides the default level when set.

use thiserror::Error;
use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Error)]
pub enum TracingError {
    #[error("failed to set global tracing subscriber: {0}")]
    SetGlobalSubscriber(#[from] tracing::subscriber::SetGlobalDefaultError),

    #[error("failed to parse env filter: {0}")]
    EnvFilter(#[from] tracing_subscriber::filter::ParseError),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TracingOutputFormat {
    /// Single-line human-readable output.
    #[default]
    Compact,
    Pretty,
    Json,
}

#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Level used when neither `RUST_LOG` nor `env_filter` is set.
    pub default_level: Level,
    pub output_format: TracingOutputFormat,
    pub include_target: bool,
    pub include_timestamp: bool,
    /// Explicit filter directive; takes precedence over `RUST_LOG`.
    pub env_filter: Option<String>,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            default_level: Level::WARN,
            output_format: TracingOutputFormat::Compact,
            include_target: false,
            include_timestamp: false,
            env_filter: None,
        }
    }
}

impl TracingConfig {
    /// Verbose CLI output (`-v`).
    #[must_use]
    pub fn verbose() -> Self {
        Self {
            default_level: Level::DEBUG,
            include_target: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_level(mut self, level: Level) -> Self {
        self.default_level = level;
        self
    }

    #[must_use]
    pub fn with_format(mut self, format: TracingOutputFormat) -> Self {
        self.output_format = format;
        self
    }

    #[must_use]
    pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    fn filter(&self) -> Result<EnvFilter, TracingError> {
        if let Some(directive) = &self.env_filter {
            return Ok(EnvFilter::try_new(directive)?);
        }
        Ok(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("slot_engine={0},slots={0}", self.default_level))
        }))
    }
}

/// Install the global subscriber. Logs go to stderr so command output on
/// stdout stays machine-readable.
///
/// # Errors
///
/// Fails if a global subscriber is already set or the filter directive is
/// invalid.
pub fn init_tracing(config: TracingConfig) -> Result<(), TracingError> {
    let filter = config.filter()?;
    let base = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(config.include_target);

    let layer = match (config.output_format, config.include_timestamp) {
        (TracingOutputFormat::Json, _) => base.json().boxed(),
        (TracingOutputFormat::Pretty, true) => base.pretty().boxed(),
        (TracingOutputFormat::Pretty, false) => base.pretty().without_time().boxed(),
        (TracingOutputFormat::Compact, true) => base.compact().boxed(),
        (TracingOutputFormat::Compact, false) => base.compact().without_time().boxed(),
    };

    let subscriber = tracing_subscriber::registry().with(filter).with(layer);
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}
