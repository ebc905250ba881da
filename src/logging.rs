//! Logging initialization (§2.1), grounded on the teacher's `logging::config` module but
//! simplified to a single stdout/env-filter subscriber since file logging and OpenTelemetry
//! export are out of scope here.

use crate::config::{LogConfig, LogFormat};
use thiserror::Error;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("invalid log level `{0}`: {1}")]
    InvalidLevel(String, String),
    #[error("unable to install the global logging subscriber")]
    AlreadyInitialized,
}

/// Installs the process-wide `tracing` subscriber. `RUST_LOG`, if set, takes precedence
/// over `log.level`.
pub fn init(config: &LogConfig) -> Result<(), LoggingError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|err| LoggingError::InvalidLevel(config.level.clone(), err.to_string()))?;

    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    let result = match config.format {
        LogFormat::Json => subscriber.json().try_init(),
        LogFormat::Pretty => subscriber.try_init(),
    };
    result.map_err(|_| LoggingError::AlreadyInitialized)
}
