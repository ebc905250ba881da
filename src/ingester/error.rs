use crate::error::{Categorized, ErrorCategory};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngesterError {
    #[error("transport connection error: {0}")]
    Connection(String),
    #[error("read timed out")]
    Timeout,
    #[error("circuit is open for the kill stream")]
    CircuitOpen,
    #[error("ingester is disconnected")]
    Disconnected,
}

impl Categorized for IngesterError {
    fn category(&self) -> ErrorCategory {
        match self {
            IngesterError::Connection(_) => ErrorCategory::Connection,
            IngesterError::Timeout => ErrorCategory::Timeout,
            IngesterError::CircuitOpen => ErrorCategory::RateLimit,
            IngesterError::Disconnected => ErrorCategory::Internal,
        }
    }
}
