use crate::error::{Categorized, ErrorCategory};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IntelError {
    #[error("connection to intel backend failed: {0}")]
    Connection(String),
    #[error("request to intel backend timed out")]
    Timeout,
    #[error("intel backend rejected request: {0}")]
    BadRequest(String),
    #[error("intel circuit is open")]
    CircuitOpen,
}

impl Categorized for IntelError {
    fn category(&self) -> ErrorCategory {
        match self {
            IntelError::Connection(_) => ErrorCategory::Connection,
            IntelError::Timeout => ErrorCategory::Timeout,
            IntelError::BadRequest(_) => ErrorCategory::Validation,
            IntelError::CircuitOpen => ErrorCategory::RateLimit,
        }
    }
}
