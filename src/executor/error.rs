use crate::error::{Categorized, ErrorCategory};
use crate::models::InvalidTransition;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("transport error talking to the restart mechanism: {0}")]
    Transport(String),
    #[error("restart mechanism rejected the request: {0}")]
    Rejected(String),
    #[error("invalid request state transition: {0}")]
    InvalidState(#[from] InvalidTransition),
}

impl Categorized for ExecutorError {
    fn category(&self) -> ErrorCategory {
        match self {
            ExecutorError::Transport(_) => ErrorCategory::Connection,
            ExecutorError::Rejected(_) => ErrorCategory::External,
            ExecutorError::InvalidState(_) => ErrorCategory::Internal,
        }
    }
}
