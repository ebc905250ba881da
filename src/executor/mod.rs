//! The resurrection executor (§4.7): calls the opaque module-restart mechanism and
//! advances `ResurrectionRequest` through its state machine.

pub mod error;
pub mod fake;

pub use error::ExecutorError;
pub use fake::InProcessExecutor;

use crate::models::{RequestStatus, ResurrectionRequest};
use crate::utils::backoff::ExponentialBackoff;
use std::time::Duration;

/// The opaque module-restart mechanism; concrete implementations talk to whatever
/// orchestration layer actually owns process/container lifecycle.
pub trait ModuleRestarter: Send + Sync {
    fn restart(&self, module: &str, instance_id: &str) -> Result<(), ExecutorError>;
    fn rollback(&self, module: &str, instance_id: &str) -> Result<(), ExecutorError>;
}

#[derive(Debug, Clone, Copy)]
pub struct ExecutorRetryPolicy {
    pub max_retries: u32,
    pub base: Duration,
    pub cap: Duration,
}

impl Default for ExecutorRetryPolicy {
    fn default() -> Self {
        ExecutorRetryPolicy {
            max_retries: 3,
            base: Duration::from_secs(1),
            cap: Duration::from_secs(20),
        }
    }
}

pub struct ResurrectionExecutor<R: ModuleRestarter> {
    restarter: R,
    retry: ExecutorRetryPolicy,
}

impl<R: ModuleRestarter> ResurrectionExecutor<R> {
    pub fn new(restarter: R) -> Self {
        Self::with_retry_policy(restarter, ExecutorRetryPolicy::default())
    }

    pub fn with_retry_policy(restarter: R, retry: ExecutorRetryPolicy) -> Self {
        ResurrectionExecutor { restarter, retry }
    }

    /// Drives `request` through APPROVED -> IN_PROGRESS -> COMPLETED | FAILED. Transport
    /// failures of the restart call retry under the configured policy; a logical
    /// rejection from the restarter does not retry (§4.7).
    pub fn resurrect(&self, request: &mut ResurrectionRequest) -> Result<(), ExecutorError> {
        request
            .transition(RequestStatus::InProgress)
            .map_err(ExecutorError::InvalidState)?;
        request.executed_at = Some(chrono::Utc::now());

        let mut backoff = ExponentialBackoff::new(self.retry.base, self.retry.cap);
        let mut attempt = 0;
        let outcome = loop {
            match self.restarter.restart(&request.target_module, &request.target_instance_id) {
                Ok(()) => break Ok(()),
                Err(err @ ExecutorError::Transport(_)) if attempt < self.retry.max_retries => {
                    attempt += 1;
                    std::thread::sleep(backoff.next_delay());
                    let _ = err;
                }
                Err(err) => break Err(err),
            }
        };

        match outcome {
            Ok(()) => {
                request
                    .transition(RequestStatus::Completed)
                    .map_err(ExecutorError::InvalidState)?;
                request.completed_at = Some(chrono::Utc::now());
                Ok(())
            }
            Err(err) => {
                request
                    .transition(RequestStatus::Failed)
                    .map_err(ExecutorError::InvalidState)?;
                Err(err)
            }
        }
    }

    pub fn rollback(&self, request: &mut ResurrectionRequest, reason: String) -> Result<(), ExecutorError> {
        self.restarter.rollback(&request.target_module, &request.target_instance_id)?;
        request.rollback_reason = Some(reason);
        Ok(())
    }
}
