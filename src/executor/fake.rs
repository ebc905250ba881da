//! In-process [`ModuleRestarter`] fake for tests.

use super::error::ExecutorError;
use super::ModuleRestarter;
use std::sync::atomic::{AtomicU32, Ordering};

enum Behavior {
    AlwaysSucceeds,
    AlwaysRejects,
    FailsNTimesThenSucceeds(u32),
}

pub struct InProcessExecutor {
    behavior: Behavior,
    calls: AtomicU32,
}

impl InProcessExecutor {
    pub fn always_succeeds() -> Self {
        InProcessExecutor {
            behavior: Behavior::AlwaysSucceeds,
            calls: AtomicU32::new(0),
        }
    }

    pub fn always_rejects() -> Self {
        InProcessExecutor {
            behavior: Behavior::AlwaysRejects,
            calls: AtomicU32::new(0),
        }
    }

    pub fn fails_n_times_then_succeeds(n: u32) -> Self {
        InProcessExecutor {
            behavior: Behavior::FailsNTimesThenSucceeds(n),
            calls: AtomicU32::new(0),
        }
    }
}

impl ModuleRestarter for InProcessExecutor {
    fn restart(&self, module: &str, _instance_id: &str) -> Result<(), ExecutorError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            Behavior::AlwaysSucceeds => Ok(()),
            Behavior::AlwaysRejects => Err(ExecutorError::Rejected(format!("{module} cannot be restarted"))),
            Behavior::FailsNTimesThenSucceeds(n) => {
                if call < *n {
                    Err(ExecutorError::Transport("restart backend unreachable".to_string()))
                } else {
                    Ok(())
                }
            }
        }
    }

    fn rollback(&self, _module: &str, _instance_id: &str) -> Result<(), ExecutorError> {
        Ok(())
    }
}
