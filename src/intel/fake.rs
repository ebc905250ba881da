//! In-process [`IntelAdapter`] fake for tests, mirroring `InProcessStream`'s role for the
//! ingester.

use super::error::IntelError;
use super::IntelAdapter;
use crate::models::{IntelContext, KillReport, OutcomeRecord};
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Default)]
pub struct InProcessIntel {
    contexts: Mutex<HashMap<String, IntelContext>>,
    history: Mutex<HashMap<String, Vec<IntelContext>>>,
    outcomes: Mutex<Vec<OutcomeRecord>>,
    always_fail: bool,
}

impl InProcessIntel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn always_failing() -> Self {
        InProcessIntel {
            always_fail: true,
            ..Default::default()
        }
    }

    pub fn set_context_for(&self, kill_id: &str, context: IntelContext) {
        self.contexts.lock().unwrap().insert(kill_id.to_string(), context);
    }

    pub fn set_history_for(&self, module: &str, history: Vec<IntelContext>) {
        self.history.lock().unwrap().insert(module.to_string(), history);
    }

    pub fn reported_outcomes(&self) -> Vec<OutcomeRecord> {
        self.outcomes.lock().unwrap().clone()
    }
}

impl IntelAdapter for InProcessIntel {
    fn query_context(&self, report: &KillReport) -> Result<IntelContext, IntelError> {
        if self.always_fail {
            return Err(IntelError::Connection("fake is configured to always fail".into()));
        }
        Ok(self
            .contexts
            .lock()
            .unwrap()
            .get(&report.kill_id)
            .cloned()
            .unwrap_or_else(|| IntelContext::default_for(&report.kill_id, "fake-query".into())))
    }

    fn get_history(&self, module: &str, _days: u32) -> Result<Vec<IntelContext>, IntelError> {
        if self.always_fail {
            return Err(IntelError::Connection("fake is configured to always fail".into()));
        }
        Ok(self.history.lock().unwrap().get(module).cloned().unwrap_or_default())
    }

    fn report_outcome(&self, record: &OutcomeRecord) -> Result<bool, IntelError> {
        if self.always_fail {
            return Err(IntelError::Connection("fake is configured to always fail".into()));
        }
        self.outcomes.lock().unwrap().push(record.clone());
        Ok(true)
    }

    fn health_check(&self) -> Result<bool, IntelError> {
        Ok(!self.always_fail)
    }
}
