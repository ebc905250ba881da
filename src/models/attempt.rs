//! `Attempt`: the result of an auto-resurrection admission check (§3.1, §4.5).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttemptResult {
    Success,
    Failed,
    RateLimited,
    Cooldown,
    NotEligible,
    Blacklisted,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attempt {
    pub kill_id: String,
    pub target_module: String,
    pub result: AttemptResult,
    pub reason: String,
    pub request_id: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl Attempt {
    pub fn gate_failure(
        kill_id: &str,
        target_module: &str,
        result: AttemptResult,
        reason: impl Into<String>,
    ) -> Self {
        Attempt {
            kill_id: kill_id.to_string(),
            target_module: target_module.to_string(),
            result,
            reason: reason.into(),
            request_id: None,
            timestamp: Utc::now(),
        }
    }

    pub fn success(kill_id: &str, target_module: &str, request_id: String) -> Self {
        Attempt {
            kill_id: kill_id.to_string(),
            target_module: target_module.to_string(),
            result: AttemptResult::Success,
            reason: "eligibility gates passed".to_string(),
            request_id: Some(request_id),
            timestamp: Utc::now(),
        }
    }
}
