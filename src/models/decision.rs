//! `ResurrectionDecision`: the output of the decision engine (§3, §4.4).

use super::risk::RiskLevel;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DecisionOutcome {
    ApproveAuto,
    ApproveManual,
    PendingReview,
    Deny,
    Defer,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResurrectionDecision {
    pub decision_id: String,
    pub kill_id: String,
    pub timestamp: DateTime<Utc>,
    pub outcome: DecisionOutcome,
    pub risk_level: RiskLevel,
    pub risk_score: f64,
    pub confidence: f64,
    pub reasoning: Vec<String>,
    pub recommended_action: String,
    pub requires_human_review: bool,
    pub auto_approve_eligible: bool,
    pub constraints: Vec<String>,
    pub timeout_minutes: u32,
}

impl ResurrectionDecision {
    pub fn new_decision_id() -> String {
        Uuid::new_v4().to_string()
    }
}
