//! `RiskAssessment` and the risk level taxonomy (§3, §4.3).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Minimal,
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    /// Fixed thresholds 0.2 / 0.4 / 0.6 / 0.8 (§3, §4.3). `score` must already be in [0, 1].
    pub fn from_score(score: f64) -> Self {
        if score >= 0.8 {
            RiskLevel::Critical
        } else if score >= 0.6 {
            RiskLevel::High
        } else if score >= 0.4 {
            RiskLevel::Medium
        } else if score >= 0.2 {
            RiskLevel::Low
        } else {
            RiskLevel::Minimal
        }
    }

    pub fn is_auto_approvable(self) -> bool {
        matches!(self, RiskLevel::Minimal | RiskLevel::Low)
    }
}

/// One weighted factor contributing to the overall risk score (§4.3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskFactor {
    pub name: String,
    pub raw_score: f64,
    pub weight: f64,
    pub weighted_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub risk_score: f64,
    pub risk_level: RiskLevel,
    pub factors: Vec<RiskFactor>,
    pub auto_approve_eligible: bool,
    pub requires_escalation: bool,
}

impl RiskAssessment {
    /// Factors sorted by weighted contribution, descending — used by the recommendation
    /// builder (§4.15) to surface the top contributors.
    pub fn top_factors(&self, n: usize) -> Vec<&RiskFactor> {
        let mut sorted: Vec<&RiskFactor> = self.factors.iter().collect();
        sorted.sort_by(|a, b| b.weighted_score.total_cmp(&a.weighted_score));
        sorted.truncate(n);
        sorted
    }
}
