//! `QueueItem` and the `ResurrectionProposal` it wraps (§3, §4.6, §4.15).

use super::decision::ResurrectionDecision;
use super::kill_report::KillReport;
use super::risk::{RiskAssessment, RiskLevel};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Urgency {
    Low,
    Medium,
    High,
    Critical,
}

impl Urgency {
    /// Priority values 100/75/50/25 for CRITICAL/HIGH/MEDIUM/LOW (§3).
    pub fn priority(self) -> i32 {
        match self {
            Urgency::Critical => 100,
            Urgency::High => 75,
            Urgency::Medium => 50,
            Urgency::Low => 25,
        }
    }
}

/// The human-reviewable bundle the approval queue actually stores (§4.15): a decision and
/// risk assessment enriched with a plain-language summary and review urgency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResurrectionProposal {
    pub kill_report: KillReport,
    pub decision: ResurrectionDecision,
    pub risk_assessment: RiskAssessment,
    pub summary: String,
    pub urgency: Urgency,
    pub top_factors: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QueueItemStatus {
    Pending,
    Approved,
    Denied,
    Expired,
    Cancelled,
}

impl QueueItemStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, QueueItemStatus::Pending)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueItem {
    pub item_id: String,
    pub proposal: ResurrectionProposal,
    pub status: QueueItemStatus,
    pub priority: i32,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub reviewed_by: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub review_notes: Option<String>,
}

impl QueueItem {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.status == QueueItemStatus::Pending && now >= self.expires_at
    }
}

/// Derives queue urgency from risk level, escalated one step for CRITICAL/HIGH kill
/// severity, matching the original's `_determine_urgency` (§4.15).
pub fn urgency_for(risk_level: RiskLevel, kill_severity_is_escalating: bool) -> Urgency {
    let base = match risk_level {
        RiskLevel::Critical => Urgency::Critical,
        RiskLevel::High => Urgency::High,
        RiskLevel::Medium => Urgency::Medium,
        RiskLevel::Low | RiskLevel::Minimal => Urgency::Low,
    };
    if kill_severity_is_escalating {
        escalate(base)
    } else {
        base
    }
}

fn escalate(urgency: Urgency) -> Urgency {
    match urgency {
        Urgency::Low => Urgency::Medium,
        Urgency::Medium => Urgency::High,
        Urgency::High | Urgency::Critical => Urgency::Critical,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priorities_match_spec_values() {
        assert_eq!(Urgency::Critical.priority(), 100);
        assert_eq!(Urgency::High.priority(), 75);
        assert_eq!(Urgency::Medium.priority(), 50);
        assert_eq!(Urgency::Low.priority(), 25);
    }

    #[test]
    fn urgency_escalates_on_severe_kill() {
        assert_eq!(urgency_for(RiskLevel::Medium, true), Urgency::High);
        assert_eq!(urgency_for(RiskLevel::Medium, false), Urgency::Medium);
        assert_eq!(urgency_for(RiskLevel::Critical, true), Urgency::Critical);
    }
}
