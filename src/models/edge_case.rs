//! `EdgeCase`: anomalous kill-stream patterns surfaced by the edge-case manager (§3, §4.9).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EdgeCaseType {
    RapidRepeatedKills,
    CascadingFailure,
    FlappingModule,
    SystemWideAnomaly,
    CircularDependency,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EdgeCaseSeverity {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecommendedAction {
    ProceedWithCaution,
    RequireHumanReview,
    PauseAutoResurrection,
    EscalateImmediately,
    CoordinateWithKiller,
    DeferDecision,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeCase {
    #[serde(rename = "type")]
    pub kind: EdgeCaseType,
    pub severity: EdgeCaseSeverity,
    pub detected_at: DateTime<Utc>,
    pub affected_modules: Vec<String>,
    pub affected_kill_ids: Vec<String>,
    pub recommended_action: RecommendedAction,
    pub resolved: bool,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolution: Option<String>,
}

impl EdgeCaseType {
    /// Fixed severity/action mapping from the detector table (§4.9).
    pub fn fixed_severity(self) -> EdgeCaseSeverity {
        match self {
            EdgeCaseType::RapidRepeatedKills => EdgeCaseSeverity::High,
            EdgeCaseType::CascadingFailure => EdgeCaseSeverity::Critical,
            EdgeCaseType::FlappingModule => EdgeCaseSeverity::Medium,
            EdgeCaseType::SystemWideAnomaly => EdgeCaseSeverity::Critical,
            EdgeCaseType::CircularDependency => EdgeCaseSeverity::High,
        }
    }

    pub fn fixed_action(self) -> RecommendedAction {
        match self {
            EdgeCaseType::RapidRepeatedKills => RecommendedAction::PauseAutoResurrection,
            EdgeCaseType::CascadingFailure => RecommendedAction::EscalateImmediately,
            EdgeCaseType::FlappingModule => RecommendedAction::RequireHumanReview,
            EdgeCaseType::SystemWideAnomaly => RecommendedAction::EscalateImmediately,
            EdgeCaseType::CircularDependency => RecommendedAction::CoordinateWithKiller,
        }
    }
}
