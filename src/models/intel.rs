//! `IntelContext`: enrichment fetched from the Intel backend (§3, §4.2).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreatIndicator {
    #[serde(rename = "type")]
    pub indicator_type: String,
    pub value: String,
    pub threat_score: f64,
    pub source: String,
    pub last_seen: DateTime<Utc>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntelContext {
    pub query_id: String,
    pub kill_id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub threat_indicators: Vec<ThreatIndicator>,
    #[serde(default)]
    pub historical_behavior: HashMap<String, serde_json::Value>,
    pub false_positive_history: u32,
    #[serde(default)]
    pub network_context: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub user_context: Option<HashMap<String, serde_json::Value>>,
    pub risk_score: f64,
    pub recommendation: String,
}

pub const DEFAULT_CONTEXT_RECOMMENDATION: &str = "manual_review_recommended";

impl IntelContext {
    /// The deterministic fallback used when the Intel backend cannot be reached after
    /// retries (§4.2): neutral risk, no indicators, no false-positive history.
    pub fn default_for(kill_id: &str, query_id: String) -> Self {
        IntelContext {
            query_id,
            kill_id: kill_id.to_string(),
            timestamp: Utc::now(),
            threat_indicators: Vec::new(),
            historical_behavior: HashMap::new(),
            false_positive_history: 0,
            network_context: HashMap::new(),
            user_context: None,
            risk_score: 0.5,
            recommendation: DEFAULT_CONTEXT_RECOMMENDATION.to_string(),
        }
    }

    /// The highest threat score among all indicators, or 0.0 if there are none (§4.3).
    pub fn max_threat_score(&self) -> f64 {
        self.threat_indicators
            .iter()
            .map(|ti| ti.threat_score)
            .fold(0.0, f64::max)
    }
}

/// The record sent back to the Intel backend once a resurrection's fate is known (§3.1, §4.14).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeRecord {
    pub kill_id: String,
    pub request_id: Option<String>,
    pub decision_id: String,
    pub outcome: String,
    pub risk_score: f64,
    pub risk_level: String,
    pub timestamp: DateTime<Utc>,
    pub notes: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_context_has_neutral_risk() {
        let ctx = IntelContext::default_for("kill-1", "q-1".into());
        assert_eq!(ctx.risk_score, 0.5);
        assert_eq!(ctx.false_positive_history, 0);
        assert!(ctx.threat_indicators.is_empty());
        assert_eq!(ctx.recommendation, DEFAULT_CONTEXT_RECOMMENDATION);
    }

    #[test]
    fn max_threat_score_picks_highest() {
        let mut ctx = IntelContext::default_for("kill-1", "q-1".into());
        ctx.threat_indicators.push(ThreatIndicator {
            indicator_type: "ip".into(),
            value: "1.2.3.4".into(),
            threat_score: 0.3,
            source: "feed".into(),
            last_seen: Utc::now(),
            tags: vec![],
        });
        ctx.threat_indicators.push(ThreatIndicator {
            indicator_type: "hash".into(),
            value: "deadbeef".into(),
            threat_score: 0.9,
            source: "feed".into(),
            last_seen: Utc::now(),
            tags: vec![],
        });
        assert_eq!(ctx.max_threat_score(), 0.9);
    }

    #[test]
    fn outcome_record_round_trips() {
        let record = OutcomeRecord {
            kill_id: "kill-1".into(),
            request_id: Some("req-1".into()),
            decision_id: "dec-1".into(),
            outcome: "stable".into(),
            risk_score: 0.2,
            risk_level: "LOW".into(),
            timestamp: Utc::now(),
            notes: None,
        };
        let json = serde_json::to_string(&record).unwrap();
        let back: OutcomeRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(record, back);
    }
}
