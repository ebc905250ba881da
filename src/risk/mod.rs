//! The risk assessor (§4.3): a pure weighted-factor scoring function over a `KillReport`
//! and its `IntelContext`, configurable via [`RiskThresholds`].

use crate::models::{IntelContext, KillReport, RiskAssessment, RiskFactor, RiskLevel};
use std::collections::HashMap;
use std::sync::RwLock;

/// Weights for the seven factors in §4.3, plus the set of module names treated as
/// critical. Weights must sum to 1.0 and remain non-negative; updates are atomic.
#[derive(Debug, Clone)]
pub struct RiskThresholds {
    pub weights: HashMap<String, f64>,
    pub critical_modules: Vec<String>,
    pub auto_approve_confidence_floor: f64,
}

pub const FACTOR_NAMES: &[&str] = &[
    "killer_confidence",
    "intel_risk",
    "false_positive_history",
    "module_criticality",
    "severity",
    "dependency_pressure",
    "threat_indicators",
];

impl Default for RiskThresholds {
    fn default() -> Self {
        let mut weights = HashMap::new();
        weights.insert("killer_confidence".to_string(), 0.25);
        weights.insert("intel_risk".to_string(), 0.2);
        weights.insert("false_positive_history".to_string(), 0.1);
        weights.insert("module_criticality".to_string(), 0.15);
        weights.insert("severity".to_string(), 0.15);
        weights.insert("dependency_pressure".to_string(), 0.05);
        weights.insert("threat_indicators".to_string(), 0.1);
        RiskThresholds {
            weights,
            critical_modules: Vec::new(),
            auto_approve_confidence_floor: 0.8,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ThresholdError {
    #[error("weight for `{0}` must be non-negative, got {1}")]
    NegativeWeight(String, f64),
}

pub struct RiskAssessor {
    thresholds: RwLock<RiskThresholds>,
    system_paused: std::sync::atomic::AtomicBool,
}

impl RiskAssessor {
    pub fn new(thresholds: RiskThresholds) -> Self {
        RiskAssessor {
            thresholds: RwLock::new(thresholds),
            system_paused: std::sync::atomic::AtomicBool::new(false),
        }
    }

    /// Flips the system-wide pause flag consulted by `requires_escalation` (§9.1: this
    /// is the sole place that flag is computed; the edge-case manager calls this, it
    /// never derives `requires_escalation` itself).
    pub fn set_system_paused(&self, paused: bool) {
        self.system_paused.store(paused, std::sync::atomic::Ordering::SeqCst);
    }

    pub fn update_thresholds(&self, thresholds: RiskThresholds) -> Result<(), ThresholdError> {
        for (name, weight) in &thresholds.weights {
            if *weight < 0.0 {
                return Err(ThresholdError::NegativeWeight(name.clone(), *weight));
            }
        }
        *self.thresholds.write().unwrap() = thresholds;
        Ok(())
    }

    pub fn get_thresholds(&self) -> RiskThresholds {
        self.thresholds.read().unwrap().clone()
    }

    pub fn assess(&self, report: &KillReport, context: &IntelContext) -> RiskAssessment {
        let thresholds = self.thresholds.read().unwrap();

        let raw = [
            ("killer_confidence", report.confidence_score.clamp(0.0, 1.0)),
            ("intel_risk", context.risk_score.clamp(0.0, 1.0)),
            (
                "false_positive_history",
                (1.0 - context.false_positive_history as f64 / 10.0).max(0.0),
            ),
            (
                "module_criticality",
                if thresholds.critical_modules.iter().any(|m| m == &report.target_module) {
                    1.0
                } else {
                    0.3
                },
            ),
            ("severity", report.severity.raw_score()),
            (
                "dependency_pressure",
                (report.dependencies.len() as f64 * 0.1).min(1.0),
            ),
            ("threat_indicators", context.max_threat_score()),
        ];

        let mut factors = Vec::with_capacity(raw.len());
        let mut risk_score = 0.0;
        for (name, raw_score) in raw {
            let weight = thresholds.weights.get(name).copied().unwrap_or(0.0);
            let weighted_score = weight * raw_score;
            risk_score += weighted_score;
            factors.push(RiskFactor {
                name: name.to_string(),
                raw_score,
                weight,
                weighted_score,
            });
        }
        risk_score = risk_score.clamp(0.0, 1.0);
        let risk_level = RiskLevel::from_score(risk_score);

        // A long false-positive history makes this kill more likely a mistake too, so it
        // raises confidence in auto-approval rather than lowering it.
        let fp_bonus = (context.false_positive_history as f64 / 10.0).min(0.5);
        let aggregate_confidence =
            ((report.confidence_score + (1.0 - context.risk_score)) / 2.0 + fp_bonus).clamp(0.0, 1.0);
        let auto_approve_eligible =
            risk_level.is_auto_approvable() && aggregate_confidence >= thresholds.auto_approve_confidence_floor;
        let requires_escalation = risk_level == RiskLevel::Critical
            || self.system_paused.load(std::sync::atomic::Ordering::SeqCst);

        RiskAssessment {
            risk_score,
            risk_level,
            factors,
            auto_approve_eligible,
            requires_escalation,
        }
    }
}
