//! The veto protocol (§4.11): the agent's ability to refuse a prospective kill the
//! Killer offers before it executes.

use crate::models::{VetoDecision, VetoRequest, VetoResponse};
use chrono::{DateTime, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

#[derive(Debug, Clone, Copy)]
pub struct VetoConfig {
    pub enabled: bool,
    pub min_fp_for_veto: u32,
    pub recent_resurrection_window_secs: i64,
    pub max_risk_for_veto: f64,
    pub critical_dependency_count: usize,
    pub max_vetos_per_hour: usize,
    pub veto_cooldown_seconds: i64,
    pub confidence_override: f64,
}

impl Default for VetoConfig {
    fn default() -> Self {
        VetoConfig {
            enabled: true,
            min_fp_for_veto: 3,
            recent_resurrection_window_secs: 3600,
            max_risk_for_veto: 0.3,
            critical_dependency_count: 6,
            max_vetos_per_hour: 10,
            veto_cooldown_seconds: 300,
            confidence_override: 0.9,
        }
    }
}

/// Context the caller supplies alongside the raw request; these come from other
/// components (Intel, queue history) rather than the wire message itself.
#[derive(Debug, Clone, Copy)]
pub struct VetoContext {
    pub false_positive_history: u32,
    pub seconds_since_last_successful_resurrection: Option<i64>,
    pub risk_score: f64,
}

pub struct VetoProtocol {
    config: VetoConfig,
    veto_timestamps: Mutex<VecDeque<DateTime<Utc>>>,
    module_cooldowns: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl VetoProtocol {
    pub fn new(config: VetoConfig) -> Self {
        VetoProtocol {
            config,
            veto_timestamps: Mutex::new(VecDeque::new()),
            module_cooldowns: Mutex::new(HashMap::new()),
        }
    }

    pub fn handle_veto_request(&self, request: &VetoRequest, context: VetoContext) -> VetoResponse {
        if !self.config.enabled {
            return VetoResponse {
                decision: VetoDecision::ApproveKill,
                reasons: vec!["disabled".to_string()],
                conditions: HashMap::new(),
                delay_seconds: None,
            };
        }

        let mut reasons = Vec::new();
        if context.false_positive_history >= self.config.min_fp_for_veto {
            reasons.push(format!(
                "false positive history {} meets the veto threshold",
                context.false_positive_history
            ));
        }
        if let Some(secs) = context.seconds_since_last_successful_resurrection {
            if secs < self.config.recent_resurrection_window_secs {
                reasons.push("module was resurrected successfully within the last hour".to_string());
            }
        }
        if context.risk_score < self.config.max_risk_for_veto {
            reasons.push("risk score is below the veto threshold".to_string());
        }
        if request.dependencies.len() >= self.config.critical_dependency_count {
            reasons.push("module has a critical number of dependencies".to_string());
        }

        let now = Utc::now();
        let rate_limited = self.is_rate_limited(&request.target_module, now);
        if rate_limited && !reasons.is_empty() {
            let mut conditions = HashMap::new();
            conditions.insert("would_have_vetoed".to_string(), serde_json::Value::Bool(true));
            return VetoResponse {
                decision: VetoDecision::ApproveKill,
                reasons,
                conditions,
                delay_seconds: None,
            };
        }

        if request.killer_confidence > self.config.confidence_override {
            return VetoResponse {
                decision: VetoDecision::ApproveKill,
                reasons,
                conditions: HashMap::new(),
                delay_seconds: None,
            };
        }

        if reasons.len() >= 2 {
            self.record_veto(&request.target_module, now);
            return VetoResponse {
                decision: VetoDecision::Veto,
                reasons,
                conditions: HashMap::new(),
                delay_seconds: None,
            };
        }

        if reasons.len() == 1 {
            self.record_veto(&request.target_module, now);
            return VetoResponse {
                decision: VetoDecision::Delay,
                reasons,
                conditions: HashMap::new(),
                delay_seconds: Some(30),
            };
        }

        let mut conditions = HashMap::new();
        conditions.insert("monitor_after_kill".to_string(), serde_json::Value::Bool(true));
        conditions.insert("alert_on_reoccurrence".to_string(), serde_json::Value::Bool(true));
        VetoResponse {
            decision: VetoDecision::Conditional,
            reasons,
            conditions,
            delay_seconds: None,
        }
    }

    fn is_rate_limited(&self, module: &str, now: DateTime<Utc>) -> bool {
        let mut timestamps = self.veto_timestamps.lock().unwrap();
        let hour_ago = now - chrono::Duration::hours(1);
        while timestamps.front().map(|t| *t < hour_ago).unwrap_or(false) {
            timestamps.pop_front();
        }
        if timestamps.len() >= self.config.max_vetos_per_hour {
            return true;
        }
        if let Some(last) = self.module_cooldowns.lock().unwrap().get(module) {
            if (now - *last).num_seconds() < self.config.veto_cooldown_seconds {
                return true;
            }
        }
        false
    }

    fn record_veto(&self, module: &str, now: DateTime<Utc>) {
        self.veto_timestamps.lock().unwrap().push_back(now);
        self.module_cooldowns.lock().unwrap().insert(module.to_string(), now);
    }
}
