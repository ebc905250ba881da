//! The auto-resurrection manager (§4.5): the eleven-gate eligibility sequence that must
//! pass, in order, before an `APPROVE_AUTO` decision is actually acted on.

use crate::executor::{ModuleRestarter, ResurrectionExecutor};
use crate::models::{
    Attempt, AttemptResult, DecisionOutcome, KillReport, RequestStatus, ResurrectionDecision,
    ResurrectionRequest, RiskAssessment,
};
use chrono::{DateTime, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use uuid::Uuid;

const MAX_ATTEMPT_HISTORY: usize = 1000;

/// Consulted for gate 11; implemented by the edge-case manager, kept as a narrow trait
/// here so this module does not depend on edge_case's internals.
pub trait AutoResurrectionGate: Send + Sync {
    fn should_allow_auto_resurrection(&self, module: &str) -> (bool, Option<String>);
}

impl<T: AutoResurrectionGate + ?Sized> AutoResurrectionGate for std::sync::Arc<T> {
    fn should_allow_auto_resurrection(&self, module: &str) -> (bool, Option<String>) {
        (**self).should_allow_auto_resurrection(module)
    }
}

#[derive(Debug, Clone)]
pub struct AdmissionConfig {
    pub enabled: bool,
    pub blacklist: Vec<String>,
    pub max_risk_score: f64,
    pub min_confidence: f64,
    pub max_per_hour: usize,
    pub max_per_module_per_hour: usize,
    pub cooldown_seconds: i64,
    pub monitoring_duration_minutes: u32,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        AdmissionConfig {
            enabled: true,
            blacklist: Vec::new(),
            max_risk_score: 0.3,
            min_confidence: 0.85,
            max_per_hour: 10,
            max_per_module_per_hour: 3,
            cooldown_seconds: 300,
            monitoring_duration_minutes: 30,
        }
    }
}

struct HistoryEntry {
    module: String,
    at: DateTime<Utc>,
    succeeded: bool,
}

pub struct AutoResurrectionManager<R: ModuleRestarter, G: AutoResurrectionGate> {
    config: AdmissionConfig,
    executor: ResurrectionExecutor<R>,
    gate: G,
    history: Mutex<VecDeque<HistoryEntry>>,
}

impl<R: ModuleRestarter, G: AutoResurrectionGate> AutoResurrectionManager<R, G> {
    pub fn new(config: AdmissionConfig, executor: ResurrectionExecutor<R>, gate: G) -> Self {
        AutoResurrectionManager {
            config,
            executor,
            gate,
            history: Mutex::new(VecDeque::new()),
        }
    }

    pub fn attempt_resurrection(
        &self,
        report: &KillReport,
        decision: &ResurrectionDecision,
        risk_assessment: &RiskAssessment,
    ) -> (Attempt, Option<ResurrectionRequest>) {
        let module = report.target_module.as_str();

        if !self.config.enabled {
            return (self.deny(report, AttemptResult::NotEligible, "auto-resurrection manager is disabled"), None);
        }
        if self.config.blacklist.iter().any(|m| m == module) {
            return (self.deny(report, AttemptResult::Blacklisted, "module is blacklisted"), None);
        }
        if decision.outcome != DecisionOutcome::ApproveAuto {
            return (
                self.deny(report, AttemptResult::NotEligible, "decision outcome is not APPROVE_AUTO"),
                None,
            );
        }
        if decision.risk_score > self.config.max_risk_score {
            return (
                self.deny(report, AttemptResult::NotEligible, "risk score exceeds max_risk_score"),
                None,
            );
        }
        if decision.confidence < self.config.min_confidence {
            return (
                self.deny(report, AttemptResult::NotEligible, "confidence below min_confidence"),
                None,
            );
        }
        if !decision.auto_approve_eligible {
            return (
                self.deny(report, AttemptResult::NotEligible, "decision is not auto_approve_eligible"),
                None,
            );
        }

        let now = Utc::now();
        {
            let history = self.history.lock().unwrap();
            let hour_ago = now - chrono::Duration::hours(1);
            let global_count = history.iter().filter(|h| h.at >= hour_ago).count();
            if global_count >= self.config.max_per_hour {
                return (self.deny(report, AttemptResult::RateLimited, "global hourly rate limit exceeded"), None);
            }
            let module_count = history
                .iter()
                .filter(|h| h.at >= hour_ago && h.module == module)
                .count();
            if module_count >= self.config.max_per_module_per_hour {
                return (
                    self.deny(report, AttemptResult::RateLimited, "per-module hourly rate limit exceeded"),
                    None,
                );
            }
            if let Some(last_success) = history.iter().rev().find(|h| h.module == module && h.succeeded) {
                let elapsed = (now - last_success.at).num_seconds();
                if elapsed < self.config.cooldown_seconds {
                    return (self.deny(report, AttemptResult::Cooldown, "module is within its cooldown window"), None);
                }
            }
        }

        if risk_assessment.requires_escalation {
            return (
                self.deny(report, AttemptResult::NotEligible, "risk assessment requires escalation"),
                None,
            );
        }

        let (allowed, reason) = self.gate.should_allow_auto_resurrection(module);
        if !allowed {
            return (
                self.deny(
                    report,
                    AttemptResult::NotEligible,
                    reason.unwrap_or_else(|| "edge-case manager forbids auto-resurrection".to_string()),
                ),
                None,
            );
        }

        let mut request = ResurrectionRequest {
            request_id: Uuid::new_v4().to_string(),
            decision_id: decision.decision_id.clone(),
            kill_id: report.kill_id.clone(),
            target_module: report.target_module.clone(),
            target_instance_id: report.target_instance_id.clone(),
            status: RequestStatus::Pending,
            created_at: now,
            approved_at: Some(now),
            approved_by: Some(crate::models::AUTO_APPROVER.to_string()),
            executed_at: None,
            completed_at: None,
            rollback_reason: None,
            monitoring_duration_minutes: self.config.monitoring_duration_minutes,
            health_checks: 0,
        };
        let _ = request.transition(RequestStatus::Approved);

        let succeeded = self.executor.resurrect(&mut request).is_ok();
        self.record_history(module, now, succeeded);

        if succeeded {
            (Attempt::success(&report.kill_id, module, request.request_id.clone()), Some(request))
        } else {
            (self.deny(report, AttemptResult::Failed, "executor failed to restart the module"), Some(request))
        }
    }

    fn record_history(&self, module: &str, at: DateTime<Utc>, succeeded: bool) {
        let mut history = self.history.lock().unwrap();
        if history.len() >= MAX_ATTEMPT_HISTORY {
            history.pop_front();
        }
        history.push_back(HistoryEntry {
            module: module.to_string(),
            at,
            succeeded,
        });
    }

    fn deny(&self, report: &KillReport, result: AttemptResult, reason: impl Into<String>) -> Attempt {
        Attempt::gate_failure(&report.kill_id, &report.target_module, result, reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::InProcessExecutor;
    use crate::models::kill_report::{KillReason, Severity};
    use crate::models::RiskLevel;

    struct AlwaysAllow;
    impl AutoResurrectionGate for AlwaysAllow {
        fn should_allow_auto_resurrection(&self, _module: &str) -> (bool, Option<String>) {
            (true, None)
        }
    }

    struct AlwaysDeny;
    impl AutoResurrectionGate for AlwaysDeny {
        fn should_allow_auto_resurrection(&self, _module: &str) -> (bool, Option<String>) {
            (false, Some("module is paused".to_string()))
        }
    }

    fn report() -> KillReport {
        KillReport {
            kill_id: "kill-1".into(),
            timestamp: Utc::now(),
            target_module: "payments-api".into(),
            target_instance_id: "instance-1".into(),
            kill_reason: KillReason::AnomalyBehavior,
            severity: Severity::Low,
            confidence_score: 0.95,
            evidence: vec![],
            dependencies: vec![],
            source_agent: "killer-1".into(),
            metadata: serde_json::json!({}),
        }
    }

    fn approve_auto_decision() -> ResurrectionDecision {
        ResurrectionDecision {
            decision_id: "dec-1".into(),
            kill_id: "kill-1".into(),
            timestamp: Utc::now(),
            outcome: DecisionOutcome::ApproveAuto,
            risk_level: RiskLevel::Low,
            risk_score: 0.1,
            confidence: 0.95,
            reasoning: vec![],
            recommended_action: "resurrect_automatically".into(),
            requires_human_review: false,
            auto_approve_eligible: true,
            constraints: vec![],
            timeout_minutes: 30,
        }
    }

    fn risk_assessment(requires_escalation: bool) -> RiskAssessment {
        RiskAssessment {
            risk_score: 0.1,
            risk_level: RiskLevel::Low,
            factors: vec![],
            auto_approve_eligible: true,
            requires_escalation,
        }
    }

    #[test]
    fn passing_all_gates_succeeds() {
        let manager = AutoResurrectionManager::new(
            AdmissionConfig::default(),
            ResurrectionExecutor::new(InProcessExecutor::always_succeeds()),
            AlwaysAllow,
        );
        let (attempt, request) = manager.attempt_resurrection(&report(), &approve_auto_decision(), &risk_assessment(false));
        assert_eq!(attempt.result, AttemptResult::Success);
        assert!(request.is_some());
    }

    #[test]
    fn blacklisted_module_is_rejected() {
        let manager = AutoResurrectionManager::new(
            AdmissionConfig {
                blacklist: vec!["payments-api".to_string()],
                ..Default::default()
            },
            ResurrectionExecutor::new(InProcessExecutor::always_succeeds()),
            AlwaysAllow,
        );
        let (attempt, _) = manager.attempt_resurrection(&report(), &approve_auto_decision(), &risk_assessment(false));
        assert_eq!(attempt.result, AttemptResult::Blacklisted);
    }

    #[test]
    fn requires_escalation_blocks_auto_resurrection() {
        let manager = AutoResurrectionManager::new(
            AdmissionConfig::default(),
            ResurrectionExecutor::new(InProcessExecutor::always_succeeds()),
            AlwaysAllow,
        );
        let (attempt, _) = manager.attempt_resurrection(&report(), &approve_auto_decision(), &risk_assessment(true));
        assert_eq!(attempt.result, AttemptResult::NotEligible);
    }

    #[test]
    fn edge_case_gate_can_block() {
        let manager = AutoResurrectionManager::new(
            AdmissionConfig::default(),
            ResurrectionExecutor::new(InProcessExecutor::always_succeeds()),
            AlwaysDeny,
        );
        let (attempt, _) = manager.attempt_resurrection(&report(), &approve_auto_decision(), &risk_assessment(false));
        assert_eq!(attempt.result, AttemptResult::NotEligible);
    }

    #[test]
    fn per_module_rate_limit_is_enforced() {
        let manager = AutoResurrectionManager::new(
            AdmissionConfig {
                max_per_module_per_hour: 1,
                cooldown_seconds: 0,
                ..Default::default()
            },
            ResurrectionExecutor::new(InProcessExecutor::always_succeeds()),
            AlwaysAllow,
        );
        let (first, _) = manager.attempt_resurrection(&report(), &approve_auto_decision(), &risk_assessment(false));
        assert_eq!(first.result, AttemptResult::Success);
        let (second, _) = manager.attempt_resurrection(&report(), &approve_auto_decision(), &risk_assessment(false));
        assert_eq!(second.result, AttemptResult::RateLimited);
    }
}
