//! The decision engine (§4.4): maps a risk assessment onto a `ResurrectionDecision`
//! through a fixed, top-to-bottom decision table.

use crate::models::{DecisionOutcome, IntelContext, KillReason, KillReport, ResurrectionDecision, RiskLevel};
use crate::risk::RiskAssessor;

#[derive(Debug, Clone)]
pub struct DecisionPolicy {
    pub always_deny: Vec<String>,
    pub always_require_approval: Vec<String>,
    pub auto_approve_min_confidence: f64,
    pub default_timeout_minutes: u32,
}

impl Default for DecisionPolicy {
    fn default() -> Self {
        DecisionPolicy {
            always_deny: Vec::new(),
            always_require_approval: Vec::new(),
            auto_approve_min_confidence: 0.85,
            default_timeout_minutes: 30,
        }
    }
}

pub struct DecisionEngine {
    policy: DecisionPolicy,
    risk_assessor: std::sync::Arc<RiskAssessor>,
}

impl DecisionEngine {
    pub fn new(policy: DecisionPolicy, risk_assessor: std::sync::Arc<RiskAssessor>) -> Self {
        DecisionEngine { policy, risk_assessor }
    }

    pub fn should_resurrect(&self, report: &KillReport, context: &IntelContext) -> ResurrectionDecision {
        self.decide(report, context, false)
    }

    /// Identical computation with no downstream side effects implied; callers in
    /// observer mode simply discard what a live caller would act on (§4.4).
    pub fn observe(&self, report: &KillReport, context: &IntelContext) -> ResurrectionDecision {
        self.decide(report, context, true)
    }

    fn decide(&self, report: &KillReport, context: &IntelContext, observer_mode: bool) -> ResurrectionDecision {
        let assessment = self.risk_assessor.assess(report, context);
        let mut reasoning = Vec::new();

        let confidence = derive_confidence(report, context);

        let outcome = if self.policy.always_deny.iter().any(|m| m == &report.target_module) {
            reasoning.push(format!("module `{}` is on the always_deny list", report.target_module));
            DecisionOutcome::Deny
        } else if self
            .policy
            .always_require_approval
            .iter()
            .any(|m| m == &report.target_module)
        {
            reasoning.push(format!(
                "module `{}` is on the always_require_approval list",
                report.target_module
            ));
            DecisionOutcome::PendingReview
        } else if report.kill_reason == KillReason::ManualOverride {
            reasoning.push("kill reason is MANUAL_OVERRIDE; operator intent is respected".to_string());
            DecisionOutcome::Deny
        } else if assessment.risk_level == RiskLevel::Critical {
            reasoning.push("risk level is CRITICAL".to_string());
            DecisionOutcome::Deny
        } else if assessment.risk_level == RiskLevel::High {
            reasoning.push("risk level is HIGH".to_string());
            DecisionOutcome::PendingReview
        } else if assessment.risk_level == RiskLevel::Medium {
            reasoning.push("risk level is MEDIUM".to_string());
            DecisionOutcome::PendingReview
        } else if matches!(assessment.risk_level, RiskLevel::Minimal | RiskLevel::Low)
            && confidence >= self.policy.auto_approve_min_confidence
        {
            reasoning.push(format!(
                "risk level is {:?} and confidence {:.2} meets the auto-approve floor",
                assessment.risk_level, confidence
            ));
            DecisionOutcome::ApproveAuto
        } else {
            reasoning.push("no rule matched conclusively; defaulting to manual review".to_string());
            DecisionOutcome::PendingReview
        };

        if context.false_positive_history > 0 {
            reasoning.push(format!(
                "false positive history: {} prior reports",
                context.false_positive_history
            ));
        }
        for factor in assessment.top_factors(2) {
            reasoning.push(format!(
                "top contributor: {} (weighted {:.3})",
                factor.name, factor.weighted_score
            ));
        }

        let requires_human_review = !matches!(outcome, DecisionOutcome::ApproveAuto)
            || observer_mode && assessment.requires_escalation;

        ResurrectionDecision {
            decision_id: ResurrectionDecision::new_decision_id(),
            kill_id: report.kill_id.clone(),
            timestamp: chrono::Utc::now(),
            outcome,
            risk_level: assessment.risk_level,
            risk_score: assessment.risk_score,
            confidence,
            reasoning,
            recommended_action: recommended_action_for(outcome),
            requires_human_review,
            auto_approve_eligible: assessment.auto_approve_eligible,
            constraints: Vec::new(),
            timeout_minutes: self.policy.default_timeout_minutes,
        }
    }
}

/// Agreement between killer confidence, intel's inverse risk, and FP history. A module
/// with a long false-positive history is *more* trustworthy to auto-resurrect, since its
/// kills are more likely mistakes, so FP history raises this rather than lowering it.
fn derive_confidence(report: &KillReport, context: &IntelContext) -> f64 {
    let intel_agreement = 1.0 - context.risk_score;
    let fp_bonus = (context.false_positive_history as f64 / 10.0).min(0.5);
    ((report.confidence_score + intel_agreement) / 2.0 + fp_bonus).clamp(0.0, 1.0)
}

fn recommended_action_for(outcome: DecisionOutcome) -> String {
    match outcome {
        DecisionOutcome::ApproveAuto => "resurrect_automatically".to_string(),
        DecisionOutcome::ApproveManual => "resurrect_with_approval".to_string(),
        DecisionOutcome::PendingReview => "await_manual_review".to_string(),
        DecisionOutcome::Deny => "keep_terminated".to_string(),
        DecisionOutcome::Defer => "defer_decision".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::kill_report::Severity;
    use crate::risk::RiskThresholds;

    fn report(confidence: f64, severity: Severity, reason: KillReason, module: &str) -> KillReport {
        KillReport {
            kill_id: "kill-1".into(),
            timestamp: chrono::Utc::now(),
            target_module: module.into(),
            target_instance_id: "instance-1".into(),
            kill_reason: reason,
            severity,
            confidence_score: confidence,
            evidence: vec![],
            dependencies: vec![],
            source_agent: "killer-1".into(),
            metadata: serde_json::json!({}),
        }
    }

    fn engine(policy: DecisionPolicy) -> DecisionEngine {
        DecisionEngine::new(policy, std::sync::Arc::new(RiskAssessor::new(RiskThresholds::default())))
    }

    #[test]
    fn always_deny_wins_over_everything() {
        let engine = engine(DecisionPolicy {
            always_deny: vec!["payments-api".to_string()],
            ..Default::default()
        });
        let r = report(0.99, Severity::Info, KillReason::AnomalyBehavior, "payments-api");
        let ctx = IntelContext::default_for(&r.kill_id, "q-1".into());
        let decision = engine.should_resurrect(&r, &ctx);
        assert_eq!(decision.outcome, DecisionOutcome::Deny);
    }

    #[test]
    fn manual_override_is_always_denied() {
        let engine = engine(DecisionPolicy::default());
        let r = report(0.99, Severity::Info, KillReason::ManualOverride, "payments-api");
        let ctx = IntelContext::default_for(&r.kill_id, "q-1".into());
        let decision = engine.should_resurrect(&r, &ctx);
        assert_eq!(decision.outcome, DecisionOutcome::Deny);
    }

    #[test]
    fn critical_risk_is_denied() {
        let engine = engine(DecisionPolicy::default());
        let r = report(0.99, Severity::Critical, KillReason::AnomalyBehavior, "payments-api");
        let mut ctx = IntelContext::default_for(&r.kill_id, "q-1".into());
        ctx.risk_score = 1.0;
        let decision = engine.should_resurrect(&r, &ctx);
        assert_eq!(decision.outcome, DecisionOutcome::Deny);
    }

    #[test]
    fn low_risk_high_confidence_auto_approves() {
        let engine = engine(DecisionPolicy::default());
        let r = report(0.95, Severity::Info, KillReason::AnomalyBehavior, "payments-api");
        let mut ctx = IntelContext::default_for(&r.kill_id, "q-1".into());
        ctx.risk_score = 0.1;
        ctx.false_positive_history = 5;
        let decision = engine.should_resurrect(&r, &ctx);
        assert_eq!(decision.outcome, DecisionOutcome::ApproveAuto);
        assert!(!decision.requires_human_review);
    }

    #[test]
    fn low_risk_low_confidence_falls_back_to_pending_review() {
        let engine = engine(DecisionPolicy::default());
        let r = report(0.5, Severity::Info, KillReason::AnomalyBehavior, "payments-api");
        let mut ctx = IntelContext::default_for(&r.kill_id, "q-1".into());
        ctx.risk_score = 0.5;
        let decision = engine.should_resurrect(&r, &ctx);
        assert_eq!(decision.outcome, DecisionOutcome::PendingReview);
    }

    #[test]
    fn observer_mode_computes_same_outcome() {
        let engine = engine(DecisionPolicy::default());
        let r = report(0.95, Severity::Info, KillReason::AnomalyBehavior, "payments-api");
        let ctx = IntelContext::default_for(&r.kill_id, "q-1".into());
        let live = engine.should_resurrect(&r, &ctx);
        let observed = engine.observe(&r, &ctx);
        assert_eq!(live.outcome, observed.outcome);
    }
}
