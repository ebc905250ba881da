//! Builds the human-reviewable `ResurrectionProposal` the approval queue stores (§4.15).

use crate::models::queue_item::urgency_for;
use crate::models::{KillReport, ResurrectionDecision, ResurrectionProposal, RiskAssessment};

pub struct RecommendationBuilder;

impl RecommendationBuilder {
    pub fn new() -> Self {
        RecommendationBuilder
    }

    pub fn build(
        &self,
        kill_report: KillReport,
        decision: ResurrectionDecision,
        risk_assessment: RiskAssessment,
    ) -> ResurrectionProposal {
        let escalating = matches!(
            kill_report.severity,
            crate::models::kill_report::Severity::Critical | crate::models::kill_report::Severity::High
        );
        let urgency = urgency_for(risk_assessment.risk_level, escalating);
        let top_factors: Vec<String> = risk_assessment
            .top_factors(3)
            .into_iter()
            .map(|f| format!("{} ({:.2})", f.name, f.weighted_score))
            .collect();
        let summary = format!(
            "Module `{}` instance `{}` was killed for {:?} at severity {:?} (confidence {:.2}). \
             Risk assessed as {:?} ({:.2}); decision: {:?}.",
            kill_report.target_module,
            kill_report.target_instance_id,
            kill_report.kill_reason,
            kill_report.severity,
            kill_report.confidence_score,
            risk_assessment.risk_level,
            risk_assessment.risk_score,
            decision.outcome,
        );

        ResurrectionProposal {
            kill_report,
            decision,
            risk_assessment,
            summary,
            urgency,
            top_factors,
        }
    }
}

impl Default for RecommendationBuilder {
    fn default() -> Self {
        Self::new()
    }
}
