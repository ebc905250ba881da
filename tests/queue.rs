//! The approval queue's capacity, ordering, and expiration behavior (§4.6), driven
//! directly rather than through the agent since these are queue-internal invariants.

use resilience_agent::models::kill_report::{KillReason, Severity};
use resilience_agent::models::{
    DecisionOutcome, KillReport, ResurrectionDecision, ResurrectionProposal, RiskAssessment, RiskLevel, Urgency,
};
use resilience_agent::queue::{ApprovalQueue, QueueConfig, QueueError};

fn proposal(module: &str, urgency: Urgency) -> ResurrectionProposal {
    let kill_report = KillReport {
        kill_id: uuid::Uuid::new_v4().to_string(),
        timestamp: chrono::Utc::now(),
        target_module: module.to_string(),
        target_instance_id: "instance-1".to_string(),
        kill_reason: KillReason::AnomalyBehavior,
        severity: Severity::Medium,
        confidence_score: 0.5,
        evidence: vec![],
        dependencies: vec![],
        source_agent: "killer-1".to_string(),
        metadata: serde_json::json!({}),
    };
    let decision = ResurrectionDecision {
        decision_id: ResurrectionDecision::new_decision_id(),
        kill_id: kill_report.kill_id.clone(),
        timestamp: chrono::Utc::now(),
        outcome: DecisionOutcome::PendingReview,
        risk_level: RiskLevel::Medium,
        risk_score: 0.5,
        confidence: 0.5,
        reasoning: vec!["test fixture".to_string()],
        recommended_action: "await_manual_review".to_string(),
        requires_human_review: true,
        auto_approve_eligible: false,
        constraints: vec![],
        timeout_minutes: 30,
    };
    let risk_assessment = RiskAssessment {
        risk_score: 0.5,
        risk_level: RiskLevel::Medium,
        factors: vec![],
        auto_approve_eligible: false,
        requires_escalation: false,
    };
    ResurrectionProposal {
        kill_report,
        decision,
        risk_assessment,
        summary: format!("{module} terminated, pending review"),
        urgency,
        top_factors: vec![],
    }
}

#[test]
fn enqueue_rejects_once_capacity_is_reached() {
    let queue = ApprovalQueue::new(QueueConfig { max_pending: 2 }, chrono::Duration::minutes(30), None);
    queue.enqueue(proposal("a", Urgency::Normal)).unwrap();
    queue.enqueue(proposal("b", Urgency::Normal)).unwrap();
    let err = queue.enqueue(proposal("c", Urgency::Normal)).unwrap_err();
    assert_eq!(err, QueueError::AtCapacity(2));
}

#[test]
fn pending_items_are_ordered_by_priority_then_age() {
    let queue = ApprovalQueue::new(QueueConfig::default(), chrono::Duration::minutes(30), None);
    queue.enqueue(proposal("low-first", Urgency::Low)).unwrap();
    queue.enqueue(proposal("critical-second", Urgency::Critical)).unwrap();
    queue.enqueue(proposal("normal-third", Urgency::Normal)).unwrap();

    let pending = queue.list_pending(10);
    let modules: Vec<&str> = pending.iter().map(|i| i.proposal.kill_report.target_module.as_str()).collect();
    assert_eq!(modules, vec!["critical-second", "normal-third", "low-first"]);
}

#[test]
fn approving_an_already_denied_item_is_rejected() {
    let queue = ApprovalQueue::new(QueueConfig::default(), chrono::Duration::minutes(30), None);
    let item_id = queue.enqueue(proposal("payments-api", Urgency::Normal)).unwrap();
    queue.deny(&item_id, "bob", "false positive".to_string()).unwrap();
    let err = queue.approve(&item_id, "alice", None).unwrap_err();
    assert!(matches!(err, QueueError::NotPending(_, _)));
}

#[test]
fn expired_items_cannot_be_approved() {
    let queue = ApprovalQueue::new(QueueConfig::default(), chrono::Duration::milliseconds(1), None);
    let item_id = queue.enqueue(proposal("payments-api", Urgency::Normal)).unwrap();
    std::thread::sleep(std::time::Duration::from_millis(20));

    assert!(queue.list_pending(10).is_empty());
    let err = queue.approve(&item_id, "alice", None).unwrap_err();
    assert!(matches!(err, QueueError::Expired(_)));
}

#[test]
fn unknown_item_id_is_reported_as_not_found() {
    let queue = ApprovalQueue::new(QueueConfig::default(), chrono::Duration::minutes(30), None);
    let err = queue.approve("nonexistent", "alice", None).unwrap_err();
    assert_eq!(err, QueueError::NotFound("nonexistent".to_string()));
}
