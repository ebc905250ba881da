//! End-to-end pipeline scenarios driven entirely through `Agent`, wired on in-process
//! fakes the way the daemon binary wires them.

use resilience_agent::admission::{AdmissionConfig, AutoResurrectionManager};
use resilience_agent::agent::{Agent, AgentPipelineConfig};
use resilience_agent::decision::{DecisionEngine, DecisionPolicy};
use resilience_agent::edge_case::{EdgeCaseConfig, EdgeCaseManager};
use resilience_agent::executor::{InProcessExecutor, ResurrectionExecutor};
use resilience_agent::intel::{InProcessIntel, ResilientIntelClient};
use resilience_agent::models::kill_report::{KillReason, Severity};
use resilience_agent::models::KillReport;
use resilience_agent::monitor::{InProcessHealthProbe, InProcessMetricsProbe, MonitorConfig, PostResurrectionMonitor};
use resilience_agent::queue::{ApprovalQueue, QueueConfig};
use resilience_agent::risk::{RiskAssessor, RiskThresholds};
use std::sync::Arc;
use std::time::Duration;

fn sample_report(kill_id: &str, module: &str, confidence: f64, severity: Severity) -> KillReport {
    KillReport {
        kill_id: kill_id.to_string(),
        timestamp: chrono::Utc::now(),
        target_module: module.to_string(),
        target_instance_id: "instance-1".to_string(),
        kill_reason: KillReason::AnomalyBehavior,
        severity,
        confidence_score: confidence,
        evidence: vec![],
        dependencies: vec![],
        source_agent: "killer-1".to_string(),
        metadata: serde_json::json!({}),
    }
}

fn build_agent() -> Arc<Agent> {
    build_agent_with_risk_and_intel(RiskThresholds::default(), InProcessIntel::new())
}

fn build_agent_with_risk(thresholds: RiskThresholds) -> Arc<Agent> {
    build_agent_with_risk_and_intel(thresholds, InProcessIntel::new())
}

fn build_agent_with_risk_and_intel(thresholds: RiskThresholds, fake_intel: InProcessIntel) -> Arc<Agent> {
    let risk_assessor = Arc::new(RiskAssessor::new(thresholds));
    let decision_engine = Arc::new(DecisionEngine::new(DecisionPolicy::default(), risk_assessor.clone()));
    let edge_case_manager = Arc::new(EdgeCaseManager::new(EdgeCaseConfig::default()));
    let queue = Arc::new(ApprovalQueue::new(QueueConfig::default(), chrono::Duration::minutes(30), None));
    let intel: Arc<dyn resilience_agent::agent::IntelService> =
        Arc::new(ResilientIntelClient::new(fake_intel));
    let admission: Arc<dyn resilience_agent::agent::AdmissionService> = Arc::new(AutoResurrectionManager::new(
        AdmissionConfig::default(),
        ResurrectionExecutor::new(InProcessExecutor::always_succeeds()),
        edge_case_manager.clone(),
    ));
    let execution: Arc<dyn resilience_agent::agent::ExecutionService> =
        Arc::new(ResurrectionExecutor::new(InProcessExecutor::always_succeeds()));
    let monitor: Arc<dyn resilience_agent::agent::MonitorService> = Arc::new(PostResurrectionMonitor::new(
        InProcessHealthProbe::healthy(),
        InProcessMetricsProbe::steady(),
        MonitorConfig::default(),
    ));

    Agent::new(
        AgentPipelineConfig {
            monitor_tick_interval: Duration::from_millis(10),
        },
        queue,
        risk_assessor,
        decision_engine,
        edge_case_manager,
        intel,
        admission,
        execution,
        monitor,
    )
}

#[test]
fn low_risk_report_with_a_confident_intel_context_is_auto_resurrected() {
    let fake_intel = InProcessIntel::new();
    fake_intel.set_context_for(
        "kill-auto-1",
        resilience_agent::models::IntelContext {
            risk_score: 0.0,
            ..resilience_agent::models::IntelContext::default_for("kill-auto-1", "fake-query".into())
        },
    );
    // Weighted so that a confident, low-intel-risk report clears both the risk
    // assessor's auto-approve band and the admission manager's max_risk_score gate.
    let mut weights = std::collections::HashMap::new();
    weights.insert("killer_confidence".to_string(), 0.2);
    weights.insert("intel_risk".to_string(), 0.8);
    let thresholds = RiskThresholds {
        weights,
        critical_modules: Vec::new(),
        auto_approve_confidence_floor: 0.8,
    };
    let agent = build_agent_with_risk_and_intel(thresholds, fake_intel);
    agent.handle_kill_report(sample_report("kill-auto-1", "payments-api", 0.9, Severity::Info));
    assert_eq!(agent.queue_stats().pending, 0);
    assert_eq!(agent.queue_stats().approved, 0);
    agent.stop().unwrap();
}

#[test]
fn low_confidence_report_lands_in_the_approval_queue() {
    let agent = build_agent();
    agent.handle_kill_report(sample_report("kill-1", "payments-api", 0.4, Severity::Medium));
    let pending = agent.list_pending(10);
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].proposal.kill_report.target_module, "payments-api");
}

#[test]
fn critical_risk_level_is_denied_outright_and_never_queued() {
    let thresholds = RiskThresholds {
        critical_modules: vec!["payments-api".to_string()],
        ..RiskThresholds::default()
    };
    let agent = build_agent_with_risk(thresholds);
    let mut report = sample_report("kill-1", "payments-api", 1.0, Severity::Critical);
    report.dependencies = (0..10).map(|i| format!("dep-{i}")).collect();
    agent.handle_kill_report(report);
    assert_eq!(agent.queue_stats().pending, 0);
    assert_eq!(agent.queue_stats().approved, 0);
}

#[test]
fn manual_override_is_always_denied_regardless_of_confidence() {
    let agent = build_agent();
    let mut report = sample_report("kill-1", "payments-api", 0.99, Severity::Info);
    report.kill_reason = KillReason::ManualOverride;
    agent.handle_kill_report(report);
    let stats = agent.queue_stats();
    assert_eq!(stats.pending, 0);
    assert_eq!(stats.approved, 0);
}

#[test]
fn approving_a_queued_item_executes_it_and_an_unknown_id_is_rejected() {
    let agent = build_agent();
    agent.handle_kill_report(sample_report("kill-1", "payments-api", 0.4, Severity::Medium));
    let pending = agent.list_pending(10);
    let item_id = pending[0].item_id.clone();

    assert!(agent.approve_item("not-a-real-id", "alice", None).is_err());
    agent.approve_item(&item_id, "alice", None).unwrap();

    let item = agent.get_item(&item_id).unwrap();
    assert!(matches!(item.status, resilience_agent::models::QueueItemStatus::Approved));
    agent.stop().unwrap();
}

#[test]
fn denying_a_queued_item_records_the_reason_and_never_executes() {
    let agent = build_agent();
    agent.handle_kill_report(sample_report("kill-1", "payments-api", 0.4, Severity::Medium));
    let pending = agent.list_pending(10);
    let item_id = pending[0].item_id.clone();

    agent.deny_item(&item_id, "bob", "known false positive".to_string()).unwrap();

    let item = agent.get_item(&item_id).unwrap();
    assert!(matches!(item.status, resilience_agent::models::QueueItemStatus::Denied));
    assert_eq!(item.review_notes.as_deref(), Some("known false positive"));
    assert_eq!(agent.queue_stats().approved, 0);
}

#[test]
fn approved_then_denied_second_time_is_rejected_because_the_state_is_terminal() {
    let agent = build_agent();
    agent.handle_kill_report(sample_report("kill-1", "payments-api", 0.4, Severity::Medium));
    let pending = agent.list_pending(10);
    let item_id = pending[0].item_id.clone();

    agent.approve_item(&item_id, "alice", None).unwrap();
    assert!(agent.deny_item(&item_id, "bob", "too late".to_string()).is_err());
    agent.stop().unwrap();
}
