//! Edge-case detection and the auto-pause it can trigger (§4.9), exercised against the
//! full pipeline rather than the manager in isolation.

use resilience_agent::admission::{AdmissionConfig, AutoResurrectionGate, AutoResurrectionManager};
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

fn report(kill_id: &str, module: &str) -> KillReport {
    KillReport {
        kill_id: kill_id.to_string(),
        timestamp: chrono::Utc::now(),
        target_module: module.to_string(),
        target_instance_id: "instance-1".to_string(),
        kill_reason: KillReason::AnomalyBehavior,
        severity: Severity::Info,
        confidence_score: 0.9,
        evidence: vec![],
        dependencies: vec![],
        source_agent: "killer-1".to_string(),
        metadata: serde_json::json!({}),
    }
}

fn confident_weights() -> RiskThresholds {
    let mut weights = std::collections::HashMap::new();
    weights.insert("killer_confidence".to_string(), 0.2);
    weights.insert("intel_risk".to_string(), 0.8);
    RiskThresholds {
        weights,
        critical_modules: Vec::new(),
        auto_approve_confidence_floor: 0.8,
    }
}

fn build_agent(edge_case_config: EdgeCaseConfig, fake_intel: InProcessIntel) -> (Arc<Agent>, Arc<EdgeCaseManager>) {
    let risk_assessor = Arc::new(RiskAssessor::new(confident_weights()));
    let decision_engine = Arc::new(DecisionEngine::new(DecisionPolicy::default(), risk_assessor.clone()));
    let edge_case_manager = Arc::new(EdgeCaseManager::new(edge_case_config));
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

    let agent = Agent::new(
        AgentPipelineConfig {
            monitor_tick_interval: Duration::from_millis(10),
        },
        queue,
        risk_assessor,
        decision_engine,
        edge_case_manager.clone(),
        intel,
        admission,
        execution,
        monitor,
    );
    (agent, edge_case_manager)
}

fn confident_intel(kill_ids: &[&str]) -> InProcessIntel {
    let fake_intel = InProcessIntel::new();
    for kill_id in kill_ids.iter().copied() {
        fake_intel.set_context_for(
            kill_id,
            resilience_agent::models::IntelContext {
                risk_score: 0.0,
                ..resilience_agent::models::IntelContext::default_for(kill_id, "fake-query".into())
            },
        );
    }
    fake_intel
}

#[test]
fn rapid_repeated_kills_of_the_same_module_blocks_auto_resurrection_for_that_module() {
    let config = EdgeCaseConfig {
        rapid_repeated_kills_count: 3,
        ..EdgeCaseConfig::default()
    };
    let kill_ids = ["kill-0", "kill-1", "kill-2"];
    let (agent, edge_case_manager) = build_agent(config, confident_intel(&kill_ids));

    let (allowed_before, _) = edge_case_manager.should_allow_auto_resurrection("payments-api");
    assert!(allowed_before);
    for kill_id in kill_ids {
        agent.handle_kill_report(report(kill_id, "payments-api"));
    }
    let (allowed_after, reason) = edge_case_manager.should_allow_auto_resurrection("payments-api");
    assert!(!allowed_after, "three rapid kills of the same module should block auto-resurrection for it");
    assert!(reason.is_some());
    // RAPID_REPEATED_KILLS is HIGH severity, not CRITICAL, so it blocks only the
    // affected module rather than tripping the system-wide pause.
    assert!(!edge_case_manager.is_auto_resurrection_paused());
    assert_eq!(agent.queue_stats().pending, 0);
}

#[test]
fn isolated_kills_across_distinct_modules_do_not_trip_rapid_repeated_kills() {
    let kill_ids = ["kill-a", "kill-b", "kill-c"];
    let (agent, edge_case_manager) = build_agent(EdgeCaseConfig::default(), confident_intel(&kill_ids));
    agent.handle_kill_report(report("kill-a", "service-a"));
    agent.handle_kill_report(report("kill-b", "service-b"));
    agent.handle_kill_report(report("kill-c", "service-c"));
    assert!(!edge_case_manager.is_auto_resurrection_paused());
    assert_eq!(agent.queue_stats().pending, 0);
    assert_eq!(agent.queue_stats().approved, 0);
}
