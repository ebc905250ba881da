//! The composition root (§5): wires ingestion, intel, risk, decision, admission, queue,
//! executor and monitor into one pipeline driven off the kill stream channel, plus the
//! outcome-reporting loop (§4.14).

use crate::admission::AutoResurrectionGate;
use crate::edge_case::EdgeCaseManager;
use crate::event::cancellation::CancellationMessage;
use crate::event::channel::EventConsumer;
use crate::executor::{ExecutorError, ModuleRestarter};
use crate::intel::{IntelAdapter, IntelError, ResilientIntelClient};
use crate::models::{
    Attempt, AttemptResult, DecisionOutcome, IntelContext, KillReport, MonitoringSession,
    OutcomeRecord, RequestStatus, ResurrectionDecision, ResurrectionRequest, RiskAssessment,
    SessionOutcome,
};
use crate::monitor::{HealthProbe, MetricsProbe, PostResurrectionMonitor};
use crate::models::QueueItem;
use crate::queue::{ApprovalQueue, QueueError, QueueStats};
use crate::recommendation::RecommendationBuilder;
use crate::risk::RiskAssessor;
use crate::utils::thread_context::{NotStartedThreadContext, StartedThreadContext, ThreadContextStopperError};
use crossbeam::channel::{Receiver, RecvTimeoutError};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{error, info, warn};

/// Type-erases `ResilientIntelClient<A>` so the composition root does not need to name
/// the concrete adapter type.
pub trait IntelService: Send + Sync {
    fn query_context(&self, report: &KillReport) -> IntelContext;
    fn report_outcome(&self, record: &OutcomeRecord) -> Result<bool, IntelError>;
}

impl<A: IntelAdapter> IntelService for ResilientIntelClient<A> {
    fn query_context(&self, report: &KillReport) -> IntelContext {
        self.query_context(report)
    }

    fn report_outcome(&self, record: &OutcomeRecord) -> Result<bool, IntelError> {
        self.report_outcome(record)
    }
}

/// Type-erases `AutoResurrectionManager<R, G>`.
pub trait AdmissionService: Send + Sync {
    fn attempt_resurrection(
        &self,
        report: &KillReport,
        decision: &ResurrectionDecision,
        risk_assessment: &RiskAssessment,
    ) -> (Attempt, Option<ResurrectionRequest>);
}

impl<R: ModuleRestarter, G: AutoResurrectionGate> AdmissionService for crate::admission::AutoResurrectionManager<R, G> {
    fn attempt_resurrection(
        &self,
        report: &KillReport,
        decision: &ResurrectionDecision,
        risk_assessment: &RiskAssessment,
    ) -> (Attempt, Option<ResurrectionRequest>) {
        self.attempt_resurrection(report, decision, risk_assessment)
    }
}

/// The manual-approval counterpart to `AdmissionService`: no gates, just execute.
pub trait ExecutionService: Send + Sync {
    fn resurrect(&self, request: &mut ResurrectionRequest) -> Result<(), ExecutorError>;
    fn rollback(&self, request: &mut ResurrectionRequest, reason: String) -> Result<(), ExecutorError>;
}

impl<R: ModuleRestarter> ExecutionService for crate::executor::ResurrectionExecutor<R> {
    fn resurrect(&self, request: &mut ResurrectionRequest) -> Result<(), ExecutorError> {
        self.resurrect(request)
    }

    fn rollback(&self, request: &mut ResurrectionRequest, reason: String) -> Result<(), ExecutorError> {
        self.rollback(request, reason)
    }
}

/// Type-erases `PostResurrectionMonitor<H, M>`.
pub trait MonitorService: Send + Sync {
    fn start_monitoring(&self, request_id: &str, module: &str, instance_id: &str, duration_minutes: u32) -> String;
    fn tick(&self, monitor_id: &str) -> bool;
    fn stop_monitoring(&self, monitor_id: &str) -> Option<MonitoringSession>;
    fn set_rollback_callback(&self, callback: crate::monitor::RollbackCallback);
}

impl<H: HealthProbe + 'static, M: MetricsProbe + 'static> MonitorService for PostResurrectionMonitor<H, M> {
    fn start_monitoring(&self, request_id: &str, module: &str, instance_id: &str, duration_minutes: u32) -> String {
        self.start_monitoring(request_id, module, instance_id, duration_minutes)
    }

    fn tick(&self, monitor_id: &str) -> bool {
        self.tick(monitor_id)
    }

    fn stop_monitoring(&self, monitor_id: &str) -> Option<MonitoringSession> {
        self.stop_monitoring(monitor_id)
    }

    fn set_rollback_callback(&self, callback: crate::monitor::RollbackCallback) {
        self.set_rollback_callback(callback)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct AgentPipelineConfig {
    pub monitor_tick_interval: Duration,
}

impl Default for AgentPipelineConfig {
    fn default() -> Self {
        AgentPipelineConfig {
            monitor_tick_interval: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error(transparent)]
    Queue(#[from] QueueError),
    #[error(transparent)]
    Executor(#[from] ExecutorError),
}

/// An in-flight resurrection, from the moment it starts monitoring to the moment the
/// session is finalized and its outcome reported (§4.14).
struct ActiveSession {
    request: ResurrectionRequest,
}

pub struct Agent {
    config: AgentPipelineConfig,
    queue: Arc<ApprovalQueue>,
    risk_assessor: Arc<RiskAssessor>,
    decision_engine: Arc<crate::decision::DecisionEngine>,
    recommendation_builder: RecommendationBuilder,
    edge_case_manager: Arc<EdgeCaseManager>,
    intel: Arc<dyn IntelService>,
    admission: Arc<dyn AdmissionService>,
    execution: Arc<dyn ExecutionService>,
    monitor: Arc<dyn MonitorService>,
    active_sessions: Mutex<HashMap<String, ActiveSession>>,
    threads: Mutex<Vec<StartedThreadContext>>,
}

impl Agent {
    pub fn new(
        config: AgentPipelineConfig,
        queue: Arc<ApprovalQueue>,
        risk_assessor: Arc<RiskAssessor>,
        decision_engine: Arc<crate::decision::DecisionEngine>,
        edge_case_manager: Arc<EdgeCaseManager>,
        intel: Arc<dyn IntelService>,
        admission: Arc<dyn AdmissionService>,
        execution: Arc<dyn ExecutionService>,
        monitor: Arc<dyn MonitorService>,
    ) -> Arc<Self> {
        let agent = Arc::new(Agent {
            config,
            queue,
            risk_assessor,
            decision_engine,
            recommendation_builder: RecommendationBuilder::new(),
            edge_case_manager,
            intel,
            admission,
            execution,
            monitor,
            active_sessions: Mutex::new(HashMap::new()),
            threads: Mutex::new(Vec::new()),
        });
        let callback_agent = agent.clone();
        agent.monitor.set_rollback_callback(Box::new(move |module, reason| {
            callback_agent.handle_rollback(module, reason);
        }));
        agent
    }

    /// Runs the core pipeline (§4.1-§4.7, §4.15) for one ingested kill report.
    pub fn handle_kill_report(self: &Arc<Self>, report: KillReport) {
        if let Some(case) = self.edge_case_manager.process_kill_report(&report) {
            warn!(kind = ?case.kind, severity = ?case.severity, "edge case detected");
        }
        self.risk_assessor.set_system_paused(self.edge_case_manager.is_auto_resurrection_paused());

        let context = self.intel.query_context(&report);
        let risk_assessment = self.risk_assessor.assess(&report, &context);
        let decision = self.decision_engine.should_resurrect(&report, &context);

        match decision.outcome {
            DecisionOutcome::ApproveAuto => {
                let (attempt, request) = self.admission.attempt_resurrection(&report, &decision, &risk_assessment);
                match (attempt.result, request) {
                    (AttemptResult::Success, Some(request)) => self.begin_monitoring(request),
                    (_, maybe_request) => {
                        info!(kill_id = %report.kill_id, result = ?attempt.result, reason = %attempt.reason, "auto-resurrection not executed");
                        self.report_non_execution_outcome(&decision, maybe_request, &attempt.reason);
                    }
                }
            }
            DecisionOutcome::Deny => {
                info!(kill_id = %report.kill_id, "decision denies resurrection, module stays terminated");
            }
            DecisionOutcome::PendingReview | DecisionOutcome::ApproveManual | DecisionOutcome::Defer => {
                let proposal = self.recommendation_builder.build(report, decision, risk_assessment);
                match self.queue.enqueue(proposal) {
                    Ok(item_id) => info!(item_id = %item_id, "resurrection proposal enqueued for review"),
                    Err(err) => error!(error = %err, "failed to enqueue resurrection proposal"),
                }
            }
        }
    }

    /// Approves a pending queue item and drives it through execution and monitoring.
    pub fn approve_item(self: &Arc<Self>, item_id: &str, approver: &str, notes: Option<String>) -> Result<(), AgentError> {
        let item = self.queue.approve(item_id, approver, notes)?;
        let proposal = item.proposal;
        let mut request = ResurrectionRequest {
            request_id: uuid::Uuid::new_v4().to_string(),
            decision_id: proposal.decision.decision_id.clone(),
            kill_id: proposal.kill_report.kill_id.clone(),
            target_module: proposal.kill_report.target_module.clone(),
            target_instance_id: proposal.kill_report.target_instance_id.clone(),
            status: RequestStatus::Pending,
            created_at: chrono::Utc::now(),
            approved_at: Some(chrono::Utc::now()),
            approved_by: Some(approver.to_string()),
            executed_at: None,
            completed_at: None,
            rollback_reason: None,
            monitoring_duration_minutes: proposal.decision.timeout_minutes,
            health_checks: 0,
        };
        let _ = request.transition(RequestStatus::Approved);

        self.execution.resurrect(&mut request)?;
        self.begin_monitoring(request);
        Ok(())
    }

    pub fn deny_item(&self, item_id: &str, denier: &str, reason: String) -> Result<(), AgentError> {
        self.queue.deny(item_id, denier, reason)?;
        Ok(())
    }

    /// Read-only view for the approval CLI (§6): pending items, a single item, and
    /// aggregate counts. `refresh` just forces the expiry sweep that every other queue
    /// method already performs on entry.
    pub fn list_pending(&self, limit: usize) -> Vec<QueueItem> {
        self.queue.list_pending(limit)
    }

    pub fn get_item(&self, item_id: &str) -> Option<QueueItem> {
        self.queue.get_item(item_id)
    }

    pub fn queue_stats(&self) -> QueueStats {
        self.queue.stats()
    }

    pub fn refresh(&self) {
        self.queue.stats();
    }

    fn begin_monitoring(self: &Arc<Self>, request: ResurrectionRequest) {
        let monitor_id = self.monitor.start_monitoring(
            &request.request_id,
            &request.target_module,
            &request.target_instance_id,
            request.monitoring_duration_minutes,
        );
        self.active_sessions.lock().unwrap().insert(monitor_id.clone(), ActiveSession { request });

        let agent = self.clone();
        let interval = self.config.monitor_tick_interval;
        let ctx = NotStartedThreadContext::new(format!("monitor-session-{monitor_id}"), move |stop| loop {
            if stop.try_recv().is_some() {
                break;
            }
            if agent.monitor.tick(&monitor_id) {
                if let Some(session) = agent.monitor.stop_monitoring(&monitor_id) {
                    agent.finalize_session(&monitor_id, session);
                }
                break;
            }
            std::thread::sleep(interval);
        });
        self.threads.lock().unwrap().push(ctx.start());
    }

    fn handle_rollback(&self, module: &str, reason: &str) {
        let target_monitor_id = {
            let sessions = self.active_sessions.lock().unwrap();
            sessions
                .iter()
                .find(|(_, s)| s.request.target_module == module)
                .map(|(id, _)| id.clone())
        };
        let Some(monitor_id) = target_monitor_id else {
            warn!(module, "rollback requested for module with no active session");
            return;
        };

        let mut sessions = self.active_sessions.lock().unwrap();
        if let Some(session) = sessions.get_mut(&monitor_id) {
            if let Err(err) = self.execution.rollback(&mut session.request, reason.to_string()) {
                error!(module, error = %err, "rollback attempt failed");
            }
        }
    }

    /// §4.14: when a decision never reaches execution or monitoring, its outcome is still
    /// reported to intel so history and false-positive tracking stay accurate.
    fn report_non_execution_outcome(&self, decision: &ResurrectionDecision, request: Option<ResurrectionRequest>, reason: &str) {
        let record = OutcomeRecord {
            kill_id: decision.kill_id.clone(),
            request_id: request.map(|r| r.request_id),
            decision_id: decision.decision_id.clone(),
            outcome: "not_executed".to_string(),
            risk_score: decision.risk_score,
            risk_level: format!("{:?}", decision.risk_level).to_uppercase(),
            timestamp: chrono::Utc::now(),
            notes: Some(reason.to_string()),
        };
        if let Err(err) = self.intel.report_outcome(&record) {
            warn!(error = %err, "failed to report non-execution outcome to intel");
        }
    }

    /// §4.14: after a monitoring session ends, report its eventual outcome to intel.
    /// Failures here are logged, never retried beyond the adapter's own policy, and
    /// never block the pipeline.
    fn finalize_session(&self, monitor_id: &str, session: MonitoringSession) {
        let request = self.active_sessions.lock().unwrap().remove(monitor_id).map(|s| s.request);
        let outcome_str = match session.outcome {
            Some(SessionOutcome::Stable) => "stable",
            Some(SessionOutcome::Degraded) => "degraded",
            Some(SessionOutcome::Unstable) => "unstable",
            Some(SessionOutcome::RollbackTriggered) => "rollback_triggered",
            Some(SessionOutcome::Error) => "error",
            None => "unknown",
        };
        let record = OutcomeRecord {
            kill_id: session.request_id.clone(),
            request_id: request.map(|r| r.request_id),
            decision_id: String::new(),
            outcome: outcome_str.to_string(),
            risk_score: 0.0,
            risk_level: String::new(),
            timestamp: chrono::Utc::now(),
            notes: None,
        };
        if let Err(err) = self.intel.report_outcome(&record) {
            warn!(error = %err, "failed to report session outcome to intel");
        }
    }

    /// Spawns the thread that drains `kill_reports` and runs the pipeline for each.
    pub fn run(self: &Arc<Self>, kill_reports: Receiver<KillReport>) {
        let agent = self.clone();
        let ctx = NotStartedThreadContext::new("agent-pipeline", move |stop: EventConsumer<CancellationMessage>| loop {
            if stop.try_recv().is_some() {
                break;
            }
            match kill_reports.recv_timeout(Duration::from_millis(500)) {
                Ok(report) => agent.handle_kill_report(report),
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => break,
            }
        });
        self.threads.lock().unwrap().push(ctx.start());
    }

    pub fn stop(&self) -> Result<(), ThreadContextStopperError> {
        let threads = std::mem::take(&mut *self.threads.lock().unwrap());
        for ctx in threads {
            ctx.stop()?;
        }
        Ok(())
    }
}
