//! The data model (§3): value objects with explicit lifecycles, each a closed tagged
//! union at every enum boundary (§9) rather than a string-typed outcome.

pub mod attempt;
pub mod cluster;
pub mod decision;
pub mod edge_case;
pub mod intel;
pub mod kill_report;
pub mod monitor;
pub mod negotiation;
pub mod queue_item;
pub mod resurrection;
pub mod risk;
pub mod veto;
pub mod wire;

pub use attempt::{Attempt, AttemptResult};
pub use cluster::{ClusterInfo, ClusterReachability, ClusterRole, SyncEvent};
pub use decision::{DecisionOutcome, ResurrectionDecision};
pub use edge_case::{EdgeCase, EdgeCaseSeverity, EdgeCaseType, RecommendedAction};
pub use intel::{IntelContext, OutcomeRecord, ThreatIndicator};
pub use kill_report::{KillReason, KillReport, Severity};
pub use monitor::{
    Anomaly, AnomalyKind, HealthStatus, MetricsSample, MonitoringSession, ProbeResult,
    SessionOutcome,
};
pub use negotiation::{Negotiation, NegotiationMessage, NegotiationOutcome, NegotiationState, NegotiationType};
pub use queue_item::{QueueItem, QueueItemStatus, ResurrectionProposal, Urgency};
pub use resurrection::{InvalidTransition, RequestStatus, ResurrectionRequest, AUTO_APPROVER};
pub use risk::{RiskAssessment, RiskFactor, RiskLevel};
pub use veto::{VetoDecision, VetoRequest, VetoResponse};
