//! The unit type used to signal "stop now" across a [`crate::event::channel`] pair.

pub type CancellationMessage = ();

/// Lifecycle events published by the approval queue (§4.6), edge-case manager (§4.9),
/// and monitor (§4.8) — dispatched to subscribers *outside* whatever lock produced them (§5).
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    QueueEnqueued { item_id: String },
    QueueApproved { item_id: String },
    QueueDenied { item_id: String },
    QueueExpired { item_id: String },
    EdgeCaseDetected { kind: String, severity: String },
    AutoPauseEngaged { reason: String },
    AutoPauseLifted,
    MonitorRollback { monitor_id: String, reason: String },
    MonitorCompleted { monitor_id: String, outcome: String },
}

/// Signals the daemon binary's Ctrl-C handler publishes, mirroring the shutdown event the
/// teacher's `ApplicationEvent` carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplicationEvent {
    StopRequested,
}
