//! `MonitoringSession` and the health/anomaly types it accumulates (§3, §4.8).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

const MAX_METRICS_HISTORY: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
    Unknown,
}

/// The tagged result of a single `HealthProbe` call (§9: no duck-typed attributes).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeResult {
    pub healthy: bool,
    pub degraded: Option<bool>,
    pub error: Option<String>,
    pub latency_ms: Option<u64>,
}

impl ProbeResult {
    pub fn classify(&self) -> HealthStatus {
        if self.healthy {
            HealthStatus::Healthy
        } else if self.degraded.unwrap_or(false) {
            HealthStatus::Degraded
        } else if self.error.is_some() {
            HealthStatus::Unhealthy
        } else {
            HealthStatus::Unknown
        }
    }
}

/// A single sample returned by `MetricsProbe`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricsSample {
    pub cpu_percent: f64,
    pub memory_percent: f64,
    pub error_rate: f64,
    pub recorded_at_offset_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnomalyKind {
    HealthCheckFail,
    CpuSpike,
    MemorySpike,
    ErrorRate,
    CrashLoop,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anomaly {
    pub kind: AnomalyKind,
    pub severity: f64,
    pub detected_at: DateTime<Utc>,
    pub detail: String,
    pub resolved: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionOutcome {
    Stable,
    Degraded,
    Unstable,
    RollbackTriggered,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringSession {
    pub monitor_id: String,
    pub request_id: String,
    pub target_module: String,
    pub target_instance_id: String,
    pub started_at: DateTime<Utc>,
    pub duration_minutes: u32,
    pub ends_at: DateTime<Utc>,
    pub health_status: HealthStatus,
    pub total_health_checks: u32,
    pub passed_health_checks: u32,
    pub consecutive_failures: u32,
    pub anomalies: Vec<Anomaly>,
    #[serde(default)]
    pub metrics_history: VecDeque<MetricsSample>,
    pub active: bool,
    pub outcome: Option<SessionOutcome>,
}

impl MonitoringSession {
    pub fn new(
        monitor_id: String,
        request_id: String,
        target_module: String,
        target_instance_id: String,
        duration_minutes: u32,
        now: DateTime<Utc>,
    ) -> Self {
        MonitoringSession {
            monitor_id,
            request_id,
            target_module,
            target_instance_id,
            started_at: now,
            duration_minutes,
            ends_at: now + chrono::Duration::minutes(duration_minutes as i64),
            health_status: HealthStatus::Unknown,
            total_health_checks: 0,
            passed_health_checks: 0,
            consecutive_failures: 0,
            anomalies: Vec::new(),
            metrics_history: VecDeque::new(),
            active: true,
            outcome: None,
        }
    }

    pub fn pass_rate(&self) -> f64 {
        if self.total_health_checks == 0 {
            1.0
        } else {
            self.passed_health_checks as f64 / self.total_health_checks as f64
        }
    }

    pub fn record_probe(&mut self, result: &ProbeResult) {
        self.total_health_checks += 1;
        self.health_status = result.classify();
        match self.health_status {
            HealthStatus::Healthy => {
                self.passed_health_checks += 1;
                self.consecutive_failures = 0;
            }
            HealthStatus::Unhealthy => {
                self.consecutive_failures += 1;
            }
            _ => {}
        }
    }

    pub fn push_metrics(&mut self, sample: MetricsSample) {
        if self.metrics_history.len() >= MAX_METRICS_HISTORY {
            self.metrics_history.pop_front();
        }
        self.metrics_history.push_back(sample);
    }

    pub fn push_anomaly(&mut self, anomaly: Anomaly) {
        self.anomalies.push(anomaly);
    }

    pub fn has_crash_loop(&self) -> bool {
        self.anomalies
            .iter()
            .any(|a| a.kind == AnomalyKind::CrashLoop && !a.resolved)
    }

    pub fn has_critical_anomaly(&self) -> bool {
        self.anomalies.iter().any(|a| !a.resolved && a.severity >= 0.9)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probe_result_classification() {
        let healthy = ProbeResult {
            healthy: true,
            degraded: None,
            error: None,
            latency_ms: Some(5),
        };
        assert_eq!(healthy.classify(), HealthStatus::Healthy);

        let degraded = ProbeResult {
            healthy: false,
            degraded: Some(true),
            error: None,
            latency_ms: Some(500),
        };
        assert_eq!(degraded.classify(), HealthStatus::Degraded);

        let unhealthy = ProbeResult {
            healthy: false,
            degraded: Some(false),
            error: Some("timeout".into()),
            latency_ms: None,
        };
        assert_eq!(unhealthy.classify(), HealthStatus::Unhealthy);
    }

    #[test]
    fn metrics_history_is_bounded() {
        let mut session = MonitoringSession::new(
            "mon-1".into(),
            "req-1".into(),
            "mod".into(),
            "inst".into(),
            30,
            Utc::now(),
        );
        for i in 0..150 {
            session.push_metrics(MetricsSample {
                cpu_percent: 1.0,
                memory_percent: 1.0,
                error_rate: 0.0,
                recorded_at_offset_ms: i,
            });
        }
        assert_eq!(session.metrics_history.len(), MAX_METRICS_HISTORY);
        assert_eq!(session.metrics_history.front().unwrap().recorded_at_offset_ms, 50);
    }

    #[test]
    fn consecutive_failures_reset_on_healthy() {
        let mut session = MonitoringSession::new(
            "mon-1".into(),
            "req-1".into(),
            "mod".into(),
            "inst".into(),
            30,
            Utc::now(),
        );
        let unhealthy = ProbeResult {
            healthy: false,
            degraded: None,
            error: Some("down".into()),
            latency_ms: None,
        };
        session.record_probe(&unhealthy);
        session.record_probe(&unhealthy);
        assert_eq!(session.consecutive_failures, 2);
        let healthy = ProbeResult {
            healthy: true,
            degraded: None,
            error: None,
            latency_ms: Some(1),
        };
        session.record_probe(&healthy);
        assert_eq!(session.consecutive_failures, 0);
        assert_eq!(session.passed_health_checks, 1);
    }
}
