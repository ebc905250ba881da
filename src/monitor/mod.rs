//! The post-resurrection monitor (§4.8): runs a bounded-duration health/metrics session
//! per resurrected instance and decides whether to trigger a rollback.

pub mod fake;

pub use fake::{InProcessHealthProbe, InProcessMetricsProbe};

use crate::models::{Anomaly, AnomalyKind, MetricsSample, MonitoringSession, ProbeResult, SessionOutcome};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

pub trait HealthProbe: Send + Sync {
    fn probe(&self, module: &str, instance_id: &str) -> ProbeResult;
}

pub trait MetricsProbe: Send + Sync {
    fn sample(&self, module: &str, instance_id: &str) -> MetricsSample;
}

#[derive(Debug, Clone, Copy)]
pub struct MonitorConfig {
    pub max_consecutive_failures: u32,
    pub health_check_interval: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        MonitorConfig {
            max_consecutive_failures: 3,
            health_check_interval: Duration::from_secs(30),
        }
    }
}

pub type RollbackCallback = Box<dyn Fn(&str, &str) + Send + Sync>;

pub struct PostResurrectionMonitor<H: HealthProbe, M: MetricsProbe> {
    health_probe: H,
    metrics_probe: M,
    config: MonitorConfig,
    sessions: Mutex<HashMap<String, MonitoringSession>>,
    rollback_callback: Mutex<Option<RollbackCallback>>,
}

impl<H: HealthProbe, M: MetricsProbe> PostResurrectionMonitor<H, M> {
    pub fn new(health_probe: H, metrics_probe: M, config: MonitorConfig) -> Self {
        PostResurrectionMonitor {
            health_probe,
            metrics_probe,
            config,
            sessions: Mutex::new(HashMap::new()),
            rollback_callback: Mutex::new(None),
        }
    }

    pub fn set_rollback_callback(&self, callback: RollbackCallback) {
        *self.rollback_callback.lock().unwrap() = Some(callback);
    }

    pub fn start_monitoring(
        &self,
        request_id: &str,
        target_module: &str,
        target_instance_id: &str,
        duration_minutes: u32,
    ) -> String {
        let monitor_id = Uuid::new_v4().to_string();
        let session = MonitoringSession::new(
            monitor_id.clone(),
            request_id.to_string(),
            target_module.to_string(),
            target_instance_id.to_string(),
            duration_minutes,
            Utc::now(),
        );
        self.sessions.lock().unwrap().insert(monitor_id.clone(), session);
        monitor_id
    }

    pub fn stop_monitoring(&self, monitor_id: &str) -> Option<MonitoringSession> {
        let mut sessions = self.sessions.lock().unwrap();
        let session = sessions.get_mut(monitor_id)?;
        session.active = false;
        if session.outcome.is_none() {
            session.outcome = Some(if session.pass_rate() >= 0.9 {
                SessionOutcome::Stable
            } else {
                SessionOutcome::Unstable
            });
        }
        Some(session.clone())
    }

    pub fn check_health(&self, module: &str, instance_id: &str) -> ProbeResult {
        self.health_probe.probe(module, instance_id)
    }

    pub fn should_rollback(&self, monitor_id: &str) -> (bool, Option<String>) {
        let sessions = self.sessions.lock().unwrap();
        match sessions.get(monitor_id) {
            Some(session) => evaluate_rollback(session, self.config.max_consecutive_failures),
            None => (false, None),
        }
    }

    /// Runs one iteration of the session loop (§4.8 steps 1-4); the caller is
    /// responsible for sleeping `health_check_interval` and for exiting the loop on
    /// cancellation or when this returns `true` (rollback fired) or the session's
    /// `ends_at` has passed.
    pub fn tick(&self, monitor_id: &str) -> bool {
        let (module, instance_id, offset_ms) = {
            let sessions = self.sessions.lock().unwrap();
            let session = match sessions.get(monitor_id) {
                Some(s) => s,
                None => return true,
            };
            (
                session.target_module.clone(),
                session.target_instance_id.clone(),
                (Utc::now() - session.started_at).num_milliseconds().max(0) as u64,
            )
        };

        let probe_result = self.health_probe.probe(&module, &instance_id);
        let metrics = self.metrics_probe.sample(&module, &instance_id);

        let mut sessions = self.sessions.lock().unwrap();
        let session = match sessions.get_mut(monitor_id) {
            Some(s) => s,
            None => return true,
        };

        session.record_probe(&probe_result);
        if probe_result.classify() == crate::models::HealthStatus::Unhealthy {
            let severity = (0.5 + 0.1 * session.consecutive_failures as f64).min(1.0);
            session.push_anomaly(Anomaly {
                kind: AnomalyKind::HealthCheckFail,
                severity,
                detected_at: Utc::now(),
                detail: format!("{module}/{instance_id} failed health probe"),
                resolved: false,
            });
        }

        session.push_metrics(MetricsSample {
            recorded_at_offset_ms: offset_ms,
            ..metrics
        });
        for anomaly in metrics_anomalies(&metrics) {
            session.push_anomaly(anomaly);
        }

        let (should_rollback, reason) = evaluate_rollback(session, self.config.max_consecutive_failures);
        if should_rollback {
            session.outcome = Some(SessionOutcome::RollbackTriggered);
            session.active = false;
            drop(sessions);
            if let Some(callback) = self.rollback_callback.lock().unwrap().as_ref() {
                callback(&module, reason.as_deref().unwrap_or("unspecified"));
            }
            return true;
        }

        if Utc::now() >= session.ends_at {
            session.active = false;
            session.outcome = Some(if session.pass_rate() >= 0.9 {
                SessionOutcome::Stable
            } else {
                SessionOutcome::Unstable
            });
            return true;
        }

        false
    }
}

fn metrics_anomalies(sample: &MetricsSample) -> Vec<Anomaly> {
    let mut anomalies = Vec::new();
    let now = Utc::now();
    if sample.cpu_percent > 90.0 {
        anomalies.push(Anomaly {
            kind: AnomalyKind::CpuSpike,
            severity: ((sample.cpu_percent - 90.0) / 10.0).clamp(0.0, 1.0).max(0.5),
            detected_at: now,
            detail: format!("cpu at {:.1}%", sample.cpu_percent),
            resolved: false,
        });
    }
    if sample.memory_percent > 90.0 {
        anomalies.push(Anomaly {
            kind: AnomalyKind::MemorySpike,
            severity: ((sample.memory_percent - 90.0) / 10.0).clamp(0.0, 1.0).max(0.5),
            detected_at: now,
            detail: format!("memory at {:.1}%", sample.memory_percent),
            resolved: false,
        });
    }
    if sample.error_rate > 0.1 {
        anomalies.push(Anomaly {
            kind: AnomalyKind::ErrorRate,
            severity: (sample.error_rate).clamp(0.0, 1.0).max(0.5),
            detected_at: now,
            detail: format!("error rate at {:.3}", sample.error_rate),
            resolved: false,
        });
    }
    anomalies
}

fn evaluate_rollback(session: &MonitoringSession, max_consecutive_failures: u32) -> (bool, Option<String>) {
    if session.consecutive_failures >= max_consecutive_failures {
        return (
            true,
            Some(format!(
                "{} consecutive health check failures",
                session.consecutive_failures
            )),
        );
    }
    if session.has_critical_anomaly() {
        return (true, Some("unresolved anomaly with severity >= 0.9".to_string()));
    }
    if session.total_health_checks >= 5 && session.pass_rate() < 0.5 {
        return (
            true,
            Some(format!("pass rate {:.2} below 0.5 after 5+ checks", session.pass_rate())),
        );
    }
    if session.has_crash_loop() {
        return (true, Some("crash loop detected".to_string()));
    }
    (false, None)
}

pub fn session_thread_context<H, M>(
    monitor: Arc<PostResurrectionMonitor<H, M>>,
    monitor_id: String,
    interval: Duration,
) -> crate::utils::thread_context::NotStartedThreadContext<impl FnOnce(crate::event::channel::EventConsumer<crate::event::cancellation::CancellationMessage>), ()>
where
    H: HealthProbe + 'static,
    M: MetricsProbe + 'static,
{
    crate::utils::thread_context::NotStartedThreadContext::new(
        format!("monitor-{monitor_id}"),
        move |stop| loop {
            if stop.try_recv().is_some() {
                break;
            }
            if monitor.tick(&monitor_id) {
                break;
            }
            std::thread::sleep(interval);
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::fake::{InProcessHealthProbe, InProcessMetricsProbe};

    #[test]
    fn three_consecutive_failures_trigger_rollback() {
        let health = InProcessHealthProbe::unhealthy();
        let metrics = InProcessMetricsProbe::steady();
        let monitor = PostResurrectionMonitor::new(health, metrics, MonitorConfig::default());
        let monitor_id = monitor.start_monitoring("req-1", "payments-api", "instance-1", 30);

        assert!(!monitor.tick(&monitor_id));
        assert!(!monitor.tick(&monitor_id));
        assert!(monitor.tick(&monitor_id));

        let (should, reason) = monitor.should_rollback(&monitor_id);
        assert!(should || reason.is_some());
    }

    #[test]
    fn healthy_session_ends_stable_after_duration() {
        let health = InProcessHealthProbe::healthy();
        let metrics = InProcessMetricsProbe::steady();
        let monitor = PostResurrectionMonitor::new(health, metrics, MonitorConfig::default());
        let monitor_id = monitor.start_monitoring("req-1", "payments-api", "instance-1", 0);
        assert!(monitor.tick(&monitor_id));
        let session = monitor.stop_monitoring(&monitor_id).unwrap();
        assert_eq!(session.outcome, Some(SessionOutcome::Stable));
    }

    #[test]
    fn cpu_spike_is_recorded_as_anomaly() {
        let health = InProcessHealthProbe::healthy();
        let metrics = InProcessMetricsProbe::cpu_spike();
        let monitor = PostResurrectionMonitor::new(health, metrics, MonitorConfig::default());
        let monitor_id = monitor.start_monitoring("req-1", "payments-api", "instance-1", 30);
        monitor.tick(&monitor_id);
        let sessions = monitor.sessions.lock().unwrap();
        let session = sessions.get(&monitor_id).unwrap();
        assert!(session.anomalies.iter().any(|a| a.kind == AnomalyKind::CpuSpike));
    }
}
