//! The agent's self-monitor (§4.12): watches its own health (decision latency, error
//! rate, queue depth, resource usage, upstream connection status) and attempts bounded
//! auto-remediation on sustained critical conditions.

use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Critical,
}

#[derive(Debug, Clone, Copy)]
pub struct MetricThresholds {
    pub degraded_at: f64,
    pub critical_at: f64,
}

impl MetricThresholds {
    fn classify(self, value: f64) -> HealthStatus {
        if value >= self.critical_at {
            HealthStatus::Critical
        } else if value >= self.degraded_at {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SelfMonitorConfig {
    pub decision_latency_ms: MetricThresholds,
    pub error_rate: MetricThresholds,
    pub queue_depth: MetricThresholds,
    pub memory_percent: MetricThresholds,
    pub cpu_percent: MetricThresholds,
    pub max_auto_remediations_per_hour: usize,
}

impl Default for SelfMonitorConfig {
    fn default() -> Self {
        SelfMonitorConfig {
            decision_latency_ms: MetricThresholds {
                degraded_at: 500.0,
                critical_at: 2000.0,
            },
            error_rate: MetricThresholds {
                degraded_at: 0.05,
                critical_at: 0.2,
            },
            queue_depth: MetricThresholds {
                degraded_at: 50.0,
                critical_at: 90.0,
            },
            memory_percent: MetricThresholds {
                degraded_at: 75.0,
                critical_at: 90.0,
            },
            cpu_percent: MetricThresholds {
                degraded_at: 75.0,
                critical_at: 90.0,
            },
            max_auto_remediations_per_hour: 3,
        }
    }
}

pub trait QueueDepthSource: Send + Sync {
    fn queue_depth(&self) -> usize;
}

pub trait HostResources: Send + Sync {
    fn memory_percent(&self) -> f64;
    fn cpu_percent(&self) -> f64;
    /// Invoked on memory pressure; a host-provided GC/trim hook (§4.12). Returns
    /// whether the hook ran successfully.
    fn trim_memory(&self) -> bool;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SelfMonitorSample {
    pub decision_latency_ms: f64,
    pub error_count: u64,
    pub queue_depth: usize,
    pub memory_percent: f64,
    pub cpu_percent: f64,
    pub killer_connected: bool,
    pub intel_connected: bool,
}

struct Decision {
    latencies: VecDeque<f64>,
    errors: u64,
    total: u64,
}

pub struct SelfMonitor<H: HostResources> {
    config: SelfMonitorConfig,
    host: H,
    decisions: Mutex<Decision>,
    overall: Mutex<HealthStatus>,
    remediations: Mutex<VecDeque<DateTime<Utc>>>,
}

impl<H: HostResources> SelfMonitor<H> {
    pub fn new(config: SelfMonitorConfig, host: H) -> Self {
        SelfMonitor {
            config,
            host,
            decisions: Mutex::new(Decision {
                latencies: VecDeque::new(),
                errors: 0,
                total: 0,
            }),
            overall: Mutex::new(HealthStatus::Healthy),
            remediations: Mutex::new(VecDeque::new()),
        }
    }

    pub fn record_decision(&self, latency: Duration, was_error: bool) {
        let mut decisions = self.decisions.lock().unwrap();
        if decisions.latencies.len() >= 1000 {
            decisions.latencies.pop_front();
        }
        decisions.latencies.push_back(latency.as_secs_f64() * 1000.0);
        decisions.total += 1;
        if was_error {
            decisions.errors += 1;
        }
    }

    pub fn sample(&self, queue_depth: usize, killer_connected: bool, intel_connected: bool) -> SelfMonitorSample {
        let decisions = self.decisions.lock().unwrap();
        let latency = decisions.latencies.back().copied().unwrap_or(0.0);
        SelfMonitorSample {
            decision_latency_ms: latency,
            error_count: decisions.errors,
            queue_depth,
            memory_percent: self.host.memory_percent(),
            cpu_percent: self.host.cpu_percent(),
            killer_connected,
            intel_connected,
        }
    }

    pub fn error_rate(&self) -> f64 {
        let decisions = self.decisions.lock().unwrap();
        if decisions.total == 0 {
            0.0
        } else {
            decisions.errors as f64 / decisions.total as f64
        }
    }

    /// Classifies `sample` against configured thresholds and runs bounded
    /// auto-remediation if the overall status newly transitions to CRITICAL.
    pub fn evaluate(&self, sample: &SelfMonitorSample, error_rate: f64) -> HealthStatus {
        let statuses = [
            self.config.decision_latency_ms.classify(sample.decision_latency_ms),
            self.config.error_rate.classify(error_rate),
            self.config.queue_depth.classify(sample.queue_depth as f64),
            self.config.memory_percent.classify(sample.memory_percent),
            self.config.cpu_percent.classify(sample.cpu_percent),
            if sample.killer_connected && sample.intel_connected {
                HealthStatus::Healthy
            } else {
                HealthStatus::Critical
            },
        ];
        let worst = statuses
            .into_iter()
            .max_by_key(|s| match s {
                HealthStatus::Healthy => 0,
                HealthStatus::Degraded => 1,
                HealthStatus::Critical => 2,
            })
            .unwrap_or(HealthStatus::Healthy);

        let mut overall = self.overall.lock().unwrap();
        let transitioned_to_critical = worst == HealthStatus::Critical && *overall != HealthStatus::Critical;
        *overall = worst;
        drop(overall);

        if transitioned_to_critical {
            self.attempt_remediation(sample);
        }

        worst
    }

    fn attempt_remediation(&self, sample: &SelfMonitorSample) {
        let now = Utc::now();
        let mut remediations = self.remediations.lock().unwrap();
        let hour_ago = now - chrono::Duration::hours(1);
        while remediations.front().map(|t| *t < hour_ago).unwrap_or(false) {
            remediations.pop_front();
        }
        if remediations.len() >= self.config.max_auto_remediations_per_hour {
            return;
        }
        if sample.memory_percent >= self.config.memory_percent.critical_at {
            if self.host.trim_memory() {
                remediations.push_back(now);
            }
        }
    }
}
