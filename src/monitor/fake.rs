//! In-process [`HealthProbe`]/[`MetricsProbe`] fakes for tests.

use super::{HealthProbe, MetricsProbe};
use crate::models::{MetricsSample, ProbeResult};

enum HealthBehavior {
    AlwaysHealthy,
    AlwaysUnhealthy,
}

pub struct InProcessHealthProbe(HealthBehavior);

impl InProcessHealthProbe {
    pub fn healthy() -> Self {
        InProcessHealthProbe(HealthBehavior::AlwaysHealthy)
    }

    pub fn unhealthy() -> Self {
        InProcessHealthProbe(HealthBehavior::AlwaysUnhealthy)
    }
}

impl HealthProbe for InProcessHealthProbe {
    fn probe(&self, _module: &str, _instance_id: &str) -> ProbeResult {
        match self.0 {
            HealthBehavior::AlwaysHealthy => ProbeResult {
                healthy: true,
                degraded: None,
                error: None,
                latency_ms: Some(5),
            },
            HealthBehavior::AlwaysUnhealthy => ProbeResult {
                healthy: false,
                degraded: Some(false),
                error: Some("probe failed".to_string()),
                latency_ms: None,
            },
        }
    }
}

enum MetricsBehavior {
    Steady,
    CpuSpike,
}

pub struct InProcessMetricsProbe(MetricsBehavior);

impl InProcessMetricsProbe {
    pub fn steady() -> Self {
        InProcessMetricsProbe(MetricsBehavior::Steady)
    }

    pub fn cpu_spike() -> Self {
        InProcessMetricsProbe(MetricsBehavior::CpuSpike)
    }
}

impl MetricsProbe for InProcessMetricsProbe {
    fn sample(&self, _module: &str, _instance_id: &str) -> MetricsSample {
        match self.0 {
            MetricsBehavior::Steady => MetricsSample {
                cpu_percent: 20.0,
                memory_percent: 30.0,
                error_rate: 0.01,
                recorded_at_offset_ms: 0,
            },
            MetricsBehavior::CpuSpike => MetricsSample {
                cpu_percent: 97.0,
                memory_percent: 30.0,
                error_rate: 0.01,
                recorded_at_offset_ms: 0,
            },
        }
    }
}
