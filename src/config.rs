//! Top-level configuration (§2.1, §9): one `serde`-deserializable struct per component,
//! each with named defaults, loaded from a single YAML file and failing fast on unknown
//! fields rather than silently ignoring a typo'd key.

use crate::admission::AdmissionConfig;
use crate::decision::DecisionPolicy;
use crate::edge_case::EdgeCaseConfig;
use crate::executor::ExecutorRetryPolicy;
use crate::ingester::IngesterConfig;
use crate::intel::RetryPolicy as IntelRetryPolicy;
use crate::monitor::MonitorConfig;
use crate::queue::QueueConfig;
use crate::risk::RiskThresholds;
use crate::veto::VetoConfig;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file `{path}`: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file `{path}`: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// The process-wide config, deserialized once at startup. Every nested section has a
/// `Default`, so a caller can omit any section entirely and get the documented defaults.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    #[serde(default)]
    pub log: LogConfig,
    #[serde(default)]
    pub kill_stream: KillStreamConfig,
    #[serde(default)]
    pub intel: IntelConfig,
    #[serde(default)]
    pub risk: RiskConfig,
    #[serde(default)]
    pub decision: DecisionConfig,
    #[serde(default)]
    pub admission: AdmissionSectionConfig,
    #[serde(default)]
    pub queue: QueueSectionConfig,
    #[serde(default)]
    pub executor: ExecutorConfig,
    #[serde(default)]
    pub monitor: MonitorSectionConfig,
    #[serde(default)]
    pub edge_case: EdgeCaseSectionConfig,
    #[serde(default)]
    pub veto: VetoSectionConfig,
    #[serde(default)]
    pub cluster: ClusterConfig,
    /// Operator identity is process-level configuration per §6, never a per-command
    /// CLI argument.
    #[serde(default = "default_operator_id")]
    pub operator_id: String,
    /// Best-effort queue persistence path (§6); omit to keep the queue in-memory only.
    #[serde(default)]
    pub queue_state_path: Option<String>,
}

fn default_operator_id() -> String {
    std::env::var("USER").unwrap_or_else(|_| "operator".to_string())
}

impl AgentConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config: AgentConfig = serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let weight_sum: f64 = self.risk.weights.values().sum();
        if self.risk.weights.is_empty() {
            return Ok(());
        }
        if (weight_sum - 1.0).abs() > 0.01 {
            return Err(ConfigError::Invalid(format!(
                "risk.weights must sum to 1.0, got {weight_sum}"
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct LogConfig {
    #[serde(default)]
    pub format: LogFormat,
    /// Passed straight to `tracing_subscriber::EnvFilter`; `RUST_LOG` still overrides it.
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct KillStreamConfig {
    #[serde(default = "default_group")]
    pub group: String,
    #[serde(default)]
    pub consumer: Option<String>,
    #[serde(default = "default_poll_timeout_secs")]
    pub poll_timeout_secs: u64,
    #[serde(default = "default_backoff_base_secs")]
    pub backoff_base_secs: u64,
    #[serde(default = "default_backoff_cap_secs")]
    pub backoff_cap_secs: u64,
}

fn default_group() -> String {
    "resilience-agents".to_string()
}
fn default_poll_timeout_secs() -> u64 {
    1
}
fn default_backoff_base_secs() -> u64 {
    1
}
fn default_backoff_cap_secs() -> u64 {
    30
}

impl Default for KillStreamConfig {
    fn default() -> Self {
        KillStreamConfig {
            group: default_group(),
            consumer: None,
            poll_timeout_secs: default_poll_timeout_secs(),
            backoff_base_secs: default_backoff_base_secs(),
            backoff_cap_secs: default_backoff_cap_secs(),
        }
    }
}

impl From<&KillStreamConfig> for IngesterConfig {
    fn from(c: &KillStreamConfig) -> Self {
        IngesterConfig {
            group: c.group.clone(),
            consumer: c
                .consumer
                .clone()
                .unwrap_or_else(|| format!("agent-{}", std::process::id())),
            poll_timeout: std::time::Duration::from_secs(c.poll_timeout_secs),
            backoff_base: std::time::Duration::from_secs(c.backoff_base_secs),
            backoff_cap: std::time::Duration::from_secs(c.backoff_cap_secs),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct IntelConfig {
    /// Base URL of the intel backend (§6); left unset to use the in-process fake.
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_intel_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_intel_retry_base_secs")]
    pub retry_base_secs: u64,
    #[serde(default = "default_intel_retry_cap_secs")]
    pub retry_cap_secs: u64,
}

fn default_intel_max_retries() -> u32 {
    3
}
fn default_intel_retry_base_secs() -> u64 {
    2
}
fn default_intel_retry_cap_secs() -> u64 {
    30
}

impl Default for IntelConfig {
    fn default() -> Self {
        IntelConfig {
            base_url: None,
            api_key: None,
            max_retries: default_intel_max_retries(),
            retry_base_secs: default_intel_retry_base_secs(),
            retry_cap_secs: default_intel_retry_cap_secs(),
        }
    }
}

impl From<&IntelConfig> for IntelRetryPolicy {
    fn from(c: &IntelConfig) -> Self {
        IntelRetryPolicy {
            max_retries: c.max_retries,
            base: std::time::Duration::from_secs(c.retry_base_secs),
            cap: std::time::Duration::from_secs(c.retry_cap_secs),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct RiskConfig {
    #[serde(default)]
    pub weights: HashMap<String, f64>,
    #[serde(default)]
    pub critical_modules: Vec<String>,
    #[serde(default = "default_auto_approve_confidence_floor")]
    pub auto_approve_confidence_floor: f64,
}

fn default_auto_approve_confidence_floor() -> f64 {
    0.8
}

impl From<&RiskConfig> for RiskThresholds {
    fn from(c: &RiskConfig) -> Self {
        if c.weights.is_empty() {
            let mut defaults = RiskThresholds::default();
            defaults.critical_modules = c.critical_modules.clone();
            defaults.auto_approve_confidence_floor = c.auto_approve_confidence_floor;
            return defaults;
        }
        RiskThresholds {
            weights: c.weights.clone(),
            critical_modules: c.critical_modules.clone(),
            auto_approve_confidence_floor: c.auto_approve_confidence_floor,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct DecisionConfig {
    #[serde(default)]
    pub always_deny: Vec<String>,
    #[serde(default)]
    pub always_require_approval: Vec<String>,
    #[serde(default = "default_auto_approve_min_confidence")]
    pub auto_approve_min_confidence: f64,
    #[serde(default = "default_timeout_minutes")]
    pub default_timeout_minutes: u32,
}

fn default_auto_approve_min_confidence() -> f64 {
    0.85
}
fn default_timeout_minutes() -> u32 {
    30
}

impl Default for DecisionConfig {
    fn default() -> Self {
        DecisionConfig {
            always_deny: Vec::new(),
            always_require_approval: Vec::new(),
            auto_approve_min_confidence: default_auto_approve_min_confidence(),
            default_timeout_minutes: default_timeout_minutes(),
        }
    }
}

impl From<&DecisionConfig> for DecisionPolicy {
    fn from(c: &DecisionConfig) -> Self {
        DecisionPolicy {
            always_deny: c.always_deny.clone(),
            always_require_approval: c.always_require_approval.clone(),
            auto_approve_min_confidence: c.auto_approve_min_confidence,
            default_timeout_minutes: c.default_timeout_minutes,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct AdmissionSectionConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub blacklist: Vec<String>,
    #[serde(default = "default_max_risk_score")]
    pub max_risk_score: f64,
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f64,
    #[serde(default = "default_max_per_hour")]
    pub max_per_hour: usize,
    #[serde(default = "default_max_per_module_per_hour")]
    pub max_per_module_per_hour: usize,
    #[serde(default = "default_cooldown_seconds")]
    pub cooldown_seconds: i64,
    #[serde(default = "default_monitoring_duration_minutes")]
    pub monitoring_duration_minutes: u32,
}

fn default_true() -> bool {
    true
}
fn default_max_risk_score() -> f64 {
    0.3
}
fn default_min_confidence() -> f64 {
    0.85
}
fn default_max_per_hour() -> usize {
    10
}
fn default_max_per_module_per_hour() -> usize {
    3
}
fn default_cooldown_seconds() -> i64 {
    300
}
fn default_monitoring_duration_minutes() -> u32 {
    30
}

impl Default for AdmissionSectionConfig {
    fn default() -> Self {
        AdmissionSectionConfig {
            enabled: default_true(),
            blacklist: Vec::new(),
            max_risk_score: default_max_risk_score(),
            min_confidence: default_min_confidence(),
            max_per_hour: default_max_per_hour(),
            max_per_module_per_hour: default_max_per_module_per_hour(),
            cooldown_seconds: default_cooldown_seconds(),
            monitoring_duration_minutes: default_monitoring_duration_minutes(),
        }
    }
}

impl From<&AdmissionSectionConfig> for AdmissionConfig {
    fn from(c: &AdmissionSectionConfig) -> Self {
        AdmissionConfig {
            enabled: c.enabled,
            blacklist: c.blacklist.clone(),
            max_risk_score: c.max_risk_score,
            min_confidence: c.min_confidence,
            max_per_hour: c.max_per_hour,
            max_per_module_per_hour: c.max_per_module_per_hour,
            cooldown_seconds: c.cooldown_seconds,
            monitoring_duration_minutes: c.monitoring_duration_minutes,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct QueueSectionConfig {
    #[serde(default = "default_max_pending")]
    pub max_pending: usize,
    #[serde(default = "default_expiry_minutes")]
    pub expiry_minutes: i64,
}

fn default_max_pending() -> usize {
    100
}
fn default_expiry_minutes() -> i64 {
    60
}

impl Default for QueueSectionConfig {
    fn default() -> Self {
        QueueSectionConfig {
            max_pending: default_max_pending(),
            expiry_minutes: default_expiry_minutes(),
        }
    }
}

impl From<&QueueSectionConfig> for QueueConfig {
    fn from(c: &QueueSectionConfig) -> Self {
        QueueConfig {
            max_pending: c.max_pending,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct ExecutorConfig {
    #[serde(default = "default_executor_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_executor_base_secs")]
    pub base_secs: u64,
    #[serde(default = "default_executor_cap_secs")]
    pub cap_secs: u64,
}

fn default_executor_max_retries() -> u32 {
    3
}
fn default_executor_base_secs() -> u64 {
    1
}
fn default_executor_cap_secs() -> u64 {
    20
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        ExecutorConfig {
            max_retries: default_executor_max_retries(),
            base_secs: default_executor_base_secs(),
            cap_secs: default_executor_cap_secs(),
        }
    }
}

impl From<&ExecutorConfig> for ExecutorRetryPolicy {
    fn from(c: &ExecutorConfig) -> Self {
        ExecutorRetryPolicy {
            max_retries: c.max_retries,
            base: std::time::Duration::from_secs(c.base_secs),
            cap: std::time::Duration::from_secs(c.cap_secs),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct MonitorSectionConfig {
    #[serde(default = "default_check_interval_secs")]
    pub check_interval_secs: u64,
    #[serde(default = "default_max_consecutive_failures")]
    pub max_consecutive_failures: u32,
}

fn default_check_interval_secs() -> u64 {
    30
}
fn default_max_consecutive_failures() -> u32 {
    3
}

impl Default for MonitorSectionConfig {
    fn default() -> Self {
        MonitorSectionConfig {
            check_interval_secs: default_check_interval_secs(),
            max_consecutive_failures: default_max_consecutive_failures(),
        }
    }
}

impl From<&MonitorSectionConfig> for MonitorConfig {
    fn from(c: &MonitorSectionConfig) -> Self {
        MonitorConfig {
            health_check_interval: std::time::Duration::from_secs(c.check_interval_secs),
            max_consecutive_failures: c.max_consecutive_failures,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct EdgeCaseSectionConfig {
    #[serde(default = "default_true")]
    pub auto_pause_on_critical: bool,
}

impl From<&EdgeCaseSectionConfig> for EdgeCaseConfig {
    fn from(c: &EdgeCaseSectionConfig) -> Self {
        EdgeCaseConfig {
            auto_pause_on_critical: c.auto_pause_on_critical,
            ..EdgeCaseConfig::default()
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct VetoSectionConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl From<&VetoSectionConfig> for VetoConfig {
    fn from(c: &VetoSectionConfig) -> Self {
        VetoConfig {
            enabled: c.enabled,
            ..VetoConfig::default()
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct ClusterConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_cluster_id")]
    pub cluster_id: String,
    #[serde(default)]
    pub redis_url: Option<String>,
}

fn default_cluster_id() -> String {
    format!("node-{}", std::process::id())
}

impl Default for ClusterConfig {
    fn default() -> Self {
        ClusterConfig {
            enabled: false,
            cluster_id: default_cluster_id(),
            redis_url: None,
        }
    }
}
