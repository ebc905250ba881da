//! `KillReport`: the inbound notification that a module instance was terminated (§3).

use super::wire::{
    validate_dependencies, validate_evidence, validate_metadata, validate_name,
    validate_unit_score, ValidationError,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum KillReason {
    ThreatDetected,
    AnomalyBehavior,
    PolicyViolation,
    ResourceExhaustion,
    DependencyCascade,
    ManualOverride,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Info,
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Raw severity score used by the risk assessor (§4.3).
    pub fn raw_score(self) -> f64 {
        match self {
            Severity::Info => 0.1,
            Severity::Low => 0.3,
            Severity::Medium => 0.5,
            Severity::High => 0.8,
            Severity::Critical => 1.0,
        }
    }
}

/// An inbound kill notification. Immutable once constructed; `kill_id` is invariant for
/// its lifetime, which ends at acknowledgement (§3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KillReport {
    pub kill_id: String,
    pub timestamp: DateTime<Utc>,
    pub target_module: String,
    pub target_instance_id: String,
    pub kill_reason: KillReason,
    pub severity: Severity,
    pub confidence_score: f64,
    #[serde(default)]
    pub evidence: Vec<String>,
    #[serde(default)]
    pub dependencies: Vec<String>,
    pub source_agent: String,
    #[serde(default = "default_metadata")]
    pub metadata: serde_json::Value,
}

fn default_metadata() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

impl KillReport {
    /// Validates every field per §6. Called once at ingestion; a `KillReport` that
    /// exists downstream of the ingester is assumed valid.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_name(&self.target_module)?;
        validate_name(&self.target_instance_id)?;
        validate_unit_score(self.confidence_score)?;
        validate_evidence(&self.evidence)?;
        validate_dependencies(&self.dependencies)?;
        validate_metadata(&self.metadata)?;
        Ok(())
    }

    pub fn metadata_map(&self) -> HashMap<String, serde_json::Value> {
        self.metadata
            .as_object()
            .map(|m| m.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default()
    }
}
