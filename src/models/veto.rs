//! `VetoRequest`/`VetoResponse` exchanged in the pre-kill veto protocol (§3.1, §4.11).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VetoRequest {
    pub kill_id: String,
    pub target_module: String,
    pub target_instance_id: String,
    pub killer_confidence: f64,
    #[serde(default)]
    pub dependencies: Vec<String>,
    pub proposed_kill_reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VetoDecision {
    ApproveKill,
    Veto,
    Delay,
    Conditional,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VetoResponse {
    pub decision: VetoDecision,
    pub reasons: Vec<String>,
    pub conditions: HashMap<String, serde_json::Value>,
    pub delay_seconds: Option<u64>,
}
