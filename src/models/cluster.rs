//! Cluster coordination data model: roles, cluster records, and sync events (§3.1, §4.13).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClusterRole {
    Leader,
    Follower,
    Candidate,
    Observer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClusterReachability {
    Reachable,
    Unreachable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterInfo {
    pub cluster_id: String,
    pub role: ClusterRole,
    pub last_heartbeat: DateTime<Utc>,
    pub address: Option<String>,
    #[serde(default)]
    pub metadata: std::collections::HashMap<String, String>,
}

impl ClusterInfo {
    pub fn reachability(&self, now: DateTime<Utc>, heartbeat_interval_secs: u64) -> ClusterReachability {
        let dead_window = chrono::Duration::seconds(3 * heartbeat_interval_secs as i64);
        if now - self.last_heartbeat > dead_window {
            ClusterReachability::Unreachable
        } else {
            ClusterReachability::Reachable
        }
    }
}

/// A typed payload replicated across federated agents within a scope (decisions, outcomes,
/// thresholds, config) — the glossary's "sync event".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncEvent {
    pub event_id: String,
    pub scope: String,
    pub action: String,
    pub data: serde_json::Value,
    pub published_by: String,
    pub published_at: DateTime<Utc>,
}
