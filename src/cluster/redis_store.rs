//! Redis-backed [`ClusterStore`] (§6 key layout), gated behind the `redis-store` feature.
//! Leader election rides on `SET NX EX`, the same primitive the glossary calls out as the
//! Redis equivalent of an etcd transactional compare-and-put.

use super::store::{ClusterStore, ClusterStoreError};
use crate::models::{ClusterInfo, SyncEvent};
use redis::{Client, Commands, RedisError};
use std::time::Duration;

const NODES_PREFIX: &str = "medic/cluster/nodes/";
const LEADER_KEY: &str = "medic/cluster/leader";
const ACKED_PREFIX: &str = "medic/cluster/acked/";
const EVENTS_KEY: &str = "medic/cluster/events";

impl From<RedisError> for ClusterStoreError {
    fn from(err: RedisError) -> Self {
        ClusterStoreError::Connection(err.to_string())
    }
}

pub struct RedisClusterStore {
    client: Client,
    self_id: String,
}

impl RedisClusterStore {
    pub fn new(redis_url: &str, self_id: impl Into<String>) -> Result<Self, ClusterStoreError> {
        let client = Client::open(redis_url).map_err(|e| ClusterStoreError::Connection(e.to_string()))?;
        Ok(RedisClusterStore {
            client,
            self_id: self_id.into(),
        })
    }

    fn node_key(cluster_id: &str) -> String {
        format!("{NODES_PREFIX}{cluster_id}")
    }

    fn acked_key(cluster_id: &str) -> String {
        format!("{ACKED_PREFIX}{cluster_id}")
    }
}

impl ClusterStore for RedisClusterStore {
    fn register_cluster(&self, info: ClusterInfo) -> Result<(), ClusterStoreError> {
        let mut conn = self.client.get_connection()?;
        let payload = serde_json::to_string(&info)
            .map_err(|e| ClusterStoreError::Connection(format!("serialize cluster info: {e}")))?;
        conn.set(Self::node_key(&info.cluster_id), payload)?;
        Ok(())
    }

    fn deregister_cluster(&self, cluster_id: &str) -> Result<(), ClusterStoreError> {
        let mut conn = self.client.get_connection()?;
        conn.del(Self::node_key(cluster_id))?;
        Ok(())
    }

    fn update_cluster(&self, info: ClusterInfo) -> Result<(), ClusterStoreError> {
        self.register_cluster(info)
    }

    fn list_clusters(&self) -> Result<Vec<ClusterInfo>, ClusterStoreError> {
        let mut conn = self.client.get_connection()?;
        let keys: Vec<String> = conn.keys(format!("{NODES_PREFIX}*"))?;
        let mut clusters = Vec::with_capacity(keys.len());
        for key in keys {
            let raw: Option<String> = conn.get(&key)?;
            if let Some(raw) = raw {
                if let Ok(info) = serde_json::from_str::<ClusterInfo>(&raw) {
                    clusters.push(info);
                }
            }
        }
        Ok(clusters)
    }

    fn get_cluster(&self, cluster_id: &str) -> Result<Option<ClusterInfo>, ClusterStoreError> {
        let mut conn = self.client.get_connection()?;
        let raw: Option<String> = conn.get(Self::node_key(cluster_id))?;
        Ok(raw.and_then(|r| serde_json::from_str(&r).ok()))
    }

    fn acquire_leader_lock(&self, _cluster_id: &str, ttl: Duration) -> Result<bool, ClusterStoreError> {
        let mut conn = self.client.get_connection()?;
        let result: redis::RedisResult<Option<String>> = redis::cmd("SET")
            .arg(LEADER_KEY)
            .arg(&self.self_id)
            .arg("NX")
            .arg("EX")
            .arg(ttl.as_secs().max(1))
            .query(&mut conn);
        Ok(matches!(result, Ok(Some(_))))
    }

    fn release_leader_lock(&self, _cluster_id: &str) -> Result<(), ClusterStoreError> {
        let mut conn = self.client.get_connection()?;
        let held_by: Option<String> = conn.get(LEADER_KEY)?;
        if held_by.as_deref() == Some(self.self_id.as_str()) {
            conn.del(LEADER_KEY)?;
        }
        Ok(())
    }

    fn refresh_leader_lock(&self, _cluster_id: &str, ttl: Duration) -> Result<bool, ClusterStoreError> {
        let mut conn = self.client.get_connection()?;
        let held_by: Option<String> = conn.get(LEADER_KEY)?;
        if held_by.as_deref() == Some(self.self_id.as_str()) {
            conn.expire(LEADER_KEY, ttl.as_secs().max(1) as i64)?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn get_leader(&self) -> Result<Option<String>, ClusterStoreError> {
        let mut conn = self.client.get_connection()?;
        Ok(conn.get(LEADER_KEY)?)
    }

    fn push_sync_event(&self, event: SyncEvent) -> Result<(), ClusterStoreError> {
        let mut conn = self.client.get_connection()?;
        let payload = serde_json::to_string(&event)
            .map_err(|e| ClusterStoreError::Connection(format!("serialize sync event: {e}")))?;
        conn.rpush(EVENTS_KEY, payload)?;
        Ok(())
    }

    fn get_pending_events(&self, cluster_id: &str, limit: usize) -> Result<Vec<SyncEvent>, ClusterStoreError> {
        let mut conn = self.client.get_connection()?;
        let raw_events: Vec<String> = conn.lrange(EVENTS_KEY, 0, -1)?;
        let acked: std::collections::HashSet<String> =
            conn.smembers(Self::acked_key(cluster_id))?;
        let mut pending = Vec::new();
        for raw in raw_events {
            if let Ok(event) = serde_json::from_str::<SyncEvent>(&raw) {
                if event.published_by != self.self_id && !acked.contains(&event.event_id) {
                    pending.push(event);
                    if pending.len() >= limit {
                        break;
                    }
                }
            }
        }
        Ok(pending)
    }

    fn ack_event(&self, cluster_id: &str, event_id: &str) -> Result<(), ClusterStoreError> {
        let mut conn = self.client.get_connection()?;
        conn.sadd(Self::acked_key(cluster_id), event_id)?;
        Ok(())
    }
}
