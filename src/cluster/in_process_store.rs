//! In-process [`ClusterStore`] used for tests and single-node runs. Bounds the acked-set
//! per cluster explicitly (§9.1) rather than growing it forever, unlike a naive port of
//! the original's in-process store.

use super::store::{ClusterStore, ClusterStoreError};
use crate::models::{ClusterInfo, SyncEvent};
use chrono::Utc;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

pub const DEFAULT_MAX_ACKED_EVENTS: usize = 10_000;

struct LeaderLock {
    holder: String,
    expires_at: chrono::DateTime<Utc>,
}

#[derive(Default)]
struct AckedSet {
    order: VecDeque<String>,
    set: HashSet<String>,
}

impl AckedSet {
    fn insert(&mut self, event_id: String, max: usize) {
        if self.set.contains(&event_id) {
            return;
        }
        if self.order.len() >= max {
            if let Some(oldest) = self.order.pop_front() {
                self.set.remove(&oldest);
            }
        }
        self.order.push_back(event_id.clone());
        self.set.insert(event_id);
    }

    fn contains(&self, event_id: &str) -> bool {
        self.set.contains(event_id)
    }
}

#[derive(Default)]
pub struct InProcessClusterStore {
    self_id: String,
    max_acked_events: usize,
    clusters: Mutex<HashMap<String, ClusterInfo>>,
    leader_lock: Mutex<Option<LeaderLock>>,
    events: Mutex<Vec<SyncEvent>>,
    acked: Mutex<HashMap<String, AckedSet>>,
}

impl InProcessClusterStore {
    pub fn new(self_id: impl Into<String>) -> Self {
        Self::with_max_acked_events(self_id, DEFAULT_MAX_ACKED_EVENTS)
    }

    pub fn with_max_acked_events(self_id: impl Into<String>, max_acked_events: usize) -> Self {
        InProcessClusterStore {
            self_id: self_id.into(),
            max_acked_events,
            clusters: Mutex::new(HashMap::new()),
            leader_lock: Mutex::new(None),
            events: Mutex::new(Vec::new()),
            acked: Mutex::new(HashMap::new()),
        }
    }
}

impl ClusterStore for InProcessClusterStore {
    fn register_cluster(&self, info: ClusterInfo) -> Result<(), ClusterStoreError> {
        self.clusters.lock().unwrap().insert(info.cluster_id.clone(), info);
        Ok(())
    }

    fn deregister_cluster(&self, cluster_id: &str) -> Result<(), ClusterStoreError> {
        self.clusters.lock().unwrap().remove(cluster_id);
        Ok(())
    }

    fn update_cluster(&self, info: ClusterInfo) -> Result<(), ClusterStoreError> {
        self.clusters.lock().unwrap().insert(info.cluster_id.clone(), info);
        Ok(())
    }

    fn list_clusters(&self) -> Result<Vec<ClusterInfo>, ClusterStoreError> {
        Ok(self.clusters.lock().unwrap().values().cloned().collect())
    }

    fn get_cluster(&self, cluster_id: &str) -> Result<Option<ClusterInfo>, ClusterStoreError> {
        Ok(self.clusters.lock().unwrap().get(cluster_id).cloned())
    }

    fn acquire_leader_lock(&self, cluster_id: &str, ttl: Duration) -> Result<bool, ClusterStoreError> {
        let mut lock = self.leader_lock.lock().unwrap();
        let now = Utc::now();
        let expired = lock.as_ref().map(|l| l.expires_at <= now).unwrap_or(true);
        if expired {
            *lock = Some(LeaderLock {
                holder: self.self_id.clone(),
                expires_at: now + chrono::Duration::from_std(ttl).unwrap(),
            });
            let _ = cluster_id;
            return Ok(true);
        }
        Ok(lock.as_ref().map(|l| l.holder == self.self_id).unwrap_or(false))
    }

    fn release_leader_lock(&self, _cluster_id: &str) -> Result<(), ClusterStoreError> {
        let mut lock = self.leader_lock.lock().unwrap();
        if lock.as_ref().map(|l| l.holder == self.self_id).unwrap_or(false) {
            *lock = None;
        }
        Ok(())
    }

    fn refresh_leader_lock(&self, _cluster_id: &str, ttl: Duration) -> Result<bool, ClusterStoreError> {
        let mut lock = self.leader_lock.lock().unwrap();
        match lock.as_mut() {
            Some(l) if l.holder == self.self_id => {
                l.expires_at = Utc::now() + chrono::Duration::from_std(ttl).unwrap();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn get_leader(&self) -> Result<Option<String>, ClusterStoreError> {
        let lock = self.leader_lock.lock().unwrap();
        Ok(lock
            .as_ref()
            .filter(|l| l.expires_at > Utc::now())
            .map(|l| l.holder.clone()))
    }

    fn push_sync_event(&self, event: SyncEvent) -> Result<(), ClusterStoreError> {
        self.events.lock().unwrap().push(event);
        Ok(())
    }

    fn get_pending_events(&self, cluster_id: &str, limit: usize) -> Result<Vec<SyncEvent>, ClusterStoreError> {
        let events = self.events.lock().unwrap();
        let acked = self.acked.lock().unwrap();
        let acked_for_cluster = acked.get(cluster_id);
        let pending: Vec<SyncEvent> = events
            .iter()
            .filter(|e| e.published_by != self.self_id)
            .filter(|e| acked_for_cluster.map(|a| !a.contains(&e.event_id)).unwrap_or(true))
            .take(limit)
            .cloned()
            .collect();
        Ok(pending)
    }

    fn ack_event(&self, cluster_id: &str, event_id: &str) -> Result<(), ClusterStoreError> {
        let mut acked = self.acked.lock().unwrap();
        acked
            .entry(cluster_id.to_string())
            .or_default()
            .insert(event_id.to_string(), self.max_acked_events);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_one_node_acquires_the_lock() {
        let store_a = InProcessClusterStore::new("node-a");
        assert!(store_a.acquire_leader_lock("c1", Duration::from_secs(30)).unwrap());
        assert!(store_a.acquire_leader_lock("c1", Duration::from_secs(30)).unwrap());
        assert_eq!(store_a.get_leader().unwrap(), Some("node-a".to_string()));
    }

    #[test]
    fn acked_set_is_bounded() {
        let store = InProcessClusterStore::with_max_acked_events("node-a", 2);
        store.ack_event("c1", "e1").unwrap();
        store.ack_event("c1", "e2").unwrap();
        store.ack_event("c1", "e3").unwrap();
        let acked = store.acked.lock().unwrap();
        let set = acked.get("c1").unwrap();
        assert_eq!(set.order.len(), 2);
        assert!(!set.contains("e1"));
        assert!(set.contains("e3"));
    }

    #[test]
    fn pending_events_exclude_self_published_and_acked() {
        let store = InProcessClusterStore::new("node-a");
        store
            .push_sync_event(SyncEvent {
                event_id: "e1".into(),
                scope: "decisions".into(),
                action: "created".into(),
                data: serde_json::json!({}),
                published_by: "node-a".into(),
                published_at: Utc::now(),
            })
            .unwrap();
        store
            .push_sync_event(SyncEvent {
                event_id: "e2".into(),
                scope: "decisions".into(),
                action: "created".into(),
                data: serde_json::json!({}),
                published_by: "node-b".into(),
                published_at: Utc::now(),
            })
            .unwrap();
        let pending = store.get_pending_events("c1", 10).unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].event_id, "e2");

        store.ack_event("c1", "e2").unwrap();
        assert!(store.get_pending_events("c1", 10).unwrap().is_empty());
    }
}
