//! The cluster coordinator (§4.13): leader election, sync-event fan-out, and peer
//! heartbeats, all delegating atomicity to a [`ClusterStore`] backend.

pub mod in_process_store;
#[cfg(feature = "redis-store")]
pub mod redis_store;
pub mod store;

pub use in_process_store::InProcessClusterStore;
#[cfg(feature = "redis-store")]
pub use redis_store::RedisClusterStore;
pub use store::{ClusterStore, ClusterStoreError};

use crate::event::cancellation::CancellationMessage;
use crate::event::channel::EventConsumer;
use crate::models::{ClusterInfo, ClusterRole, SyncEvent};
use crate::utils::thread_context::{NotStartedThreadContext, StartedThreadContext, ThreadContextStopperError};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use uuid::Uuid;

pub type EventHandler = Box<dyn Fn(&SyncEvent) + Send + Sync>;

/// Scope to dispatch to; handlers registered under `"ALL"` receive every event in
/// addition to their scope-specific handler (§4.13 event fan-out).
const ALL_SCOPE: &str = "ALL";

#[derive(Debug, Clone, Copy)]
pub struct ClusterCoordinatorConfig {
    pub election_interval: Duration,
    pub leader_ttl: Duration,
    pub sync_interval: Duration,
    pub heartbeat_interval: Duration,
    pub heartbeat_record_ttl: Duration,
    pub fan_out_limit: usize,
}

impl Default for ClusterCoordinatorConfig {
    fn default() -> Self {
        ClusterCoordinatorConfig {
            election_interval: Duration::from_secs(15),
            leader_ttl: Duration::from_secs(30),
            sync_interval: Duration::from_secs(5),
            heartbeat_interval: Duration::from_secs(10),
            heartbeat_record_ttl: Duration::from_secs(300),
            fan_out_limit: 100,
        }
    }
}

pub struct ClusterCoordinator<S: ClusterStore + 'static> {
    cluster_id: String,
    store: Arc<S>,
    config: ClusterCoordinatorConfig,
    role: RwLock<ClusterRole>,
    handlers: Mutex<HashMap<String, Vec<EventHandler>>>,
    threads: Mutex<Vec<StartedThreadContext>>,
    running: AtomicBool,
}

impl<S: ClusterStore + 'static> ClusterCoordinator<S> {
    pub fn new(cluster_id: impl Into<String>, store: S, config: ClusterCoordinatorConfig) -> Arc<Self> {
        Arc::new(ClusterCoordinator {
            cluster_id: cluster_id.into(),
            store: Arc::new(store),
            config,
            role: RwLock::new(ClusterRole::Candidate),
            handlers: Mutex::new(HashMap::new()),
            threads: Mutex::new(Vec::new()),
            running: AtomicBool::new(false),
        })
    }

    pub fn register_handler(&self, scope: impl Into<String>, handler: EventHandler) {
        self.handlers.lock().unwrap().entry(scope.into()).or_default().push(handler);
    }

    pub fn role(&self) -> ClusterRole {
        *self.role.read().unwrap()
    }

    pub fn get_clusters(&self) -> Result<Vec<ClusterInfo>, ClusterStoreError> {
        self.store.list_clusters()
    }

    pub fn get_leader(&self) -> Result<Option<String>, ClusterStoreError> {
        self.store.get_leader()
    }

    pub fn publish_event(&self, scope: &str, action: &str, data: serde_json::Value) -> Result<String, ClusterStoreError> {
        let event_id = Uuid::new_v4().to_string();
        self.store.push_sync_event(SyncEvent {
            event_id: event_id.clone(),
            scope: scope.to_string(),
            action: action.to_string(),
            data,
            published_by: self.cluster_id.clone(),
            published_at: chrono::Utc::now(),
        })?;
        Ok(event_id)
    }

    fn heartbeat_tick(&self) {
        let info = ClusterInfo {
            cluster_id: self.cluster_id.clone(),
            role: self.role(),
            last_heartbeat: chrono::Utc::now(),
            address: None,
            metadata: HashMap::new(),
        };
        let _ = self.store.update_cluster(info);
    }

    fn election_tick(&self) {
        match self.store.get_leader() {
            Ok(Some(leader)) if leader == self.cluster_id => {
                let _ = self.store.refresh_leader_lock(&self.cluster_id, self.config.leader_ttl);
                *self.role.write().unwrap() = ClusterRole::Leader;
            }
            Ok(Some(_)) => {
                *self.role.write().unwrap() = ClusterRole::Follower;
            }
            Ok(None) => match self.store.acquire_leader_lock(&self.cluster_id, self.config.leader_ttl) {
                Ok(true) => *self.role.write().unwrap() = ClusterRole::Leader,
                Ok(false) => *self.role.write().unwrap() = ClusterRole::Follower,
                Err(_) => {}
            },
            Err(_) => {}
        }
    }

    fn sync_tick(&self) {
        let pending = match self.store.get_pending_events(&self.cluster_id, self.config.fan_out_limit) {
            Ok(events) => events,
            Err(_) => return,
        };
        let handlers = self.handlers.lock().unwrap();
        for event in &pending {
            if let Some(scoped) = handlers.get(&event.scope) {
                for handler in scoped {
                    handler(event);
                }
            }
            if let Some(all) = handlers.get(ALL_SCOPE) {
                for handler in all {
                    handler(event);
                }
            }
            let _ = self.store.ack_event(&self.cluster_id, &event.event_id);
        }
    }

    pub fn start(self: &Arc<Self>) {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }
        let mut threads = self.threads.lock().unwrap();

        let heartbeat_self = self.clone();
        threads.push(
            NotStartedThreadContext::new(format!("cluster-heartbeat-{}", self.cluster_id), move |stop| {
                run_until_stopped(&stop, heartbeat_self.config.heartbeat_interval, || heartbeat_self.heartbeat_tick())
            })
            .start(),
        );

        let election_self = self.clone();
        threads.push(
            NotStartedThreadContext::new(format!("cluster-election-{}", self.cluster_id), move |stop| {
                run_until_stopped(&stop, election_self.config.election_interval, || election_self.election_tick())
            })
            .start(),
        );

        let sync_self = self.clone();
        threads.push(
            NotStartedThreadContext::new(format!("cluster-sync-{}", self.cluster_id), move |stop| {
                run_until_stopped(&stop, sync_self.config.sync_interval, || sync_self.sync_tick())
            })
            .start(),
        );
    }

    pub fn stop(&self) -> Result<(), ThreadContextStopperError> {
        if !self.running.swap(false, Ordering::SeqCst) {
            return Ok(());
        }
        let threads = std::mem::take(&mut *self.threads.lock().unwrap());
        for ctx in threads {
            ctx.stop()?;
        }
        if self.role() == ClusterRole::Leader {
            let _ = self.store.release_leader_lock(&self.cluster_id);
        }
        Ok(())
    }
}

fn run_until_stopped(stop: &EventConsumer<CancellationMessage>, interval: Duration, mut tick: impl FnMut()) {
    loop {
        if stop.recv_timeout(interval).is_some() {
            break;
        }
        tick();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn election_tick_wins_lock_when_unheld() {
        let store = InProcessClusterStore::new("node-a");
        let coordinator = ClusterCoordinator::new("node-a", store, ClusterCoordinatorConfig::default());
        coordinator.election_tick();
        assert_eq!(coordinator.role(), ClusterRole::Leader);
        assert_eq!(coordinator.get_leader().unwrap(), Some("node-a".to_string()));
    }

    #[test]
    fn sync_tick_dispatches_to_scoped_and_all_handlers() {
        let store = InProcessClusterStore::new("node-a");
        store
            .push_sync_event(SyncEvent {
                event_id: "e1".into(),
                scope: "decisions".into(),
                action: "created".into(),
                data: serde_json::json!({}),
                published_by: "node-b".into(),
                published_at: chrono::Utc::now(),
            })
            .unwrap();
        let coordinator = ClusterCoordinator::new("node-a", store, ClusterCoordinatorConfig::default());

        let scoped_hits = Arc::new(AtomicUsize::new(0));
        let all_hits = Arc::new(AtomicUsize::new(0));
        let scoped_clone = scoped_hits.clone();
        let all_clone = all_hits.clone();
        coordinator.register_handler("decisions", Box::new(move |_e| { scoped_clone.fetch_add(1, Ordering::SeqCst); }));
        coordinator.register_handler(ALL_SCOPE, Box::new(move |_e| { all_clone.fetch_add(1, Ordering::SeqCst); }));

        coordinator.sync_tick();
        assert_eq!(scoped_hits.load(Ordering::SeqCst), 1);
        assert_eq!(all_hits.load(Ordering::SeqCst), 1);

        coordinator.sync_tick();
        assert_eq!(scoped_hits.load(Ordering::SeqCst), 1, "acked events must not redeliver");
    }

    #[test]
    fn publish_event_is_excluded_from_own_pending() {
        let store = InProcessClusterStore::new("node-a");
        let coordinator = ClusterCoordinator::new("node-a", store, ClusterCoordinatorConfig::default());
        coordinator.publish_event("decisions", "created", serde_json::json!({})).unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let hits_clone = hits.clone();
        coordinator.register_handler(ALL_SCOPE, Box::new(move |_e| { hits_clone.fetch_add(1, Ordering::SeqCst); }));
        coordinator.sync_tick();
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }
}
