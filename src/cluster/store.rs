//! The `ClusterStore` abstraction (§4.13): atomic primitives a coordinator needs for
//! leader election and event fan-out, implemented by an in-process fake, a Redis-like
//! backend, or (not shipped here) an etcd-like transactional backend.

use crate::models::{ClusterInfo, SyncEvent};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClusterStoreError {
    #[error("cluster store connection error: {0}")]
    Connection(String),
    #[error("cluster `{0}` is not registered")]
    NotFound(String),
}

pub trait ClusterStore: Send + Sync {
    fn register_cluster(&self, info: ClusterInfo) -> Result<(), ClusterStoreError>;
    fn deregister_cluster(&self, cluster_id: &str) -> Result<(), ClusterStoreError>;
    fn update_cluster(&self, info: ClusterInfo) -> Result<(), ClusterStoreError>;
    fn list_clusters(&self) -> Result<Vec<ClusterInfo>, ClusterStoreError>;
    fn get_cluster(&self, cluster_id: &str) -> Result<Option<ClusterInfo>, ClusterStoreError>;

    /// Atomic SET-if-not-exists-with-TTL (Redis SET NX EX) or the transactional
    /// equivalent (etcd compare-and-put on version=0). Returns whether the lock was
    /// acquired by this call.
    fn acquire_leader_lock(&self, cluster_id: &str, ttl: Duration) -> Result<bool, ClusterStoreError>;
    fn release_leader_lock(&self, cluster_id: &str) -> Result<(), ClusterStoreError>;
    fn refresh_leader_lock(&self, cluster_id: &str, ttl: Duration) -> Result<bool, ClusterStoreError>;
    fn get_leader(&self) -> Result<Option<String>, ClusterStoreError>;

    fn push_sync_event(&self, event: SyncEvent) -> Result<(), ClusterStoreError>;
    fn get_pending_events(&self, cluster_id: &str, limit: usize) -> Result<Vec<SyncEvent>, ClusterStoreError>;
    fn ack_event(&self, cluster_id: &str, event_id: &str) -> Result<(), ClusterStoreError>;
}
