//! The `Stream` capability (§4.1, §9): consumer-group semantics over an opaque
//! transport. [`InProcessStream`] is the in-memory fake used by tests; a real backend
//! (Kafka/Redis Streams/etc.) is out of scope and would implement the same trait.

use super::error::IngesterError;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct RawEntry {
    pub wire_id: String,
    pub fields: HashMap<String, String>,
}

pub trait KillStream: Send {
    fn connect(&mut self) -> Result<(), IngesterError>;
    /// Blocks up to `timeout` for the next undelivered entry for this group; `Ok(None)`
    /// means the read timed out with nothing available, not an error.
    fn poll(&mut self, timeout: Duration) -> Result<Option<RawEntry>, IngesterError>;
    fn acknowledge(&mut self, wire_id: &str) -> Result<(), IngesterError>;
    fn health_check(&self) -> Result<(), IngesterError>;
    fn disconnect(&mut self) -> Result<(), IngesterError>;
}

#[derive(Default)]
struct GroupState {
    next_index: usize,
    pending: HashMap<String, usize>,
}

/// Shared in-memory log backing one or more [`InProcessStream`] handles. Tests inject
/// entries with [`InProcessStreamBackend::publish`].
#[derive(Clone, Default)]
pub struct InProcessStreamBackend {
    entries: Arc<Mutex<VecDeque<RawEntry>>>,
    groups: Arc<Mutex<HashMap<String, GroupState>>>,
    connected: Arc<Mutex<bool>>,
}

impl InProcessStreamBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, wire_id: impl Into<String>, fields: HashMap<String, String>) {
        self.entries.lock().unwrap().push_back(RawEntry {
            wire_id: wire_id.into(),
            fields,
        });
    }

    pub fn pending_count(&self, group: &str) -> usize {
        self.groups
            .lock()
            .unwrap()
            .get(group)
            .map(|g| g.pending.len())
            .unwrap_or(0)
    }
}

pub struct InProcessStream {
    backend: InProcessStreamBackend,
    group: String,
    #[allow(dead_code)]
    consumer: String,
}

impl InProcessStream {
    pub fn new(backend: InProcessStreamBackend, group: impl Into<String>, consumer: impl Into<String>) -> Self {
        InProcessStream {
            backend,
            group: group.into(),
            consumer: consumer.into(),
        }
    }
}

impl KillStream for InProcessStream {
    fn connect(&mut self) -> Result<(), IngesterError> {
        *self.backend.connected.lock().unwrap() = true;
        Ok(())
    }

    fn poll(&mut self, _timeout: Duration) -> Result<Option<RawEntry>, IngesterError> {
        if !*self.backend.connected.lock().unwrap() {
            return Err(IngesterError::Disconnected);
        }
        let entries = self.backend.entries.lock().unwrap();
        let mut groups = self.backend.groups.lock().unwrap();
        let state = groups.entry(self.group.clone()).or_default();
        if state.next_index >= entries.len() {
            return Ok(None);
        }
        let entry = entries[state.next_index].clone();
        state.pending.insert(entry.wire_id.clone(), state.next_index);
        state.next_index += 1;
        Ok(Some(entry))
    }

    fn acknowledge(&mut self, wire_id: &str) -> Result<(), IngesterError> {
        let mut groups = self.backend.groups.lock().unwrap();
        if let Some(state) = groups.get_mut(&self.group) {
            state.pending.remove(wire_id);
        }
        Ok(())
    }

    fn health_check(&self) -> Result<(), IngesterError> {
        if *self.backend.connected.lock().unwrap() {
            Ok(())
        } else {
            Err(IngesterError::Disconnected)
        }
    }

    fn disconnect(&mut self) -> Result<(), IngesterError> {
        *self.backend.connected.lock().unwrap() = false;
        Ok(())
    }
}
