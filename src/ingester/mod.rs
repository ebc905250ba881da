//! The ingestion & acknowledgement loop (§4.1): pulls from the kill stream under
//! consumer-group semantics, parses the wire form, acks parse failures immediately to
//! avoid poison retry, and hands valid reports downstream over a bounded channel.

pub mod error;
pub mod stream;
pub mod wire;

pub use error::IngesterError;
pub use stream::{InProcessStream, InProcessStreamBackend, KillStream, RawEntry};

use crate::event::channel::EventConsumer;
use crate::event::cancellation::CancellationMessage;
use crate::models::KillReport;
use crate::utils::backoff::ExponentialBackoff;
use crate::utils::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig};
use crossbeam::channel::Sender;
use std::time::Duration;
use tracing::{debug, error, warn};

pub const POLL_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct IngesterConfig {
    pub group: String,
    pub consumer: String,
    pub poll_timeout: Duration,
    pub backoff_base: Duration,
    pub backoff_cap: Duration,
}

impl Default for IngesterConfig {
    fn default() -> Self {
        IngesterConfig {
            group: "resilience-agents".to_string(),
            consumer: format!("agent-{}", std::process::id()),
            poll_timeout: POLL_TIMEOUT,
            backoff_base: Duration::from_secs(1),
            backoff_cap: Duration::from_secs(30),
        }
    }
}

pub struct KillStreamIngester<S: KillStream> {
    stream: S,
    config: IngesterConfig,
    breaker: CircuitBreaker,
}

impl<S: KillStream> KillStreamIngester<S> {
    pub fn new(stream: S, config: IngesterConfig) -> Self {
        KillStreamIngester {
            stream,
            config,
            breaker: CircuitBreaker::new(CircuitBreakerConfig::killer_stream_default()),
        }
    }

    /// Runs until `stop` fires. Intended to be spawned via
    /// [`crate::utils::thread_context::NotStartedThreadContext`].
    pub fn run(mut self, stop: EventConsumer<CancellationMessage>, downstream: Sender<KillReport>) {
        if let Err(err) = self.stream.connect() {
            error!(error = %err, "ingester failed to connect to the kill stream");
        }
        let mut backoff = ExponentialBackoff::new(self.config.backoff_base, self.config.backoff_cap);

        loop {
            if stop.try_recv().is_some() {
                break;
            }

            let now = chrono::Utc::now();
            if self.breaker.allow_call(now).is_err() {
                std::thread::sleep(Duration::from_millis(200));
                continue;
            }

            match self.stream.poll(self.config.poll_timeout) {
                Ok(Some(entry)) => {
                    self.breaker.record_success();
                    backoff.reset();
                    self.handle_entry(entry, &downstream);
                }
                Ok(None) => {
                    self.breaker.record_success();
                }
                Err(err) => {
                    self.breaker.record_failure(now);
                    warn!(error = %err, "transient error reading kill stream, backing off");
                    std::thread::sleep(backoff.next_delay());
                }
            }
        }
        let _ = self.stream.disconnect();
    }

    fn handle_entry(&mut self, entry: RawEntry, downstream: &Sender<KillReport>) {
        match wire::parse_kill_report(&entry.fields) {
            Ok(report) => {
                debug!(kill_id = %report.kill_id, "ingested kill report");
                if downstream.send(report).is_err() {
                    warn!("downstream pipeline is closed, dropping ingested report");
                }
            }
            Err(err) => {
                warn!(wire_id = %entry.wire_id, error = %err, "dropping unparseable kill stream entry");
            }
        }
        if let Err(err) = self.stream.acknowledge(&entry.wire_id) {
            error!(wire_id = %entry.wire_id, error = %err, "failed to acknowledge kill stream entry");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::channel::pub_sub;
    use crossbeam::channel::unbounded;
    use std::collections::HashMap;

    fn valid_fields(kill_id: &str) -> HashMap<String, String> {
        let mut fields = HashMap::new();
        fields.insert("kill_id".into(), kill_id.into());
        fields.insert("timestamp".into(), "2026-07-30T10:00:00Z".into());
        fields.insert("target_module".into(), "payments-api".into());
        fields.insert("target_instance_id".into(), "instance-1".into());
        fields.insert("kill_reason".into(), "ANOMALY_BEHAVIOR".into());
        fields.insert("severity".into(), "LOW".into());
        fields.insert("confidence_score".into(), "0.5".into());
        fields.insert("source_agent".into(), "killer-1".into());
        fields
    }

    #[test]
    fn valid_entries_flow_downstream_and_are_acked() {
        let backend = InProcessStreamBackend::new();
        backend.publish("wire-1", valid_fields("kill-1"));
        let stream = InProcessStream::new(backend.clone(), "group-a", "c1");
        let ingester = KillStreamIngester::new(stream, IngesterConfig::default());

        let (stop_pub, stop_con) = pub_sub::<CancellationMessage>();
        let (tx, rx) = unbounded();
        stop_pub.publish(()).unwrap();
        // One iteration happens before the stop signal is observed on the next loop check.
        std::thread::spawn(move || ingester.run(stop_con, tx)).join().unwrap();
        let report = rx.try_recv();
        assert!(report.is_ok());
        assert_eq!(backend.pending_count("group-a"), 0);
    }

    #[test]
    fn parse_failures_are_acked_and_dropped() {
        let backend = InProcessStreamBackend::new();
        let mut bad = HashMap::new();
        bad.insert("kill_id".into(), "kill-bad".into());
        backend.publish("wire-bad", bad);
        let stream = InProcessStream::new(backend.clone(), "group-a", "c1");
        let ingester = KillStreamIngester::new(stream, IngesterConfig::default());

        let (stop_pub, stop_con) = pub_sub::<CancellationMessage>();
        let (tx, rx) = unbounded();
        stop_pub.publish(()).unwrap();
        std::thread::spawn(move || ingester.run(stop_con, tx)).join().unwrap();
        assert!(rx.try_recv().is_err());
        assert_eq!(backend.pending_count("group-a"), 0);
    }
}
