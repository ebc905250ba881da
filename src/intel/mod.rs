//! The Intel adapter (§4.2): enriches a kill report with context from the external
//! telemetry/intel service, and closes the loop by reporting the eventual outcome.

pub mod error;
pub mod fake;
pub mod http;

pub use error::IntelError;
pub use fake::InProcessIntel;
pub use http::HttpIntelAdapter;

use crate::models::{IntelContext, KillReport, OutcomeRecord};

pub trait IntelAdapter: Send + Sync {
    fn query_context(&self, report: &KillReport) -> Result<IntelContext, IntelError>;
    fn get_history(&self, module: &str, days: u32) -> Result<Vec<IntelContext>, IntelError>;
    fn report_outcome(&self, record: &OutcomeRecord) -> Result<bool, IntelError>;
    fn health_check(&self) -> Result<bool, IntelError>;
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base: std::time::Duration,
    pub cap: std::time::Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_retries: 3,
            base: std::time::Duration::from_secs(2),
            cap: std::time::Duration::from_secs(30),
        }
    }
}

/// Wraps any [`IntelAdapter`] with the retry/backoff/circuit-breaker/fallback behavior
/// from §4.2, so concrete adapters (HTTP, in-process fake) only implement the bare
/// request/response shape.
pub struct ResilientIntelClient<A: IntelAdapter> {
    inner: A,
    retry: RetryPolicy,
    breaker: std::sync::Mutex<crate::utils::circuit_breaker::CircuitBreaker>,
}

impl<A: IntelAdapter> ResilientIntelClient<A> {
    pub fn new(inner: A) -> Self {
        ResilientIntelClient::with_retry_policy(inner, RetryPolicy::default())
    }

    pub fn with_retry_policy(inner: A, retry: RetryPolicy) -> Self {
        ResilientIntelClient {
            inner,
            retry,
            breaker: std::sync::Mutex::new(crate::utils::circuit_breaker::CircuitBreaker::new(
                crate::utils::circuit_breaker::CircuitBreakerConfig::intel_default(),
            )),
        }
    }

    /// Queries context for `report`, retrying transient failures; on total failure,
    /// returns the deterministic default context rather than propagating an error (§4.2).
    pub fn query_context(&self, report: &KillReport) -> IntelContext {
        match self.call(|| self.inner.query_context(report)) {
            Ok(ctx) => ctx,
            Err(err) => {
                tracing::warn!(kill_id = %report.kill_id, error = %err, "intel query exhausted retries, using default context");
                IntelContext::default_for(&report.kill_id, uuid::Uuid::new_v4().to_string())
            }
        }
    }

    pub fn get_history(&self, module: &str, days: u32) -> Result<Vec<IntelContext>, IntelError> {
        self.call(|| self.inner.get_history(module, days))
    }

    /// Reports an outcome. Failures are the caller's concern to log; this does not retry
    /// beyond the configured policy and never falls back to a synthetic success (§4.14).
    pub fn report_outcome(&self, record: &OutcomeRecord) -> Result<bool, IntelError> {
        self.call(|| self.inner.report_outcome(record))
    }

    pub fn health_check(&self) -> Result<bool, IntelError> {
        self.inner.health_check()
    }

    fn call<T>(&self, op: impl Fn() -> Result<T, IntelError>) -> Result<T, IntelError> {
        use crate::error::Categorized;
        use crate::utils::backoff::ExponentialBackoff;

        let mut backoff = ExponentialBackoff::new(self.retry.base, self.retry.cap);
        let mut attempt = 0;
        loop {
            {
                let mut breaker = self.breaker.lock().unwrap();
                if breaker.allow_call(chrono::Utc::now()).is_err() {
                    return Err(IntelError::CircuitOpen);
                }
            }

            match op() {
                Ok(value) => {
                    self.breaker.lock().unwrap().record_success();
                    return Ok(value);
                }
                Err(err) => {
                    self.breaker.lock().unwrap().record_failure(chrono::Utc::now());
                    if !err.is_recoverable() || attempt >= self.retry.max_retries {
                        return Err(err);
                    }
                    attempt += 1;
                    std::thread::sleep(backoff.next_delay());
                }
            }
        }
    }
}
