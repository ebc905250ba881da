//! Per-dependency circuit breaker (§7): CLOSED / OPEN / HALF_OPEN with configurable
//! failure threshold, recovery window, and successes-to-close.

use chrono::{DateTime, Utc};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug, Clone, Copy)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: u32,
    pub recovery_timeout: Duration,
    pub successes_to_close: u32,
}

impl CircuitBreakerConfig {
    pub const fn intel_default() -> Self {
        CircuitBreakerConfig {
            failure_threshold: 5,
            recovery_timeout: Duration::from_secs(60),
            successes_to_close: 3,
        }
    }

    pub const fn killer_stream_default() -> Self {
        CircuitBreakerConfig {
            failure_threshold: 10,
            recovery_timeout: Duration::from_secs(30),
            successes_to_close: 5,
        }
    }
}

/// Not thread-safe by itself; callers that share a breaker across threads wrap it in a
/// mutex, matching the short-lock-scope discipline used elsewhere (§5).
#[derive(Debug)]
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    state: BreakerState,
    consecutive_failures: u32,
    consecutive_successes: u32,
    opened_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CircuitBreakerError {
    #[error("circuit is open, rejecting call")]
    Open,
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        CircuitBreaker {
            config,
            state: BreakerState::Closed,
            consecutive_failures: 0,
            consecutive_successes: 0,
            opened_at: None,
        }
    }

    pub fn state(&self) -> BreakerState {
        self.state
    }

    /// Must be called before attempting a guarded operation. Transitions OPEN to
    /// HALF_OPEN once the recovery timeout has elapsed.
    pub fn allow_call(&mut self, now: DateTime<Utc>) -> Result<(), CircuitBreakerError> {
        if self.state == BreakerState::Open {
            if let Some(opened_at) = self.opened_at {
                let elapsed = now - opened_at;
                if elapsed >= chrono::Duration::from_std(self.config.recovery_timeout).unwrap() {
                    self.state = BreakerState::HalfOpen;
                    self.consecutive_successes = 0;
                    return Ok(());
                }
            }
            return Err(CircuitBreakerError::Open);
        }
        Ok(())
    }

    pub fn record_success(&mut self) {
        match self.state {
            BreakerState::HalfOpen => {
                self.consecutive_successes += 1;
                if self.consecutive_successes >= self.config.successes_to_close {
                    self.state = BreakerState::Closed;
                    self.consecutive_failures = 0;
                    self.opened_at = None;
                }
            }
            BreakerState::Closed => {
                self.consecutive_failures = 0;
            }
            BreakerState::Open => {}
        }
    }

    pub fn record_failure(&mut self, now: DateTime<Utc>) {
        match self.state {
            BreakerState::HalfOpen => {
                self.state = BreakerState::Open;
                self.opened_at = Some(now);
                self.consecutive_successes = 0;
            }
            BreakerState::Closed => {
                self.consecutive_failures += 1;
                if self.consecutive_failures >= self.config.failure_threshold {
                    self.state = BreakerState::Open;
                    self.opened_at = Some(now);
                }
            }
            BreakerState::Open => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opens_after_threshold_failures() {
        let mut breaker = CircuitBreaker::new(CircuitBreakerConfig {
            failure_threshold: 3,
            recovery_timeout: Duration::from_secs(10),
            successes_to_close: 1,
        });
        let now = Utc::now();
        for _ in 0..2 {
            breaker.record_failure(now);
        }
        assert_eq!(breaker.state(), BreakerState::Closed);
        breaker.record_failure(now);
        assert_eq!(breaker.state(), BreakerState::Open);
        assert!(breaker.allow_call(now).is_err());
    }

    #[test]
    fn half_opens_after_recovery_and_closes_on_success() {
        let mut breaker = CircuitBreaker::new(CircuitBreakerConfig {
            failure_threshold: 1,
            recovery_timeout: Duration::from_secs(10),
            successes_to_close: 2,
        });
        let t0 = Utc::now();
        breaker.record_failure(t0);
        assert_eq!(breaker.state(), BreakerState::Open);

        let t1 = t0 + chrono::Duration::seconds(11);
        assert!(breaker.allow_call(t1).is_ok());
        assert_eq!(breaker.state(), BreakerState::HalfOpen);

        breaker.record_success();
        assert_eq!(breaker.state(), BreakerState::HalfOpen);
        breaker.record_success();
        assert_eq!(breaker.state(), BreakerState::Closed);
    }

    #[test]
    fn half_open_failure_reopens() {
        let mut breaker = CircuitBreaker::new(CircuitBreakerConfig {
            failure_threshold: 1,
            recovery_timeout: Duration::from_secs(1),
            successes_to_close: 2,
        });
        let t0 = Utc::now();
        breaker.record_failure(t0);
        let t1 = t0 + chrono::Duration::seconds(2);
        breaker.allow_call(t1).unwrap();
        breaker.record_failure(t1);
        assert_eq!(breaker.state(), BreakerState::Open);
    }
}
