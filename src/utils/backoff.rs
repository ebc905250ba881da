//! Jittered exponential backoff (§4.1, §4.2): base duration doubling up to a cap, with
//! up to 20% random jitter so that retrying peers don't synchronize.

use rand::Rng;
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct ExponentialBackoff {
    base: Duration,
    cap: Duration,
    attempt: u32,
}

impl ExponentialBackoff {
    pub fn new(base: Duration, cap: Duration) -> Self {
        Self {
            base,
            cap,
            attempt: 0,
        }
    }

    /// Returns the delay for the current attempt and advances internal state.
    pub fn next_delay(&mut self) -> Duration {
        let exp = self.base.as_millis().saturating_mul(1u128 << self.attempt.min(20));
        let capped = exp.min(self.cap.as_millis());
        self.attempt = self.attempt.saturating_add(1);
        jitter(Duration::from_millis(capped as u64))
    }

    pub fn reset(&mut self) {
        self.attempt = 0;
    }
}

fn jitter(duration: Duration) -> Duration {
    let mut rng = rand::thread_rng();
    let factor: f64 = rng.gen_range(0.8..=1.0);
    Duration::from_secs_f64(duration.as_secs_f64() * factor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_grows_and_caps() {
        let mut backoff = ExponentialBackoff::new(Duration::from_secs(1), Duration::from_secs(30));
        let mut last = Duration::ZERO;
        for _ in 0..10 {
            let delay = backoff.next_delay();
            assert!(delay <= Duration::from_secs(30));
            last = delay;
        }
        assert!(last <= Duration::from_secs(30));
    }

    #[test]
    fn reset_restarts_progression() {
        let mut backoff = ExponentialBackoff::new(Duration::from_millis(100), Duration::from_secs(1));
        backoff.next_delay();
        backoff.next_delay();
        backoff.reset();
        let delay = backoff.next_delay();
        assert!(delay <= Duration::from_millis(100));
    }
}
