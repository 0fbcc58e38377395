use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use rand::Rng;

/// Per-owner retry delay tracker: exponential growth, capped, with a jitter
/// of up to one base interval so failing owners do not requeue in lockstep.
pub struct Backoff {
    base: Duration,
    cap: Duration,
    counters: Mutex<HashMap<String, u32>>,
}

impl Backoff {
    pub fn new(base: Duration, cap: Duration) -> Self {
        Self {
            base,
            cap,
            counters: Mutex::new(HashMap::new()),
        }
    }

    /// Delay for the next retry of `key`, incrementing its failure streak.
    pub fn next_delay(&self, key: &str) -> Duration {
        let mut counters =
            self.counters.lock().unwrap_or_else(|e| e.into_inner());
        let streak = counters.entry(key.to_string()).or_insert(0);
        let exp = self
            .base
            .saturating_mul(2u32.saturating_pow(*streak))
            .min(self.cap);
        *streak = streak.saturating_add(1);
        let jitter_ms =
            rand::rng().random_range(0..=self.base.as_millis() as u64);
        exp + Duration::from_millis(jitter_ms)
    }

    /// Clear the failure streak after a successful cycle.
    pub fn reset(&self, key: &str) {
        self.counters
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(key);
    }
}
