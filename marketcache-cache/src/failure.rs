//! Fetch-failure markers: a parallel map of failure timestamps supporting
//! `in_cooldown(key)` checks.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Tracks the most recent upstream-failure timestamp per key.
#[derive(Default)]
pub struct FailureCooldown<K: Eq + Hash> {
    failures: Mutex<HashMap<K, Instant>>,
}

impl<K: Eq + Hash + Clone> FailureCooldown<K> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            failures: Mutex::new(HashMap::new()),
        }
    }

    pub fn mark_failed(&self, key: K) {
        self.failures
            .lock()
            .expect("failure cooldown mutex poisoned")
            .insert(key, Instant::now());
    }

    pub fn clear(&self, key: &K) {
        self.failures
            .lock()
            .expect("failure cooldown mutex poisoned")
            .remove(key);
    }

    #[must_use]
    pub fn in_cooldown(&self, key: &K, window: Duration) -> bool {
        self.failures
            .lock()
            .expect("failure cooldown mutex poisoned")
            .get(key)
            .is_some_and(|failed_at| failed_at.elapsed() < window)
    }
}
