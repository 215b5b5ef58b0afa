//! Coalesces concurrent builds for the same key: exactly one caller runs
//! the pipeline per key, others attach to a completion gate and re-check
//! the cache once it opens.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{OwnedRwLockWriteGuard, RwLock};

/// The outcome of attempting to claim a key for building.
pub enum Claim<K> {
    /// This caller is the sole builder. Holding the guard keeps the gate
    /// closed; drop it (or call [`SingleFlight::finish`]) once the result
    /// has been written to the cache, to release waiters.
    Mine {
        key: K,
        _guard: OwnedRwLockWriteGuard<()>,
    },
    /// Another caller already claimed this key; await the gate opening via
    /// [`SingleFlight::wait`].
    Waiting(Arc<RwLock<()>>),
}

/// A registry of in-flight build gates, keyed by `K`. The in-flight
/// registry is write-only by the claimant and delete-only by the same
/// claimant on completion.
#[derive(Default)]
pub struct SingleFlight<K: Eq + Hash + Clone> {
    inflight: Mutex<HashMap<K, Arc<RwLock<()>>>>,
}

impl<K: Eq + Hash + Clone> SingleFlight<K> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inflight: Mutex::new(HashMap::new()),
        }
    }

    /// Attempt to claim `key`. If nobody else is building it, returns
    /// `Claim::Mine` with the gate already locked. Otherwise returns
    /// `Claim::Waiting` on the existing gate.
    pub async fn claim_or_wait(&self, key: K) -> Claim<K> {
        let gate = {
            let mut map = self.inflight.lock().expect("single-flight mutex poisoned");
            if let Some(existing) = map.get(&key) {
                return Claim::Waiting(existing.clone());
            }
            let gate = Arc::new(RwLock::new(()));
            map.insert(key.clone(), gate.clone());
            gate
        };
        // Uncontended: this task just created the gate, so the write lock
        // resolves immediately.
        let guard = gate.write_owned().await;
        Claim::Mine { key, _guard: guard }
    }

    /// Whether `key` currently has a builder in flight. Callers that must
    /// not block on the gate (e.g. the background refresher) check this
    /// first and skip the key rather than waiting.
    pub fn is_in_flight(&self, key: &K) -> bool {
        self.inflight.lock().expect("single-flight mutex poisoned").contains_key(key)
    }

    /// Remove `key` from the registry once its builder has written its
    /// result to the cache. Must be called before the `Claim::Mine` value
    /// is dropped so a racing new caller sees a clean slate rather than an
    /// about-to-close gate.
    pub fn finish(&self, key: &K) {
        self.inflight.lock().expect("single-flight mutex poisoned").remove(key);
    }

    /// Wait for a gate to open, bounded by `timeout`. Returns `true` if the
    /// gate opened within the bound, `false` on timeout — callers should
    /// then re-check the cache and fall back to stale/error per policy.
    pub async fn wait(gate: &Arc<RwLock<()>>, timeout: Duration) -> bool {
        tokio::time::timeout(timeout, gate.read()).await.is_ok()
    }
}
