//! A generic keyed store with per-entry timestamps and freshness checks.
//! Used for payloads, symbol metadata, quote groups, and search results —
//! every read-through cache in the service shares this shape even though
//! each has a different TTL.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::RwLock;
use std::time::{Duration, Instant};

struct Entry<V> {
    value: V,
    built_at: Instant,
}

/// Thread-safe TTL-aware cache. Never evicts on read; only `set` replaces
/// an entry.
pub struct TtlCache<K: Eq + Hash, V: Clone> {
    entries: RwLock<HashMap<K, Entry<V>>>,
}

impl<K: Eq + Hash, V: Clone> Default for TtlCache<K, V> {
    fn default() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl<K: Eq + Hash, V: Clone> TtlCache<K, V> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached value without evicting, regardless of freshness.
    #[must_use]
    pub fn peek(&self, key: &K) -> Option<V> {
        self.entries
            .read()
            .expect("ttl cache poisoned")
            .get(key)
            .map(|e| e.value.clone())
    }

    #[must_use]
    pub fn is_fresh(&self, key: &K, ttl: Duration) -> bool {
        self.entries
            .read()
            .expect("ttl cache poisoned")
            .get(key)
            .is_some_and(|e| e.built_at.elapsed() <= ttl)
    }

    #[must_use]
    pub fn get_fresh(&self, key: &K, ttl: Duration) -> Option<V> {
        let entries = self.entries.read().expect("ttl cache poisoned");
        let entry = entries.get(key)?;
        (entry.built_at.elapsed() <= ttl).then(|| entry.value.clone())
    }

    pub fn set(&self, key: K, value: V) {
        self.entries.write().expect("ttl cache poisoned").insert(
            key,
            Entry {
                value,
                built_at: Instant::now(),
            },
        );
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().expect("ttl cache poisoned").len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
