//! The hot-key record table: keys recently requested by a foreground reader,
//! eligible for background refresh while still within the hot window.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Mutex;
use std::time::{Duration, Instant};

#[derive(Default)]
pub struct HotKeyTable<K: Eq + Hash> {
    last_requested: Mutex<HashMap<K, Instant>>,
}

impl<K: Eq + Hash + Clone> HotKeyTable<K> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            last_requested: Mutex::new(HashMap::new()),
        }
    }

    /// Mark `key` as requested now. Called on every foreground read.
    pub fn touch(&self, key: K) {
        self.last_requested
            .lock()
            .expect("hot-key table mutex poisoned")
            .insert(key, Instant::now());
    }

    /// Snapshot of keys whose `last_requested_at` is within `hot_window`.
    #[must_use]
    pub fn hot_keys(&self, hot_window: Duration) -> Vec<K> {
        self.last_requested
            .lock()
            .expect("hot-key table mutex poisoned")
            .iter()
            .filter(|(_, at)| at.elapsed() <= hot_window)
            .map(|(k, _)| k.clone())
            .collect()
    }

    /// Drop entries whose `last_requested_at` has aged past `hot_window`, so
    /// the table doesn't grow without bound under churn.
    pub fn reap_stale(&self, hot_window: Duration) {
        self.last_requested
            .lock()
            .expect("hot-key table mutex poisoned")
            .retain(|_, at| at.elapsed() <= hot_window);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn touched_key_is_hot() {
        let table: HotKeyTable<&'static str> = HotKeyTable::new();
        table.touch("AAPL");
        assert_eq!(table.hot_keys(Duration::from_secs(600)), vec!["AAPL"]);
    }

    #[test]
    fn aged_key_is_not_hot() {
        let table: HotKeyTable<&'static str> = HotKeyTable::new();
        table.touch("AAPL");
        std::thread::sleep(Duration::from_millis(5));
        assert!(table.hot_keys(Duration::from_millis(0)).is_empty());
    }

    #[test]
    fn reap_stale_removes_aged_entries() {
        let table: HotKeyTable<&'static str> = HotKeyTable::new();
        table.touch("AAPL");
        std::thread::sleep(Duration::from_millis(5));
        table.reap_stale(Duration::from_millis(0));
        assert!(table.hot_keys(Duration::from_secs(600)).is_empty());
    }
}
