//! The hot-set refresher (§4.6): one periodic task that rebuilds recently
//! requested payloads before they expire, rather than a task per key.

use std::sync::Arc;
use std::time::Duration;

use marketcache_core::PayloadKey;

use crate::builder::PayloadStore;

/// Spawn the refresher loop, ticking every `refresh_tick` until the service
/// is dropped (the returned handle's abort or the runtime shutdown ends it).
pub fn spawn_refresher(store: Arc<PayloadStore>) -> tokio::task::JoinHandle<()> {
    let tick = store.config().refresh_tick;
    let hot_window = store.config().hot_window;
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(tick);
        loop {
            interval.tick().await;
            refresh_once(&store, hot_window).await;
            store.hot_keys.reap_stale(hot_window);
        }
    })
}

async fn refresh_once(store: &Arc<PayloadStore>, hot_window: Duration) {
    for key in store.hot_keys.hot_keys(hot_window) {
        // A foreground request is already building this key; queuing
        // behind it via single-flight would block the one serial refresher
        // loop for up to `single_flight_wait`. Skip it this tick instead —
        // the foreground build will populate the cache on its own.
        if store.is_building(&key) {
            continue;
        }
        if is_stale(store, &key) {
            let _ = store.get_payload(key).await;
        }
    }
}

fn is_stale(store: &PayloadStore, key: &PayloadKey) -> bool {
    let ttl = Duration::from_secs(key.timeframe.cache_ttl_secs());
    !store.payload_cache.is_fresh(key, ttl)
}
