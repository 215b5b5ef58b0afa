//! Lightweight quote groups (§4.3 derivation, §4.10 `get_quotes`): short-TTL
//! cached, falling back to a stale group when a live refresh yields nothing.

use std::collections::{BTreeMap, HashSet};
use std::time::Duration;

use marketcache_cache::{HotKeyTable, PayloadStore, TtlCache};
use marketcache_core::{quote::derive_quote, Quote, Symbol};
use marketcache_upstream::UpstreamClient;

/// A symbol-keyed quote group plus whether it was served from a stale cache
/// entry because the live refresh produced nothing usable.
#[derive(Debug, Clone, Default)]
pub struct QuotesResult {
    pub quotes: BTreeMap<String, Quote>,
    pub stale: bool,
}

pub(crate) async fn get_quotes(
    store: &PayloadStore,
    quote_cache: &TtlCache<String, BTreeMap<String, Quote>>,
    hot_keys: &HotKeyTable<(String, bool)>,
    upstream: &dyn UpstreamClient,
    raw_symbols: &[String],
    ext: bool,
    symbols_csv_cap: usize,
    quote_ttl: Duration,
) -> QuotesResult {
    if raw_symbols.is_empty() {
        return QuotesResult::default();
    }

    let mut seen = HashSet::new();
    let mut deduped = Vec::new();
    for raw in raw_symbols {
        if let Some(sym) = Symbol::normalize(raw) {
            if seen.insert(sym.clone()) {
                deduped.push(sym);
            }
        }
    }
    deduped.truncate(symbols_csv_cap);

    let mut sorted = deduped.clone();
    sorted.sort();
    let cache_key = sorted
        .iter()
        .map(Symbol::as_str)
        .collect::<Vec<_>>()
        .join(",");

    hot_keys.touch((cache_key.clone(), ext));

    if let Some(fresh) = quote_cache.get_fresh(&cache_key, quote_ttl) {
        return QuotesResult { quotes: fresh, stale: false };
    }

    let mut quotes = BTreeMap::new();
    for sym in &deduped {
        let Ok(raw) = upstream.download(sym.as_str(), "1d", "1m", ext).await else {
            continue;
        };
        let metadata = store.metadata(sym).await;
        if let Some(quote) = derive_quote(&raw.candles, &metadata, ext) {
            quotes.insert(sym.to_string(), quote);
        }
    }

    if !quotes.is_empty() {
        quote_cache.set(cache_key, quotes.clone());
        QuotesResult { quotes, stale: false }
    } else if let Some(stale) = quote_cache.peek(&cache_key) {
        QuotesResult { quotes: stale, stale: true }
    } else {
        QuotesResult::default()
    }
}

/// The quote-group hot-set refresher (spec.md:93, §4.6): the same
/// not-stale/not-in-flight background pattern as the payload refresher,
/// applied to recently requested symbol groups using the short quote TTL.
/// Each group's cache key already *is* its sorted, deduped symbol list, so
/// rebuilding only needs to split it back apart.
pub(crate) async fn refresh_hot_groups(
    store: &PayloadStore,
    quote_cache: &TtlCache<String, BTreeMap<String, Quote>>,
    hot_keys: &HotKeyTable<(String, bool)>,
    upstream: &dyn UpstreamClient,
    hot_window: Duration,
    quote_ttl: Duration,
) {
    for (cache_key, ext) in hot_keys.hot_keys(hot_window) {
        if cache_key.is_empty() || quote_cache.is_fresh(&cache_key, quote_ttl) {
            continue;
        }
        let symbols: Vec<String> = cache_key.split(',').map(str::to_string).collect();
        let cap = symbols.len();
        let _ = get_quotes(store, quote_cache, hot_keys, upstream, &symbols, ext, cap, quote_ttl).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marketcache_core::{Candle, RawFrame, ServiceConfig};
    use marketcache_upstream::MockUpstreamClient;
    use std::sync::Arc;
    use std::time::Duration;

    fn minute_candles(n: i64) -> Vec<Candle> {
        (0..n)
            .map(|i| Candle {
                time: i * 60,
                open: 10.0,
                high: 10.5,
                low: 9.5,
                close: 10.0 + i as f64,
                volume: 1.0,
            })
            .collect()
    }

    #[tokio::test]
    async fn empty_symbols_yields_empty_non_stale_result() {
        let mock = MockUpstreamClient::new();
        let store = PayloadStore::new(Arc::new(MockUpstreamClient::new()), ServiceConfig::default());
        let cache = TtlCache::new();
        let hot_keys = HotKeyTable::new();
        let result =
            get_quotes(&store, &cache, &hot_keys, &mock, &[], false, 50, Duration::from_secs(15)).await;
        assert!(result.quotes.is_empty());
        assert!(!result.stale);
    }

    #[tokio::test]
    async fn live_refresh_populates_cache() {
        let mock = MockUpstreamClient::new();
        mock.set_frame("AAPL", RawFrame { candles: minute_candles(5) });
        let store = PayloadStore::new(Arc::new(MockUpstreamClient::new()), ServiceConfig::default());
        let cache = TtlCache::new();
        let hot_keys = HotKeyTable::new();
        let result = get_quotes(
            &store,
            &cache,
            &hot_keys,
            &mock,
            &["aapl".to_string()],
            false,
            50,
            Duration::from_secs(15),
        )
        .await;
        assert!(!result.stale);
        assert!(result.quotes.contains_key("AAPL"));
    }

    #[tokio::test]
    async fn refresh_hot_groups_rebuilds_a_hot_stale_group() {
        let mock = MockUpstreamClient::new();
        mock.set_frame("AAPL", RawFrame { candles: minute_candles(5) });
        let store = PayloadStore::new(Arc::new(MockUpstreamClient::new()), ServiceConfig::default());
        let cache = TtlCache::new();
        let hot_keys = HotKeyTable::new();

        let result = get_quotes(
            &store,
            &cache,
            &hot_keys,
            &mock,
            &["aapl".to_string()],
            false,
            50,
            Duration::from_secs(0),
        )
        .await;
        assert!(result.quotes.contains_key("AAPL"));

        refresh_hot_groups(&store, &cache, &hot_keys, &mock, Duration::from_secs(600), Duration::from_secs(0))
            .await;
        assert!(cache.peek(&"AAPL".to_string()).is_some());
    }

    #[tokio::test]
    async fn refresh_hot_groups_skips_a_key_that_is_already_fresh() {
        let mock = MockUpstreamClient::new();
        mock.set_frame("AAPL", RawFrame { candles: minute_candles(5) });
        let store = PayloadStore::new(Arc::new(MockUpstreamClient::new()), ServiceConfig::default());
        let cache = TtlCache::new();
        let hot_keys = HotKeyTable::new();

        get_quotes(
            &store,
            &cache,
            &hot_keys,
            &mock,
            &["aapl".to_string()],
            false,
            50,
            Duration::from_secs(15),
        )
        .await;

        refresh_hot_groups(&store, &cache, &hot_keys, &mock, Duration::from_secs(600), Duration::from_secs(15))
            .await;
        assert_eq!(mock.download_call_count(), 1, "a fresh group must not be re-downloaded");
    }
}
