//! The transport-independent facade (§4.10): wires the payload store, the
//! stream engine, the rate limiter, and quote/search caching into the
//! operations a transport layer calls.

mod quotes;

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use marketcache_cache::{spawn_refresher, HotKeyTable, PayloadStore, TtlCache};
use marketcache_core::{
    Delta, Payload, PayloadKey, Quote, SearchResult, ServiceConfig, ServiceError, ServiceResult,
    Symbol, Timeframe,
};
use marketcache_ratelimit::{RateLimitDecision, RateLimiter, RouteClass};
use marketcache_stream::{project_delta, run_subscription, StreamFrame};
use marketcache_upstream::UpstreamClient;
use tokio::sync::{mpsc, watch};

pub use quotes::QuotesResult;

/// Everything `health()` reports (§6, §10.6): observability fields survive
/// even though auth and rate limiting themselves are largely out of scope.
#[derive(Debug, Clone)]
pub struct HealthStatus {
    pub status: &'static str,
    pub ts: i64,
    pub auth_enabled: bool,
    pub rate_limit_enabled: bool,
}

/// Per-symbol outcome of a `prewarm` call (§4.10): dedupes and caps at
/// `prewarm_cap` symbols, reporting failures without aborting the batch.
#[derive(Debug, Clone)]
pub struct PrewarmReport {
    pub warmed: Vec<String>,
    pub failed: Vec<String>,
    pub timeframe: &'static str,
    pub ext: bool,
}

/// A live stream subscription: send `true` on `stop` to end the push loop,
/// and drain `frames` for data/error/keep-alive frames.
pub struct StreamHandle {
    pub stop: watch::Sender<bool>,
    pub frames: mpsc::Receiver<StreamFrame>,
}

pub struct MarketCacheService {
    store: Arc<PayloadStore>,
    upstream: Arc<dyn UpstreamClient>,
    rate_limiter: RateLimiter,
    quote_cache: Arc<TtlCache<String, BTreeMap<String, Quote>>>,
    quote_hot_keys: Arc<HotKeyTable<(String, bool)>>,
    search_cache: TtlCache<String, Vec<SearchResult>>,
    config: ServiceConfig,
}

impl MarketCacheService {
    #[must_use]
    pub fn new(upstream: Arc<dyn UpstreamClient>, config: ServiceConfig) -> Self {
        let store = Arc::new(PayloadStore::new(upstream.clone(), config.clone()));
        let rate_limiter = RateLimiter::new(
            config.chart_data_limit,
            config.general_limit,
            config.rate_limit_bucket_soft_cap,
        );
        Self {
            store,
            upstream,
            rate_limiter,
            quote_cache: Arc::new(TtlCache::new()),
            quote_hot_keys: Arc::new(HotKeyTable::new()),
            search_cache: TtlCache::new(),
            config,
        }
    }

    /// Start the payload hot-set refresher background task (§4.6). Callers
    /// own the returned handle; dropping it does not stop the task, abort
    /// it explicitly on shutdown.
    #[must_use]
    pub fn spawn_refresher(&self) -> tokio::task::JoinHandle<()> {
        spawn_refresher(self.store.clone())
    }

    /// Start the quote-group hot-set refresher background task (§4.6,
    /// spec.md:93): the same pattern as `spawn_refresher`, applied to
    /// recently requested symbol groups instead of payload keys.
    #[must_use]
    pub fn spawn_quote_refresher(&self) -> tokio::task::JoinHandle<()> {
        let store = self.store.clone();
        let upstream = self.upstream.clone();
        let quote_cache = self.quote_cache.clone();
        let hot_keys = self.quote_hot_keys.clone();
        let tick = self.config.refresh_tick;
        let hot_window = self.config.hot_window;
        let quote_ttl = self.config.quote_ttl;
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(tick);
            loop {
                interval.tick().await;
                quotes::refresh_hot_groups(&store, &quote_cache, &hot_keys, upstream.as_ref(), hot_window, quote_ttl)
                    .await;
                hot_keys.reap_stale(hot_window);
            }
        })
    }

    #[must_use]
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    #[must_use]
    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }

    /// Whether a fresh cache entry would serve this key right now — used to
    /// decide whether a request qualifies for the rate-limit fresh boost
    /// (§4.9).
    #[must_use]
    pub fn is_fresh(&self, symbol: &str, tf: &str, ext: bool) -> bool {
        let Some(sym) = Symbol::normalize(symbol) else {
            return false;
        };
        let timeframe = Timeframe::parse_or_default(tf);
        let key = PayloadKey { symbol: sym, timeframe, ext };
        let ttl = Duration::from_secs(timeframe.cache_ttl_secs());
        self.store.payload_cache.is_fresh(&key, ttl)
    }

    pub fn check_rate_limit(
        &self,
        client_id: &str,
        class: RouteClass,
        fresh: bool,
        now_unix_secs: i64,
    ) -> RateLimitDecision {
        self.rate_limiter.check(client_id, class, fresh, now_unix_secs)
    }

    fn parse_key(symbol: &str, tf: &str, ext: bool) -> ServiceResult<PayloadKey> {
        let sym = Symbol::normalize(symbol)
            .ok_or_else(|| ServiceError::invalid_argument(format!("invalid symbol: {symbol}")))?;
        Ok(PayloadKey {
            symbol: sym,
            timeframe: Timeframe::parse_or_default(tf),
            ext,
        })
    }

    pub async fn get_payload(&self, symbol: &str, tf: &str, ext: bool) -> ServiceResult<Payload> {
        let key = Self::parse_key(symbol, tf, ext)?;
        self.store.get_payload(key).await
    }

    pub async fn get_delta(
        &self,
        symbol: &str,
        tf: &str,
        ext: bool,
        since: i64,
    ) -> ServiceResult<Delta> {
        let payload = self.get_payload(symbol, tf, ext).await?;
        Ok(project_delta(&payload, since.max(0)))
    }

    /// Open a push-loop subscription (§4.8). The loop runs on its own task;
    /// drop the handle's `stop` sender (or send `true`) to end it.
    pub fn stream(&self, symbol: &str, tf: &str, ext: bool, since: i64) -> ServiceResult<StreamHandle> {
        let key = Self::parse_key(symbol, tf, ext)?;
        let (stop_tx, stop_rx) = watch::channel(false);
        let (tx, rx) = mpsc::channel(32);
        tokio::spawn(run_subscription(self.store.clone(), key, since.max(0), stop_rx, tx));
        Ok(StreamHandle { stop: stop_tx, frames: rx })
    }

    pub async fn get_quotes(&self, symbols: &[String], ext: bool) -> QuotesResult {
        quotes::get_quotes(
            &self.store,
            &self.quote_cache,
            &self.quote_hot_keys,
            self.upstream.as_ref(),
            symbols,
            ext,
            self.config.symbols_csv_cap,
            self.config.quote_ttl,
        )
        .await
    }

    pub async fn search(&self, query: &str) -> ServiceResult<Vec<SearchResult>> {
        let key = query.trim().to_ascii_lowercase();
        if key.is_empty() {
            return Ok(Vec::new());
        }
        if let Some(fresh) = self.search_cache.get_fresh(&key, self.config.search_ttl) {
            return Ok(fresh);
        }
        let results = self.upstream.search(query).await?;
        self.search_cache.set(key, results.clone());
        Ok(results)
    }

    pub async fn prewarm(&self, symbols: &[String], tf: &str, ext: bool) -> PrewarmReport {
        let timeframe = Timeframe::parse_or_default(tf);
        let mut seen = HashSet::new();
        let mut deduped = Vec::new();
        for raw in symbols {
            if let Some(sym) = Symbol::normalize(raw) {
                if seen.insert(sym.clone()) {
                    deduped.push(sym);
                }
            }
        }
        deduped.truncate(self.config.prewarm_cap);

        let mut warmed = Vec::new();
        let mut failed = Vec::new();
        for sym in deduped {
            let key = PayloadKey { symbol: sym.clone(), timeframe, ext };
            match self.store.get_payload(key).await {
                Ok(_) => warmed.push(sym.to_string()),
                Err(_) => failed.push(sym.to_string()),
            }
        }

        PrewarmReport {
            warmed,
            failed,
            timeframe: timeframe.as_str(),
            ext,
        }
    }

    #[must_use]
    pub fn health(&self, now_unix_secs: i64) -> HealthStatus {
        HealthStatus {
            status: "ok",
            ts: now_unix_secs,
            auth_enabled: self.config.auth_enabled,
            rate_limit_enabled: self.config.rate_limit_enabled,
        }
    }
}
