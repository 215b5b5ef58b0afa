//! Wires the payload cache, failure cooldown, hot-key table, and
//! single-flight registry into the builder contract from §4.5: exactly one
//! worker runs the transform pipeline per key, and callers receive stale
//! data in preference to an error whenever any prior payload exists.

use std::sync::Arc;

use marketcache_core::{pipeline, symbol, Payload, PayloadKey, ServiceConfig, ServiceError, ServiceResult, Symbol, SymbolMetadata};
use marketcache_upstream::UpstreamClient;

use crate::failure::FailureCooldown;
use crate::hotkeys::HotKeyTable;
use crate::single_flight::{Claim, SingleFlight};
use crate::ttl_cache::TtlCache;

/// The read-through store backing `get_payload`/the hot-set refresher.
pub struct PayloadStore {
    pub payload_cache: TtlCache<PayloadKey, Payload>,
    pub metadata_cache: TtlCache<Symbol, SymbolMetadata>,
    pub failure: FailureCooldown<PayloadKey>,
    pub hot_keys: HotKeyTable<PayloadKey>,
    pub(crate) single_flight: SingleFlight<PayloadKey>,
    upstream: Arc<dyn UpstreamClient>,
    config: ServiceConfig,
}

impl PayloadStore {
    #[must_use]
    pub fn new(upstream: Arc<dyn UpstreamClient>, config: ServiceConfig) -> Self {
        Self {
            payload_cache: TtlCache::new(),
            metadata_cache: TtlCache::new(),
            failure: FailureCooldown::new(),
            hot_keys: HotKeyTable::new(),
            single_flight: SingleFlight::new(),
            upstream,
            config,
        }
    }

    #[must_use]
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Whether `key` is currently being built by some other caller. The
    /// refresher uses this to skip hot keys that are already in flight
    /// rather than queueing behind them (§4.6).
    #[must_use]
    pub fn is_building(&self, key: &PayloadKey) -> bool {
        self.single_flight.is_in_flight(key)
    }

    /// The full read-through contract: peek fresh, else coalesce builds via
    /// single-flight, falling back to stale data whenever any exists.
    pub async fn get_payload(&self, key: PayloadKey) -> ServiceResult<Payload> {
        self.hot_keys.touch(key.clone());
        let ttl = std::time::Duration::from_secs(key.timeframe.cache_ttl_secs());

        if let Some(fresh) = self.payload_cache.get_fresh(&key, ttl) {
            return Ok(fresh);
        }

        if self.failure.in_cooldown(&key, self.config.failure_cooldown) {
            if let Some(stale) = self.payload_cache.peek(&key) {
                return Ok(stale);
            }
        }

        match self.single_flight.claim_or_wait(key.clone()).await {
            Claim::Mine { key: owned_key, _guard } => {
                let result = self.build_one(&owned_key).await;
                match &result {
                    Ok(payload) => {
                        self.payload_cache.set(owned_key.clone(), payload.clone());
                        self.failure.clear(&owned_key);
                    }
                    Err(_) => {
                        self.failure.mark_failed(owned_key.clone());
                    }
                }
                self.single_flight.finish(&owned_key);
                drop(_guard);
                match result {
                    Ok(payload) => Ok(payload),
                    Err(err) => self
                        .payload_cache
                        .peek(&owned_key)
                        .map(Ok)
                        .unwrap_or(Err(err)),
                }
            }
            Claim::Waiting(gate) => {
                let opened = SingleFlight::<PayloadKey>::wait(&gate, self.config.single_flight_wait).await;
                let _ = opened;
                if let Some(fresh) = self.payload_cache.get_fresh(&key, ttl) {
                    return Ok(fresh);
                }
                if let Some(stale) = self.payload_cache.peek(&key) {
                    return Ok(stale);
                }
                Err(ServiceError::temporary_unavailable(key.to_string()))
            }
        }
    }

    /// Run the transform pipeline for one key: download (with fallback
    /// period re-download per §4.3 step 2), look up symbol classification,
    /// and build the canonical payload.
    async fn build_one(&self, key: &PayloadKey) -> ServiceResult<Payload> {
        let (period, interval) = key.timeframe.upstream_period_interval();
        let mut raw = self
            .upstream
            .download(key.symbol.as_str(), period, interval, key.ext)
            .await?;

        if pipeline::needs_fallback_redownload(&raw, key.timeframe) {
            if let Some(fallback_period) = key.timeframe.fallback_period() {
                raw = self
                    .upstream
                    .download(key.symbol.as_str(), fallback_period, interval, key.ext)
                    .await?;
                if raw.is_empty() && key.ext {
                    raw = self
                        .upstream
                        .download(key.symbol.as_str(), fallback_period, interval, false)
                        .await?;
                }
            }
        }

        let metadata = self.metadata(&key.symbol).await;
        let is_session_bound = !symbol::is_24_7(&key.symbol, Some(&metadata));

        pipeline::build_payload(&key.symbol, key.timeframe, key.ext, is_session_bound, raw)
    }

    /// Symbol metadata, long-TTL cached, tolerating upstream errors by
    /// returning blank fields (the upstream client itself never errors on
    /// `metadata`).
    pub async fn metadata(&self, symbol: &Symbol) -> SymbolMetadata {
        if let Some(fresh) = self
            .metadata_cache
            .get_fresh(symbol, self.config.metadata_ttl)
        {
            return fresh;
        }
        let fetched = self.upstream.metadata(symbol.as_str()).await;
        self.metadata_cache.set(symbol.clone(), fetched.clone());
        fetched
    }
}
