//! A deterministic, injectable mock upstream used by integration tests:
//! callers register canned frames/metadata per symbol and can flip a
//! failure switch to exercise cooldown and stale-fallback behavior.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use marketcache_core::{RawFrame, SearchResult, ServiceError, ServiceResult, SymbolMetadata};

use crate::UpstreamClient;

#[derive(Default)]
struct MockState {
    frames: HashMap<String, RawFrame>,
    metadata: HashMap<String, SymbolMetadata>,
    failing_symbols: HashMap<String, bool>,
    search_results: HashMap<String, Vec<SearchResult>>,
}

/// Mock implementation of [`UpstreamClient`]. Thread-safe, cheaply cloned
/// handle semantics via `Arc` at the call site.
pub struct MockUpstreamClient {
    state: Mutex<MockState>,
    download_calls: AtomicUsize,
}

impl Default for MockUpstreamClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MockUpstreamClient {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState::default()),
            download_calls: AtomicUsize::new(0),
        }
    }

    pub fn set_frame(&self, symbol: &str, frame: RawFrame) {
        self.state
            .lock()
            .expect("mock state mutex poisoned")
            .frames
            .insert(symbol.to_string(), frame);
    }

    pub fn set_metadata(&self, symbol: &str, metadata: SymbolMetadata) {
        self.state
            .lock()
            .expect("mock state mutex poisoned")
            .metadata
            .insert(symbol.to_string(), metadata);
    }

    pub fn set_failing(&self, symbol: &str, failing: bool) {
        self.state
            .lock()
            .expect("mock state mutex poisoned")
            .failing_symbols
            .insert(symbol.to_string(), failing);
    }

    pub fn set_search_results(&self, query: &str, results: Vec<SearchResult>) {
        self.state
            .lock()
            .expect("mock state mutex poisoned")
            .search_results
            .insert(query.to_string(), results);
    }

    #[must_use]
    pub fn download_call_count(&self) -> usize {
        self.download_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UpstreamClient for MockUpstreamClient {
    async fn download(
        &self,
        symbol: &str,
        _period: &str,
        _interval: &str,
        _include_prepost: bool,
    ) -> ServiceResult<RawFrame> {
        self.download_calls.fetch_add(1, Ordering::SeqCst);
        let state = self.state.lock().expect("mock state mutex poisoned");
        if state.failing_symbols.get(symbol).copied().unwrap_or(false) {
            return Err(ServiceError::upstream_failure(symbol, "mock upstream failure"));
        }
        Ok(state.frames.get(symbol).cloned().unwrap_or_default())
    }

    async fn metadata(&self, symbol: &str) -> SymbolMetadata {
        self.state
            .lock()
            .expect("mock state mutex poisoned")
            .metadata
            .get(symbol)
            .cloned()
            .unwrap_or_default()
    }

    async fn search(&self, query: &str) -> ServiceResult<Vec<SearchResult>> {
        Ok(self
            .state
            .lock()
            .expect("mock state mutex poisoned")
            .search_results
            .get(query)
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marketcache_core::Candle;

    #[tokio::test]
    async fn returns_configured_frame() {
        let mock = MockUpstreamClient::new();
        mock.set_frame(
            "AAPL",
            RawFrame {
                candles: vec![Candle {
                    time: 0,
                    open: 1.0,
                    high: 1.0,
                    low: 1.0,
                    close: 1.0,
                    volume: 1.0,
                }],
            },
        );
        let frame = mock.download("AAPL", "1d", "1m", false).await.unwrap();
        assert_eq!(frame.len(), 1);
        assert_eq!(mock.download_call_count(), 1);
    }

    #[tokio::test]
    async fn failing_symbol_returns_upstream_failure() {
        let mock = MockUpstreamClient::new();
        mock.set_failing("NVDA", true);
        let err = mock.download("NVDA", "5d", "15m", false).await.unwrap_err();
        assert!(matches!(err, ServiceError::UpstreamFailure { .. }));
    }
}
