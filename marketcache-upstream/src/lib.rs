//! The Upstream Client: bounded-retry OHLCV downloads and symbol metadata
//! lookups, isolated behind a trait so the rest of the workspace never
//! depends on a concrete HTTP implementation.

pub mod backoff;
pub mod http_client;
pub mod mock;

use async_trait::async_trait;
use marketcache_core::{RawFrame, SearchResult, ServiceResult, SymbolMetadata};

/// The operations the service core needs from an upstream quote provider.
#[async_trait]
pub trait UpstreamClient: Send + Sync {
    /// Download OHLCV for `symbol` at the given upstream `(period,
    /// interval)`. Returns an empty frame as a valid value; only errors when
    /// every retry attempt failed.
    async fn download(
        &self,
        symbol: &str,
        period: &str,
        interval: &str,
        include_prepost: bool,
    ) -> ServiceResult<RawFrame>;

    /// Fetch symbol metadata, tolerating upstream errors by returning blank
    /// fields rather than propagating.
    async fn metadata(&self, symbol: &str) -> SymbolMetadata;

    /// Resolve a free-text query to candidate symbols. Default implementation
    /// returns no results; concrete clients that front a provider with a
    /// search endpoint override this.
    async fn search(&self, _query: &str) -> ServiceResult<Vec<SearchResult>> {
        Ok(Vec::new())
    }
}

pub use http_client::{HttpUpstreamClient, HttpUpstreamClientBuilder};
pub use mock::MockUpstreamClient;
