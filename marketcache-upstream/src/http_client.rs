use std::time::Duration;

use async_trait::async_trait;
use marketcache_core::{Candle, RawFrame, SearchResult, ServiceError, ServiceResult, SymbolMetadata};
use serde::Deserialize;
use url::Url;

use crate::backoff::retry_delay_ms;
use crate::UpstreamClient;

/// Errors constructing an [`HttpUpstreamClient`] (§10.4 validated-at-startup
/// configuration, applied to the one upstream setting that can be wrong:
/// the base URL).
#[derive(Debug, thiserror::Error)]
pub enum HttpUpstreamClientBuildError {
    #[error("invalid upstream base URL: {0}")]
    InvalidBaseUrl(#[from] url::ParseError),
    #[error("failed to build the HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

#[derive(Debug, Deserialize)]
struct ChartResponse {
    #[serde(default)]
    candles: Vec<RawCandle>,
}

#[derive(Debug, Deserialize)]
struct RawCandle {
    time: i64,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    #[serde(default)]
    volume: f64,
}

#[derive(Debug, Deserialize, Default)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResultRow>,
}

#[derive(Debug, Deserialize)]
struct SearchResultRow {
    symbol: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    exchange: String,
    #[serde(rename = "type", default)]
    kind: String,
}

#[derive(Debug, Deserialize, Default)]
struct MetadataResponse {
    #[serde(default)]
    exchange: String,
    #[serde(default)]
    quote_type: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    currency: String,
    #[serde(default)]
    prev_close: Option<f64>,
}

/// A `reqwest`-backed [`UpstreamClient`] against a JSON chart-data API.
#[derive(Debug)]
pub struct HttpUpstreamClient {
    http: reqwest::Client,
    base_url: Url,
    per_call_timeout: Duration,
    max_retries: u32,
    base_delay_ms: u64,
    jitter_percent: u32,
}

impl HttpUpstreamClient {
    #[must_use]
    pub fn builder(base_url: impl Into<String>) -> HttpUpstreamClientBuilder {
        HttpUpstreamClientBuilder::new(base_url)
    }

    /// `base_url` is normalized to a trailing slash at construction so
    /// joining a bare endpoint name never discards a path prefix (the
    /// `Url::join` trap: `"http://h/api".join("chart")` drops `/api`).
    fn endpoint(&self, name: &str) -> Url {
        self.base_url
            .join(name)
            .unwrap_or_else(|e| panic!("{name:?} is not a valid relative URL: {e}"))
    }

    async fn download_once(
        &self,
        symbol: &str,
        period: &str,
        interval: &str,
        include_prepost: bool,
    ) -> Result<RawFrame, reqwest::Error> {
        let url = self.endpoint("chart");
        let resp = self
            .http
            .get(url)
            .query(&[
                ("symbol", symbol),
                ("period", period),
                ("interval", interval),
                ("prepost", if include_prepost { "true" } else { "false" }),
            ])
            .send()
            .await?
            .error_for_status()?;
        let parsed: ChartResponse = resp.json().await?;
        Ok(RawFrame {
            candles: parsed
                .candles
                .into_iter()
                .map(|c| Candle {
                    time: c.time,
                    open: c.open,
                    high: c.high,
                    low: c.low,
                    close: c.close,
                    volume: c.volume,
                })
                .collect(),
        })
    }
}

#[async_trait]
impl UpstreamClient for HttpUpstreamClient {
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self)))]
    async fn download(
        &self,
        symbol: &str,
        period: &str,
        interval: &str,
        include_prepost: bool,
    ) -> ServiceResult<RawFrame> {
        let mut last_err: Option<reqwest::Error> = None;
        for attempt in 0..self.max_retries {
            let attempt_result = tokio::time::timeout(
                self.per_call_timeout,
                self.download_once(symbol, period, interval, include_prepost),
            )
            .await;
            match attempt_result {
                Ok(Ok(frame)) => return Ok(frame),
                Ok(Err(e)) => last_err = Some(e),
                Err(_elapsed) => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(target: "marketcache::upstream", event = "timeout", symbol, attempt);
                }
            }
            if attempt + 1 < self.max_retries {
                let delay = retry_delay_ms(self.base_delay_ms, attempt + 1, self.jitter_percent);
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }
        }
        Err(ServiceError::upstream_failure(
            symbol,
            last_err
                .map(|e| e.to_string())
                .unwrap_or_else(|| "all attempts timed out".to_string()),
        ))
    }

    async fn metadata(&self, symbol: &str) -> SymbolMetadata {
        let url = self.endpoint("meta");
        let result = tokio::time::timeout(
            self.per_call_timeout,
            self.http.get(url).query(&[("symbol", symbol)]).send(),
        )
        .await;
        let Ok(Ok(resp)) = result else {
            return SymbolMetadata::default();
        };
        let Ok(parsed) = resp.json::<MetadataResponse>().await else {
            return SymbolMetadata::default();
        };
        SymbolMetadata {
            exchange: parsed.exchange,
            quote_type: parsed.quote_type,
            name: parsed.name,
            currency: parsed.currency,
            prev_close: parsed.prev_close,
        }
    }

    async fn search(&self, query: &str) -> ServiceResult<Vec<SearchResult>> {
        let url = self.endpoint("search");
        let result = tokio::time::timeout(
            self.per_call_timeout,
            self.http.get(url).query(&[("query", query)]).send(),
        )
        .await;
        let Ok(Ok(resp)) = result else {
            return Err(ServiceError::upstream_failure(query, "search request failed"));
        };
        let Ok(parsed) = resp.json::<SearchResponse>().await else {
            return Err(ServiceError::upstream_failure(query, "search response malformed"));
        };
        Ok(parsed
            .results
            .into_iter()
            .map(|r| SearchResult {
                symbol: r.symbol,
                name: r.name,
                exchange: r.exchange,
                kind: r.kind,
            })
            .collect())
    }
}

/// Chainable builder for [`HttpUpstreamClient`], following the cookie-store
/// client-builder idiom used for upstream quote-provider adapters.
pub struct HttpUpstreamClientBuilder {
    base_url: String,
    per_call_timeout: Duration,
    max_retries: u32,
    base_delay_ms: u64,
    jitter_percent: u32,
}

impl HttpUpstreamClientBuilder {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            per_call_timeout: Duration::from_secs(8),
            max_retries: 3,
            base_delay_ms: 350,
            jitter_percent: 0,
        }
    }

    #[must_use]
    pub fn per_call_timeout(mut self, v: Duration) -> Self {
        self.per_call_timeout = v;
        self
    }

    #[must_use]
    pub fn max_retries(mut self, v: u32) -> Self {
        self.max_retries = v;
        self
    }

    #[must_use]
    pub fn base_delay_ms(mut self, v: u64) -> Self {
        self.base_delay_ms = v;
        self
    }

    #[must_use]
    pub fn jitter_percent(mut self, v: u32) -> Self {
        self.jitter_percent = v;
        self
    }

    /// Build the client. Single-threaded in spirit: no connection-pool
    /// tuning beyond `reqwest`'s defaults, non-adjusted prices assumed by
    /// the upstream API contract. Validates `base_url` up front rather than
    /// deferring the parse failure to the first request.
    pub fn build(self) -> Result<HttpUpstreamClient, HttpUpstreamClientBuildError> {
        let mut base_url = Url::parse(&self.base_url)?;
        if !base_url.path().ends_with('/') {
            let trailing_slash = format!("{}/", base_url.path());
            base_url.set_path(&trailing_slash);
        }
        let http = reqwest::Client::builder().cookie_store(true).build()?;
        Ok(HttpUpstreamClient {
            http,
            base_url,
            per_call_timeout: self.per_call_timeout,
            max_retries: self.max_retries.max(1),
            base_delay_ms: self.base_delay_ms,
            jitter_percent: self.jitter_percent,
        })
    }
}
