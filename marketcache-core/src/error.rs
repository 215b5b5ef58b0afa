use thiserror::Error;

/// The error taxonomy surfaced to every caller of the market-data cache core.
///
/// Each variant carries enough context to both log a useful line and answer
/// at a transport boundary without the caller re-deriving anything.
#[derive(Debug, Error, Clone)]
#[non_exhaustive]
pub enum ServiceError {
    /// Malformed symbol, unknown timeframe under strict parsing, unparseable
    /// `since`, or a missing required parameter.
    #[error("invalid argument: {msg}")]
    InvalidArgument { msg: String },

    /// All upstream download retries were exhausted, or the upstream
    /// returned an empty frame for a request that required data.
    #[error("upstream failure for {symbol}: {msg}")]
    UpstreamFailure { symbol: String, msg: String },

    /// The upstream is in cooldown for this key and no cached payload
    /// exists to fall back on.
    #[error("temporarily unavailable for {key}")]
    TemporaryUnavailable { key: String },

    /// The caller's per-client rate-limit bucket for this route class was
    /// exceeded; retry after `retry_after_secs`.
    #[error("rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    /// The symbol resolved but yielded no data in any fallback period.
    #[error("not found: {what}")]
    NotFound { what: String },
}

impl ServiceError {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument { msg: msg.into() }
    }

    pub fn upstream_failure(symbol: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::UpstreamFailure {
            symbol: symbol.into(),
            msg: msg.into(),
        }
    }

    pub fn temporary_unavailable(key: impl Into<String>) -> Self {
        Self::TemporaryUnavailable { key: key.into() }
    }

    pub fn rate_limited(retry_after_secs: u64) -> Self {
        Self::RateLimited { retry_after_secs }
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    /// Whether this error should never be retried by the caller.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::InvalidArgument { .. } | Self::NotFound { .. })
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
