//! Clock & Configuration: TTL tables, retry/timeout, and rate-limit defaults.

use std::time::Duration;

/// Backoff configuration for upstream download retries.
#[derive(Debug, Clone, Copy)]
pub struct BackoffConfig {
    pub base_delay_ms: u64,
    pub max_retries: u32,
    pub jitter_percent: u32,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: 350,
            max_retries: 3,
            jitter_percent: 0,
        }
    }
}

/// Per-route-class rate-limit parameters.
#[derive(Debug, Clone, Copy)]
pub struct RouteLimit {
    pub rpm: u64,
    pub fresh_multiplier: u64,
}

/// Global configuration for the market-data cache core.
///
/// Built with a chainable builder; `Default` matches the literal defaults
/// spelled out by the component design.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub upstream_timeout: Duration,
    pub backoff: BackoffConfig,
    pub failure_cooldown: Duration,
    pub refresh_tick: Duration,
    pub hot_window: Duration,
    pub single_flight_wait: Duration,
    pub quote_ttl: Duration,
    pub metadata_ttl: Duration,
    pub search_ttl: Duration,
    pub chart_data_limit: RouteLimit,
    pub general_limit: RouteLimit,
    pub rate_limit_bucket_soft_cap: usize,
    pub stream_keepalive: Duration,
    pub prewarm_cap: usize,
    pub symbols_csv_cap: usize,
    pub rate_limit_enabled: bool,
    pub auth_enabled: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            upstream_timeout: Duration::from_secs(8),
            backoff: BackoffConfig::default(),
            failure_cooldown: Duration::from_secs(60),
            refresh_tick: Duration::from_secs(5),
            hot_window: Duration::from_secs(600),
            single_flight_wait: Duration::from_secs(12),
            quote_ttl: Duration::from_secs(15),
            metadata_ttl: Duration::from_secs(3600),
            search_ttl: Duration::from_secs(300),
            chart_data_limit: RouteLimit {
                rpm: 600,
                fresh_multiplier: 12,
            },
            general_limit: RouteLimit {
                rpm: 120,
                fresh_multiplier: 6,
            },
            rate_limit_bucket_soft_cap: 8000,
            stream_keepalive: Duration::from_secs(30),
            prewarm_cap: 20,
            symbols_csv_cap: 50,
            rate_limit_enabled: true,
            auth_enabled: false,
        }
    }
}

/// Chainable builder for [`ServiceConfig`], in the teacher's `#[must_use]
/// const fn` style.
#[derive(Debug, Clone, Default)]
pub struct ServiceConfigBuilder {
    config: ServiceConfigInner,
}

/// Thin wrapper so the builder can hold an `Option` per field and fall back
/// to `ServiceConfig::default()` for anything unset.
#[derive(Debug, Clone, Default)]
struct ServiceConfigInner {
    upstream_timeout: Option<Duration>,
    failure_cooldown: Option<Duration>,
    refresh_tick: Option<Duration>,
    chart_data_limit: Option<RouteLimit>,
    general_limit: Option<RouteLimit>,
    rate_limit_enabled: Option<bool>,
}

impl ServiceConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn upstream_timeout(mut self, v: Duration) -> Self {
        self.config.upstream_timeout = Some(v);
        self
    }

    #[must_use]
    pub fn failure_cooldown(mut self, v: Duration) -> Self {
        self.config.failure_cooldown = Some(v);
        self
    }

    #[must_use]
    pub fn refresh_tick(mut self, v: Duration) -> Self {
        self.config.refresh_tick = Some(v);
        self
    }

    #[must_use]
    pub fn chart_data_limit(mut self, v: RouteLimit) -> Self {
        self.config.chart_data_limit = Some(v);
        self
    }

    #[must_use]
    pub fn general_limit(mut self, v: RouteLimit) -> Self {
        self.config.general_limit = Some(v);
        self
    }

    #[must_use]
    pub fn rate_limit_enabled(mut self, v: bool) -> Self {
        self.config.rate_limit_enabled = Some(v);
        self
    }

    #[must_use]
    pub fn build(self) -> ServiceConfig {
        let defaults = ServiceConfig::default();
        ServiceConfig {
            upstream_timeout: self.config.upstream_timeout.unwrap_or(defaults.upstream_timeout),
            failure_cooldown: self.config.failure_cooldown.unwrap_or(defaults.failure_cooldown),
            refresh_tick: self.config.refresh_tick.unwrap_or(defaults.refresh_tick),
            chart_data_limit: self.config.chart_data_limit.unwrap_or(defaults.chart_data_limit),
            general_limit: self.config.general_limit.unwrap_or(defaults.general_limit),
            rate_limit_enabled: self.config.rate_limit_enabled.unwrap_or(defaults.rate_limit_enabled),
            ..defaults
        }
    }
}
