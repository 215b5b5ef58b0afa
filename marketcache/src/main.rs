//! Binary entry point: environment-variable config overrides (§10.4), the
//! `tracing-subscriber` `fmt` subscriber driven by `RUST_LOG`, the hot-set
//! refresher background task, and the axum server with CORS/trace layers.

use std::sync::Arc;
use std::time::Duration;

use marketcache_core::{RouteLimit, ServiceConfig};
use marketcache_http::{router, AppState};
use marketcache_service::MarketCacheService;
use marketcache_upstream::{HttpUpstreamClient, MockUpstreamClient, UpstreamClient};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn env_bool(key: &str, default: bool) -> bool {
    match std::env::var(key) {
        Ok(v) => matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        Err(_) => default,
    }
}

fn env_secs(key: &str, default: Duration) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(default)
}

fn env_rpm(key: &str, default: RouteLimit) -> RouteLimit {
    let rpm = std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(default.rpm);
    RouteLimit { rpm, fresh_multiplier: default.fresh_multiplier }
}

fn build_config() -> ServiceConfig {
    let defaults = ServiceConfig::default();
    ServiceConfig {
        upstream_timeout: env_secs("MARKETCACHE_UPSTREAM_TIMEOUT_SECS", defaults.upstream_timeout),
        failure_cooldown: env_secs("MARKETCACHE_FAILURE_COOLDOWN_SECS", defaults.failure_cooldown),
        refresh_tick: env_secs("MARKETCACHE_REFRESH_TICK_SECS", defaults.refresh_tick),
        chart_data_limit: env_rpm("MARKETCACHE_CHART_DATA_RPM", defaults.chart_data_limit),
        general_limit: env_rpm("MARKETCACHE_GENERAL_RPM", defaults.general_limit),
        rate_limit_enabled: env_bool("MARKETCACHE_RATE_LIMIT_ENABLED", defaults.rate_limit_enabled),
        auth_enabled: env_bool("MARKETCACHE_AUTH_ENABLED", defaults.auth_enabled),
        ..defaults
    }
}

fn build_upstream(config: &ServiceConfig) -> Arc<dyn UpstreamClient> {
    match std::env::var("MARKETCACHE_UPSTREAM_BASE_URL") {
        Ok(base_url) if !base_url.trim().is_empty() => {
            let client = HttpUpstreamClient::builder(base_url)
                .per_call_timeout(config.upstream_timeout)
                .max_retries(config.backoff.max_retries)
                .base_delay_ms(config.backoff.base_delay_ms)
                .jitter_percent(config.backoff.jitter_percent)
                .build()
                .expect("failed to build the upstream HTTP client");
            Arc::new(client)
        }
        _ => {
            warn!("MARKETCACHE_UPSTREAM_BASE_URL not set — serving from an empty mock upstream");
            Arc::new(MockUpstreamClient::new())
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = build_config();
    let upstream = build_upstream(&config);
    let service = Arc::new(MarketCacheService::new(upstream, config));

    let refresher = service.spawn_refresher();
    let quote_refresher = service.spawn_quote_refresher();
    info!("hot-set refreshers started");

    let app = router(AppState::new(service))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let bind_addr = std::env::var("MARKETCACHE_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".into());
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {bind_addr}: {e}"));
    info!(addr = %bind_addr, "marketcache listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server failed");

    refresher.abort();
    quote_refresher.abort();
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    warn!("shutdown signal received");
}
