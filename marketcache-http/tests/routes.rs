//! Exercises the HTTP surface against the deterministic mock upstream
//! (§10.5): no network, no real time source beyond the request clock.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use marketcache_core::{Candle, RawFrame, ServiceConfig};
use marketcache_http::{router, AppState};
use marketcache_service::MarketCacheService;
use marketcache_upstream::MockUpstreamClient;
use tower::ServiceExt;

fn candles(n: i64) -> Vec<Candle> {
    (0..n)
        .map(|i| Candle {
            time: i * 300,
            open: 10.0,
            high: 10.5,
            low: 9.5,
            close: 10.0,
            volume: 3.0,
        })
        .collect()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_reports_ok() {
    let mock = Arc::new(MockUpstreamClient::new());
    let service = Arc::new(MarketCacheService::new(mock, ServiceConfig::default()));
    let app = router(AppState::new(service));

    let response = app
        .oneshot(Request::builder().uri("/api/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn get_data_returns_payload_for_known_symbol() {
    let mock = Arc::new(MockUpstreamClient::new());
    mock.set_frame("AAPL", RawFrame { candles: candles(300) });
    let service = Arc::new(MarketCacheService::new(mock, ServiceConfig::default()));
    let app = router(AppState::new(service));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/data/AAPL?tf=5m")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert!(body["candles"].as_array().unwrap().len() > 0);
}

#[tokio::test]
async fn get_data_rejects_invalid_symbol() {
    let mock = Arc::new(MockUpstreamClient::new());
    let service = Arc::new(MarketCacheService::new(mock, ServiceConfig::default()));
    let app = router(AppState::new(service));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/data/@@@?tf=5m")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn get_data_reports_upstream_failure_as_bad_gateway() {
    let mock = Arc::new(MockUpstreamClient::new());
    mock.set_failing("NVDA", true);
    let service = Arc::new(MarketCacheService::new(mock, ServiceConfig::default()));
    let app = router(AppState::new(service));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/data/NVDA?tf=5m")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn rate_limit_headers_present_when_enabled() {
    let mock = Arc::new(MockUpstreamClient::new());
    mock.set_frame("AAPL", RawFrame { candles: candles(300) });
    let service = Arc::new(MarketCacheService::new(mock, ServiceConfig::default()));
    let app = router(AppState::new(service));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/data/AAPL?tf=5m")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert!(response.headers().contains_key("x-ratelimit-limit"));
    assert!(response.headers().contains_key("x-ratelimit-remaining"));
}

#[tokio::test]
async fn prewarm_reports_warmed_and_failed_symbols() {
    let mock = Arc::new(MockUpstreamClient::new());
    mock.set_frame("AAPL", RawFrame { candles: candles(300) });
    mock.set_failing("NVDA", true);
    let service = Arc::new(MarketCacheService::new(mock, ServiceConfig::default()));
    let app = router(AppState::new(service));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/prewarm?symbols=AAPL,NVDA&tf=5m")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["warmed"], serde_json::json!(["AAPL"]));
    assert_eq!(body["failed"], serde_json::json!(["NVDA"]));
}

#[tokio::test]
async fn quotes_endpoint_derives_quote_from_payload_and_metadata() {
    let mock = Arc::new(MockUpstreamClient::new());
    mock.set_frame("AAPL", RawFrame { candles: candles(10) });
    let service = Arc::new(MarketCacheService::new(mock, ServiceConfig::default()));
    let app = router(AppState::new(service));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/quotes?symbols=AAPL")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert!(body["quotes"]["AAPL"].is_object());
}

#[tokio::test]
async fn search_returns_empty_results_for_mock_with_no_configured_matches() {
    let mock = Arc::new(MockUpstreamClient::new());
    let service = Arc::new(MarketCacheService::new(mock, ServiceConfig::default()));
    let app = router(AppState::new(service));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/symbols?query=apple")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["results"], serde_json::json!([]));
}
