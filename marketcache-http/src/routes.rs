//! Route handlers matching §6 exactly, plus the rate-limit headers and
//! fresh-cache boost from §4.9/§10.6.

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use marketcache_ratelimit::{RateLimitDecision, RouteClass};
use serde_json::json;

use crate::error::ApiError;
use crate::params::{parse_ext, parse_since, split_symbols_csv};
use crate::sse;
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/data/:symbol", get(get_data))
        .route("/api/data_delta/:symbol", get(get_data_delta))
        .route("/api/stream/data/:symbol", get(stream_data))
        .route("/api/quotes", get(get_quotes))
        .route("/api/stream/quotes", get(stream_quotes))
        .route("/api/symbols", get(search_symbols))
        .route("/api/prewarm", get(prewarm))
        .with_state(state)
}

fn now_unix() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

fn client_id(headers: &HeaderMap) -> String {
    headers
        .get("x-client-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("anonymous")
        .to_string()
}

fn apply_rate_limit_headers(mut response: Response, decision: &RateLimitDecision) -> Response {
    if let Ok(limit) = HeaderValue::from_str(&decision.limit.to_string()) {
        response.headers_mut().insert("X-RateLimit-Limit", limit);
    }
    if let Ok(remaining) = HeaderValue::from_str(&decision.remaining.to_string()) {
        response.headers_mut().insert("X-RateLimit-Remaining", remaining);
    }
    response
}

fn with_optional_headers(resp: Response, decision: Option<RateLimitDecision>) -> Response {
    match decision {
        Some(d) => apply_rate_limit_headers(resp, &d),
        None => resp,
    }
}

fn rate_limited_response(decision: RateLimitDecision) -> Response {
    let mut response = (
        StatusCode::TOO_MANY_REQUESTS,
        Json(json!({ "detail": "rate limit exceeded" })),
    )
        .into_response();
    if let Ok(v) = HeaderValue::from_str(&decision.retry_after_secs.to_string()) {
        response.headers_mut().insert("Retry-After", v);
    }
    apply_rate_limit_headers(response, &decision)
}

/// Returns `None` (caller should proceed unheadered) when rate limiting is
/// disabled, `Some(Err(response))` when the request must be rejected, or
/// `Some(Ok(decision))` to stamp the eventual response.
fn check_rate_limit(
    state: &AppState,
    headers: &HeaderMap,
    class: RouteClass,
    fresh: bool,
) -> Result<Option<RateLimitDecision>, Response> {
    if !state.service.config().rate_limit_enabled {
        return Ok(None);
    }
    let decision = state
        .service
        .check_rate_limit(&client_id(headers), class, fresh, now_unix());
    if decision.allowed {
        Ok(Some(decision))
    } else {
        Err(rate_limited_response(decision))
    }
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let health = state.service.health(now_unix());
    Json(json!({
        "status": health.status,
        "ts": health.ts,
        "auth_enabled": health.auth_enabled,
        "rate_limit_enabled": health.rate_limit_enabled,
    }))
}

async fn get_data(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
    Query(q): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    let tf = q.get("tf").map_or("5m", String::as_str);
    let ext = parse_ext(q.get("ext").map(String::as_str));
    let fresh = state.service.is_fresh(&symbol, tf, ext);

    let decision = match check_rate_limit(&state, &headers, RouteClass::ChartData, fresh) {
        Ok(d) => d,
        Err(resp) => return resp,
    };

    match state.service.get_payload(&symbol, tf, ext).await {
        Ok(payload) => with_optional_headers(Json(payload).into_response(), decision),
        Err(err) => ApiError(err).into_response(),
    }
}

async fn get_data_delta(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
    Query(q): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    let tf = q.get("tf").map_or("5m", String::as_str);
    let ext = parse_ext(q.get("ext").map(String::as_str));
    let since = parse_since(q.get("since").map(String::as_str));
    let fresh = state.service.is_fresh(&symbol, tf, ext);

    let decision = match check_rate_limit(&state, &headers, RouteClass::ChartData, fresh) {
        Ok(d) => d,
        Err(resp) => return resp,
    };

    match state.service.get_delta(&symbol, tf, ext, since).await {
        Ok(delta) => with_optional_headers(Json(delta).into_response(), decision),
        Err(err) => ApiError(err).into_response(),
    }
}

async fn stream_data(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
    Query(q): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    let tf = q.get("tf").map_or("5m", String::as_str).to_string();
    let ext = parse_ext(q.get("ext").map(String::as_str));
    let since = parse_since(q.get("since").map(String::as_str));
    let fresh = state.service.is_fresh(&symbol, &tf, ext);

    if let Err(resp) = check_rate_limit(&state, &headers, RouteClass::ChartData, fresh) {
        return resp;
    }

    match state.service.stream(&symbol, &tf, ext, since) {
        Ok(handle) => {
            // Keeping `handle.stop` bundled with the receiver means both
            // drop together when the transport disconnects, which is what
            // makes the push loop's `stop.changed()` observe the close.
            sse::to_sse(sse::payload_events(handle.frames, handle.stop)).into_response()
        }
        Err(err) => ApiError(err).into_response(),
    }
}

async fn get_quotes(
    State(state): State<AppState>,
    Query(q): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    let symbols = q.get("symbols").map(|s| split_symbols_csv(s)).unwrap_or_default();
    let ext = parse_ext(q.get("ext").map(String::as_str));

    let decision = match check_rate_limit(&state, &headers, RouteClass::General, false) {
        Ok(d) => d,
        Err(resp) => return resp,
    };

    let result = state.service.get_quotes(&symbols, ext).await;
    let resp = Json(json!({ "quotes": result.quotes, "stale": result.stale })).into_response();
    with_optional_headers(resp, decision)
}

async fn stream_quotes(
    State(state): State<AppState>,
    Query(q): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    let symbols = q.get("symbols").map(|s| split_symbols_csv(s)).unwrap_or_default();
    let ext = parse_ext(q.get("ext").map(String::as_str));

    if let Err(resp) = check_rate_limit(&state, &headers, RouteClass::General, false) {
        return resp;
    }

    let (tx, rx) = tokio::sync::mpsc::channel(8);
    let service = state.service.clone();
    tokio::spawn(async move {
        crate::quote_stream::run(service, symbols, ext, tx).await;
    });
    sse::to_sse(sse::quote_events(rx)).into_response()
}

async fn search_symbols(
    State(state): State<AppState>,
    Query(q): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    let query = q.get("query").cloned().unwrap_or_default();
    let decision = match check_rate_limit(&state, &headers, RouteClass::General, false) {
        Ok(d) => d,
        Err(resp) => return resp,
    };

    match state.service.search(&query).await {
        Ok(results) => {
            let resp = Json(json!({ "query": query, "results": results })).into_response();
            with_optional_headers(resp, decision)
        }
        Err(_) => Json(json!({ "query": query, "results": [], "error": "search_failed" }))
            .into_response(),
    }
}

async fn prewarm(
    State(state): State<AppState>,
    Query(q): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    let symbols = q.get("symbols").map(|s| split_symbols_csv(s)).unwrap_or_default();
    let tf = q.get("tf").map_or("5m", String::as_str);
    let ext = parse_ext(q.get("ext").map(String::as_str));

    let decision = match check_rate_limit(&state, &headers, RouteClass::General, false) {
        Ok(d) => d,
        Err(resp) => return resp,
    };

    let report = state.service.prewarm(&symbols, tf, ext).await;
    let resp = Json(json!({
        "warmed": report.warmed,
        "symbols": report.warmed.iter().chain(report.failed.iter()).collect::<Vec<_>>(),
        "failed": report.failed,
        "tf": report.timeframe,
        "ext": report.ext,
    }))
    .into_response();
    with_optional_headers(resp, decision)
}
