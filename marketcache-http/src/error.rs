//! Maps the service error taxonomy (§7) onto HTTP status and the
//! `{detail: "..."}` body shape.

use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use marketcache_core::ServiceError;
use serde_json::json;

pub struct ApiError(pub ServiceError);

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, retry_after) = match &self.0 {
            ServiceError::InvalidArgument { .. } => (StatusCode::BAD_REQUEST, None),
            ServiceError::NotFound { .. } => (StatusCode::NOT_FOUND, None),
            ServiceError::RateLimited { retry_after_secs } => {
                (StatusCode::TOO_MANY_REQUESTS, Some(*retry_after_secs))
            }
            ServiceError::TemporaryUnavailable { .. } => (StatusCode::SERVICE_UNAVAILABLE, None),
            ServiceError::UpstreamFailure { .. } => (StatusCode::BAD_GATEWAY, None),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, None),
        };
        let mut response = (status, Json(json!({ "detail": self.0.to_string() }))).into_response();
        if let Some(secs) = retry_after {
            if let Ok(value) = HeaderValue::from_str(&secs.to_string()) {
                response.headers_mut().insert("Retry-After", value);
            }
        }
        response
    }
}
