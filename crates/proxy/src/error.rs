//! Gateway error types and HTTP mapping

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Errors surfaced to HTTP clients
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    // Authentication errors
    #[error("Authentication required")]
    Unauthorized,

    // Validation errors
    #[error("Invalid request: {0}")]
    BadRequest(String),
    #[error("Request body too large")]
    PayloadTooLarge,

    // Rate limiting
    #[error("Too many requests")]
    RateLimited,

    // Routing errors
    #[error("Bad gateway")]
    BadGateway,
    #[error("Proxy error")]
    ProxyError,

    // Cache management
    #[error("Cache invalidation failed: {0}")]
    InvalidationFailed(String),

    // Readiness
    #[error("Service unavailable")]
    ServiceUnavailable,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            // Authentication
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", self.to_string()),

            // Validation
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            ApiError::PayloadTooLarge => (StatusCode::PAYLOAD_TOO_LARGE, "PAYLOAD_TOO_LARGE", self.to_string()),

            // Rate limiting
            ApiError::RateLimited => (StatusCode::TOO_MANY_REQUESTS, "RATE_LIMITED", self.to_string()),

            // Routing
            ApiError::BadGateway => (StatusCode::BAD_GATEWAY, "BAD_GATEWAY", self.to_string()),
            ApiError::ProxyError => (StatusCode::BAD_GATEWAY, "PROXY_ERROR", self.to_string()),

            // Cache management
            ApiError::InvalidationFailed(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "INVALIDATION_FAILED", msg.clone()),

            // Readiness
            ApiError::ServiceUnavailable => (StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE", self.to_string()),
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type alias for gateway handlers
pub type ApiResult<T> = Result<T, ApiError>;
