//! HTTP routes

pub mod health;
pub mod invalidate;
pub mod proxy;

use axum::{
    http::HeaderMap,
    routing::{delete, get},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Extract client IP address from request headers.
/// Checks common proxy headers in order of preference.
pub fn extract_client_ip(headers: &HeaderMap) -> Option<String> {
    headers
        .get("cf-connecting-ip") // Cloudflare
        .or_else(|| headers.get("x-real-ip"))
        .or_else(|| headers.get("x-forwarded-for"))
        .and_then(|h| h.to_str().ok())
        .map(|s| s.split(',').next().unwrap_or(s).trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Build the gateway router.
///
/// Fixed paths are served by the gateway itself; every other request is
/// forwarded to the tenant owning its Host header.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(health::liveness))
        .route("/readyz", get(health::readiness))
        .route("/invalidate", delete(invalidate::invalidate))
        .fallback(proxy::proxy)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
