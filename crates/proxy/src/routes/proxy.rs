//! Catch-all proxy handler
//!
//! Per request: rate check -> tenant resolution -> routing decision -> dispatch.
//! Only a failed resolution counts against the client's limiter budget.

use axum::{
    body::Body,
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderMap},
    response::Response,
};
use std::net::{IpAddr, SocketAddr};
use tenantgate_shared::LookupKey;

use super::extract_client_ip;
use crate::dispatch::{DispatchError, ForwardContext};
use crate::error::{ApiError, ApiResult};
use crate::routing::{determine_backend, extract_hostname, Scheme};
use crate::state::AppState;

/// Forward a request to the tenant owning its Host header
pub async fn proxy(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> ApiResult<Response> {
    let trust_headers = state.config.trust_proxy_headers;
    let client_ip = resolve_client_ip(peer, request.headers(), trust_headers);
    let client = client_ip.to_string();

    if state.rate_limiter.should_limit(&client).await {
        return Err(ApiError::RateLimited);
    }

    let hostname = extract_hostname(request.headers())
        .ok_or_else(|| ApiError::BadRequest("Missing or invalid Host header".to_string()))?;
    let key = LookupKey::for_hostname(&hostname);

    let tenant = match state.resolver.resolve(&key).await {
        Ok(tenant) => tenant,
        Err(e) => {
            if e.is_not_found() {
                tracing::info!(host = %hostname, client = %client, "Unknown host");
            } else {
                tracing::error!(
                    host = %hostname,
                    client = %client,
                    error = %e,
                    "Tenant resolution failed"
                );
            }
            match state.rate_limiter.increment(&client).await {
                Ok(count) => tracing::debug!(client = %client, count, "Failed resolution recorded"),
                Err(err) => tracing::warn!(
                    client = %client,
                    error = %err,
                    "Failed to record failed resolution"
                ),
            }
            return Err(ApiError::BadGateway);
        }
    };

    let scheme = detect_scheme(request.headers(), trust_headers);
    let target = determine_backend(&tenant, scheme, &state.config.target_backend).map_err(|e| {
        tracing::error!(
            host = %hostname,
            tenant = %tenant,
            error = %e,
            "Cannot build upstream target"
        );
        ApiError::BadGateway
    })?;

    let ctx = ForwardContext {
        client_ip,
        original_host: request.headers().get(header::HOST).cloned(),
        scheme,
    };

    state
        .dispatcher
        .dispatch(&target, request, ctx)
        .await
        .map_err(|e| match e {
            DispatchError::BodyTooLarge(_) => ApiError::PayloadTooLarge,
            other => {
                tracing::error!(
                    host = %hostname,
                    upstream = %target,
                    error = %other,
                    "Proxy error"
                );
                ApiError::ProxyError
            }
        })
}

/// Client address used as the rate-limit key
fn resolve_client_ip(peer: SocketAddr, headers: &HeaderMap, trust_headers: bool) -> IpAddr {
    if trust_headers {
        if let Some(ip) = extract_client_ip(headers).and_then(|ip| ip.parse().ok()) {
            return ip;
        }
    }
    peer.ip()
}

/// Scheme of the original connection.
///
/// TLS is terminated in front of the gateway, so `https` is only known when a
/// trusted proxy says so.
fn detect_scheme(headers: &HeaderMap, trust_headers: bool) -> Scheme {
    let forwarded_https = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().eq_ignore_ascii_case("https"))
        .unwrap_or(false);

    if trust_headers && forwarded_https {
        Scheme::Https
    } else {
        Scheme::Http
    }
}
