//! Cache invalidation endpoint
//!
//! `DELETE /invalidate?hostname=<h>` removes the hostname's key from every
//! cache tier. Only the tenant cache is touched; rate-limit counters are left
//! alone.

use axum::{
    extract::{Query, State},
    http::HeaderMap,
    Json,
};
use serde::{Deserialize, Serialize};
use tenantgate_shared::LookupKey;

use crate::auth::verify_bearer;
use crate::error::{ApiError, ApiResult};
use crate::routing::parse_hostname;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct InvalidateParams {
    pub hostname: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct InvalidateResponse {
    pub invalidated: String,
}

/// Evict a hostname from the resolution cache chain
pub async fn invalidate(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<InvalidateParams>,
) -> ApiResult<Json<InvalidateResponse>> {
    verify_bearer(&headers, &state.config.auth_token)?;

    let raw = params
        .hostname
        .filter(|h| !h.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("hostname query parameter is required".to_string()))?;

    let hostname = parse_hostname(&raw)
        .ok_or_else(|| ApiError::BadRequest("hostname is not a valid host".to_string()))?;

    let key = LookupKey::for_hostname(&hostname);
    state.resolver.invalidate(&key).await.map_err(|e| {
        tracing::error!(hostname = %hostname, error = %e, "Invalidation incomplete");
        ApiError::InvalidationFailed(e.to_string())
    })?;

    Ok(Json(InvalidateResponse {
        invalidated: hostname,
    }))
}
