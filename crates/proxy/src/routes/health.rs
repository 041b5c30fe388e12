//! Health check endpoints

use axum::{extract::State, http::StatusCode};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Liveness probe (just returns 200 if the server is running)
pub async fn liveness() -> StatusCode {
    StatusCode::OK
}

/// Readiness probe (checks that the tenant store answers)
pub async fn readiness(State(state): State<AppState>) -> ApiResult<StatusCode> {
    state.store.ping().await.map_err(|e| {
        tracing::warn!(error = %e, "Readiness check failed");
        ApiError::ServiceUnavailable
    })?;
    Ok(StatusCode::OK)
}
