//! Admin bearer-token authentication

use axum::http::{header, HeaderMap};
use subtle::ConstantTimeEq;

use crate::error::ApiError;

/// Check `Authorization: Bearer <token>` against the configured admin token
pub fn verify_bearer(headers: &HeaderMap, expected: &str) -> Result<(), ApiError> {
    let provided = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .ok_or(ApiError::Unauthorized)?;

    if provided.is_empty() || !constant_time_compare(provided, expected) {
        tracing::warn!("Rejected admin request with invalid bearer token");
        return Err(ApiError::Unauthorized);
    }

    Ok(())
}

/// Constant-time comparison to prevent timing attacks
fn constant_time_compare(a: &str, b: &str) -> bool {
    // Even when lengths differ, we do constant-time work to avoid leaking length
    if a.len() != b.len() {
        let dummy = vec![0u8; a.len()];
        let _ = a.as_bytes().ct_eq(&dummy);
        return false;
    }

    a.as_bytes().ct_eq(b.as_bytes()).into()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    const TOKEN: &str = "test-admin-token-with-at-least-32-chars";

    fn headers_with(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn test_valid_token() {
        let headers = headers_with("Bearer test-admin-token-with-at-least-32-chars");
        assert!(verify_bearer(&headers, TOKEN).is_ok());
    }

    #[test]
    fn test_missing_header() {
        assert!(matches!(
            verify_bearer(&HeaderMap::new(), TOKEN),
            Err(ApiError::Unauthorized)
        ));
    }

    #[test]
    fn test_wrong_scheme_and_token() {
        assert!(verify_bearer(&headers_with("Basic dXNlcjpwYXNz"), TOKEN).is_err());
        assert!(verify_bearer(&headers_with("Bearer wrong"), TOKEN).is_err());
        assert!(verify_bearer(&headers_with("Bearer "), TOKEN).is_err());
        assert!(verify_bearer(&headers_with(TOKEN), TOKEN).is_err());
    }

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("abc", "abc"));
        assert!(!constant_time_compare("abc", "abd"));
        assert!(!constant_time_compare("abc", "abcd"));
    }
}
