//! Error types for Tenantgate

use thiserror::Error;

use crate::types::LookupKey;

/// A single cache tier failed to answer
#[derive(Debug, Clone, Error)]
pub enum CacheError {
    #[error("{tier} tier unavailable: {message}")]
    Unavailable { tier: &'static str, message: String },
}

impl CacheError {
    pub fn unavailable(tier: &'static str, message: impl Into<String>) -> Self {
        CacheError::Unavailable {
            tier,
            message: message.into(),
        }
    }

    /// Name of the tier that produced the error
    pub fn tier(&self) -> &'static str {
        match self {
            CacheError::Unavailable { tier, .. } => tier,
        }
    }
}

/// Outcome of an authoritative store lookup that did not produce a tenant
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("No tenant found for {0}")]
    NotFound(String),

    #[error("Tenant store unavailable: {0}")]
    Unavailable(String),
}

/// Resolution through the whole chain failed
#[derive(Debug, Clone, Error)]
pub enum ResolveError {
    #[error("Tenant not found for {0}")]
    NotFound(LookupKey),

    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),
}

impl ResolveError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ResolveError::NotFound(_))
    }
}

/// Invalidation did not reach every tier
#[derive(Debug, Clone, Error)]
pub enum InvalidateError {
    #[error("Invalidation failed on {} tier(s), succeeded on {succeeded}", .failed.len())]
    PartialFailure {
        failed: Vec<CacheError>,
        succeeded: usize,
    },
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_error_reports_tier() {
        let err = CacheError::unavailable("redis", "connection refused");
        assert_eq!(err.tier(), "redis");
        assert_eq!(err.to_string(), "redis tier unavailable: connection refused");
    }

    #[test]
    fn test_resolve_error_kinds() {
        let not_found = ResolveError::NotFound(LookupKey::for_hostname("a.example.com"));
        assert!(not_found.is_not_found());
        assert_eq!(not_found.to_string(), "Tenant not found for t-a.example.com");

        let unavailable = ResolveError::UpstreamUnavailable("pool timed out".to_string());
        assert!(!unavailable.is_not_found());
    }

    #[test]
    fn test_partial_failure_message() {
        let err = InvalidateError::PartialFailure {
            failed: vec![CacheError::unavailable("redis", "timeout")],
            succeeded: 1,
        };
        assert_eq!(
            err.to_string(),
            "Invalidation failed on 1 tier(s), succeeded on 1"
        );
    }
}
