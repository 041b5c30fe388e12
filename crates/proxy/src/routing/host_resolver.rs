//! Host-to-Tenant Resolution
//!
//! Resolves lookup keys to tenant IDs through an ordered list of cache tiers,
//! falling back to the authoritative store when every tier misses:
//!
//! ```text
//! memory --miss--> redis --miss--> tenant store
//!   ^                ^                  |
//!   +----------------+---- write-back --+
//! ```
//!
//! A tier error is logged and treated as a miss. Values found in a slower
//! tier are written back into every faster tier that missed. Misses are never
//! cached, and concurrent misses for the same key are not deduplicated.

use axum::http::{header, HeaderMap};
use std::sync::Arc;
use tenantgate_shared::{
    CacheError, InvalidateError, LookupKey, ResolveError, StoreError, TenantId, TenantStore,
};

use super::cache::CacheTier;

/// Maximum hostname length per DNS specification
const MAX_HOSTNAME_LEN: usize = 253;

/// Tiered tenant resolver
#[derive(Clone)]
pub struct TenantResolver {
    tiers: Vec<Arc<dyn CacheTier<TenantId>>>,
    store: Arc<dyn TenantStore>,
}

impl TenantResolver {
    /// Create a resolver; `tiers` are consulted fastest first
    pub fn new(tiers: Vec<Arc<dyn CacheTier<TenantId>>>, store: Arc<dyn TenantStore>) -> Self {
        Self { tiers, store }
    }

    /// Names of the configured tiers, in lookup order
    pub fn tier_names(&self) -> Vec<&'static str> {
        self.tiers.iter().map(|t| t.name()).collect()
    }

    /// Resolve a lookup key to a tenant ID
    pub async fn resolve(&self, key: &LookupKey) -> Result<TenantId, ResolveError> {
        for (idx, tier) in self.tiers.iter().enumerate() {
            match tier.get(key.as_str()).await {
                Ok(Some(tenant)) => {
                    tracing::debug!(key = %key, tier = tier.name(), tenant = %tenant, "Cache hit");
                    self.write_back(&self.tiers[..idx], key, &tenant).await;
                    return Ok(tenant);
                }
                Ok(None) => {
                    tracing::trace!(key = %key, tier = tier.name(), "Cache miss");
                }
                Err(e) => {
                    tracing::warn!(
                        key = %key,
                        tier = tier.name(),
                        error = %e,
                        "Cache tier lookup failed, continuing down the chain"
                    );
                }
            }
        }

        match self.store.get_tenant(key).await {
            Ok(tenant) => {
                tracing::debug!(key = %key, tenant = %tenant, "Resolved from tenant store");
                self.write_back(&self.tiers, key, &tenant).await;
                Ok(tenant)
            }
            Err(StoreError::NotFound(_)) => {
                tracing::debug!(key = %key, "No tenant for host");
                Err(ResolveError::NotFound(key.clone()))
            }
            Err(StoreError::Unavailable(message)) => {
                tracing::error!(key = %key, error = %message, "Tenant store unavailable");
                Err(ResolveError::UpstreamUnavailable(message))
            }
        }
    }

    /// Populate tiers that missed with a value found further down
    async fn write_back(
        &self,
        tiers: &[Arc<dyn CacheTier<TenantId>>],
        key: &LookupKey,
        tenant: &TenantId,
    ) {
        for tier in tiers {
            if let Err(e) = tier.set(key.as_str(), tenant.clone()).await {
                tracing::warn!(
                    key = %key,
                    tier = tier.name(),
                    error = %e,
                    "Cache write-back failed"
                );
            }
        }
    }

    /// Remove a key from every tier.
    ///
    /// All tiers are attempted even after a failure; any failure is reported
    /// because the failed tier may still serve the stale value.
    pub async fn invalidate(&self, key: &LookupKey) -> Result<(), InvalidateError> {
        let mut failed: Vec<CacheError> = Vec::new();
        let mut succeeded = 0;

        for tier in &self.tiers {
            match tier.delete(key.as_str()).await {
                Ok(()) => succeeded += 1,
                Err(e) => {
                    tracing::error!(
                        key = %key,
                        tier = tier.name(),
                        error = %e,
                        "Cache invalidation failed"
                    );
                    failed.push(e);
                }
            }
        }

        if failed.is_empty() {
            tracing::info!(key = %key, tiers = succeeded, "Cache entry invalidated");
            Ok(())
        } else {
            Err(InvalidateError::PartialFailure { failed, succeeded })
        }
    }
}

/// Normalize a host header value
pub fn normalize_host(host: &str) -> String {
    // Remove port if present
    let host = host.split(':').next().unwrap_or(host);
    // Drop the root label dot and lowercase
    host.trim_end_matches('.').to_lowercase()
}

/// Normalize and validate a hostname; `None` if it cannot be a DNS name
pub fn parse_hostname(raw: &str) -> Option<String> {
    let hostname = normalize_host(raw.trim());

    if hostname.is_empty() || hostname.len() > MAX_HOSTNAME_LEN {
        return None;
    }

    // Alphanumeric, hyphen, and dot only; this also keeps logs clean
    if !hostname
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.')
    {
        return None;
    }

    Some(hostname)
}

/// Extract the normalized hostname from the Host header
pub fn extract_hostname(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .and_then(parse_hostname)
}
