//! Common types used across Tenantgate

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;

/// Prefix that turns a hostname into a cache key
pub const LOOKUP_KEY_PREFIX: &str = "t-";

// =============================================================================
// Lookup Key
// =============================================================================

/// Cache key derived from an inbound request's hostname.
///
/// Every tier in the resolution chain is addressed with the same key, and the
/// authoritative store strips the prefix again before querying.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LookupKey(String);

impl LookupKey {
    /// Build the key for an already normalized hostname
    pub fn for_hostname(hostname: &str) -> Self {
        Self(format!("{}{}", LOOKUP_KEY_PREFIX, hostname))
    }

    /// Full key as stored in cache tiers
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The hostname this key was built from
    pub fn hostname(&self) -> &str {
        &self.0[LOOKUP_KEY_PREFIX.len()..]
    }
}

impl fmt::Display for LookupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// Tenant ID
// =============================================================================

/// Opaque tenant identifier produced by a successful resolution
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(String);

impl TenantId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<String> for TenantId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for TenantId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// Tenant Record
// =============================================================================

/// Authoritative tenant record, owned by the store
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Tenant {
    pub id: String,
    pub hostname: Option<String>,
}

impl Tenant {
    pub fn tenant_id(&self) -> TenantId {
        TenantId::from(self.id.as_str())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_key_prefix() {
        let key = LookupKey::for_hostname("acme.example.com");
        assert_eq!(key.as_str(), "t-acme.example.com");
        assert_eq!(key.hostname(), "acme.example.com");
        assert_eq!(key.to_string(), "t-acme.example.com");
    }

    #[test]
    fn test_lookup_key_hostname_with_prefix_like_name() {
        // A hostname that itself starts with "t-" must survive the round trip
        let key = LookupKey::for_hostname("t-rex.example.com");
        assert_eq!(key.as_str(), "t-t-rex.example.com");
        assert_eq!(key.hostname(), "t-rex.example.com");
    }

    #[test]
    fn test_tenant_id_serializes_transparently() {
        let id = TenantId::from("acme");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"acme\"");
        assert!(!id.is_empty());
        assert!(TenantId::from("").is_empty());
    }

    #[test]
    fn test_tenant_record_to_id() {
        let tenant = Tenant {
            id: "acme".to_string(),
            hostname: Some("acme.example.com".to_string()),
        };
        assert_eq!(tenant.tenant_id(), TenantId::from("acme"));
    }
}
