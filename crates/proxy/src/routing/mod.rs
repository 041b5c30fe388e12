//! Host-based tenant routing
//!
//! This module turns an incoming Host header into an upstream target:
//! - `cache`: the tier interface and the in-process tier
//! - `redis_tier`: the shared tier
//! - `host_resolver`: the ordered tier chain with store fallback and write-back
//! - `backend`: tenant ID + scheme + template -> target URL

mod backend;
mod cache;
mod host_resolver;
mod redis_tier;

pub use backend::{determine_backend, validate_backend_template, RouteError, Scheme};
pub use cache::{CacheCost, CacheTier, CounterTier, MemoryTier, MemoryTierConfig};
pub use host_resolver::{extract_hostname, normalize_host, parse_hostname, TenantResolver};
pub use redis_tier::{RedisTier, RedisTierConfig};
