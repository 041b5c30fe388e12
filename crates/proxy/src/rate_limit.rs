//! Failure-triggered rate limiting
//!
//! Counts failed tenant resolutions per client address in a single fast tier.
//! Increments are atomic per key and restart the counter's TTL: sustained
//! failures keep a client limited, and a quiet period as long as the window
//! clears it. Counter state is best-effort; if the tier cannot be read the
//! limiter fails open.

use std::sync::Arc;
use std::time::Duration;
use tenantgate_shared::CacheError;

use crate::routing::{CounterTier, MemoryTier, MemoryTierConfig};

/// Prefix for counter keys, keeping them apart from tenant keys
const COUNTER_KEY_PREFIX: &str = "rl-";

/// Approximate cost of one counter entry (key plus value)
const COUNTER_ENTRY_COST: u64 = 64;

/// Rate limit configuration
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Failed resolutions allowed before a client is limited
    pub threshold: u32,
    /// Quiet period after which a client's counter disappears
    pub window: Duration,
    /// Upper bound on tracked clients
    pub max_clients: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            threshold: 10,
            window: Duration::from_secs(60),
            max_clients: 100_000,
        }
    }
}

/// Result of a limiter check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitDecision {
    /// No history, or below the threshold
    Allowed,
    /// At or above the threshold
    Limited,
    /// Counter store unreachable; request let through
    FailOpen,
}

impl LimitDecision {
    pub fn is_limited(&self) -> bool {
        matches!(self, LimitDecision::Limited)
    }
}

/// Per-client failure counter
pub struct RateLimiter {
    tier: Arc<dyn CounterTier>,
    threshold: u32,
}

impl RateLimiter {
    /// Create a limiter over an existing counter tier; the tier's TTL is the window
    pub fn new(tier: Arc<dyn CounterTier>, threshold: u32) -> Self {
        Self { tier, threshold }
    }

    /// Create a limiter with its own in-memory counter tier
    pub fn in_memory(config: &RateLimitConfig) -> Self {
        let tier = MemoryTier::<u32>::with_config(
            "rate-limit",
            MemoryTierConfig {
                max_cost: config.max_clients.saturating_mul(COUNTER_ENTRY_COST),
                ttl: config.window,
            },
        );
        Self::new(Arc::new(tier), config.threshold)
    }

    fn counter_key(client: &str) -> String {
        format!("{}{}", COUNTER_KEY_PREFIX, client)
    }

    /// Decide whether a client should be turned away before resolution
    pub async fn check(&self, client: &str) -> LimitDecision {
        match self.failures(client).await {
            Ok(None) => LimitDecision::Allowed,
            Ok(Some(count)) if count >= self.threshold => {
                tracing::debug!(client, count, threshold = self.threshold, "Client rate limited");
                LimitDecision::Limited
            }
            Ok(Some(_)) => LimitDecision::Allowed,
            Err(e) => {
                tracing::warn!(
                    client,
                    tier = self.tier.name(),
                    error = %e,
                    "Rate limit store unavailable, failing open"
                );
                LimitDecision::FailOpen
            }
        }
    }

    /// Failed resolutions recorded for a client in the current window
    pub async fn failures(&self, client: &str) -> Result<Option<u32>, CacheError> {
        self.tier.count(&Self::counter_key(client)).await
    }

    /// `true` only when the client is known to be over the threshold
    pub async fn should_limit(&self, client: &str) -> bool {
        self.check(client).await.is_limited()
    }

    /// Record one failed resolution; returns the new count
    pub async fn increment(&self, client: &str) -> Result<u32, CacheError> {
        let next = self.tier.increment(&Self::counter_key(client)).await?;

        if next == self.threshold {
            tracing::warn!(client, count = next, "Client reached failed-resolution threshold");
        }

        Ok(next)
    }
}
