//! Cache tier interface and the in-process tier
//!
//! Every tier in the resolution chain (and the rate limiter's counter store)
//! speaks the same `get`/`set`/`delete` contract. The in-memory tier is a
//! cost-bounded moka cache: TinyLFU admission keeps hot tenants resident and
//! entries expire a fixed time after their last write. Reads do not extend
//! an entry's life. The rate limiter's counters use the `CounterTier` seam,
//! which adds an atomic increment.

use async_trait::async_trait;
use moka::sync::Cache;
use std::time::Duration;
use tenantgate_shared::{CacheError, TenantId};

/// Default in-memory TTL (10 seconds)
const DEFAULT_MEMORY_TTL: Duration = Duration::from_secs(10);

/// Default in-memory cost budget (1 MiB of keys and values)
const DEFAULT_MEMORY_MAX_COST: u64 = 1024 * 1024;

/// One storage layer with its own medium and expiry policy
#[async_trait]
pub trait CacheTier<V>: Send + Sync
where
    V: Send + 'static,
{
    /// Short name used in logs and errors
    fn name(&self) -> &'static str;

    /// Fetch a value; `Ok(None)` is a plain miss
    async fn get(&self, key: &str) -> Result<Option<V>, CacheError>;

    /// Store a value under the tier's own default TTL
    async fn set(&self, key: &str, value: V) -> Result<(), CacheError>;

    /// Remove a key; removing an absent key is not an error
    async fn delete(&self, key: &str) -> Result<(), CacheError>;
}

/// Counter storage with an atomic read-modify-write
#[async_trait]
pub trait CounterTier: Send + Sync {
    /// Short name used in logs and errors
    fn name(&self) -> &'static str;

    /// Current count; `Ok(None)` when the key has no history
    async fn count(&self, key: &str) -> Result<Option<u32>, CacheError>;

    /// Add one to the key's count and restart its TTL; returns the new count
    async fn increment(&self, key: &str) -> Result<u32, CacheError>;
}

/// Admission cost of a cached value, in bytes
pub trait CacheCost {
    fn cost(&self) -> u32;
}

impl CacheCost for TenantId {
    fn cost(&self) -> u32 {
        u32::try_from(self.as_str().len()).unwrap_or(u32::MAX)
    }
}

impl CacheCost for u32 {
    fn cost(&self) -> u32 {
        std::mem::size_of::<u32>() as u32
    }
}

/// Sizing and expiry for a memory tier
#[derive(Debug, Clone)]
pub struct MemoryTierConfig {
    /// Total cost budget across all entries
    pub max_cost: u64,
    /// Time an entry lives after its last write
    pub ttl: Duration,
}

impl Default for MemoryTierConfig {
    fn default() -> Self {
        Self {
            max_cost: DEFAULT_MEMORY_MAX_COST,
            ttl: DEFAULT_MEMORY_TTL,
        }
    }
}

/// Thread-safe in-memory tier
pub struct MemoryTier<V> {
    name: &'static str,
    cache: Cache<String, V>,
}

impl<V> MemoryTier<V>
where
    V: CacheCost + Clone + Send + Sync + 'static,
{
    /// Create a tier with default sizing
    pub fn new(name: &'static str) -> Self {
        Self::with_config(name, MemoryTierConfig::default())
    }

    /// Create a tier with custom sizing
    pub fn with_config(name: &'static str, config: MemoryTierConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(config.max_cost)
            .weigher(|key: &String, value: &V| {
                u32::try_from(key.len())
                    .unwrap_or(u32::MAX)
                    .saturating_add(value.cost())
            })
            .time_to_live(config.ttl)
            .build();

        Self { name, cache }
    }

    /// Number of live entries, after pending expirations are applied
    pub fn entry_count(&self) -> u64 {
        self.cache.run_pending_tasks();
        self.cache.entry_count()
    }
}

#[async_trait]
impl<V> CacheTier<V> for MemoryTier<V>
where
    V: CacheCost + Clone + Send + Sync + 'static,
{
    fn name(&self) -> &'static str {
        self.name
    }

    async fn get(&self, key: &str) -> Result<Option<V>, CacheError> {
        Ok(self.cache.get(key))
    }

    async fn set(&self, key: &str, value: V) -> Result<(), CacheError> {
        self.cache.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.cache.invalidate(key);
        Ok(())
    }
}

#[async_trait]
impl CounterTier for MemoryTier<u32> {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn count(&self, key: &str) -> Result<Option<u32>, CacheError> {
        Ok(self.cache.get(key))
    }

    async fn increment(&self, key: &str) -> Result<u32, CacheError> {
        // The upsert runs under moka's per-key lock, so racing callers never
        // read the same previous value
        let entry = self
            .cache
            .entry(key.to_string())
            .and_upsert_with(|current| current.map_or(1, |e| e.into_value().saturating_add(1)));
        Ok(entry.into_value())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[tokio::test]
    async fn test_cache_get_set() {
        let tier: MemoryTier<TenantId> = MemoryTier::new("memory");

        // Initially empty
        assert!(tier.get("t-test.example.com").await.unwrap().is_none());

        // Set and get
        tier.set("t-test.example.com", TenantId::from("test"))
            .await
            .unwrap();
        assert_eq!(
            tier.get("t-test.example.com").await.unwrap(),
            Some(TenantId::from("test"))
        );
    }

    #[tokio::test]
    async fn test_cache_expiration() {
        let tier: MemoryTier<TenantId> = MemoryTier::with_config(
            "memory",
            MemoryTierConfig {
                ttl: Duration::from_millis(50),
                ..Default::default()
            },
        );

        tier.set("t-test.example.com", TenantId::from("test"))
            .await
            .unwrap();
        assert!(tier.get("t-test.example.com").await.unwrap().is_some());

        // Wait for expiration
        sleep(Duration::from_millis(80));
        assert!(tier.get("t-test.example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_rewrite_resets_expiry() {
        let tier: MemoryTier<u32> = MemoryTier::with_config(
            "counters",
            MemoryTierConfig {
                ttl: Duration::from_millis(120),
                ..Default::default()
            },
        );

        tier.set("rl-10.0.0.1", 1).await.unwrap();
        sleep(Duration::from_millis(80));
        tier.set("rl-10.0.0.1", 2).await.unwrap();
        sleep(Duration::from_millis(80));

        // 160ms since the first write, but only 80ms since the last one
        assert_eq!(tier.get("rl-10.0.0.1").await.unwrap(), Some(2));
    }

    #[tokio::test]
    async fn test_reads_do_not_extend_expiry() {
        let tier: MemoryTier<TenantId> = MemoryTier::with_config(
            "memory",
            MemoryTierConfig {
                ttl: Duration::from_millis(120),
                ..Default::default()
            },
        );

        tier.set("t-acme.example.com", TenantId::from("acme"))
            .await
            .unwrap();
        for _ in 0..4 {
            sleep(Duration::from_millis(40));
            let _ = tier.get("t-acme.example.com").await.unwrap();
        }

        // Read every 40ms, yet gone 160ms after the only write
        assert!(tier.get("t-acme.example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_cache_delete() {
        let tier: MemoryTier<TenantId> = MemoryTier::new("memory");

        tier.set("t-test.example.com", TenantId::from("test"))
            .await
            .unwrap();
        tier.delete("t-test.example.com").await.unwrap();
        assert!(tier.get("t-test.example.com").await.unwrap().is_none());

        // Deleting again is fine
        tier.delete("t-test.example.com").await.unwrap();
    }

    #[tokio::test]
    async fn test_entry_count_tracks_live_entries() {
        let tier: MemoryTier<TenantId> = MemoryTier::with_config(
            "memory",
            MemoryTierConfig {
                ttl: Duration::from_millis(50),
                ..Default::default()
            },
        );
        assert_eq!(tier.entry_count(), 0);

        tier.set("t-a.example.com", TenantId::from("a")).await.unwrap();
        tier.set("t-b.example.com", TenantId::from("b")).await.unwrap();
        assert_eq!(tier.entry_count(), 2);

        tier.delete("t-a.example.com").await.unwrap();
        assert_eq!(tier.entry_count(), 1);

        sleep(Duration::from_millis(80));
        assert_eq!(tier.entry_count(), 0);
    }

    #[tokio::test]
    async fn test_counter_increment_starts_at_one() {
        let tier: MemoryTier<u32> = MemoryTier::new("counters");

        assert_eq!(tier.count("rl-10.0.0.1").await.unwrap(), None);
        assert_eq!(tier.increment("rl-10.0.0.1").await.unwrap(), 1);
        assert_eq!(tier.increment("rl-10.0.0.1").await.unwrap(), 2);
        assert_eq!(tier.count("rl-10.0.0.1").await.unwrap(), Some(2));
        assert_eq!(tier.count("rl-10.0.0.2").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_counter_increment_restarts_expiry() {
        let tier: MemoryTier<u32> = MemoryTier::with_config(
            "counters",
            MemoryTierConfig {
                ttl: Duration::from_millis(120),
                ..Default::default()
            },
        );

        tier.increment("rl-10.0.0.1").await.unwrap();
        sleep(Duration::from_millis(80));
        tier.increment("rl-10.0.0.1").await.unwrap();
        sleep(Duration::from_millis(80));
        assert_eq!(tier.count("rl-10.0.0.1").await.unwrap(), Some(2));

        sleep(Duration::from_millis(80));
        assert_eq!(tier.count("rl-10.0.0.1").await.unwrap(), None);
    }

    #[test]
    fn test_counter_increment_is_atomic_across_threads() {
        let tier = std::sync::Arc::new(MemoryTier::<u32>::new("counters"));
        let barrier = std::sync::Arc::new(std::sync::Barrier::new(8));
        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let tier = tier.clone();
                let barrier = barrier.clone();
                std::thread::spawn(move || {
                    let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
                    barrier.wait();
                    for _ in 0..2_000 {
                        runtime.block_on(tier.increment("rl-10.0.0.1")).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let count = runtime.block_on(tier.count("rl-10.0.0.1")).unwrap();
        assert_eq!(count, Some(16_000));
    }

    #[test]
    fn test_costs() {
        assert_eq!(TenantId::from("acme").cost(), 4);
        assert_eq!(7u32.cost(), 4);
    }
}
