//! Shared Redis tier
//!
//! Sits between the in-process tier and the authoritative store so that all
//! gateway instances share fills. Entries expire on wall-clock TTL only.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::future::Future;
use std::time::Duration;
use tenantgate_shared::{CacheError, TenantId};

use super::cache::CacheTier;

const TIER_NAME: &str = "redis";

/// Redis tier configuration
#[derive(Debug, Clone)]
pub struct RedisTierConfig {
    pub url: String,
    /// Expiry applied to every write
    pub ttl: Duration,
    /// Upper bound on a single command round trip
    pub command_timeout: Duration,
}

impl Default for RedisTierConfig {
    fn default() -> Self {
        Self {
            url: "redis://localhost:6379".to_string(),
            ttl: Duration::from_secs(5),
            command_timeout: Duration::from_millis(250),
        }
    }
}

/// Redis-backed tier storing tenant IDs as plain strings
#[derive(Clone)]
pub struct RedisTier {
    conn: ConnectionManager,
    ttl_secs: u64,
    command_timeout: Duration,
}

impl RedisTier {
    /// Connect to Redis; fails if the server cannot be reached at startup
    pub async fn connect(config: &RedisTierConfig) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(config.url.as_str())?;
        let conn = ConnectionManager::new(client).await?;

        tracing::info!(
            ttl_secs = config.ttl.as_secs(),
            timeout_ms = config.command_timeout.as_millis() as u64,
            "Connected to Redis cache tier"
        );

        Ok(Self {
            conn,
            // SET EX rejects zero
            ttl_secs: config.ttl.as_secs().max(1),
            command_timeout: config.command_timeout,
        })
    }

    /// Run one command with the configured timeout
    async fn bounded<T, F>(&self, op: &'static str, fut: F) -> Result<T, CacheError>
    where
        F: Future<Output = redis::RedisResult<T>>,
    {
        match tokio::time::timeout(self.command_timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(CacheError::unavailable(
                TIER_NAME,
                format!("{} failed: {}", op, e),
            )),
            Err(_) => Err(CacheError::unavailable(
                TIER_NAME,
                format!(
                    "{} timed out after {}ms",
                    op,
                    self.command_timeout.as_millis()
                ),
            )),
        }
    }
}

#[async_trait]
impl CacheTier<TenantId> for RedisTier {
    fn name(&self) -> &'static str {
        TIER_NAME
    }

    async fn get(&self, key: &str) -> Result<Option<TenantId>, CacheError> {
        let mut conn = self.conn.clone();
        let value: Option<String> = self.bounded("GET", conn.get(key)).await?;
        Ok(value.map(TenantId::from))
    }

    async fn set(&self, key: &str, value: TenantId) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        self.bounded::<(), _>("SET", conn.set_ex(key, value.as_str(), self.ttl_secs))
            .await
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        self.bounded::<(), _>("DEL", conn.del(key)).await
    }
}
