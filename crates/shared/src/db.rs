//! Authoritative tenant store and connection management

use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use std::{str::FromStr, time::Duration};

use crate::error::StoreError;
use crate::types::{LookupKey, Tenant, TenantId};

/// Postgres connection parameters
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    /// Full connection URL; takes precedence over the individual parts
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub dbname: String,
    pub max_connections: u32,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            url: None,
            host: "localhost".to_string(),
            port: 5432,
            user: "postgres".to_string(),
            password: String::new(),
            dbname: "postgres".to_string(),
            max_connections: 10,
        }
    }
}

impl PostgresConfig {
    /// Build sqlx connect options
    /// Note: Disables statement cache for PgBouncer compatibility
    pub fn connect_options(&self) -> Result<PgConnectOptions, sqlx::Error> {
        let options = match &self.url {
            Some(url) => PgConnectOptions::from_str(url)?,
            None => PgConnectOptions::new()
                .host(&self.host)
                .port(self.port)
                .username(&self.user)
                .password(&self.password)
                .database(&self.dbname),
        };

        Ok(options.statement_cache_capacity(0))
    }
}

/// Create a database connection pool
pub async fn create_pool(config: &PostgresConfig) -> Result<PgPool, sqlx::Error> {
    let options = config.connect_options()?;

    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(0)
        .acquire_timeout(Duration::from_secs(5)) // Lookups sit on the request path
        .idle_timeout(Duration::from_secs(60))
        .max_lifetime(Duration::from_secs(300))
        .connect_with(options)
        .await
}

/// Authoritative source of hostname -> tenant mappings.
///
/// The resolution chain falls back to this when every cache tier misses.
/// Implementations must tell "no such tenant" apart from "could not ask".
#[async_trait]
pub trait TenantStore: Send + Sync {
    /// Look up the tenant owning the hostname behind `key`
    async fn get_tenant(&self, key: &LookupKey) -> Result<TenantId, StoreError>;

    /// Cheap connectivity check for readiness probes
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Postgres-backed tenant store reading the `tenants` table
#[derive(Clone)]
pub struct PgTenantStore {
    pool: PgPool,
}

impl PgTenantStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TenantStore for PgTenantStore {
    async fn get_tenant(&self, key: &LookupKey) -> Result<TenantId, StoreError> {
        let tenant: Option<Tenant> =
            sqlx::query_as("SELECT id, hostname FROM tenants WHERE hostname = $1")
                .bind(key.hostname())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| {
                    tracing::error!(key = %key, error = %e, "Tenant lookup query failed");
                    StoreError::Unavailable(e.to_string())
                })?;

        tenant
            .map(|t| t.tenant_id())
            .ok_or_else(|| StoreError::NotFound(key.hostname().to_string()))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(|e| StoreError::Unavailable(e.to_string()))
    }
}
