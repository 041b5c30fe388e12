//! Gateway configuration

use std::env;
use std::str::FromStr;
use std::time::Duration;
use tenantgate_shared::PostgresConfig;

use crate::dispatch::DispatchConfig;
use crate::rate_limit::RateLimitConfig;
use crate::routing::{validate_backend_template, MemoryTierConfig, RedisTierConfig};

/// Minimum admin token length
const MIN_AUTH_TOKEN_LEN: usize = 32;

/// A tier that can appear in `CACHE_TIERS`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TierKind {
    Memory,
    Redis,
}

impl FromStr for TierKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(TierKind::Memory),
            "redis" => Ok(TierKind::Redis),
            other => Err(format!("unknown cache tier '{}'", other)),
        }
    }
}

/// Gateway configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    // Server
    pub host: String,
    pub port: u16,
    pub shutdown_grace: Duration,
    pub trust_proxy_headers: bool,

    // Routing
    pub target_backend: String,

    // Cache chain
    pub cache_tiers: Vec<TierKind>,
    pub memory_cache: MemoryTierConfig,
    pub redis: RedisTierConfig,

    // Database
    pub postgres: PostgresConfig,

    // Rate limiting
    pub rate_limit: RateLimitConfig,

    // Upstream forwarding
    pub dispatch: DispatchConfig,

    // Authentication
    pub auth_token: String,

    // Logging
    pub log_json: bool,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let target_backend =
            env::var("TARGET_BACKEND").unwrap_or_else(|_| "localhost.test:5173".to_string());
        validate_backend_template(&target_backend).map_err(|e| ConfigError::Invalid {
            name: "TARGET_BACKEND",
            reason: e.to_string(),
        })?;

        let cache_tiers = parse_tiers(
            &env::var("CACHE_TIERS").unwrap_or_else(|_| "memory,redis".to_string()),
        )?;

        Ok(Self {
            // Server
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: parse_var("PORT", 8080)?,
            shutdown_grace: Duration::from_secs(parse_var("SHUTDOWN_GRACE_SECS", 10)?),
            trust_proxy_headers: parse_var("TRUST_PROXY_HEADERS", false)?,

            // Routing
            target_backend,

            // Cache chain
            cache_tiers,
            memory_cache: MemoryTierConfig {
                max_cost: parse_var("MEMORY_CACHE_MAX_COST", 1024 * 1024)?,
                ttl: Duration::from_secs(parse_var("MEMORY_CACHE_TTL_SECS", 10)?),
            },
            redis: RedisTierConfig {
                url: env::var("REDIS_URL")
                    .unwrap_or_else(|_| "redis://localhost:6379".to_string()),
                ttl: Duration::from_secs(parse_var("REDIS_CACHE_TTL_SECS", 5)?),
                command_timeout: Duration::from_millis(parse_var("REDIS_TIMEOUT_MS", 250)?),
            },

            // Database
            postgres: PostgresConfig {
                url: env::var("DATABASE_URL").ok(),
                host: env::var("POSTGRES_HOST").unwrap_or_else(|_| "localhost".to_string()),
                port: parse_var("POSTGRES_PORT", 5432)?,
                user: env::var("POSTGRES_USER").unwrap_or_else(|_| "postgres".to_string()),
                password: env::var("POSTGRES_PASSWORD").unwrap_or_default(),
                dbname: env::var("POSTGRES_DBNAME").unwrap_or_else(|_| "postgres".to_string()),
                max_connections: parse_var("DATABASE_MAX_CONNECTIONS", 10)?,
            },

            // Rate limiting
            rate_limit: RateLimitConfig {
                threshold: parse_var("RATE_LIMIT_THRESHOLD", 10)?,
                window: Duration::from_secs(parse_var("RATE_LIMIT_WINDOW_SECS", 60)?),
                max_clients: parse_var("RATE_LIMIT_MAX_CLIENTS", 100_000)?,
            },

            // Upstream forwarding
            dispatch: DispatchConfig {
                timeout: Duration::from_millis(parse_var("UPSTREAM_TIMEOUT_MS", 30_000)?),
                max_body_bytes: parse_var("MAX_REQUEST_BODY_BYTES", 10 * 1024 * 1024)?,
            },

            // Authentication
            auth_token: {
                let token = env::var("AUTH_TOKEN").map_err(|_| ConfigError::Missing("AUTH_TOKEN"))?;
                if token.len() < MIN_AUTH_TOKEN_LEN {
                    return Err(ConfigError::WeakSecret(
                        "AUTH_TOKEN must be at least 32 characters",
                    ));
                }
                token
            },

            // Logging
            log_json: env::var("LOG_FORMAT")
                .map(|v| v.eq_ignore_ascii_case("json"))
                .unwrap_or(false),
        })
    }

    /// Address string the server binds to
    pub fn bind_address(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

/// Parse an optional variable, falling back to `default` when unset
fn parse_var<T>(name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            reason: e.to_string(),
        }),
        Err(_) => Ok(default),
    }
}

/// Parse the ordered tier list
fn parse_tiers(raw: &str) -> Result<Vec<TierKind>, ConfigError> {
    let mut tiers = Vec::new();
    for part in raw.split(',').filter(|p| !p.trim().is_empty()) {
        let tier: TierKind = part.parse().map_err(|reason| ConfigError::Invalid {
            name: "CACHE_TIERS",
            reason,
        })?;
        if tiers.contains(&tier) {
            return Err(ConfigError::Invalid {
                name: "CACHE_TIERS",
                reason: format!("tier '{}' listed twice", part.trim()),
            });
        }
        tiers.push(tier);
    }
    Ok(tiers)
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
    #[error("Weak secret: {0}")]
    WeakSecret(&'static str),
    #[error("Invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serial_test::serial;

    const TEST_TOKEN: &str = "test-admin-token-must-be-at-least-32-chars";

    const VARS: &[&str] = &[
        "AUTH_TOKEN",
        "PORT",
        "TARGET_BACKEND",
        "CACHE_TIERS",
        "RATE_LIMIT_THRESHOLD",
        "TRUST_PROXY_HEADERS",
        "DATABASE_URL",
        "LOG_FORMAT",
    ];

    /// Helper to clear env vars between tests
    fn cleanup_config() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn test_defaults() {
        cleanup_config();
        env::set_var("AUTH_TOKEN", TEST_TOKEN);

        let config = Config::from_env().unwrap();
        assert_eq!(config.bind_address(), "0.0.0.0:8080");
        assert_eq!(config.target_backend, "localhost.test:5173");
        assert_eq!(config.cache_tiers, vec![TierKind::Memory, TierKind::Redis]);
        assert_eq!(config.redis.ttl, Duration::from_secs(5));
        assert_eq!(config.rate_limit.threshold, 10);
        assert_eq!(config.rate_limit.window, Duration::from_secs(60));
        assert_eq!(config.shutdown_grace, Duration::from_secs(10));
        assert!(!config.trust_proxy_headers);
        assert!(config.postgres.url.is_none());
        assert!(!config.log_json);

        cleanup_config();
    }

    #[test]
    #[serial]
    fn test_auth_token_validation() {
        cleanup_config();

        // Missing token
        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::Missing("AUTH_TOKEN"))
        ));

        // Too short
        env::set_var("AUTH_TOKEN", "short");
        assert!(matches!(Config::from_env(), Err(ConfigError::WeakSecret(_))));

        cleanup_config();
    }

    #[test]
    #[serial]
    fn test_overrides() {
        cleanup_config();
        env::set_var("AUTH_TOKEN", TEST_TOKEN);
        env::set_var("PORT", "9090");
        env::set_var("TARGET_BACKEND", "svc.test:5173");
        env::set_var("CACHE_TIERS", "redis");
        env::set_var("RATE_LIMIT_THRESHOLD", "3");
        env::set_var("TRUST_PROXY_HEADERS", "true");
        env::set_var("LOG_FORMAT", "JSON");

        let config = Config::from_env().unwrap();
        assert_eq!(config.port, 9090);
        assert_eq!(config.target_backend, "svc.test:5173");
        assert_eq!(config.cache_tiers, vec![TierKind::Redis]);
        assert_eq!(config.rate_limit.threshold, 3);
        assert!(config.trust_proxy_headers);
        assert!(config.log_json);

        cleanup_config();
    }

    #[test]
    #[serial]
    fn test_invalid_values_rejected() {
        cleanup_config();
        env::set_var("AUTH_TOKEN", TEST_TOKEN);

        env::set_var("PORT", "not-a-port");
        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::Invalid { name: "PORT", .. })
        ));
        env::remove_var("PORT");

        env::set_var("TARGET_BACKEND", "http://svc.test/path");
        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::Invalid { name: "TARGET_BACKEND", .. })
        ));
        env::remove_var("TARGET_BACKEND");

        env::set_var("CACHE_TIERS", "memory,memcached");
        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::Invalid { name: "CACHE_TIERS", .. })
        ));

        cleanup_config();
    }

    #[test]
    fn test_parse_tiers() {
        assert_eq!(
            parse_tiers("memory, redis").unwrap(),
            vec![TierKind::Memory, TierKind::Redis]
        );
        assert_eq!(parse_tiers("").unwrap(), vec![]);
        assert!(parse_tiers("memory,memory").is_err());
    }

    #[test]
    fn test_ipv6_bind_address() {
        let mut config = base_config();
        config.host = "::".to_string();
        assert_eq!(config.bind_address(), "[::]:8080");
    }

    fn base_config() -> Config {
        Config {
            host: "0.0.0.0".to_string(),
            port: 8080,
            shutdown_grace: Duration::from_secs(10),
            trust_proxy_headers: false,
            target_backend: "svc.test".to_string(),
            cache_tiers: vec![TierKind::Memory],
            memory_cache: MemoryTierConfig::default(),
            redis: RedisTierConfig::default(),
            postgres: PostgresConfig::default(),
            rate_limit: RateLimitConfig::default(),
            dispatch: DispatchConfig::default(),
            auth_token: TEST_TOKEN.to_string(),
            log_json: false,
        }
    }
}
