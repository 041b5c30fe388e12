//! Tenantgate gateway server

use anyhow::Result;
use std::{net::SocketAddr, sync::Arc};
use tenantgate_proxy::{
    config::{Config, TierKind},
    dispatch::Dispatcher,
    rate_limit::RateLimiter,
    routes::create_router,
    routing::{CacheTier, MemoryTier, RedisTier, TenantResolver},
    AppState,
};
use tenantgate_shared::{create_pool, PgTenantStore, TenantId, TenantStore};
use tokio::{signal, sync::watch};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_logging(config: &Config) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("tenantgate_proxy=debug,tenantgate_shared=info,tower_http=info")
    });
    let registry = tracing_subscriber::registry().with(filter);

    if config.log_json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Tiers in lookup order, plus the memory tier when one is configured
struct Tiers {
    chain: Vec<Arc<dyn CacheTier<TenantId>>>,
    memory: Option<Arc<MemoryTier<TenantId>>>,
}

/// Build the cache tiers in the configured lookup order
async fn build_tiers(config: &Config) -> Result<Tiers> {
    let mut chain: Vec<Arc<dyn CacheTier<TenantId>>> =
        Vec::with_capacity(config.cache_tiers.len());
    let mut memory = None;
    for kind in &config.cache_tiers {
        match kind {
            TierKind::Memory => {
                let tier = Arc::new(MemoryTier::with_config("memory", config.memory_cache.clone()));
                memory = Some(tier.clone());
                chain.push(tier);
            }
            TierKind::Redis => {
                let redis = RedisTier::connect(&config.redis)
                    .await
                    .map_err(|e| anyhow::anyhow!("Failed to connect to Redis: {e}"))?;
                chain.push(Arc::new(redis));
            }
        }
    }
    Ok(Tiers { chain, memory })
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;
    init_logging(&config);

    tracing::info!(
        backend = %config.target_backend,
        tiers = ?config.cache_tiers,
        "Starting tenantgate"
    );

    let pool = create_pool(&config.postgres)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create database pool: {e}"))?;
    let store: Arc<dyn TenantStore> = Arc::new(PgTenantStore::new(pool));

    let tiers = build_tiers(&config).await?;
    let resolver = TenantResolver::new(tiers.chain, store.clone());
    tracing::info!(tiers = ?resolver.tier_names(), "Tenant resolution chain ready");

    let rate_limiter = RateLimiter::in_memory(&config.rate_limit);
    let dispatcher = Dispatcher::new(&config.dispatch)?;

    let addr = config.bind_address();
    let grace = config.shutdown_grace;
    let state = AppState::new(config, resolver, rate_limiter, dispatcher, store);
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Gateway listening");

    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    let mut server = tokio::spawn(async move {
        axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.wait_for(|stop| *stop).await;
            })
            .await
    });

    tokio::select! {
        result = &mut server => {
            // Server exited without a shutdown request
            result??;
            return Ok(());
        }
        () = shutdown_signal() => {}
    }

    tracing::info!(
        grace_secs = grace.as_secs(),
        "Shutdown signal received, draining connections"
    );
    let _ = shutdown_tx.send(true);

    match tokio::time::timeout(grace, server).await {
        Ok(result) => {
            result??;
            let cached = tiers.memory.as_ref().map(|tier| tier.entry_count());
            tracing::info!(cached_tenants = ?cached, "Server stopped");
        }
        Err(_) => {
            tracing::warn!("Grace period elapsed with requests still in flight, exiting");
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
