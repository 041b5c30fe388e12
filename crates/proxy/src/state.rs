//! Shared application state

use std::sync::Arc;
use tenantgate_shared::TenantStore;

use crate::config::Config;
use crate::dispatch::Dispatcher;
use crate::rate_limit::RateLimiter;
use crate::routing::TenantResolver;

/// Process-wide dependencies, built once at startup and cloned into handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub resolver: Arc<TenantResolver>,
    pub rate_limiter: Arc<RateLimiter>,
    pub dispatcher: Arc<Dispatcher>,
    pub store: Arc<dyn TenantStore>,
}

impl AppState {
    pub fn new(
        config: Config,
        resolver: TenantResolver,
        rate_limiter: RateLimiter,
        dispatcher: Dispatcher,
        store: Arc<dyn TenantStore>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            resolver: Arc::new(resolver),
            rate_limiter: Arc::new(rate_limiter),
            dispatcher: Arc::new(dispatcher),
            store,
        }
    }
}
