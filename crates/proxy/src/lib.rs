//! Tenantgate gateway library
//!
//! This crate contains the HTTP gateway: tenant resolution through the cache
//! chain, failure-triggered rate limiting, and request forwarding.

pub mod auth;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod rate_limit;
pub mod routes;
pub mod routing;
pub mod state;

pub use config::Config;
pub use error::{ApiError, ApiResult};
pub use routing::{determine_backend, TenantResolver};
pub use state::AppState;
