//! Tenantgate Shared Types and Utilities
//!
//! This crate contains the domain types, error taxonomy, and authoritative
//! tenant store shared across the Tenantgate workspace.

pub mod db;
pub mod error;
pub mod types;

pub use db::*;
pub use error::*;
pub use types::*;
