//! Database operations.
//!
//! ## Tables
//!
//! - `shop_sessions` - Per-shop OAuth access tokens
//! - `subscriptions` - One plan row per shop (upserted, never duplicated)
//! - `usage_records` - Monthly (shop, month, year) usage buckets
//!
//! # Migrations
//!
//! Migrations live in `crates/app/migrations/` and run via:
//! ```bash
//! cargo run -p collectify-cli -- migrate
//! ```
//!
//! Queries are built at runtime (`sqlx::query` / `query_as`) rather than
//! through the compile-time macros, so the crate builds without a live
//! database.

pub mod sessions;
pub mod subscriptions;
pub mod usage;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use sessions::{SessionRepository, ShopSession};
pub use subscriptions::{Subscription, SubscriptionRepository, SubscriptionUpdate};
pub use usage::{UsageCounters, UsageOperation, UsageRepository};

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
