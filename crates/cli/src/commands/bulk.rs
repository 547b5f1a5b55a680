//! Bulk-operation watch command.
//!
//! Resolves the shop's stored Admin token from the database, then polls the
//! bulk operation with exponential backoff until it reaches a terminal
//! state or the retry ceiling. Ctrl+C cancels the wait cleanly (the polling
//! future is simply dropped).

use std::time::Duration;

use collectify_app::{
    config::AppConfig,
    db::{self, SessionRepository},
    services::bulk::{PollOutcome, PollSettings, wait_for_completion},
    shopify::AdminClient,
};
use collectify_core::ShopDomain;

/// Errors that can occur while watching a bulk operation.
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    #[error("invalid shop domain: {0}")]
    InvalidShop(String),

    #[error("no stored session for {0}; install the app on that shop first")]
    NoSession(String),

    #[error("configuration error: {0}")]
    Config(#[from] collectify_app::config::ConfigError),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("repository error: {0}")]
    Repository(#[from] collectify_app::db::RepositoryError),

    #[error("Shopify error: {0}")]
    Shopify(#[from] collectify_app::shopify::ShopifyError),
}

/// Watch a bulk operation until it finishes.
///
/// # Errors
///
/// Returns `WatchError` when the shop cannot be resolved or a status query
/// fails.
pub async fn watch(shop: &str, operation_id: &str, max_attempts: u32) -> Result<(), WatchError> {
    let config = AppConfig::from_env()?;
    let shop =
        ShopDomain::parse(shop).map_err(|e| WatchError::InvalidShop(e.to_string()))?;

    let pool = db::create_pool(&config.database_url).await?;
    let session = SessionRepository::new(&pool)
        .get_by_shop(&shop)
        .await?
        .ok_or_else(|| WatchError::NoSession(shop.to_string()))?;

    let client = AdminClient::new(&shop, &config.shopify.api_version, session.access_token);

    let settings = PollSettings {
        initial_interval: Duration::from_secs(2),
        max_interval: Duration::from_secs(30),
        max_attempts,
    };

    tracing::info!(%operation_id, "watching bulk operation");

    let wait = wait_for_completion(&client, operation_id, settings);
    let outcome = tokio::select! {
        outcome = wait => outcome?,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("cancelled");
            return Ok(());
        }
    };

    match outcome {
        PollOutcome::Completed(op) => {
            tracing::info!(
                objects = op.object_count,
                url = op.url.as_deref(),
                "bulk operation completed"
            );
        }
        PollOutcome::Failed(op) => {
            tracing::error!(
                status = %op.status,
                error_code = op.error_code.as_deref(),
                "bulk operation failed"
            );
        }
        PollOutcome::TimedOut { last, attempts } => {
            tracing::warn!(
                attempts,
                status = %last.status,
                objects = last.object_count,
                "gave up waiting; the operation is still running remotely"
            );
        }
    }

    Ok(())
}
