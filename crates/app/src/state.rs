//! Application state shared across handlers.

use std::sync::Arc;

use secrecy::SecretString;
use sqlx::PgPool;

use collectify_core::ShopDomain;

use crate::{config::AppConfig, shopify::AdminClient};

/// Application state shared across all handlers.
///
/// The Shopify client is not part of the state: every request resolves its
/// own per-shop client from the stored OAuth token, so there is no global
/// client singleton to configure or tear down.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AppConfig,
    pool: PgPool,
}

impl AppState {
    /// Build the application state.
    #[must_use]
    pub fn new(config: AppConfig, pool: PgPool) -> Self {
        Self {
            inner: Arc::new(AppStateInner { config, pool }),
        }
    }

    /// Returns the application configuration.
    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    /// Returns the database pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Build an Admin API client for a shop using its stored access token.
    #[must_use]
    pub fn shopify_client(&self, shop: &ShopDomain, access_token: SecretString) -> AdminClient {
        AdminClient::new(shop, &self.inner.config.shopify.api_version, access_token)
    }
}
