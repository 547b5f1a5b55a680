//! Shop authentication extractor.
//!
//! Resolves the calling shop to its stored Admin API token. Every failure
//! along the way - missing header, malformed domain, no session row, a
//! database hiccup - is normalized to one 401 "Authentication failed"
//! response so callers cannot distinguish which step broke.

use axum::{extract::FromRequestParts, http::request::Parts};

use collectify_core::ShopDomain;

use crate::{db::SessionRepository, error::AppError, shopify::AdminClient, state::AppState};

/// Header carrying the calling shop's domain.
pub const SHOP_DOMAIN_HEADER: &str = "x-shopify-shop-domain";

/// The resolved shop identity for a request.
pub struct ShopContext {
    pub shop: ShopDomain,
    pub client: AdminClient,
}

/// Extractor that requires an authenticated shop.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(RequireShop(ctx): RequireShop) -> impl IntoResponse {
///     format!("hello, {}", ctx.shop)
/// }
/// ```
pub struct RequireShop(pub ShopContext);

impl FromRequestParts<AppState> for RequireShop {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(SHOP_DOMAIN_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or(AppError::Unauthorized)?;

        let shop = ShopDomain::parse(header.trim()).map_err(|_| AppError::Unauthorized)?;

        let session = SessionRepository::new(state.pool())
            .get_by_shop(&shop)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "session lookup failed");
                AppError::Unauthorized
            })?
            .ok_or(AppError::Unauthorized)?;

        let client = state.shopify_client(&shop, session.access_token);

        Ok(Self(ShopContext { shop, client }))
    }
}
