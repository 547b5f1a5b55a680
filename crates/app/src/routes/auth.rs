//! OAuth install flow.

use axum::{
    Router,
    extract::{Query, State},
    response::Redirect,
    routing::get,
};
use chrono::Utc;
use rand::Rng;
use serde::Deserialize;

use collectify_core::ShopDomain;

use crate::{
    db::SessionRepository,
    error::AppError,
    shopify::{authorization_url, exchange_code, verify_callback_hmac},
    state::AppState,
};

/// Build the auth router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth", get(begin))
        .route("/auth/callback", get(callback))
}

#[derive(Debug, Deserialize)]
struct BeginQuery {
    shop: String,
}

/// Start the install flow: redirect the merchant to the authorize page.
async fn begin(
    State(state): State<AppState>,
    Query(query): Query<BeginQuery>,
) -> Result<Redirect, AppError> {
    let shop = ShopDomain::parse(query.shop.trim())
        .map_err(|e| AppError::BadRequest(format!("invalid shop: {e}")))?;

    let config = &state.config().shopify;
    let redirect_uri = format!("{}/auth/callback", state.config().base_url);
    let nonce: String = rand::rng()
        .sample_iter(rand::distr::Alphanumeric)
        .take(32)
        .map(char::from)
        .collect();

    let url = authorization_url(&shop, &config.api_key, &config.scopes, &redirect_uri, &nonce);
    Ok(Redirect::temporary(&url))
}

/// OAuth callback: verify the signed query, exchange the code, store the
/// session, and send the merchant into the app.
async fn callback(
    State(state): State<AppState>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<Redirect, AppError> {
    let get = |name: &str| {
        params
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    };

    let provided_hmac = get("hmac").ok_or(AppError::Unauthorized)?;
    let config = &state.config().shopify;

    if !verify_callback_hmac(&config.api_secret, &params, provided_hmac) {
        return Err(AppError::Unauthorized);
    }

    let shop = get("shop")
        .and_then(|s| ShopDomain::parse(s.trim()).ok())
        .ok_or(AppError::Unauthorized)?;
    let code = get("code").ok_or(AppError::Unauthorized)?;

    let http = reqwest::Client::new();
    let token = exchange_code(&http, &shop, &config.api_key, &config.api_secret, code).await?;

    SessionRepository::new(state.pool())
        .save(
            &shop,
            &token.access_token,
            &token.scope,
            Utc::now().timestamp(),
        )
        .await?;

    tracing::info!(shop = shop.as_str(), "app installed");

    Ok(Redirect::temporary(&state.config().base_url))
}
