//! Mandatory webhook endpoints.
//!
//! Every delivery is authenticated by an HMAC-SHA256 signature over the raw
//! body, compared in constant time; an invalid signature is the only
//! non-200 outcome. Processing failures after verification are logged and
//! still answered with 200 so the platform does not build a retry storm.

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
};
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use sha2::Sha256;

use collectify_core::{Plan, ShopDomain};

use crate::{
    db::{SessionRepository, SubscriptionRepository, SubscriptionUpdate, UsageRepository},
    state::AppState,
};

type HmacSha256 = Hmac<Sha256>;

const HMAC_HEADER: &str = "x-shopify-hmac-sha256";
const SHOP_HEADER: &str = "x-shopify-shop-domain";

/// Build the webhooks router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/webhooks/customers/data-request", post(customers_data_request))
        .route("/webhooks/customers/redact", post(customers_redact))
        .route("/webhooks/shop/redact", post(shop_redact))
        .route(
            "/webhooks/app-subscriptions/update",
            post(app_subscription_update),
        )
}

/// Verify a webhook delivery signature (base64 HMAC-SHA256 of the raw body).
#[must_use]
pub fn verify_webhook_hmac(api_secret: &SecretString, body: &[u8], provided_b64: &str) -> bool {
    let Ok(provided) = BASE64.decode(provided_b64) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(api_secret.expose_secret().as_bytes()) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&provided).is_ok()
}

/// Shared verification: 401 on a bad signature, otherwise the shop domain
/// from the delivery headers (when present and well-formed).
fn verify(state: &AppState, headers: &HeaderMap, body: &[u8]) -> Result<Option<ShopDomain>, StatusCode> {
    let provided = headers
        .get(HMAC_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    if !verify_webhook_hmac(&state.config().shopify.api_secret, body, provided) {
        tracing::warn!("webhook signature verification failed");
        return Err(StatusCode::UNAUTHORIZED);
    }

    Ok(headers
        .get(SHOP_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| ShopDomain::parse(s.trim()).ok()))
}

fn ok() -> (StatusCode, Json<serde_json::Value>) {
    (StatusCode::OK, Json(serde_json::json!({ "success": true })))
}

/// `customers/data_request` - this app stores no customer data, so there is
/// nothing to assemble; acknowledged for the compliance contract.
async fn customers_data_request(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<serde_json::Value>), StatusCode> {
    let shop = verify(&state, &headers, &body)?;
    tracing::info!(shop = shop.as_ref().map(ShopDomain::as_str), "customer data request received");
    Ok(ok())
}

/// `customers/redact` - no customer-scoped rows exist in this database.
async fn customers_redact(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<serde_json::Value>), StatusCode> {
    let shop = verify(&state, &headers, &body)?;
    tracing::info!(shop = shop.as_ref().map(ShopDomain::as_str), "customer redact received");
    Ok(ok())
}

/// `shop/redact` - purge everything stored for the shop.
async fn shop_redact(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<serde_json::Value>), StatusCode> {
    let shop = verify(&state, &headers, &body)?;

    if let Some(shop) = shop {
        let pool = state.pool();
        let purge = async {
            SessionRepository::new(pool).delete(&shop).await?;
            SubscriptionRepository::new(pool).delete(&shop).await?;
            UsageRepository::new(pool).delete_for_shop(&shop).await
        };
        match purge.await {
            Ok(_) => tracing::info!(shop = shop.as_str(), "shop data purged"),
            // Still 200: the platform must not retry into an error loop.
            Err(e) => tracing::error!(shop = shop.as_str(), error = %e, "shop redact failed"),
        }
    } else {
        tracing::warn!("shop redact without a parseable shop domain header");
    }

    Ok(ok())
}

#[derive(Debug, Deserialize)]
struct AppSubscriptionPayload {
    app_subscription: AppSubscriptionNode,
}

#[derive(Debug, Deserialize)]
struct AppSubscriptionNode {
    admin_graphql_api_id: String,
    #[serde(default)]
    name: String,
    status: String,
}

/// `app_subscriptions/update` - sync the local plan with the platform's
/// billing state.
async fn app_subscription_update(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<serde_json::Value>), StatusCode> {
    let Some(shop) = verify(&state, &headers, &body)? else {
        tracing::warn!("subscription webhook without a parseable shop domain header");
        return Ok(ok());
    };

    let payload: AppSubscriptionPayload = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(e) => {
            tracing::error!(error = %e, "unparseable subscription webhook payload");
            return Ok(ok());
        }
    };

    let node = payload.app_subscription;
    let plan = if node.status.eq_ignore_ascii_case("active") {
        Plan::Premium
    } else {
        Plan::Free
    };

    let status = node.status.to_ascii_lowercase();
    let update = SubscriptionUpdate {
        plan,
        status: &status,
        current_period_start: None,
        current_period_end: None,
        external_id: Some(&node.admin_graphql_api_id),
    };

    match SubscriptionRepository::new(state.pool())
        .upsert(&shop, update)
        .await
    {
        Ok(()) => tracing::info!(
            shop = shop.as_str(),
            plan = plan.as_str(),
            name = %node.name,
            "subscription updated"
        ),
        Err(e) => tracing::error!(shop = shop.as_str(), error = %e, "subscription upsert failed"),
    }

    Ok(ok())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sign(secret: &str, body: &[u8]) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(body);
        BASE64.encode(mac.finalize().into_bytes())
    }

    #[test]
    fn test_verify_webhook_hmac_accepts_valid() {
        let secret = SecretString::from("app-secret");
        let body = br#"{"shop_domain":"demo.myshopify.com"}"#;
        let signature = sign("app-secret", body);

        assert!(verify_webhook_hmac(&secret, body, &signature));
    }

    #[test]
    fn test_verify_webhook_hmac_rejects_wrong_secret() {
        let secret = SecretString::from("app-secret");
        let body = br#"{"shop_domain":"demo.myshopify.com"}"#;
        let signature = sign("other-secret", body);

        assert!(!verify_webhook_hmac(&secret, body, &signature));
    }

    #[test]
    fn test_verify_webhook_hmac_rejects_tampered_body() {
        let secret = SecretString::from("app-secret");
        let signature = sign("app-secret", b"original");

        assert!(!verify_webhook_hmac(&secret, b"tampered", &signature));
    }

    #[test]
    fn test_verify_webhook_hmac_rejects_invalid_base64() {
        let secret = SecretString::from("app-secret");
        assert!(!verify_webhook_hmac(&secret, b"body", "!!not-base64!!"));
    }
}
