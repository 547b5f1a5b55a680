//! OAuth install flow helpers.
//!
//! The app-level OAuth handshake: build the authorize URL, verify the
//! signed callback, and exchange the grant code for a per-shop Admin token.

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use sha2::Sha256;

use collectify_core::ShopDomain;

use super::ShopifyError;

type HmacSha256 = Hmac<Sha256>;

/// Token response from the OAuth code exchange.
#[derive(Debug, Deserialize)]
pub struct AccessTokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub scope: String,
}

/// Build the OAuth authorization URL for a shop.
#[must_use]
pub fn authorization_url(
    shop: &ShopDomain,
    api_key: &str,
    scopes: &str,
    redirect_uri: &str,
    state: &str,
) -> String {
    format!(
        "https://{}/admin/oauth/authorize?client_id={}&scope={}&redirect_uri={}&state={}",
        shop.as_str(),
        urlencoding::encode(api_key),
        urlencoding::encode(scopes),
        urlencoding::encode(redirect_uri),
        urlencoding::encode(state)
    )
}

/// Verify the `hmac` parameter of an OAuth callback.
///
/// The signature covers every query parameter except `hmac` itself, sorted
/// by name and joined as `k=v&k=v`, HMAC-SHA256 over the app secret,
/// hex-encoded. Comparison is constant-time.
#[must_use]
pub fn verify_callback_hmac(
    api_secret: &SecretString,
    params: &[(String, String)],
    provided_hex: &str,
) -> bool {
    let Ok(provided) = hex::decode(provided_hex) else {
        return false;
    };

    let mut pairs: Vec<&(String, String)> =
        params.iter().filter(|(name, _)| name != "hmac").collect();
    pairs.sort();
    let message = pairs
        .iter()
        .map(|(name, value)| format!("{name}={value}"))
        .collect::<Vec<_>>()
        .join("&");

    let Ok(mut mac) = HmacSha256::new_from_slice(api_secret.expose_secret().as_bytes()) else {
        return false;
    };
    mac.update(message.as_bytes());
    mac.verify_slice(&provided).is_ok()
}

/// Exchange an authorization code for an access token.
///
/// # Errors
///
/// Returns `Unauthorized` when the platform rejects the exchange, or `Http`
/// for transport failures.
pub async fn exchange_code(
    http: &reqwest::Client,
    shop: &ShopDomain,
    api_key: &str,
    api_secret: &SecretString,
    code: &str,
) -> Result<AccessTokenResponse, ShopifyError> {
    let url = format!("https://{}/admin/oauth/access_token", shop.as_str());

    let params = [
        ("client_id", api_key),
        ("client_secret", api_secret.expose_secret()),
        ("code", code),
    ];

    let response = http.post(&url).form(&params).send().await?;

    if !response.status().is_success() {
        let text = response.text().await.unwrap_or_default();
        return Err(ShopifyError::Unauthorized(format!(
            "Token exchange failed: {text}"
        )));
    }

    Ok(response.json().await?)
}
