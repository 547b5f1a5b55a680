//! Shopify Admin API GraphQL client.
//!
//! One client per (shop, access token) pair, built per-request from the
//! stored OAuth session. Queries and mutations are sent as raw GraphQL
//! documents with typed response structs; user errors returned by mutations
//! are surfaced as [`ShopifyError::UserError`] with the messages joined, and
//! are never retried.

mod billing;
mod bulk;
mod client;
mod collections;
mod oauth;

pub use billing::PendingSubscription;
pub use bulk::{BulkOperation, BulkStatus, StagedUploadTarget};
pub use client::AdminClient;
pub use collections::{
    CollectionInput, CollectionPage, CreatedCollection, ImageInput, RemoteCollection,
    RemoteImage, RemoteRule, RemoteRuleSet, RuleInput, RuleSetInput, SeoInput,
};
pub use oauth::{AccessTokenResponse, authorization_url, exchange_code, verify_callback_hmac};

use thiserror::Error;

/// Errors that can occur when interacting with the Shopify Admin API.
#[derive(Debug, Error)]
pub enum ShopifyError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// GraphQL query returned errors.
    #[error("GraphQL errors: {}", .0.join("; "))]
    GraphQL(Vec<String>),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limited by Shopify.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Authentication/authorization failed.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// User error from a mutation (e.g., invalid input).
    #[error("User error: {0}")]
    UserError(String),

    /// Staged upload target rejected the file.
    #[error("Staged upload failed: {0}")]
    Upload(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ShopifyError::NotFound("gid://shopify/Collection/1".to_string());
        assert_eq!(err.to_string(), "Not found: gid://shopify/Collection/1");

        let err = ShopifyError::GraphQL(vec!["Field not found".into(), "Invalid ID".into()]);
        assert_eq!(
            err.to_string(),
            "GraphQL errors: Field not found; Invalid ID"
        );

        let err = ShopifyError::RateLimited(60);
        assert_eq!(err.to_string(), "Rate limited, retry after 60 seconds");
    }
}
