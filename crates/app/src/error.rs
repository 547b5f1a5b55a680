//! Unified error handling for the API.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::csv::CsvError;
use crate::services::usage::UsageDecision;
use crate::shopify::ShopifyError;

/// Application-level error type.
///
/// Every variant renders as a JSON body with `success: false`; the variants
/// map onto the HTTP contract: 400 validation, 401 authentication, 429 usage
/// limit, 502 remote failures, 500 everything unexpected.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Shopify API operation failed.
    #[error("Shopify error: {0}")]
    Shopify(#[from] ShopifyError),

    /// CSV file could not be read at all.
    #[error("CSV error: {0}")]
    Csv(#[from] CsvError),

    /// One or more rows failed validation (whole batch rejected).
    #[error("Validation failed")]
    Validation(Vec<String>),

    /// The request would exceed the shop's usage limits.
    #[error("Usage limit exceeded")]
    UsageLimit(UsageDecision),

    /// Credential could not be resolved to a shop access token.
    #[error("Authentication failed")]
    Unauthorized,

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server-side failures; client errors are just request noise.
        if matches!(self, Self::Database(_) | Self::Internal(_)) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(error = %self, sentry_event_id = %event_id, "request error");
        }

        let (status, body) = match &self {
            Self::Validation(errors) => (
                StatusCode::BAD_REQUEST,
                json!({
                    "success": false,
                    "error": "Validation failed",
                    "errors": errors,
                }),
            ),
            Self::UsageLimit(decision) => (
                StatusCode::TOO_MANY_REQUESTS,
                json!({
                    "success": false,
                    "error": "Usage limit exceeded",
                    "remaining": decision.remaining,
                    "limit": decision.limit,
                    "upgradeRequired": decision.upgrade_required,
                }),
            ),
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                json!({ "success": false, "error": "Authentication failed" }),
            ),
            // The platform rejected the mutation input; its messages go back
            // to the caller verbatim and are never retried.
            Self::Shopify(ShopifyError::UserError(details)) => (
                StatusCode::BAD_REQUEST,
                json!({
                    "success": false,
                    "error": "Shopify rejected the request",
                    "details": details,
                }),
            ),
            Self::Shopify(ShopifyError::Unauthorized(_)) => (
                StatusCode::UNAUTHORIZED,
                json!({ "success": false, "error": "Authentication failed" }),
            ),
            Self::Shopify(_) => {
                tracing::warn!(error = %self, "upstream Shopify error");
                (
                    StatusCode::BAD_GATEWAY,
                    json!({ "success": false, "error": "External service error" }),
                )
            }
            Self::Csv(e) => (
                StatusCode::BAD_REQUEST,
                json!({ "success": false, "error": format!("CSV error: {e}") }),
            ),
            Self::BadRequest(message) => (
                StatusCode::BAD_REQUEST,
                json!({ "success": false, "error": message }),
            ),
            Self::NotFound(what) => (
                StatusCode::NOT_FOUND,
                json!({ "success": false, "error": format!("Not found: {what}") }),
            ),
            Self::Database(_) | Self::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "success": false, "error": "Internal server error" }),
            ),
        };

        (status, Json(body)).into_response()
    }
}

impl From<axum::extract::multipart::MultipartError> for AppError {
    fn from(err: axum::extract::multipart::MultipartError) -> Self {
        Self::BadRequest(format!("Invalid multipart body: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            status_of(AppError::Validation(vec!["Row 2: title is required".into()])),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(status_of(AppError::Unauthorized), StatusCode::UNAUTHORIZED);
        assert_eq!(
            status_of(AppError::UsageLimit(UsageDecision {
                can_proceed: false,
                remaining: 20,
                limit: 100,
                upgrade_required: true,
            })),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            status_of(AppError::Internal("boom".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_of(AppError::NotFound("bulk operation".into())),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_remote_user_errors_are_bad_requests() {
        let err = AppError::Shopify(ShopifyError::UserError("title: taken".into()));
        assert_eq!(status_of(err), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_remote_transport_errors_are_bad_gateway() {
        let err = AppError::Shopify(ShopifyError::GraphQL(vec!["boom".into()]));
        assert_eq!(status_of(err), StatusCode::BAD_GATEWAY);
    }
}
