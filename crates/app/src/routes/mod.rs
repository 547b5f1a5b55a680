//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                          - Liveness check
//! GET  /health/ready                    - Readiness check (database ping)
//!
//! # OAuth install flow
//! GET  /auth?shop=                      - Redirect to the authorize page
//! GET  /auth/callback                   - Code exchange + session upsert
//!
//! # Collections
//! POST /collections/create              - Create one collection from a form
//! GET  /collections/create              - Valid enums + example payloads
//! POST /collections/import              - Synchronous CSV import (dryRun supported)
//! POST /collections/import-bulk         - Asynchronous bulk CSV import
//! GET  /collections/bulk-status?id=     - Bulk operation status
//! GET  /collections/export              - Export collections (JSON or ?format=csv)
//!
//! # Usage & billing
//! GET  /usage/stats                     - Current-month usage and limits
//! GET  /subscription                    - Current plan
//! POST /subscription/upgrade            - Start a premium subscription
//! POST /subscription/downgrade          - Cancel and revert to free
//!
//! # Webhooks (HMAC-verified, always 200 after verification)
//! POST /webhooks/customers/data-request
//! POST /webhooks/customers/redact
//! POST /webhooks/shop/redact
//! POST /webhooks/app-subscriptions/update
//! ```

pub mod auth;
pub mod collections;
pub mod subscription;
pub mod usage;
pub mod webhooks;

use axum::Router;

use crate::state::AppState;

/// Assemble all application routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(auth::router())
        .merge(collections::router())
        .merge(usage::router())
        .merge(subscription::router())
        .merge(webhooks::router())
}
