//! Usage statistics endpoint.

use axum::{Json, Router, extract::State, routing::get};

use crate::{
    error::AppError,
    middleware::RequireShop,
    services::usage::{UsageService, UsageStats},
    state::AppState,
};

/// Build the usage router.
pub fn router() -> Router<AppState> {
    Router::new().route("/usage/stats", get(usage_stats))
}

/// Current-month counters, plan limits, and the bucket reset date.
async fn usage_stats(
    RequireShop(ctx): RequireShop,
    State(state): State<AppState>,
) -> Result<Json<UsageStats>, AppError> {
    let stats = UsageService::new(state.pool()).stats(&ctx.shop).await?;
    Ok(Json(stats))
}
