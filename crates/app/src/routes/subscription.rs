//! Subscription endpoints: plan lookup, upgrade, downgrade.

use axum::{Json, Router, extract::State, routing::{get, post}};
use serde::Serialize;

use collectify_core::Plan;

use crate::{
    db::{SubscriptionRepository, SubscriptionUpdate},
    error::AppError,
    middleware::RequireShop,
    state::AppState,
};

/// Monthly price of the premium plan, as sent to the billing API.
const PREMIUM_PRICE: &str = "9.99";
const PREMIUM_PLAN_NAME: &str = "Collectify Premium";

/// Build the subscription router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/subscription", get(current_subscription))
        .route("/subscription/upgrade", post(upgrade))
        .route("/subscription/downgrade", post(downgrade))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SubscriptionResponse {
    success: bool,
    plan: Plan,
    status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    current_period_end: Option<String>,
}

/// Current plan for the shop; free when no subscription row exists.
async fn current_subscription(
    RequireShop(ctx): RequireShop,
    State(state): State<AppState>,
) -> Result<Json<SubscriptionResponse>, AppError> {
    let subscription = SubscriptionRepository::new(state.pool())
        .get_by_shop(&ctx.shop)
        .await?;

    let (plan, status, period_end) = subscription.map_or(
        (Plan::Free, "active".to_string(), None),
        |s| (s.plan, s.status, s.current_period_end),
    );

    Ok(Json(SubscriptionResponse {
        success: true,
        plan,
        status,
        current_period_end: period_end.map(|d| d.to_rfc3339()),
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UpgradeResponse {
    success: bool,
    confirmation_url: String,
}

/// Start a premium subscription. The plan flips to premium once the
/// merchant confirms the charge and the subscription webhook lands.
async fn upgrade(
    RequireShop(ctx): RequireShop,
    State(state): State<AppState>,
) -> Result<Json<UpgradeResponse>, AppError> {
    let return_url = format!("{}/subscription", state.config().base_url);
    let pending = ctx
        .client
        .create_app_subscription(PREMIUM_PLAN_NAME, PREMIUM_PRICE, &return_url)
        .await?;

    SubscriptionRepository::new(state.pool())
        .upsert(
            &ctx.shop,
            SubscriptionUpdate {
                plan: Plan::Free,
                status: "pending",
                current_period_start: None,
                current_period_end: None,
                external_id: Some(&pending.id),
            },
        )
        .await?;

    Ok(Json(UpgradeResponse {
        success: true,
        confirmation_url: pending.confirmation_url,
    }))
}

/// Cancel the remote subscription (when one exists) and revert to free.
async fn downgrade(
    RequireShop(ctx): RequireShop,
    State(state): State<AppState>,
) -> Result<Json<SubscriptionResponse>, AppError> {
    let repo = SubscriptionRepository::new(state.pool());
    let subscription = repo.get_by_shop(&ctx.shop).await?;

    if let Some(external_id) = subscription.as_ref().and_then(|s| s.external_id.as_deref()) {
        ctx.client.cancel_app_subscription(external_id).await?;
    }

    repo.upsert(
        &ctx.shop,
        SubscriptionUpdate {
            plan: Plan::Free,
            status: "active",
            current_period_start: None,
            current_period_end: None,
            external_id: None,
        },
    )
    .await?;

    Ok(Json(SubscriptionResponse {
        success: true,
        plan: Plan::Free,
        status: "active".to_string(),
        current_period_end: None,
    }))
}
