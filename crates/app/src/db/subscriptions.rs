//! Subscription repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use collectify_core::{Plan, ShopDomain};

use super::RepositoryError;

/// A shop's subscription. One row per shop, upserted on change.
#[derive(Debug, Clone)]
pub struct Subscription {
    pub shop: ShopDomain,
    pub plan: Plan,
    pub status: String,
    pub current_period_start: Option<DateTime<Utc>>,
    pub current_period_end: Option<DateTime<Utc>>,
    /// Platform subscription GID, when a paid plan is active.
    pub external_id: Option<String>,
}

#[derive(Debug, sqlx::FromRow)]
struct SubscriptionRow {
    shop: String,
    plan: String,
    status: String,
    current_period_start: Option<DateTime<Utc>>,
    current_period_end: Option<DateTime<Utc>>,
    external_id: Option<String>,
}

impl TryFrom<SubscriptionRow> for Subscription {
    type Error = RepositoryError;

    fn try_from(row: SubscriptionRow) -> Result<Self, Self::Error> {
        let shop = ShopDomain::parse(&row.shop)
            .map_err(|e| RepositoryError::DataCorruption(format!("shop domain: {e}")))?;
        let plan = row
            .plan
            .parse()
            .map_err(|e| RepositoryError::DataCorruption(format!("plan: {e}")))?;

        Ok(Self {
            shop,
            plan,
            status: row.status,
            current_period_start: row.current_period_start,
            current_period_end: row.current_period_end,
            external_id: row.external_id,
        })
    }
}

/// Fields for upserting a subscription.
#[derive(Debug, Clone)]
pub struct SubscriptionUpdate<'s> {
    pub plan: Plan,
    pub status: &'s str,
    pub current_period_start: Option<DateTime<Utc>>,
    pub current_period_end: Option<DateTime<Utc>>,
    pub external_id: Option<&'s str>,
}

/// Repository for shop subscriptions.
pub struct SubscriptionRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> SubscriptionRepository<'a> {
    /// Create a new subscription repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get the subscription for a shop.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_shop(
        &self,
        shop: &ShopDomain,
    ) -> Result<Option<Subscription>, RepositoryError> {
        let row = sqlx::query_as::<_, SubscriptionRow>(
            r"
            SELECT shop, plan, status, current_period_start, current_period_end, external_id
            FROM subscriptions
            WHERE shop = $1
            ",
        )
        .bind(shop.as_str())
        .fetch_optional(self.pool)
        .await?;

        row.map(Subscription::try_from).transpose()
    }

    /// The effective plan for a shop: the stored plan, or free when no
    /// subscription row exists yet.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn plan_for(&self, shop: &ShopDomain) -> Result<Plan, RepositoryError> {
        Ok(self
            .get_by_shop(shop)
            .await?
            .map(|s| s.plan)
            .unwrap_or_default())
    }

    /// Save or update the subscription for a shop.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn upsert(
        &self,
        shop: &ShopDomain,
        update: SubscriptionUpdate<'_>,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO subscriptions
                (shop, plan, status, current_period_start, current_period_end, external_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (shop) DO UPDATE SET
                plan = EXCLUDED.plan,
                status = EXCLUDED.status,
                current_period_start = EXCLUDED.current_period_start,
                current_period_end = EXCLUDED.current_period_end,
                external_id = EXCLUDED.external_id,
                updated_at = (CURRENT_TIMESTAMP AT TIME ZONE 'utc')
            ",
        )
        .bind(shop.as_str())
        .bind(update.plan.as_str())
        .bind(update.status)
        .bind(update.current_period_start)
        .bind(update.current_period_end)
        .bind(update.external_id)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Delete the subscription for a shop (shop redact).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(&self, shop: &ShopDomain) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM subscriptions WHERE shop = $1")
            .bind(shop.as_str())
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
