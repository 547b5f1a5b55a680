//! Usage limiting.
//!
//! Two plans gate the monthly counters: free (100/month, 50/operation) and
//! premium (1000/month, 1000/operation). The decision rule is evaluated in
//! order: per-operation cap first, then the monthly ceiling. The read-only
//! [`UsageService::check`] produces the friendly numbers for responses;
//! actual capacity is taken through the atomic reservation in the
//! repository, so concurrent requests cannot both slip under the ceiling.

use chrono::{Datelike, Utc};
use serde::Serialize;
use sqlx::PgPool;

use collectify_core::{Plan, PlanLimits, ShopDomain};

use crate::db::{RepositoryError, SubscriptionRepository, UsageOperation, UsageRepository};

/// Outcome of a usage-limit check.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageDecision {
    pub can_proceed: bool,
    /// Units left in the month (after the request, when it can proceed).
    pub remaining: u32,
    /// The cap that produced this decision.
    pub limit: u32,
    /// True when moving to premium would lift the cap that rejected.
    pub upgrade_required: bool,
}

/// Current usage statistics for a shop.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageStats {
    pub current: UsageTotals,
    pub limits: PlanLimits,
    pub plan: Plan,
    pub status: String,
    /// First day of the next calendar month, when the bucket resets.
    pub reset_date: String,
}

/// Counter totals for the current month.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageTotals {
    pub collections_imported: u32,
    pub collections_exported: u32,
    pub total: u32,
}

/// The (month, year) bucket key for the current calendar month.
#[must_use]
pub fn current_bucket() -> (i32, i32) {
    let now = Utc::now();
    #[allow(clippy::cast_possible_wrap)]
    let month = now.month() as i32;
    (month, now.year())
}

/// First day of the month after the current bucket, RFC 3339.
#[must_use]
pub fn next_reset_date() -> String {
    let (month, year) = current_bucket();
    let (month, year) = if month == 12 {
        (1, year + 1)
    } else {
        (month + 1, year)
    };
    format!("{year:04}-{month:02}-01T00:00:00Z")
}

/// Pure decision rule, evaluated in order.
#[must_use]
pub fn decide(plan: Plan, current_total: u32, requested: u32) -> UsageDecision {
    let limits = plan.limits();

    // 1. Per-operation cap, checked before any monthly arithmetic.
    if requested > limits.per_operation {
        return UsageDecision {
            can_proceed: false,
            remaining: limits.monthly.saturating_sub(current_total),
            limit: limits.per_operation,
            upgrade_required: plan == Plan::Free,
        };
    }

    // 2. Monthly ceiling.
    if current_total + requested > limits.monthly {
        return UsageDecision {
            can_proceed: false,
            remaining: limits.monthly.saturating_sub(current_total),
            limit: limits.monthly,
            upgrade_required: plan == Plan::Free,
        };
    }

    // 3. Allowed.
    UsageDecision {
        can_proceed: true,
        remaining: limits.monthly - (current_total + requested),
        limit: limits.monthly,
        upgrade_required: false,
    }
}

/// Usage limiting over the database counters.
pub struct UsageService<'a> {
    pool: &'a PgPool,
}

impl<'a> UsageService<'a> {
    /// Create a usage service over a pool.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Read-only limit check for the current month.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if a query fails.
    pub async fn check(
        &self,
        shop: &ShopDomain,
        requested: u32,
    ) -> Result<UsageDecision, RepositoryError> {
        let plan = SubscriptionRepository::new(self.pool).plan_for(shop).await?;
        let (month, year) = current_bucket();
        let counters = UsageRepository::new(self.pool)
            .current(shop, month, year)
            .await?;

        let current_total = u32::try_from(counters.total()).unwrap_or(0);
        Ok(decide(plan, current_total, requested))
    }

    /// Atomically reserve capacity in this month's bucket.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if a query fails.
    pub async fn try_reserve(
        &self,
        shop: &ShopDomain,
        operation: UsageOperation,
        count: u32,
    ) -> Result<bool, RepositoryError> {
        let plan = SubscriptionRepository::new(self.pool).plan_for(shop).await?;
        let (month, year) = current_bucket();
        let cap = i32::try_from(plan.limits().monthly).unwrap_or(i32::MAX);
        let count = i32::try_from(count).unwrap_or(i32::MAX);

        UsageRepository::new(self.pool)
            .try_reserve(shop, month, year, operation, count, cap)
            .await
    }

    /// Hand back reserved units whose work failed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if a query fails.
    pub async fn release(
        &self,
        shop: &ShopDomain,
        operation: UsageOperation,
        count: u32,
    ) -> Result<(), RepositoryError> {
        if count == 0 {
            return Ok(());
        }
        let (month, year) = current_bucket();
        UsageRepository::new(self.pool)
            .release(shop, month, year, operation, i32::try_from(count).unwrap_or(0))
            .await
    }

    /// Record usage after a successful operation whose size was not known
    /// up front (export).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if a query fails.
    pub async fn record(
        &self,
        shop: &ShopDomain,
        operation: UsageOperation,
        count: u32,
    ) -> Result<(), RepositoryError> {
        if count == 0 {
            return Ok(());
        }
        let (month, year) = current_bucket();
        UsageRepository::new(self.pool)
            .record(shop, month, year, operation, i32::try_from(count).unwrap_or(0))
            .await
    }

    /// Current usage statistics for the stats endpoint.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if a query fails.
    pub async fn stats(&self, shop: &ShopDomain) -> Result<UsageStats, RepositoryError> {
        let subscription = SubscriptionRepository::new(self.pool)
            .get_by_shop(shop)
            .await?;
        let plan = subscription.as_ref().map(|s| s.plan).unwrap_or_default();
        let status = subscription
            .map(|s| s.status)
            .unwrap_or_else(|| "active".to_string());

        let (month, year) = current_bucket();
        let counters = UsageRepository::new(self.pool)
            .current(shop, month, year)
            .await?;

        let imported = u32::try_from(counters.collections_imported).unwrap_or(0);
        let exported = u32::try_from(counters.collections_exported).unwrap_or(0);

        Ok(UsageStats {
            current: UsageTotals {
                collections_imported: imported,
                collections_exported: exported,
                total: imported + exported,
            },
            limits: plan.limits(),
            plan,
            status,
            reset_date: next_reset_date(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_per_operation_cap_checked_first() {
        // 51 items on free is rejected at the per-operation check even when
        // the monthly bucket is untouched.
        let decision = decide(Plan::Free, 0, 51);
        assert!(!decision.can_proceed);
        assert_eq!(decision.limit, 50);
        assert!(decision.upgrade_required);
    }

    #[test]
    fn test_monthly_cap_reports_remaining() {
        // 30 requested with 80 already used rejects at the monthly check
        // with remaining = 20.
        let decision = decide(Plan::Free, 80, 30);
        assert!(!decision.can_proceed);
        assert_eq!(decision.remaining, 20);
        assert_eq!(decision.limit, 100);
    }

    #[test]
    fn test_allowed_request_counts_itself_into_remaining() {
        let decision = decide(Plan::Free, 10, 30);
        assert!(decision.can_proceed);
        assert_eq!(decision.remaining, 60);
        assert!(!decision.upgrade_required);
    }

    #[test]
    fn test_exact_fit_is_allowed() {
        let decision = decide(Plan::Free, 80, 20);
        assert!(decision.can_proceed);
        assert_eq!(decision.remaining, 0);
    }

    #[test]
    fn test_premium_large_batch() {
        let decision = decide(Plan::Premium, 0, 900);
        assert!(decision.can_proceed);
        assert_eq!(decision.remaining, 100);
    }

    #[test]
    fn test_premium_rejection_does_not_require_upgrade() {
        let decision = decide(Plan::Premium, 0, 1001);
        assert!(!decision.can_proceed);
        assert!(!decision.upgrade_required);
    }

    #[test]
    fn test_monthly_overdraw_remaining_never_negative() {
        let decision = decide(Plan::Free, 120, 10);
        assert!(!decision.can_proceed);
        assert_eq!(decision.remaining, 0);
    }

    #[test]
    fn test_next_reset_date_shape() {
        let date = next_reset_date();
        assert!(date.ends_with("-01T00:00:00Z"));
    }
}
