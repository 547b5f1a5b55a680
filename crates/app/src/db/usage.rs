//! Monthly usage bucket repository.
//!
//! Capacity is reserved with a single conditional upsert-increment, so two
//! concurrent requests from the same shop cannot both slip past the monthly
//! ceiling. Counters for failed rows are handed back with [`release`].
//!
//! [`release`]: UsageRepository::release

use sqlx::PgPool;

use collectify_core::ShopDomain;

use super::RepositoryError;

/// Which metered operation a reservation belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsageOperation {
    Import,
    Export,
}

impl UsageOperation {
    /// Counter column name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Import => "import",
            Self::Export => "export",
        }
    }
}

/// Counters for one (shop, month, year) bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, sqlx::FromRow)]
pub struct UsageCounters {
    pub collections_imported: i32,
    pub collections_exported: i32,
}

impl UsageCounters {
    /// Combined monthly total.
    #[must_use]
    pub const fn total(self) -> i32 {
        self.collections_imported + self.collections_exported
    }
}

/// Repository for monthly usage buckets.
pub struct UsageRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UsageRepository<'a> {
    /// Create a new usage repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Current counters for a bucket, zero when the bucket does not exist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn current(
        &self,
        shop: &ShopDomain,
        month: i32,
        year: i32,
    ) -> Result<UsageCounters, RepositoryError> {
        let counters = sqlx::query_as::<_, UsageCounters>(
            r"
            SELECT collections_imported, collections_exported
            FROM usage_records
            WHERE shop = $1 AND month = $2 AND year = $3
            ",
        )
        .bind(shop.as_str())
        .bind(month)
        .bind(year)
        .fetch_optional(self.pool)
        .await?;

        Ok(counters.unwrap_or_default())
    }

    /// Atomically reserve `count` units against the monthly ceiling.
    ///
    /// Upserts the bucket and increments the operation's counter in one
    /// statement whose update is guarded by the ceiling; returns `false`
    /// (and changes nothing) when the increment would exceed `monthly_cap`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn try_reserve(
        &self,
        shop: &ShopDomain,
        month: i32,
        year: i32,
        operation: UsageOperation,
        count: i32,
        monthly_cap: i32,
    ) -> Result<bool, RepositoryError> {
        let (import_delta, export_delta) = match operation {
            UsageOperation::Import => (count, 0),
            UsageOperation::Export => (0, count),
        };

        let reserved: Option<i32> = sqlx::query_scalar(
            r"
            INSERT INTO usage_records
                (shop, month, year, collections_imported, collections_exported)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (shop, month, year) DO UPDATE SET
                collections_imported =
                    usage_records.collections_imported + EXCLUDED.collections_imported,
                collections_exported =
                    usage_records.collections_exported + EXCLUDED.collections_exported,
                updated_at = (CURRENT_TIMESTAMP AT TIME ZONE 'utc')
            WHERE usage_records.collections_imported + usage_records.collections_exported
                + EXCLUDED.collections_imported + EXCLUDED.collections_exported <= $6
            RETURNING id
            ",
        )
        .bind(shop.as_str())
        .bind(month)
        .bind(year)
        .bind(import_delta)
        .bind(export_delta)
        .bind(monthly_cap)
        .fetch_optional(self.pool)
        .await?;

        Ok(reserved.is_some())
    }

    /// Hand back previously reserved units (e.g., rows whose remote call
    /// failed). Counters never go below zero.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn release(
        &self,
        shop: &ShopDomain,
        month: i32,
        year: i32,
        operation: UsageOperation,
        count: i32,
    ) -> Result<(), RepositoryError> {
        let (import_delta, export_delta) = match operation {
            UsageOperation::Import => (count, 0),
            UsageOperation::Export => (0, count),
        };

        sqlx::query(
            r"
            UPDATE usage_records SET
                collections_imported = GREATEST(0, collections_imported - $4),
                collections_exported = GREATEST(0, collections_exported - $5),
                updated_at = (CURRENT_TIMESTAMP AT TIME ZONE 'utc')
            WHERE shop = $1 AND month = $2 AND year = $3
            ",
        )
        .bind(shop.as_str())
        .bind(month)
        .bind(year)
        .bind(import_delta)
        .bind(export_delta)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Delete every bucket for a shop (shop redact).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete_for_shop(&self, shop: &ShopDomain) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM usage_records WHERE shop = $1")
            .bind(shop.as_str())
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    /// Record usage without a ceiling check.
    ///
    /// Used by the export path, where the exported count is only known after
    /// the remote fetch completed; the monthly gate ran before the fetch.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn record(
        &self,
        shop: &ShopDomain,
        month: i32,
        year: i32,
        operation: UsageOperation,
        count: i32,
    ) -> Result<(), RepositoryError> {
        let (import_delta, export_delta) = match operation {
            UsageOperation::Import => (count, 0),
            UsageOperation::Export => (0, count),
        };

        sqlx::query(
            r"
            INSERT INTO usage_records
                (shop, month, year, collections_imported, collections_exported)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (shop, month, year) DO UPDATE SET
                collections_imported =
                    usage_records.collections_imported + EXCLUDED.collections_imported,
                collections_exported =
                    usage_records.collections_exported + EXCLUDED.collections_exported,
                updated_at = (CURRENT_TIMESTAMP AT TIME ZONE 'utc')
            ",
        )
        .bind(shop.as_str())
        .bind(month)
        .bind(year)
        .bind(import_delta)
        .bind(export_delta)
        .execute(self.pool)
        .await?;

        Ok(())
    }
}
