//! Per-request result types returned in HTTP response bodies.
//!
//! Nothing here is persisted; the import report is built while the
//! orchestrator walks the batch and returned directly to the caller.

use serde::Serialize;

/// Outcome of a single row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RowStatus {
    Success,
    Error,
}

/// Result record for one imported row.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RowResult {
    /// 1-based line in the source file (header is line 1).
    pub row: usize,
    pub title: String,
    pub status: RowStatus,
    pub message: String,
    /// GID of the created or updated collection, when the row succeeded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Non-fatal issues: dropped product tokens, unparseable rules, skipped
    /// malformed CSV lines.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl RowResult {
    /// A successful row.
    #[must_use]
    pub fn success(
        row: usize,
        title: impl Into<String>,
        message: impl Into<String>,
        id: Option<String>,
        warnings: Vec<String>,
    ) -> Self {
        Self {
            row,
            title: title.into(),
            status: RowStatus::Success,
            message: message.into(),
            id,
            warnings,
        }
    }

    /// A failed row.
    #[must_use]
    pub fn error(
        row: usize,
        title: impl Into<String>,
        message: impl Into<String>,
        warnings: Vec<String>,
    ) -> Self {
        Self {
            row,
            title: title.into(),
            status: RowStatus::Error,
            message: message.into(),
            id: None,
            warnings,
        }
    }

    /// True if the row succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == RowStatus::Success
    }
}

/// Aggregate outcome of a synchronous import.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub created: usize,
    pub updated: usize,
    pub errors: usize,
    pub results: Vec<RowResult>,
}

impl ImportReport {
    /// Build a report from accumulated row results.
    #[must_use]
    pub fn from_results(results: Vec<RowResult>, created: usize, updated: usize) -> Self {
        let errors = results.iter().filter(|r| !r.is_success()).count();
        Self {
            created,
            updated,
            errors,
            results,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_report_counts_errors() {
        let results = vec![
            RowResult::success(2, "A", "created", Some("gid://shopify/Collection/1".into()), vec![]),
            RowResult::error(3, "B", "boom", vec![]),
            RowResult::success(4, "C", "created", Some("gid://shopify/Collection/2".into()), vec![]),
        ];
        let report = ImportReport::from_results(results, 2, 0);
        assert_eq!(report.created, 2);
        assert_eq!(report.errors, 1);
    }

    #[test]
    fn test_row_result_serialization_skips_empty() {
        let result = RowResult::success(2, "A", "created", None, vec![]);
        let json = serde_json::to_string(&result).unwrap();
        assert!(!json.contains("warnings"));
        assert!(!json.contains("\"id\""));
        assert!(json.contains("\"status\":\"success\""));
    }
}
