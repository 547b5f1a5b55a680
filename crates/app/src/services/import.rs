//! Synchronous import and export orchestration.
//!
//! Import walks the validated rows strictly sequentially: one remote call
//! per row, no short-circuit on failure, no rollback of earlier successes.
//! The aggregate report reflects exactly the sequential attempt order.
//! Export paginates the remote listing with a hard safety cap and reports
//! when the cap truncated the result.

use tracing::instrument;

use crate::models::{CollectionRow, ImportReport, RowResult};
use crate::services::mapper::map_row;
use crate::shopify::{AdminClient, RemoteCollection, ShopifyError};

/// Page size for the export listing.
pub const EXPORT_PAGE_SIZE: i64 = 50;

/// Hard cap on exported records, bounding worst-case run time.
pub const EXPORT_MAX_RECORDS: usize = 1000;

/// Result of an export run.
#[derive(Debug, Clone)]
pub struct ExportOutcome {
    pub collections: Vec<RemoteCollection>,
    /// True when the safety cap cut pagination short.
    pub truncated: bool,
}

/// Run a synchronous import over validated rows.
///
/// In dry-run mode every row is parsed, validated, and mapped, but no remote
/// call is made; each row reports what would happen.
#[instrument(skip(client, rows), fields(row_count = rows.len(), dry_run))]
pub async fn run_import(client: &AdminClient, rows: &[CollectionRow], dry_run: bool) -> ImportReport {
    let mut results = Vec::with_capacity(rows.len());
    let mut created = 0;
    let mut updated = 0;

    for row in rows {
        let mapped = map_row(row);
        let title = row.title.trim().to_string();

        if dry_run {
            results.push(RowResult::success(
                row.line,
                title,
                "Dry run - collection would be created",
                None,
                mapped.warnings,
            ));
            continue;
        }

        let is_update = mapped.input.id.is_some();
        let outcome = if is_update {
            client.update_collection(&mapped.input).await
        } else {
            client.create_collection(&mapped.input).await
        };

        match outcome {
            Ok(collection) => {
                let message = if is_update {
                    updated += 1;
                    "Collection updated"
                } else {
                    created += 1;
                    "Collection created"
                };
                results.push(RowResult::success(
                    row.line,
                    title,
                    message,
                    Some(collection.id),
                    mapped.warnings,
                ));
            }
            Err(e) => {
                tracing::warn!(row = row.line, error = %e, "row import failed");
                results.push(RowResult::error(row.line, title, e.to_string(), mapped.warnings));
            }
        }
    }

    ImportReport::from_results(results, created, updated)
}

/// Export all collections, paginating until exhausted or capped.
///
/// # Errors
///
/// Returns the first remote error encountered; pages already fetched are
/// discarded.
#[instrument(skip(client))]
pub async fn run_export(client: &AdminClient) -> Result<ExportOutcome, ShopifyError> {
    let mut collections: Vec<RemoteCollection> = Vec::new();
    let mut cursor: Option<String> = None;
    let mut truncated = false;

    loop {
        let page = client.list_collections(EXPORT_PAGE_SIZE, cursor).await?;
        collections.extend(page.collections);

        if collections.len() >= EXPORT_MAX_RECORDS {
            truncated = page.has_next_page || collections.len() > EXPORT_MAX_RECORDS;
            collections.truncate(EXPORT_MAX_RECORDS);
            if truncated {
                tracing::warn!(
                    cap = EXPORT_MAX_RECORDS,
                    "export hit the record cap; result truncated"
                );
            }
            break;
        }

        if !page.has_next_page {
            break;
        }
        cursor = page.end_cursor;
    }

    Ok(ExportOutcome {
        collections,
        truncated,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use httpmock::prelude::*;
    use secrecy::SecretString;
    use serde_json::json;

    use super::*;
    use crate::models::RowStatus;

    fn client_for(server: &MockServer) -> AdminClient {
        AdminClient::with_endpoint(
            server.url("/graphql.json"),
            SecretString::from("shpat_test_token"),
        )
    }

    fn manual_row(line: usize, title: &str) -> CollectionRow {
        CollectionRow {
            line,
            title: title.to_string(),
            collection_type: "manual".to_string(),
            products: "gid://shopify/Product/1".to_string(),
            ..CollectionRow::default()
        }
    }

    fn created_body(title: &str, id: u64) -> serde_json::Value {
        json!({
            "data": {
                "collectionCreate": {
                    "collection": {
                        "id": format!("gid://shopify/Collection/{id}"),
                        "title": title,
                        "handle": title.to_lowercase()
                    },
                    "userErrors": []
                }
            }
        })
    }

    #[tokio::test]
    async fn test_dry_run_makes_no_remote_calls() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST);
            then.status(200).json_body(json!({"data": {}}));
        });

        let rows = vec![manual_row(2, "Alpha"), manual_row(3, "Beta")];
        let report = run_import(&client_for(&server), &rows, true).await;

        assert_eq!(mock.calls(), 0);
        assert_eq!(report.created, 0);
        assert_eq!(report.errors, 0);
        assert_eq!(report.results.len(), 2);
        assert!(report
            .results
            .iter()
            .all(|r| r.status == RowStatus::Success));
        assert!(report.results[0].message.contains("Dry run"));
    }

    #[tokio::test]
    async fn test_partial_success_continues_past_failures() {
        let server = MockServer::start();
        // Three rows; the second one's remote call fails. Matchers key off
        // the serialized title so they never overlap.
        server.mock(|when, then| {
            when.method(POST).body_includes("\"title\":\"Alpha\"");
            then.status(200).json_body(created_body("Alpha", 1));
        });
        server.mock(|when, then| {
            when.method(POST).body_includes("\"title\":\"Beta\"");
            then.status(200).json_body(json!({
                "data": {
                    "collectionCreate": {
                        "collection": null,
                        "userErrors": [{"field": ["input", "title"], "message": "is invalid"}]
                    }
                }
            }));
        });
        server.mock(|when, then| {
            when.method(POST).body_includes("\"title\":\"Gamma\"");
            then.status(200).json_body(created_body("Gamma", 3));
        });

        let rows = vec![
            manual_row(2, "Alpha"),
            manual_row(3, "Beta"),
            manual_row(4, "Gamma"),
        ];
        let report = run_import(&client_for(&server), &rows, false).await;

        assert_eq!(report.created, 2);
        assert_eq!(report.errors, 1);
        assert_eq!(report.results[0].status, RowStatus::Success);
        assert_eq!(report.results[1].status, RowStatus::Error);
        assert_eq!(report.results[2].status, RowStatus::Success);
        assert!(report.results[1].message.contains("is invalid"));
    }

    #[tokio::test]
    async fn test_rows_with_id_take_the_update_path() {
        let server = MockServer::start();
        let update = server.mock(|when, then| {
            when.method(POST).body_includes("collectionUpdate");
            then.status(200).json_body(json!({
                "data": {
                    "collectionUpdate": {
                        "collection": {
                            "id": "gid://shopify/Collection/7",
                            "title": "Alpha",
                            "handle": "alpha"
                        },
                        "userErrors": []
                    }
                }
            }));
        });

        let mut row = manual_row(2, "Alpha");
        row.id = "gid://shopify/Collection/7".to_string();
        let report = run_import(&client_for(&server), &[row], false).await;

        update.assert();
        assert_eq!(report.updated, 1);
        assert_eq!(report.created, 0);
    }

    fn page_body(start: usize, count: usize, next_cursor: Option<&str>) -> serde_json::Value {
        let nodes: Vec<serde_json::Value> = (start..start + count)
            .map(|i| {
                json!({
                    "id": format!("gid://shopify/Collection/{i}"),
                    "title": format!("Collection {i}"),
                    "handle": format!("collection-{i}"),
                    "descriptionHtml": "",
                    "sortOrder": "MANUAL",
                    "templateSuffix": null,
                    "productsCount": {"count": 1},
                    "ruleSet": null,
                    "image": null,
                    "seo": {"title": null, "description": null},
                    "publishedOnCurrentPublication": true,
                    "products": {"nodes": [{"id": format!("gid://shopify/Product/{i}")}]}
                })
            })
            .collect();

        json!({
            "data": {
                "collections": {
                    "pageInfo": {
                        "hasNextPage": next_cursor.is_some(),
                        "endCursor": next_cursor
                    },
                    "nodes": nodes
                }
            }
        })
    }

    #[tokio::test]
    async fn test_export_paginates_until_exhausted() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).body_includes("\"after\":null");
            then.status(200).json_body(page_body(0, 50, Some("c1")));
        });
        server.mock(|when, then| {
            when.method(POST).body_includes("\"after\":\"c1\"");
            then.status(200).json_body(page_body(50, 20, None));
        });

        let outcome = run_export(&client_for(&server)).await.unwrap();
        assert_eq!(outcome.collections.len(), 70);
        assert!(!outcome.truncated);
    }

    #[tokio::test]
    async fn test_export_truncates_at_cap_and_flags_it() {
        let server = MockServer::start();
        // 20 full pages reach the 1000-record cap with more data remaining.
        server.mock(|when, then| {
            when.method(POST).body_includes("\"after\":null");
            then.status(200).json_body(page_body(0, 50, Some("c1")));
        });
        for page in 1..20 {
            let cursor = format!("c{page}");
            let next = format!("c{}", page + 1);
            server.mock(|when, then| {
                when.method(POST)
                    .body_includes(format!("\"after\":\"{cursor}\""));
                then.status(200)
                    .json_body(page_body(page * 50, 50, Some(&next)));
            });
        }

        let outcome = run_export(&client_for(&server)).await.unwrap();
        assert_eq!(outcome.collections.len(), EXPORT_MAX_RECORDS);
        assert!(outcome.truncated);
    }
}
