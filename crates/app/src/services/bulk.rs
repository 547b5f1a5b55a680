//! Bulk (asynchronous) import orchestration.
//!
//! For batches up to [`MAX_BULK_ROWS`]: every row maps to one
//! newline-delimited JSON object, the NDJSON blob is pushed to a staged
//! upload target, and a remote bulk mutation is launched over it - one
//! `collectionCreate` per line. Submission returns the job id immediately;
//! completion is observed through the status query, either by the client
//! polling the HTTP endpoint or by [`wait_for_completion`], an explicit
//! backoff loop with a retry ceiling. Dropping the returned future cancels
//! the wait.

use std::time::Duration;

use tracing::instrument;

use crate::models::CollectionRow;
use crate::services::mapper::map_row;
use crate::shopify::{AdminClient, BulkOperation, BulkStatus, ShopifyError};

/// Largest batch the bulk path accepts.
pub const MAX_BULK_ROWS: usize = 1000;

/// Filename used for the staged variables upload.
pub const BULK_VARIABLES_FILENAME: &str = "collectify-bulk-import.jsonl";

const BULK_VARIABLES_MIME: &str = "text/jsonl";

/// Mutation template the remote executor applies to each NDJSON line.
pub const BULK_COLLECTION_CREATE: &str = r"
mutation call($input: CollectionInput!) {
  collectionCreate(input: $input) {
    collection { id title handle }
    userErrors { field message }
  }
}
";

/// A launched bulk import.
#[derive(Debug, Clone)]
pub struct BulkSubmission {
    /// Remote bulk operation GID.
    pub operation_id: String,
    /// Rows serialized into the variables file.
    pub rows: usize,
    /// Mapping warnings, prefixed with their row line.
    pub warnings: Vec<String>,
}

/// Serialize rows as one `{"input": ...}` JSON object per line.
///
/// # Errors
///
/// Returns `Parse` if a mapped input fails to serialize.
pub fn build_ndjson(rows: &[CollectionRow]) -> Result<(String, Vec<String>), ShopifyError> {
    let mut ndjson = String::new();
    let mut warnings = Vec::new();

    for row in rows {
        let mapped = map_row(row);
        for warning in mapped.warnings {
            warnings.push(format!("Row {}: {warning}", row.line));
        }

        let line = serde_json::to_string(&serde_json::json!({ "input": mapped.input }))?;
        ndjson.push_str(&line);
        ndjson.push('\n');
    }

    Ok((ndjson, warnings))
}

/// Stage, upload, and launch a bulk import over validated rows.
///
/// # Errors
///
/// Returns an error from any of the three remote steps; nothing is retried.
#[instrument(skip(client, rows), fields(row_count = rows.len()))]
pub async fn submit_bulk_import(
    client: &AdminClient,
    rows: &[CollectionRow],
) -> Result<BulkSubmission, ShopifyError> {
    let (ndjson, warnings) = build_ndjson(rows)?;

    let target = client
        .create_staged_upload(
            BULK_VARIABLES_FILENAME,
            BULK_VARIABLES_MIME,
            i64::try_from(ndjson.len()).unwrap_or(i64::MAX),
        )
        .await?;

    client
        .upload_to_staged_target(
            &target,
            BULK_VARIABLES_FILENAME,
            BULK_VARIABLES_MIME,
            ndjson.into_bytes(),
        )
        .await?;

    let key = target.key().ok_or_else(|| {
        ShopifyError::Upload("staged upload target did not include a key parameter".into())
    })?;

    let operation_id = client.run_bulk_mutation(BULK_COLLECTION_CREATE, key).await?;
    tracing::info!(%operation_id, rows = rows.len(), "bulk import launched");

    Ok(BulkSubmission {
        operation_id,
        rows: rows.len(),
        warnings,
    })
}

/// Backoff settings for [`wait_for_completion`].
#[derive(Debug, Clone, Copy)]
pub struct PollSettings {
    /// Delay before the second status query.
    pub initial_interval: Duration,
    /// Ceiling for the backed-off interval.
    pub max_interval: Duration,
    /// Maximum number of status queries before giving up.
    pub max_attempts: u32,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_secs(2),
            max_interval: Duration::from_secs(30),
            max_attempts: 20,
        }
    }
}

/// Terminal result of a bounded polling loop.
#[derive(Debug, Clone)]
pub enum PollOutcome {
    /// The operation completed successfully.
    Completed(BulkOperation),
    /// The operation reached a terminal failure state (failed, canceled,
    /// or expired).
    Failed(BulkOperation),
    /// The retry ceiling was hit while the operation was still running.
    TimedOut {
        last: BulkOperation,
        attempts: u32,
    },
}

/// Poll a bulk operation until it is terminal or the retry ceiling is hit.
///
/// The interval doubles after every query up to `max_interval`. Dropping
/// the future cancels the loop - there is no detached timer to clean up.
///
/// # Errors
///
/// Returns `NotFound` when the id does not resolve to a bulk operation, or
/// any transport error from a status query.
#[instrument(skip(client, settings))]
pub async fn wait_for_completion(
    client: &AdminClient,
    operation_id: &str,
    settings: PollSettings,
) -> Result<PollOutcome, ShopifyError> {
    let mut interval = settings.initial_interval;
    let mut last: Option<BulkOperation> = None;

    for attempt in 1..=settings.max_attempts {
        let operation = client
            .bulk_operation(operation_id)
            .await?
            .ok_or_else(|| ShopifyError::NotFound(operation_id.to_string()))?;

        tracing::debug!(attempt, status = %operation.status, "bulk status poll");

        match operation.status {
            BulkStatus::Completed => return Ok(PollOutcome::Completed(operation)),
            status if status.is_terminal() => return Ok(PollOutcome::Failed(operation)),
            _ => {}
        }

        last = Some(operation);

        if attempt < settings.max_attempts {
            tokio::time::sleep(interval).await;
            interval = (interval * 2).min(settings.max_interval);
        }
    }

    // max_attempts >= 1, so a non-terminal exit always has a last state.
    let last = last.ok_or_else(|| ShopifyError::NotFound(operation_id.to_string()))?;
    Ok(PollOutcome::TimedOut {
        last,
        attempts: settings.max_attempts,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use httpmock::prelude::*;
    use secrecy::SecretString;
    use serde_json::json;

    use super::*;

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

    #[test]
    fn test_build_ndjson_one_object_per_line() {
        let rows = vec![manual_row(2, "Alpha"), manual_row(3, "Beta")];
        let (ndjson, warnings) = build_ndjson(&rows).unwrap();

        assert!(warnings.is_empty());
        let lines: Vec<&str> = ndjson.lines().collect();
        assert_eq!(lines.len(), 2);

        for line in lines {
            let value: serde_json::Value = serde_json::from_str(line).unwrap();
            assert!(value.get("input").is_some());
            assert!(value["input"].get("title").is_some());
        }
        assert!(ndjson.ends_with('\n'));
    }

    #[test]
    fn test_build_ndjson_prefixes_warnings_with_row() {
        let mut row = manual_row(5, "Alpha");
        row.products = "gid://shopify/Product/1,bogus".to_string();

        let (_, warnings) = build_ndjson(&[row]).unwrap();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].starts_with("Row 5:"));
    }

    #[tokio::test]
    async fn test_submit_bulk_import_full_flow() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST)
                .path("/graphql.json")
                .body_includes("stagedUploadsCreate");
            then.status(200).json_body(json!({
                "data": {
                    "stagedUploadsCreate": {
                        "stagedTargets": [{
                            "url": server.url("/upload"),
                            "resourceUrl": server.url("/tmp/1"),
                            "parameters": [
                                {"name": "policy", "value": "p"},
                                {"name": "key", "value": "tmp/1/bulk.jsonl"}
                            ]
                        }],
                        "userErrors": []
                    }
                }
            }));
        });
        let upload = server.mock(|when, then| {
            when.method(POST).path("/upload");
            then.status(201);
        });
        let run = server.mock(|when, then| {
            when.method(POST)
                .path("/graphql.json")
                .body_includes("bulkOperationRunMutation")
                .body_includes("tmp/1/bulk.jsonl");
            then.status(200).json_body(json!({
                "data": {
                    "bulkOperationRunMutation": {
                        "bulkOperation": {
                            "id": "gid://shopify/BulkOperation/9",
                            "status": "CREATED"
                        },
                        "userErrors": []
                    }
                }
            }));
        });

        let rows = vec![manual_row(2, "Alpha"), manual_row(3, "Beta")];
        let submission = submit_bulk_import(&client_for(&server), &rows)
            .await
            .unwrap();

        upload.assert();
        run.assert();
        assert_eq!(submission.operation_id, "gid://shopify/BulkOperation/9");
        assert_eq!(submission.rows, 2);
    }

    fn status_body(status: &str) -> serde_json::Value {
        json!({
            "data": {
                "node": {
                    "id": "gid://shopify/BulkOperation/9",
                    "status": status,
                    "objectCount": "2",
                    "url": null,
                    "errorCode": null,
                    "createdAt": "2026-08-01T00:00:00Z",
                    "completedAt": null
                }
            }
        })
    }

    #[tokio::test]
    async fn test_wait_for_completion_returns_completed() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/graphql.json");
            then.status(200).json_body(status_body("COMPLETED"));
        });

        let outcome = wait_for_completion(
            &client_for(&server),
            "gid://shopify/BulkOperation/9",
            PollSettings {
                initial_interval: Duration::from_millis(1),
                max_interval: Duration::from_millis(5),
                max_attempts: 3,
            },
        )
        .await
        .unwrap();

        assert!(matches!(outcome, PollOutcome::Completed(_)));
    }

    #[tokio::test]
    async fn test_wait_for_completion_maps_failure() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/graphql.json");
            then.status(200).json_body(status_body("FAILED"));
        });

        let outcome = wait_for_completion(
            &client_for(&server),
            "gid://shopify/BulkOperation/9",
            PollSettings::default(),
        )
        .await
        .unwrap();

        assert!(matches!(outcome, PollOutcome::Failed(_)));
    }

    #[tokio::test]
    async fn test_wait_for_completion_hits_retry_ceiling() {
        let server = MockServer::start();
        let status = server.mock(|when, then| {
            when.method(POST).path("/graphql.json");
            then.status(200).json_body(status_body("RUNNING"));
        });

        let outcome = wait_for_completion(
            &client_for(&server),
            "gid://shopify/BulkOperation/9",
            PollSettings {
                initial_interval: Duration::from_millis(1),
                max_interval: Duration::from_millis(2),
                max_attempts: 3,
            },
        )
        .await
        .unwrap();

        assert_eq!(status.calls(), 3);
        match outcome {
            PollOutcome::TimedOut { attempts, last } => {
                assert_eq!(attempts, 3);
                assert_eq!(last.status, BulkStatus::Running);
            }
            other => panic!("expected TimedOut, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_wait_for_completion_unknown_id() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/graphql.json");
            then.status(200).json_body(json!({"data": {"node": null}}));
        });

        let err = wait_for_completion(
            &client_for(&server),
            "gid://shopify/BulkOperation/404",
            PollSettings::default(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, ShopifyError::NotFound(_)));
    }
}
