//! Staged uploads and bulk operations.

use core::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::instrument;

use super::{AdminClient, ShopifyError};

/// A short-lived upload target issued by `stagedUploadsCreate`.
///
/// The `parameters` vector preserves the order the platform returned; the
/// multipart upload must send them in that order with the file part last.
#[derive(Debug, Clone)]
pub struct StagedUploadTarget {
    pub url: String,
    pub resource_url: String,
    pub parameters: Vec<(String, String)>,
}

impl StagedUploadTarget {
    /// The storage key parameter, which `bulkOperationRunMutation` references
    /// as its `stagedUploadPath`.
    #[must_use]
    pub fn key(&self) -> Option<&str> {
        self.parameters
            .iter()
            .find(|(name, _)| name == "key")
            .map(|(_, value)| value.as_str())
    }
}

/// Status of a remote bulk operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BulkStatus {
    Created,
    Running,
    Completed,
    Failed,
    Canceling,
    Canceled,
    Expired,
}

impl BulkStatus {
    /// True once the operation can no longer make progress.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Canceled | Self::Expired)
    }

    /// Canonical SCREAMING_SNAKE name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Created => "CREATED",
            Self::Running => "RUNNING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
            Self::Canceling => "CANCELING",
            Self::Canceled => "CANCELED",
            Self::Expired => "EXPIRED",
        }
    }
}

impl fmt::Display for BulkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for BulkStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CREATED" => Ok(Self::Created),
            "RUNNING" => Ok(Self::Running),
            "COMPLETED" => Ok(Self::Completed),
            "FAILED" => Ok(Self::Failed),
            "CANCELING" => Ok(Self::Canceling),
            "CANCELED" => Ok(Self::Canceled),
            "EXPIRED" => Ok(Self::Expired),
            other => Err(format!("unknown bulk operation status: {other}")),
        }
    }
}

/// A remote bulk operation. Not persisted locally; re-queried on every poll.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkOperation {
    pub id: String,
    pub status: BulkStatus,
    #[serde(default, deserialize_with = "deserialize_count")]
    pub object_count: i64,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub error_code: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub completed_at: Option<String>,
}

/// `objectCount` arrives as an `UnsignedInt64` string.
fn deserialize_count<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Count {
        Number(i64),
        Text(String),
    }

    match Count::deserialize(deserializer)? {
        Count::Number(n) => Ok(n),
        Count::Text(s) => s.parse().map_err(serde::de::Error::custom),
    }
}

const STAGED_UPLOADS_CREATE: &str = r"
mutation StagedUploadsCreate($input: [StagedUploadInput!]!) {
  stagedUploadsCreate(input: $input) {
    stagedTargets {
      url
      resourceUrl
      parameters { name value }
    }
    userErrors { field message }
  }
}
";

const BULK_OPERATION_RUN_MUTATION: &str = r"
mutation BulkOperationRunMutation($mutation: String!, $stagedUploadPath: String!) {
  bulkOperationRunMutation(mutation: $mutation, stagedUploadPath: $stagedUploadPath) {
    bulkOperation { id status }
    userErrors { field message }
  }
}
";

const BULK_OPERATION_BY_ID: &str = r"
query BulkOperationById($id: ID!) {
  node(id: $id) {
    ... on BulkOperation {
      id
      status
      objectCount
      url
      errorCode
      createdAt
      completedAt
    }
  }
}
";

impl AdminClient {
    /// Create a staged upload target for a bulk-mutation variables file.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or reports user errors.
    #[instrument(skip(self))]
    pub async fn create_staged_upload(
        &self,
        filename: &str,
        mime_type: &str,
        file_size: i64,
    ) -> Result<StagedUploadTarget, ShopifyError> {
        let variables = serde_json::json!({
            "input": [{
                "filename": filename,
                "mimeType": mime_type,
                "resource": "BULK_MUTATION_VARIABLES",
                "fileSize": file_size.to_string(),
                "httpMethod": "POST",
            }]
        });

        let data = self.execute(STAGED_UPLOADS_CREATE, variables).await?;

        let payload = data
            .get("stagedUploadsCreate")
            .ok_or_else(|| ShopifyError::GraphQL(vec!["No stagedUploadsCreate in response".into()]))?;

        if let Some(messages) = Self::user_errors(payload) {
            return Err(ShopifyError::UserError(messages));
        }

        let target = payload
            .get("stagedTargets")
            .and_then(Value::as_array)
            .and_then(|targets| targets.first())
            .ok_or_else(|| ShopifyError::Upload("no staged target returned".into()))?;

        let parameters = target
            .get("parameters")
            .and_then(Value::as_array)
            .map(|params| {
                params
                    .iter()
                    .filter_map(|p| {
                        let name = p.get("name")?.as_str()?.to_string();
                        let value = p.get("value")?.as_str()?.to_string();
                        Some((name, value))
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(StagedUploadTarget {
            url: target
                .get("url")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            resource_url: target
                .get("resourceUrl")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            parameters,
        })
    }

    /// Upload a file to a staged target.
    ///
    /// Sends a multipart form with the target's parameters in the exact
    /// order they were issued, then the file part last.
    ///
    /// # Errors
    ///
    /// Returns `Upload` when the target rejects the file.
    #[instrument(skip(self, target, bytes), fields(url = %target.url, size = bytes.len()))]
    pub async fn upload_to_staged_target(
        &self,
        target: &StagedUploadTarget,
        filename: &str,
        mime_type: &str,
        bytes: Vec<u8>,
    ) -> Result<(), ShopifyError> {
        let mut form = reqwest::multipart::Form::new();
        for (name, value) in &target.parameters {
            form = form.text(name.clone(), value.clone());
        }

        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(filename.to_string())
            .mime_str(mime_type)?;
        form = form.part("file", part);

        let response = self.http().post(&target.url).multipart(form).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ShopifyError::Upload(format!("{status}: {body}")));
        }

        Ok(())
    }

    /// Launch a bulk mutation over a previously staged variables file.
    ///
    /// Returns the bulk operation id immediately; the job runs remotely.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or reports user errors.
    #[instrument(skip(self, mutation))]
    pub async fn run_bulk_mutation(
        &self,
        mutation: &str,
        staged_upload_path: &str,
    ) -> Result<String, ShopifyError> {
        let variables = serde_json::json!({
            "mutation": mutation,
            "stagedUploadPath": staged_upload_path,
        });

        let data = self.execute(BULK_OPERATION_RUN_MUTATION, variables).await?;

        let payload = data.get("bulkOperationRunMutation").ok_or_else(|| {
            ShopifyError::GraphQL(vec!["No bulkOperationRunMutation in response".into()])
        })?;

        if let Some(messages) = Self::user_errors(payload) {
            return Err(ShopifyError::UserError(messages));
        }

        payload
            .get("bulkOperation")
            .and_then(|op| op.get("id"))
            .and_then(Value::as_str)
            .map(ToString::to_string)
            .ok_or_else(|| ShopifyError::GraphQL(vec!["No bulk operation returned".into()]))
    }

    /// Fetch the current state of a bulk operation by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails; `Ok(None)` when the id does
    /// not resolve to a bulk operation.
    #[instrument(skip(self))]
    pub async fn bulk_operation(&self, id: &str) -> Result<Option<BulkOperation>, ShopifyError> {
        let data = self
            .execute(BULK_OPERATION_BY_ID, serde_json::json!({ "id": id }))
            .await?;

        let node = data.get("node");
        match node {
            None | Some(Value::Null) => Ok(None),
            Some(node) if node.get("id").is_none() => Ok(None),
            Some(node) => Ok(Some(serde_json::from_value(node.clone())?)),
        }
    }
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

    #[test]
    fn test_status_terminal() {
        assert!(!BulkStatus::Created.is_terminal());
        assert!(!BulkStatus::Running.is_terminal());
        assert!(BulkStatus::Completed.is_terminal());
        assert!(BulkStatus::Failed.is_terminal());
        assert!(BulkStatus::Canceled.is_terminal());
    }

    #[test]
    fn test_target_key_lookup() {
        let target = StagedUploadTarget {
            url: "https://uploads.example.com".to_string(),
            resource_url: "https://uploads.example.com/tmp/1".to_string(),
            parameters: vec![
                ("policy".to_string(), "abc".to_string()),
                ("key".to_string(), "tmp/1/bulk.jsonl".to_string()),
            ],
        };
        assert_eq!(target.key(), Some("tmp/1/bulk.jsonl"));
    }

    #[tokio::test]
    async fn test_create_staged_upload_preserves_parameter_order() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/graphql.json");
            then.status(200).json_body(json!({
                "data": {
                    "stagedUploadsCreate": {
                        "stagedTargets": [{
                            "url": "https://uploads.example.com",
                            "resourceUrl": "https://uploads.example.com/tmp/1",
                            "parameters": [
                                {"name": "policy", "value": "p"},
                                {"name": "signature", "value": "s"},
                                {"name": "key", "value": "tmp/1/bulk.jsonl"}
                            ]
                        }],
                        "userErrors": []
                    }
                }
            }));
        });

        let client = client_for(&server);
        let target = client
            .create_staged_upload("bulk.jsonl", "text/jsonl", 128)
            .await
            .unwrap();

        let names: Vec<&str> = target.parameters.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["policy", "signature", "key"]);
        assert_eq!(target.key(), Some("tmp/1/bulk.jsonl"));
    }

    #[tokio::test]
    async fn test_upload_to_staged_target_sends_file_last() {
        let server = MockServer::start();
        let upload = server.mock(|when, then| {
            when.method(POST).path("/upload");
            then.status(201);
        });

        let client = client_for(&server);
        let target = StagedUploadTarget {
            url: server.url("/upload"),
            resource_url: server.url("/tmp/1"),
            parameters: vec![("key".to_string(), "tmp/1/bulk.jsonl".to_string())],
        };

        client
            .upload_to_staged_target(&target, "bulk.jsonl", "text/jsonl", b"{}\n".to_vec())
            .await
            .unwrap();

        upload.assert();
    }

    #[tokio::test]
    async fn test_upload_failure_is_reported() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/upload");
            then.status(403).body("expired policy");
        });

        let client = client_for(&server);
        let target = StagedUploadTarget {
            url: server.url("/upload"),
            resource_url: server.url("/tmp/1"),
            parameters: vec![],
        };

        let err = client
            .upload_to_staged_target(&target, "bulk.jsonl", "text/jsonl", vec![])
            .await
            .unwrap_err();

        assert!(matches!(err, ShopifyError::Upload(_)));
    }

    #[tokio::test]
    async fn test_bulk_operation_status_roundtrip() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/graphql.json");
            then.status(200).json_body(json!({
                "data": {
                    "node": {
                        "id": "gid://shopify/BulkOperation/7",
                        "status": "RUNNING",
                        "objectCount": "42",
                        "url": null,
                        "errorCode": null,
                        "createdAt": "2026-08-01T00:00:00Z",
                        "completedAt": null
                    }
                }
            }));
        });

        let client = client_for(&server);
        let op = client
            .bulk_operation("gid://shopify/BulkOperation/7")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(op.status, BulkStatus::Running);
        assert_eq!(op.object_count, 42);
    }

    #[tokio::test]
    async fn test_bulk_operation_missing_node() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/graphql.json");
            then.status(200).json_body(json!({"data": {"node": null}}));
        });

        let client = client_for(&server);
        let op = client
            .bulk_operation("gid://shopify/BulkOperation/404")
            .await
            .unwrap();

        assert!(op.is_none());
    }
}
