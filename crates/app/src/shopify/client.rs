//! GraphQL transport for the Admin API.

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::Value;

use collectify_core::ShopDomain;

use super::ShopifyError;

/// Shopify Admin API GraphQL client for a single shop.
///
/// Cheap to clone; the transport and token live behind an `Arc`.
#[derive(Clone)]
pub struct AdminClient {
    inner: Arc<AdminClientInner>,
}

struct AdminClientInner {
    http: reqwest::Client,
    endpoint: String,
    access_token: SecretString,
}

/// GraphQL response wrapper.
#[derive(Debug, Deserialize)]
struct GraphQLResponse {
    data: Option<Value>,
    errors: Option<Vec<GraphQLErrorResponse>>,
}

#[derive(Debug, Deserialize)]
struct GraphQLErrorResponse {
    message: String,
}

impl AdminClient {
    /// Create a client for a shop's Admin GraphQL endpoint.
    #[must_use]
    pub fn new(shop: &ShopDomain, api_version: &str, access_token: SecretString) -> Self {
        let endpoint = format!(
            "https://{}/admin/api/{}/graphql.json",
            shop.as_str(),
            api_version
        );
        Self::with_endpoint(endpoint, access_token)
    }

    /// Create a client pointing at an explicit GraphQL endpoint.
    ///
    /// Used by tests to target a mock server.
    #[must_use]
    pub fn with_endpoint(endpoint: String, access_token: SecretString) -> Self {
        Self {
            inner: Arc::new(AdminClientInner {
                http: reqwest::Client::new(),
                endpoint,
                access_token,
            }),
        }
    }

    /// The GraphQL endpoint this client talks to.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.inner.endpoint
    }

    /// The underlying HTTP client (also used for staged uploads).
    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.inner.http
    }

    /// Execute a GraphQL document and return the `data` object.
    ///
    /// # Errors
    ///
    /// Returns `RateLimited` on 429, `Unauthorized` on 401, `GraphQL` when
    /// the response carries top-level errors, and `Http`/`Parse` for
    /// transport failures.
    pub(crate) async fn execute(
        &self,
        query: &str,
        variables: Value,
    ) -> Result<Value, ShopifyError> {
        let body = serde_json::json!({
            "query": query,
            "variables": variables,
        });

        let response = self
            .inner
            .http
            .post(&self.inner.endpoint)
            .header(
                "X-Shopify-Access-Token",
                self.inner.access_token.expose_secret(),
            )
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(60);
            return Err(ShopifyError::RateLimited(retry_after));
        }

        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Err(ShopifyError::Unauthorized(
                "Invalid or expired access token".to_string(),
            ));
        }

        let graphql_response: GraphQLResponse = response.json().await?;

        if let Some(errors) = graphql_response.errors
            && !errors.is_empty()
        {
            return Err(ShopifyError::GraphQL(
                errors.into_iter().map(|e| e.message).collect(),
            ));
        }

        graphql_response
            .data
            .ok_or_else(|| ShopifyError::GraphQL(vec!["No data in response".to_string()]))
    }

    /// Collect `userErrors` from a mutation payload, if any.
    ///
    /// Returns `Some` with the messages joined when the payload carries a
    /// non-empty `userErrors` array.
    pub(crate) fn user_errors(payload: &Value) -> Option<String> {
        let errors = payload.get("userErrors")?.as_array()?;
        if errors.is_empty() {
            return None;
        }

        let messages: Vec<String> = errors
            .iter()
            .map(|e| {
                let field = e
                    .get("field")
                    .and_then(Value::as_array)
                    .map(|parts| {
                        parts
                            .iter()
                            .filter_map(Value::as_str)
                            .collect::<Vec<_>>()
                            .join(".")
                    })
                    .unwrap_or_default();
                let message = e.get("message").and_then(Value::as_str).unwrap_or("");
                format!("{field}: {message}")
            })
            .collect();

        Some(messages.join("; "))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use httpmock::prelude::*;
    use serde_json::json;

    use super::*;

    fn client_for(server: &MockServer) -> AdminClient {
        AdminClient::with_endpoint(
            server.url("/admin/api/2025-07/graphql.json"),
            SecretString::from("shpat_test_token"),
        )
    }

    #[tokio::test]
    async fn test_execute_returns_data() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/admin/api/2025-07/graphql.json")
                .header("X-Shopify-Access-Token", "shpat_test_token");
            then.status(200)
                .json_body(json!({"data": {"shop": {"name": "Demo"}}}));
        });

        let client = client_for(&server);
        let data = client
            .execute("query { shop { name } }", json!({}))
            .await
            .unwrap();

        mock.assert();
        assert_eq!(data["shop"]["name"], "Demo");
    }

    #[tokio::test]
    async fn test_execute_surfaces_graphql_errors() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST);
            then.status(200)
                .json_body(json!({"errors": [{"message": "Field 'bogus' doesn't exist"}]}));
        });

        let client = client_for(&server);
        let err = client.execute("query { bogus }", json!({})).await;

        assert!(matches!(err, Err(ShopifyError::GraphQL(_))));
    }

    #[tokio::test]
    async fn test_execute_maps_rate_limit() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST);
            then.status(429).header("Retry-After", "7");
        });

        let client = client_for(&server);
        let err = client.execute("query { shop { name } }", json!({})).await;

        assert!(matches!(err, Err(ShopifyError::RateLimited(7))));
    }

    #[tokio::test]
    async fn test_execute_maps_unauthorized() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST);
            then.status(401);
        });

        let client = client_for(&server);
        let err = client.execute("query { shop { name } }", json!({})).await;

        assert!(matches!(err, Err(ShopifyError::Unauthorized(_))));
    }

    #[test]
    fn test_user_errors_empty() {
        let payload = json!({"userErrors": []});
        assert!(AdminClient::user_errors(&payload).is_none());
    }

    #[test]
    fn test_user_errors_joined() {
        let payload = json!({
            "userErrors": [
                {"field": ["input", "title"], "message": "can't be blank"},
                {"field": null, "message": "something else"}
            ]
        });
        let message = AdminClient::user_errors(&payload).unwrap();
        assert_eq!(message, "input.title: can't be blank; : something else");
    }
}
