//! Collection queries and mutations.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::instrument;

use crate::models::{RuleColumn, RuleRelation, SortOrder};

use super::{AdminClient, ShopifyError};

/// `CollectionInput` for `collectionCreate` / `collectionUpdate`.
///
/// Sparse by construction: optional fields that were absent from the source
/// row are omitted from the serialized payload rather than sent as empty
/// strings or nulls.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handle: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description_html: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_suffix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<SortOrder>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub products: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule_set: Option<RuleSetInput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageInput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seo: Option<SeoInput>,
}

impl CollectionInput {
    /// A minimal input with only a title.
    #[must_use]
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            id: None,
            title: title.into(),
            handle: None,
            description_html: None,
            template_suffix: None,
            sort_order: None,
            products: None,
            rule_set: None,
            image: None,
            seo: None,
        }
    }
}

/// `CollectionRuleSetInput`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleSetInput {
    pub applied_disjunctively: bool,
    pub rules: Vec<RuleInput>,
}

/// `CollectionRuleInput`. The platform requires `condition` even for unary
/// relations, where it is sent empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleInput {
    pub column: RuleColumn,
    pub relation: RuleRelation,
    pub condition: String,
}

/// `ImageInput` for the collection image.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageInput {
    pub src: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alt_text: Option<String>,
}

/// `SEOInput`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeoInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// The collection a create/update mutation returned.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CreatedCollection {
    pub id: String,
    pub title: String,
    pub handle: String,
}

/// A collection as returned by the export listing query.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteCollection {
    pub id: String,
    pub title: String,
    pub handle: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description_html: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_suffix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule_set: Option<RemoteRuleSet>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<RemoteImage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seo_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seo_description: Option<String>,
    pub products_count: i64,
    /// Product GIDs for manual collections (first page of members).
    pub product_ids: Vec<String>,
    pub published: bool,
}

impl RemoteCollection {
    /// True when membership is computed from a rule set.
    #[must_use]
    pub fn is_smart(&self) -> bool {
        self.rule_set.is_some()
    }
}

/// Rule set attached to a smart collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteRuleSet {
    pub applied_disjunctively: bool,
    pub rules: Vec<RemoteRule>,
}

/// A rule as reported by the listing query (raw enum strings).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteRule {
    pub column: String,
    pub relation: String,
    pub condition: String,
}

/// Collection image.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteImage {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alt_text: Option<String>,
}

/// One page of the export listing.
#[derive(Debug, Clone)]
pub struct CollectionPage {
    pub collections: Vec<RemoteCollection>,
    pub has_next_page: bool,
    pub end_cursor: Option<String>,
}

const COLLECTION_CREATE: &str = r"
mutation CollectionCreate($input: CollectionInput!) {
  collectionCreate(input: $input) {
    collection { id title handle }
    userErrors { field message }
  }
}
";

const COLLECTION_UPDATE: &str = r"
mutation CollectionUpdate($input: CollectionInput!) {
  collectionUpdate(input: $input) {
    collection { id title handle }
    userErrors { field message }
  }
}
";

const COLLECTIONS_PAGE: &str = r"
query CollectionsPage($first: Int!, $after: String) {
  collections(first: $first, after: $after) {
    pageInfo { hasNextPage endCursor }
    nodes {
      id
      title
      handle
      descriptionHtml
      sortOrder
      templateSuffix
      productsCount { count }
      ruleSet {
        appliedDisjunctively
        rules { column relation condition }
      }
      image { url altText }
      seo { title description }
      publishedOnCurrentPublication
      products(first: 100) { nodes { id } }
    }
  }
}
";

// Response-shape structs for the listing query.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CollectionsData {
    collections: CollectionsConnection,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CollectionsConnection {
    page_info: PageInfoNode,
    nodes: Vec<CollectionNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageInfoNode {
    has_next_page: bool,
    end_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CollectionNode {
    id: String,
    title: String,
    handle: String,
    #[serde(default)]
    description_html: Option<String>,
    #[serde(default)]
    sort_order: Option<String>,
    #[serde(default)]
    template_suffix: Option<String>,
    #[serde(default)]
    products_count: Option<CountNode>,
    #[serde(default)]
    rule_set: Option<RemoteRuleSet>,
    #[serde(default)]
    image: Option<RemoteImage>,
    #[serde(default)]
    seo: Option<SeoNode>,
    #[serde(default)]
    published_on_current_publication: bool,
    #[serde(default)]
    products: Option<ProductsNode>,
}

#[derive(Debug, Deserialize)]
struct CountNode {
    count: i64,
}

#[derive(Debug, Deserialize)]
struct SeoNode {
    title: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProductsNode {
    nodes: Vec<IdNode>,
}

#[derive(Debug, Deserialize)]
struct IdNode {
    id: String,
}

impl From<CollectionNode> for RemoteCollection {
    fn from(node: CollectionNode) -> Self {
        let product_ids = node
            .products
            .map(|p| p.nodes.into_iter().map(|n| n.id).collect())
            .unwrap_or_default();

        let (seo_title, seo_description) = node
            .seo
            .map_or((None, None), |seo| (seo.title, seo.description));

        Self {
            id: node.id,
            title: node.title,
            handle: node.handle,
            description_html: node.description_html.filter(|s| !s.is_empty()),
            sort_order: node.sort_order,
            template_suffix: node.template_suffix,
            rule_set: node.rule_set,
            image: node.image,
            seo_title: seo_title.filter(|s| !s.is_empty()),
            seo_description: seo_description.filter(|s| !s.is_empty()),
            products_count: node.products_count.map_or(0, |c| c.count),
            product_ids,
            published: node.published_on_current_publication,
        }
    }
}

impl AdminClient {
    /// Create a collection.
    ///
    /// # Errors
    ///
    /// Returns `UserError` when the mutation reports user errors, or a
    /// transport/GraphQL error otherwise.
    #[instrument(skip(self, input), fields(title = %input.title))]
    pub async fn create_collection(
        &self,
        input: &CollectionInput,
    ) -> Result<CreatedCollection, ShopifyError> {
        let data = self
            .execute(
                COLLECTION_CREATE,
                serde_json::json!({ "input": input }),
            )
            .await?;

        extract_collection(&data, "collectionCreate")
    }

    /// Update an existing collection (the input must carry its `id`).
    ///
    /// # Errors
    ///
    /// Returns `UserError` when the mutation reports user errors, or a
    /// transport/GraphQL error otherwise.
    #[instrument(skip(self, input), fields(title = %input.title))]
    pub async fn update_collection(
        &self,
        input: &CollectionInput,
    ) -> Result<CreatedCollection, ShopifyError> {
        let data = self
            .execute(
                COLLECTION_UPDATE,
                serde_json::json!({ "input": input }),
            )
            .await?;

        extract_collection(&data, "collectionUpdate")
    }

    /// Fetch one page of collections for export.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn list_collections(
        &self,
        first: i64,
        after: Option<String>,
    ) -> Result<CollectionPage, ShopifyError> {
        let data = self
            .execute(
                COLLECTIONS_PAGE,
                serde_json::json!({ "first": first, "after": after }),
            )
            .await?;

        let parsed: CollectionsData = serde_json::from_value(data)?;

        Ok(CollectionPage {
            has_next_page: parsed.collections.page_info.has_next_page,
            end_cursor: parsed.collections.page_info.end_cursor,
            collections: parsed
                .collections
                .nodes
                .into_iter()
                .map(RemoteCollection::from)
                .collect(),
        })
    }
}

fn extract_collection(data: &Value, payload_key: &str) -> Result<CreatedCollection, ShopifyError> {
    let payload = data
        .get(payload_key)
        .ok_or_else(|| ShopifyError::GraphQL(vec![format!("No {payload_key} in response")]))?;

    if let Some(messages) = AdminClient::user_errors(payload) {
        return Err(ShopifyError::UserError(messages));
    }

    let collection = payload
        .get("collection")
        .filter(|c| !c.is_null())
        .ok_or_else(|| {
            ShopifyError::GraphQL(vec![format!("No collection returned from {payload_key}")])
        })?;

    Ok(serde_json::from_value(collection.clone())?)
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
    fn test_input_serialization_is_sparse() {
        let input = CollectionInput::titled("Summer");
        let json = serde_json::to_value(&input).unwrap();
        assert_eq!(json, json!({"title": "Summer"}));
    }

    #[test]
    fn test_input_serialization_full() {
        let input = CollectionInput {
            id: None,
            title: "Sale".to_string(),
            handle: Some("sale".to_string()),
            description_html: None,
            template_suffix: None,
            sort_order: Some(SortOrder::BestSelling),
            products: None,
            rule_set: Some(RuleSetInput {
                applied_disjunctively: true,
                rules: vec![RuleInput {
                    column: RuleColumn::Tag,
                    relation: RuleRelation::Equals,
                    condition: "sale".to_string(),
                }],
            }),
            image: None,
            seo: Some(SeoInput {
                title: Some("Sale".to_string()),
                description: None,
            }),
        };

        let json = serde_json::to_value(&input).unwrap();
        assert_eq!(json["sortOrder"], "BEST_SELLING");
        assert_eq!(json["ruleSet"]["appliedDisjunctively"], true);
        assert_eq!(json["ruleSet"]["rules"][0]["column"], "TAG");
        assert_eq!(json["seo"]["title"], "Sale");
        assert!(json.get("descriptionHtml").is_none());
    }

    #[tokio::test]
    async fn test_create_collection_success() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/graphql.json");
            then.status(200).json_body(json!({
                "data": {
                    "collectionCreate": {
                        "collection": {
                            "id": "gid://shopify/Collection/99",
                            "title": "Summer",
                            "handle": "summer"
                        },
                        "userErrors": []
                    }
                }
            }));
        });

        let client = client_for(&server);
        let created = client
            .create_collection(&CollectionInput::titled("Summer"))
            .await
            .unwrap();

        assert_eq!(created.id, "gid://shopify/Collection/99");
        assert_eq!(created.handle, "summer");
    }

    #[tokio::test]
    async fn test_create_collection_user_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/graphql.json");
            then.status(200).json_body(json!({
                "data": {
                    "collectionCreate": {
                        "collection": null,
                        "userErrors": [
                            {"field": ["input", "title"], "message": "has already been taken"}
                        ]
                    }
                }
            }));
        });

        let client = client_for(&server);
        let err = client
            .create_collection(&CollectionInput::titled("Summer"))
            .await
            .unwrap_err();

        match err {
            ShopifyError::UserError(msg) => assert!(msg.contains("has already been taken")),
            other => panic!("expected UserError, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_list_collections_page() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/graphql.json");
            then.status(200).json_body(json!({
                "data": {
                    "collections": {
                        "pageInfo": {"hasNextPage": true, "endCursor": "abc"},
                        "nodes": [{
                            "id": "gid://shopify/Collection/1",
                            "title": "Featured",
                            "handle": "featured",
                            "descriptionHtml": "",
                            "sortOrder": "MANUAL",
                            "templateSuffix": null,
                            "productsCount": {"count": 2},
                            "ruleSet": null,
                            "image": null,
                            "seo": {"title": null, "description": null},
                            "publishedOnCurrentPublication": true,
                            "products": {"nodes": [
                                {"id": "gid://shopify/Product/1"},
                                {"id": "gid://shopify/Product/2"}
                            ]}
                        }]
                    }
                }
            }));
        });

        let client = client_for(&server);
        let page = client.list_collections(50, None).await.unwrap();

        assert!(page.has_next_page);
        assert_eq!(page.end_cursor.as_deref(), Some("abc"));
        assert_eq!(page.collections.len(), 1);
        let collection = &page.collections[0];
        assert!(!collection.is_smart());
        assert_eq!(collection.product_ids.len(), 2);
        assert!(collection.published);
        assert!(collection.description_html.is_none());
    }
}
