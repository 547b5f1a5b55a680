//! App subscription (billing) mutations.

use serde_json::Value;
use tracing::instrument;

use super::{AdminClient, ShopifyError};

/// A created app subscription awaiting merchant confirmation.
#[derive(Debug, Clone)]
pub struct PendingSubscription {
    pub id: String,
    pub confirmation_url: String,
}

const APP_SUBSCRIPTION_CREATE: &str = r#"
mutation AppSubscriptionCreate($name: String!, $returnUrl: URL!, $price: Decimal!) {
  appSubscriptionCreate(
    name: $name
    returnUrl: $returnUrl
    lineItems: [{
      plan: {
        appRecurringPricingDetails: {
          price: { amount: $price, currencyCode: USD }
          interval: EVERY_30_DAYS
        }
      }
    }]
  ) {
    appSubscription { id }
    confirmationUrl
    userErrors { field message }
  }
}
"#;

const APP_SUBSCRIPTION_CANCEL: &str = r"
mutation AppSubscriptionCancel($id: ID!) {
  appSubscriptionCancel(id: $id) {
    appSubscription { id status }
    userErrors { field message }
  }
}
";

impl AdminClient {
    /// Create a recurring app subscription; the merchant must visit the
    /// returned confirmation URL to approve the charge.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or reports user errors.
    #[instrument(skip(self))]
    pub async fn create_app_subscription(
        &self,
        name: &str,
        price: &str,
        return_url: &str,
    ) -> Result<PendingSubscription, ShopifyError> {
        let variables = serde_json::json!({
            "name": name,
            "returnUrl": return_url,
            "price": price,
        });

        let data = self.execute(APP_SUBSCRIPTION_CREATE, variables).await?;

        let payload = data.get("appSubscriptionCreate").ok_or_else(|| {
            ShopifyError::GraphQL(vec!["No appSubscriptionCreate in response".into()])
        })?;

        if let Some(messages) = Self::user_errors(payload) {
            return Err(ShopifyError::UserError(messages));
        }

        let id = payload
            .get("appSubscription")
            .and_then(|s| s.get("id"))
            .and_then(Value::as_str)
            .ok_or_else(|| ShopifyError::GraphQL(vec!["No subscription returned".into()]))?;
        let confirmation_url = payload
            .get("confirmationUrl")
            .and_then(Value::as_str)
            .ok_or_else(|| ShopifyError::GraphQL(vec!["No confirmation URL returned".into()]))?;

        Ok(PendingSubscription {
            id: id.to_string(),
            confirmation_url: confirmation_url.to_string(),
        })
    }

    /// Cancel an app subscription.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or reports user errors.
    #[instrument(skip(self))]
    pub async fn cancel_app_subscription(&self, id: &str) -> Result<(), ShopifyError> {
        let data = self
            .execute(APP_SUBSCRIPTION_CANCEL, serde_json::json!({ "id": id }))
            .await?;

        let payload = data.get("appSubscriptionCancel").ok_or_else(|| {
            ShopifyError::GraphQL(vec!["No appSubscriptionCancel in response".into()])
        })?;

        if let Some(messages) = Self::user_errors(payload) {
            return Err(ShopifyError::UserError(messages));
        }

        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use httpmock::prelude::*;
    use secrecy::SecretString;
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn test_create_app_subscription() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/graphql.json");
            then.status(200).json_body(json!({
                "data": {
                    "appSubscriptionCreate": {
                        "appSubscription": {"id": "gid://shopify/AppSubscription/5"},
                        "confirmationUrl": "https://demo.myshopify.com/admin/charges/confirm",
                        "userErrors": []
                    }
                }
            }));
        });

        let client = AdminClient::with_endpoint(
            server.url("/graphql.json"),
            SecretString::from("shpat_test_token"),
        );
        let pending = client
            .create_app_subscription("Collectify Premium", "9.99", "https://app.example.com")
            .await
            .unwrap();

        assert_eq!(pending.id, "gid://shopify/AppSubscription/5");
        assert!(pending.confirmation_url.contains("/charges/confirm"));
    }
}
