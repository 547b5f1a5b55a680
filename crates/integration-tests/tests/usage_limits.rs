//! Integration tests for usage limiting.
//!
//! These tests assume a fresh monthly bucket for the test shop on the free
//! plan; run them against a scratch database.

use collectify_integration_tests::{base_url, test_shop};
use reqwest::{Client, StatusCode, multipart};
use serde_json::Value;

fn oversized_csv(rows: usize) -> String {
    let mut csv = String::from("title,type,products\n");
    for i in 0..rows {
        csv.push_str(&format!("Batch {i},manual,gid://shopify/Product/{i}\n"));
    }
    csv
}

#[tokio::test]
#[ignore = "Requires running server, database, and a stored shop session"]
async fn test_usage_stats_shape() {
    let resp = Client::new()
        .get(format!("{}/usage/stats", base_url()))
        .header("X-Shopify-Shop-Domain", test_shop())
        .send()
        .await
        .expect("request failed");

    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.expect("invalid json");
    assert!(body["current"]["total"].is_number());
    assert!(body["limits"]["monthly"].is_number());
    assert!(body["plan"].is_string());
    assert!(body["resetDate"].as_str().is_some_and(|d| d.contains("-01T")));
}

#[tokio::test]
#[ignore = "Requires running server, database, and a stored shop session"]
async fn test_free_plan_rejects_oversized_batch() {
    // 51 rows exceed the free per-operation cap of 50.
    let form = multipart::Form::new().part(
        "file",
        multipart::Part::text(oversized_csv(51)).file_name("big.csv"),
    );

    let resp = Client::new()
        .post(format!("{}/collections/import", base_url()))
        .header("X-Shopify-Shop-Domain", test_shop())
        .multipart(form)
        .send()
        .await
        .expect("request failed");

    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
    let body: Value = resp.json().await.expect("invalid json");
    assert_eq!(body["limit"], 50);
    assert_eq!(body["upgradeRequired"], true);
}
