//! Integration tests for Collectify.
//!
//! # Running Tests
//!
//! The tests in `tests/` exercise a running server over HTTP and are
//! ignored by default. To run them:
//!
//! ```bash
//! # Start PostgreSQL and the app
//! cargo run -p collectify-cli -- migrate
//! cargo run -p collectify-app
//!
//! # Then, with a shop session seeded:
//! cargo test -p collectify-integration-tests -- --ignored
//! ```
//!
//! Configuration comes from the environment:
//! - `COLLECTIFY_TEST_BASE_URL` - server under test (default http://localhost:3000)
//! - `COLLECTIFY_TEST_SHOP` - shop domain with a stored session

/// Base URL of the server under test.
#[must_use]
pub fn base_url() -> String {
    std::env::var("COLLECTIFY_TEST_BASE_URL")
        .unwrap_or_else(|_| "http://localhost:3000".to_string())
}

/// Shop domain used by the authenticated tests.
#[must_use]
pub fn test_shop() -> String {
    std::env::var("COLLECTIFY_TEST_SHOP")
        .unwrap_or_else(|_| "collectify-dev.myshopify.com".to_string())
}
