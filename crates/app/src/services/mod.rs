//! Business logic for the import/export pipeline.
//!
//! Data flow: route handler -> [usage gate] -> [`csv`] parse -> [`validate`]
//! -> [`mapper`] -> orchestrator ([`import`] sync loop or [`bulk`] upload)
//! -> Shopify Admin API -> aggregated report.

pub mod bulk;
pub mod csv;
pub mod import;
pub mod mapper;
pub mod usage;
pub mod validate;
