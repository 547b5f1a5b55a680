//! Collectify Core - Shared types library.
//!
//! This crate provides common types used across all Collectify components:
//! - `app` - Embedded admin API server
//! - `cli` - Command-line tools for migrations and bulk-operation management
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access, no HTTP
//! clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for shop domains, collection handles,
//!   product GIDs, and the subscription plan table

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
