//! Kicks Core - Shared catalog types.
//!
//! This crate provides the types used across all Kicks components:
//! - `storefront` - Catalog loader library and JSON API binary
//! - `cli` - Command-line catalog browser
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no HTTP
//! clients, no caches. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Product IDs, catalog queries, exchange rates, and price rendering

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
