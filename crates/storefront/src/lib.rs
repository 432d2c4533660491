//! Kicks storefront library.
//!
//! Data loading for catalog listing views: a paginated catalog client, the
//! shared view-model cache, the exchange rate provider, the infinite-scroll
//! controller and the [`loader::CatalogLoader`] that ties them together. The
//! storefront binary serves listings over HTTP; the CLI drives the loader
//! directly.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod catalog;
pub mod config;
pub mod currency;
pub mod error;
pub mod listing;
pub mod loader;
pub mod middleware;
pub mod routes;
pub mod scroll;
pub mod state;
