//! Catalog search/browse service client and the listing view cache.
//!
//! # Architecture
//!
//! - [`CatalogClient`] fetches one page of products for a [`CatalogQuery`]
//!   from the external catalog service (Constructor.io-style REST API)
//! - [`normalize`] turns the loosely-typed result records into
//!   [`ProductSummary`] values, dropping records that can't be routed to
//! - [`ViewModelCache`] keeps the pages fetched so far for each query so that
//!   reopening a listing is served without network access until the TTL expires
//!
//! There is no automatic retry. Callers decide whether to offer a manual retry.

mod cache;
mod client;
pub mod normalize;

pub use cache::{CacheEntry, ViewModelCache};
pub use client::CatalogClient;

use kicks_core::{CatalogQuery, ProductSummary};
use serde::Serialize;
use thiserror::Error;

/// Errors that can occur when fetching a catalog page.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The request never produced a response.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The catalog service answered with a non-2xx status.
    #[error("catalog returned HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// The response body is not JSON or lacks the `response.results` array.
    #[error("invalid shape: {0}")]
    InvalidShape(String),

    /// Pages are numbered from 1.
    #[error("invalid page number: {0}")]
    InvalidPage(u32),

    /// The configured base URL can't carry path segments.
    #[error("invalid catalog base URL: {0}")]
    InvalidBaseUrl(String),
}

impl CatalogError {
    /// Whether offering the user a retry makes sense.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) => true,
            Self::Status { status, .. } => *status >= 500 || *status == 429,
            Self::InvalidShape(_) | Self::InvalidPage(_) | Self::InvalidBaseUrl(_) => false,
        }
    }
}

/// One page of normalized products for a query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogPage {
    pub query: CatalogQuery,
    /// 1-based page number.
    pub page_number: u32,
    /// Products in relevance order, as ranked by the catalog.
    pub items: Vec<ProductSummary>,
    pub total_results: Option<u64>,
    pub has_more: bool,
}

/// Decide whether another page exists after `page_number`.
///
/// With a known total, more pages exist while `page_number * page_size` is
/// below it. Without one, a full page suggests there may be more.
/// `returned` is the number of records the service sent, before any were
/// dropped during normalization.
#[must_use]
pub fn compute_has_more(
    page_number: u32,
    page_size: u32,
    total_results: Option<u64>,
    returned: usize,
) -> bool {
    match total_results {
        Some(total) => u64::from(page_number) * u64::from(page_size) < total,
        None => u32::try_from(returned).is_ok_and(|n| n >= page_size),
    }
}
