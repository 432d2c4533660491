//! Catalog listing route handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use kicks_core::CatalogQuery;
use serde::Deserialize;
use tracing::instrument;

use crate::error::{Result, add_breadcrumb};
use crate::listing::Listing;
use crate::state::AppState;

/// Pagination query parameters.
#[derive(Debug, Deserialize)]
pub struct PaginationQuery {
    pub page: Option<u32>,
}

/// One page of a listing as JSON.
///
/// `kind` is one of `search`, `brand`, `collection` or `feed`. Pages start
/// at 1; an omitted page means the first.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path((kind, key)): Path<(String, String)>,
    Query(pagination): Query<PaginationQuery>,
) -> Result<Json<Listing>> {
    let query = CatalogQuery::parse(&kind, &key)?;
    let page = pagination.page.unwrap_or(1);

    let query_label = query.to_string();
    let page_label = page.to_string();
    add_breadcrumb(
        "navigation",
        "Viewed listing",
        Some(&[("query", query_label.as_str()), ("page", page_label.as_str())]),
    );

    let listing = state.listings().listing(query, page).await?;
    Ok(Json(listing))
}
