//! Exchange rate route handlers.

use axum::{
    Json,
    extract::{Query, State},
};
use kicks_core::ExchangeRate;
use serde::Deserialize;
use tracing::instrument;

use crate::error::Result;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RateQuery {
    #[serde(default)]
    pub refresh: bool,
}

/// The current USD to local-currency rate.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Query(params): Query<RateQuery>,
) -> Result<Json<ExchangeRate>> {
    let rate = state.rates().get_rate(params.refresh).await?;
    Ok(Json(rate))
}
