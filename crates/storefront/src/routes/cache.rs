//! View cache maintenance.
//!
//! Guarded by `ADMIN_TOKEN` sent as `Authorization: Bearer <token>`. Without a
//! configured token the endpoint does not exist.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
};
use secrecy::ExposeSecret;
use tracing::{info, instrument, warn};

use crate::error::{AppError, Result};
use crate::state::AppState;

/// Drop every cached listing so the next view fetches fresh pages.
#[instrument(skip_all)]
pub async fn invalidate(State(state): State<AppState>, headers: HeaderMap) -> Result<StatusCode> {
    let Some(expected) = state.config().admin_token.as_ref() else {
        return Err(AppError::NotFound("/api/cache/invalidate".to_string()));
    };

    let presented = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    if !presented.is_some_and(|token| tokens_match(token, expected.expose_secret())) {
        warn!("Rejected cache invalidation with missing or wrong token");
        return Err(AppError::Unauthorized);
    }

    state.view_cache().invalidate_all();
    info!("View cache invalidated");
    Ok(StatusCode::NO_CONTENT)
}

/// Compare without short-circuiting on the first differing byte.
fn tokens_match(presented: &str, expected: &str) -> bool {
    presented.len() == expected.len()
        && presented
            .bytes()
            .zip(expected.bytes())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
}
