//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                          - Health check
//!
//! # Listings
//! GET  /api/catalog/{kind}/{key}?page=N - One listing page with local prices
//!
//! # Currency
//! GET  /api/rate                        - Current USD exchange rate
//! GET  /api/rate?refresh=true           - Bypass the cached rate
//!
//! # Cache
//! POST /api/cache/invalidate            - Drop every listing view cache entry
//!                                         (Bearer ADMIN_TOKEN; 404 when unset)
//! ```

pub mod cache;
pub mod catalog;
pub mod rate;

use axum::{
    Router, middleware,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::middleware::request_id_middleware;
use crate::state::AppState;

/// Create the JSON API routes router.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/catalog/{kind}/{key}", get(catalog::show))
        .route("/rate", get(rate::show))
        .route("/cache/invalidate", post(cache::invalidate))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .nest("/api", api_routes())
}

/// The storefront application with its middleware stack, minus Sentry.
pub fn app(state: AppState) -> Router {
    routes()
        .layer(middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}
