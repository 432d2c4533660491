//! Application state shared across handlers.

use std::sync::Arc;

use crate::catalog::{CatalogClient, ViewModelCache};
use crate::config::StorefrontConfig;
use crate::currency::RateProvider;
use crate::listing::ListingService;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc`. The catalog client, view
/// cache and rate provider inside it are the single shared instances every
/// listing view uses.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    listings: ListingService,
}

impl AppState {
    /// Create a new application state from configuration.
    #[must_use]
    pub fn new(config: StorefrontConfig) -> Self {
        let listings = ListingService::new(
            CatalogClient::new(&config.catalog),
            ViewModelCache::new(config.view_cache.ttl, config.view_cache.capacity),
            RateProvider::new(&config.currency),
        );

        Self {
            inner: Arc::new(AppStateInner { config, listings }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the listing service.
    #[must_use]
    pub fn listings(&self) -> &ListingService {
        &self.inner.listings
    }

    #[must_use]
    pub fn view_cache(&self) -> &ViewModelCache {
        self.inner.listings.cache()
    }

    #[must_use]
    pub fn rates(&self) -> &RateProvider {
        self.inner.listings.rates()
    }
}
