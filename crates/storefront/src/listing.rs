//! Listing pages with prices rendered in the local currency.
//!
//! Combines one catalog page (served from the view cache when possible) with
//! the current exchange rate. The two lookups run concurrently. A rate
//! failure degrades prices to the loading placeholder; a catalog failure is
//! an error.

use kicks_core::{CatalogQuery, ExchangeRate, PriceDisplay, ProductSummary, display_price};
use serde::Serialize;
use tracing::{debug, instrument, warn};

use crate::catalog::{CatalogClient, CatalogError, CatalogPage, ViewModelCache};
use crate::currency::RateProvider;

/// A product ready to render.
#[derive(Debug, Clone, Serialize)]
pub struct ListedProduct {
    #[serde(flatten)]
    pub product: ProductSummary,
    pub price: PriceDisplay,
    pub price_text: String,
}

/// One page of a listing.
#[derive(Debug, Clone, Serialize)]
pub struct Listing {
    pub query: CatalogQuery,
    pub page: u32,
    pub products: Vec<ListedProduct>,
    pub has_more: bool,
    pub total_results: Option<u64>,
    pub rate: Option<ExchangeRate>,
    /// Why prices show the loading placeholder, if they do.
    pub rate_error: Option<String>,
    /// Whether the page came from the view cache.
    pub cached: bool,
}

/// Builds [`Listing`]s from the shared catalog services.
#[derive(Clone)]
pub struct ListingService {
    catalog: CatalogClient,
    cache: ViewModelCache,
    rates: RateProvider,
}

impl ListingService {
    #[must_use]
    pub const fn new(catalog: CatalogClient, cache: ViewModelCache, rates: RateProvider) -> Self {
        Self {
            catalog,
            cache,
            rates,
        }
    }

    #[must_use]
    pub const fn cache(&self) -> &ViewModelCache {
        &self.cache
    }

    #[must_use]
    pub const fn rates(&self) -> &RateProvider {
        &self.rates
    }

    /// Load one page of a listing with rendered prices.
    ///
    /// # Errors
    ///
    /// Returns a [`CatalogError`] if the page is neither cached nor
    /// fetchable. Rate failures are reported in [`Listing::rate_error`].
    #[instrument(skip(self), fields(query = %query))]
    pub async fn listing(&self, query: CatalogQuery, page: u32) -> Result<Listing, CatalogError> {
        let (rate, catalog_page) = tokio::join!(self.rates.get_rate(false), self.page(&query, page));
        let (catalog_page, cached) = catalog_page?;

        let (rate, rate_error) = match rate {
            Ok(rate) => (Some(rate), None),
            Err(e) => {
                warn!(error = %e, "Rendering listing without exchange rate");
                (None, Some(e.to_string()))
            }
        };

        let products = catalog_page
            .items
            .into_iter()
            .map(|product| {
                let price = display_price(product.price_minor_usd, rate.as_ref());
                ListedProduct {
                    price_text: price.to_string(),
                    price,
                    product,
                }
            })
            .collect();

        Ok(Listing {
            query,
            page,
            products,
            has_more: catalog_page.has_more,
            total_results: catalog_page.total_results,
            rate,
            rate_error,
            cached,
        })
    }

    /// A catalog page from the view cache, or fetched and stored.
    async fn page(
        &self,
        query: &CatalogQuery,
        page: u32,
    ) -> Result<(CatalogPage, bool), CatalogError> {
        if let Some(stored) = self
            .cache
            .get(query)
            .await
            .and_then(|entry| entry.page(page).cloned())
        {
            debug!(page, "Listing page served from view cache");
            return Ok((stored, true));
        }

        let fetched = self.catalog.fetch_page(query, page).await?;
        // The cache de-duplicates against earlier pages; serve what it stored
        let stored = self
            .cache
            .put(fetched.clone())
            .await
            .and_then(|entry| entry.page(page).cloned())
            .unwrap_or(fetched);
        Ok((stored, false))
    }
}
