//! Page through a listing the way an infinite-scroll view would.

use kicks_core::{CatalogQuery, render_price};
use kicks_storefront::catalog::{CatalogClient, ViewModelCache};
use kicks_storefront::config::{CatalogConfig, CurrencyConfig, ViewCacheConfig};
use kicks_storefront::currency::RateProvider;
use kicks_storefront::loader::CatalogLoader;
use kicks_storefront::scroll::SentinelEvent;
use tracing::{info, warn};

use super::CommandError;

/// Load up to `pages` pages of a listing and print each product with its
/// local price.
///
/// A failing rate lookup does not stop the listing; prices print as the
/// loading placeholder instead.
///
/// # Errors
///
/// Returns an error if configuration is missing, the query is invalid, or a
/// catalog page can't be fetched.
#[allow(clippy::print_stdout)]
pub async fn run(kind: &str, key: &str, pages: u32) -> Result<(), CommandError> {
    let query = CatalogQuery::parse(kind, key)?;
    let catalog = CatalogConfig::from_env()?;
    let currency = CurrencyConfig::from_env()?;
    let view_cache = ViewCacheConfig::from_env()?;

    let rates = RateProvider::new(&currency);
    let mut loader = CatalogLoader::new(
        CatalogClient::new(&catalog),
        ViewModelCache::new(view_cache.ttl, view_cache.capacity),
    );

    let (rate, opened) = tokio::join!(rates.get_rate(false), loader.open(query.clone()));
    opened?;
    let rate = rate
        .inspect_err(|e| warn!(error = %e, "Exchange rate unavailable"))
        .ok();

    let mut loaded = 1;
    while loaded < pages {
        match loader.on_sentinel(SentinelEvent::visible()).await? {
            Some(_) => loaded += 1,
            None => break,
        }
    }

    info!(query = %query, pages = loaded, items = loader.items().len(), "Listing loaded");

    for product in loader.items() {
        println!(
            "{:>12}  {}  ({})",
            render_price(product.price_minor_usd, rate.as_ref()),
            product.name,
            product.slug
        );
    }
    if loader.has_more() {
        println!("... more available");
    }
    Ok(())
}
