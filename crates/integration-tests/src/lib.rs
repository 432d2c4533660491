//! Integration tests for the Kicks storefront.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p kicks-integration-tests
//! ```
//!
//! No external services are needed: the catalog and exchange rate services
//! are replaced by `wiremock` servers and the storefront is served on an
//! ephemeral local port.
//!
//! # Test Categories
//!
//! - `catalog_loader` - Loader, scroll and view cache behaviour end to end
//! - `storefront_api` - HTTP API over a running storefront

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use kicks_core::CurrencyCode;
use kicks_storefront::catalog::{CatalogClient, ViewModelCache};
use kicks_storefront::config::{CatalogConfig, CurrencyConfig, StorefrontConfig, ViewCacheConfig};
use kicks_storefront::loader::CatalogLoader;
use kicks_storefront::state::AppState;
use secrecy::SecretString;
use serde_json::{Value, json};
use url::Url;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// API key the mocked catalog expects.
pub const TEST_API_KEY: &str = "key_q8Vz3LmN2xTp7RwK";

/// Bearer token the storefront's maintenance endpoints accept.
pub const TEST_ADMIN_TOKEN: &str = "adm_Q7v2LpX9kR4tWz8N";

/// Page size used throughout the tests.
pub const PAGE_SIZE: u32 = 24;

/// Mocked upstream services plus a storefront configuration pointing at them.
pub struct TestContext {
    pub catalog: MockServer,
    pub fx: MockServer,
    pub config: StorefrontConfig,
}

impl TestContext {
    /// Start mock servers with a five minute view cache.
    ///
    /// # Panics
    ///
    /// Panics if a mock server URI is not a valid URL.
    pub async fn new() -> Self {
        Self::with_view_cache_ttl(Duration::from_secs(300)).await
    }

    /// Start mock servers with a custom view cache TTL.
    ///
    /// # Panics
    ///
    /// Panics if a mock server URI is not a valid URL.
    pub async fn with_view_cache_ttl(ttl: Duration) -> Self {
        let catalog = MockServer::start().await;
        let fx = MockServer::start().await;

        let config = StorefrontConfig {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 0,
            catalog: CatalogConfig {
                api_url: Url::parse(&catalog.uri()).expect("catalog mock URI"),
                api_key: SecretString::from(TEST_API_KEY),
                page_size: PAGE_SIZE,
                sort_by: "relevance".to_string(),
                sort_order: "descending".to_string(),
            },
            currency: CurrencyConfig {
                api_url: Url::parse(&format!("{}/rate", fx.uri())).expect("fx mock URI"),
                local_currency: CurrencyCode::INR,
                rate_ttl: Duration::from_secs(3600),
            },
            view_cache: ViewCacheConfig {
                ttl,
                capacity: 100,
            },
            admin_token: Some(SecretString::from(TEST_ADMIN_TOKEN)),
            sentry_dsn: None,
            sentry_environment: None,
        };

        Self {
            catalog,
            fx,
            config,
        }
    }

    /// A loader over fresh catalog services built from this context.
    #[must_use]
    pub fn loader(&self) -> CatalogLoader {
        CatalogLoader::new(self.client(), self.view_cache())
    }

    #[must_use]
    pub fn client(&self) -> CatalogClient {
        CatalogClient::new(&self.config.catalog)
    }

    #[must_use]
    pub fn view_cache(&self) -> ViewModelCache {
        ViewModelCache::new(self.config.view_cache.ttl, self.config.view_cache.capacity)
    }

    /// Serve the storefront on an ephemeral port and return its base URL.
    ///
    /// # Panics
    ///
    /// Panics if the listener can't be bound.
    pub async fn spawn_storefront(&self) -> String {
        let listener = tokio::net::TcpListener::bind(SocketAddr::new(self.config.host, 0))
            .await
            .expect("bind storefront listener");
        let addr = listener.local_addr().expect("listener address");
        let app = kicks_storefront::routes::app(AppState::new(self.config.clone()));

        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        format!("http://{addr}")
    }

    /// Serve `mid` as the exchange rate for every request.
    pub async fn mount_rate(&self, mid: f64) {
        Mock::given(method("GET"))
            .and(path("/rate"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"status": 200, "data": {"mid": mid}})),
            )
            .mount(&self.fx)
            .await;
    }

    /// Serve one page of a listing. `route` is the catalog path, e.g.
    /// `/browse/brand/nike`.
    pub async fn mount_page(&self, route: &str, page: u32, ids: &[&str], total: Option<u64>) {
        Mock::given(method("GET"))
            .and(path(route))
            .and(query_param("page", page.to_string()))
            .respond_with(ResponseTemplate::new(200).set_body_json(results_body(ids, total)))
            .mount(&self.catalog)
            .await;
    }
}

/// A catalog response body with one record per id, each priced at $150.
#[must_use]
pub fn results_body(ids: &[&str], total: Option<u64>) -> Value {
    let results: Vec<Value> = ids
        .iter()
        .map(|id| {
            json!({
                "value": format!("Sneaker {id}"),
                "data": {"id": id, "price_cents": 15_000}
            })
        })
        .collect();

    let mut response = json!({"results": results});
    if let Some(total) = total {
        response["total_num_results"] = json!(total);
    }
    json!({"response": response})
}

/// `count` sequential ids starting at `first`, e.g. `sku-1`, `sku-2`.
#[must_use]
pub fn sku_ids(first: usize, count: usize) -> Vec<String> {
    (first..first + count).map(|n| format!("sku-{n}")).collect()
}
