//! HTTP client for the catalog search/browse service.

use std::sync::Arc;

use kicks_core::{CatalogQuery, QueryKind};
use secrecy::{ExposeSecret, SecretString};
use tracing::{instrument, warn};
use url::Url;

use super::normalize::parse_results;
use super::{CatalogError, CatalogPage, compute_has_more};
use crate::config::CatalogConfig;

/// Client for the catalog service.
///
/// Cheap to clone; all clones share one connection pool.
#[derive(Clone)]
pub struct CatalogClient {
    inner: Arc<CatalogClientInner>,
}

struct CatalogClientInner {
    client: reqwest::Client,
    base_url: Url,
    api_key: SecretString,
    page_size: u32,
    sort_by: String,
    sort_order: String,
}

impl CatalogClient {
    /// Create a new catalog client.
    #[must_use]
    pub fn new(config: &CatalogConfig) -> Self {
        Self {
            inner: Arc::new(CatalogClientInner {
                client: reqwest::Client::new(),
                base_url: config.api_url.clone(),
                api_key: config.api_key.clone(),
                page_size: config.page_size,
                sort_by: config.sort_by.clone(),
                sort_order: config.sort_order.clone(),
            }),
        }
    }

    /// Products requested per page.
    #[must_use]
    pub fn page_size(&self) -> u32 {
        self.inner.page_size
    }

    /// Build the request URL for one page of a query.
    fn page_url(&self, query: &CatalogQuery, page_number: u32) -> Result<Url, CatalogError> {
        let mut url = self.inner.base_url.clone();

        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|()| CatalogError::InvalidBaseUrl(self.inner.base_url.to_string()))?;
            segments.pop_if_empty();
            match query.kind() {
                QueryKind::Search => segments.extend(["search", query.key()]),
                QueryKind::Brand => segments.extend(["browse", "brand", query.key()]),
                QueryKind::Collection => segments.extend(["browse", "collection_id", query.key()]),
                QueryKind::Feed => segments.extend(["browse", "group_id", query.key()]),
            };
        }

        url.query_pairs_mut()
            .append_pair("key", self.inner.api_key.expose_secret())
            .append_pair("page", &page_number.to_string())
            .append_pair("num_results_per_page", &self.inner.page_size.to_string())
            .append_pair("sort_by", &self.inner.sort_by)
            .append_pair("sort_order", &self.inner.sort_order);

        Ok(url)
    }

    /// Fetch one page of products for a query.
    ///
    /// Records without a usable id are dropped. The returned page keeps the
    /// catalog's relevance order.
    ///
    /// # Errors
    ///
    /// - [`CatalogError::InvalidPage`] if `page_number` is 0
    /// - [`CatalogError::Network`] if the request fails
    /// - [`CatalogError::Status`] for a non-2xx response
    /// - [`CatalogError::InvalidShape`] if the body isn't the expected JSON
    #[instrument(skip(self), fields(query = %query))]
    pub async fn fetch_page(
        &self,
        query: &CatalogQuery,
        page_number: u32,
    ) -> Result<CatalogPage, CatalogError> {
        if page_number == 0 {
            return Err(CatalogError::InvalidPage(page_number));
        }

        let url = self.page_url(query, page_number)?;
        let response = self.inner.client.get(url).send().await?;
        let status = response.status();

        // Get response body as text first for better error diagnostics
        let response_text = response.text().await?;

        if !status.is_success() {
            tracing::error!(
                status = %status,
                body = %response_text.chars().take(500).collect::<String>(),
                "Catalog API returned non-success status"
            );
            return Err(CatalogError::Status {
                status: status.as_u16(),
                message: response_text.chars().take(200).collect(),
            });
        }

        let results = parse_results(&response_text).inspect_err(|e| {
            warn!(
                error = %e,
                body = %response_text.chars().take(500).collect::<String>(),
                "Catalog response has an unexpected shape"
            );
        })?;

        let has_more = compute_has_more(
            page_number,
            self.inner.page_size,
            results.total_results,
            results.returned,
        );

        tracing::debug!(
            items = results.items.len(),
            dropped = results.returned - results.items.len(),
            has_more,
            "Fetched catalog page"
        );

        Ok(CatalogPage {
            query: query.clone(),
            page_number,
            items: results.items,
            total_results: results.total_results,
            has_more,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::config::DEFAULT_PAGE_SIZE;

    fn client_for(base: &str) -> CatalogClient {
        CatalogClient::new(&CatalogConfig {
            api_url: Url::parse(base).unwrap(),
            api_key: SecretString::from("key_q8Vz3LmN2xTp7RwK"),
            page_size: DEFAULT_PAGE_SIZE,
            sort_by: "relevance".to_string(),
            sort_order: "descending".to_string(),
        })
    }

    #[test]
    fn test_page_url_per_kind() {
        let client = client_for("https://ac.cnstrc.com");

        let url = client
            .page_url(&CatalogQuery::brand("Nike").unwrap(), 2)
            .unwrap();
        assert_eq!(url.path(), "/browse/brand/nike");
        assert!(url.query().unwrap().contains("page=2"));
        assert!(url.query().unwrap().contains("num_results_per_page=24"));

        let url = client
            .page_url(&CatalogQuery::collection("dunk-low").unwrap(), 1)
            .unwrap();
        assert_eq!(url.path(), "/browse/collection_id/dunk-low");

        let url = client
            .page_url(&CatalogQuery::feed("trending").unwrap(), 1)
            .unwrap();
        assert_eq!(url.path(), "/browse/group_id/trending");
    }

    #[test]
    fn test_search_term_is_percent_encoded() {
        let client = client_for("https://ac.cnstrc.com/v1/");
        let url = client
            .page_url(&CatalogQuery::search("air max/90").unwrap(), 1)
            .unwrap();
        assert_eq!(url.path(), "/v1/search/air%20max%2F90");
    }

    #[tokio::test]
    async fn test_fetch_page_normalizes_results() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/browse/brand/nike"))
            .and(query_param("page", "1"))
            .and(query_param("key", "key_q8Vz3LmN2xTp7RwK"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "response": {
                    "results": [
                        {"value": "Dunk Low Panda", "data": {"id": "dd1391-100", "price_cents": 11_000}},
                        {"value": "Broken", "data": {}}
                    ],
                    "total_num_results": 50
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server.uri());
        let page = client
            .fetch_page(&CatalogQuery::brand("nike").unwrap(), 1)
            .await
            .unwrap();

        assert_eq!(page.page_number, 1);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].slug, "dunk-low-panda");
        assert_eq!(page.total_results, Some(50));
        assert!(page.has_more);
    }

    #[tokio::test]
    async fn test_fetch_page_non_success_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503).set_body_string("upstream down"))
            .mount(&server)
            .await;

        let client = client_for(&server.uri());
        let err = client
            .fetch_page(&CatalogQuery::search("jordan").unwrap(), 1)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            CatalogError::Status { status: 503, ref message } if message == "upstream down"
        ));
    }

    #[tokio::test]
    async fn test_fetch_page_invalid_shape() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"response": {}})))
            .mount(&server)
            .await;

        let client = client_for(&server.uri());
        let err = client
            .fetch_page(&CatalogQuery::search("jordan").unwrap(), 1)
            .await
            .unwrap_err();

        assert!(matches!(err, CatalogError::InvalidShape(_)));
    }

    #[tokio::test]
    async fn test_fetch_page_zero_is_rejected_without_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = client_for(&server.uri());
        let err = client
            .fetch_page(&CatalogQuery::search("jordan").unwrap(), 0)
            .await
            .unwrap_err();

        assert!(matches!(err, CatalogError::InvalidPage(0)));
    }
}
