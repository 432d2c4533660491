//! Catalog loader: one data source for every listing view.
//!
//! A [`CatalogLoader`] drives a single listing (search results, a brand page,
//! a collection page, a feed) through its lifetime:
//!
//! 1. [`open`](CatalogLoader::open) restores the query from the shared
//!    [`ViewModelCache`] or fetches its first page
//! 2. [`on_sentinel`](CatalogLoader::on_sentinel) fetches the next page when
//!    the infinite-scroll sentinel approaches the viewport
//! 3. [`retry`](CatalogLoader::retry) re-attempts a failed page on request
//!
//! Every fetch is tagged with a [`FetchTicket`]. Results are committed only
//! after the await resolves and only if the ticket is still current, so a
//! response for a query the view has moved away from never lands in the
//! new query's item list.

use std::collections::HashSet;

use kicks_core::{CatalogQuery, ProductId, ProductSummary};
use serde::Serialize;
use tracing::{debug, instrument, warn};

use crate::catalog::{CatalogClient, CatalogError, CatalogPage, ViewModelCache};
use crate::scroll::{Commit, FetchTicket, ScrollController, ScrollState, SentinelEvent};

/// What a listing view renders.
#[derive(Debug, Clone, Serialize)]
pub struct LoaderSnapshot {
    pub query: Option<CatalogQuery>,
    pub items: Vec<ProductSummary>,
    pub state: ScrollState,
    pub has_more: bool,
    /// The last fetch error, shown as a dismissible banner.
    pub error: Option<LoadError>,
}

/// A failed page fetch as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadError {
    pub message: String,
    /// Whether the banner should offer a retry button.
    pub retryable: bool,
}

impl From<&CatalogError> for LoadError {
    fn from(err: &CatalogError) -> Self {
        Self {
            message: err.to_string(),
            retryable: err.is_retryable(),
        }
    }
}

/// Listing data source for one view.
pub struct CatalogLoader {
    client: CatalogClient,
    cache: ViewModelCache,
    scroll: ScrollController,
    items: Vec<ProductSummary>,
    seen: HashSet<ProductId>,
    has_more: bool,
    error: Option<LoadError>,
}

impl CatalogLoader {
    /// Create a loader over shared catalog services.
    #[must_use]
    pub fn new(client: CatalogClient, cache: ViewModelCache) -> Self {
        Self::with_scroll(client, cache, ScrollController::default())
    }

    /// Create a loader with a custom scroll controller (e.g. a different lookahead).
    #[must_use]
    pub fn with_scroll(
        client: CatalogClient,
        cache: ViewModelCache,
        scroll: ScrollController,
    ) -> Self {
        Self {
            client,
            cache,
            scroll,
            items: Vec::new(),
            seen: HashSet::new(),
            has_more: false,
            error: None,
        }
    }

    #[must_use]
    pub fn query(&self) -> Option<&CatalogQuery> {
        self.scroll.query()
    }

    /// Products loaded so far, in catalog order.
    #[must_use]
    pub fn items(&self) -> &[ProductSummary] {
        &self.items
    }

    #[must_use]
    pub const fn state(&self) -> ScrollState {
        self.scroll.state()
    }

    #[must_use]
    pub const fn has_more(&self) -> bool {
        self.has_more
    }

    #[must_use]
    pub fn snapshot(&self) -> LoaderSnapshot {
        LoaderSnapshot {
            query: self.scroll.query().cloned(),
            items: self.items.clone(),
            state: self.scroll.state(),
            has_more: self.has_more,
            error: self.error.clone(),
        }
    }

    /// Show a query, from cache if possible.
    ///
    /// A cache hit restores every stored page without network access. A miss
    /// clears the view and fetches page 1. Either way, tickets issued for the
    /// previously shown query become stale.
    ///
    /// # Errors
    ///
    /// Returns the fetch error if page 1 had to be fetched and failed. The
    /// view is left empty in [`ScrollState::Errored`].
    #[instrument(skip(self), fields(query = %query))]
    pub async fn open(&mut self, query: CatalogQuery) -> Result<Commit, CatalogError> {
        self.reset_items();

        if let Some(entry) = self.cache.get(&query).await {
            for product in entry.items() {
                self.push_unique(product.clone());
            }
            self.has_more = entry.has_more();
            self.scroll
                .resume(query, entry.last_page_number() + 1, self.has_more);
            debug!(items = self.items.len(), "Listing restored from view cache");
            return Ok(Commit::Applied);
        }

        let ticket = self.scroll.start(query);
        let result = self.fetch(&ticket).await;
        self.finish(ticket, result).await
    }

    /// Handle a sentinel visibility report, fetching the next page if due.
    ///
    /// Returns `Ok(None)` when no fetch was warranted (already fetching,
    /// exhausted, errored, or sentinel outside the lookahead margin).
    ///
    /// # Errors
    ///
    /// Returns the fetch error if the page failed. Items stay unchanged.
    pub async fn on_sentinel(
        &mut self,
        event: SentinelEvent,
    ) -> Result<Option<Commit>, CatalogError> {
        let Some(ticket) = self.begin_next_page(event) else {
            return Ok(None);
        };
        let result = self.fetch(&ticket).await;
        self.finish(ticket, result).await.map(Some)
    }

    /// Manually re-attempt the page that failed.
    ///
    /// Returns `Ok(None)` if the loader isn't in [`ScrollState::Errored`].
    ///
    /// # Errors
    ///
    /// Returns the fetch error if the page failed again.
    pub async fn retry(&mut self) -> Result<Option<Commit>, CatalogError> {
        let Some(ticket) = self.scroll.retry() else {
            return Ok(None);
        };
        self.error = None;
        let result = self.fetch(&ticket).await;
        self.finish(ticket, result).await.map(Some)
    }

    /// Ask for a ticket for the next page without fetching it.
    ///
    /// Use with [`fetch`](Self::fetch) and [`finish`](Self::finish) when the
    /// fetch runs concurrently with other view updates.
    pub fn begin_next_page(&mut self, event: SentinelEvent) -> Option<FetchTicket> {
        self.scroll.observe(event)
    }

    /// Fetch the page a ticket was issued for.
    ///
    /// # Errors
    ///
    /// Returns the catalog error unchanged.
    pub async fn fetch(&self, ticket: &FetchTicket) -> Result<CatalogPage, CatalogError> {
        self.client.fetch_page(&ticket.query, ticket.page).await
    }

    /// Commit a fetch result, if its ticket is still current.
    ///
    /// Stale results, successful or not, are discarded and reported as
    /// [`Commit::Stale`]. Successful current pages are written to the view
    /// cache and appended, skipping products already shown.
    ///
    /// # Errors
    ///
    /// Returns the fetch error for a current ticket. Items stay unchanged.
    pub async fn finish(
        &mut self,
        ticket: FetchTicket,
        result: Result<CatalogPage, CatalogError>,
    ) -> Result<Commit, CatalogError> {
        if !self.scroll.is_current(&ticket) {
            debug!(query = %ticket.query, page = ticket.page, "Discarding stale catalog response");
            return Ok(Commit::Stale);
        }

        match result {
            Ok(page) if page.query == ticket.query && page.page_number == ticket.page => {
                self.cache.put(page.clone()).await;
                if self.scroll.complete(&ticket, page.has_more) == Commit::Stale {
                    return Ok(Commit::Stale);
                }
                if ticket.page == 1 {
                    self.reset_items();
                }
                for product in page.items {
                    self.push_unique(product);
                }
                self.has_more = page.has_more;
                self.error = None;
                Ok(Commit::Applied)
            }
            Ok(page) => {
                warn!(
                    expected = %ticket.query,
                    got = %page.query,
                    page = page.page_number,
                    "Catalog response does not match its ticket"
                );
                self.scroll.fail(&ticket);
                let err = CatalogError::InvalidShape(format!(
                    "response for {} page {} does not match request",
                    page.query, page.page_number
                ));
                self.error = Some(LoadError::from(&err));
                Err(err)
            }
            Err(e) => {
                warn!(query = %ticket.query, page = ticket.page, error = %e, "Catalog page failed");
                self.scroll.fail(&ticket);
                self.error = Some(LoadError::from(&e));
                Err(e)
            }
        }
    }

    fn reset_items(&mut self) {
        self.items.clear();
        self.seen.clear();
        self.has_more = false;
        self.error = None;
    }

    fn push_unique(&mut self, product: ProductSummary) {
        if self.seen.insert(product.id.clone()) {
            self.items.push(product);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use secrecy::SecretString;
    use serde_json::{Value, json};
    use url::Url;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::config::{CatalogConfig, DEFAULT_PAGE_SIZE};

    fn client_for(server: &MockServer) -> CatalogClient {
        CatalogClient::new(&CatalogConfig {
            api_url: Url::parse(&server.uri()).unwrap(),
            api_key: SecretString::from("key_q8Vz3LmN2xTp7RwK"),
            page_size: DEFAULT_PAGE_SIZE,
            sort_by: "relevance".to_string(),
            sort_order: "descending".to_string(),
        })
    }

    fn loader_for(server: &MockServer) -> CatalogLoader {
        CatalogLoader::new(
            client_for(server),
            ViewModelCache::new(Duration::from_secs(300), 100),
        )
    }

    fn body(ids: &[&str], total: u64) -> Value {
        let results: Vec<Value> = ids
            .iter()
            .map(|id| json!({"value": format!("Sneaker {id}"), "data": {"id": id}}))
            .collect();
        json!({"response": {"results": results, "total_num_results": total}})
    }

    async fn mount_page(server: &MockServer, route: &str, page: u32, ids: &[&str], total: u64) {
        Mock::given(method("GET"))
            .and(path(route))
            .and(query_param("page", page.to_string()))
            .respond_with(ResponseTemplate::new(200).set_body_json(body(ids, total)))
            .mount(server)
            .await;
    }

    fn ids(loader: &CatalogLoader) -> Vec<String> {
        loader.items().iter().map(|p| p.id.to_string()).collect()
    }

    #[tokio::test]
    async fn test_open_fetches_first_page() {
        let server = MockServer::start().await;
        mount_page(&server, "/browse/brand/nike", 1, &["a", "b"], 50).await;

        let mut loader = loader_for(&server);
        let commit = loader.open(CatalogQuery::brand("nike").unwrap()).await.unwrap();

        assert_eq!(commit, Commit::Applied);
        assert_eq!(ids(&loader), vec!["a", "b"]);
        assert!(loader.has_more());
        assert_eq!(loader.state(), ScrollState::Idle);
    }

    #[tokio::test]
    async fn test_scroll_appends_and_deduplicates() {
        let server = MockServer::start().await;
        mount_page(&server, "/search/dunk", 1, &["a", "b"], 50).await;
        mount_page(&server, "/search/dunk", 2, &["b", "c"], 50).await;

        let mut loader = loader_for(&server);
        loader.open(CatalogQuery::search("dunk").unwrap()).await.unwrap();

        let commit = loader.on_sentinel(SentinelEvent::visible()).await.unwrap();
        assert_eq!(commit, Some(Commit::Applied));
        assert_eq!(ids(&loader), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_sentinel_far_away_does_not_fetch() {
        let server = MockServer::start().await;
        mount_page(&server, "/search/dunk", 1, &["a"], 50).await;

        let mut loader = loader_for(&server);
        loader.open(CatalogQuery::search("dunk").unwrap()).await.unwrap();

        let commit = loader.on_sentinel(SentinelEvent::below(2_000)).await.unwrap();
        assert_eq!(commit, None);
    }

    #[tokio::test]
    async fn test_reopen_within_ttl_uses_cache() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/browse/brand/nike"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body(&["a"], 50)))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/browse/brand/puma"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body(&["p"], 1)))
            .expect(1)
            .mount(&server)
            .await;

        let mut loader = loader_for(&server);
        loader.open(CatalogQuery::brand("nike").unwrap()).await.unwrap();
        loader.open(CatalogQuery::brand("puma").unwrap()).await.unwrap();
        loader.open(CatalogQuery::brand("nike").unwrap()).await.unwrap();

        assert_eq!(ids(&loader), vec!["a"]);
        assert_eq!(loader.state(), ScrollState::Idle);
    }

    #[tokio::test]
    async fn test_stale_page_after_query_change_is_discarded() {
        let server = MockServer::start().await;
        mount_page(&server, "/browse/brand/nike", 1, &["n1"], 50).await;
        mount_page(&server, "/browse/brand/nike", 2, &["n2"], 50).await;
        mount_page(&server, "/browse/brand/adidas", 1, &["a1"], 50).await;

        let mut loader = loader_for(&server);
        loader.open(CatalogQuery::brand("nike").unwrap()).await.unwrap();

        let ticket = loader.begin_next_page(SentinelEvent::visible()).unwrap();
        let nike_page_two = loader.fetch(&ticket).await;

        // The user navigates before the page-2 response is committed
        loader.open(CatalogQuery::brand("adidas").unwrap()).await.unwrap();
        let commit = loader.finish(ticket, nike_page_two).await.unwrap();

        assert_eq!(commit, Commit::Stale);
        assert_eq!(ids(&loader), vec!["a1"]);
        assert_eq!(loader.query(), Some(&CatalogQuery::brand("adidas").unwrap()));
    }

    #[tokio::test]
    async fn test_failure_leaves_items_and_waits_for_retry() {
        let server = MockServer::start().await;
        mount_page(&server, "/browse/collection_id/jordan-4", 1, &["a"], 50).await;
        Mock::given(method("GET"))
            .and(path("/browse/collection_id/jordan-4"))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"response": {}})))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        mount_page(&server, "/browse/collection_id/jordan-4", 2, &["b"], 50).await;

        let mut loader = loader_for(&server);
        loader
            .open(CatalogQuery::collection("jordan-4").unwrap())
            .await
            .unwrap();

        let err = loader.on_sentinel(SentinelEvent::visible()).await.unwrap_err();
        assert!(matches!(err, CatalogError::InvalidShape(_)));
        assert_eq!(ids(&loader), vec!["a"]);
        assert_eq!(loader.state(), ScrollState::Errored);
        // A malformed page won't fix itself; the banner offers no retry button
        assert!(!loader.snapshot().error.unwrap().retryable);

        // No automatic retry from the sentinel
        assert_eq!(loader.on_sentinel(SentinelEvent::visible()).await.unwrap(), None);

        let commit = loader.retry().await.unwrap();
        assert_eq!(commit, Some(Commit::Applied));
        assert_eq!(ids(&loader), vec!["a", "b"]);
        assert!(loader.snapshot().error.is_none());
    }

    #[tokio::test]
    async fn test_last_page_exhausts() {
        let server = MockServer::start().await;
        mount_page(&server, "/browse/group_id/trending", 1, &["a", "b"], 2).await;

        let mut loader = loader_for(&server);
        loader.open(CatalogQuery::feed("trending").unwrap()).await.unwrap();

        assert!(!loader.has_more());
        assert_eq!(loader.state(), ScrollState::Exhausted);
        assert_eq!(loader.on_sentinel(SentinelEvent::visible()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_open_failure_reports_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let mut loader = loader_for(&server);
        let err = loader
            .open(CatalogQuery::search("yeezy").unwrap())
            .await
            .unwrap_err();

        assert!(matches!(err, CatalogError::Status { status: 500, .. }));
        assert!(loader.items().is_empty());
        assert_eq!(loader.state(), ScrollState::Errored);
        assert!(loader.snapshot().error.unwrap().retryable);
    }
}
