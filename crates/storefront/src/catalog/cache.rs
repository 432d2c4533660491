//! Listing view cache keyed by catalog query.
//!
//! One instance is shared by every listing view (clone the handle). Each entry
//! holds the pages fetched so far for a query, in page order.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use kicks_core::{CatalogQuery, ProductId, ProductSummary};
use moka::future::Cache;
use moka::ops::compute::{CompResult, Op};
use tracing::debug;

use super::CatalogPage;

/// Pages fetched for one query.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pages: Vec<CatalogPage>,
    fetched_at: Instant,
}

impl CacheEntry {
    fn fresh(page: CatalogPage) -> Self {
        Self {
            pages: vec![page],
            fetched_at: Instant::now(),
        }
    }

    fn is_expired(&self, ttl: Duration) -> bool {
        self.fetched_at.elapsed() >= ttl
    }

    /// Pages in fetch order, starting at page 1.
    #[must_use]
    pub fn pages(&self) -> &[CatalogPage] {
        &self.pages
    }

    /// A stored page by number.
    #[must_use]
    pub fn page(&self, page_number: u32) -> Option<&CatalogPage> {
        self.pages.iter().find(|p| p.page_number == page_number)
    }

    /// All stored products in fetch order.
    pub fn items(&self) -> impl Iterator<Item = &ProductSummary> {
        self.pages.iter().flat_map(|p| p.items.iter())
    }

    /// Number of the last stored page.
    #[must_use]
    pub fn last_page_number(&self) -> u32 {
        self.pages.last().map_or(0, |p| p.page_number)
    }

    /// Whether the catalog has pages beyond the last stored one.
    #[must_use]
    pub fn has_more(&self) -> bool {
        self.pages.last().is_some_and(|p| p.has_more)
    }

    /// Append the next page, dropping products already stored.
    fn append(&mut self, mut page: CatalogPage) {
        let mut seen: HashSet<ProductId> = self.items().map(|p| p.id.clone()).collect();
        page.items.retain(|p| seen.insert(p.id.clone()));
        self.pages.push(page);
        self.fetched_at = Instant::now();
    }
}

/// Time-boxed cache of listing pages, shared across views.
#[derive(Clone)]
pub struct ViewModelCache {
    entries: Cache<CatalogQuery, CacheEntry>,
    ttl: Duration,
}

impl ViewModelCache {
    /// Create a cache whose entries expire `ttl` after their last write.
    #[must_use]
    pub fn new(ttl: Duration, capacity: u64) -> Self {
        let entries = Cache::builder()
            .max_capacity(capacity)
            .time_to_live(ttl)
            .build();

        Self { entries, ttl }
    }

    /// Look up the pages stored for a query. Expired entries are a miss.
    pub async fn get(&self, query: &CatalogQuery) -> Option<CacheEntry> {
        let entry = self.entries.get(query).await?;
        if entry.is_expired(self.ttl) {
            debug!(query = %query, "View cache entry expired");
            self.entries.invalidate(query).await;
            return None;
        }
        debug!(query = %query, pages = entry.pages.len(), "View cache hit");
        Some(entry)
    }

    /// Merge a freshly fetched page into the entry for its query.
    ///
    /// - Page 1 replaces everything stored for the query.
    /// - Page `n > 1` is appended only if page `n - 1` is the last stored
    ///   page, with products already stored removed from it.
    /// - Anything else (a late or out-of-order response, or a page for an
    ///   expired entry) is ignored.
    ///
    /// Returns the entry as stored after the merge, or `None` if nothing is
    /// stored for the query.
    pub async fn put(&self, page: CatalogPage) -> Option<CacheEntry> {
        let query = page.query.clone();
        let ttl = self.ttl;
        let page_number = page.page_number;

        let result = self
            .entries
            .entry(query.clone())
            .and_compute_with(|existing| {
                let op = merge(existing.map(moka::Entry::into_value), page, ttl);
                std::future::ready(op)
            })
            .await;

        match result {
            CompResult::Inserted(entry)
            | CompResult::ReplacedWith(entry)
            | CompResult::Unchanged(entry) => Some(entry.into_value()),
            CompResult::Removed(_) | CompResult::StillNone(_) => {
                debug!(query = %query, page = page_number, "Ignored page for missing cache entry");
                None
            }
        }
    }

    /// Drop the entry for one query.
    pub async fn invalidate(&self, query: &CatalogQuery) {
        self.entries.invalidate(query).await;
    }

    /// Drop every entry.
    pub fn invalidate_all(&self) {
        self.entries.invalidate_all();
    }
}

fn merge(existing: Option<CacheEntry>, page: CatalogPage, ttl: Duration) -> Op<CacheEntry> {
    if page.page_number == 1 {
        return Op::Put(CacheEntry::fresh(page));
    }

    match existing {
        Some(entry) if entry.is_expired(ttl) => Op::Remove,
        Some(mut entry) if page.page_number == entry.last_page_number() + 1 => {
            entry.append(page);
            Op::Put(entry)
        }
        Some(entry) => {
            debug!(
                query = %page.query,
                page = page.page_number,
                last_stored = entry.last_page_number(),
                "Ignored out-of-order page"
            );
            Op::Nop
        }
        None => Op::Nop,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    fn product(id: &str) -> ProductSummary {
        ProductSummary {
            id: ProductId::parse(id).unwrap(),
            slug: id.to_string(),
            name: id.to_uppercase(),
            image_url: String::new(),
            price_minor_usd: Some(10_000),
        }
    }

    fn page(query: &CatalogQuery, page_number: u32, ids: &[&str], has_more: bool) -> CatalogPage {
        CatalogPage {
            query: query.clone(),
            page_number,
            items: ids.iter().map(|id| product(id)).collect(),
            total_results: None,
            has_more,
        }
    }

    fn cache() -> ViewModelCache {
        ViewModelCache::new(Duration::from_secs(300), 100)
    }

    fn ids(entry: &CacheEntry) -> Vec<String> {
        entry.items().map(|p| p.id.to_string()).collect()
    }

    #[tokio::test]
    async fn test_get_miss() {
        let q = CatalogQuery::brand("nike").unwrap();
        assert!(cache().get(&q).await.is_none());
    }

    #[tokio::test]
    async fn test_page_one_replaces() {
        let cache = cache();
        let q = CatalogQuery::search("jordan").unwrap();

        cache.put(page(&q, 1, &["a", "b"], true)).await;
        cache.put(page(&q, 2, &["c"], false)).await;
        cache.put(page(&q, 1, &["x"], true)).await;

        let entry = cache.get(&q).await.unwrap();
        assert_eq!(ids(&entry), vec!["x"]);
        assert_eq!(entry.last_page_number(), 1);
    }

    #[tokio::test]
    async fn test_append_deduplicates_across_pages() {
        let cache = cache();
        let q = CatalogQuery::brand("adidas").unwrap();

        cache.put(page(&q, 1, &["a", "b", "c"], true)).await;
        let entry = cache.put(page(&q, 2, &["c", "d", "a", "e"], true)).await.unwrap();

        assert_eq!(ids(&entry), vec!["a", "b", "c", "d", "e"]);

        let unique: HashSet<_> = entry.items().map(|p| p.id.clone()).collect();
        assert_eq!(unique.len(), entry.items().count());
    }

    #[tokio::test]
    async fn test_out_of_order_page_is_ignored() {
        let cache = cache();
        let q = CatalogQuery::collection("travis-scott").unwrap();

        cache.put(page(&q, 1, &["a"], true)).await;
        let entry = cache.put(page(&q, 3, &["z"], true)).await.unwrap();
        assert_eq!(ids(&entry), vec!["a"]);

        // A second copy of page 2 arriving late is ignored
        cache.put(page(&q, 2, &["b"], true)).await;
        let entry = cache.put(page(&q, 2, &["b2"], true)).await.unwrap();
        assert_eq!(ids(&entry), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_orphan_page_is_not_stored() {
        let cache = cache();
        let q = CatalogQuery::feed("trending").unwrap();

        assert!(cache.put(page(&q, 2, &["a"], true)).await.is_none());
        assert!(cache.get(&q).await.is_none());
    }

    #[tokio::test]
    async fn test_entries_expire() {
        let cache = ViewModelCache::new(Duration::from_millis(50), 100);
        let q = CatalogQuery::brand("asics").unwrap();

        cache.put(page(&q, 1, &["a"], true)).await;
        assert!(cache.get(&q).await.is_some());

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(cache.get(&q).await.is_none());
    }

    #[tokio::test]
    async fn test_invalidate() {
        let cache = cache();
        let q1 = CatalogQuery::brand("nike").unwrap();
        let q2 = CatalogQuery::brand("puma").unwrap();

        cache.put(page(&q1, 1, &["a"], true)).await;
        cache.put(page(&q2, 1, &["b"], true)).await;

        cache.invalidate(&q1).await;
        assert!(cache.get(&q1).await.is_none());
        assert!(cache.get(&q2).await.is_some());

        cache.invalidate_all();
        assert!(cache.get(&q2).await.is_none());
    }

    #[tokio::test]
    async fn test_entry_accessors() {
        let cache = cache();
        let q = CatalogQuery::brand("vans").unwrap();

        cache.put(page(&q, 1, &["a"], true)).await;
        let entry = cache.put(page(&q, 2, &["b"], false)).await.unwrap();

        assert_eq!(entry.pages().len(), 2);
        assert_eq!(entry.page(2).unwrap().items[0].id.as_str(), "b");
        assert!(entry.page(3).is_none());
        assert!(!entry.has_more());
    }
}
