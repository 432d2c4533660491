//! Infinite-scroll pagination controller.
//!
//! Listing views place an invisible sentinel after the last product and
//! report how far it is from the viewport. The controller decides whether
//! that warrants fetching the next page and hands out a [`FetchTicket`] for
//! it. Every ticket carries a unique token; only the ticket matching the
//! controller's current token may commit a result, so responses for a query
//! the user has navigated away from are discarded on arrival.
//!
//! ```text
//!            observe / retry
//!   Idle ─────────────────────▶ Fetching
//!    ▲                             │
//!    └───── complete(has_more) ────┤
//!                                  ├── complete(!has_more) ──▶ Exhausted
//!                                  └── fail ─────────────────▶ Errored ──retry──▶ Fetching
//! ```

use kicks_core::CatalogQuery;
use serde::Serialize;
use tracing::debug;

/// Sentinels within this distance below the viewport trigger a fetch.
pub const DEFAULT_LOOKAHEAD_PX: u32 = 400;

/// Where the sentinel is relative to the bottom of the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SentinelEvent {
    /// Pixels between the viewport's bottom edge and the sentinel.
    /// Zero or negative means the sentinel is on screen.
    pub distance_px: i64,
}

impl SentinelEvent {
    /// The sentinel is on screen.
    #[must_use]
    pub const fn visible() -> Self {
        Self { distance_px: 0 }
    }

    /// The sentinel is `distance_px` below the viewport.
    #[must_use]
    pub const fn below(distance_px: i64) -> Self {
        Self { distance_px }
    }

    fn within(self, lookahead_px: u32) -> bool {
        self.distance_px <= i64::from(lookahead_px)
    }
}

/// Pagination state for the current query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrollState {
    /// Waiting for the sentinel.
    Idle,
    /// A page is in flight; sentinel events are ignored.
    Fetching,
    /// The last page has been loaded; the sentinel is no longer observed.
    Exhausted,
    /// The last fetch failed; waiting for a manual retry.
    Errored,
}

/// Permission to fetch one page for one query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    pub query: CatalogQuery,
    pub page: u32,
    pub token: u64,
}

/// Outcome of handing a result back to the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commit {
    /// The result belongs to the current query and page.
    Applied,
    /// The ticket was superseded; the result must be discarded.
    Stale,
}

/// Infinite-scroll state machine for one listing view.
#[derive(Debug)]
pub struct ScrollController {
    lookahead_px: u32,
    query: Option<CatalogQuery>,
    state: ScrollState,
    next_page: u32,
    issued: u64,
    in_flight: Option<u64>,
}

impl Default for ScrollController {
    fn default() -> Self {
        Self::new(DEFAULT_LOOKAHEAD_PX)
    }
}

impl ScrollController {
    #[must_use]
    pub const fn new(lookahead_px: u32) -> Self {
        Self {
            lookahead_px,
            query: None,
            state: ScrollState::Exhausted,
            next_page: 1,
            issued: 0,
            in_flight: None,
        }
    }

    #[must_use]
    pub const fn state(&self) -> ScrollState {
        self.state
    }

    #[must_use]
    pub const fn query(&self) -> Option<&CatalogQuery> {
        self.query.as_ref()
    }

    /// The page the next ticket will be issued for.
    #[must_use]
    pub const fn next_page(&self) -> u32 {
        self.next_page
    }

    /// Whether the view should keep observing its sentinel.
    #[must_use]
    pub const fn is_observing(&self) -> bool {
        self.query.is_some() && !matches!(self.state, ScrollState::Exhausted)
    }

    /// Switch to a new query and immediately issue a ticket for its first page.
    ///
    /// Any ticket issued for the previous query becomes stale.
    pub fn start(&mut self, query: CatalogQuery) -> FetchTicket {
        self.query = Some(query.clone());
        self.next_page = 1;
        self.issue(query)
    }

    /// Switch to a query whose pages up to `next_page - 1` are already loaded
    /// (e.g. restored from the view cache).
    ///
    /// Any ticket issued for the previous query becomes stale.
    pub fn resume(&mut self, query: CatalogQuery, next_page: u32, has_more: bool) {
        self.query = Some(query);
        self.next_page = next_page.max(1);
        self.in_flight = None;
        self.state = if has_more {
            ScrollState::Idle
        } else {
            ScrollState::Exhausted
        };
    }

    /// Handle a sentinel visibility report.
    ///
    /// Issues a ticket only when the sentinel is within the lookahead margin,
    /// nothing is in flight, and more pages exist.
    pub fn observe(&mut self, event: SentinelEvent) -> Option<FetchTicket> {
        if self.state != ScrollState::Idle || !event.within(self.lookahead_px) {
            return None;
        }
        let query = self.query.clone()?;
        Some(self.issue(query))
    }

    /// Re-attempt the page that failed. Only valid in [`ScrollState::Errored`].
    pub fn retry(&mut self) -> Option<FetchTicket> {
        if self.state != ScrollState::Errored {
            return None;
        }
        let query = self.query.clone()?;
        Some(self.issue(query))
    }

    /// Whether `ticket` is the one currently allowed to commit.
    #[must_use]
    pub fn is_current(&self, ticket: &FetchTicket) -> bool {
        self.in_flight == Some(ticket.token)
            && self.query.as_ref() == Some(&ticket.query)
            && self.next_page == ticket.page
    }

    /// Record a successful fetch for `ticket`.
    pub fn complete(&mut self, ticket: &FetchTicket, has_more: bool) -> Commit {
        if !self.is_current(ticket) {
            debug!(query = %ticket.query, page = ticket.page, "Stale page completion ignored");
            return Commit::Stale;
        }
        self.in_flight = None;
        self.next_page = ticket.page + 1;
        self.state = if has_more {
            ScrollState::Idle
        } else {
            ScrollState::Exhausted
        };
        Commit::Applied
    }

    /// Record a failed fetch for `ticket`.
    pub fn fail(&mut self, ticket: &FetchTicket) -> Commit {
        if !self.is_current(ticket) {
            debug!(query = %ticket.query, page = ticket.page, "Stale page failure ignored");
            return Commit::Stale;
        }
        self.in_flight = None;
        self.state = ScrollState::Errored;
        Commit::Applied
    }

    fn issue(&mut self, query: CatalogQuery) -> FetchTicket {
        self.issued += 1;
        self.in_flight = Some(self.issued);
        self.state = ScrollState::Fetching;

        FetchTicket {
            query,
            page: self.next_page,
            token: self.issued,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn brand(slug: &str) -> CatalogQuery {
        CatalogQuery::brand(slug).unwrap()
    }

    #[test]
    fn test_new_controller_does_not_observe() {
        let mut scroll = ScrollController::default();
        assert!(!scroll.is_observing());
        assert!(scroll.observe(SentinelEvent::visible()).is_none());
    }

    #[test]
    fn test_start_issues_first_page() {
        let mut scroll = ScrollController::default();
        let ticket = scroll.start(brand("nike"));

        assert_eq!(ticket.page, 1);
        assert_eq!(scroll.state(), ScrollState::Fetching);
        assert!(scroll.is_current(&ticket));
    }

    #[test]
    fn test_events_ignored_while_fetching() {
        let mut scroll = ScrollController::default();
        let ticket = scroll.start(brand("nike"));

        assert!(scroll.observe(SentinelEvent::visible()).is_none());
        assert_eq!(scroll.complete(&ticket, true), Commit::Applied);

        let next = scroll.observe(SentinelEvent::visible()).unwrap();
        assert_eq!(next.page, 2);
        assert!(scroll.observe(SentinelEvent::visible()).is_none());
    }

    #[test]
    fn test_lookahead_margin() {
        let mut scroll = ScrollController::default();
        scroll.resume(brand("nike"), 2, true);

        assert!(scroll.observe(SentinelEvent::below(401)).is_none());
        assert_eq!(scroll.state(), ScrollState::Idle);

        let ticket = scroll.observe(SentinelEvent::below(400)).unwrap();
        assert_eq!(ticket.page, 2);
    }

    #[test]
    fn test_exhausted_stops_observing() {
        let mut scroll = ScrollController::default();
        let ticket = scroll.start(brand("nike"));
        scroll.complete(&ticket, false);

        assert_eq!(scroll.state(), ScrollState::Exhausted);
        assert!(!scroll.is_observing());
        assert!(scroll.observe(SentinelEvent::visible()).is_none());
    }

    #[test]
    fn test_error_requires_manual_retry() {
        let mut scroll = ScrollController::default();
        let first = scroll.start(brand("nike"));
        scroll.complete(&first, true);

        let second = scroll.observe(SentinelEvent::visible()).unwrap();
        assert_eq!(scroll.fail(&second), Commit::Applied);
        assert_eq!(scroll.state(), ScrollState::Errored);

        // No auto-retry from the sentinel
        assert!(scroll.observe(SentinelEvent::visible()).is_none());

        let retried = scroll.retry().unwrap();
        assert_eq!(retried.page, 2);
        assert_ne!(retried.token, second.token);
        assert_eq!(scroll.state(), ScrollState::Fetching);
    }

    #[test]
    fn test_retry_only_from_errored() {
        let mut scroll = ScrollController::default();
        scroll.resume(brand("nike"), 2, true);
        assert!(scroll.retry().is_none());
    }

    #[test]
    fn test_query_change_makes_ticket_stale() {
        let mut scroll = ScrollController::default();
        let first = scroll.start(brand("nike"));
        scroll.complete(&first, true);
        let nike_page_two = scroll.observe(SentinelEvent::visible()).unwrap();

        let adidas = scroll.start(brand("adidas"));

        assert_eq!(scroll.complete(&nike_page_two, true), Commit::Stale);
        assert_eq!(scroll.fail(&nike_page_two), Commit::Stale);
        assert_eq!(scroll.state(), ScrollState::Fetching);
        assert!(scroll.is_current(&adidas));
    }

    #[test]
    fn test_reopening_same_query_makes_old_ticket_stale() {
        let mut scroll = ScrollController::default();
        let old = scroll.start(brand("nike"));
        let new = scroll.start(brand("nike"));

        assert_eq!(scroll.complete(&old, true), Commit::Stale);
        assert_eq!(scroll.complete(&new, true), Commit::Applied);
    }
}
