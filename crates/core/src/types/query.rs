//! Catalog query identity.
//!
//! A [`CatalogQuery`] names one listing view (a search term, a brand, a
//! collection, or a curated feed) and doubles as the view cache partition key.

use core::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when building a [`CatalogQuery`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// The query key is empty after trimming.
    #[error("query key cannot be empty")]
    EmptyKey,
    /// The query kind is not one of `search`, `brand`, `collection`, `feed`.
    #[error("unknown query kind: {0}")]
    UnknownKind(String),
}

/// The kind of listing a query selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryKind {
    /// Free-text search.
    Search,
    /// Products of one brand, by brand slug.
    Brand,
    /// Products of one collection, by collection slug.
    Collection,
    /// A curated feed (home page rails, "new arrivals").
    Feed,
}

impl QueryKind {
    /// Returns the kind as a lowercase string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Search => "search",
            Self::Brand => "brand",
            Self::Collection => "collection",
            Self::Feed => "feed",
        }
    }
}

impl fmt::Display for QueryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QueryKind {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "search" => Ok(Self::Search),
            "brand" => Ok(Self::Brand),
            "collection" => Ok(Self::Collection),
            "feed" => Ok(Self::Feed),
            other => Err(QueryError::UnknownKind(other.to_owned())),
        }
    }
}

/// Identity of one catalog listing.
///
/// ## Constraints
///
/// - The key is trimmed and never empty
/// - Brand and collection keys are slugs and are lowercased, so `Nike` and
///   `nike` share a cache partition
/// - Search terms keep their case (the catalog treats them case-insensitively,
///   but the original term is echoed back to the user)
///
/// ## Examples
///
/// ```
/// use kicks_core::{CatalogQuery, QueryKind};
///
/// let q = CatalogQuery::brand("Nike").unwrap();
/// assert_eq!(q.key(), "nike");
/// assert_eq!(q.to_string(), "brand:nike");
///
/// assert!(CatalogQuery::new(QueryKind::Search, "  ").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CatalogQuery {
    kind: QueryKind,
    key: String,
}

impl CatalogQuery {
    /// Build a query of the given kind.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::EmptyKey`] if the trimmed key is empty.
    pub fn new(kind: QueryKind, key: &str) -> Result<Self, QueryError> {
        let trimmed = key.trim();
        if trimmed.is_empty() {
            return Err(QueryError::EmptyKey);
        }

        let key = match kind {
            QueryKind::Brand | QueryKind::Collection => trimmed.to_lowercase(),
            QueryKind::Search | QueryKind::Feed => trimmed.to_owned(),
        };

        Ok(Self { kind, key })
    }

    /// Build a search query.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::EmptyKey`] if the term is blank.
    pub fn search(term: &str) -> Result<Self, QueryError> {
        Self::new(QueryKind::Search, term)
    }

    /// Build a brand query.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::EmptyKey`] if the slug is blank.
    pub fn brand(slug: &str) -> Result<Self, QueryError> {
        Self::new(QueryKind::Brand, slug)
    }

    /// Build a collection query.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::EmptyKey`] if the slug is blank.
    pub fn collection(slug: &str) -> Result<Self, QueryError> {
        Self::new(QueryKind::Collection, slug)
    }

    /// Build a feed query.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::EmptyKey`] if the feed name is blank.
    pub fn feed(name: &str) -> Result<Self, QueryError> {
        Self::new(QueryKind::Feed, name)
    }

    /// Parse a kind string and key together, as they arrive from a route.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown kind or an empty key.
    pub fn parse(kind: &str, key: &str) -> Result<Self, QueryError> {
        Self::new(kind.parse()?, key)
    }

    #[must_use]
    pub const fn kind(&self) -> QueryKind {
        self.kind
    }

    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl fmt::Display for CatalogQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.key)
    }
}
