//! Core types for Kicks.
//!
//! This module provides type-safe wrappers for catalog domain concepts.

pub mod id;
pub mod price;
pub mod product;
pub mod query;

pub use id::*;
pub use price::{
    CurrencyCode, ExchangeRate, LOADING_PRICE, PriceDisplay, RateValueError, UNAVAILABLE_PRICE,
    UnsupportedCurrency, display_price, render_price,
};
pub use product::ProductSummary;
pub use query::{CatalogQuery, QueryError, QueryKind};
