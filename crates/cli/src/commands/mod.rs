//! CLI subcommands.

pub mod browse;
pub mod rate;

use kicks_core::QueryError;
use kicks_storefront::catalog::CatalogError;
use kicks_storefront::config::ConfigError;
use kicks_storefront::currency::RateError;
use thiserror::Error;

/// Errors a subcommand can end with.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("query: {0}")]
    Query(#[from] QueryError),

    #[error("catalog: {0}")]
    Catalog(#[from] CatalogError),

    #[error("exchange rate: {0}")]
    Rate(#[from] RateError),
}
