//! Kicks CLI - browse catalog listings from the terminal.
//!
//! # Usage
//!
//! ```bash
//! # First page of a brand listing
//! kicks browse brand nike
//!
//! # Three pages of search results
//! kicks browse search "air max" --pages 3
//!
//! # Current exchange rate (always fetched; the CLI keeps no cache between runs)
//! kicks rate
//! ```
//!
//! # Commands
//!
//! - `browse` - Load listing pages and print local prices
//! - `rate` - Print the USD exchange rate

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "kicks")]
#[command(author, version, about = "Kicks storefront CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load pages of a listing and print each product's local price
    Browse {
        /// Listing kind (`search`, `brand`, `collection`, `feed`)
        kind: String,

        /// Search term, brand slug, collection slug or feed key
        key: String,

        /// Number of pages to load
        #[arg(short, long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
        pages: u32,
    },
    /// Print the current exchange rate
    Rate,
}

#[tokio::main]
async fn main() {
    // Load .env file if present (ignore errors if not found)
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kicks_storefront=warn".into()),
        )
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CommandError> {
    match cli.command {
        Commands::Browse { kind, key, pages } => commands::browse::run(&kind, &key, pages).await,
        Commands::Rate => commands::rate::show().await,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_takes_no_flags() {
        let cli = Cli::try_parse_from(["kicks", "rate"]).unwrap();
        assert!(matches!(cli.command, Commands::Rate));

        assert!(Cli::try_parse_from(["kicks", "rate", "--refresh"]).is_err());
    }

    #[test]
    fn test_browse_rejects_zero_pages() {
        let cli = Cli::try_parse_from(["kicks", "browse", "search", "air max", "-p", "3"]).unwrap();
        assert!(matches!(cli.command, Commands::Browse { pages: 3, .. }));

        assert!(Cli::try_parse_from(["kicks", "browse", "brand", "nike", "--pages", "0"]).is_err());
    }
}
