//! Print the current exchange rate.

use kicks_storefront::config::CurrencyConfig;
use kicks_storefront::currency::RateProvider;
use tracing::info;

use super::CommandError;

/// Fetch and print the USD to local-currency rate.
///
/// # Errors
///
/// Returns an error if configuration is missing or the rate can't be fetched.
#[allow(clippy::print_stdout)]
pub async fn show() -> Result<(), CommandError> {
    let config = CurrencyConfig::from_env()?;
    let provider = RateProvider::new(&config);

    info!(currency = %provider.currency(), "Fetching exchange rate");
    let rate = provider.get_rate(false).await?;

    println!(
        "1 USD = {} {} (fetched {})",
        rate.rate_to_local(),
        rate.currency(),
        rate.fetched_at().to_rfc3339()
    );
    Ok(())
}
