//! Exchange rates and localized price rendering.
//!
//! Catalog prices arrive as USD cents. Listing views show them converted to
//! the shopper's local currency with zero decimal places, e.g. `₹12,450`.
//!
//! Conversion is done in [`Decimal`] so that the canonical rounding rule
//! (round half up, i.e. midpoint away from zero) is applied exactly rather
//! than to a binary floating-point approximation of the product.

use core::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Shown while the exchange rate is still loading.
pub const LOADING_PRICE: &str = "…";

/// Shown when a product has no usable price.
pub const UNAVAILABLE_PRICE: &str = "N/A";

/// ISO 4217 currency codes supported as a local display currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    USD,
    EUR,
    GBP,
    CAD,
    AUD,
    #[default]
    INR,
    JPY,
    AED,
}

impl CurrencyCode {
    /// Display symbol placed before the amount.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::USD => "$",
            Self::EUR => "€",
            Self::GBP => "£",
            Self::CAD => "CA$",
            Self::AUD => "A$",
            Self::INR => "₹",
            Self::JPY => "¥",
            Self::AED => "AED ",
        }
    }

    /// Three-letter ISO code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::USD => "USD",
            Self::EUR => "EUR",
            Self::GBP => "GBP",
            Self::CAD => "CAD",
            Self::AUD => "AUD",
            Self::INR => "INR",
            Self::JPY => "JPY",
            Self::AED => "AED",
        }
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Error returned when parsing an unsupported currency code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported currency: {0}")]
pub struct UnsupportedCurrency(pub String);

impl FromStr for CurrencyCode {
    type Err = UnsupportedCurrency;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "USD" => Ok(Self::USD),
            "EUR" => Ok(Self::EUR),
            "GBP" => Ok(Self::GBP),
            "CAD" => Ok(Self::CAD),
            "AUD" => Ok(Self::AUD),
            "INR" => Ok(Self::INR),
            "JPY" => Ok(Self::JPY),
            "AED" => Ok(Self::AED),
            other => Err(UnsupportedCurrency(other.to_owned())),
        }
    }
}

/// Errors that can occur when constructing an [`ExchangeRate`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RateValueError {
    /// The rate is NaN or infinite.
    #[error("exchange rate must be finite")]
    NotFinite,
    /// The rate is zero or negative.
    #[error("exchange rate must be positive (got {0})")]
    NotPositive(f64),
}

/// A USD to local-currency exchange rate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExchangeRate {
    rate_to_local: f64,
    currency: CurrencyCode,
    fetched_at: DateTime<Utc>,
}

impl ExchangeRate {
    /// Create a validated exchange rate.
    ///
    /// # Errors
    ///
    /// Returns an error if `rate_to_local` is not a finite positive number.
    pub fn new(
        rate_to_local: f64,
        currency: CurrencyCode,
        fetched_at: DateTime<Utc>,
    ) -> Result<Self, RateValueError> {
        if !rate_to_local.is_finite() {
            return Err(RateValueError::NotFinite);
        }
        if rate_to_local <= 0.0 {
            return Err(RateValueError::NotPositive(rate_to_local));
        }
        Ok(Self {
            rate_to_local,
            currency,
            fetched_at,
        })
    }

    /// Units of local currency per 1 USD.
    #[must_use]
    pub const fn rate_to_local(&self) -> f64 {
        self.rate_to_local
    }

    #[must_use]
    pub const fn currency(&self) -> CurrencyCode {
        self.currency
    }

    #[must_use]
    pub const fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }

    /// Whether the rate is at least `ttl` old at `now`.
    #[must_use]
    pub fn is_stale(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(self.fetched_at) >= ttl
    }
}

/// What a price cell should show.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "text", rename_all = "snake_case")]
pub enum PriceDisplay {
    /// The exchange rate has not resolved yet.
    Loading,
    /// The product has no usable price.
    Unavailable,
    /// A formatted amount in the local currency.
    Amount(String),
}

impl fmt::Display for PriceDisplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Loading => f.write_str(LOADING_PRICE),
            Self::Unavailable => f.write_str(UNAVAILABLE_PRICE),
            Self::Amount(text) => f.write_str(text),
        }
    }
}

/// Convert a USD cent price into a local-currency display value.
///
/// A missing rate is a loading state, never an error, and never replaced by a
/// guessed rate. A missing or negative price is unavailable.
#[must_use]
pub fn display_price(price_minor_usd: Option<i64>, rate: Option<&ExchangeRate>) -> PriceDisplay {
    let Some(rate) = rate else {
        return PriceDisplay::Loading;
    };
    let Some(cents) = price_minor_usd.filter(|c| *c >= 0) else {
        return PriceDisplay::Unavailable;
    };

    convert_cents(cents, rate.rate_to_local).map_or(PriceDisplay::Unavailable, |whole| {
        PriceDisplay::Amount(format!(
            "{}{}",
            rate.currency.symbol(),
            group_thousands(whole)
        ))
    })
}

/// Render a USD cent price for display. See [`display_price`].
///
/// ```
/// use chrono::Utc;
/// use kicks_core::{CurrencyCode, ExchangeRate, render_price};
///
/// let rate = ExchangeRate::new(83.0, CurrencyCode::INR, Utc::now()).unwrap();
/// assert_eq!(render_price(Some(15_000), Some(&rate)), "₹12,450");
/// assert_eq!(render_price(None, Some(&rate)), "N/A");
/// assert_eq!(render_price(Some(15_000), None), "…");
/// ```
#[must_use]
pub fn render_price(price_minor_usd: Option<i64>, rate: Option<&ExchangeRate>) -> String {
    display_price(price_minor_usd, rate).to_string()
}

/// `round_half_up(cents / 100 * rate)`, or `None` if the value can't be represented.
fn convert_cents(cents: i64, rate: f64) -> Option<u64> {
    if !rate.is_finite() || rate <= 0.0 {
        return None;
    }
    let rate = Decimal::try_from(rate).ok()?;
    Decimal::new(cents, 2)
        .checked_mul(rate)?
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_u64()
}

fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
