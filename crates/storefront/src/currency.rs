//! USD to local-currency exchange rate provider.
//!
//! The rate is cached for its TTL (one hour by default). Concurrent callers
//! that miss the cache share a single in-flight request via
//! `moka::future::Cache::try_get_with`; concurrent forced refreshes share
//! another. Failed fetches are never cached and never evict a rate that is
//! still valid. No fallback rate is ever substituted: callers show a pending
//! price instead.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use kicks_core::{CurrencyCode, ExchangeRate};
use moka::future::Cache;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::config::CurrencyConfig;

/// Errors that can occur when fetching an exchange rate.
#[derive(Debug, Clone, Error)]
pub enum RateError {
    /// The request never produced a response.
    #[error("exchange rate request failed: {0}")]
    Network(String),

    /// The rate service answered with a non-2xx status.
    #[error("exchange rate service returned HTTP {0}")]
    Status(u16),

    /// The body is not the expected JSON, or the rate is unusable.
    #[error("invalid exchange rate payload: {0}")]
    InvalidPayload(String),
}

#[derive(Debug, Deserialize)]
struct RatePayload {
    status: Option<Value>,
    data: Option<RateData>,
}

#[derive(Debug, Deserialize)]
struct RateData {
    mid: Option<Value>,
}

/// Exchange rate provider for one local currency.
#[derive(Clone)]
pub struct RateProvider {
    inner: Arc<RateProviderInner>,
}

struct RateProviderInner {
    client: reqwest::Client,
    endpoint: Url,
    currency: CurrencyCode,
    ttl: Duration,
    cache: Cache<CurrencyCode, ExchangeRate>,
    /// In-flight forced refreshes; emptied as soon as each one settles.
    refreshes: Cache<CurrencyCode, ExchangeRate>,
}

impl RateProvider {
    /// Create a new rate provider.
    #[must_use]
    pub fn new(config: &CurrencyConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(1)
            .time_to_live(config.rate_ttl)
            .build();

        Self {
            inner: Arc::new(RateProviderInner {
                client: reqwest::Client::new(),
                endpoint: config.api_url.clone(),
                currency: config.local_currency,
                ttl: config.rate_ttl,
                cache,
                refreshes: Cache::new(1),
            }),
        }
    }

    /// The local currency rates are fetched for.
    #[must_use]
    pub fn currency(&self) -> CurrencyCode {
        self.inner.currency
    }

    /// The cached rate, if one exists and is younger than the TTL.
    pub async fn cached(&self) -> Option<ExchangeRate> {
        self.inner
            .cache
            .get(&self.inner.currency)
            .await
            .filter(|rate| !self.is_stale(rate))
    }

    /// Get the current rate.
    ///
    /// Returns the cached rate without network access unless `force_refresh`
    /// is set or the cached rate has reached its TTL.
    ///
    /// # Errors
    ///
    /// Returns a [`RateError`] if a fetch was needed and failed. The cache is
    /// left as it was in that case.
    pub async fn get_rate(&self, force_refresh: bool) -> Result<ExchangeRate, RateError> {
        let key = self.inner.currency;

        if force_refresh {
            return self.refresh().await;
        }

        match self.inner.cache.get(&key).await {
            Some(rate) if !self.is_stale(&rate) => {
                debug!(currency = %key, "Exchange rate cache hit");
                return Ok(rate);
            }
            Some(_) => self.inner.cache.invalidate(&key).await,
            None => {}
        }

        self.inner
            .cache
            .try_get_with(key, self.fetch_rate())
            .await
            .map_err(|e| (*e).clone())
    }

    /// Fetch a new rate regardless of the cached one, replacing it on success.
    async fn refresh(&self) -> Result<ExchangeRate, RateError> {
        let key = self.inner.currency;

        let result = self
            .inner
            .refreshes
            .try_get_with(key, self.fetch_rate())
            .await
            .map_err(|e| (*e).clone());
        self.inner.refreshes.invalidate(&key).await;

        if let Ok(rate) = &result {
            self.inner.cache.insert(key, *rate).await;
        }
        result
    }

    /// Forget the cached rate.
    pub async fn invalidate(&self) {
        self.inner.cache.invalidate(&self.inner.currency).await;
    }

    fn is_stale(&self, rate: &ExchangeRate) -> bool {
        chrono::Duration::from_std(self.inner.ttl)
            .map_or(true, |ttl| rate.is_stale(ttl, Utc::now()))
    }

    #[instrument(skip(self), fields(currency = %self.inner.currency))]
    async fn fetch_rate(&self) -> Result<ExchangeRate, RateError> {
        let currency = self.inner.currency;

        let mut url = self.inner.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("from", CurrencyCode::USD.code())
            .append_pair("to", currency.code());

        let response = self.inner.client.get(url).send().await.map_err(|e| {
            warn!(error = %e, "Exchange rate request failed");
            RateError::Network(e.to_string())
        })?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = %status, "Exchange rate service returned non-success status");
            return Err(RateError::Status(status.as_u16()));
        }

        let body = response
            .text()
            .await
            .map_err(|e| RateError::Network(e.to_string()))?;

        let mid = parse_mid_rate(&body).inspect_err(|e| {
            warn!(
                error = %e,
                body = %body.chars().take(200).collect::<String>(),
                "Unusable exchange rate payload"
            );
        })?;

        let rate = ExchangeRate::new(mid, currency, Utc::now())
            .map_err(|e| RateError::InvalidPayload(e.to_string()))?;

        debug!(rate = rate.rate_to_local(), "Fetched exchange rate");
        Ok(rate)
    }
}

/// Extract the mid-rate from a rate service body.
///
/// The body must carry an OK status (`200` or `"success"`) and a numeric
/// `data.mid`, either as a JSON number or a numeric string.
fn parse_mid_rate(body: &str) -> Result<f64, RateError> {
    let payload: RatePayload =
        serde_json::from_str(body).map_err(|e| RateError::InvalidPayload(e.to_string()))?;

    let status_ok = match &payload.status {
        Some(Value::Number(n)) => n.as_u64() == Some(200),
        Some(Value::String(s)) => {
            let s = s.trim();
            s.eq_ignore_ascii_case("success") || s == "200"
        }
        _ => false,
    };
    if !status_ok {
        return Err(RateError::InvalidPayload(format!(
            "status is {}",
            payload
                .status
                .map_or_else(|| "missing".to_string(), |s| s.to_string())
        )));
    }

    let mid = match payload.data.and_then(|d| d.mid) {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .ok_or_else(|| RateError::InvalidPayload("missing or non-numeric `data.mid`".to_string()))?;

    if !mid.is_finite() || mid <= 0.0 {
        return Err(RateError::InvalidPayload(format!(
            "mid-rate must be positive, got {mid}"
        )));
    }

    Ok(mid)
}
