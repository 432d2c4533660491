//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `CATALOG_API_URL` - Base URL of the catalog search/browse service
//! - `CATALOG_API_KEY` - Catalog API key (high entropy, never a placeholder)
//! - `FX_API_URL` - Exchange rate endpoint
//!
//! ## Optional
//! - `KICKS_HOST` - Bind address (default: 127.0.0.1)
//! - `KICKS_PORT` - Listen port (default: 3000)
//! - `CATALOG_PAGE_SIZE` - Products per page (default: 24)
//! - `CATALOG_SORT_BY` - Sort field (default: relevance)
//! - `CATALOG_SORT_ORDER` - `ascending` or `descending` (default: descending)
//! - `FX_LOCAL_CURRENCY` - Local display currency (default: INR)
//! - `FX_RATE_TTL_SECS` - Exchange rate lifetime (default: 3600)
//! - `VIEW_CACHE_TTL_SECS` - Listing cache lifetime (default: 300)
//! - `VIEW_CACHE_CAPACITY` - Maximum cached queries (default: 1000)
//! - `ADMIN_TOKEN` - Bearer token for cache maintenance; unset disables it
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use kicks_core::CurrencyCode;
use secrecy::SecretString;
use thiserror::Error;
use url::Url;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Page size shared by every listing view.
pub const DEFAULT_PAGE_SIZE: u32 = 24;

/// Exchange rates are refreshed after one hour.
pub const DEFAULT_RATE_TTL: Duration = Duration::from_secs(60 * 60);

/// Listing views are served from cache for five minutes.
pub const DEFAULT_VIEW_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

pub const DEFAULT_VIEW_CACHE_CAPACITY: u64 = 1000;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Catalog search/browse service
    pub catalog: CatalogConfig,
    /// Exchange rate service
    pub currency: CurrencyConfig,
    /// Listing view cache policy
    pub view_cache: ViewCacheConfig,
    /// Bearer token guarding the maintenance endpoints
    pub admin_token: Option<SecretString>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name (e.g. production, staging)
    pub sentry_environment: Option<String>,
}

/// Catalog service configuration.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct CatalogConfig {
    /// Base URL, e.g. `https://ac.cnstrc.com`
    pub api_url: Url,
    /// API key sent as the `key` query parameter
    pub api_key: SecretString,
    /// Products per page
    pub page_size: u32,
    /// Sort field
    pub sort_by: String,
    /// Sort direction
    pub sort_order: String,
}

impl std::fmt::Debug for CatalogConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogConfig")
            .field("api_url", &self.api_url.as_str())
            .field("api_key", &"[REDACTED]")
            .field("page_size", &self.page_size)
            .field("sort_by", &self.sort_by)
            .field("sort_order", &self.sort_order)
            .finish()
    }
}

/// Exchange rate service configuration.
#[derive(Debug, Clone)]
pub struct CurrencyConfig {
    /// Rate endpoint; `from` and `to` query parameters are appended
    pub api_url: Url,
    /// Currency prices are displayed in
    pub local_currency: CurrencyCode,
    /// How long a fetched rate may be reused
    pub rate_ttl: Duration,
}

/// View-model cache policy.
#[derive(Debug, Clone)]
pub struct ViewCacheConfig {
    pub ttl: Duration,
    pub capacity: u64,
}

impl Default for ViewCacheConfig {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_VIEW_CACHE_TTL,
            capacity: DEFAULT_VIEW_CACHE_CAPACITY,
        }
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = parse_env_or_default::<IpAddr>("KICKS_HOST", "127.0.0.1")?;
        let port = parse_env_or_default::<u16>("KICKS_PORT", "3000")?;

        Ok(Self {
            host,
            port,
            catalog: CatalogConfig::from_env()?,
            currency: CurrencyConfig::from_env()?,
            view_cache: ViewCacheConfig::from_env()?,
            admin_token: get_optional_secret("ADMIN_TOKEN")?,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl CatalogConfig {
    /// Load the catalog settings alone (used by the CLI).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the URL or key is missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        let page_size = parse_env_or_default::<u32>(
            "CATALOG_PAGE_SIZE",
            &DEFAULT_PAGE_SIZE.to_string(),
        )?;
        if page_size == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "CATALOG_PAGE_SIZE".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        let sort_order = get_env_or_default("CATALOG_SORT_ORDER", "descending");
        validate_sort_order(&sort_order)?;

        Ok(Self {
            api_url: get_base_url("CATALOG_API_URL")?,
            api_key: get_validated_secret("CATALOG_API_KEY")?,
            page_size,
            sort_by: get_env_or_default("CATALOG_SORT_BY", "relevance"),
            sort_order,
        })
    }
}

impl CurrencyConfig {
    /// Load the exchange rate settings alone (used by the CLI).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the URL is missing or a value fails to parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        let local_currency = get_env_or_default("FX_LOCAL_CURRENCY", "INR")
            .parse::<CurrencyCode>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("FX_LOCAL_CURRENCY".to_string(), e.to_string())
            })?;

        Ok(Self {
            api_url: get_base_url("FX_API_URL")?,
            local_currency,
            rate_ttl: get_duration_secs("FX_RATE_TTL_SECS", DEFAULT_RATE_TTL)?,
        })
    }
}

impl ViewCacheConfig {
    /// Load the view cache policy alone (used by the CLI).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a value fails to parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        let capacity = match get_optional_env("VIEW_CACHE_CAPACITY") {
            None => DEFAULT_VIEW_CACHE_CAPACITY,
            Some(raw) => parse_capacity("VIEW_CACHE_CAPACITY", &raw)?,
        };

        Ok(Self {
            ttl: get_duration_secs("VIEW_CACHE_TTL_SECS", DEFAULT_VIEW_CACHE_TTL)?,
            capacity,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an environment variable, falling back to a default string.
fn parse_env_or_default<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Parse a whole number of seconds into a `Duration`.
fn get_duration_secs(key: &str, default: Duration) -> Result<Duration, ConfigError> {
    match get_optional_env(key) {
        None => Ok(default),
        Some(raw) => parse_duration_secs(key, &raw),
    }
}

fn parse_duration_secs(key: &str, raw: &str) -> Result<Duration, ConfigError> {
    let secs = raw
        .trim()
        .parse::<u64>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if secs == 0 {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "must be at least 1 second".to_string(),
        ));
    }
    Ok(Duration::from_secs(secs))
}

/// A zero-capacity cache would evict every listing as soon as it is written.
fn parse_capacity(key: &str, raw: &str) -> Result<u64, ConfigError> {
    let capacity = raw
        .trim()
        .parse::<u64>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if capacity == 0 {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "must be at least 1".to_string(),
        ));
    }
    Ok(capacity)
}

/// Load and validate an http(s) base URL.
fn get_base_url(key: &str) -> Result<Url, ConfigError> {
    parse_base_url(key, &get_required_env(key)?)
}

fn parse_base_url(key: &str, raw: &str) -> Result<Url, ConfigError> {
    let url =
        Url::parse(raw).map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;

    if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "must be an http(s) URL".to_string(),
        ));
    }

    Ok(url)
}

fn validate_sort_order(value: &str) -> Result<(), ConfigError> {
    if matches!(value, "ascending" | "descending") {
        Ok(())
    } else {
        Err(ConfigError::InvalidEnvVar(
            "CATALOG_SORT_ORDER".to_string(),
            format!("expected ascending or descending, got '{value}'"),
        ))
    }
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    // Real API keys are random strings
    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated value."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

/// Load a secret that may be absent, validating it when present.
fn get_optional_secret(key: &str) -> Result<Option<SecretString>, ConfigError> {
    get_optional_env(key)
        .map(|value| {
            validate_secret_strength(&value, key)?;
            Ok(SecretString::from(value))
        })
        .transpose()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        // "ab" has entropy of 1 bit per char (50% a, 50% b)
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let result = validate_secret_strength("your-api-key-here", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength("aaaaaaaaaaaaaaaa", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_valid() {
        let result = validate_secret_strength("key_q8Vz3LmN2xTp7RwK", "TEST_VAR");
        assert!(result.is_ok());
    }

    #[test]
    fn test_parse_base_url() {
        assert!(parse_base_url("X", "https://ac.cnstrc.com").is_ok());
        assert!(parse_base_url("X", "http://127.0.0.1:8080/v1").is_ok());
        assert!(matches!(
            parse_base_url("X", "mailto:ops@kicks.example"),
            Err(ConfigError::InvalidEnvVar(_, _))
        ));
        assert!(parse_base_url("X", "not a url").is_err());
    }

    #[test]
    fn test_parse_duration_secs() {
        assert_eq!(
            parse_duration_secs("X", "3600").unwrap(),
            Duration::from_secs(3600)
        );
        assert!(parse_duration_secs("X", "0").is_err());
        assert!(parse_duration_secs("X", "-5").is_err());
    }

    #[test]
    fn test_parse_capacity() {
        assert_eq!(parse_capacity("X", "250").unwrap(), 250);
        assert_eq!(parse_capacity("X", " 1 ").unwrap(), 1);
        assert!(matches!(
            parse_capacity("X", "0"),
            Err(ConfigError::InvalidEnvVar(_, _))
        ));
        assert!(parse_capacity("X", "-1").is_err());
        assert!(parse_capacity("X", "many").is_err());
    }

    #[test]
    fn test_validate_sort_order() {
        assert!(validate_sort_order("ascending").is_ok());
        assert!(validate_sort_order("descending").is_ok());
        assert!(validate_sort_order("random").is_err());
    }

    #[test]
    fn test_socket_addr() {
        let config = StorefrontConfig {
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            catalog: CatalogConfig {
                api_url: Url::parse("https://ac.cnstrc.com").unwrap(),
                api_key: SecretString::from("key_q8Vz3LmN2xTp7RwK"),
                page_size: DEFAULT_PAGE_SIZE,
                sort_by: "relevance".to_string(),
                sort_order: "descending".to_string(),
            },
            currency: CurrencyConfig {
                api_url: Url::parse("https://fx.kicks.example/rate").unwrap(),
                local_currency: CurrencyCode::INR,
                rate_ttl: DEFAULT_RATE_TTL,
            },
            view_cache: ViewCacheConfig::default(),
            admin_token: None,
            sentry_dsn: None,
            sentry_environment: None,
        };

        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3000);
    }

    #[test]
    fn test_catalog_config_debug_redacts_key() {
        let config = CatalogConfig {
            api_url: Url::parse("https://ac.cnstrc.com").unwrap(),
            api_key: SecretString::from("key_super_private_value"),
            page_size: DEFAULT_PAGE_SIZE,
            sort_by: "relevance".to_string(),
            sort_order: "descending".to_string(),
        };

        let debug_output = format!("{config:?}");

        assert!(debug_output.contains("ac.cnstrc.com"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("key_super_private_value"));
    }
}
