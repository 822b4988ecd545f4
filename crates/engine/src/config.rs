//! Engine configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `CARTWHEEL_API_BASE_URL` - Base URL of the commerce service (e.g., `https://shop.example.com/api/`)
//!
//! ## Optional
//! - `CARTWHEEL_API_TOKEN` - Bearer token for the shopper's session
//! - `CARTWHEEL_DATA_DIR` - Directory holding the durable cart record (default: .cartwheel)
//! - `CARTWHEEL_FREE_SHIPPING_THRESHOLD` - Subtotal at which shipping is free (default: 2000)
//! - `CARTWHEEL_SHIPPING_FEE` - Flat shipping fee below the threshold (default: 150)
//! - `CARTWHEEL_CURRENCY` - ISO 4217 display currency (default: BDT)
//! - `CARTWHEEL_REQUEST_TIMEOUT_SECS` - Per-request timeout (default: 15)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use cartwheel_core::CurrencyCode;
use secrecy::SecretString;
use thiserror::Error;
use url::Url;

use crate::pricing::PriceRules;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Commerce service connection settings
    pub api: ApiConfig,
    /// Directory holding the durable cart record
    pub data_dir: PathBuf,
    /// Shipping rules for price computation
    pub pricing: PriceRules,
    /// Display currency
    pub currency: CurrencyCode,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

/// Commerce service connection settings.
///
/// Implements `Debug` manually to redact the token.
#[derive(Clone)]
pub struct ApiConfig {
    /// Base URL every endpoint path is resolved against
    pub base_url: Url,
    /// Bearer token for the shopper's session
    pub token: Option<SecretString>,
    /// Per-request timeout
    pub request_timeout: Duration,
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("base_url", &self.base_url.as_str())
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl EngineConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let api = ApiConfig::from_env()?;
        let data_dir = PathBuf::from(get_env_or_default("CARTWHEEL_DATA_DIR", ".cartwheel"));
        let pricing = PriceRules {
            free_shipping_threshold: parse_env(
                "CARTWHEEL_FREE_SHIPPING_THRESHOLD",
                PriceRules::DEFAULT_FREE_SHIPPING_THRESHOLD,
            )?,
            shipping_fee: parse_env("CARTWHEEL_SHIPPING_FEE", PriceRules::DEFAULT_SHIPPING_FEE)?,
        };
        if pricing.free_shipping_threshold.is_sign_negative()
            || pricing.shipping_fee.is_sign_negative()
        {
            return Err(ConfigError::InvalidEnvVar(
                "CARTWHEEL_SHIPPING_FEE".to_string(),
                "shipping amounts must not be negative".to_string(),
            ));
        }
        let currency = parse_env("CARTWHEEL_CURRENCY", CurrencyCode::BDT)?;

        Ok(Self {
            api,
            data_dir,
            pricing,
            currency,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }
}

impl ApiConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let base_url = parse_base_url(&get_required_env("CARTWHEEL_API_BASE_URL")?)?;
        let timeout_secs: u64 = parse_env("CARTWHEEL_REQUEST_TIMEOUT_SECS", 15)?;
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "CARTWHEEL_REQUEST_TIMEOUT_SECS".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            base_url,
            token: get_optional_env("CARTWHEEL_API_TOKEN").map(SecretString::from),
            request_timeout: Duration::from_secs(timeout_secs),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Parse and validate the service base URL.
fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    let invalid =
        |reason: String| ConfigError::InvalidEnvVar("CARTWHEEL_API_BASE_URL".to_string(), reason);
    let url = Url::parse(raw).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme: {}", url.scheme())));
    }
    if url.cannot_be_a_base() {
        return Err(invalid("URL cannot be a base".to_string()));
    }
    Ok(url)
}

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable, treating blank values as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an optional environment variable, falling back to `default` when unset.
fn parse_env<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get_optional_env(key).map_or(Ok(default), |raw| {
        raw.trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    })
}
