//! Cart configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Optional
//! - `CART_STORAGE_KEY` - Storage key holding the cart blob (default: cart)
//! - `CART_STORAGE_DIR` - Directory for file-backed storage (default: .np-cart)
//! - `CART_STORAGE_QUOTA_BYTES` - Byte quota for the storage area
//! - `CART_BUS_CAPACITY` - Per-channel notification buffer, 1 to 65536 (default: 64)
//! - `ORDER_ENDPOINT_URL` - Order submission endpoint
//! - `ORDER_API_TOKEN` - Bearer token sent to the order endpoint
//! - `ORDER_TIMEOUT_SECS` - Order request timeout (default: 30)
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

/// Storage key used when `CART_STORAGE_KEY` is unset.
pub const DEFAULT_STORAGE_KEY: &str = "cart";

/// Broadcast buffer used when `CART_BUS_CAPACITY` is unset.
pub const DEFAULT_BUS_CAPACITY: usize = 64;

/// Largest accepted `CART_BUS_CAPACITY`.
pub const MAX_BUS_CAPACITY: usize = 65_536;

const DEFAULT_STORAGE_DIR: &str = ".np-cart";
const DEFAULT_ORDER_TIMEOUT_SECS: u64 = 30;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Local cart configuration.
#[derive(Debug, Clone)]
pub struct CartConfig {
    /// Storage and notification settings
    pub settings: CartSettings,
    /// Directory for file-backed storage
    pub storage_dir: PathBuf,
    /// Byte quota for the storage area
    pub storage_quota_bytes: Option<usize>,
    /// Order submission endpoint configuration
    pub order: Option<OrderEndpointConfig>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
}

/// Settings shared by every cart context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartSettings {
    /// Storage key holding the serialized cart
    pub storage_key: String,
    /// Buffer size of each notification channel
    pub bus_capacity: usize,
}

impl Default for CartSettings {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            bus_capacity: DEFAULT_BUS_CAPACITY,
        }
    }
}

/// Order submission endpoint configuration.
///
/// Implements `Debug` manually to redact the API token.
#[derive(Clone)]
pub struct OrderEndpointConfig {
    /// URL that accepts order submissions
    pub url: Url,
    /// Bearer token, if the endpoint requires one
    pub api_token: Option<SecretString>,
    /// Request timeout
    pub timeout: Duration,
}

impl std::fmt::Debug for OrderEndpointConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderEndpointConfig")
            .field("url", &self.url.as_str())
            .field("api_token", &self.api_token.as_ref().map(|_| "[REDACTED]"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl CartConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is present but invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let storage_key = get_env_or_default("CART_STORAGE_KEY", DEFAULT_STORAGE_KEY);
        if storage_key.trim().is_empty() {
            return Err(ConfigError::InvalidEnvVar(
                "CART_STORAGE_KEY".to_string(),
                "must not be empty".to_string(),
            ));
        }
        let bus_capacity = check_bus_capacity(parse_env_or_default(
            "CART_BUS_CAPACITY",
            DEFAULT_BUS_CAPACITY,
        )?)?;

        let storage_dir =
            PathBuf::from(get_env_or_default("CART_STORAGE_DIR", DEFAULT_STORAGE_DIR));
        let storage_quota_bytes = parse_optional_env("CART_STORAGE_QUOTA_BYTES")?;
        let order = OrderEndpointConfig::from_env()?;
        let sentry_dsn = get_optional_env("SENTRY_DSN");

        Ok(Self {
            settings: CartSettings {
                storage_key,
                bus_capacity,
            },
            storage_dir,
            storage_quota_bytes,
            order,
            sentry_dsn,
        })
    }

    /// Returns the order endpoint configuration, or an error naming the
    /// variable that must be set.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingEnvVar` if no endpoint is configured.
    pub fn require_order(&self) -> Result<&OrderEndpointConfig, ConfigError> {
        self.order
            .as_ref()
            .ok_or_else(|| ConfigError::MissingEnvVar("ORDER_ENDPOINT_URL".to_string()))
    }
}

impl OrderEndpointConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some(raw_url) = get_optional_env("ORDER_ENDPOINT_URL") else {
            return Ok(None);
        };
        let url = parse_endpoint_url(&raw_url)
            .map_err(|e| ConfigError::InvalidEnvVar("ORDER_ENDPOINT_URL".to_string(), e))?;
        let timeout_secs = parse_env_or_default("ORDER_TIMEOUT_SECS", DEFAULT_ORDER_TIMEOUT_SECS)?;

        Ok(Some(Self {
            url,
            api_token: get_optional_env("ORDER_API_TOKEN").map(SecretString::from),
            timeout: Duration::from_secs(timeout_secs),
        }))
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Parse an order endpoint URL, accepting only http(s).
fn parse_endpoint_url(raw: &str) -> Result<Url, String> {
    let url = Url::parse(raw).map_err(|e| e.to_string())?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(format!("unsupported scheme '{other}'")),
    }
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Validate the notification buffer size.
fn check_bus_capacity(capacity: usize) -> Result<usize, ConfigError> {
    let reason = match capacity {
        0 => "must be greater than zero".to_string(),
        c if c > MAX_BUS_CAPACITY => format!("must be at most {MAX_BUS_CAPACITY}"),
        c => return Ok(c),
    };
    Err(ConfigError::InvalidEnvVar("CART_BUS_CAPACITY".to_string(), reason))
}

/// Parse an environment variable, falling back to a default when unset.
fn parse_env_or_default<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    parse_optional_env(key).map(|value| value.unwrap_or(default))
}

/// Parse an optional environment variable.
fn parse_optional_env<T>(key: &str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_optional_env(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
        })
        .transpose()
}
