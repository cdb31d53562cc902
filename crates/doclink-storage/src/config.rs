//! Object storage client configuration.
//!
//! Credentials come from the environment. The API and delivery hosts default
//! to the public Cloudinary endpoints and can be overridden for staging or
//! for tests against a local mock server.

use url::Url;
use zeroize::Zeroizing;

/// Configuration for the object storage REST API.
///
/// Custom `Debug` implementation redacts the `api_secret` field
/// to prevent credential leakage in log output.
#[derive(Clone)]
pub struct StorageConfig {
    /// Upload API base URL. Default: <https://api.cloudinary.com>
    pub api_url: Url,
    /// Delivery base URL used to build signed URLs. Default: <https://res.cloudinary.com>
    pub delivery_url: Url,
    /// Account (cloud) name.
    pub cloud_name: String,
    /// Public API key.
    pub api_key: String,
    /// API secret used for request and URL signatures.
    pub api_secret: Zeroizing<String>,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl std::fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageConfig")
            .field("api_url", &self.api_url)
            .field("delivery_url", &self.delivery_url)
            .field("cloud_name", &self.cloud_name)
            .field("api_key", &self.api_key)
            .field("api_secret", &"[REDACTED]")
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl StorageConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `CLOUDINARY_CLOUD_NAME` (required)
    /// - `CLOUDINARY_API_KEY` (required)
    /// - `CLOUDINARY_API_SECRET` (required)
    /// - `CLOUDINARY_API_URL` (default: `https://api.cloudinary.com`)
    /// - `CLOUDINARY_DELIVERY_URL` (default: `https://res.cloudinary.com`)
    /// - `STORAGE_TIMEOUT_SECS` (default: 60)
    pub fn from_env() -> Result<Self, ConfigError> {
        let cloud_name = required("CLOUDINARY_CLOUD_NAME")?;
        let api_key = required("CLOUDINARY_API_KEY")?;
        let api_secret = Zeroizing::new(required("CLOUDINARY_API_SECRET")?);

        Ok(Self {
            api_url: env_url("CLOUDINARY_API_URL", "https://api.cloudinary.com")?,
            delivery_url: env_url("CLOUDINARY_DELIVERY_URL", "https://res.cloudinary.com")?,
            cloud_name,
            api_key,
            api_secret,
            timeout_secs: std::env::var("STORAGE_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(60),
        })
    }

    /// Create a configuration pointing both API and delivery at a local mock
    /// server (for testing).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidUrl` if `base` cannot be parsed.
    pub fn local_mock(base: &str, secret: &str) -> Result<Self, ConfigError> {
        let url = Url::parse(base)
            .map_err(|e| ConfigError::InvalidUrl("local_mock".to_string(), e.to_string()))?;
        Ok(Self {
            api_url: url.clone(),
            delivery_url: url,
            cloud_name: "demo".to_string(),
            api_key: "123456789".to_string(),
            api_secret: Zeroizing::new(secret.to_string()),
            timeout_secs: 5,
        })
    }

    /// Base URL without a trailing slash.
    pub(crate) fn api_base(&self) -> &str {
        self.api_url.as_str().trim_end_matches('/')
    }

    /// Delivery base URL without a trailing slash.
    pub(crate) fn delivery_base(&self) -> &str {
        self.delivery_url.as_str().trim_end_matches('/')
    }
}

fn required(var: &'static str) -> Result<String, ConfigError> {
    std::env::var(var)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or(ConfigError::MissingVar(var))
}

fn env_url(var: &str, default: &str) -> Result<Url, ConfigError> {
    let raw = std::env::var(var).unwrap_or_else(|_| default.to_string());
    Url::parse(&raw).map_err(|e| ConfigError::InvalidUrl(var.to_string(), e.to_string()))
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    MissingVar(&'static str),
    #[error("invalid URL for {0}: {1}")]
    InvalidUrl(String, String),
}
