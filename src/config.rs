//! Environment configuration for the Backend API client and the verifier.

use crate::error::AuthError;
use std::fmt;

/// Default Backend API origin.
pub const DEFAULT_API_URL: &str = "https://api.clerk.com";
/// Default Backend API version segment.
pub const DEFAULT_API_VERSION: &str = "v1";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("missing configuration: {0}")]
    Missing(&'static str),
    #[error("invalid configuration {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl From<ConfigError> for AuthError {
    fn from(e: ConfigError) -> Self {
        AuthError::Configuration(e.to_string())
    }
}

/// Settings read from `CLERK_*` environment variables.
#[derive(Clone)]
pub struct ClerkConfig {
    pub secret_key: String,
    pub api_url: String,
    pub api_version: String,
    /// Static PEM verification key. When absent, keys are resolved through JWKS.
    pub jwt_key: Option<String>,
    pub proxy_url: Option<String>,
    pub domain: Option<String>,
    pub is_satellite: bool,
    pub telemetry_disabled: bool,
    pub telemetry_debug: bool,
}

impl fmt::Debug for ClerkConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Do not print the secret key or key material
        f.debug_struct("ClerkConfig")
            .field("api_url", &self.api_url)
            .field("api_version", &self.api_version)
            .field("jwt_key", &self.jwt_key.as_ref().map(|_| "<redacted>"))
            .field("proxy_url", &self.proxy_url)
            .field("domain", &self.domain)
            .field("is_satellite", &self.is_satellite)
            .field("telemetry_disabled", &self.telemetry_disabled)
            .field("telemetry_debug", &self.telemetry_debug)
            .finish_non_exhaustive()
    }
}

impl ClerkConfig {
    /// Creates a configuration with defaults for everything but the secret key.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if the secret key is not of the form
    /// `sk_<environment>_<secret value>`.
    pub fn new(secret_key: impl Into<String>) -> Result<Self, ConfigError> {
        let secret_key = secret_key.into();
        validate_secret_key(&secret_key)?;

        Ok(Self {
            secret_key,
            api_url: DEFAULT_API_URL.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            jwt_key: None,
            proxy_url: None,
            domain: None,
            is_satellite: false,
            telemetry_disabled: false,
            telemetry_debug: false,
        })
    }

    /// Loads `.env` (if present) and reads the process environment.
    ///
    /// # Errors
    ///
    /// See [`ClerkConfig::from_lookup`].
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::Missing`] if `CLERK_SECRET_KEY` is unset
    /// - [`ConfigError::Invalid`] if it is malformed
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let flag = |key: &str| lookup(key).as_deref() == Some("1");

        let secret_key =
            non_empty("CLERK_SECRET_KEY").ok_or(ConfigError::Missing("CLERK_SECRET_KEY"))?;
        let mut config = Self::new(secret_key)?;

        if let Some(url) = non_empty("CLERK_API_URL") {
            config.api_url = url.trim_end_matches('/').to_string();
        }
        if let Some(version) = non_empty("CLERK_API_VERSION") {
            config.api_version = version;
        }

        config.jwt_key = non_empty("CLERK_JWT_KEY").map(|pem| pem.replace("\\n", "\n"));
        config.proxy_url = non_empty("CLERK_PROXY_URL");
        config.domain = non_empty("CLERK_DOMAIN");
        config.is_satellite = flag("CLERK_IS_SATELLITE");
        config.telemetry_disabled = flag("CLERK_TELEMETRY_DISABLED");
        config.telemetry_debug = flag("CLERK_TELEMETRY_DEBUG");

        Ok(config)
    }
}

fn validate_secret_key(key: &str) -> Result<(), ConfigError> {
    let invalid = || ConfigError::Invalid {
        key: "CLERK_SECRET_KEY",
        reason: "expected sk_<environment>_<secret value>".to_string(),
    };

    let rest = key.strip_prefix("sk_").ok_or_else(invalid)?;
    let (environment, secret) = rest.split_once('_').ok_or_else(invalid)?;
    let alphanumeric = |s: &str| !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric());

    if alphanumeric(environment) && alphanumeric(secret) {
        Ok(())
    } else {
        Err(invalid())
    }
}
