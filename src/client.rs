//! # Backend API transport
//!
//! A small JSON-over-HTTP client for the Clerk Backend API. It is the single
//! collaborator through which the verifier reaches the network.
//!
//! ## Features
//! - **Bearer authentication** with the instance secret key
//! - **Rate-limit backoff**: waits for `X-RateLimit-Reset` once the remaining
//!   budget reported by the API is exhausted
//! - **Telemetry** emitted as `tracing` events, never sent over the network

use crate::claims::unix_now;
use crate::config::ClerkConfig;
use crate::error::{AuthError, HttpError};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, CONTENT_TYPE};
use reqwest::Method;
use serde_json::Value;
use std::fmt;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const RATE_LIMIT_REMAINING: &str = "x-ratelimit-remaining";
const RATE_LIMIT_RESET: &str = "x-ratelimit-reset";

/// Sends JSON requests to a REST API and decodes JSON responses.
#[async_trait]
pub trait HttpJsonClient: Send + Sync {
    /// Performs `method path` with an optional JSON body.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError::Status`] when the API answers with a status of 400
    /// or above, and [`HttpError::Transport`] / [`HttpError::Decode`] when the
    /// exchange itself fails.
    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value, HttpError>;
}

/// Rate-limit budget last reported by the API.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RateLimit {
    pub remaining: Option<i64>,
    /// Epoch seconds at which the budget resets.
    pub reset: Option<i64>,
}

impl RateLimit {
    /// Reads the rate-limit headers of a response.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let read = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<i64>().ok())
        };
        Self {
            remaining: read(RATE_LIMIT_REMAINING),
            reset: read(RATE_LIMIT_RESET),
        }
    }

    /// How long to wait before the next request may be sent.
    pub fn wait_time(&self, now: i64) -> Option<Duration> {
        match (self.remaining, self.reset) {
            (Some(remaining), Some(reset)) if remaining <= 0 && reset > now => {
                Some(Duration::from_secs((reset - now) as u64))
            }
            _ => None,
        }
    }
}

/// [`HttpJsonClient`] for the Clerk Backend API.
pub struct ApiClient {
    http: reqwest::Client,
    secret_key: String,
    base_url: String,
    proxy_url: Option<String>,
    is_satellite: bool,
    telemetry_disabled: bool,
    telemetry_debug: bool,
    rate_limit: Mutex<RateLimit>,
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("proxy_url", &self.proxy_url)
            .field("is_satellite", &self.is_satellite)
            .field("telemetry_disabled", &self.telemetry_disabled)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Creates a client from the given configuration.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Configuration`] if the HTTP client cannot be built.
    pub fn new(config: &ClerkConfig) -> Result<Self, AuthError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| AuthError::Configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            secret_key: config.secret_key.clone(),
            base_url: format!(
                "{}/{}",
                config.api_url.trim_end_matches('/'),
                config.api_version
            ),
            proxy_url: config.proxy_url.clone(),
            is_satellite: config.is_satellite,
            telemetry_disabled: config.telemetry_disabled,
            telemetry_debug: config.telemetry_debug,
            rate_limit: Mutex::new(RateLimit::default()),
        })
    }

    /// Full URL for an API path such as `/jwks`.
    pub fn url_for(&self, path: &str) -> String {
        let url = format!("{}{}", self.base_url, path);
        match &self.proxy_url {
            Some(proxy) => format!("{proxy}{url}"),
            None => url,
        }
    }

    /// Rate-limit budget observed on the last response.
    pub fn rate_limit(&self) -> RateLimit {
        *self
            .rate_limit
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    async fn wait_for_rate_limit(&self) {
        let wait = self.rate_limit().wait_time(unix_now());
        if let Some(wait) = wait {
            tracing::warn!("Rate limit exhausted, waiting {}s before next request", wait.as_secs());
            tokio::time::sleep(wait).await;
        }
    }

    fn update_rate_limit(&self, headers: &HeaderMap) {
        let observed = RateLimit::from_headers(headers);
        *self
            .rate_limit
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = observed;
    }

    fn send_telemetry(&self, method: &Method, endpoint: &str, status: u16) {
        if self.telemetry_disabled {
            return;
        }
        if self.telemetry_debug {
            tracing::info!(
                target: "clerk_jwt::telemetry",
                method = %method,
                endpoint,
                status,
                is_satellite = self.is_satellite,
                "Clerk telemetry"
            );
        } else {
            tracing::trace!(
                target: "clerk_jwt::telemetry",
                method = %method,
                endpoint,
                status,
                is_satellite = self.is_satellite,
                "Clerk telemetry"
            );
        }
    }
}

#[async_trait]
impl HttpJsonClient for ApiClient {
    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value, HttpError> {
        self.wait_for_rate_limit().await;

        let url = self.url_for(path);
        tracing::debug!("{} {}", method, url);

        let mut request = self
            .http
            .request(method.clone(), &url)
            .bearer_auth(&self.secret_key)
            .header(CONTENT_TYPE, "application/json");
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| {
            tracing::error!("Request to {} failed: {:?}", path, e);
            HttpError::Transport(e.to_string())
        })?;

        let status = response.status().as_u16();
        self.update_rate_limit(response.headers());
        self.send_telemetry(&method, path, status);

        let text = response
            .text()
            .await
            .map_err(|e| HttpError::Transport(format!("failed to read response body: {e}")))?;

        if status >= 400 {
            tracing::error!("API request {} {} failed with status code: {}", method, path, status);
            return Err(HttpError::Status { status, body: text });
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| HttpError::Decode(e.to_string()))
    }
}
