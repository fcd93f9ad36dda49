//! Source REST client
//!
//! Provides a typed HTTP client for the Graph-style source REST surface.
//! Handles authentication headers, retry policy, and the uniform HTTP
//! error handling every `SourceClient` method goes through.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use backup_source::client::SourceHttpClient;
//!
//! # async fn example(token_source: std::sync::Arc<dyn backup_core::ports::TokenSource>) -> anyhow::Result<()> {
//! let client = SourceHttpClient::new(token_source);
//! let resp = client.execute_with_retry(reqwest::Method::GET, "/users?$top=999", "metadata").await?;
//! # let _ = resp;
//! # Ok(())
//! # }
//! ```

use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use backup_core::domain::SyncError;
use backup_core::ports::TokenSource;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use tracing::{debug, info, warn};

use crate::rate_limit::{parse_retry_after, AdaptiveRateLimiter};

/// Base URL for the source's Graph-style REST API.
pub const DEFAULT_BASE_URL: &str = "https://graph.microsoft.com/v1.0";

/// Default retry-after duration when the header is missing.
const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(1);

/// Maximum backoff between retries.
const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Maximum number of retries for 429/5xx/network errors when no rate
/// limiter overrides it.
const DEFAULT_MAX_RETRIES: u32 = 5;

/// HTTP client for the source REST API.
///
/// Wraps `reqwest::Client` with bearer-token authentication, the uniform
/// retry/backoff policy (§4.2), and optional adaptive rate limiting.
pub struct SourceHttpClient {
    client: Client,
    base_url: String,
    token_source: Arc<dyn TokenSource>,
    rate_limiter: Option<Arc<AdaptiveRateLimiter>>,
}

impl SourceHttpClient {
    /// Create a new client against the default base URL.
    pub fn new(token_source: Arc<dyn TokenSource>) -> Self {
        Self {
            client: Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            token_source,
            rate_limiter: None,
        }
    }

    /// Create a client against a custom base URL (useful for testing).
    pub fn with_base_url(token_source: Arc<dyn TokenSource>, base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            token_source,
            rate_limiter: None,
        }
    }

    /// Attach an adaptive rate limiter.
    #[must_use]
    pub fn with_rate_limiter(mut self, limiter: Arc<AdaptiveRateLimiter>) -> Self {
        self.rate_limiter = Some(limiter);
        self
    }

    /// Build an authenticated request against a path relative to the base
    /// URL, or against an absolute URL (used for `next_link`/`delta_link`).
    async fn request(&self, method: Method, path_or_url: &str) -> Result<RequestBuilder, SyncError> {
        let token = self.token_source.token().await.map_err(|e| SyncError::AuthError {
            retryable: e.retryable,
            message: e.message,
        })?;
        let url = if path_or_url.starts_with("http") {
            path_or_url.to_string()
        } else {
            format!("{}{}", self.base_url, path_or_url)
        };
        Ok(self.client.request(method, &url).bearer_auth(token))
    }

    /// Execute an HTTP request with the uniform retry policy:
    /// - 429: honor `Retry-After`, else exponential backoff 1s..60s, max 5 attempts.
    /// - 401: force-refresh the token once and retry.
    /// - 410: surfaced as [`SyncError::DeltaExpired`], not retried.
    /// - 400: surfaced as [`SyncError::FilterUnsupported`], not retried.
    /// - 5xx / network errors: same backoff as 429.
    pub async fn execute_with_retry(
        &self,
        method: Method,
        path_or_url: &str,
        endpoint_category: &str,
    ) -> Result<Response, SyncError> {
        let max_retries = self
            .rate_limiter
            .as_ref()
            .map(|rl| rl.max_retries())
            .unwrap_or(DEFAULT_MAX_RETRIES);

        let mut forced_refresh = false;
        let mut attempt = 0;
        let mut backoff = Duration::from_secs(1);

        loop {
            if let Some(ref limiter) = self.rate_limiter {
                let _guard = limiter.acquire(endpoint_category).await;
            }

            let response = match self.request(method.clone(), path_or_url).await {
                Ok(builder) => builder.send().await,
                Err(e) => return Err(e),
            };

            let response = match response {
                Ok(r) => r,
                Err(e) if attempt < max_retries => {
                    warn!(path = path_or_url, attempt, error = %e, "network error, backing off");
                    tokio::time::sleep(backoff).await;
                    backoff = (backoff * 2).min(MAX_BACKOFF);
                    attempt += 1;
                    continue;
                }
                Err(e) => {
                    return Err(SyncError::SourceUnavailable(format!(
                        "network error after {attempt} attempts: {e}"
                    )))
                }
            };

            match response.status() {
                StatusCode::TOO_MANY_REQUESTS => {
                    if attempt >= max_retries {
                        return Err(SyncError::RateLimited(format!(
                            "429 retry budget exhausted for {path_or_url}"
                        )));
                    }
                    let retry_after = response
                        .headers()
                        .get("Retry-After")
                        .and_then(|v| v.to_str().ok())
                        .map(|v| parse_retry_after(v, DEFAULT_RETRY_AFTER))
                        .unwrap_or(backoff);
                    if let Some(ref limiter) = self.rate_limiter {
                        limiter.on_throttle(endpoint_category);
                    }
                    info!(path = path_or_url, attempt, ?retry_after, "429, backing off");
                    tokio::time::sleep(retry_after).await;
                    backoff = (backoff * 2).min(MAX_BACKOFF);
                    attempt += 1;
                }
                StatusCode::UNAUTHORIZED if !forced_refresh => {
                    debug!(path = path_or_url, "401, forcing token refresh");
                    self.token_source
                        .force_refresh()
                        .await
                        .map_err(|e| SyncError::AuthError {
                            retryable: e.retryable,
                            message: e.message,
                        })?;
                    forced_refresh = true;
                }
                StatusCode::GONE => {
                    return Err(SyncError::DeltaExpired(path_or_url.to_string()));
                }
                StatusCode::BAD_REQUEST => {
                    return Err(SyncError::FilterUnsupported(path_or_url.to_string()));
                }
                status if status.is_server_error() => {
                    if attempt >= max_retries {
                        return Err(SyncError::SourceUnavailable(format!(
                            "{status} past retry budget for {path_or_url}"
                        )));
                    }
                    warn!(path = path_or_url, %status, attempt, "5xx, backing off");
                    tokio::time::sleep(backoff).await;
                    backoff = (backoff * 2).min(MAX_BACKOFF);
                    attempt += 1;
                }
                StatusCode::NOT_FOUND => {
                    return Err(SyncError::NotFound(path_or_url.to_string()));
                }
                _ => {
                    if let Some(ref limiter) = self.rate_limiter {
                        limiter.on_success(endpoint_category);
                    }
                    return Ok(response);
                }
            }
        }
    }

    /// Perform a single non-retried GET, used only by code paths that
    /// classify status codes themselves (the delta walker's 410 detection).
    pub async fn get_raw(&self, path_or_url: &str) -> anyhow::Result<Response> {
        let builder = self
            .request(Method::GET, path_or_url)
            .await
            .context("building authenticated request")?;
        builder.send().await.context("sending request")
    }

    /// Base URL this client is configured against.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The underlying `reqwest::Client`, for streaming downloads.
    pub fn http_client(&self) -> &Client {
        &self.client
    }
}
