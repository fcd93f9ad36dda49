//! Token source port (driven/secondary port)
//!
//! Holds a bearer token plus expiry; refreshes on demand. How the token is
//! obtained (client-credentials vs interactive) is entirely external to the
//! core — it depends only on this trait.

use async_trait::async_trait;
use thiserror::Error;

/// Failure acquiring or refreshing a bearer token.
#[derive(Debug, Error, Clone)]
#[error("auth error (retryable={retryable}): {message}")]
pub struct AuthError {
    /// Whether the caller should retry once before giving up.
    pub retryable: bool,
    /// Detail from the underlying token provider.
    pub message: String,
}

/// Thread-safe source of bearer tokens.
///
/// Concurrent callers observe at most one in-flight refresh. Implementers
/// track expiry with a safety margin (5 minutes is the margin this system
/// uses) so that a caller whose token is about to expire forces a refresh
/// before making its call.
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// Current bearer token, refreshing first if it is within the expiry
    /// safety margin.
    async fn token(&self) -> Result<String, AuthError>;

    /// Force a refresh regardless of the cached token's expiry, used after
    /// a 401 response.
    async fn force_refresh(&self) -> Result<String, AuthError>;
}
