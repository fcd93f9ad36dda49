//! Domain error types
//!
//! This module defines error types specific to domain operations,
//! including validation failures, and the taxonomy of failures a sync
//! run can report against a file or a target.

use thiserror::Error;

/// Errors that can occur constructing or validating domain values.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Invalid full path (must be relative, POSIX-style, no `..`)
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Invalid drive identifier
    #[error("Invalid drive id: {0}")]
    InvalidDriveId(String),

    /// Invalid item identifier
    #[error("Invalid item id: {0}")]
    InvalidItemId(String),

    /// Invalid or empty delta token
    #[error("Invalid delta token: {0}")]
    InvalidDeltaToken(String),

    /// Generic validation failure
    #[error("Validation failed: {0}")]
    ValidationFailed(String),
}

/// Errors surfaced against a single file or a whole target during a sync run.
///
/// These are the kinds recorded in job summaries; they are distinct from
/// [`DomainError`], which guards construction of domain values.
#[derive(Debug, Error, Clone)]
pub enum SyncError {
    /// Token acquisition or refresh failed.
    #[error("authentication failed (retryable={retryable}): {message}")]
    AuthError {
        /// Whether the caller should retry once.
        retryable: bool,
        /// Detail from the token source.
        message: String,
    },

    /// A 429 response persisted past the retry budget.
    #[error("rate limited past retry budget: {0}")]
    RateLimited(String),

    /// A delta cursor was rejected with 410 Gone.
    #[error("delta token expired: {0}")]
    DeltaExpired(String),

    /// The source returned 5xx or a network error past the retry budget.
    #[error("source unavailable: {0}")]
    SourceUnavailable(String),

    /// The source returned 404 for a specific file.
    #[error("not found: {0}")]
    NotFound(String),

    /// The destination object store call failed after retries.
    #[error("destination error: {0}")]
    DestinationError(String),

    /// An upload completed but a post-upload head-check disagreed.
    #[error("integrity error: {0}")]
    IntegrityError(String),

    /// A `$filter` query was rejected with 400; caller should drop it.
    #[error("server-side filter unsupported: {0}")]
    FilterUnsupported(String),

    /// User-requested cancellation was observed.
    #[error("cancelled")]
    Cancelled,
}

impl SyncError {
    /// True for errors that should abort the whole target, not just one file.
    #[must_use]
    pub fn aborts_target(&self) -> bool {
        matches!(
            self,
            SyncError::AuthError {
                retryable: false,
                ..
            } | SyncError::SourceUnavailable(_)
                | SyncError::Cancelled
        )
    }
}
