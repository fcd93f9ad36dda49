//! Rate limiting and adaptive throttling for Microsoft Graph API
//!
//! Provides proactive rate limiting to prevent HTTP 429 (Too Many Requests) errors
//! when communicating with the Microsoft Graph API.
//!
//! ## Architecture
//!
//! - [`TokenBucket`]: Classic token bucket algorithm for per-endpoint rate limiting
//! - [`AdaptiveRateLimiter`]: Manages multiple token buckets with adaptive capacity
//!   adjustment based on server responses (429 throttle / success)
//!
//! ## Usage
//!
//! ```rust,no_run
//! use backup_source::rate_limit::{AdaptiveRateLimiter, RateLimitConfig};
//!
//! # async fn example() {
//! let limiter = AdaptiveRateLimiter::new(RateLimitConfig::default());
//! limiter.acquire("delta").await;
//! // ... make API call ...
//! limiter.on_success("delta");
//! # }
//! ```

use std::{
    collections::HashMap,
    sync::Mutex,
    time::{Duration, Instant},
};

use tracing::{debug, info, warn};

// ============================================================================
// T202: TokenBucket struct
// ============================================================================

/// Internal mutable state for the token bucket, protected by a Mutex.
#[derive(Debug)]
struct TokenBucketInner {
    /// Current number of available tokens (fractional for smooth refill)
    tokens: f64,
    /// Timestamp of the last refill calculation
    last_refill: Instant,
}

/// Token bucket rate limiter for a single endpoint.
///
/// Implements the classic token bucket algorithm: tokens are consumed on each
/// request and refilled at a constant rate. When no tokens are available,
/// callers must wait for refill.
///
/// Thread safety is provided by an internal `Mutex<TokenBucketInner>`.
#[derive(Debug)]
pub struct TokenBucket {
    /// Maximum number of tokens in the bucket
    capacity: u32,
    /// Effective capacity after adaptive adjustments (can be reduced by throttle)
    effective_capacity: Mutex<u32>,
    /// Rate at which tokens are added (tokens per second)
    refill_rate: f64,
    /// Mutable inner state (tokens count, last refill time)
    inner: Mutex<TokenBucketInner>,
    /// Count of consecutive successes (for adaptive recovery)
    success_count: Mutex<u64>,
    /// Original capacity before any throttle adjustments
    original_capacity: u32,
}

impl TokenBucket {
    /// Creates a new `TokenBucket` with the given configuration.
    ///
    /// The bucket starts full (tokens == capacity).
    ///
    /// # Arguments
    /// * `capacity` - Maximum number of tokens
    /// * `refill_rate` - Tokens added per second
    pub fn new(capacity: u32, refill_rate: f64) -> Self {
        Self {
            capacity,
            effective_capacity: Mutex::new(capacity),
            refill_rate,
            inner: Mutex::new(TokenBucketInner {
                tokens: capacity as f64,
                last_refill: Instant::now(),
            }),
            success_count: Mutex::new(0),
            original_capacity: capacity,
        }
    }

    // ========================================================================
    // T204: refill()
    // ========================================================================

    /// Refills the bucket based on elapsed time since last refill.
    ///
    /// Calculates how many tokens should have been added based on the elapsed
    /// duration and the refill rate. Caps at the effective capacity.
    ///
    /// This is called internally by `try_acquire()` before checking availability.
    fn refill(inner: &mut TokenBucketInner, refill_rate: f64, effective_capacity: u32) {
        let now = Instant::now();
        let elapsed = now.duration_since(inner.last_refill);
        let elapsed_secs = elapsed.as_secs_f64();

        if elapsed_secs > 0.0 {
            let new_tokens = elapsed_secs * refill_rate;
            inner.tokens = (inner.tokens + new_tokens).min(effective_capacity as f64);
            inner.last_refill = now;
        }
    }

    // ========================================================================
    // T203: try_acquire()
    // ========================================================================

    /// Attempts to acquire a single token from the bucket.
    ///
    /// Refills first based on elapsed time, then checks if at least 1.0 token
    /// is available. If so, subtracts 1.0 and returns `true`. Otherwise
    /// returns `false` without modifying the bucket.
    ///
    /// This method is thread-safe via the internal Mutex.
    pub fn try_acquire(&self) -> bool {
        let effective_cap = *self.effective_capacity.lock().unwrap();
        let mut inner = self.inner.lock().unwrap();
        Self::refill(&mut inner, self.refill_rate, effective_cap);

        if inner.tokens >= 1.0 {
            inner.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Returns the estimated wait time in seconds until a token becomes available.
    ///
    /// If tokens are already available, returns 0.0.
    pub fn time_until_available(&self) -> f64 {
        let effective_cap = *self.effective_capacity.lock().unwrap();
        let mut inner = self.inner.lock().unwrap();
        Self::refill(&mut inner, self.refill_rate, effective_cap);

        if inner.tokens >= 1.0 {
            0.0
        } else {
            let deficit = 1.0 - inner.tokens;
            if self.refill_rate > 0.0 {
                deficit / self.refill_rate
            } else {
                f64::MAX
            }
        }
    }

    /// Returns the current number of available tokens (after refill).
    pub fn available_tokens(&self) -> f64 {
        let effective_cap = *self.effective_capacity.lock().unwrap();
        let mut inner = self.inner.lock().unwrap();
        Self::refill(&mut inner, self.refill_rate, effective_cap);
        inner.tokens
    }

    /// Returns the original (maximum) capacity.
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Returns the current effective capacity (may be reduced by throttling).
    pub fn effective_capacity(&self) -> u32 {
        *self.effective_capacity.lock().unwrap()
    }

    // ========================================================================
    // T208: on_success - adaptive recovery
    // ========================================================================

    /// Records a successful API call for adaptive recovery.
    ///
    /// Every 100 consecutive successes, the effective capacity is increased
    /// by 5%, up to the original capacity. This allows the rate limiter to
    /// gradually recover from throttle-induced capacity reductions.
    pub fn on_success(&self) {
        let mut count = self.success_count.lock().unwrap();
        *count += 1;

        if *count % 100 == 0 {
            let mut eff_cap = self.effective_capacity.lock().unwrap();
            if *eff_cap < self.original_capacity {
                let increase = (*eff_cap as f64 * 0.05).max(1.0) as u32;
                let new_cap = (*eff_cap + increase).min(self.original_capacity);
                debug!(
                    old_capacity = *eff_cap,
                    new_capacity = new_cap,
                    successes = *count,
                    "Adaptive recovery: increasing bucket capacity"
                );
                *eff_cap = new_cap;
            }
        }
    }

    // ========================================================================
    // T209: on_throttle - adaptive reduction
    // ========================================================================

    /// Records a throttle event (HTTP 429) and reduces effective capacity by 50%.
    ///
    /// Also resets the success counter. The minimum effective capacity is 1
    /// to ensure the bucket never becomes permanently blocked.
    pub fn on_throttle(&self) {
        let mut eff_cap = self.effective_capacity.lock().unwrap();
        let old = *eff_cap;
        *eff_cap = (*eff_cap / 2).max(1);
        warn!(
            old_capacity = old,
            new_capacity = *eff_cap,
            "Throttle detected: reducing bucket capacity by 50%"
        );

        // Reset success counter
        let mut count = self.success_count.lock().unwrap();
        *count = 0;
    }
}

// ============================================================================
// T205: RateLimitGuard (simple marker)
// ============================================================================

/// Guard returned by the adaptive rate limiter after acquiring a token.
///
/// This is a simple marker type indicating that a rate limit token was
/// successfully acquired. Since the `TokenBucket` already subtracts the
/// token on acquisition, this guard does not need special drop behavior.
/// It can be used for future extensions (e.g., tracking in-flight requests).
#[derive(Debug)]
pub struct RateLimitGuard {
    /// Endpoint this guard was acquired for (for logging/metrics)
    _endpoint: String,
}

impl RateLimitGuard {
    fn new(endpoint: String) -> Self {
        Self {
            _endpoint: endpoint,
        }
    }
}

// ============================================================================
// T206: RateLimitConfig
// ============================================================================

/// Configuration for the adaptive rate limiter.
///
/// Defines default bucket parameters and per-endpoint overrides.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Default bucket capacity (tokens)
    pub default_capacity: u32,
    /// Default refill rate (tokens per second)
    pub default_refill_rate: f64,
    /// Per-endpoint overrides: (capacity, refill_rate)
    pub endpoint_overrides: HashMap<String, (u32, f64)>,
    /// Maximum number of retries on 429 responses
    pub max_retries: u32,
}

impl Default for RateLimitConfig {
    /// Returns default configuration aligned with Microsoft Graph API limits.
    ///
    /// Microsoft Graph API has a general limit of ~600 requests per 10 minutes
    /// per app per tenant, which translates to roughly 1 request per second.
    /// We start conservatively at 10 tokens/sec and let adaptive throttling adjust.
    fn default() -> Self {
        let mut overrides = HashMap::new();
        // Delta endpoint: conservative polling (10 req/min = 0.167/sec)
        overrides.insert("delta".to_string(), (10, 10.0 / 60.0));
        // Upload: moderate (60 req/min = 1/sec)
        overrides.insert("upload".to_string(), (60, 1.0));
        // Download: generous (120 req/min = 2/sec)
        overrides.insert("download".to_string(), (120, 2.0));
        // Metadata: liberal (100 req/min ~ 1.67/sec)
        overrides.insert("metadata".to_string(), (100, 100.0 / 60.0));

        Self {
            default_capacity: 600,
            default_refill_rate: 10.0,
            endpoint_overrides: overrides,
            max_retries: 5,
        }
    }
}

// ============================================================================
// T206: AdaptiveRateLimiter struct
// ============================================================================

/// Adaptive rate limiter managing per-endpoint token buckets.
///
/// Creates and manages `TokenBucket` instances for different API endpoints.
/// Adapts bucket capacities based on server responses: reduces on throttle
/// (429), gradually recovers on consecutive successes.
///
/// Thread-safe and designed to be shared via `Arc<AdaptiveRateLimiter>`.
pub struct AdaptiveRateLimiter {
    /// Per-endpoint token buckets
    buckets: Mutex<HashMap<String, TokenBucket>>,
    /// Configuration for bucket creation and retry behavior
    config: RateLimitConfig,
}

impl std::fmt::Debug for AdaptiveRateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdaptiveRateLimiter")
            .field("config", &self.config)
            .finish()
    }
}

impl AdaptiveRateLimiter {
    /// Creates a new `AdaptiveRateLimiter` with the given configuration.
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            buckets: Mutex::new(HashMap::new()),
            config,
        }
    }

    /// Creates a new `AdaptiveRateLimiter` with default Graph API limits.
    pub fn with_defaults() -> Self {
        Self::new(RateLimitConfig::default())
    }

    /// Returns the maximum number of retries configured.
    pub fn max_retries(&self) -> u32 {
        self.config.max_retries
    }

    /// Gets or creates a token bucket for the given endpoint.
    ///
    /// If an endpoint-specific override is configured, those parameters are used.
    /// Otherwise, the default capacity and refill rate are applied.
    fn get_or_create_bucket<F, R>(&self, endpoint: &str, f: F) -> R
    where
        F: FnOnce(&TokenBucket) -> R,
    {
        let mut buckets = self.buckets.lock().unwrap();
        if !buckets.contains_key(endpoint) {
            let (capacity, refill_rate) = self
                .config
                .endpoint_overrides
                .get(endpoint)
                .copied()
                .unwrap_or((
                    self.config.default_capacity,
                    self.config.default_refill_rate,
                ));

            debug!(
                endpoint,
                capacity, refill_rate, "Creating new token bucket for endpoint"
            );
            buckets.insert(
                endpoint.to_string(),
                TokenBucket::new(capacity, refill_rate),
            );
        }
        f(buckets.get(endpoint).unwrap())
    }

    // ========================================================================
    // T207: acquire()
    // ========================================================================

    /// Acquires a rate limit token for the given endpoint.
    ///
    /// If no tokens are available, calculates the wait time and sleeps until
    /// a token becomes available. Returns a `RateLimitGuard` on success.
    ///
    /// This method is async and will yield to the tokio runtime while waiting.
    pub async fn acquire(&self, endpoint: &str) -> RateLimitGuard {
        loop {
            let acquired = self.get_or_create_bucket(endpoint, |bucket| bucket.try_acquire());

            if acquired {
                debug!(endpoint, "Rate limit token acquired");
                return RateLimitGuard::new(endpoint.to_string());
            }

            // Calculate wait time and sleep
            let wait_secs =
                self.get_or_create_bucket(endpoint, |bucket| bucket.time_until_available());

            let wait = Duration::from_secs_f64(wait_secs.max(0.01));
            debug!(
                endpoint,
                wait_ms = wait.as_millis(),
                "No tokens available, waiting for refill"
            );
            tokio::time::sleep(wait).await;
        }
    }

    // ========================================================================
    // T208: on_success()
    // ========================================================================

    /// Notifies the rate limiter that an API call succeeded.
    ///
    /// Delegates to the endpoint's token bucket for adaptive recovery.
    /// After enough consecutive successes, the bucket's effective capacity
    /// will gradually increase back toward the original limit.
    pub fn on_success(&self, endpoint: &str) {
        self.get_or_create_bucket(endpoint, |bucket| bucket.on_success());
    }

    // ========================================================================
    // T209: on_throttle()
    // ========================================================================

    /// Notifies the rate limiter that a 429 response was received.
    ///
    /// Reduces the endpoint's effective bucket capacity by 50% to decrease
    /// request pressure. The capacity can recover via `on_success()`.
    pub fn on_throttle(&self, endpoint: &str) {
        info!(endpoint, "Recording throttle event for endpoint");
        self.get_or_create_bucket(endpoint, |bucket| bucket.on_throttle());
    }

    /// Returns the current available tokens for an endpoint.
    ///
    /// Returns `None` if no bucket exists for the endpoint yet.
    pub fn available_tokens(&self, endpoint: &str) -> Option<f64> {
        let buckets = self.buckets.lock().unwrap();
        buckets.get(endpoint).map(|b| b.available_tokens())
    }

    /// Returns the effective capacity for an endpoint.
    ///
    /// Returns `None` if no bucket exists for the endpoint yet.
    pub fn effective_capacity(&self, endpoint: &str) -> Option<u32> {
        let buckets = self.buckets.lock().unwrap();
        buckets.get(endpoint).map(|b| b.effective_capacity())
    }
}

// ============================================================================
// T211: Retry-After header parsing helpers
// ============================================================================

/// Parses a Retry-After header value into a Duration.
///
/// The header can be either:
/// - An integer number of seconds (e.g., "30")
/// - An HTTP-date (e.g., "Fri, 31 Dec 2025 23:59:59 GMT") - parsed as seconds from now
///
/// Falls back to the default duration if parsing fails.
pub fn parse_retry_after(value: &str, default: Duration) -> Duration {
    // Try parsing as integer seconds first (most common for Graph API)
    if let Ok(seconds) = value.trim().parse::<u64>() {
        return Duration::from_secs(seconds);
    }

    // Try parsing as HTTP-date using chrono
    if let Ok(date) = chrono::DateTime::parse_from_rfc2822(value.trim()) {
        let now = chrono::Utc::now();
        let target = date.with_timezone(&chrono::Utc);
        if target > now {
            let diff = target - now;
            if let Some(secs) = diff
                .num_seconds()
                .try_into()
                .ok()
                .filter(|&s: &u64| s <= 3600)
            {
                return Duration::from_secs(secs);
            }
        }
    }

    // Fallback
    warn!(value, "Could not parse Retry-After header, using default");
    default
}

// ============================================================================
// T213: Unit tests
// ============================================================================
