//! Rate Limiting Infrastructure
//!
//! Admission control keyed by client identifier. A window opens on the
//! first request from a client and lasts [`RateLimitConfig::window`];
//! within it at most `max_requests` checks are admitted.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use chrono::Utc;

/// Rate limit configuration
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Maximum requests allowed in the window
    pub max_requests: u32,
    /// Time window duration
    pub window: Duration,
}

impl Default for RateLimitConfig {
    /// Authentication endpoint policy: 5 requests per minute
    fn default() -> Self {
        Self {
            max_requests: 5,
            window: Duration::from_secs(60),
        }
    }
}

impl RateLimitConfig {
    pub fn new(max_requests: u32, window_secs: u64) -> Self {
        Self {
            max_requests,
            window: Duration::from_secs(window_secs),
        }
    }

    pub fn window_ms(&self) -> i64 {
        i64::try_from(self.window.as_millis()).unwrap_or(i64::MAX)
    }
}

/// Rate limit check result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitResult {
    pub allowed: bool,
    /// Configured maximum for the window
    pub limit: u32,
    /// Requests still admissible in the current window
    pub remaining: u32,
    /// Epoch milliseconds at which the current window ends
    pub reset_at_ms: i64,
}

impl RateLimitResult {
    /// Whole seconds until the window resets, never less than 1
    pub fn retry_after_secs(&self, now_ms: i64) -> u64 {
        let wait_ms = (self.reset_at_ms - now_ms).max(0);
        let secs = u64::try_from(wait_ms).unwrap_or(0).div_ceil(1000);
        secs.max(1)
    }
}

/// Rate limit backend failure
#[derive(Debug, thiserror::Error)]
pub enum RateLimitError {
    #[error("Rate limit backend error: {0}")]
    Backend(String),
}

/// Trait for rate limit storage backends
#[trait_variant::make(RateLimitStore: Send)]
pub trait LocalRateLimitStore {
    /// Admit or reject one request for `key`
    ///
    /// An admitted request is counted by this same call.
    async fn check_and_increment(&self, key: &str) -> Result<RateLimitResult, RateLimitError>;

    /// Current state for `key` without counting a request
    async fn status(&self, key: &str) -> Result<RateLimitResult, RateLimitError>;
}

#[derive(Debug, Clone, Copy)]
struct RateLimitWindow {
    count: u32,
    window_start_ms: i64,
}

impl RateLimitWindow {
    fn is_expired(&self, now_ms: i64, window_ms: i64) -> bool {
        now_ms >= self.window_start_ms.saturating_add(window_ms)
    }
}

/// Process-local rate limiter
///
/// Check-and-increment for a key happens under a single lock acquisition,
/// so a burst of concurrent requests cannot all observe "allowed".
#[derive(Debug)]
pub struct InMemoryRateLimiter {
    config: RateLimitConfig,
    windows: Mutex<HashMap<String, RateLimitWindow>>,
}

impl InMemoryRateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            windows: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Admit one request now; counts it when admitted
    pub fn is_allowed(&self, key: &str) -> bool {
        self.check_at(key, now_ms()).allowed
    }

    /// Admissible requests left in the current window (floored at 0)
    pub fn remaining_requests(&self, key: &str) -> u32 {
        self.status_at(key, now_ms()).remaining
    }

    /// Epoch milliseconds at which the current window resets
    pub fn reset_time_ms(&self, key: &str) -> i64 {
        self.status_at(key, now_ms()).reset_at_ms
    }

    pub fn check_at(&self, key: &str, now_ms: i64) -> RateLimitResult {
        let window_ms = self.config.window_ms();
        let max = self.config.max_requests;

        let mut windows = self.windows.lock().unwrap_or_else(PoisonError::into_inner);
        let window = windows.entry(key.to_string()).or_insert(RateLimitWindow {
            count: 0,
            window_start_ms: now_ms,
        });

        if window.is_expired(now_ms, window_ms) {
            *window = RateLimitWindow {
                count: 0,
                window_start_ms: now_ms,
            };
        }

        let allowed = window.count < max;
        if allowed {
            window.count += 1;
        }

        RateLimitResult {
            allowed,
            limit: max,
            remaining: max.saturating_sub(window.count),
            reset_at_ms: window.window_start_ms.saturating_add(window_ms),
        }
    }

    pub fn status_at(&self, key: &str, now_ms: i64) -> RateLimitResult {
        let window_ms = self.config.window_ms();
        let max = self.config.max_requests;

        let windows = self.windows.lock().unwrap_or_else(PoisonError::into_inner);
        match windows.get(key) {
            Some(window) if !window.is_expired(now_ms, window_ms) => RateLimitResult {
                allowed: window.count < max,
                limit: max,
                remaining: max.saturating_sub(window.count),
                reset_at_ms: window.window_start_ms.saturating_add(window_ms),
            },
            _ => RateLimitResult {
                allowed: max > 0,
                limit: max,
                remaining: max,
                reset_at_ms: now_ms.saturating_add(window_ms),
            },
        }
    }

    /// Drop windows that have elapsed; returns how many were removed
    pub fn purge_expired(&self) -> usize {
        self.purge_expired_at(now_ms())
    }

    pub fn purge_expired_at(&self, now_ms: i64) -> usize {
        let window_ms = self.config.window_ms();
        let mut windows = self.windows.lock().unwrap_or_else(PoisonError::into_inner);
        let before = windows.len();
        windows.retain(|_, window| !window.is_expired(now_ms, window_ms));
        let purged = before - windows.len();

        if purged > 0 {
            tracing::debug!(purged, tracked = windows.len(), "Purged expired rate limit windows");
        }
        purged
    }

    pub fn tracked_clients(&self) -> usize {
        self.windows
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl RateLimitStore for InMemoryRateLimiter {
    async fn check_and_increment(&self, key: &str) -> Result<RateLimitResult, RateLimitError> {
        let result = self.check_at(key, now_ms());
        if !result.allowed {
            tracing::warn!(
                client_id = key,
                max = result.limit,
                reset_at_ms = result.reset_at_ms,
                "Rate limit exceeded"
            );
        }
        Ok(result)
    }

    async fn status(&self, key: &str) -> Result<RateLimitResult, RateLimitError> {
        Ok(self.status_at(key, now_ms()))
    }
}

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}
