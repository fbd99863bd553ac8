//! Outbound rate limiting
//!
//! A sliding-window limiter that bounds how many operations of one kind start
//! within any trailing window (one minute by default). Unlike a rejecting
//! limiter it never fails: [`RateLimiter::acquire`] simply suspends the caller
//! until the operation may proceed.
//!
//! # Architecture
//!
//! ```text
//! search handler ──▶ search limiter (30/min) ──▶ DuckDuckGo
//! fetch handler  ──▶ fetch limiter  (20/min) ──▶ target page
//!                          │
//!                   ┌──────┴──────┐
//!                   │ RateWindow  │  admitted timestamps, oldest first
//!                   └─────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use ddg_proxy::rate_limit::{RateLimitConfig, RateLimiter};
//!
//! #[tokio::main]
//! async fn main() {
//!     let limiter = RateLimiter::new(RateLimitConfig::new(30));
//!
//!     limiter.acquire().await;
//!     // ... perform the rate limited operation
//! }
//! ```

use std::collections::VecDeque;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info};

// ============================================================================
// Configuration
// ============================================================================

/// Length of the default rolling window
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(60);

/// Configuration for a [`RateLimiter`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Operations admitted per window (values below 1 are treated as 1)
    pub requests_per_minute: u32,

    /// Length of the rolling window (default: 60s)
    pub window: Duration,

    /// Enable rate limiting (can be disabled for testing)
    pub enabled: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_minute: 30,
            window: DEFAULT_WINDOW,
            enabled: true,
        }
    }
}

impl RateLimitConfig {
    /// Create a configuration admitting `requests_per_minute` operations
    pub fn new(requests_per_minute: u32) -> Self {
        Self {
            requests_per_minute,
            ..Default::default()
        }
    }

    /// Use a window other than one minute
    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    /// Disable rate limiting
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

// ============================================================================
// Rate Limiter
// ============================================================================

/// Sliding-window limiter for one kind of operation
///
/// The admitted timestamps live behind an async mutex which is held for the
/// whole evict-wait-append sequence, so concurrent callers are admitted one
/// at a time and in arrival order.
#[derive(Debug)]
pub struct RateLimiter {
    window: Mutex<VecDeque<Instant>>,
    config: RateLimitConfig,
    name: &'static str,
}

impl RateLimiter {
    /// Create a new limiter with the given configuration
    pub fn new(config: RateLimitConfig) -> Self {
        Self::named("default", config)
    }

    /// Create a limiter with a label used in log output
    pub fn named(name: &'static str, mut config: RateLimitConfig) -> Self {
        config.requests_per_minute = config.requests_per_minute.max(1);
        info!(
            "Creating {} rate limiter: {} per {:?}",
            name, config.requests_per_minute, config.window
        );

        Self {
            window: Mutex::new(VecDeque::with_capacity(config.requests_per_minute as usize + 1)),
            config,
            name,
        }
    }

    /// Wait until one more operation fits in the window, then record it
    ///
    /// Entries older than the window are evicted first. When the window is
    /// full the caller sleeps once, until the oldest entry expires; there is
    /// no re-check after waking.
    pub async fn acquire(&self) {
        if !self.config.enabled {
            return;
        }

        let mut window = self.window.lock().await;
        let now = Instant::now();

        while let Some(&oldest) = window.front() {
            if now.duration_since(oldest) >= self.config.window {
                window.pop_front();
            } else {
                break;
            }
        }

        if window.len() >= self.config.requests_per_minute as usize {
            if let Some(&oldest) = window.front() {
                let wait = self
                    .config
                    .window
                    .saturating_sub(now.duration_since(oldest));
                if !wait.is_zero() {
                    debug!(
                        limiter = self.name,
                        wait_ms = wait.as_millis() as u64,
                        "Rate limit reached, delaying"
                    );
                    tokio::time::sleep(wait).await;
                }
            }
        }

        window.push_back(Instant::now());
    }

    /// Number of admissions currently recorded (expired ones included until
    /// the next `acquire` evicts them)
    pub async fn in_flight(&self) -> usize {
        self.window.lock().await.len()
    }

    /// Get configuration (immutable)
    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_acquire_under_limit_does_not_wait() {
        let limiter = RateLimiter::new(RateLimitConfig::new(5));
        let start = Instant::now();

        for _ in 0..5 {
            limiter.acquire().await;
        }

        assert!(start.elapsed() < Duration::from_millis(1));
        assert_eq!(limiter.in_flight().await, 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_acquire_waits_for_oldest_to_expire() {
        let limiter = RateLimiter::new(RateLimitConfig::new(3));

        limiter.acquire().await;
        tokio::time::advance(Duration::from_secs(10)).await;
        limiter.acquire().await;
        limiter.acquire().await;

        let start = Instant::now();
        limiter.acquire().await;
        let waited = start.elapsed();

        // oldest admission was 10s ago, so 50s remain in its window
        assert!(waited >= Duration::from_secs(50), "waited {:?}", waited);
        assert!(waited < Duration::from_secs(51), "waited {:?}", waited);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_entries_are_evicted() {
        let limiter = RateLimiter::new(RateLimitConfig::new(2));

        limiter.acquire().await;
        limiter.acquire().await;
        tokio::time::advance(Duration::from_secs(61)).await;

        let start = Instant::now();
        limiter.acquire().await;

        assert!(start.elapsed() < Duration::from_millis(1));
        assert_eq!(limiter.in_flight().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_custom_window() {
        let config = RateLimitConfig::new(1).with_window(Duration::from_secs(5));
        let limiter = RateLimiter::new(config);

        limiter.acquire().await;
        let start = Instant::now();
        limiter.acquire().await;

        let waited = start.elapsed();
        assert!(waited >= Duration::from_secs(5));
        assert!(waited < Duration::from_secs(6));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_acquire_admits_exactly_limit() {
        let limiter = Arc::new(RateLimiter::new(RateLimitConfig::new(4)));
        let start = Instant::now();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let limiter = Arc::clone(&limiter);
            handles.push(tokio::spawn(async move {
                limiter.acquire().await;
                start.elapsed()
            }));
        }

        let mut immediate = 0;
        for handle in handles {
            if handle.await.unwrap() < Duration::from_secs(1) {
                immediate += 1;
            }
        }

        assert_eq!(immediate, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_disabled_limiter_never_waits() {
        let limiter = RateLimiter::new(RateLimitConfig::new(1).disabled());
        let start = Instant::now();

        for _ in 0..100 {
            limiter.acquire().await;
        }

        assert!(start.elapsed() < Duration::from_millis(1));
        assert_eq!(limiter.in_flight().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_limit_is_treated_as_one() {
        let limiter = RateLimiter::new(RateLimitConfig::new(0));
        assert_eq!(limiter.config().requests_per_minute, 1);

        limiter.acquire().await;
        let start = Instant::now();
        limiter.acquire().await;
        assert!(start.elapsed() >= Duration::from_secs(60));
    }

    #[test]
    fn test_config_builder() {
        let config = RateLimitConfig::new(20)
            .with_window(Duration::from_secs(30))
            .disabled();

        assert_eq!(config.requests_per_minute, 20);
        assert_eq!(config.window, Duration::from_secs(30));
        assert!(!config.enabled);
    }
}
