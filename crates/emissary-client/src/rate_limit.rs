//! Token bucket rate limiting.
//!
//! Tokens are replenished lazily: each acquisition attempt adds
//! `floor(elapsed / period * calls)` tokens, capped at `calls`, and resets the
//! refill clock. No background timer runs.

use emissary_core::{EmissaryError, Result};
use parking_lot::Mutex;
use std::time::{Duration, Instant};
use tracing::trace;

#[derive(Debug)]
struct Bucket {
    tokens: u32,
    last_checked: Instant,
}

/// A token bucket shared by every route of a router.
///
/// The blocking and async paths each have their own lock; the bucket itself
/// is only held for the refill computation.
///
/// # Example
///
/// ```
/// use emissary_client::RateLimit;
/// use std::time::Duration;
///
/// let limit = RateLimit::new(2, Duration::from_secs(60)).unwrap();
/// assert!(limit.acquire());
/// assert!(limit.acquire());
/// assert!(!limit.acquire());
/// ```
#[derive(Debug)]
pub struct RateLimit {
    calls: u32,
    period: Duration,
    bucket: Mutex<Bucket>,
    sync_lock: Mutex<()>,
    async_lock: tokio::sync::Mutex<()>,
}

impl RateLimit {
    /// Allows `calls` requests per `period`.
    pub fn new(calls: u32, period: Duration) -> Result<Self> {
        if calls == 0 {
            return Err(EmissaryError::invalid_parameter(
                "calls",
                "rate limit must allow at least one call",
            ));
        }
        if period.is_zero() {
            return Err(EmissaryError::invalid_parameter(
                "period",
                "rate limit period must be positive",
            ));
        }
        Ok(Self {
            calls,
            period,
            bucket: Mutex::new(Bucket {
                tokens: calls,
                last_checked: Instant::now(),
            }),
            sync_lock: Mutex::new(()),
            async_lock: tokio::sync::Mutex::new(()),
        })
    }

    /// Maximum calls per period.
    pub fn calls(&self) -> u32 {
        self.calls
    }

    /// Period length.
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Tokens currently available, without refilling.
    pub fn available(&self) -> u32 {
        self.bucket.lock().tokens
    }

    /// Delay between two acquisition attempts while waiting.
    pub fn retry_interval(&self) -> Duration {
        self.period / self.calls
    }

    fn try_take(&self) -> bool {
        let mut bucket = self.bucket.lock();
        let now = Instant::now();
        let elapsed = now.duration_since(bucket.last_checked);

        let refill = (elapsed.as_secs_f64() / self.period.as_secs_f64() * f64::from(self.calls))
            as u64;
        let tokens = (u64::from(bucket.tokens) + refill).min(u64::from(self.calls));
        bucket.tokens = tokens as u32;
        bucket.last_checked = now;

        if bucket.tokens > 0 {
            bucket.tokens -= 1;
            true
        } else {
            false
        }
    }

    /// Attempts to take a token without waiting.
    pub fn acquire(&self) -> bool {
        let _guard = self.sync_lock.lock();
        self.try_take()
    }

    /// Blocks the current thread until a token is taken.
    pub fn wait_for_slot(&self) {
        while !self.acquire() {
            trace!(interval = ?self.retry_interval(), "rate limited, waiting for slot");
            std::thread::sleep(self.retry_interval());
        }
    }

    /// Attempts to take a token without waiting, from async code.
    pub async fn acquire_async(&self) -> bool {
        let _guard = self.async_lock.lock().await;
        self.try_take()
    }

    /// Waits until a token is taken, suspending between attempts.
    pub async fn wait_for_slot_async(&self) {
        while !self.acquire_async().await {
            trace!(interval = ?self.retry_interval(), "rate limited, waiting for slot");
            tokio::time::sleep(self.retry_interval()).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_zero_calls() {
        assert!(RateLimit::new(0, Duration::from_secs(1)).is_err());
        assert!(RateLimit::new(1, Duration::ZERO).is_err());
    }

    #[test]
    fn test_bucket_drains() {
        let limit = RateLimit::new(3, Duration::from_secs(3600)).unwrap();
        assert!(limit.acquire());
        assert!(limit.acquire());
        assert!(limit.acquire());
        assert!(!limit.acquire());
        assert_eq!(limit.available(), 0);
    }

    #[test]
    fn test_lazy_refill_is_capped() {
        let limit = RateLimit::new(2, Duration::from_millis(50)).unwrap();
        assert!(limit.acquire());
        assert!(limit.acquire());
        assert!(!limit.acquire());

        std::thread::sleep(Duration::from_millis(200));
        assert!(limit.acquire());
        assert!(limit.acquire());
        assert!(!limit.acquire());
    }

    #[test]
    fn test_wait_for_slot_blocks_until_refill() {
        let limit = RateLimit::new(1, Duration::from_millis(40)).unwrap();
        limit.wait_for_slot();

        let start = Instant::now();
        limit.wait_for_slot();
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn test_retry_interval() {
        let limit = RateLimit::new(4, Duration::from_secs(2)).unwrap();
        assert_eq!(limit.retry_interval(), Duration::from_millis(500));
        assert_eq!(limit.calls(), 4);
        assert_eq!(limit.period(), Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_async_acquire_shares_bucket() {
        let limit = RateLimit::new(2, Duration::from_secs(3600)).unwrap();
        assert!(limit.acquire());
        assert!(limit.acquire_async().await);
        assert!(!limit.acquire_async().await);
        assert!(!limit.acquire());
    }

    #[tokio::test]
    async fn test_wait_for_slot_async() {
        let limit = RateLimit::new(1, Duration::from_millis(20)).unwrap();
        limit.wait_for_slot_async().await;
        limit.wait_for_slot_async().await;
        assert_eq!(limit.available(), 0);
    }
}
