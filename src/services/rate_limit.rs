// src/services/rate_limit.rs
// DOCUMENTATION: Per-caller throttling for public routes
// PURPOSE: Keep a single chat user from flooding lookups

use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::errors::PlacesError;

/// Tracked callers before the first sweep of idle buckets
pub const SWEEP_THRESHOLD: usize = 10_000;

/// Keyed token bucket, one bucket per caller id
///
/// DOCUMENTATION: Buckets that have refilled completely carry no state, so
/// once the key count reaches the sweep mark they are dropped with
/// `retain_recent`. The mark then moves to twice the surviving count.
pub struct ClientRateLimiter {
    limiter: DefaultKeyedRateLimiter<String>,
    sweep_threshold: usize,
    next_sweep: AtomicUsize,
}

impl ClientRateLimiter {
    /// `per_second` of zero is treated as one
    pub fn new(per_second: u32) -> Self {
        Self::with_sweep_threshold(per_second, SWEEP_THRESHOLD)
    }

    pub fn with_sweep_threshold(per_second: u32, sweep_threshold: usize) -> Self {
        let rate = NonZeroU32::new(per_second).unwrap_or(NonZeroU32::MIN);
        let sweep_threshold = sweep_threshold.max(1);
        Self {
            limiter: RateLimiter::keyed(Quota::per_second(rate)),
            sweep_threshold,
            next_sweep: AtomicUsize::new(sweep_threshold),
        }
    }

    /// Spend one request for `caller`
    pub fn check(&self, caller: &str) -> Result<(), PlacesError> {
        let outcome = self.limiter.check_key(&caller.to_string());
        self.sweep_if_due();

        outcome.map_err(|_| {
            log::warn!("Rate limit exceeded for caller {}", caller);
            PlacesError::RateLimitExceeded
        })
    }

    fn sweep_if_due(&self) {
        let tracked = self.limiter.len();
        if tracked < self.next_sweep.load(Ordering::Relaxed) {
            return;
        }

        self.limiter.retain_recent();
        self.limiter.shrink_to_fit();
        let remaining = self.limiter.len();
        self.next_sweep.store(
            self.sweep_threshold.max(remaining.saturating_mul(2)),
            Ordering::Relaxed,
        );
        log::debug!(
            "Rate limiter sweep: {} callers tracked, {} kept",
            tracked,
            remaining
        );
    }

    #[cfg(test)]
    fn tracked_callers(&self) -> usize {
        self.limiter.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_request_in_same_second_is_rejected() {
        let limiter = ClientRateLimiter::new(1);

        assert!(limiter.check("user-1").is_ok());
        assert!(matches!(
            limiter.check("user-1"),
            Err(PlacesError::RateLimitExceeded)
        ));
    }

    #[test]
    fn test_callers_have_separate_buckets() {
        let limiter = ClientRateLimiter::new(1);

        assert!(limiter.check("user-1").is_ok());
        assert!(limiter.check("user-2").is_ok());
        assert!(limiter.check("user-1").is_err());
    }

    #[test]
    fn test_burst_matches_rate() {
        let limiter = ClientRateLimiter::new(3);

        for _ in 0..3 {
            assert!(limiter.check("user-1").is_ok());
        }
        assert!(limiter.check("user-1").is_err());
    }

    #[test]
    fn test_zero_rate_still_allows_one() {
        let limiter = ClientRateLimiter::new(0);
        assert!(limiter.check("user-1").is_ok());
    }

    #[test]
    fn test_idle_callers_are_swept() {
        let limiter = ClientRateLimiter::with_sweep_threshold(1, 100);

        for i in 0..99 {
            assert!(limiter.check(&format!("user-{}", i)).is_ok());
        }
        assert_eq!(limiter.tracked_callers(), 99);

        // every bucket refills within a second
        std::thread::sleep(std::time::Duration::from_millis(1100));
        assert!(limiter.check("late-user").is_ok());

        assert_eq!(limiter.tracked_callers(), 1);
    }

    #[test]
    fn test_sweep_keeps_active_buckets() {
        let limiter = ClientRateLimiter::with_sweep_threshold(1, 2);

        assert!(limiter.check("user-1").is_ok());
        assert!(limiter.check("user-2").is_ok());
        // sweep ran on the second key, user-1 is still throttled
        assert!(limiter.check("user-1").is_err());
    }
}
