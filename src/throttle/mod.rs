// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Soft rate limiting for the remote rendering service.
//!
//! The limiter guarantees that no two throttled operations against the
//! same instance *begin* less than the configured interval apart. Callers
//! queue rather than being rejected: each caller reserves the next free
//! start slot under an async mutex, then sleeps outside the critical
//! section until its slot arrives. This is in-process backpressure for a
//! service with unspecified quota, not distributed rate limiting.

use std::future::Future;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

/// Spaces out the start times of wrapped operations.
pub struct RateLimiter {
    interval: Duration,
    next_slot: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_slot: Mutex::new(None),
        }
    }

    pub fn from_millis(interval_ms: u64) -> Self {
        Self::new(Duration::from_millis(interval_ms))
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run `op`, delaying its start until this instance's next free slot.
    ///
    /// Slots are handed out in lock-acquisition order, so a burst of
    /// callers executes one per interval with no starvation.
    pub async fn throttle<F, T>(&self, op: F) -> T
    where
        F: Future<Output = T>,
    {
        let wait = self.reserve_slot().await;
        if !wait.is_zero() {
            tokio::time::sleep(wait).await;
        }
        op.await
    }

    /// Reserve the next start slot and return how long the caller must
    /// wait before it may begin. The lock is held only for the
    /// reservation, never across the sleep or the operation itself.
    async fn reserve_slot(&self) -> Duration {
        let mut next_slot = self.next_slot.lock().await;
        let now = Instant::now();
        let start = match *next_slot {
            Some(at) if at > now => at,
            _ => now,
        };
        *next_slot = Some(start + self.interval);
        start.saturating_duration_since(now)
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("interval", &self.interval)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn consecutive_operations_are_spaced_by_interval() {
        let interval = Duration::from_millis(40);
        let limiter = RateLimiter::new(interval);
        let calls = 3u32;

        let started = Instant::now();
        for _ in 0..calls {
            limiter.throttle(async {}).await;
        }
        let elapsed = started.elapsed();

        // N calls need at least (N-1) full intervals between starts.
        assert!(
            elapsed >= interval * (calls - 1),
            "elapsed {:?} for {} calls at {:?}",
            elapsed,
            calls,
            interval
        );
    }

    #[tokio::test]
    async fn concurrent_callers_queue_rather_than_overlap() {
        let interval = Duration::from_millis(30);
        let limiter = Arc::new(RateLimiter::new(interval));

        let started = Instant::now();
        let mut handles = Vec::new();
        for _ in 0..3 {
            let limiter = Arc::clone(&limiter);
            handles.push(tokio::spawn(async move {
                limiter.throttle(async { Instant::now() }).await
            }));
        }
        let mut starts = Vec::new();
        for handle in handles {
            starts.push(handle.await.expect("task panicked"));
        }
        starts.sort();

        for pair in starts.windows(2) {
            let gap = pair[1].saturating_duration_since(pair[0]);
            // Allow a small scheduling tolerance below the interval.
            assert!(
                gap >= interval.mul_f64(0.9),
                "operations began {:?} apart",
                gap
            );
        }
        assert!(started.elapsed() >= interval * 2);
    }

    #[tokio::test]
    async fn returns_the_operation_result() {
        let limiter = RateLimiter::from_millis(1);
        let value = limiter.throttle(async { 41 + 1 }).await;
        assert_eq!(value, 42);
    }

    #[tokio::test]
    async fn zero_interval_is_a_passthrough() {
        let limiter = RateLimiter::from_millis(0);
        let started = Instant::now();
        for _ in 0..5 {
            limiter.throttle(async {}).await;
        }
        assert!(started.elapsed() < Duration::from_millis(50));
    }
}
