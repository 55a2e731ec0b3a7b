use crate::{Error, Result};
use core::time::Duration;

/// Default number of upload workers.
pub const DEFAULT_CONCURRENCY: usize = 5;

/// Maximum size of a single chunk, in bytes.
pub const MAX_CHUNK_SIZE: usize = 100_000;

/// Interval between pool liveness log lines.
pub const DEFAULT_POOL_TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Capacity of the queue between submission tasks and workers.
///
/// With a capacity of 1, a submission completes roughly when a worker is
/// about to pick the chunk up, so queued chunks never pile up inside the pool.
/// Backlog shows up as pending submission tasks instead.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1;

/// How a worker retries a failed upload.
///
/// Every attempt uploads the same [`Chunk`](crate::Chunk) with the same
/// order. The delay before attempt `n + 1` is `initial_backoff * 2^(n - 1)`,
/// capped at `max_backoff`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per chunk, including the first one. Must be at least 1.
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl RetryPolicy {
    /// A single attempt: failures are reported immediately.
    pub const fn none() -> Self {
        Self {
            max_attempts: 1,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
        }
    }

    pub const fn exponential(max_attempts: u32, initial_backoff: Duration) -> Self {
        Self {
            max_attempts,
            initial_backoff,
            max_backoff: Duration::from_secs(30),
        }
    }

    #[must_use]
    pub const fn with_max_backoff(mut self, max_backoff: Duration) -> Self {
        self.max_backoff = max_backoff;
        self
    }

    /// Delay to wait after failed attempt number `attempt` (1-based).
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.initial_backoff
            .saturating_mul(1_u32 << exponent)
            .min(self.max_backoff)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::none()
    }
}

/// Tunables for a [`Streamer`](crate::Streamer) and its worker pool.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StreamerConfig {
    /// Number of workers uploading chunks concurrently.
    pub concurrency: usize,
    /// Upper bound on the size of every chunk.
    pub max_chunk_size: usize,
    /// Period of the pool's liveness log line.
    pub pool_tick_interval: Duration,
    /// Capacity of the bounded queue feeding the workers.
    pub queue_capacity: usize,
    pub retry: RetryPolicy,
    /// Upper bound on how long `stop` may wait for the drain. `None` waits
    /// until every submitted chunk has been handled.
    pub drain_timeout: Option<Duration>,
}

impl Default for StreamerConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            max_chunk_size: MAX_CHUNK_SIZE,
            pool_tick_interval: DEFAULT_POOL_TICK_INTERVAL,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            retry: RetryPolicy::none(),
            drain_timeout: None,
        }
    }
}

impl StreamerConfig {
    #[must_use]
    pub const fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    #[must_use]
    pub const fn with_max_chunk_size(mut self, max_chunk_size: usize) -> Self {
        self.max_chunk_size = max_chunk_size;
        self
    }

    #[must_use]
    pub const fn with_pool_tick_interval(mut self, interval: Duration) -> Self {
        self.pool_tick_interval = interval;
        self
    }

    #[must_use]
    pub const fn with_queue_capacity(mut self, queue_capacity: usize) -> Self {
        self.queue_capacity = queue_capacity;
        self
    }

    #[must_use]
    pub const fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    #[must_use]
    pub const fn with_drain_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.drain_timeout = timeout;
        self
    }

    /// Checks that every value can be used to build a worker pool.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if any count, size or interval is
    /// zero.
    pub fn validate(&self) -> Result<()> {
        let reason = if self.concurrency == 0 {
            "concurrency must be greater than 0"
        } else if self.max_chunk_size == 0 {
            "max_chunk_size must be greater than 0"
        } else if self.queue_capacity == 0 {
            "queue_capacity must be greater than 0"
        } else if self.retry.max_attempts == 0 {
            "retry.max_attempts must be at least 1"
        } else if self.pool_tick_interval.is_zero() {
            "pool_tick_interval must be non-zero"
        } else {
            return Ok(());
        };

        Err(Error::InvalidConfig {
            reason: reason.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = StreamerConfig::default();
        assert_eq!(config.concurrency, 5);
        assert_eq!(config.max_chunk_size, 100_000);
        assert_eq!(config.pool_tick_interval, Duration::from_secs(1));
        assert_eq!(config.retry, RetryPolicy::none());
        assert_eq!(config.drain_timeout, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_zero_values() {
        let cases = [
            StreamerConfig::default().with_concurrency(0),
            StreamerConfig::default().with_max_chunk_size(0),
            StreamerConfig::default().with_queue_capacity(0),
            StreamerConfig::default().with_pool_tick_interval(Duration::ZERO),
            StreamerConfig::default().with_retry(RetryPolicy::exponential(0, Duration::ZERO)),
        ];

        for config in cases {
            assert!(
                matches!(config.validate(), Err(Error::InvalidConfig { .. })),
                "{config:?} should be rejected"
            );
        }
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let retry = RetryPolicy::exponential(5, Duration::from_millis(100))
            .with_max_backoff(Duration::from_millis(350));
        assert_eq!(retry.backoff_for(1), Duration::from_millis(100));
        assert_eq!(retry.backoff_for(2), Duration::from_millis(200));
        assert_eq!(retry.backoff_for(3), Duration::from_millis(350));
        assert_eq!(retry.backoff_for(40), Duration::from_millis(350));
    }

    #[test]
    fn no_retry_has_no_backoff() {
        assert_eq!(RetryPolicy::none().backoff_for(1), Duration::ZERO);
    }
}
