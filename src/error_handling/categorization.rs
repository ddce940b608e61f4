//! Retry strategy for transient sink failures.

use std::time::Duration;
use tokio_retry::strategy::{jitter, ExponentialBackoff};

use crate::config::{RETRY_FACTOR, RETRY_INITIAL_DELAY_MS, RETRY_MAX_DELAY_MS};

/// Creates an exponential backoff retry strategy for single-row inserts.
///
/// Delays start at `RETRY_INITIAL_DELAY_MS`, grow by `RETRY_FACTOR`, are capped
/// at `RETRY_MAX_DELAY_MS` and jittered. The iterator yields at most `attempts`
/// delays, so `attempts = 0` means the write is tried exactly once.
pub fn get_retry_strategy(attempts: usize) -> impl Iterator<Item = Duration> {
    ExponentialBackoff::from_millis(RETRY_INITIAL_DELAY_MS)
        .factor(RETRY_FACTOR)
        .max_delay(Duration::from_millis(RETRY_MAX_DELAY_MS))
        .map(jitter)
        .take(attempts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_strategy_respects_attempts() {
        assert_eq!(get_retry_strategy(0).count(), 0);
        assert_eq!(get_retry_strategy(3).count(), 3);
    }

    #[test]
    fn test_retry_strategy_delays_are_capped() {
        for delay in get_retry_strategy(10) {
            assert!(delay <= Duration::from_millis(RETRY_MAX_DELAY_MS));
        }
    }
}
