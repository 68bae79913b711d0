//! Retry backoff and flush jitter.

use std::time::Duration;

use super::options::WriteOptions;

/// Delay before retry number `retry` (1-based)
///
/// `min(max_retry_delay, retry_interval * exponential_base^(retry - 1))`,
/// saturating instead of overflowing for large retry counts.
pub fn retry_delay(options: &WriteOptions, retry: u32) -> Duration {
    let factor = options
        .exponential_base
        .saturating_pow(retry.saturating_sub(1));
    let delay_ms = options
        .retry_interval_ms
        .saturating_mul(factor)
        .min(options.max_retry_delay_ms);

    Duration::from_millis(delay_ms)
}

/// Random delay in `[0, jitter_interval]`
pub fn jitter(options: &WriteOptions) -> Duration {
    Duration::from_millis(fastrand::u64(0..=options.jitter_interval_ms))
}

/// Time until the next timed flush: flush interval plus jitter
pub fn flush_delay(options: &WriteOptions) -> Duration {
    options.flush_interval() + jitter(options)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_backoff_sequence() {
        let options = WriteOptions::default();
        let delays: Vec<u64> = (1..=6)
            .map(|retry| retry_delay(&options, retry).as_millis() as u64)
            .collect();

        assert_eq!(delays, vec![5_000, 10_000, 20_000, 30_000, 30_000, 30_000]);
    }

    #[test]
    fn test_backoff_non_decreasing_and_bounded() {
        let options = WriteOptions {
            retry_interval_ms: 300,
            max_retry_delay_ms: 7_000,
            exponential_base: 3,
            ..Default::default()
        };

        let mut previous = Duration::ZERO;
        for retry in 1..40 {
            let delay = retry_delay(&options, retry);
            assert!(delay >= previous);
            assert!(delay <= Duration::from_millis(7_000));
            previous = delay;
        }
    }

    #[test]
    fn test_backoff_base_one_is_constant() {
        let options = WriteOptions { exponential_base: 1, ..Default::default() };
        assert_eq!(retry_delay(&options, 1), retry_delay(&options, 10));
    }

    #[test]
    fn test_backoff_saturates() {
        let options = WriteOptions {
            max_retry_delay_ms: u64::MAX,
            ..Default::default()
        };
        assert_eq!(retry_delay(&options, u32::MAX), Duration::from_millis(u64::MAX));
    }

    #[test]
    fn test_jitter_within_bounds() {
        let options = WriteOptions { jitter_interval_ms: 50, ..Default::default() };
        for _ in 0..200 {
            assert!(jitter(&options) <= Duration::from_millis(50));
        }
    }

    #[test]
    fn test_zero_jitter() {
        let options = WriteOptions { jitter_interval_ms: 0, ..Default::default() };
        assert_eq!(jitter(&options), Duration::ZERO);
        assert_eq!(flush_delay(&options), Duration::from_millis(10_000));
    }

    #[test]
    fn test_flush_delay_range() {
        let options = WriteOptions::default();
        for _ in 0..100 {
            let delay = flush_delay(&options);
            assert!(delay >= Duration::from_millis(10_000));
            assert!(delay <= Duration::from_millis(12_000));
        }
    }
}
