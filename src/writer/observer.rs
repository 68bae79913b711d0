//! # Write Observer
//!
//! Notifications emitted by the batch writer. Observers are for logging and
//! metrics only; nothing they do can change a batch's outcome.

use std::time::Duration;
use tracing::{info, warn};

/// A batch was accepted by the store
#[derive(Debug, Clone, PartialEq)]
pub struct BatchSuccess {
    pub batch_id: u64,
    pub points: usize,
    pub attempts: u32,
}

/// One write attempt of a batch failed
#[derive(Debug, Clone, PartialEq)]
pub struct BatchFailure {
    pub batch_id: u64,
    pub points: usize,
    pub attempt: u32,
    pub error: String,
    /// False when this was the batch's last attempt
    pub will_retry: bool,
}

/// A batch is about to be retried after `delay`
#[derive(Debug, Clone, PartialEq)]
pub struct BatchRetry {
    pub batch_id: u64,
    pub points: usize,
    /// 1-based retry number
    pub retry: u32,
    pub delay: Duration,
    pub error: String,
}

/// Receiver of batch writer events
#[cfg_attr(test, mockall::automock)]
pub trait WriteObserver: Send + Sync {
    fn on_success(&self, event: &BatchSuccess);

    fn on_error(&self, event: &BatchFailure);

    fn on_retry(&self, event: &BatchRetry);
}

/// Observer that forwards events to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingObserver;

impl WriteObserver for LoggingObserver {
    fn on_success(&self, event: &BatchSuccess) {
        info!(
            "Successfully wrote batch {} ({} points, {} attempt(s))",
            event.batch_id, event.points, event.attempts
        );
    }

    fn on_error(&self, event: &BatchFailure) {
        warn!(
            "Failed writing batch {} ({} points) on attempt {}: {}",
            event.batch_id, event.points, event.attempt, event.error
        );
    }

    fn on_retry(&self, event: &BatchRetry) {
        warn!(
            "Retrying batch {} (retry {}) in {:?} after: {}",
            event.batch_id, event.retry, event.delay, event.error
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logging_observer_accepts_all_events() {
        let observer = LoggingObserver;
        observer.on_success(&BatchSuccess { batch_id: 1, points: 10, attempts: 1 });
        observer.on_error(&BatchFailure {
            batch_id: 1,
            points: 10,
            attempt: 1,
            error: "timeout".to_string(),
            will_retry: true,
        });
        observer.on_retry(&BatchRetry {
            batch_id: 1,
            points: 10,
            retry: 1,
            delay: Duration::from_secs(5),
            error: "timeout".to_string(),
        });
    }

    #[test]
    fn test_mock_observer_expectations() {
        let mut observer = MockWriteObserver::new();
        observer
            .expect_on_success()
            .withf(|event| event.points == 3)
            .times(1)
            .return_const(());

        observer.on_success(&BatchSuccess { batch_id: 9, points: 3, attempts: 2 });
    }
}
