//! Trait abstraction for the remote time-series store to enable testing

use async_trait::async_trait;
use thiserror::Error;

use crate::points::mapper::TimePoint;

/// Failure of one batch write
#[derive(Debug, Error)]
pub enum StoreError {
    /// Connection could not be established or was lost
    #[error("Store unreachable: {0}")]
    Connection(String),

    /// Request exceeded the configured timeout
    #[error("Store request timed out")]
    Timeout,

    /// Store answered with a non-success status
    #[error("Store rejected batch with HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// Any other client-side failure
    #[error("Store request failed: {0}")]
    Request(String),
}

impl StoreError {
    /// Whether a retry of the same batch may succeed
    ///
    /// Transport failures, timeouts, throttling (429) and server errors (5xx) are
    /// transient. Other statuses mean the store rejected the content itself.
    pub fn is_retryable(&self) -> bool {
        match self {
            StoreError::Connection(_) | StoreError::Timeout | StoreError::Request(_) => true,
            StoreError::Status { status, .. } => *status == 429 || *status >= 500,
        }
    }
}

/// Remote store that accepts batches of points
#[async_trait]
pub trait PointStore: Send + Sync {
    /// Write one batch; the whole batch either succeeds or fails
    async fn write_batch(&self, points: &[TimePoint]) -> Result<(), StoreError>;
}

#[cfg(test)]
pub mod mocks {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Mock store for testing
    ///
    /// Fails the first `fail_first` writes with `error_status`, then accepts everything.
    #[derive(Clone)]
    pub struct MockStore {
        pub written: Arc<Mutex<Vec<Vec<TimePoint>>>>,
        pub attempts: Arc<Mutex<usize>>,
        pub fail_first: Arc<Mutex<usize>>,
        pub error_status: Arc<Mutex<u16>>,
    }

    impl MockStore {
        pub fn new() -> Self {
            Self {
                written: Arc::new(Mutex::new(Vec::new())),
                attempts: Arc::new(Mutex::new(0)),
                fail_first: Arc::new(Mutex::new(0)),
                error_status: Arc::new(Mutex::new(503)),
            }
        }

        pub fn failing(times: usize) -> Self {
            let store = Self::new();
            *store.fail_first.lock().unwrap() = times;
            store
        }

        pub fn always_failing() -> Self {
            Self::failing(usize::MAX)
        }

        pub fn set_error_status(&self, status: u16) {
            *self.error_status.lock().unwrap() = status;
        }

        pub fn get_written(&self) -> Vec<Vec<TimePoint>> {
            self.written.lock().unwrap().clone()
        }

        pub fn get_attempts(&self) -> usize {
            *self.attempts.lock().unwrap()
        }
    }

    #[async_trait]
    impl PointStore for MockStore {
        async fn write_batch(&self, points: &[TimePoint]) -> Result<(), StoreError> {
            *self.attempts.lock().unwrap() += 1;

            {
                let mut fail_first = self.fail_first.lock().unwrap();
                if *fail_first > 0 {
                    *fail_first -= 1;
                    return Err(StoreError::Status {
                        status: *self.error_status.lock().unwrap(),
                        body: "Mock write error".to_string(),
                    });
                }
            }

            self.written.lock().unwrap().push(points.to_vec());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(StoreError::Timeout.is_retryable());
        assert!(StoreError::Connection("refused".into()).is_retryable());
        assert!(StoreError::Status { status: 503, body: String::new() }.is_retryable());
        assert!(StoreError::Status { status: 429, body: String::new() }.is_retryable());
        assert!(!StoreError::Status { status: 400, body: String::new() }.is_retryable());
        assert!(!StoreError::Status { status: 401, body: String::new() }.is_retryable());
    }

    #[tokio::test]
    async fn test_mock_store_fails_then_succeeds() {
        let store = mocks::MockStore::failing(1);
        let batch = vec![TimePoint::new(1, 0, "depth", 1.0)];

        assert!(store.write_batch(&batch).await.is_err());
        assert!(store.write_batch(&batch).await.is_ok());
        assert_eq!(store.get_attempts(), 2);
        assert_eq!(store.get_written(), vec![batch]);
    }
}
