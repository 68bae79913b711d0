//! # Store Module
//!
//! Handles writes to the remote time-series store.
//!
//! This module handles:
//! - The [`PointStore`] seam the batch writer talks to
//! - An InfluxDB HTTP implementation using the v2-compatible write endpoint
//! - Classifying failures as transient or terminal

pub mod store_trait;

pub use store_trait::{PointStore, StoreError};

use async_trait::async_trait;
use reqwest::{header, Client};
use std::time::Duration;
use tracing::debug;

use crate::config::StoreConfig;
use crate::points::line_protocol::render_batch;
use crate::points::mapper::TimePoint;

/// InfluxDB store client
///
/// Holds one HTTP connection pool for the lifetime of a write session. The pool
/// is released when the store is dropped.
pub struct InfluxStore {
    client: Client,
    write_url: String,
    token: String,
}

impl std::fmt::Debug for InfluxStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InfluxStore")
            .field("write_url", &self.write_url)
            .finish_non_exhaustive()
    }
}

impl InfluxStore {
    /// Create a store client from configuration
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use sonde_ingest::config::Config;
    /// use sonde_ingest::store::InfluxStore;
    ///
    /// let config = Config::default();
    /// let store = InfluxStore::new(&config.store)?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn new(config: &StoreConfig) -> Result<Self, StoreError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| StoreError::Request(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            write_url: write_url(&config.host, &config.database),
            token: config.token.clone(),
        })
    }

    /// Endpoint batches are posted to
    pub fn write_url(&self) -> &str {
        &self.write_url
    }
}

/// Build the write endpoint for a database with second precision
fn write_url(host: &str, database: &str) -> String {
    format!(
        "{}/api/v2/write?bucket={}&precision=s",
        host.trim_end_matches('/'),
        urlencoding::encode(database)
    )
}

fn map_request_error(e: reqwest::Error) -> StoreError {
    if e.is_timeout() {
        StoreError::Timeout
    } else if e.is_connect() {
        StoreError::Connection(e.to_string())
    } else {
        StoreError::Request(e.to_string())
    }
}

#[async_trait]
impl PointStore for InfluxStore {
    async fn write_batch(&self, points: &[TimePoint]) -> Result<(), StoreError> {
        let body = render_batch(points);
        if body.is_empty() {
            debug!("Batch of {} points has nothing to write", points.len());
            return Ok(());
        }

        let mut request = self
            .client
            .post(&self.write_url)
            .header(header::CONTENT_TYPE, "text/plain; charset=utf-8");
        if !self.token.is_empty() {
            request = request.header(header::AUTHORIZATION, format!("Token {}", self.token));
        }

        let response = request.body(body).send().await.map_err(map_request_error)?;

        let status = response.status();
        if status.is_success() {
            debug!("Store accepted {} points ({})", points.len(), status);
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(StoreError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_config(host: &str) -> StoreConfig {
        StoreConfig {
            host: host.to_string(),
            database: "test".to_string(),
            token: "secret".to_string(),
            timeout_ms: 1000,
        }
    }

    #[test]
    fn test_write_url() {
        assert_eq!(
            write_url("http://localhost:8181", "test"),
            "http://localhost:8181/api/v2/write?bucket=test&precision=s"
        );
    }

    #[test]
    fn test_write_url_trailing_slash_and_escaping() {
        assert_eq!(
            write_url("http://db.local/", "ocean data"),
            "http://db.local/api/v2/write?bucket=ocean%20data&precision=s"
        );
    }

    #[test]
    fn test_write_url_escapes_query_delimiters() {
        assert_eq!(
            write_url("https://db.local", "a&b=c/d"),
            "https://db.local/api/v2/write?bucket=a%26b%3Dc%2Fd&precision=s"
        );
    }

    #[test]
    fn test_debug_hides_token() {
        let store = InfluxStore::new(&store_config("http://localhost:8181")).unwrap();
        let debug = format!("{:?}", store);
        assert!(!debug.contains("secret"));
        assert!(debug.contains("/api/v2/write"));
    }

    #[tokio::test]
    async fn test_empty_batch_skips_network() {
        // Nothing listens on port 1; an empty body must not touch it
        let store = InfluxStore::new(&store_config("http://127.0.0.1:1")).unwrap();
        assert!(store.write_batch(&[]).await.is_ok());
    }

    #[tokio::test]
    async fn test_unreachable_store_is_retryable() {
        let store = InfluxStore::new(&store_config("http://127.0.0.1:1")).unwrap();
        let batch = vec![TimePoint::new(1, 1000, "depth", 1.0)];

        let err = store.write_batch(&batch).await.unwrap_err();
        assert!(err.is_retryable(), "unexpected error: {:?}", err);
    }
}
