//! # Write Options
//!
//! Batching and retry tuning for the batch writer. Passed in at construction
//! and never changed afterwards.

use serde::de::Error;
use serde::Deserialize;
use std::time::Duration;

use crate::error::{IngestError, Result};

/// Batch writer tuning
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct WriteOptions {
    /// Points per network write
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Longest a partial batch waits before it is flushed
    #[serde(default = "default_flush_interval_ms")]
    pub flush_interval_ms: u64,

    /// Upper bound of the random delay added to each flush
    #[serde(default = "default_jitter_interval_ms")]
    pub jitter_interval_ms: u64,

    /// Delay before the first retry
    #[serde(default = "default_retry_interval_ms")]
    pub retry_interval_ms: u64,

    /// Write attempts per batch before it is given up
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Ceiling for the backoff delay
    #[serde(default = "default_max_retry_delay_ms")]
    pub max_retry_delay_ms: u64,

    /// Backoff multiplier per retry
    #[serde(default = "default_exponential_base")]
    pub exponential_base: u64,
}

// Default value functions
fn default_batch_size() -> usize { 500 }
fn default_flush_interval_ms() -> u64 { 10_000 }
fn default_jitter_interval_ms() -> u64 { 2_000 }
fn default_retry_interval_ms() -> u64 { 5_000 }
fn default_max_retries() -> u32 { 5 }
fn default_max_retry_delay_ms() -> u64 { 30_000 }
fn default_exponential_base() -> u64 { 2 }

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            flush_interval_ms: default_flush_interval_ms(),
            jitter_interval_ms: default_jitter_interval_ms(),
            retry_interval_ms: default_retry_interval_ms(),
            max_retries: default_max_retries(),
            max_retry_delay_ms: default_max_retry_delay_ms(),
            exponential_base: default_exponential_base(),
        }
    }
}

impl WriteOptions {
    /// Flush interval as a duration
    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }

    /// Validate option values
    ///
    /// # Errors
    ///
    /// Returns error if any value would stall or disable the writer
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(IngestError::Config(
                toml::de::Error::custom("batch_size must be greater than 0")
            ));
        }

        if self.flush_interval_ms == 0 {
            return Err(IngestError::Config(
                toml::de::Error::custom("flush_interval_ms must be greater than 0")
            ));
        }

        if self.max_retries == 0 {
            return Err(IngestError::Config(
                toml::de::Error::custom("max_retries must be greater than 0")
            ));
        }

        if self.retry_interval_ms == 0 {
            return Err(IngestError::Config(
                toml::de::Error::custom("retry_interval_ms must be greater than 0")
            ));
        }

        if self.max_retry_delay_ms < self.retry_interval_ms {
            return Err(IngestError::Config(
                toml::de::Error::custom("max_retry_delay_ms must not be less than retry_interval_ms")
            ));
        }

        if self.exponential_base == 0 {
            return Err(IngestError::Config(
                toml::de::Error::custom("exponential_base must be at least 1")
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = WriteOptions::default();
        assert_eq!(options.batch_size, 500);
        assert_eq!(options.flush_interval_ms, 10_000);
        assert_eq!(options.jitter_interval_ms, 2_000);
        assert_eq!(options.retry_interval_ms, 5_000);
        assert_eq!(options.max_retries, 5);
        assert_eq!(options.max_retry_delay_ms, 30_000);
        assert_eq!(options.exponential_base, 2);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let options: WriteOptions = toml::from_str("batch_size = 50").unwrap();
        assert_eq!(options.batch_size, 50);
        assert_eq!(options.max_retries, 5);
    }

    #[test]
    fn test_batch_size_zero() {
        let options = WriteOptions { batch_size: 0, ..Default::default() };
        assert!(options.validate().is_err());
    }

    #[test]
    fn test_flush_interval_zero() {
        let options = WriteOptions { flush_interval_ms: 0, ..Default::default() };
        assert!(options.validate().is_err());
    }

    #[test]
    fn test_max_retries_zero() {
        let options = WriteOptions { max_retries: 0, ..Default::default() };
        assert!(options.validate().is_err());
    }

    #[test]
    fn test_retry_interval_zero() {
        let options = WriteOptions { retry_interval_ms: 0, ..Default::default() };
        assert!(options.validate().is_err());
    }

    #[test]
    fn test_max_delay_below_interval() {
        let options = WriteOptions {
            retry_interval_ms: 5_000,
            max_retry_delay_ms: 1_000,
            ..Default::default()
        };
        assert!(options.validate().is_err());
    }

    #[test]
    fn test_exponential_base_zero() {
        let options = WriteOptions { exponential_base: 0, ..Default::default() };
        assert!(options.validate().is_err());
    }

    #[test]
    fn test_zero_jitter_is_valid() {
        let options = WriteOptions { jitter_interval_ms: 0, ..Default::default() };
        assert!(options.validate().is_ok());
    }
}
