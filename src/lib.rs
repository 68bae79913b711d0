//! # Sonde Ingest Library
//!
//! Decode ocean sensor telemetry frames and publish them to a time-series store.
//!
//! The pipeline is `frame` (decode one 1463-byte frame) -> `points` (expand it
//! into timestamped points) -> `writer` (batch and write them with retries) over
//! a `store`.

pub mod config;
pub mod error;
pub mod frame;
pub mod points;
pub mod store;
pub mod writer;
