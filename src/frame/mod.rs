//! # Frame Module
//!
//! Binary telemetry frames produced by the ocean sensor.
//!
//! This module handles:
//! - Frame layout constants and the decoded [`protocol::SampleRecord`]
//! - Decoding one 1463-byte little-endian frame
//! - Encoding records back into frames
//! - Reading a frame from a file

pub mod protocol;
pub mod decoder;
pub mod encoder;
pub mod reader;
