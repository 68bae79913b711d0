//! # Points Module
//!
//! Time-series points derived from decoded frames.
//!
//! This module handles:
//! - Expanding one sample record into per-sub-sample points
//! - Rendering points as line protocol for the store

pub mod mapper;
pub mod line_protocol;
