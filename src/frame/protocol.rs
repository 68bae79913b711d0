//! # Frame Layout Constants and Types
//!
//! Fixed binary layout of one sensor telemetry frame, as written by the device firmware.
//!
//! ```text
//! offset  size  field
//! 0       2     sequence_id   u16 LE
//! 2       1     packet_num    u8
//! 3       2     total         u16 LE
//! 5       4     timestamp     u32 LE (seconds since epoch, first depth sample)
//! 9       2     sensor_id     u16 LE
//! 11      1440  depth         360 x f32 LE
//! 1451    4     temperature   1 x f32 LE
//! 1455    8     salinity      2 x f32 LE
//! ```

use chrono::{DateTime, Utc};

/// Number of depth sub-samples per frame
pub const DEPTH_SAMPLES: usize = 360;

/// Number of temperature readings per frame
pub const TEMPERATURE_SAMPLES: usize = 1;

/// Number of salinity readings per frame
pub const SALINITY_SAMPLES: usize = 2;

/// Header size: sequence_id(2) + packet_num(1) + total(2) + timestamp(4) + sensor_id(2)
pub const FRAME_HEADER_SIZE: usize = 11;

/// Total frame size in bytes
pub const FRAME_SIZE: usize =
    FRAME_HEADER_SIZE + (DEPTH_SAMPLES + TEMPERATURE_SAMPLES + SALINITY_SAMPLES) * 4;

/// Seconds between consecutive depth sub-samples
pub const SAMPLE_INTERVAL_S: u64 = 10;

/// Sub-sample index at which the second salinity reading was taken
pub const MID_SALINITY_INDEX: usize = 179;

/// Decoded contents of one telemetry frame
#[derive(Debug, Clone, PartialEq)]
pub struct SampleRecord {
    /// Frame sequence counter (not necessarily contiguous)
    pub sequence_id: u16,

    /// Fragment index (informational)
    pub packet_num: u8,

    /// Fragment count (informational)
    pub total: u16,

    /// Time of the first depth sample, seconds since epoch
    pub timestamp: u32,

    /// Originating sensor
    pub sensor_id: u16,

    /// Depth readings, one per sub-sample
    pub depth: [f32; DEPTH_SAMPLES],

    /// Temperature at sub-sample 0
    pub temperature: [f32; TEMPERATURE_SAMPLES],

    /// Salinity at sub-samples 0 and 179
    pub salinity: [f32; SALINITY_SAMPLES],
}

impl SampleRecord {
    /// Capture time of the first sub-sample as a UTC timestamp
    pub fn captured_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(i64::from(self.timestamp), 0)
    }
}
