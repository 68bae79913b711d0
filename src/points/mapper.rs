//! # Point Mapper
//!
//! Expands one [`SampleRecord`] into the time-series points written to the store.
//!
//! Every depth sub-sample becomes one point, timestamped `timestamp + 10 * i`.
//! The temperature and first salinity reading ride along on sub-sample 0. The
//! second salinity reading is emitted as its own point at sub-sample 179,
//! sharing that sub-sample's timestamp and tag with the depth point.

use serde::Serialize;

use crate::frame::protocol::*;

/// Measurement name for all sensor points
pub const MEASUREMENT: &str = "sensor";

/// Tag key identifying the series
pub const SENSOR_ID_TAG: &str = "sensor_id";

/// Field names
pub const FIELD_DEPTH: &str = "depth";
pub const FIELD_TEMPERATURE: &str = "temperature";
pub const FIELD_SALINITY: &str = "salinity";

/// One time-series point
///
/// A point always carries at least one field: the constructor takes the first one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimePoint {
    /// Measurement name
    pub measurement: &'static str,

    /// `sensor_id` tag value
    pub sensor_id: String,

    /// Field name/value pairs in insertion order
    fields: Vec<(&'static str, f32)>,

    /// Seconds since epoch
    pub time: u64,
}

impl TimePoint {
    /// Create a point with its first field
    pub fn new(sensor_id: u16, time: u64, name: &'static str, value: f32) -> Self {
        Self {
            measurement: MEASUREMENT,
            sensor_id: sensor_id.to_string(),
            fields: vec![(name, value)],
            time,
        }
    }

    /// Add a field to the point
    pub fn with_field(mut self, name: &'static str, value: f32) -> Self {
        self.fields.push((name, value));
        self
    }

    /// Field name/value pairs, never empty
    pub fn fields(&self) -> &[(&'static str, f32)] {
        &self.fields
    }

    /// Look up a field value by name
    pub fn field(&self, name: &str) -> Option<f32> {
        self.fields
            .iter()
            .find(|(field, _)| *field == name)
            .map(|&(_, value)| value)
    }
}

/// Expand a sample record into time-series points
///
/// # Arguments
///
/// * `record` - Decoded frame
///
/// # Returns
///
/// * `Vec<TimePoint>` - Points ordered by sub-sample index; one per depth reading
///   plus the separate mid-frame salinity point
///
/// # Examples
///
/// ```
/// use sonde_ingest::frame::decoder::decode_frame;
/// use sonde_ingest::points::mapper::map_to_points;
///
/// let record = decode_frame(&[0u8; 1463])?;
/// let points = map_to_points(&record);
/// assert_eq!(points.iter().filter(|p| p.field("depth").is_some()).count(), 360);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn map_to_points(record: &SampleRecord) -> Vec<TimePoint> {
    let mut points = Vec::with_capacity(DEPTH_SAMPLES + 1);
    let base = u64::from(record.timestamp);

    for (i, &depth) in record.depth.iter().enumerate() {
        let time = base + SAMPLE_INTERVAL_S * i as u64;
        let mut point = TimePoint::new(record.sensor_id, time, FIELD_DEPTH, depth);

        if i == 0 {
            point = point
                .with_field(FIELD_TEMPERATURE, record.temperature[0])
                .with_field(FIELD_SALINITY, record.salinity[0]);
        }

        points.push(point);

        // Kept as a separate point rather than merged into the depth point
        if i == MID_SALINITY_INDEX {
            points.push(TimePoint::new(record.sensor_id, time, FIELD_SALINITY, record.salinity[1]));
        }
    }

    points
}
