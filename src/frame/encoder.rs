//! # Frame Encoder
//!
//! Inverse of the frame decoder. Used to build synthetic frames for
//! replay and testing.

use bytes::{BufMut, BytesMut};

use super::protocol::*;

/// Encode a sample record into a complete telemetry frame
///
/// # Arguments
///
/// * `record` - Record to encode
///
/// # Returns
///
/// * `Vec<u8>` - Frame bytes, always [`FRAME_SIZE`] long
///
/// # Examples
///
/// ```
/// use sonde_ingest::frame::encoder::encode_sample_record;
/// use sonde_ingest::frame::protocol::*;
///
/// let record = SampleRecord {
///     sequence_id: 1,
///     packet_num: 0,
///     total: 1,
///     timestamp: 1000,
///     sensor_id: 7,
///     depth: [0.0; DEPTH_SAMPLES],
///     temperature: [20.0],
///     salinity: [30.0, 31.0],
/// };
/// assert_eq!(encode_sample_record(&record).len(), FRAME_SIZE);
/// ```
pub fn encode_sample_record(record: &SampleRecord) -> Vec<u8> {
    let mut frame = BytesMut::with_capacity(FRAME_SIZE);

    frame.put_u16_le(record.sequence_id);
    frame.put_u8(record.packet_num);
    frame.put_u16_le(record.total);
    frame.put_u32_le(record.timestamp);
    frame.put_u16_le(record.sensor_id);

    for &value in record
        .depth
        .iter()
        .chain(record.temperature.iter())
        .chain(record.salinity.iter())
    {
        frame.put_f32_le(value);
    }

    debug_assert_eq!(frame.len(), FRAME_SIZE);
    frame.to_vec()
}
