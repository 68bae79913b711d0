//! # Frame Decoder
//!
//! Decodes one fixed-size telemetry frame into a [`SampleRecord`].

use bytes::Buf;

use super::protocol::*;
use crate::error::{IngestError, Result};

/// Decode a complete telemetry frame
///
/// This is the only place that knows the frame layout. All multi-byte values are
/// little-endian and floats are IEEE-754 single precision.
///
/// # Arguments
///
/// * `frame` - Raw frame bytes, exactly [`FRAME_SIZE`] long
///
/// # Returns
///
/// * `Result<SampleRecord>` - Decoded record, or error if the frame is malformed
///
/// # Errors
///
/// Returns `IngestError::Format` if:
/// - Frame length is not exactly `FRAME_SIZE` bytes
/// - Decoding does not consume the whole frame
///
/// # Examples
///
/// ```
/// use sonde_ingest::frame::decoder::decode_frame;
///
/// assert!(decode_frame(&[0u8; 1462]).is_err());
/// assert!(decode_frame(&[0u8; 1463]).is_ok());
/// ```
pub fn decode_frame(frame: &[u8]) -> Result<SampleRecord> {
    if frame.len() != FRAME_SIZE {
        return Err(IngestError::Format(
            format!("Frame must be exactly {} bytes, got {}", FRAME_SIZE, frame.len())
        ));
    }

    let mut buf = frame;

    let sequence_id = buf.get_u16_le();
    let packet_num = buf.get_u8();
    let total = buf.get_u16_le();
    let timestamp = buf.get_u32_le();
    let sensor_id = buf.get_u16_le();

    let mut depth = [0f32; DEPTH_SAMPLES];
    for value in depth.iter_mut() {
        *value = buf.get_f32_le();
    }

    let mut temperature = [0f32; TEMPERATURE_SAMPLES];
    for value in temperature.iter_mut() {
        *value = buf.get_f32_le();
    }

    let mut salinity = [0f32; SALINITY_SAMPLES];
    for value in salinity.iter_mut() {
        *value = buf.get_f32_le();
    }

    if buf.has_remaining() {
        return Err(IngestError::Format(
            format!("{} trailing bytes left after decoding frame", buf.remaining())
        ));
    }

    Ok(SampleRecord {
        sequence_id,
        packet_num,
        total,
        timestamp,
        sensor_id,
        depth,
        temperature,
        salinity,
    })
}
