//! # Line Protocol Rendering
//!
//! Renders [`TimePoint`]s as InfluxDB line protocol with second precision:
//!
//! ```text
//! sensor,sensor_id=7 depth=1.5,temperature=20,salinity=30 1000
//! ```

use std::fmt::Write;

use super::mapper::{TimePoint, SENSOR_ID_TAG};

/// Escape a measurement name, tag key or tag value
fn escape_key(raw: &str, out: &mut String) {
    for c in raw.chars() {
        if matches!(c, ',' | '=' | ' ') {
            out.push('\\');
        }
        out.push(c);
    }
}

/// Render one point as a single line, without trailing newline
///
/// Non-finite field values cannot be represented in line protocol and are
/// skipped. Returns `None` if no field is left to write.
pub fn render_point(point: &TimePoint) -> Option<String> {
    let mut line = String::with_capacity(64);

    escape_key(point.measurement, &mut line);
    line.push(',');
    escape_key(SENSOR_ID_TAG, &mut line);
    line.push('=');
    escape_key(&point.sensor_id, &mut line);

    let mut separator = ' ';
    for &(name, value) in point.fields() {
        if !value.is_finite() {
            continue;
        }
        line.push(separator);
        escape_key(name, &mut line);
        // Writing to a String cannot fail
        let _ = write!(line, "={}", value);
        separator = ',';
    }

    if separator == ' ' {
        return None;
    }

    let _ = write!(line, " {}", point.time);
    Some(line)
}

/// Render a batch of points, one line each
///
/// Points with no representable field are dropped from the body.
pub fn render_batch(points: &[TimePoint]) -> String {
    let mut body = String::with_capacity(points.len() * 48);

    for point in points {
        match render_point(point) {
            Some(line) => {
                body.push_str(&line);
                body.push('\n');
            }
            None => {
                tracing::debug!(
                    "Skipping point at {} for sensor {}: no finite fields",
                    point.time, point.sensor_id
                );
            }
        }
    }

    body
}
