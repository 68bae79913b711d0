//! Reading frames from files.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use bytes::Bytes;
use tracing::debug;

use super::protocol::FRAME_SIZE;

/// Read one raw frame from a file
///
/// Reads at most one byte past [`FRAME_SIZE`] so that oversized files are
/// detected without loading them completely. Length is not checked here;
/// [`decode_frame`](super::decoder::decode_frame) rejects anything that is not
/// exactly one frame.
///
/// # Errors
///
/// Returns `IngestError::Io` if the file cannot be opened or read
pub fn read_frame<P: AsRef<Path>>(path: P) -> crate::error::Result<Bytes> {
    let path = path.as_ref();
    let file = File::open(path)?;

    let mut data = Vec::with_capacity(FRAME_SIZE + 1);
    file.take(FRAME_SIZE as u64 + 1).read_to_end(&mut data)?;

    debug!("Read {} bytes from {}", data.len(), path.display());
    Ok(Bytes::from(data))
}
