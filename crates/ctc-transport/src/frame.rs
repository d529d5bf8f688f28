//! Length-prefixed frame I/O.
//!
//! A frame is a 4-byte big-endian unsigned length followed by that many
//! payload bytes.  Reads loop until the full payload has arrived — a TCP
//! segment boundary in the middle of a frame is normal, not an error.

use std::io::{Read, Write};

use crate::error::{TransportError, TransportResult};

/// Upper bound on a single frame.  A real census tops out in the tens of
/// kilobytes; anything near this limit is a corrupt length prefix.
pub const MAX_FRAME_BYTES: usize = 16 * 1024 * 1024;

/// Read one complete frame.
pub fn read_frame<R: Read>(reader: &mut R) -> TransportResult<Vec<u8>> {
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf)?;
    let len = u32::from_be_bytes(len_buf) as usize;
    if len > MAX_FRAME_BYTES {
        return Err(TransportError::FrameTooLarge(len));
    }

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload)?;
    Ok(payload)
}

/// Write one complete frame.
pub fn write_frame<W: Write>(writer: &mut W, payload: &[u8]) -> TransportResult<()> {
    if payload.len() > MAX_FRAME_BYTES {
        return Err(TransportError::FrameTooLarge(payload.len()));
    }
    writer.write_all(&(payload.len() as u32).to_be_bytes())?;
    writer.write_all(payload)?;
    writer.flush()?;
    Ok(())
}
