//! Flattens a scheduled packet stream to bytes and writes a `.cdg` file.
//!
//! Mirrors the teacher's `PixelFormat`/`Rectangle` `write_to(&mut BytesMut)`
//! convention in `protocol.rs`: each value knows how to serialize itself,
//! and this module just drives the loop and the actual file I/O.

use crate::error::Result;
use crate::packet::{Packet, PACKET_LEN};
use bytes::{BufMut, BytesMut};
use std::io::Write;
use std::path::Path;

/// Serializes `packets` to a single byte buffer, one [`PACKET_LEN`]-byte
/// frame per pack.
#[must_use]
pub fn to_bytes(packets: &[Packet]) -> Vec<u8> {
    let mut buf = BytesMut::with_capacity(packets.len() * PACKET_LEN);
    for packet in packets {
        buf.put_slice(&packet.to_bytes());
    }
    buf.to_vec()
}

/// Writes `packets` to `path` as a raw `.cdg` stream.
///
/// # Errors
///
/// Returns [`crate::error::CdgError::Io`] if the file cannot be created or
/// written.
pub fn write_file(path: &Path, packets: &[Packet]) -> Result<()> {
    let bytes = to_bytes(packets);
    let mut file = std::fs::File::create(path)?;
    file.write_all(&bytes)?;
    Ok(())
}
