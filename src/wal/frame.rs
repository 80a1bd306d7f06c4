//! Frame Codec
//!
//! Turns one LogEntry into a self-describing, checksummed frame and back.
//! Stateless; the Log File and the flush pipeline call into it.
//!
//! ```text
//! offset 0: length   (u32 BE)  payload byte count, never 0
//! offset 4: checksum (u32 BE)  CRC32 of the payload
//! offset 8: payload  (length bytes, bincode of {kind: u8, key, value})
//! ```

use bytes::{BufMut, BytesMut};
use serde::{Deserialize, Serialize};

use super::entry::{EntryKind, LogEntry};
use crate::error::{Result, UniverseError};

/// Size of the length field
pub const LENGTH_SIZE: usize = 4;

/// Size of the checksum field
pub const CHECKSUM_SIZE: usize = 4;

/// Fixed header in front of every payload
pub const HEADER_SIZE: usize = LENGTH_SIZE + CHECKSUM_SIZE;

/// Largest payload the length field can describe
pub const MAX_PAYLOAD_SIZE: u64 = u32::MAX as u64;

/// Kind byte plus the two u64 length prefixes bincode writes for key and value
const PAYLOAD_OVERHEAD: u64 = 1 + 8 + 8;

/// Payload size of an entry with the given key and value lengths
pub fn payload_size(key_len: usize, value_len: usize) -> u64 {
    PAYLOAD_OVERHEAD + key_len as u64 + value_len as u64
}

/// Reject an entry whose payload would not fit in one frame
pub fn check_size(key_len: usize, value_len: usize) -> Result<()> {
    let size = payload_size(key_len, value_len);
    if size > MAX_PAYLOAD_SIZE {
        return Err(UniverseError::EntryTooLarge {
            size,
            max: MAX_PAYLOAD_SIZE,
        });
    }
    Ok(())
}

#[derive(Serialize)]
struct PayloadRef<'a> {
    kind: u8,
    key: &'a str,
    value: &'a [u8],
}

#[derive(Deserialize)]
struct Payload {
    kind: u8,
    key: String,
    value: Vec<u8>,
}

/// One frame split into its three fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub length: u32,
    pub checksum: u32,
    pub payload: Vec<u8>,
}

impl Frame {
    /// Size of this frame on disk
    pub fn encoded_len(&self) -> usize {
        HEADER_SIZE + self.payload.len()
    }

    /// Append the on-disk representation to `buf`
    pub fn write_to(&self, buf: &mut BytesMut) {
        buf.reserve(self.encoded_len());
        buf.put_u32(self.length);
        buf.put_u32(self.checksum);
        buf.put_slice(&self.payload);
    }

    /// On-disk representation as a standalone buffer
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(self.encoded_len());
        self.write_to(&mut buf);
        buf.to_vec()
    }
}

/// Outcome of decoding a structurally valid frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    /// A Set or Delete this build understands
    Entry(LogEntry),

    /// A well-formed frame whose kind byte is unknown (written by a newer build)
    UnknownKind(u8),
}

/// Serialize an entry into a frame.
///
/// Fails with `EntryTooLarge` for a payload the length field cannot hold, or
/// with `Serialization`, which points at a bug rather than a runtime condition.
pub fn encode(entry: &LogEntry) -> Result<Frame> {
    check_size(entry.key().len(), entry.value().len())?;
    let payload = bincode::serialize(&PayloadRef {
        kind: entry.kind().as_u8(),
        key: entry.key(),
        value: entry.value(),
    })
    .map_err(|e| UniverseError::Serialization(e.to_string()))?;

    let length = u32::try_from(payload.len()).map_err(|_| {
        UniverseError::Serialization(format!("payload of {} bytes exceeds u32", payload.len()))
    })?;

    Ok(Frame {
        length,
        checksum: crc32fast::hash(&payload),
        payload,
    })
}

/// Verify and parse one frame.
///
/// Fails with `CorruptFrame` on a zero length, a length that disagrees with the
/// payload, a checksum mismatch, an unparsable payload or an empty key. Once
/// this fails, the caller cannot trust any later offset in the same scan.
pub fn decode(length: u32, checksum: u32, payload: &[u8]) -> Result<Decoded> {
    if length == 0 {
        return Err(UniverseError::CorruptFrame("zero length".into()));
    }
    if payload.len() != length as usize {
        return Err(UniverseError::CorruptFrame(format!(
            "length field says {} bytes, payload has {}",
            length,
            payload.len()
        )));
    }

    let actual = crc32fast::hash(payload);
    if actual != checksum {
        return Err(UniverseError::CorruptFrame(format!(
            "checksum mismatch (expected {:#010x}, actual {:#010x})",
            checksum, actual
        )));
    }

    let parsed: Payload = bincode::deserialize(payload)
        .map_err(|e| UniverseError::CorruptFrame(format!("undecodable payload: {}", e)))?;

    let kind = match EntryKind::from_u8(parsed.kind) {
        Some(kind) => kind,
        None => return Ok(Decoded::UnknownKind(parsed.kind)),
    };

    if parsed.key.is_empty() {
        return Err(UniverseError::CorruptFrame("empty key".into()));
    }

    let entry = match kind {
        EntryKind::Set => LogEntry::set(parsed.key, parsed.value),
        EntryKind::Delete => LogEntry::delete(parsed.key),
    };
    Ok(Decoded::Entry(entry))
}

/// Convenience wrapper over `decode` for an already split frame
pub fn decode_frame(frame: &Frame) -> Result<Decoded> {
    decode(frame.length, frame.checksum, &frame.payload)
}
