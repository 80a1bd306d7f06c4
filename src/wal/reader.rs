//! WAL Reader
//!
//! Sequential, structure-only reading of length-prefixed frames. Checksums and
//! payloads are verified by the frame codec; this layer only guarantees that
//! every yielded frame was read in full.

use std::io::{self, BufReader, Read};

use super::frame::{Frame, CHECKSUM_SIZE, HEADER_SIZE, LENGTH_SIZE};
use crate::error::{Result, UniverseError};

/// Iterates over the frames of a log, front to back.
///
/// Yields `(offset, frame)` pairs. A clean end-of-file between two frames ends
/// the iteration; a truncated length field, a zero length or a payload running
/// past end-of-file yields one `CorruptWal` error and then stops, since every
/// later offset is unknowable.
pub struct FrameReader<R: Read> {
    reader: BufReader<R>,
    offset: u64,
    remaining: u64,
    failed: bool,
}

impl<R: Read> FrameReader<R> {
    /// Read `len` bytes of frames from `reader`, which must be positioned at
    /// offset 0 of the log.
    pub fn new(reader: R, len: u64) -> Self {
        Self {
            reader: BufReader::new(reader),
            offset: 0,
            remaining: len,
            failed: false,
        }
    }

    fn corrupt(&self, reason: impl Into<String>) -> UniverseError {
        UniverseError::CorruptWal {
            offset: self.offset,
            reason: reason.into(),
        }
    }

    fn read_u32(&mut self) -> Result<u32> {
        let mut buf = [0u8; 4];
        self.read_exact(&mut buf)?;
        Ok(u32::from_be_bytes(buf))
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        match self.reader.read_exact(buf) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                Err(self.corrupt("unexpected end of file inside frame"))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn read_frame(&mut self) -> Result<Option<(u64, Frame)>> {
        if self.remaining == 0 {
            return Ok(None);
        }
        if self.remaining < LENGTH_SIZE as u64 {
            return Err(self.corrupt(format!(
                "truncated length field ({} trailing bytes)",
                self.remaining
            )));
        }

        let length = self.read_u32()?;
        if length == 0 {
            return Err(self.corrupt("zero-length frame"));
        }
        if self.remaining < HEADER_SIZE as u64 {
            return Err(self.corrupt(format!(
                "truncated checksum field ({} of {} bytes)",
                self.remaining - LENGTH_SIZE as u64,
                CHECKSUM_SIZE
            )));
        }

        let available = self.remaining - HEADER_SIZE as u64;
        if u64::from(length) > available {
            return Err(self.corrupt(format!(
                "frame declares {} payload bytes but only {} remain",
                length, available
            )));
        }

        let checksum = self.read_u32()?;
        let mut payload = vec![0u8; length as usize];
        self.read_exact(&mut payload)?;

        let start = self.offset;
        let frame = Frame {
            length,
            checksum,
            payload,
        };
        let size = frame.encoded_len() as u64;
        self.offset += size;
        self.remaining -= size;
        Ok(Some((start, frame)))
    }
}

impl<R: Read> Iterator for FrameReader<R> {
    type Item = Result<(u64, Frame)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.read_frame() {
            Ok(Some(frame)) => Some(Ok(frame)),
            Ok(None) => None,
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}
