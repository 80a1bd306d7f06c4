//! Log File
//!
//! Owns the append-only file on disk. Writes here are not durable until
//! `persist` returns; deciding when to call it is the flush pipeline's job.

use std::fs::{DirBuilder, File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use super::frame::Frame;
use super::reader::FrameReader;
use crate::error::Result;

/// Mode of directories created on open (rwxr-xr-x)
#[cfg(unix)]
const DIR_MODE: u32 = 0o755;

/// Mode of a newly created log file (rw-r--r--)
#[cfg(unix)]
const FILE_MODE: u32 = 0o644;

/// The append-only log file
pub struct LogFile {
    file: File,
    path: PathBuf,

    /// End-of-file offset; every append lands here
    len: u64,
}

impl LogFile {
    /// Open or create the log, creating missing parent directories.
    ///
    /// The write cursor starts at end-of-file.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            let mut builder = DirBuilder::new();
            builder.recursive(true);
            #[cfg(unix)]
            {
                use std::os::unix::fs::DirBuilderExt;
                builder.mode(DIR_MODE);
            }
            builder.create(parent)?;
        }

        let mut options = OpenOptions::new();
        options.read(true).append(true).create(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(FILE_MODE);
        }
        let mut file = options.open(path)?;
        let len = file.seek(SeekFrom::End(0))?;

        Ok(Self {
            file,
            path: path.to_path_buf(),
            len,
        })
    }

    /// Write raw frame bytes at end-of-file. Not durable on return.
    pub fn append(&mut self, bytes: &[u8]) -> Result<()> {
        self.file.write_all(bytes)?;
        self.len += bytes.len() as u64;
        Ok(())
    }

    /// Durability barrier: flush and fsync everything written so far
    pub fn persist(&mut self) -> Result<()> {
        self.file.flush()?;
        self.file.sync_all()?;
        Ok(())
    }

    /// Cut the file back to `len` bytes, discarding a partially written batch
    pub fn truncate(&mut self, len: u64) -> Result<()> {
        self.file.set_len(len)?;
        self.file.seek(SeekFrom::End(0))?;
        self.len = len;
        Ok(())
    }

    /// Read every frame from offset 0, stopping with `CorruptWal` at the first
    /// structurally broken one.
    ///
    /// The cursor is put back at end-of-file whether or not the scan succeeds.
    pub fn scan_from_start(&mut self) -> Result<Vec<(u64, Frame)>> {
        self.file.seek(SeekFrom::Start(0))?;
        let frames = FrameReader::new(&self.file, self.len).collect::<Result<Vec<_>>>();
        self.file.seek(SeekFrom::End(0))?;
        frames
    }

    /// Persist, then release the handle
    pub fn close(mut self) -> Result<()> {
        self.persist()
    }

    /// Current size in bytes
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
