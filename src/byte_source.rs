//! Random-access byte sources (spec §3 "Byte source", §6 consumed interface).
//!
//! A `ByteSource` represents an immutable file of known length. Callers open
//! and close it; decoders only borrow it. `FileByteSource` is the required,
//! file-channel-backed implementation; `MemoryByteSource` is an in-memory
//! alternative, used by this crate's own test suite and permitted by the
//! spec as an alternative source (e.g. a memory-mapped implementation).

use std::fs::File;
use std::os::unix::fs::FileExt;
use std::path::Path;

use crate::error::{Error, Result};

/// A finite, forward-only iterator over a byte range pulled from a
/// [`ByteSource`]. The whole range is read in one positional I/O call and
/// handed out byte-by-byte, which is what `CountedIter` (spec §4.8) wraps.
pub struct RangeIter {
    data: std::vec::IntoIter<u8>,
}

impl Iterator for RangeIter {
    type Item = u8;

    fn next(&mut self) -> Option<u8> {
        self.data.next()
    }
}

/// Random-access byte source over a single immutable file of known length.
pub trait ByteSource {
    /// Total length of the file in bytes.
    fn length(&self) -> u64;

    /// Returns a finite iterator over `count` bytes starting at `offset`.
    /// `offset + count` must not exceed `length()`.
    fn iterate(&self, offset: u64, count: u64) -> Result<RangeIter>;
}

/// File-channel-backed byte source over a local, immutable file.
pub struct FileByteSource {
    file: File,
    len: u64,
}

impl FileByteSource {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let len = file.metadata()?.len();
        Ok(FileByteSource { file, len })
    }

    /// Scoped close: drops the underlying file handle. Callers that want an
    /// explicit release point (rather than relying on `Drop`) can call this.
    pub fn close(self) {
        drop(self);
    }
}

impl ByteSource for FileByteSource {
    fn length(&self) -> u64 {
        self.len
    }

    fn iterate(&self, offset: u64, count: u64) -> Result<RangeIter> {
        let mut buf = vec![0u8; count as usize];
        if count > 0 {
            self.file.read_exact_at(&mut buf, offset)?;
        }
        Ok(RangeIter {
            data: buf.into_iter(),
        })
    }
}

/// In-memory byte source, useful for tests and for embedding a table that
/// was already materialized in memory.
pub struct MemoryByteSource {
    data: Vec<u8>,
}

impl MemoryByteSource {
    pub fn new(data: Vec<u8>) -> Self {
        MemoryByteSource { data }
    }
}

impl ByteSource for MemoryByteSource {
    fn length(&self) -> u64 {
        self.data.len() as u64
    }

    /// Errors rather than clamping when `offset + count` runs past the end
    /// of the data, matching `FileByteSource::iterate`'s observable
    /// contract (a real positional read fails loudly at EOF).
    fn iterate(&self, offset: u64, count: u64) -> Result<RangeIter> {
        let end = offset
            .checked_add(count)
            .ok_or(Error::Truncated { offset })?;
        if end > self.data.len() as u64 {
            return Err(Error::Truncated {
                offset: self.data.len() as u64,
            });
        }
        let slice = &self.data[offset as usize..end as usize];
        Ok(RangeIter {
            data: slice.to_vec().into_iter(),
        })
    }
}
