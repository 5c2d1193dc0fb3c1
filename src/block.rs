//! Data block reading and decoding (spec §4.3, §4.4).
//!
//! A block is read from the file in one positional I/O call (its handle's
//! length plus the 5-byte trailer), then decoded in memory: the restart
//! array is validated once at construction, and entries are produced by a
//! forward-only iterator over the entry area that reuses a single
//! "previous key" buffer, per spec §9.

use crate::block_handle::BlockHandle;
use crate::byte_source::ByteSource;
use crate::cursor::{ByteCursor, SliceCursor};
use crate::error::{Error, Result};
use crate::varint::{read_fixed32_u, read_uvarint};

/// One compression-type byte plus a 4-byte checksum follows every block's
/// payload on disk.
pub const BLOCK_TRAILER_LEN: usize = 5;

/// Reads `handle.length + BLOCK_TRAILER_LEN` bytes from `source`, checks the
/// compression byte, and optionally verifies the trailing CRC32C checksum
/// against the payload plus compression byte. Returns the uncompressed
/// payload (just the `handle.length` data bytes).
pub fn read_block(
    source: &impl ByteSource,
    handle: &BlockHandle,
    verify_checksums: bool,
) -> Result<Vec<u8>> {
    log::trace!(
        "reading block at offset {} ({} bytes, verify_checksums={})",
        handle.offset,
        handle.length,
        verify_checksums
    );
    let total = handle
        .length
        .checked_add(BLOCK_TRAILER_LEN as u64)
        .ok_or(Error::BadFileFormat {
            offset: handle.offset,
            reason: "block handle length overflows".to_string(),
        })?;

    // Centralizes the handle-fits-in-file bounds check (spec §3 invariant:
    // every handle resolves inside [0, L)) through the same `fits_within`
    // footer.rs and index.rs/entry.rs use, rather than re-deriving it here.
    let spanned = BlockHandle::new(handle.offset, total);
    if !spanned.fits_within(source.length()) {
        return Err(Error::BadFileFormat {
            offset: handle.offset,
            reason: format!(
                "block handle {{offset={}, length={}}} (plus trailer) exceeds file length {}",
                handle.offset,
                handle.length,
                source.length()
            ),
        });
    }

    let raw: Vec<u8> = source.iterate(handle.offset, total)?.collect();
    if raw.len() != total as usize {
        return Err(Error::Truncated {
            offset: handle.offset + raw.len() as u64,
        });
    }

    let payload_len = handle.length as usize;
    let compression_type = raw[payload_len];

    if verify_checksums {
        let mut crc_cursor = SliceCursor::new(&raw[payload_len + 1..payload_len + 5]);
        let expected = read_fixed32_u(&mut crc_cursor)?;
        let computed = crc32fast::hash(&raw[..=payload_len]);
        if computed != expected {
            return Err(Error::ChecksumMismatch {
                offset: handle.offset + payload_len as u64 + 1,
                expected,
                computed,
            });
        }
    }

    match compression_type {
        0 => Ok(raw[..payload_len].to_vec()),
        code => Err(Error::UnsupportedCompression { code }),
    }
}

/// A decoded block body: entry area plus a validated restart-point array
/// (spec §3 "Block", invariants on restart offsets).
pub struct Block<'a> {
    data: &'a [u8],
    entries_end: usize,
    restarts: Vec<u32>,
}

impl<'a> Block<'a> {
    /// Validates and wraps a block payload (the `handle.length` bytes
    /// returned by [`read_block`], *not* including the 5-byte trailer).
    pub fn new(data: &'a [u8]) -> Result<Self> {
        if data.len() < 4 {
            return Err(Error::BadBlockStructure {
                offset: 0,
                reason: "block shorter than the restart-count field".to_string(),
            });
        }

        let mut tail_cursor = SliceCursor::new(&data[data.len() - 4..]);
        let num_restarts = read_fixed32_u(&mut tail_cursor)? as usize;

        let restart_bytes_len = num_restarts.checked_mul(4).ok_or(Error::BadBlockStructure {
            offset: (data.len() - 4) as u64,
            reason: "restart count overflows".to_string(),
        })?;
        if data.len() < 4 + restart_bytes_len {
            return Err(Error::BadBlockStructure {
                offset: (data.len() - 4) as u64,
                reason: format!(
                    "restart array of {} entries does not fit in a {}-byte block",
                    num_restarts,
                    data.len()
                ),
            });
        }

        let entries_end = data.len() - 4 - restart_bytes_len;
        let restart_array = &data[entries_end..entries_end + restart_bytes_len];
        let mut restart_cursor = SliceCursor::new(restart_array);
        let mut restarts = Vec::with_capacity(num_restarts);
        let mut previous: Option<u32> = None;
        for _ in 0..num_restarts {
            let r = read_fixed32_u(&mut restart_cursor)?;
            if r as usize >= entries_end {
                return Err(Error::BadBlockStructure {
                    offset: entries_end as u64,
                    reason: format!("restart offset {} lies outside the entry area", r),
                });
            }
            if let Some(prev) = previous {
                if r <= prev {
                    return Err(Error::BadBlockStructure {
                        offset: entries_end as u64,
                        reason: "restart offsets are not strictly increasing".to_string(),
                    });
                }
            }
            previous = Some(r);
            restarts.push(r);
        }

        Ok(Block {
            data,
            entries_end,
            restarts,
        })
    }

    /// End offset (exclusive) of the entry area, i.e. where the restart
    /// array begins. Exposed so `entry.rs` can drive an owned copy of a
    /// block's bytes without re-borrowing a `Block` across iterator steps.
    pub(crate) fn entries_end(&self) -> usize {
        self.entries_end
    }

    /// The validated restart-point array.
    pub(crate) fn restarts(&self) -> &[u32] {
        &self.restarts
    }

    pub fn iter(&self) -> RawBlockIter<'a> {
        RawBlockIter {
            data: self.data,
            entries_end: self.entries_end,
            restarts: self.restarts.clone(),
            pos: 0,
            prev_key: Vec::new(),
            next_restart_idx: 0,
        }
    }
}

/// Forward-only iterator over a block's prefix-compressed entry area,
/// yielding `(full_key, value)` pairs (spec §4.4). Keys still carry their
/// 8-byte internal-key trailer here; [`split_internal_key`] strips it.
pub struct RawBlockIter<'a> {
    data: &'a [u8],
    entries_end: usize,
    restarts: Vec<u32>,
    pos: usize,
    prev_key: Vec<u8>,
    next_restart_idx: usize,
}

impl<'a> Iterator for RawBlockIter<'a> {
    type Item = Result<(Vec<u8>, &'a [u8])>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.entries_end {
            return None;
        }
        let start_pos = self.pos;

        let mut cursor = SliceCursor::at(self.data, self.pos);
        let shared = match read_uvarint(&mut cursor) {
            Ok(v) => v as usize,
            Err(e) => return Some(Err(e)),
        };
        let unshared = match read_uvarint(&mut cursor) {
            Ok(v) => v as usize,
            Err(e) => return Some(Err(e)),
        };
        let value_len = match read_uvarint(&mut cursor) {
            Ok(v) => v as usize,
            Err(e) => return Some(Err(e)),
        };

        if shared > self.prev_key.len() {
            return Some(Err(Error::BadBlockStructure {
                offset: start_pos as u64,
                reason: format!(
                    "shared prefix {} exceeds previous key length {}",
                    shared,
                    self.prev_key.len()
                ),
            }));
        }

        if self.next_restart_idx < self.restarts.len()
            && self.restarts[self.next_restart_idx] as usize == start_pos
        {
            if shared != 0 {
                return Some(Err(Error::BadBlockStructure {
                    offset: start_pos as u64,
                    reason: "restart-point entry has a nonzero shared prefix".to_string(),
                }));
            }
            self.next_restart_idx += 1;
        }

        let suffix = match cursor.take(unshared) {
            Some(s) => s,
            None => {
                return Some(Err(Error::Truncated {
                    offset: cursor.offset(),
                }))
            }
        };
        let value = match cursor.take(value_len) {
            Some(v) => v,
            None => {
                return Some(Err(Error::Truncated {
                    offset: cursor.offset(),
                }))
            }
        };

        let mut full_key = Vec::with_capacity(shared + unshared);
        full_key.extend_from_slice(&self.prev_key[..shared]);
        full_key.extend_from_slice(suffix);
        self.prev_key = full_key.clone();
        self.pos = cursor.position();

        Some(Ok((full_key, value)))
    }
}

/// Splits the trailing 8-byte internal-key suffix off a full on-disk key.
///
/// The packing follows the standard RocksDB/LevelDB internal key format:
/// `trailer = (sequence << 8) | kind`, stored little-endian, so `kind` is
/// the trailer's low byte and `sequence` its high 56 bits. This is the
/// convention every corpus reader and writer actually implements, and the
/// only one under which two internal keys with equal user keys sort by
/// descending sequence number under a plain byte-wise trailer comparison
/// (spec invariant: decoded keys are non-decreasing across a block).
pub fn split_internal_key(full_key: &[u8]) -> Result<(&[u8], u64, u8)> {
    if full_key.len() < 8 {
        return Err(Error::BadBlockStructure {
            offset: 0,
            reason: format!(
                "internal key trailer shorter than 8 bytes (key is {} bytes)",
                full_key.len()
            ),
        });
    }
    let split_at = full_key.len() - 8;
    let user_key = &full_key[..split_at];
    let trailer_bytes: [u8; 8] = full_key[split_at..].try_into().unwrap();
    let trailer = u64::from_le_bytes(trailer_bytes);
    let kind = (trailer & 0xFF) as u8;
    let sequence = trailer >> 8;
    Ok((user_key, sequence, kind))
}
