//! Footer decoding (spec §4.2, §6 "Footer").

use zerocopy::{AsBytes, FromBytes, FromZeroes};

use crate::block_handle::BlockHandle;
use crate::byte_source::ByteSource;
use crate::cursor::{ByteCursor, CountedIter, SliceCursor};
use crate::error::{Error, Result};

/// Total encoded footer length: this crate targets the single layout
/// version spec.md fixes at 53 bytes.
pub const FOOTER_LENGTH: u64 = 53;

/// Fixed 16-byte tail: version, checksum kind, magic. Parsed with
/// `zerocopy`, following the teacher's `table.rs::FooterDecoder` pattern of
/// using a `repr(C)` struct for the constant-width suffix of the footer
/// while the variable-width handle region is decoded separately.
#[derive(Debug, AsBytes, FromBytes, FromZeroes)]
#[repr(C)]
struct FooterTail {
    version: u32,
    checksum_kind: u32,
    magic: u64,
}

const TAIL_LEN: usize = std::mem::size_of::<FooterTail>();
const HANDLES_REGION_LEN: usize = FOOTER_LENGTH as usize - TAIL_LEN;

/// The format's magic number: the documented constant every conforming
/// footer must end with (spec §6: `0xF09F...`).
pub const MAGIC: u64 = 0xF09F_9AA4_5353_5442;

/// This crate decodes exactly one footer layout version; any other value
/// is reported as `UnsupportedVersion` rather than guessed at.
pub const SUPPORTED_FOOTER_VERSION: u32 = 2;

/// Checksum algorithm named by the footer's `checksum_kind` field. Only
/// used when a caller opts into verification (spec §9 Open Question).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChecksumKind {
    None,
    Crc32c,
}

impl ChecksumKind {
    fn from_u32(v: u32) -> Option<Self> {
        match v {
            0 => Some(ChecksumKind::None),
            1 => Some(ChecksumKind::Crc32c),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Footer {
    pub meta_index_handle: BlockHandle,
    pub index_handle: BlockHandle,
    pub version: u32,
    pub checksum_kind_raw: u32,
}

impl Footer {
    pub fn checksum_kind(&self) -> Option<ChecksumKind> {
        ChecksumKind::from_u32(self.checksum_kind_raw)
    }

    /// Requests the last `FOOTER_LENGTH` bytes from `source` and parses
    /// the trailer. Confirms the supplied byte range is fully consumed
    /// (spec §4.2: "the supplied iterator must be exhausted").
    pub fn read_from(source: &impl ByteSource) -> Result<Self> {
        let file_len = source.length();
        if file_len < FOOTER_LENGTH {
            return Err(Error::Truncated { offset: 0 });
        }
        let footer_offset = file_len - FOOTER_LENGTH;
        log::debug!("reading footer at offset {} ({} bytes)", footer_offset, FOOTER_LENGTH);
        let raw = source.iterate(footer_offset, FOOTER_LENGTH)?;
        let mut counted = CountedIter::new(raw);

        let footer = Self::decode_from_cursor(&mut counted, footer_offset)?;

        if !counted.is_exhausted() {
            return Err(Error::BadFileFormat {
                offset: footer_offset + counted.count_consumed(),
                reason: "footer iterator was not exhausted after decoding".to_string(),
            });
        }

        // Every handle must resolve inside [0, L) (spec §3 invariants).
        if !footer.meta_index_handle.fits_within(file_len) {
            return Err(Error::BadFileFormat {
                offset: footer_offset,
                reason: format!(
                    "meta index handle {:?} exceeds file length {}",
                    footer.meta_index_handle, file_len
                ),
            });
        }
        if !footer.index_handle.fits_within(file_len) {
            return Err(Error::BadFileFormat {
                offset: footer_offset,
                reason: format!(
                    "index handle {:?} exceeds file length {}",
                    footer.index_handle, file_len
                ),
            });
        }

        Ok(footer)
    }

    /// Decodes a footer from an already-sliced `FOOTER_LENGTH`-byte buffer.
    /// Exposed separately from `read_from` so tests can exercise the byte
    /// layout directly without a `ByteSource`.
    pub fn decode_from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != FOOTER_LENGTH as usize {
            return Err(Error::BadFileFormat {
                offset: 0,
                reason: format!(
                    "footer must be exactly {} bytes, got {}",
                    FOOTER_LENGTH,
                    bytes.len()
                ),
            });
        }
        let mut cursor = SliceCursor::new(bytes);
        Self::decode_from_cursor(&mut cursor, 0)
    }

    fn decode_from_cursor(cursor: &mut impl ByteCursor, offset_base: u64) -> Result<Self> {
        // Handles region: meta-index handle, then index handle, then
        // zero padding up to HANDLES_REGION_LEN bytes. We only need to
        // consume it in order; the padding is skipped implicitly because
        // BlockHandle::decode_from stops once both varints are read.
        let mut handles_region = [0u8; HANDLES_REGION_LEN];
        for slot in handles_region.iter_mut() {
            *slot = cursor
                .read_byte()
                .ok_or(Error::Truncated { offset: offset_base + cursor.offset() })?;
        }
        let mut region_cursor = SliceCursor::new(&handles_region);
        let meta_index_handle = BlockHandle::decode_from(&mut region_cursor)?;
        let index_handle = BlockHandle::decode_from(&mut region_cursor)?;

        // Fixed tail: version, checksum kind, magic. Read as a packed
        // struct (teacher's `table.rs::FooterDecoder` pattern) rather than
        // through the byte cursor, since the three fields are fixed-width
        // and contiguous.
        let mut tail_bytes = [0u8; TAIL_LEN];
        for slot in tail_bytes.iter_mut() {
            *slot = cursor
                .read_byte()
                .ok_or(Error::Truncated { offset: offset_base + cursor.offset() })?;
        }
        let tail_offset = offset_base + cursor.offset() - TAIL_LEN as u64;
        let tail = FooterTail::read_from(&tail_bytes[..]).ok_or(Error::BadFileFormat {
            offset: tail_offset,
            reason: "malformed footer tail".to_string(),
        })?;

        if tail.magic != MAGIC {
            return Err(Error::BadFileFormat {
                offset: tail_offset + 8,
                reason: format!(
                    "magic mismatch: expected {:#018x}, got {:#018x}",
                    MAGIC, tail.magic
                ),
            });
        }
        if tail.version != SUPPORTED_FOOTER_VERSION {
            return Err(Error::UnsupportedVersion { version: tail.version });
        }

        Ok(Footer {
            meta_index_handle,
            index_handle,
            version: tail.version,
            checksum_kind_raw: tail.checksum_kind,
        })
    }
}
