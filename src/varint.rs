//! Fixed-width and variable-length primitive decoders (spec §4.1).
//!
//! Every function here advances its cursor by exactly as many bytes as it
//! decodes and reports the offset at which decoding *started* on failure.

use crate::cursor::ByteCursor;
use crate::error::{Error, Result};

/// Maximum number of continuation bytes a 64-bit unsigned varint can use:
/// 7 bits/byte * 9 bytes = 63 bits, plus one more byte carrying the top bit.
const MAX_VARINT_BYTES: usize = 10;

/// Reads a ULEB128-style unsigned varint: low 7 bits of each byte,
/// concatenated little-endian (least-significant group first), terminated
/// by a byte with the high bit clear.
pub fn read_uvarint(cursor: &mut impl ByteCursor) -> Result<u64> {
    let start = cursor.offset();
    let mut result: u64 = 0;
    let mut shift: u32 = 0;

    for i in 0..MAX_VARINT_BYTES {
        let byte = cursor.read_byte().ok_or(Error::Truncated { offset: start })?;
        let group = (byte & 0x7f) as u64;

        if i == MAX_VARINT_BYTES - 1 && (byte & 0x80 != 0 || group > 1) {
            // The 10th byte may only contribute bit 63; anything else
            // overflows a u64.
            return Err(Error::Overflow { offset: start });
        }

        result |= group << shift;
        if byte & 0x80 == 0 {
            return Ok(result);
        }
        shift += 7;
    }

    Err(Error::Overflow { offset: start })
}

/// Decodes a signed varint via zig-zag: `(u >> 1) ^ -(u & 1)`.
pub fn read_svarint(cursor: &mut impl ByteCursor) -> Result<i64> {
    let u = read_uvarint(cursor)?;
    Ok(((u >> 1) as i64) ^ -((u & 1) as i64))
}

/// Reads four little-endian bytes as a signed 32-bit integer.
pub fn read_fixed32(cursor: &mut impl ByteCursor) -> Result<i32> {
    let start = cursor.offset();
    let mut buf = [0u8; 4];
    for b in buf.iter_mut() {
        *b = cursor.read_byte().ok_or(Error::Truncated { offset: start })?;
    }
    Ok(i32::from_le_bytes(buf))
}

/// Reads four little-endian bytes as an unsigned 32-bit integer.
pub fn read_fixed32_u(cursor: &mut impl ByteCursor) -> Result<u32> {
    Ok(read_fixed32(cursor)? as u32)
}

/// Reads eight little-endian bytes as an unsigned 64-bit integer.
pub fn read_fixed64_u(cursor: &mut impl ByteCursor) -> Result<u64> {
    let start = cursor.offset();
    let mut buf = [0u8; 8];
    for b in buf.iter_mut() {
        *b = cursor.read_byte().ok_or(Error::Truncated { offset: start })?;
    }
    Ok(u64::from_le_bytes(buf))
}

/// Reads and compares the fixed 8-byte magic. Any mismatch is
/// `BadFileFormat`, any truncation is `Truncated`.
pub fn read_magic(cursor: &mut impl ByteCursor, expected: u64) -> Result<()> {
    let start = cursor.offset();
    let got = read_fixed64_u(cursor)?;
    if got != expected {
        return Err(Error::BadFileFormat {
            offset: start,
            reason: format!("magic mismatch: expected {:#018x}, got {:#018x}", expected, got),
        });
    }
    Ok(())
}

/// Reads an unsigned varint `n`, then exactly `n` bytes, returned as an
/// owned buffer (spec: "copied out").
pub fn read_length_prefixed_bytes(cursor: &mut impl ByteCursor) -> Result<Vec<u8>> {
    let n = read_uvarint(cursor)? as usize;
    let start = cursor.offset();
    let mut buf = Vec::with_capacity(n);
    for _ in 0..n {
        buf.push(cursor.read_byte().ok_or(Error::Truncated { offset: start })?);
    }
    Ok(buf)
}
