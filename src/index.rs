//! Index walking: single- and two-level index traversal (spec §4.5).
//!
//! An index block has the same physical layout as a data block (§3), so it
//! is decoded with the same [`crate::block::Block`]. Each entry's value is
//! an encoded [`BlockHandle`] rather than a user value. When the table uses
//! a two-level index, the walker transparently composes both levels so
//! callers only ever see a flat sequence of data-block handles.

use crate::block::Block;
use crate::block_handle::BlockHandle;
use crate::cursor::SliceCursor;
use crate::error::{Error, Result};

/// Whether the footer's index points directly at data blocks, or at a
/// second level of index blocks that in turn point at data blocks.
/// Determined from the properties block (spec §4.6), not the footer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexType {
    SingleLevel,
    TwoLevel,
}

/// Decodes one index block's entries into `(separator_key, child_handle)`
/// pairs in stored order.
pub fn index_entries(index_block_data: &[u8]) -> Result<Vec<(Vec<u8>, BlockHandle)>> {
    let block = Block::new(index_block_data)?;
    let mut out = Vec::new();
    for entry in block.iter() {
        let (key, value) = entry?;
        let mut cursor = SliceCursor::new(value);
        let handle = BlockHandle::decode_from(&mut cursor)?;
        out.push((key, handle));
    }
    Ok(out)
}

/// Returns the list of data-block handles a top-level index block
/// resolves to, transparently expanding a second index level when
/// `index_type` is [`IndexType::TwoLevel`].
///
/// `read_block` is supplied by the caller so this module stays agnostic of
/// the byte source and compression handling in `crate::block::read_block`.
/// `file_len` bounds-checks every child handle (spec §3 invariant: every
/// handle resolves inside `[0, L)`) before it is handed to `read_block`.
pub fn resolve_data_block_handles(
    top_level_index_data: &[u8],
    index_type: IndexType,
    file_len: u64,
    mut read_block: impl FnMut(&BlockHandle) -> Result<Vec<u8>>,
) -> Result<Vec<BlockHandle>> {
    let top_entries = index_entries(top_level_index_data)?;

    match index_type {
        IndexType::SingleLevel => Ok(top_entries.into_iter().map(|(_, handle)| handle).collect()),
        IndexType::TwoLevel => {
            let mut data_handles = Vec::new();
            for (_, second_level_handle) in top_entries {
                if !second_level_handle.fits_within(file_len) {
                    return Err(Error::BadFileFormat {
                        offset: second_level_handle.offset,
                        reason: format!(
                            "second-level index handle {:?} exceeds file length {}",
                            second_level_handle, file_len
                        ),
                    });
                }
                log::trace!("descending to second-level index block at offset {}", second_level_handle.offset);
                let second_level_data = read_block(&second_level_handle)?;
                let second_level_entries = index_entries(&second_level_data)?;
                data_handles.extend(second_level_entries.into_iter().map(|(_, h)| h));
            }
            Ok(data_handles)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uvarint_bytes(mut v: u64) -> Vec<u8> {
        let mut out = Vec::new();
        loop {
            let mut byte = (v & 0x7f) as u8;
            v >>= 7;
            if v != 0 {
                byte |= 0x80;
            }
            out.push(byte);
            if v == 0 {
                break;
            }
        }
        out
    }

    fn encode_handle(h: &BlockHandle) -> Vec<u8> {
        let mut out = uvarint_bytes(h.offset);
        out.extend(uvarint_bytes(h.length));
        out
    }

    /// Builds an index block (same layout as a data block) whose values are
    /// encoded block handles, restart interval 1.
    fn build_index_block(entries: &[(&[u8], BlockHandle)]) -> Vec<u8> {
        let mut buf = Vec::new();
        let mut restarts = Vec::new();
        let mut prev_key: Vec<u8> = Vec::new();

        for (key, handle) in entries {
            restarts.push(buf.len() as u32);
            let shared = key
                .iter()
                .zip(prev_key.iter())
                .take_while(|(a, b)| a == b)
                .count();
            let unshared = &key[shared..];
            let value = encode_handle(handle);
            buf.extend(uvarint_bytes(shared as u64));
            buf.extend(uvarint_bytes(unshared.len() as u64));
            buf.extend(uvarint_bytes(value.len() as u64));
            buf.extend_from_slice(unshared);
            buf.extend_from_slice(&value);
            prev_key = key.to_vec();
        }

        for r in &restarts {
            buf.extend_from_slice(&r.to_le_bytes());
        }
        buf.extend_from_slice(&(restarts.len() as u32).to_le_bytes());
        buf
    }

    #[test]
    fn single_level_index_yields_handles_in_order() {
        let data = build_index_block(&[
            (b"m".as_slice(), BlockHandle::new(0, 100)),
            (b"z".as_slice(), BlockHandle::new(100, 50)),
        ]);

        let handles = resolve_data_block_handles(&data, IndexType::SingleLevel, 1_000_000, |_| {
            panic!("single-level index must not read a second level")
        })
        .unwrap();

        assert_eq!(handles, vec![BlockHandle::new(0, 100), BlockHandle::new(100, 50)]);
    }

    #[test]
    fn two_level_index_flattens_both_levels() {
        let second_level_a = build_index_block(&[
            (b"a".as_slice(), BlockHandle::new(0, 10)),
            (b"b".as_slice(), BlockHandle::new(10, 10)),
        ]);
        let second_level_b = build_index_block(&[(b"c".as_slice(), BlockHandle::new(20, 10))]);

        let top_level = build_index_block(&[
            (b"b".as_slice(), BlockHandle::new(1000, second_level_a.len() as u64)),
            (b"c".as_slice(), BlockHandle::new(2000, second_level_b.len() as u64)),
        ]);

        let handles = resolve_data_block_handles(&top_level, IndexType::TwoLevel, 1_000_000, |handle| {
            if handle.offset == 1000 {
                Ok(second_level_a.clone())
            } else if handle.offset == 2000 {
                Ok(second_level_b.clone())
            } else {
                panic!("unexpected second-level handle {:?}", handle)
            }
        })
        .unwrap();

        assert_eq!(
            handles,
            vec![
                BlockHandle::new(0, 10),
                BlockHandle::new(10, 10),
                BlockHandle::new(20, 10),
            ]
        );
    }

    #[test]
    fn two_level_index_rejects_child_handle_past_file_end() {
        let top_level = build_index_block(&[(
            b"b".as_slice(),
            BlockHandle::new(1000, 50),
        )]);

        let result = resolve_data_block_handles(&top_level, IndexType::TwoLevel, 1024, |_| {
            panic!("child handle should be rejected before it is ever read")
        });

        assert!(matches!(result, Err(Error::BadFileFormat { .. })));
    }
}
