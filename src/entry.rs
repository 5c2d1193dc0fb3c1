//! File-level streaming entry iterator (spec §4.7).
//!
//! Composes the footer, properties (for index topology), index walker, and
//! block decoder into one lazy, forward-only, single-pass sequence of
//! [`Entry`] over the whole file. Modeled as an explicit state machine
//! (current data-block handle list and position, current block's decode
//! state) rather than nested generators, per spec §9's note.

use crate::block::{self, split_internal_key, Block};
use crate::block_handle::BlockHandle;
use crate::byte_source::ByteSource;
use crate::cursor::SliceCursor;
use crate::error::{Error, Result};
use crate::footer::Footer;
use crate::index::resolve_data_block_handles;
use crate::properties::{index_type, read_properties};
use crate::varint::read_uvarint;

/// One decoded record: the user-visible key (trailer stripped), its value,
/// and the sequence number/kind recovered from the internal-key trailer
/// (spec §3 "Entry").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
    pub sequence: u64,
    pub kind: u8,
}

/// Drives a single owned block payload the same way [`crate::block::RawBlockIter`]
/// drives a borrowed one, without requiring the iterator to hold a
/// self-referential borrow of its own buffer.
struct OwnedBlockCursor {
    data: Vec<u8>,
    entries_end: usize,
    restarts: Vec<u32>,
    pos: usize,
    prev_key: Vec<u8>,
    next_restart_idx: usize,
}

impl OwnedBlockCursor {
    fn new(data: Vec<u8>) -> Result<Self> {
        // Validate and extract the restart metadata via the shared decoder;
        // `Block::new` borrows `data` only for the duration of this call.
        let (entries_end, restarts) = {
            let block = Block::new(&data)?;
            (block.entries_end(), block.restarts().to_vec())
        };
        Ok(OwnedBlockCursor {
            data,
            entries_end,
            restarts,
            pos: 0,
            prev_key: Vec::new(),
            next_restart_idx: 0,
        })
    }

    fn next_entry(&mut self) -> Option<Result<(Vec<u8>, Vec<u8>)>> {
        if self.pos >= self.entries_end {
            return None;
        }
        let start_pos = self.pos;

        let mut cursor = SliceCursor::at(&self.data, self.pos);
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
            Some(s) => s.to_vec(),
            None => return Some(Err(Error::Truncated { offset: cursor.position() as u64 })),
        };
        let value = match cursor.take(value_len) {
            Some(v) => v.to_vec(),
            None => return Some(Err(Error::Truncated { offset: cursor.position() as u64 })),
        };

        let mut full_key = Vec::with_capacity(shared + suffix.len());
        full_key.extend_from_slice(&self.prev_key[..shared]);
        full_key.extend_from_slice(&suffix);
        self.prev_key = full_key.clone();
        self.pos = cursor.position();

        Some(Ok((full_key, value)))
    }
}

/// Lazy, forward-only, single-pass sequence of [`Entry`] over an entire
/// table file (spec §4.7). A new traversal must reopen from the footer;
/// this type is not restartable.
pub struct EntryIterator<'s, S: ByteSource> {
    source: &'s S,
    verify_checksums: bool,
    data_block_handles: Vec<BlockHandle>,
    next_handle_idx: usize,
    current: Option<OwnedBlockCursor>,
}

impl<'s, S: ByteSource> EntryIterator<'s, S> {
    /// Opens the footer, determines the index topology via the properties
    /// block, and resolves the full, ordered list of data-block handles.
    /// Entries are not decoded until the iterator is advanced.
    pub fn open(source: &'s S, verify_checksums: bool) -> Result<Self> {
        let footer = Footer::read_from(source)?;
        let properties = read_properties(source, &footer, verify_checksums)?;
        let topology = index_type(&properties)?;
        log::debug!("opened table with index topology {:?}", topology);

        let top_level_index_data = block::read_block(source, &footer.index_handle, verify_checksums)?;
        let data_block_handles = resolve_data_block_handles(
            &top_level_index_data,
            topology,
            source.length(),
            |handle| block::read_block(source, handle, verify_checksums),
        )?;

        Ok(EntryIterator {
            source,
            verify_checksums,
            data_block_handles,
            next_handle_idx: 0,
            current: None,
        })
    }
}

impl<'s, S: ByteSource> Iterator for EntryIterator<'s, S> {
    type Item = Result<Entry>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(cursor) = self.current.as_mut() {
                match cursor.next_entry() {
                    Some(Ok((full_key, value))) => {
                        return Some(split_internal_key(&full_key).map(|(user_key, sequence, kind)| Entry {
                            key: user_key.to_vec(),
                            value,
                            sequence,
                            kind,
                        }));
                    }
                    Some(Err(e)) => return Some(Err(e)),
                    None => self.current = None,
                }
            }

            if self.next_handle_idx >= self.data_block_handles.len() {
                return None;
            }
            let handle = self.data_block_handles[self.next_handle_idx];
            self.next_handle_idx += 1;

            if !handle.fits_within(self.source.length()) {
                return Some(Err(Error::BadFileFormat {
                    offset: handle.offset,
                    reason: format!(
                        "data block handle {:?} exceeds file length {}",
                        handle,
                        self.source.length()
                    ),
                }));
            }

            let data = match block::read_block(self.source, &handle, self.verify_checksums) {
                Ok(d) => d,
                Err(e) => return Some(Err(e)),
            };
            match OwnedBlockCursor::new(data) {
                Ok(c) => self.current = Some(c),
                Err(e) => return Some(Err(e)),
            }
        }
    }
}
