//! Meta-index and properties decoding (spec §4.6).

use std::collections::HashMap;

use crate::block::{read_block, Block};
use crate::block_handle::BlockHandle;
use crate::byte_source::ByteSource;
use crate::cursor::SliceCursor;
use crate::error::{Error, Result};
use crate::footer::Footer;
use crate::index::IndexType;
use crate::varint::read_uvarint;

/// Name under which the properties block is registered in the meta-index,
/// and the legacy name some older writers use instead.
pub const PROPERTIES_BLOCK_NAME: &[u8] = b"rocksdb.properties";
pub const LEGACY_PROPERTIES_BLOCK_NAME: &[u8] = b"rocksdb.stats";

/// Property distinguishing a single-level from a two-level index layout.
pub const INDEX_TYPE_PROPERTY: &[u8] = b"rocksdb.block.based.table.index.type";

/// A meta-index block maps a name to a [`BlockHandle`] (spec §4.6); this is
/// structurally the same as an index block, just with UTF-8 names instead
/// of internal keys as the "separator".
pub fn meta_index_entries(meta_index_data: &[u8]) -> Result<Vec<(Vec<u8>, BlockHandle)>> {
    let block = Block::new(meta_index_data)?;
    let mut out = Vec::new();
    for entry in block.iter() {
        let (name, value) = entry?;
        let mut cursor = SliceCursor::new(value);
        let handle = BlockHandle::decode_from(&mut cursor)?;
        out.push((name, handle));
    }
    Ok(out)
}

/// Reads the meta-index block, locates the properties block, and decodes
/// it as a data block into a name -> value mapping.
///
/// Returns an empty map if no properties block is registered in the
/// meta-index; the spec does not describe that condition as an error, and
/// a table with no properties has no two-level index to detect, so
/// `index_type` below falls back to single-level in that case.
pub fn read_properties(
    source: &impl ByteSource,
    footer: &Footer,
    verify_checksums: bool,
) -> Result<HashMap<Vec<u8>, Vec<u8>>> {
    let meta_index_data = read_block(source, &footer.meta_index_handle, verify_checksums)?;
    let entries = meta_index_entries(&meta_index_data)?;

    let properties_handle = entries
        .iter()
        .find(|(name, _)| name == PROPERTIES_BLOCK_NAME || name == LEGACY_PROPERTIES_BLOCK_NAME)
        .map(|(_, handle)| *handle);

    let Some(handle) = properties_handle else {
        return Ok(HashMap::new());
    };

    let properties_data = read_block(source, &handle, verify_checksums)?;
    let block = Block::new(&properties_data)?;

    let mut map = HashMap::new();
    for entry in block.iter() {
        let (key, value) = entry?;
        map.insert(key, value.to_vec());
    }
    Ok(map)
}

/// Decodes the `rocksdb.block.based.table.index.type` property (an
/// unsigned varint in bytes) to decide how the index should be walked.
/// Absent the property, a single-level index is assumed.
pub fn index_type(properties: &HashMap<Vec<u8>, Vec<u8>>) -> Result<IndexType> {
    let Some(bytes) = properties.get(INDEX_TYPE_PROPERTY) else {
        return Ok(IndexType::SingleLevel);
    };
    let mut cursor = SliceCursor::new(bytes);
    let value = read_uvarint(&mut cursor)?;
    match value {
        0 => Ok(IndexType::SingleLevel),
        1 => Ok(IndexType::TwoLevel),
        other => Err(Error::BadFileFormat {
            offset: 0,
            reason: format!("unknown index type property value {}", other),
        }),
    }
}
